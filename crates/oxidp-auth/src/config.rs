//! Authorization engine configuration.
//!
//! Configuration for the authorize endpoint: authorization code lifetime,
//! input length limits, scope validation policy, and enabled response modes.
//!
//! # Example (TOML)
//!
//! ```toml
//! [authorize]
//! authorization_code_lifetime = "5m"
//! require_full_scope_validity = true
//!
//! [authorize.input_lengths]
//! scope = 300
//! state = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::flow::ResponseMode;

/// Configuration for the authorize-endpoint pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizeConfig {
    /// Authorization code lifetime.
    /// Codes should be short-lived; the OAuth 2.0 spec recommends at most
    /// 10 minutes.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Require every requested scope to resolve to a known, allowed
    /// resource. When false, unknown scopes are dropped into
    /// `missing_scopes` and the request proceeds with the recognized subset.
    pub require_full_scope_validity: bool,

    /// Response modes the server will accept.
    pub enabled_response_modes: Vec<ResponseMode>,

    /// Per-parameter input length limits.
    pub input_lengths: InputLengthConfig,
}

impl Default for AuthorizeConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(300), // 5 minutes
            require_full_scope_validity: true,
            enabled_response_modes: vec![
                ResponseMode::Query,
                ResponseMode::Fragment,
                ResponseMode::FormPost,
            ],
            input_lengths: InputLengthConfig::default(),
        }
    }
}

impl AuthorizeConfig {
    /// Sets a custom authorization code lifetime.
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.authorization_code_lifetime = lifetime;
        self
    }

    /// Allows requests whose scopes only partially resolve.
    #[must_use]
    pub fn with_partial_scope_validity(mut self) -> Self {
        self.require_full_scope_validity = false;
        self
    }

    /// Restricts the accepted response modes.
    #[must_use]
    pub fn with_response_modes(mut self, modes: Vec<ResponseMode>) -> Self {
        self.enabled_response_modes = modes;
        self
    }

    /// Returns `true` if the response mode is enabled.
    #[must_use]
    pub fn is_response_mode_enabled(&self, mode: ResponseMode) -> bool {
        self.enabled_response_modes.contains(&mode)
    }
}

/// Maximum accepted lengths for transport parameters.
///
/// Oversized parameters are rejected before any store lookup; the limits
/// exist to bound log lines, persisted codes, and hash inputs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputLengthConfig {
    /// Maximum length of the `client_id` parameter.
    pub client_id: usize,

    /// Maximum length of the `scope` parameter (the full space-separated
    /// value).
    pub scope: usize,

    /// Maximum length of the `redirect_uri` parameter.
    pub redirect_uri: usize,

    /// Maximum length of the `state` parameter.
    pub state: usize,

    /// Maximum length of the `nonce` parameter.
    pub nonce: usize,

    /// Maximum length of the `login_hint` parameter.
    pub login_hint: usize,

    /// Maximum length of the `acr_values` parameter.
    pub acr_values: usize,

    /// Maximum length of the `ui_locales` parameter.
    pub ui_locales: usize,
}

impl Default for InputLengthConfig {
    fn default() -> Self {
        Self {
            client_id: 100,
            scope: 300,
            redirect_uri: 400,
            state: 2000,
            nonce: 300,
            login_hint: 100,
            acr_values: 300,
            ui_locales: 100,
        }
    }
}

/// PKCE code challenge length bounds, per RFC 7636 section 4.2.
pub const CODE_CHALLENGE_MIN_LENGTH: usize = 43;

/// PKCE code challenge length bounds, per RFC 7636 section 4.2.
pub const CODE_CHALLENGE_MAX_LENGTH: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthorizeConfig::default();
        assert_eq!(
            config.authorization_code_lifetime,
            Duration::from_secs(300)
        );
        assert!(config.require_full_scope_validity);
        assert!(config.is_response_mode_enabled(ResponseMode::Query));
        assert!(config.is_response_mode_enabled(ResponseMode::FormPost));
        assert_eq!(config.input_lengths.scope, 300);
    }

    #[test]
    fn test_builder() {
        let config = AuthorizeConfig::default()
            .with_code_lifetime(Duration::from_secs(60))
            .with_partial_scope_validity()
            .with_response_modes(vec![ResponseMode::Query]);

        assert_eq!(config.authorization_code_lifetime, Duration::from_secs(60));
        assert!(!config.require_full_scope_validity);
        assert!(!config.is_response_mode_enabled(ResponseMode::Fragment));
    }

    #[test]
    fn test_toml_roundtrip_with_humantime() {
        let config = AuthorizeConfig::default().with_code_lifetime(Duration::from_secs(120));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AuthorizeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.authorization_code_lifetime,
            Duration::from_secs(120)
        );
    }
}
