//! Stored authorization codes.
//!
//! The terminal handler captures the validated request into an
//! [`AuthorizationCode`] and hands it to the code store, which returns the
//! unguessable code value delivered to the client.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::flow::PkceMethod;

/// Everything persisted alongside an issued authorization code, for later
/// redemption at the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Unique record identifier.
    pub id: Uuid,

    /// Client the code was issued to.
    pub client_id: String,

    /// Subject that authorized the request.
    pub subject_id: String,

    /// Granted scope names.
    pub granted_scopes: Vec<String>,

    /// Redirect URI the code must be redeemed against.
    pub redirect_uri: String,

    /// OpenID Connect nonce to fold into the ID token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// PKCE code challenge to verify at redemption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<PkceMethod>,

    /// Hash of the `state` parameter for the `s_hash` claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_hash: Option<String>,

    /// Server-side session the code was issued under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Generates a fresh unguessable code value: 256 bits of CSPRNG output,
    /// base64url-encoded without padding (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_generate_code_length_and_uniqueness() {
        let a = AuthorizationCode::generate_code();
        let b = AuthorizationCode::generate_code();

        assert_eq!(a.len(), 43);
        assert_eq!(b.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_code_is_urlsafe() {
        let code = AuthorizationCode::generate_code();
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_expiry() {
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            client_id: "web-app".to_string(),
            subject_id: "alice".to_string(),
            granted_scopes: vec!["openid".to_string()],
            redirect_uri: "https://app.example.com/cb".to_string(),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            state_hash: None,
            session_id: None,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };

        assert!(!code.is_expired(now));
        assert!(code.is_expired(now + Duration::minutes(6)));
    }
}
