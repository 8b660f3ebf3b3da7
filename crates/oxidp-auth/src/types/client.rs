//! OAuth 2.0 client registration.
//!
//! Defines the `Client` struct consumed by the authorize pipeline: redirect
//! URI registrations (exact or wildcard), grant entitlements, PKCE policy,
//! consent policy, and login restrictions.

use serde::{Deserialize, Serialize};

use crate::types::flow::GrantKind;

/// OAuth 2.0 client registration.
///
/// Represents a registered client application with its protocol policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Human-readable display name.
    pub client_name: String,

    /// Whether this client is currently enabled.
    pub enabled: bool,

    /// Grants this client is allowed to use.
    pub allowed_grant_types: Vec<GrantKind>,

    /// Registered redirect URIs. Entries may contain a single `*` wildcard
    /// (`https://*.example.com/cb`); comparison is case-insensitive.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Scopes this client is allowed to request.
    /// Empty list means all scopes are allowed.
    #[serde(default)]
    pub allowed_scopes: Vec<String>,

    /// Whether PKCE is required for this client.
    pub require_pkce: bool,

    /// Whether the `plain` code challenge method is accepted.
    pub allow_plain_text_pkce: bool,

    /// Whether the user must consent before a code is issued.
    pub require_consent: bool,

    /// Whether granted consent may be remembered across requests.
    pub allow_remember_consent: bool,

    /// Lifetime of a remembered consent, in seconds. `None` means the
    /// consent never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_lifetime: Option<i64>,

    /// Whether local (username/password) login is allowed for this client.
    pub enable_local_login: bool,

    /// External identity providers the client accepts. Empty list means
    /// any provider is accepted.
    #[serde(default)]
    pub identity_provider_restrictions: Vec<String>,

    /// Maximum session age this client tolerates, in seconds. Sessions
    /// older than this force re-authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_sso_lifetime: Option<i64>,
}

impl Client {
    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is internally inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.allowed_grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }

        for uri in &self.redirect_uris {
            if uri.matches('*').count() > 1 {
                return Err(ClientValidationError::MalformedRedirectUri {
                    uri: uri.clone(),
                });
            }
        }

        Ok(())
    }

    /// Checks whether the redirect URI matches one of the registered URIs.
    ///
    /// A registered URI without `*` must match exactly (case-insensitive).
    /// A registered URI with one `*` matches any non-empty substitution:
    /// `https://*.example.com/cb` covers `https://a.example.com/cb` and
    /// `https://a.b.example.com/cb` but never `https://evilexample.com/cb`,
    /// because the literal `.example.com` suffix is required.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris
            .iter()
            .any(|registered| redirect_uri_matches(registered, uri))
    }

    /// Checks if the given scope is allowed for this client.
    ///
    /// An empty allow-list means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.allowed_scopes.is_empty() || self.allowed_scopes.iter().any(|s| s == scope)
    }

    /// Checks if the given grant is allowed for this client.
    #[must_use]
    pub fn is_grant_allowed(&self, grant: GrantKind) -> bool {
        self.allowed_grant_types.contains(&grant)
    }

    /// Checks if the identity provider may be used with this client.
    ///
    /// The restriction list applies to external providers only; an empty
    /// list accepts every provider.
    #[must_use]
    pub fn is_identity_provider_allowed(&self, idp: &str) -> bool {
        self.identity_provider_restrictions.is_empty()
            || self
                .identity_provider_restrictions
                .iter()
                .any(|allowed| allowed == idp)
    }
}

/// Matches a candidate redirect URI against one registered entry.
fn redirect_uri_matches(registered: &str, candidate: &str) -> bool {
    match registered.find('*') {
        None => registered.eq_ignore_ascii_case(candidate),
        Some(_) => {
            let mut pattern = String::with_capacity(registered.len() + 8);
            pattern.push('^');
            for (i, part) in registered.split('*').enumerate() {
                if i > 0 {
                    pattern.push_str(".+");
                }
                pattern.push_str(&regex::escape(part));
            }
            pattern.push('$');

            regex::RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(candidate))
                .unwrap_or(false)
        }
    }
}

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// At least one redirect URI is required.
    #[error("At least one redirect URI is required")]
    NoRedirectUris,

    /// A registered redirect URI carries more than one wildcard.
    #[error("Malformed redirect URI pattern: {uri}")]
    MalformedRedirectUri {
        /// The offending registration.
        uri: String,
    },
}
