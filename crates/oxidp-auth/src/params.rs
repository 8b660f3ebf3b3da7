//! Transport parameter collection.
//!
//! The hosting layer parses a query string or form body and hands the engine
//! an ordered, case-insensitive, multi-valued parameter collection. Keys are
//! folded to lowercase on insertion; insertion order is preserved for
//! deterministic resume round-trips.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// OAuth 2.0 / OpenID Connect authorize-request parameter names.
pub mod names {
    /// Client identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// Redirect URI.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Response type (`code`, `id_token`, combinations).
    pub const RESPONSE_TYPE: &str = "response_type";
    /// Response delivery mode (`query`, `fragment`, `form_post`).
    pub const RESPONSE_MODE: &str = "response_mode";
    /// Requested scopes, space-separated.
    pub const SCOPE: &str = "scope";
    /// Opaque client state, echoed back.
    pub const STATE: &str = "state";
    /// OpenID Connect nonce.
    pub const NONCE: &str = "nonce";
    /// Interaction hint (`login`, `consent`, `select_account`, `none`).
    pub const PROMPT: &str = "prompt";
    /// Maximum authentication age in seconds.
    pub const MAX_AGE: &str = "max_age";
    /// PKCE code challenge.
    pub const CODE_CHALLENGE: &str = "code_challenge";
    /// PKCE code challenge method (`S256`, `plain`).
    pub const CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
    /// Requested Authentication Context Class References.
    pub const ACR_VALUES: &str = "acr_values";
    /// Login hint for the login page.
    pub const LOGIN_HINT: &str = "login_hint";
    /// Preferred UI locales.
    pub const UI_LOCALES: &str = "ui_locales";

    /// Success response: authorization code.
    pub const CODE: &str = "code";
    /// Success response: granted scope.
    pub const SESSION_STATE: &str = "session_state";
    /// Error response: OAuth error code.
    pub const ERROR: &str = "error";
    /// Error response: human-readable description.
    pub const ERROR_DESCRIPTION: &str = "error_description";
}

/// Ordered, case-insensitive, multi-valued parameter collection.
///
/// ```
/// use oxidp_auth::params::Parameters;
///
/// let params = Parameters::from_pairs([("Client_Id", "app"), ("scope", "openid")]);
/// assert_eq!(params.get("client_id"), Some("app"));
/// assert_eq!(params.get("CLIENT_ID"), Some("app"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    entries: IndexMap<String, Vec<String>>,
}

impl Parameters {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from key/value pairs, preserving order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.append(key.as_ref(), value);
        }
        params
    }

    /// Returns the first value for the key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&Self::fold(key))
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value recorded for the key, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&Self::fold(key))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if the key has at least one value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&Self::fold(key))
    }

    /// Returns `true` if the key appears more than once.
    ///
    /// OAuth 2.0 forbids repeated request parameters; validators use this to
    /// reject duplicates.
    #[must_use]
    pub fn is_repeated(&self, key: &str) -> bool {
        self.get_all(key).len() > 1
    }

    /// Appends a value for the key.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(Self::fold(key))
            .or_default()
            .push(value.into());
    }

    /// Replaces every value for the key with a single one.
    pub fn replace(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(Self::fold(key), vec![value.into()]);
    }

    /// Removes the key entirely, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(&Self::fold(key))
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no parameters are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs, expanding multi-valued keys, in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values.iter().map(move |value| (key.as_str(), value.as_str()))
        })
    }

    fn fold(key: &str) -> String {
        key.to_ascii_lowercase()
    }
}
