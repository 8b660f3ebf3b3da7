//! Protocol flow enums: grants, response types, response modes, prompts,
//! PKCE methods.

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

// =============================================================================
// Grant Kind
// =============================================================================

/// The effective authorization grant derived from `response_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Authorization code flow.
    Code,
    /// Implicit flow (front-channel token delivery).
    Implicit,
    /// Hybrid flow (code plus front-channel artifacts).
    Hybrid,
}

impl GrantKind {
    /// Returns the grant kind as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Implicit => "implicit",
            Self::Hybrid => "hybrid",
        }
    }

    /// Returns `true` if the grant issues an authorization code.
    #[must_use]
    pub fn issues_code(&self) -> bool {
        matches!(self, Self::Code | Self::Hybrid)
    }

    /// Default response mode for the grant when the request names none.
    ///
    /// Grants that deliver tokens in the front channel default to the
    /// fragment so values stay out of server logs.
    #[must_use]
    pub fn default_response_mode(&self) -> ResponseMode {
        match self {
            Self::Code => ResponseMode::Query,
            Self::Implicit | Self::Hybrid => ResponseMode::Fragment,
        }
    }
}

impl std::fmt::Display for GrantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derives the effective grant from a `response_type` value.
///
/// The parameter is a space-separated, order-insensitive token set:
/// `code`, `token`, `id_token`, and their combinations.
///
/// # Errors
///
/// `AuthError::UnsupportedResponseType` for empty, repeated, or unknown
/// token sets.
pub fn parse_response_type(response_type: &str) -> Result<GrantKind, AuthError> {
    let mut has_code = false;
    let mut has_token = false;
    let mut has_id_token = false;
    let mut count = 0usize;

    for token in response_type.split_whitespace() {
        count += 1;
        match token {
            "code" if !has_code => has_code = true,
            "token" if !has_token => has_token = true,
            "id_token" if !has_id_token => has_id_token = true,
            _ => return Err(AuthError::unsupported_response_type(response_type)),
        }
    }

    if count == 0 {
        return Err(AuthError::unsupported_response_type(response_type));
    }

    match (has_code, has_token || has_id_token) {
        (true, false) => Ok(GrantKind::Code),
        (false, true) => Ok(GrantKind::Implicit),
        (true, true) => Ok(GrantKind::Hybrid),
        (false, false) => Err(AuthError::unsupported_response_type(response_type)),
    }
}

// =============================================================================
// Response Mode
// =============================================================================

/// How authorize-response parameters are delivered to the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Appended to the redirect URI's query string.
    Query,
    /// Appended after `#`; values never reach server logs via the query.
    Fragment,
    /// Auto-submitting HTML form POSTing to the redirect URI; no URL
    /// exposure at all, including via the `Referer` header.
    FormPost,
}

impl ResponseMode {
    /// Parses a `response_mode` parameter value.
    pub fn parse(mode: &str) -> Result<Self, AuthError> {
        match mode {
            "query" => Ok(Self::Query),
            "fragment" => Ok(Self::Fragment),
            "form_post" => Ok(Self::FormPost),
            other => Err(AuthError::invalid_request(format!(
                "Unknown response_mode: {other}"
            ))),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
        }
    }

    /// Returns `true` if the mode may deliver responses for the grant.
    ///
    /// Front-channel token grants must not use the query, where values
    /// would land in server logs and `Referer` headers.
    #[must_use]
    pub fn is_compatible_with(&self, grant: GrantKind) -> bool {
        match self {
            Self::Query => grant == GrantKind::Code,
            Self::Fragment | Self::FormPost => true,
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Prompt Mode
// =============================================================================

/// Client-requested interaction hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// No interactive page may be shown.
    None,
    /// Force re-authentication.
    Login,
    /// Force the consent page.
    Consent,
    /// Force account selection (treated as a login-forcing prompt).
    SelectAccount,
}

impl PromptMode {
    /// Parses a single `prompt` token.
    pub fn parse(mode: &str) -> Result<Self, AuthError> {
        match mode {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "consent" => Ok(Self::Consent),
            "select_account" => Ok(Self::SelectAccount),
            other => Err(AuthError::invalid_request(format!(
                "Unknown prompt mode: {other}"
            ))),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Consent => "consent",
            Self::SelectAccount => "select_account",
        }
    }

    /// Returns `true` if this prompt forces re-authentication.
    #[must_use]
    pub fn forces_login(&self) -> bool {
        matches!(self, Self::Login | Self::SelectAccount)
    }
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PKCE Method
// =============================================================================

/// PKCE code challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceMethod {
    /// The challenge is the verifier itself. Only accepted when the client
    /// explicitly allows it.
    #[serde(rename = "plain")]
    Plain,
    /// SHA-256 of the verifier, base64url-encoded.
    #[serde(rename = "S256")]
    S256,
}

impl PkceMethod {
    /// Parses a `code_challenge_method` parameter value.
    pub fn parse(method: &str) -> Result<Self, AuthError> {
        match method {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            other => Err(AuthError::invalid_request(format!(
                "Unknown code_challenge_method: {other}"
            ))),
        }
    }

    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl Default for PkceMethod {
    /// RFC 7636 section 4.3: the method defaults to `plain` when the
    /// parameter is absent.
    fn default() -> Self {
        Self::Plain
    }
}

impl std::fmt::Display for PkceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
