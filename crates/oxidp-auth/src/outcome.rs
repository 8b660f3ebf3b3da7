//! Terminal outcomes of an authorize-pipeline run.
//!
//! Four outcome families exist, matching the error-delivery taxonomy:
//!
//! - [`AuthorizeOutcome::Success`]: a code was issued; redirect to the
//!   validated redirect URI.
//! - [`AuthorizeOutcome::ErrorRedirect`]: a protocol error discovered once
//!   the client and redirect URI are trusted; safe to deliver via redirect.
//! - [`AuthorizeOutcome::ErrorPage`]: an error discovered before the
//!   redirect URI was validated; delivered as a page with no `Location`,
//!   never a redirect to unvalidated input.
//! - [`AuthorizeOutcome::Interaction`]: not an error: the user must visit
//!   the login or consent page; carries the parameter set needed to resume.

use serde::{Deserialize, Serialize};

use crate::params::Parameters;
use crate::types::flow::ResponseMode;

/// OAuth 2.0 authorize-endpoint error codes (RFC 6749 section 4.1.2.1 plus
/// the OpenID Connect additions used by this engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeErrorCode {
    /// Malformed or incomplete request.
    InvalidRequest,

    /// The client may not request a code this way.
    UnauthorizedClient,

    /// The resource owner or the server denied the request.
    AccessDenied,

    /// The server does not support this response type.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The client is unknown or disabled.
    InvalidClient,

    /// Unexpected server-side condition.
    ServerError,
}

impl AuthorizeErrorCode {
    /// Returns the wire value of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidClient => "invalid_client",
            Self::ServerError => "server_error",
        }
    }
}

impl std::fmt::Display for AuthorizeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful code issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeSuccess {
    /// The validated redirect URI to deliver to.
    pub redirect_uri: String,

    /// Delivery mode for the response parameters.
    pub response_mode: ResponseMode,

    /// The issued authorization code.
    pub code: String,

    /// Echoed `state`, if the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Granted scope names, space-separated.
    pub scope: String,

    /// Opaque session-change-detection value, if a server session exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

/// Protocol error delivered by redirect to the already-validated URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeErrorRedirect {
    /// The validated redirect URI to deliver to.
    pub redirect_uri: String,

    /// Delivery mode for the error parameters.
    pub response_mode: ResponseMode,

    /// OAuth error code.
    pub error: AuthorizeErrorCode,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed `state`, if the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Error delivered as a page because no redirect URI is trusted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeErrorPage {
    /// OAuth error code.
    pub error: AuthorizeErrorCode,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Which interactive page the user must visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// The user must (re-)authenticate.
    Login,
    /// The user must grant consent.
    Consent,
}

/// Interaction-required outcome: not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequired {
    /// Which page to navigate to.
    pub kind: InteractionKind,

    /// The parameter set the hosting layer replays after the interaction
    /// completes (already adjusted, e.g. `prompt` removed so resumption
    /// does not re-trigger the login gate).
    pub resume: Parameters,
}

/// Terminal outcome of an authorize-pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum AuthorizeOutcome {
    /// A code was issued.
    Success(AuthorizeSuccess),
    /// Error delivered via redirect (redirect URI trusted).
    ErrorRedirect(AuthorizeErrorRedirect),
    /// Error delivered as a page (redirect URI not trusted).
    ErrorPage(AuthorizeErrorPage),
    /// Login or consent required.
    Interaction(InteractionRequired),
}

impl AuthorizeOutcome {
    /// Returns `true` for either error family.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ErrorRedirect(_) | Self::ErrorPage(_))
    }

    /// Returns `true` for an interaction-required outcome.
    #[must_use]
    pub fn is_interaction(&self) -> bool {
        matches!(self, Self::Interaction(_))
    }

    /// Returns `true` for successful code issuance.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error code, for either error family.
    #[must_use]
    pub fn error_code(&self) -> Option<AuthorizeErrorCode> {
        match self {
            Self::ErrorRedirect(e) => Some(e.error),
            Self::ErrorPage(e) => Some(e.error),
            Self::Success(_) | Self::Interaction(_) => None,
        }
    }
}
