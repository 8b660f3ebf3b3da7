//! The caller's principal.
//!
//! The hosting layer authenticates the session cookie (or not) and hands the
//! engine a [`Subject`]: either anonymous or an authenticated principal with
//! the session facts the login decision tree needs: when and through which
//! identity provider the session was established.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Identity provider name for sessions established by local credentials.
pub const LOCAL_IDENTITY_PROVIDER: &str = "local";

/// The principal attached to the current request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Stable subject identifier. `None` for anonymous callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    /// Display name for interactive pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// When the current session was authenticated.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub auth_time: Option<OffsetDateTime>,

    /// Identity provider that authenticated the session
    /// ([`LOCAL_IDENTITY_PROVIDER`] or an external provider name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idp: Option<String>,

    /// Server-side session identifier, used for `session_state` and
    /// persisted into issued authorization codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Authentication methods references for the session.
    #[serde(default)]
    pub amr: Vec<String>,
}

impl Subject {
    /// Creates an anonymous (unauthenticated) subject.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            subject_id: None,
            display_name: None,
            auth_time: None,
            idp: None,
            session_id: None,
            amr: Vec::new(),
        }
    }

    /// Creates an authenticated subject.
    #[must_use]
    pub fn authenticated(
        subject_id: impl Into<String>,
        auth_time: OffsetDateTime,
        idp: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            display_name: None,
            auth_time: Some(auth_time),
            idp: Some(idp.into()),
            session_id: Some(session_id.into()),
            amr: Vec::new(),
        }
    }

    /// Returns `true` if the subject is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.subject_id.is_some()
    }

    /// Returns `true` if the session was established by local credentials.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.idp.as_deref() == Some(LOCAL_IDENTITY_PROVIDER)
    }

    /// Age of the current session at `now`.
    ///
    /// `None` if the subject is anonymous or carries no `auth_time`; callers
    /// treating session freshness as a gate must interpret `None` as stale.
    #[must_use]
    pub fn session_age(&self, now: OffsetDateTime) -> Option<Duration> {
        self.auth_time.map(|auth_time| now - auth_time)
    }
}
