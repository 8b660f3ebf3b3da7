//! Remembered consent records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A user's recorded grant of a scope set to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    /// Subject that granted the consent.
    pub subject_id: String,

    /// Client the consent was granted to.
    pub client_id: String,

    /// Scope names the consent covers.
    pub scopes: Vec<String>,

    /// When the consent was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the consent expires. `None` means it never expires.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl ConsentRecord {
    /// Creates a consent record starting now.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        client_id: impl Into<String>,
        scopes: Vec<String>,
        expires_at: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            client_id: client_id.into(),
            scopes,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        }
    }

    /// Returns `true` if the consent has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }

    /// Returns `true` if the record covers exactly the given scope set
    /// (order-insensitive).
    #[must_use]
    pub fn covers_exactly(&self, scopes: &[String]) -> bool {
        if self.scopes.len() != scopes.len() {
            return false;
        }
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn record(scopes: &[&str], expires_at: Option<OffsetDateTime>) -> ConsentRecord {
        ConsentRecord::new(
            "alice",
            "web-app",
            scopes.iter().map(ToString::to_string).collect(),
            expires_at,
        )
    }

    #[test]
    fn test_never_expires_without_expiry() {
        let consent = record(&["openid"], None);
        assert!(!consent.is_expired(OffsetDateTime::now_utc() + Duration::days(3650)));
    }

    #[test]
    fn test_expiry() {
        let now = OffsetDateTime::now_utc();
        let consent = record(&["openid"], Some(now + Duration::hours(1)));

        assert!(!consent.is_expired(now));
        assert!(consent.is_expired(now + Duration::hours(2)));
    }

    #[test]
    fn test_covers_exactly_order_insensitive() {
        let consent = record(&["openid", "api1.read"], None);

        assert!(consent.covers_exactly(&["api1.read".to_string(), "openid".to_string()]));
        assert!(!consent.covers_exactly(&["openid".to_string()]));
        assert!(!consent.covers_exactly(&[
            "openid".to_string(),
            "api1.read".to_string(),
            "email".to_string(),
        ]));
    }
}
