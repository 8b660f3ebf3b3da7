//! Consent decision policy.
//!
//! Decides whether the consent page must be shown for a request, and
//! records the user's answer afterwards. Consumed by the consent stage of
//! the authorize pipeline and by the interactive consent page handler.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ConsentStore;
use crate::subject::Subject;
use crate::types::client::Client;
use crate::types::consent::ConsentRecord;
use crate::types::resources::Resources;

/// Consent policy over a [`ConsentStore`].
pub struct ConsentService {
    store: Arc<dyn ConsentStore>,
}

impl ConsentService {
    /// Creates the policy over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConsentStore>) -> Self {
        Self { store }
    }

    /// Decides whether consent is required for this request.
    ///
    /// - `false` if the client does not require consent
    /// - `false` if nothing consentable was requested
    /// - `true` if the client disallows remembering consent (always prompt)
    /// - otherwise: `true` when no stored consent exists, when it expired
    ///   (the expired record is deleted), or when its scope set differs from
    ///   the request's; `false` when an unexpired record covers exactly the
    ///   requested scopes
    ///
    /// # Errors
    ///
    /// `AuthError::Internal` when called with an anonymous subject (the
    /// login stage must run first), plus any store fault.
    pub async fn requires_consent(
        &self,
        subject: &Subject,
        client: &Client,
        resources: &Resources,
    ) -> AuthResult<bool> {
        if !client.require_consent {
            return Ok(false);
        }

        if resources.is_empty() {
            return Ok(false);
        }

        if !client.allow_remember_consent {
            return Ok(true);
        }

        let subject_id = subject
            .subject_id
            .as_deref()
            .ok_or_else(|| AuthError::internal("consent check requires an authenticated subject"))?;

        let Some(record) = self.store.get(subject_id, &client.client_id).await? else {
            return Ok(true);
        };

        let now = OffsetDateTime::now_utc();
        if record.is_expired(now) {
            tracing::debug!(
                subject_id,
                client_id = %client.client_id,
                "stored consent expired, removing"
            );
            self.store.remove(subject_id, &client.client_id).await?;
            return Ok(true);
        }

        Ok(!record.covers_exactly(&resources.scope_names()))
    }

    /// Records the user's consent answer.
    ///
    /// An empty `granted_scopes` means the grant was revoked: any existing
    /// record is deleted. A non-empty grant is remembered only when the
    /// client allows it, with the client's consent lifetime as expiry.
    ///
    /// # Errors
    ///
    /// `AuthError::Internal` for an anonymous subject, plus any store fault.
    pub async fn update_consent(
        &self,
        subject: &Subject,
        client: &Client,
        granted_scopes: &[String],
    ) -> AuthResult<()> {
        let subject_id = subject
            .subject_id
            .as_deref()
            .ok_or_else(|| AuthError::internal("consent update requires an authenticated subject"))?;

        if granted_scopes.is_empty() {
            self.store.remove(subject_id, &client.client_id).await?;
            return Ok(());
        }

        if !client.allow_remember_consent {
            return Ok(());
        }

        let expires_at = client
            .consent_lifetime
            .map(|secs| OffsetDateTime::now_utc() + Duration::seconds(secs));

        let record = ConsentRecord::new(
            subject_id,
            &client.client_id,
            granted_scopes.to_vec(),
            expires_at,
        );

        tracing::debug!(
            subject_id,
            client_id = %client.client_id,
            scopes = granted_scopes.len(),
            "recording consent"
        );
        self.store.put(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryConsentStore;
    use crate::types::flow::GrantKind;
    use crate::types::resources::{ApiScope, IdentityResource};

    fn client() -> Client {
        Client {
            client_id: "web-app".to_string(),
            client_name: "Web App".to_string(),
            enabled: true,
            allowed_grant_types: vec![GrantKind::Code],
            redirect_uris: vec!["https://app.example.com/cb".to_string()],
            allowed_scopes: vec![],
            require_pkce: true,
            allow_plain_text_pkce: false,
            require_consent: true,
            allow_remember_consent: true,
            consent_lifetime: None,
            enable_local_login: true,
            identity_provider_restrictions: vec![],
            user_sso_lifetime: None,
        }
    }

    fn subject() -> Subject {
        Subject::authenticated("alice", OffsetDateTime::now_utc(), "local", "sess-1")
    }

    fn resources() -> Resources {
        Resources {
            identity_resources: vec![IdentityResource::open_id()],
            api_scopes: vec![ApiScope::new("api1.read")],
            api_resources: vec![],
            missing_scopes: vec![],
        }
    }

    fn service() -> (ConsentService, Arc<InMemoryConsentStore>) {
        let store = Arc::new(InMemoryConsentStore::new());
        (ConsentService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_no_consent_needed_when_client_does_not_require_it() {
        let (service, _) = service();
        let mut client = client();
        client.require_consent = false;

        let required = service
            .requires_consent(&subject(), &client, &resources())
            .await
            .unwrap();
        assert!(!required);
    }

    #[tokio::test]
    async fn test_no_consent_needed_for_empty_resources() {
        let (service, _) = service();
        let required = service
            .requires_consent(&subject(), &client(), &Resources::new())
            .await
            .unwrap();
        assert!(!required);
    }

    #[tokio::test]
    async fn test_always_prompt_when_remembering_disallowed() {
        let (service, store) = service();
        let mut client = client();
        client.allow_remember_consent = false;

        // Even with a stored record covering the request.
        store
            .put(ConsentRecord::new(
                "alice",
                "web-app",
                vec!["openid".to_string(), "api1.read".to_string()],
                None,
            ))
            .await
            .unwrap();

        let required = service
            .requires_consent(&subject(), &client, &resources())
            .await
            .unwrap();
        assert!(required);
    }

    #[tokio::test]
    async fn test_consent_required_without_stored_record() {
        let (service, _) = service();
        let required = service
            .requires_consent(&subject(), &client(), &resources())
            .await
            .unwrap();
        assert!(required);
    }

    #[tokio::test]
    async fn test_matching_unexpired_consent_skips_prompt() {
        let (service, store) = service();
        store
            .put(ConsentRecord::new(
                "alice",
                "web-app",
                vec!["openid".to_string(), "api1.read".to_string()],
                None,
            ))
            .await
            .unwrap();

        let required = service
            .requires_consent(&subject(), &client(), &resources())
            .await
            .unwrap();
        assert!(!required);
    }

    #[tokio::test]
    async fn test_expired_consent_reprompts_and_deletes_record() {
        let (service, store) = service();
        store
            .put(ConsentRecord::new(
                "alice",
                "web-app",
                vec!["openid".to_string(), "api1.read".to_string()],
                Some(OffsetDateTime::now_utc() - Duration::hours(1)),
            ))
            .await
            .unwrap();

        let required = service
            .requires_consent(&subject(), &client(), &resources())
            .await
            .unwrap();
        assert!(required);

        // The expired record was removed on read.
        assert!(store.get("alice", "web-app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scope_change_reprompts() {
        let (service, store) = service();
        store
            .put(ConsentRecord::new(
                "alice",
                "web-app",
                vec!["openid".to_string()],
                None,
            ))
            .await
            .unwrap();

        // The request adds api1.read, not present in the stored consent.
        let required = service
            .requires_consent(&subject(), &client(), &resources())
            .await
            .unwrap();
        assert!(required);
    }

    #[tokio::test]
    async fn test_anonymous_subject_is_internal_error() {
        let (service, _) = service();
        let result = service
            .requires_consent(&Subject::anonymous(), &client(), &resources())
            .await;
        assert!(matches!(result, Err(AuthError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_update_consent_records_with_lifetime() {
        let (service, store) = service();
        let mut client = client();
        client.consent_lifetime = Some(3600);

        service
            .update_consent(
                &subject(),
                &client,
                &["openid".to_string(), "api1.read".to_string()],
            )
            .await
            .unwrap();

        let record = store.get("alice", "web-app").await.unwrap().unwrap();
        assert!(record.expires_at.is_some());
        assert!(record.covers_exactly(&["api1.read".to_string(), "openid".to_string()]));
    }

    #[tokio::test]
    async fn test_update_consent_empty_scopes_deletes() {
        let (service, store) = service();
        store
            .put(ConsentRecord::new(
                "alice",
                "web-app",
                vec!["openid".to_string()],
                None,
            ))
            .await
            .unwrap();

        service.update_consent(&subject(), &client(), &[]).await.unwrap();
        assert!(store.get("alice", "web-app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_consent_not_remembered_when_disallowed() {
        let (service, store) = service();
        let mut client = client();
        client.allow_remember_consent = false;

        service
            .update_consent(&subject(), &client, &["openid".to_string()])
            .await
            .unwrap();
        assert!(store.get("alice", "web-app").await.unwrap().is_none());
    }
}
