//! Terminal authorize handler.
//!
//! Every gate has passed: the client is resolved, the redirect URI and
//! scopes are validated, the session is fresh, consent is granted. For the
//! code flow this stage captures the request into a stored authorization
//! code and emits the success response (`code`, `state`, `scope`,
//! `session_state`).
//!
//! Implicit and hybrid grants are a declared extension point: they are
//! modeled, but reaching this stage with one is an internal error, never a
//! silently stubbed success.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use oxidp_pipeline::{Handler, PipelineError, StageResult};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AuthorizeConfig;
use crate::context::{AuthorizeContext, HasClient, HasOutcome, HasRedirectUri, HasResources};
use crate::error::AuthError;
use crate::outcome::{AuthorizeOutcome, AuthorizeSuccess};
use crate::storage::AuthorizationCodeStore;
use crate::types::code::AuthorizationCode;
use crate::types::flow::GrantKind;

/// Stage name used in logs and errors.
const STAGE: &str = "AuthorizeHandler";

/// Issues the authorization code and the success response.
pub struct AuthorizeHandler {
    codes: Arc<dyn AuthorizationCodeStore>,
    config: Arc<AuthorizeConfig>,
}

impl AuthorizeHandler {
    /// Creates the stage over the given code store.
    #[must_use]
    pub fn new(codes: Arc<dyn AuthorizationCodeStore>, config: Arc<AuthorizeConfig>) -> Self {
        Self { codes, config }
    }
}

#[async_trait]
impl Handler<AuthorizeContext> for AuthorizeHandler {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn handle(&self, ctx: &mut AuthorizeContext, _cancel: &CancellationToken) -> StageResult {
        let grant = ctx.items.grant.ok_or_else(|| {
            PipelineError::capability_unmet("grant not derived; AuthorizeMainValidator must run first")
        })?;

        match grant {
            GrantKind::Code => {}
            GrantKind::Implicit | GrantKind::Hybrid => {
                // Extension point: front-channel token delivery is not
                // implemented in this engine.
                return Err(PipelineError::stage(
                    STAGE,
                    AuthError::internal(format!("{grant} flow is not implemented")),
                ));
            }
        }

        let client_id = ctx.assert_client()?.client_id.clone();
        let redirect_uri = ctx.assert_redirect_uri()?.to_string();
        let granted_scopes = ctx.assert_resources()?.scope_names();

        let subject_id = ctx.subject.subject_id.clone().ok_or_else(|| {
            PipelineError::capability_unmet(
                "subject not authenticated; the login gate must run first",
            )
        })?;

        let now = OffsetDateTime::now_utc();
        let lifetime =
            Duration::seconds(self.config.authorization_code_lifetime.as_secs() as i64);

        let record = AuthorizationCode {
            id: Uuid::new_v4(),
            client_id: client_id.clone(),
            subject_id,
            granted_scopes: granted_scopes.clone(),
            redirect_uri: redirect_uri.clone(),
            nonce: ctx.nonce.clone(),
            code_challenge: ctx.code_challenge.clone(),
            code_challenge_method: ctx.code_challenge_method,
            state_hash: ctx.items.state_hash.clone(),
            session_id: ctx.subject.session_id.clone(),
            created_at: now,
            expires_at: now + lifetime,
        };

        let code = self
            .codes
            .store(record)
            .await
            .map_err(|e| PipelineError::stage(STAGE, e))?;

        let session_state = match ctx.subject.session_id.as_deref() {
            Some(session_id) => {
                let origin = redirect_origin(&redirect_uri)
                    .map_err(|e| PipelineError::stage(STAGE, e))?;
                Some(compute_session_state(&client_id, &origin, session_id))
            }
            None => None,
        };

        tracing::info!(client_id = %client_id, scopes = granted_scopes.len(), "authorization code issued");

        ctx.set_outcome(
            STAGE,
            AuthorizeOutcome::Success(AuthorizeSuccess {
                redirect_uri,
                response_mode: ctx.effective_response_mode(),
                code,
                state: ctx.state.clone(),
                scope: granted_scopes.join(" "),
                session_state,
            }),
        )
    }
}

/// Extracts `scheme://host[:port]` from the validated redirect URI.
fn redirect_origin(redirect_uri: &str) -> Result<String, AuthError> {
    let url = url::Url::parse(redirect_uri)
        .map_err(|e| AuthError::internal(format!("validated redirect URI failed to parse: {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| AuthError::internal("validated redirect URI has no host"))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Computes the `session_state` value for front-channel session monitoring:
/// `base64url(sha256(client_id + origin + session_id + salt)) + "." + salt`.
fn compute_session_state(client_id: &str, origin: &str, session_id: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut salt_bytes);
    let salt = URL_SAFE_NO_PAD.encode(salt_bytes);

    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(origin.as_bytes());
    hasher.update(session_id.as_bytes());
    hasher.update(salt.as_bytes());
    let hash = URL_SAFE_NO_PAD.encode(hasher.finalize());

    format!("{hash}.{salt}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use crate::stages::tests_support::{make_client, make_resources};
    use crate::storage::InMemoryCodeStore;
    use crate::subject::Subject;
    use crate::types::flow::{PkceMethod, ResponseMode};

    fn subject() -> Subject {
        Subject::authenticated("alice", OffsetDateTime::now_utc(), "local", "sess-1")
    }

    fn context() -> AuthorizeContext {
        let mut ctx = AuthorizeContext::new(subject(), Parameters::new());
        ctx.set_client(make_client());
        ctx.set_redirect_uri("https://app.example.com/cb".to_string());
        ctx.set_resources(make_resources());
        ctx.items.grant = Some(GrantKind::Code);
        ctx.state = Some("af0ifjsldkj".to_string());
        ctx.nonce = Some("n-0S6_WzA2Mj".to_string());
        ctx.code_challenge = Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string());
        ctx.code_challenge_method = Some(PkceMethod::S256);
        ctx.items.state_hash = Some("hash".to_string());
        ctx
    }

    fn handler(store: Arc<InMemoryCodeStore>) -> AuthorizeHandler {
        AuthorizeHandler::new(store, Arc::new(AuthorizeConfig::default()))
    }

    #[tokio::test]
    async fn test_code_flow_success() {
        let store = Arc::new(InMemoryCodeStore::new());
        let mut ctx = context();

        handler(store.clone())
            .handle(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();

        let success = match ctx.outcome().unwrap() {
            AuthorizeOutcome::Success(success) => success.clone(),
            other => panic!("expected success, got {other:?}"),
        };

        assert_eq!(success.redirect_uri, "https://app.example.com/cb");
        assert_eq!(success.response_mode, ResponseMode::Query);
        assert_eq!(success.state.as_deref(), Some("af0ifjsldkj"));
        assert_eq!(success.scope, "openid profile api1.read");
        assert_eq!(success.code.len(), 43);

        // session_state is present and carries its salt.
        let session_state = success.session_state.unwrap();
        assert!(session_state.contains('.'));

        // The stored record captured the decision fields.
        let record = store.get(&success.code).unwrap();
        assert_eq!(record.client_id, "web-app");
        assert_eq!(record.subject_id, "alice");
        assert_eq!(record.redirect_uri, "https://app.example.com/cb");
        assert_eq!(record.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
        assert_eq!(
            record.code_challenge.as_deref(),
            Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM")
        );
        assert_eq!(record.code_challenge_method, Some(PkceMethod::S256));
        assert_eq!(record.state_hash.as_deref(), Some("hash"));
        assert_eq!(record.session_id.as_deref(), Some("sess-1"));
        assert_eq!(record.granted_scopes, vec!["openid", "profile", "api1.read"]);
        assert_eq!(record.expires_at - record.created_at, Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_no_session_means_no_session_state() {
        let mut ctx = context();
        ctx.subject.session_id = None;

        handler(Arc::new(InMemoryCodeStore::new()))
            .handle(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();

        match ctx.outcome().unwrap() {
            AuthorizeOutcome::Success(success) => assert!(success.session_state.is_none()),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_implicit_grant_is_declared_unimplemented() {
        let mut ctx = context();
        ctx.items.grant = Some(GrantKind::Implicit);

        let result = handler(Arc::new(InMemoryCodeStore::new()))
            .handle(&mut ctx, &CancellationToken::new())
            .await;

        match result {
            Err(PipelineError::Stage { stage, .. }) => assert_eq!(stage, STAGE),
            other => panic!("expected stage error, got {other:?}"),
        }
        assert!(ctx.outcome().is_none());
    }

    #[tokio::test]
    async fn test_anonymous_subject_is_internal_fault() {
        let mut ctx = context();
        ctx.subject = Subject::anonymous();

        let result = handler(Arc::new(InMemoryCodeStore::new()))
            .handle(&mut ctx, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::CapabilityUnmet { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_grant_is_internal_fault() {
        let mut ctx = context();
        ctx.items.grant = None;

        let result = handler(Arc::new(InMemoryCodeStore::new()))
            .handle(&mut ctx, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::CapabilityUnmet { .. })
        ));
    }

    #[test]
    fn test_redirect_origin() {
        assert_eq!(
            redirect_origin("https://app.example.com/cb?x=1").unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            redirect_origin("https://app.example.com:8443/cb").unwrap(),
            "https://app.example.com:8443"
        );
        assert!(redirect_origin("not a url").is_err());
    }

    #[test]
    fn test_session_state_shape_and_salt_uniqueness() {
        let a = compute_session_state("web-app", "https://app.example.com", "sess-1");
        let b = compute_session_state("web-app", "https://app.example.com", "sess-1");

        // hash "." salt: 43-char hash, 22-char salt.
        let (hash, salt) = a.split_once('.').unwrap();
        assert_eq!(hash.len(), 43);
        assert_eq!(salt.len(), 22);

        // Fresh salt every time.
        assert_ne!(a, b);
    }
}
