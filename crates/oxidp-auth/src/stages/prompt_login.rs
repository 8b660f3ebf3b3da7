//! Login gate.
//!
//! Decides whether the user must (re-)authenticate before the request can
//! proceed. The conditions are evaluated in strict precedence; the first
//! match wins and short-circuits the chain with a non-error
//! "interaction required: login" outcome:
//!
//! 1. `prompt` includes `login` or `select_account`
//! 2. subject unauthenticated, or the profile service reports it inactive
//! 3. the session's identity provider differs from a requested IdP hint
//! 4. `max_age` exceeded
//! 5. local session, but the client disallows local login
//! 6. external session outside the client's IdP allow-list
//! 7. session older than the client's user SSO lifetime
//!
//! For condition 1 the `prompt` parameter is removed from the raw
//! parameters before the resume state is captured, so resumption after
//! login does not re-trigger the gate.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{Decorator, Next, PipelineError, StageResult};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::context::{AuthorizeContext, HasClient, HasPrompt};
use crate::outcome::InteractionKind;
use crate::storage::ProfileService;

/// Stage name used in logs and errors.
const STAGE: &str = "PromptLoginDecorator";

/// Prefix marking an `acr_values` entry as an identity-provider hint.
const IDP_ACR_PREFIX: &str = "idp:";

/// Forces login when the session does not satisfy the request.
pub struct PromptLoginDecorator {
    profile: Arc<dyn ProfileService>,
}

/// Why login was forced. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginReason {
    PromptRequested,
    NotAuthenticated,
    Inactive,
    IdpHintMismatch,
    MaxAgeExceeded,
    LocalLoginDisallowed,
    IdpNotAllowed,
    SsoLifetimeExceeded,
}

impl PromptLoginDecorator {
    /// Creates the stage over the given profile service.
    #[must_use]
    pub fn new(profile: Arc<dyn ProfileService>) -> Self {
        Self { profile }
    }

    /// Evaluates the decision tree. Returns the first unmet condition.
    async fn login_reason(
        &self,
        ctx: &AuthorizeContext,
        now: OffsetDateTime,
    ) -> Result<Option<LoginReason>, PipelineError> {
        // (a) explicit prompt.
        if ctx.prompt_modes().iter().any(|mode| mode.forces_login()) {
            return Ok(Some(LoginReason::PromptRequested));
        }

        // (b) anonymous, or no longer active.
        if !ctx.subject.is_authenticated() {
            return Ok(Some(LoginReason::NotAuthenticated));
        }
        let client = ctx.assert_client()?;
        let active = self
            .profile
            .is_active(&ctx.subject, client)
            .await
            .map_err(|e| PipelineError::stage(STAGE, e))?;
        if !active {
            return Ok(Some(LoginReason::Inactive));
        }

        // (c) requested IdP differs from the session's.
        let idp_hint = ctx
            .acr_values
            .iter()
            .find_map(|acr| acr.strip_prefix(IDP_ACR_PREFIX));
        if let Some(hint) = idp_hint {
            if ctx.subject.idp.as_deref() != Some(hint) {
                return Ok(Some(LoginReason::IdpHintMismatch));
            }
        }

        // (d) session older than max_age. A session with no auth_time is
        // treated as stale.
        if let Some(max_age) = ctx.max_age {
            let fresh = ctx
                .subject
                .session_age(now)
                .is_some_and(|age| age.whole_seconds() >= 0 && age.whole_seconds() as u64 <= max_age);
            if !fresh {
                return Ok(Some(LoginReason::MaxAgeExceeded));
            }
        }

        // (e) local session, local login disallowed.
        if ctx.subject.is_local() && !client.enable_local_login {
            return Ok(Some(LoginReason::LocalLoginDisallowed));
        }

        // (f) external session outside the allow-list.
        if !ctx.subject.is_local() {
            if let Some(idp) = ctx.subject.idp.as_deref() {
                if !client.is_identity_provider_allowed(idp) {
                    return Ok(Some(LoginReason::IdpNotAllowed));
                }
            }
        }

        // (g) client SSO lifetime.
        if let Some(sso_lifetime) = client.user_sso_lifetime {
            let within = ctx
                .subject
                .session_age(now)
                .is_some_and(|age| age.whole_seconds() <= sso_lifetime);
            if !within {
                return Ok(Some(LoginReason::SsoLifetimeExceeded));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl Decorator<AuthorizeContext> for PromptLoginDecorator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn decorate(
        &self,
        ctx: &mut AuthorizeContext,
        next: Next<'_, AuthorizeContext>,
        cancel: &CancellationToken,
    ) -> StageResult {
        let now = OffsetDateTime::now_utc();

        if let Some(reason) = self.login_reason(ctx, now).await? {
            tracing::debug!(client_id = ?ctx.client_id, reason = ?reason, "forcing login");
            if reason == LoginReason::PromptRequested {
                ctx.suppress_prompt();
            }
            return ctx.require_interaction(STAGE, InteractionKind::Login);
        }

        next.run(ctx, cancel).await
    }
}
