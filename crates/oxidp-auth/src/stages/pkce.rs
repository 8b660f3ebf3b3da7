//! PKCE policy validation.
//!
//! Runs after client resolution and redirect-URI validation: the client's
//! PKCE policy gates the decision, and violations are safe to deliver as
//! redirect errors. Enforces challenge presence for clients that require
//! PKCE, the RFC 7636 challenge length bounds, and the `plain` method
//! opt-in.

use async_trait::async_trait;
use oxidp_pipeline::{StageResult, Validator};
use tokio_util::sync::CancellationToken;

use crate::config::{CODE_CHALLENGE_MAX_LENGTH, CODE_CHALLENGE_MIN_LENGTH};
use crate::context::{AuthorizeContext, HasClient, HasOutcome, HasRawParameters, HasRedirectUri};
use crate::outcome::AuthorizeErrorCode;
use crate::params::names;
use crate::types::flow::PkceMethod;

/// Stage name used in logs and errors.
const STAGE: &str = "PkceValidator";

/// Enforces the client's PKCE policy.
#[derive(Default)]
pub struct PkceValidator;

impl PkceValidator {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator<AuthorizeContext> for PkceValidator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn validate(&self, ctx: &mut AuthorizeContext, _cancel: &CancellationToken) -> StageResult {
        // Ordering contract: client policy gates PKCE, and failures are
        // delivered by redirect, so both capabilities must be populated.
        let client = ctx.assert_client()?;
        ctx.assert_redirect_uri()?;

        let require_pkce = client.require_pkce;
        let allow_plain = client.allow_plain_text_pkce;

        // PKCE binds authorization codes; grants that issue no code have
        // nothing to bind.
        let issues_code = ctx.items.grant.is_some_and(|grant| grant.issues_code());
        if !issues_code {
            return Ok(());
        }

        if ctx.raw().is_repeated(names::CODE_CHALLENGE)
            || ctx.raw().is_repeated(names::CODE_CHALLENGE_METHOD)
        {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "PKCE parameters must not be repeated",
            );
        }

        let challenge = ctx.raw().get(names::CODE_CHALLENGE).map(ToOwned::to_owned);
        let method = ctx
            .raw()
            .get(names::CODE_CHALLENGE_METHOD)
            .map(ToOwned::to_owned);

        let Some(challenge) = challenge else {
            if method.is_some() {
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    "code_challenge_method without code_challenge",
                );
            }
            if require_pkce {
                tracing::info!(client_id = ?ctx.client_id, "missing required code_challenge");
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    "code_challenge is required",
                );
            }
            return Ok(());
        };

        if challenge.len() < CODE_CHALLENGE_MIN_LENGTH || challenge.len() > CODE_CHALLENGE_MAX_LENGTH
        {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "code_challenge length must be between 43 and 128 characters",
            );
        }

        // RFC 7636 section 4.3: absent method means `plain`.
        let method = match method.as_deref() {
            None => PkceMethod::default(),
            Some(raw) => match PkceMethod::parse(raw) {
                Ok(method) => method,
                Err(_) => {
                    return ctx.reject_redirect(
                        STAGE,
                        AuthorizeErrorCode::InvalidRequest,
                        "transform algorithm not supported",
                    );
                }
            },
        };

        if method == PkceMethod::Plain && !allow_plain {
            tracing::info!(client_id = ?ctx.client_id, "plain code_challenge_method not allowed");
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "plain code_challenge_method is not allowed for this client",
            );
        }

        ctx.code_challenge = Some(challenge);
        ctx.code_challenge_method = Some(method);
        Ok(())
    }
}
