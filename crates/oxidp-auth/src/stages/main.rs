//! Core request-shape validation.
//!
//! Runs once the client is resolved and the redirect URI is trusted, so
//! every failure here is safe to deliver as a redirect carrying `error` and
//! `error_description`. Validates `response_type` against the client's
//! allowed grants, response-mode compatibility, scope/state presence and
//! length limits, and parses the remaining OpenID Connect parameters into
//! the context's decision fields.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{StageResult, Validator};
use tokio_util::sync::CancellationToken;

use crate::config::AuthorizeConfig;
use crate::context::{AuthorizeContext, HasClient, HasOutcome, HasRawParameters};
use crate::outcome::AuthorizeErrorCode;
use crate::params::names;
use crate::types::flow::{GrantKind, PromptMode, ResponseMode, parse_response_type};

/// Stage name used in logs and errors.
const STAGE: &str = "AuthorizeMainValidator";

/// Validates the core request shape and populates the decision fields.
pub struct AuthorizeMainValidator {
    config: Arc<AuthorizeConfig>,
}

impl AuthorizeMainValidator {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: Arc<AuthorizeConfig>) -> Self {
        Self { config }
    }

    /// Fetches a single-valued parameter, rejecting repeats and values over
    /// the length limit. Returns `Ok(None)` when the caller should stop
    /// because the context was terminated.
    fn single_param(
        &self,
        ctx: &mut AuthorizeContext,
        key: &str,
        max_len: usize,
    ) -> Result<Option<Option<String>>, oxidp_pipeline::PipelineError> {
        if ctx.raw().is_repeated(key) {
            ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                format!("{key} must not be repeated"),
            )?;
            return Ok(None);
        }

        let value = ctx.raw().get(key).map(ToOwned::to_owned);
        if let Some(ref value) = value {
            if value.len() > max_len {
                ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    format!("{key} is too long"),
                )?;
                return Ok(None);
            }
        }

        Ok(Some(value))
    }
}

#[async_trait]
impl Validator<AuthorizeContext> for AuthorizeMainValidator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn validate(&self, ctx: &mut AuthorizeContext, _cancel: &CancellationToken) -> StageResult {
        let limits = self.config.input_lengths.clone();

        // State first: once recorded, later redirect errors echo it back.
        let Some(state) = self.single_param(ctx, names::STATE, limits.state)? else {
            return Ok(());
        };
        ctx.state = state;

        // response_type and the effective grant.
        let Some(response_type) = self.single_param(ctx, names::RESPONSE_TYPE, 100)? else {
            return Ok(());
        };
        let Some(response_type) = response_type else {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "response_type is missing",
            );
        };

        let grant = match parse_response_type(&response_type) {
            Ok(grant) => grant,
            Err(_) => {
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::UnsupportedResponseType,
                    "response_type is not supported",
                );
            }
        };

        {
            let client = ctx.assert_client()?;
            if !client.is_grant_allowed(grant) {
                let client_id = client.client_id.clone();
                tracing::info!(client_id = %client_id, grant = %grant, "grant not allowed for client");
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::UnauthorizedClient,
                    format!("client is not allowed to use the {grant} flow"),
                );
            }
        }

        ctx.response_type = Some(response_type);
        ctx.items.grant = Some(grant);

        // response_mode: optional, but must be known, enabled and
        // compatible with the grant when present.
        let Some(response_mode) = self.single_param(ctx, names::RESPONSE_MODE, 32)? else {
            return Ok(());
        };
        if let Some(mode) = response_mode {
            let mode = match ResponseMode::parse(&mode) {
                Ok(mode) => mode,
                Err(_) => {
                    return ctx.reject_redirect(
                        STAGE,
                        AuthorizeErrorCode::InvalidRequest,
                        "response_mode is not supported",
                    );
                }
            };

            if !self.config.is_response_mode_enabled(mode) {
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    "response_mode is not enabled on this server",
                );
            }

            if !mode.is_compatible_with(grant) {
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    format!("response_mode {mode} is not allowed for the {grant} flow"),
                );
            }

            ctx.response_mode = Some(mode);
        }

        // scope: required, bounded, deduplicated.
        let Some(scope) = self.single_param(ctx, names::SCOPE, limits.scope)? else {
            return Ok(());
        };
        let Some(scope) = scope else {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "scope is missing",
            );
        };

        let mut scopes: Vec<String> = Vec::new();
        for token in scope.split_whitespace() {
            if !scopes.iter().any(|s| s == token) {
                scopes.push(token.to_string());
            }
        }
        if scopes.is_empty() {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "scope is empty",
            );
        }

        ctx.items.is_openid_request = scopes.iter().any(|s| s == "openid");
        ctx.requested_scopes = scopes;

        // nonce: optional for the code flow, required when an id_token is
        // delivered in the front channel.
        let Some(nonce) = self.single_param(ctx, names::NONCE, limits.nonce)? else {
            return Ok(());
        };
        if nonce.is_none() && ctx.items.is_openid_request && grant != GrantKind::Code {
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "nonce is required for implicit and hybrid requests",
            );
        }
        ctx.nonce = nonce;

        // prompt: zero or more known modes; `none` tolerates no company.
        let Some(prompt) = self.single_param(ctx, names::PROMPT, 100)? else {
            return Ok(());
        };
        if let Some(prompt) = prompt {
            let mut modes = Vec::new();
            for token in prompt.split_whitespace() {
                match PromptMode::parse(token) {
                    Ok(mode) => {
                        if !modes.contains(&mode) {
                            modes.push(mode);
                        }
                    }
                    Err(_) => {
                        return ctx.reject_redirect(
                            STAGE,
                            AuthorizeErrorCode::InvalidRequest,
                            "prompt contains an unsupported value",
                        );
                    }
                }
            }
            if modes.contains(&PromptMode::None) && modes.len() > 1 {
                return ctx.reject_redirect(
                    STAGE,
                    AuthorizeErrorCode::InvalidRequest,
                    "prompt none must not be combined with other values",
                );
            }
            ctx.set_prompt_modes(modes);
        }

        // max_age: a non-negative integer number of seconds.
        let Some(max_age) = self.single_param(ctx, names::MAX_AGE, 20)? else {
            return Ok(());
        };
        if let Some(max_age) = max_age {
            match max_age.parse::<u64>() {
                Ok(secs) => ctx.max_age = Some(secs),
                Err(_) => {
                    return ctx.reject_redirect(
                        STAGE,
                        AuthorizeErrorCode::InvalidRequest,
                        "max_age must be a non-negative integer",
                    );
                }
            }
        }

        // Remaining hints: bounded free text.
        let Some(acr_values) = self.single_param(ctx, names::ACR_VALUES, limits.acr_values)? else {
            return Ok(());
        };
        if let Some(acr_values) = acr_values {
            ctx.acr_values = acr_values
                .split_whitespace()
                .map(ToOwned::to_owned)
                .collect();
        }

        let Some(login_hint) = self.single_param(ctx, names::LOGIN_HINT, limits.login_hint)? else {
            return Ok(());
        };
        ctx.login_hint = login_hint;

        let Some(ui_locales) = self.single_param(ctx, names::UI_LOCALES, limits.ui_locales)? else {
            return Ok(());
        };
        ctx.ui_locales = ui_locales;

        Ok(())
    }
}
