//! Consent gate.
//!
//! Runs after the login gate, so the subject is authenticated. Delegates to
//! the consent policy; when consent is required (explicitly via
//! `prompt=consent`, or by policy) the chain short-circuits with a
//! non-error "interaction required: consent" outcome.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{Decorator, Next, PipelineError, StageResult};
use tokio_util::sync::CancellationToken;

use crate::consent::ConsentService;
use crate::context::{AuthorizeContext, HasClient, HasPrompt, HasResources};
use crate::outcome::InteractionKind;
use crate::types::flow::PromptMode;

/// Stage name used in logs and errors.
const STAGE: &str = "ConsentDecorator";

/// Short-circuits to the consent page when consent is required.
pub struct ConsentDecorator {
    consent: Arc<ConsentService>,
}

impl ConsentDecorator {
    /// Creates the stage over the given consent policy.
    #[must_use]
    pub fn new(consent: Arc<ConsentService>) -> Self {
        Self { consent }
    }
}

#[async_trait]
impl Decorator<AuthorizeContext> for ConsentDecorator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn decorate(
        &self,
        ctx: &mut AuthorizeContext,
        next: Next<'_, AuthorizeContext>,
        cancel: &CancellationToken,
    ) -> StageResult {
        if !ctx.subject.is_authenticated() {
            return Err(PipelineError::capability_unmet(
                "consent gate requires an authenticated subject; the login gate must run first",
            ));
        }

        let prompted = ctx
            .prompt_modes()
            .iter()
            .any(|mode| *mode == PromptMode::Consent);

        let required = if prompted {
            true
        } else {
            let client = ctx.assert_client()?;
            let resources = ctx.assert_resources()?;
            self.consent
                .requires_consent(&ctx.subject, client, resources)
                .await
                .map_err(|e| PipelineError::stage(STAGE, e))?
        };

        if required {
            tracing::debug!(client_id = ?ctx.client_id, prompted, "consent required");
            if prompted {
                ctx.suppress_prompt();
            }
            return ctx.require_interaction(STAGE, InteractionKind::Consent);
        }

        next.run(ctx, cancel).await
    }
}
