//! State hashing.
//!
//! When the request carries `state`, computes its OpenID Connect half-hash
//! with the hash family of the realm's active signing credential and
//! stashes it for the handler, which persists it into the authorization
//! code for the eventual `s_hash` claim.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{Decorator, Next, StageResult};
use tokio_util::sync::CancellationToken;

use crate::context::AuthorizeContext;
use crate::signing::SigningKeyCache;

/// Stage name used in logs and errors.
const STAGE: &str = "StateHashDecorator";

/// Computes the `s_hash` input for issued codes.
pub struct StateHashDecorator {
    signing: Arc<SigningKeyCache>,
}

impl StateHashDecorator {
    /// Creates the stage over the signing-credential cache.
    #[must_use]
    pub fn new(signing: Arc<SigningKeyCache>) -> Self {
        Self { signing }
    }
}

#[async_trait]
impl Decorator<AuthorizeContext> for StateHashDecorator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn decorate(
        &self,
        ctx: &mut AuthorizeContext,
        next: Next<'_, AuthorizeContext>,
        cancel: &CancellationToken,
    ) -> StageResult {
        if let Some(state) = ctx.state.as_deref() {
            let credential = self.signing.active();
            ctx.items.state_hash = Some(credential.algorithm.half_hash(state));
            tracing::trace!(stage = STAGE, algorithm = %credential.algorithm, "state hashed");
        }

        next.run(ctx, cancel).await
    }
}
