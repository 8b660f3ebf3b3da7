//! Client resolution stage.
//!
//! First stage of every protocol pipeline. Resolves the client named by
//! `client_id` through the [`ClientStore`] and populates the `HasClient`
//! capability for everything downstream. Failures terminate with a
//! non-redirect `invalid_client` error: at this point no redirect URI is
//! trusted, so nothing may be delivered by redirect.
//!
//! Written against capability views, not the concrete context type, so the
//! same stage serves any endpoint flow that starts from a `client_id`.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{Decorator, Next, PipelineContext, PipelineError, StageResult};
use tokio_util::sync::CancellationToken;

use crate::config::AuthorizeConfig;
use crate::context::{HasClient, HasOutcome, HasRawParameters};
use crate::outcome::AuthorizeErrorCode;
use crate::params::names;
use crate::storage::ClientStore;

/// Stage name used in logs and errors.
const STAGE: &str = "LoadClient";

/// Resolves and validates the requesting client.
pub struct LoadClient {
    clients: Arc<dyn ClientStore>,
    config: Arc<AuthorizeConfig>,
}

impl LoadClient {
    /// Creates the stage over the given client store.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientStore>, config: Arc<AuthorizeConfig>) -> Self {
        Self { clients, config }
    }
}

#[async_trait]
impl<C> Decorator<C> for LoadClient
where
    C: PipelineContext + HasRawParameters + HasClient + HasOutcome,
{
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn decorate(&self, ctx: &mut C, next: Next<'_, C>, cancel: &CancellationToken) -> StageResult {
        if ctx.raw().is_repeated(names::CLIENT_ID) {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "client_id must not be repeated",
            );
        }

        let Some(client_id) = ctx.raw().get(names::CLIENT_ID).map(ToOwned::to_owned) else {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "client_id is missing",
            );
        };

        if client_id.is_empty() || client_id.len() > self.config.input_lengths.client_id {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "client_id is empty or too long",
            );
        }

        let client = self
            .clients
            .find_enabled_client_by_id(&client_id)
            .await
            .map_err(|e| PipelineError::stage(STAGE, e))?;

        let Some(client) = client else {
            tracing::info!(client_id = %client_id, "unknown or disabled client");
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidClient,
                "unknown or disabled client",
            );
        };

        tracing::debug!(client_id = %client.client_id, "client resolved");
        ctx.set_client(client);

        let result = next.run(ctx, cancel).await;

        // Post-continuation: runs even when an inner stage short-circuited.
        if let Some(outcome) = ctx.outcome() {
            tracing::debug!(
                client_id = %client_id,
                success = outcome.is_success(),
                interaction = outcome.is_interaction(),
                "authorize pipeline finished for client"
            );
        }

        result
    }
}
