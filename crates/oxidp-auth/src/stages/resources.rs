//! Requested-resource validation.
//!
//! Resolves the requested scopes through the [`ResourceStore`] into
//! identity resources, API scopes, and their owning API resources, then
//! filters the partition by the client's scope entitlement. Scopes that are
//! unknown or disallowed land in `missing_scopes`; depending on policy the
//! request fails or proceeds with the recognized subset.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{PipelineError, StageResult, Validator};
use tokio_util::sync::CancellationToken;

use crate::config::AuthorizeConfig;
use crate::context::{AuthorizeContext, HasClient, HasOutcome, HasResources};
use crate::outcome::AuthorizeErrorCode;
use crate::storage::ResourceStore;
use crate::types::resources::Resources;

/// Stage name used in logs and errors.
const STAGE: &str = "RequestedResourcesValidator";

/// Resolves and validates the requested scopes.
pub struct RequestedResourcesValidator {
    resources: Arc<dyn ResourceStore>,
    config: Arc<AuthorizeConfig>,
}

impl RequestedResourcesValidator {
    /// Creates the stage over the given resource store.
    #[must_use]
    pub fn new(resources: Arc<dyn ResourceStore>, config: Arc<AuthorizeConfig>) -> Self {
        Self { resources, config }
    }
}

/// Moves scopes the client is not entitled to from the recognized buckets
/// into `missing_scopes`, and drops API resources left without any kept
/// scope.
fn apply_client_entitlement(partition: &mut Resources, ctx: &AuthorizeContext) {
    let Some(client) = ctx.client() else {
        return;
    };

    let mut disallowed: Vec<String> = Vec::new();

    partition.identity_resources.retain(|resource| {
        let keep = client.is_scope_allowed(&resource.name);
        if !keep {
            disallowed.push(resource.name.clone());
        }
        keep
    });

    partition.api_scopes.retain(|scope| {
        let keep = client.is_scope_allowed(&scope.name);
        if !keep {
            disallowed.push(scope.name.clone());
        }
        keep
    });

    let kept_scope_names: Vec<String> = partition.api_scopes.iter().map(|s| s.name.clone()).collect();
    partition
        .api_resources
        .retain(|api| api.scopes.iter().any(|s| kept_scope_names.contains(s)));

    for scope in disallowed {
        partition.push_missing(scope);
    }
}

#[async_trait]
impl Validator<AuthorizeContext> for RequestedResourcesValidator {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn validate(&self, ctx: &mut AuthorizeContext, _cancel: &CancellationToken) -> StageResult {
        ctx.assert_client()?;

        let requested = ctx.requested_scopes.clone();
        let mut partition = self
            .resources
            .find_resources_by_scope(&requested)
            .await
            .map_err(|e| PipelineError::stage(STAGE, e))?;

        apply_client_entitlement(&mut partition, ctx);

        if partition.is_empty() {
            tracing::info!(
                client_id = ?ctx.client_id,
                missing = ?partition.missing_scopes,
                "client entitled to none of the requested scopes"
            );
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidScope,
                "no requested scope is valid for this client",
            );
        }

        if self.config.require_full_scope_validity && !partition.is_valid(requested.len()) {
            let missing = partition.missing_scopes.join(" ");
            return ctx.reject_redirect(
                STAGE,
                AuthorizeErrorCode::InvalidScope,
                format!("invalid scopes requested: {missing}"),
            );
        }

        ctx.set_resources(partition);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HasRedirectUri;
    use crate::outcome::AuthorizeOutcome;
    use crate::params::Parameters;
    use crate::stages::tests_support::{make_client, make_resource_store};
    use crate::subject::Subject;
    use crate::types::client::Client;

    async fn run_with(
        scopes: Vec<&str>,
        client: Client,
        config: AuthorizeConfig,
    ) -> AuthorizeContext {
        let mut ctx = AuthorizeContext::new(Subject::anonymous(), Parameters::new());
        ctx.set_client(client);
        ctx.set_redirect_uri("https://app.example.com/cb".to_string());
        ctx.requested_scopes = scopes.iter().map(ToString::to_string).collect();

        let stage =
            RequestedResourcesValidator::new(Arc::new(make_resource_store()), Arc::new(config));
        stage
            .validate(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();
        ctx
    }

    async fn run(scopes: Vec<&str>) -> AuthorizeContext {
        run_with(scopes, make_client(), AuthorizeConfig::default()).await
    }

    #[tokio::test]
    async fn test_full_partition() {
        let ctx = run(vec!["openid", "profile", "api1.read"]).await;

        assert!(ctx.outcome().is_none());
        let resources = ctx.resources().unwrap();
        assert_eq!(resources.identity_resources.len(), 2);
        assert_eq!(resources.api_scopes.len(), 1);
        assert_eq!(resources.api_resources.len(), 1);
        assert!(resources.missing_scopes.is_empty());
        assert!(resources.is_valid(3));
        assert!(ctx.items.is_api_resource_request);
    }

    #[tokio::test]
    async fn test_identity_only_request() {
        let ctx = run(vec!["openid"]).await;

        assert!(ctx.outcome().is_none());
        assert!(!ctx.items.is_api_resource_request);
    }

    #[tokio::test]
    async fn test_unknown_scope_fails_under_full_validity() {
        let ctx = run(vec!["openid", "telepathy"]).await;

        match ctx.outcome().unwrap() {
            AuthorizeOutcome::ErrorRedirect(err) => {
                assert_eq!(err.error, AuthorizeErrorCode::InvalidScope);
                assert!(
                    err.error_description
                        .as_deref()
                        .unwrap_or_default()
                        .contains("telepathy")
                );
            }
            other => panic!("expected redirect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_scope_tolerated_under_partial_validity() {
        let ctx = run_with(
            vec!["openid", "telepathy"],
            make_client(),
            AuthorizeConfig::default().with_partial_scope_validity(),
        )
        .await;

        assert!(ctx.outcome().is_none());
        let resources = ctx.resources().unwrap();
        assert_eq!(resources.missing_scopes, vec!["telepathy"]);
        assert_eq!(resources.matched_count(), 1);
    }

    #[tokio::test]
    async fn test_entitlement_filters_disallowed_scopes() {
        let mut client = make_client();
        client.allowed_scopes = vec!["openid".to_string()];

        let ctx = run_with(
            vec!["openid", "api1.read"],
            client,
            AuthorizeConfig::default().with_partial_scope_validity(),
        )
        .await;

        let resources = ctx.resources().unwrap();
        assert_eq!(resources.identity_resources.len(), 1);
        assert!(resources.api_scopes.is_empty());
        // The API resource lost its only kept scope and is dropped.
        assert!(resources.api_resources.is_empty());
        assert_eq!(resources.missing_scopes, vec!["api1.read"]);
    }

    #[tokio::test]
    async fn test_no_valid_scope_at_all_is_invalid_scope() {
        let mut client = make_client();
        client.allowed_scopes = vec!["something-else".to_string()];

        let ctx = run_with(
            vec!["openid", "api1.read"],
            client,
            AuthorizeConfig::default().with_partial_scope_validity(),
        )
        .await;

        assert_eq!(
            ctx.outcome().unwrap().error_code(),
            Some(AuthorizeErrorCode::InvalidScope)
        );
    }
}
