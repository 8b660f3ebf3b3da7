//! The authorize decision pipeline.
//!
//! Stage order is a security contract, not a style choice:
//!
//! 1. [`LoadClient`]: resolve the client; failures are page errors
//! 2. [`RedirectUriValidator`]: establish redirect trust; page errors
//! 3. [`AuthorizeMainValidator`]: request shape; redirect errors from here on
//! 4. [`PkceValidator`]: client PKCE policy
//! 5. [`RequestedResourcesValidator`]: scope resolution and entitlement
//! 6. [`PromptLoginDecorator`]: session freshness and login forcing
//! 7. [`ConsentDecorator`]: consent policy
//! 8. [`StateHashDecorator`]: `s_hash` input
//! 9. [`AuthorizeHandler`]: code issuance
//!
//! Moving a stage earlier than its dependencies is caught at runtime by the
//! capability assertions; moving error delivery across the redirect-trust
//! boundary is the vulnerability class this ordering exists to prevent.

mod consent;
mod handler;
mod load_client;
mod main;
mod pkce;
mod prompt_login;
mod redirect_uri;
mod resources;
mod state_hash;

pub use consent::ConsentDecorator;
pub use handler::AuthorizeHandler;
pub use load_client::LoadClient;
pub use main::AuthorizeMainValidator;
pub use pkce::PkceValidator;
pub use prompt_login::PromptLoginDecorator;
pub use redirect_uri::RedirectUriValidator;
pub use resources::RequestedResourcesValidator;
pub use state_hash::StateHashDecorator;

use std::sync::Arc;

use oxidp_pipeline::{Dispatcher, Pipeline, PipelineBuilder, PipelineError};

use crate::config::AuthorizeConfig;
use crate::consent::ConsentService;
use crate::context::AuthorizeContext;
use crate::signing::SigningKeyCache;
use crate::storage::{AuthorizationCodeStore, ClientStore, ProfileService, ResourceStore};

/// Collaborators and configuration the authorize pipeline is built from.
pub struct AuthorizeServices {
    /// Client registrations.
    pub clients: Arc<dyn ClientStore>,
    /// Scope-to-resource resolution.
    pub resources: Arc<dyn ResourceStore>,
    /// Consent decision policy.
    pub consent: Arc<ConsentService>,
    /// Account status checks.
    pub profile: Arc<dyn ProfileService>,
    /// Authorization code persistence.
    pub codes: Arc<dyn AuthorizationCodeStore>,
    /// Active signing credential, for `s_hash`.
    pub signing: Arc<SigningKeyCache>,
    /// Engine configuration.
    pub config: Arc<AuthorizeConfig>,
}

/// Compiles the authorize pipeline in its canonical order.
///
/// # Errors
///
/// Configuration errors from the builder (they indicate a bug in this
/// function and fail startup).
pub fn build_authorize_pipeline(
    services: &AuthorizeServices,
) -> Result<Pipeline<AuthorizeContext>, PipelineError> {
    PipelineBuilder::new()
        .decorator(LoadClient::new(
            services.clients.clone(),
            services.config.clone(),
        ))
        .validator(RedirectUriValidator::new(services.config.clone()))
        .validator(AuthorizeMainValidator::new(services.config.clone()))
        .validator(PkceValidator::new())
        .validator(RequestedResourcesValidator::new(
            services.resources.clone(),
            services.config.clone(),
        ))
        .decorator(PromptLoginDecorator::new(services.profile.clone()))
        .decorator(ConsentDecorator::new(services.consent.clone()))
        .decorator(StateHashDecorator::new(services.signing.clone()))
        .handler(AuthorizeHandler::new(
            services.codes.clone(),
            services.config.clone(),
        ))
        .build()
}

/// Builds the dispatcher routing every protocol context type this crate
/// ships. Currently: the authorize flow.
///
/// # Errors
///
/// Configuration errors from pipeline compilation or registration.
pub fn build_dispatcher(services: &AuthorizeServices) -> Result<Dispatcher, PipelineError> {
    Dispatcher::builder()
        .register(build_authorize_pipeline(services)?)
        .build()
}

#[cfg(test)]
pub(crate) mod tests_support {
    //! Shared fixtures for stage tests.

    use async_trait::async_trait;
    use oxidp_pipeline::{Handler, StageResult};
    use tokio_util::sync::CancellationToken;

    use crate::context::{AuthorizeContext, HasOutcome};
    use crate::outcome::AuthorizeErrorCode;
    use crate::storage::InMemoryResourceStore;
    use crate::types::client::Client;
    use crate::types::flow::GrantKind;
    use crate::types::resources::{ApiResource, ApiScope, IdentityResource, Resources};

    /// Terminal stage for tests that must short-circuit before it.
    pub(crate) struct PanicHandler;

    #[async_trait]
    impl Handler<AuthorizeContext> for PanicHandler {
        async fn handle(
            &self,
            _ctx: &mut AuthorizeContext,
            _cancel: &CancellationToken,
        ) -> StageResult {
            panic!("terminal handler reached; an earlier stage should have terminated");
        }
    }

    /// Terminal stage that records its own execution through a marker
    /// outcome.
    pub(crate) struct MarkerHandler;

    #[async_trait]
    impl Handler<AuthorizeContext> for MarkerHandler {
        async fn handle(
            &self,
            ctx: &mut AuthorizeContext,
            _cancel: &CancellationToken,
        ) -> StageResult {
            ctx.reject_page(
                "MarkerHandler",
                AuthorizeErrorCode::ServerError,
                "marker handler reached",
            )
        }
    }

    /// A code-flow client with strict PKCE and consent enabled.
    pub(crate) fn make_client() -> Client {
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

    /// Resource registry with `openid`, `profile`, and `api1.read`.
    pub(crate) fn make_resource_store() -> InMemoryResourceStore {
        let store = InMemoryResourceStore::new();
        store.add_identity_resource(IdentityResource::open_id());
        store.add_identity_resource(IdentityResource::new("profile"));
        store.add_api_scope(ApiScope::new("api1.read"));
        store.add_api_resource(ApiResource::new("api1", vec!["api1.read".to_string()]));
        store
    }

    /// The partition `make_resource_store` yields for
    /// `openid profile api1.read`.
    pub(crate) fn make_resources() -> Resources {
        Resources {
            identity_resources: vec![
                IdentityResource::open_id(),
                IdentityResource::new("profile"),
            ],
            api_scopes: vec![ApiScope::new("api1.read")],
            api_resources: vec![ApiResource::new("api1", vec!["api1.read".to_string()])],
            missing_scopes: vec![],
        }
    }

}
