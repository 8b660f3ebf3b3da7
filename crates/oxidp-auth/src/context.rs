//! Per-request context and the capability views stages depend on.
//!
//! [`AuthorizeContext`] is the mutable state bag for one authorize request:
//! the untrusted raw parameters, the caller's principal, the decision fields
//! stages populate as they validate, and the write-once terminal outcome.
//!
//! Cross-cutting stages are written against narrow capability traits
//! ([`HasClient`], [`HasRedirectUri`], [`HasResources`], [`HasPrompt`])
//! rather than the concrete context type, so the same stage logic can serve
//! other endpoint flows that compose a different subset of capabilities.
//! Each capability's `assert_*` method converts "was this populated by an
//! earlier stage" into an explicit, descriptive internal failure instead of
//! a downstream `None` unwrap; the ordering contract is a pipeline
//! configuration contract, not statically checked.
//!
//! A field holds a value only once the stage that owns it has validated it:
//! `redirect_uri` is `None` until `RedirectUriValidator` accepted it, so a
//! populated field is a trusted field.

use oxidp_pipeline::{PipelineContext, PipelineError};

use crate::outcome::{
    AuthorizeErrorCode, AuthorizeErrorPage, AuthorizeErrorRedirect, AuthorizeOutcome,
    InteractionKind, InteractionRequired,
};
use crate::params::Parameters;
use crate::subject::Subject;
use crate::types::client::Client;
use crate::types::flow::{GrantKind, PkceMethod, PromptMode, ResponseMode};
use crate::types::resources::Resources;

// =============================================================================
// Capability views
// =============================================================================

/// Capability: access to the untrusted transport parameters.
pub trait HasRawParameters {
    /// The raw parameter collection.
    fn raw(&self) -> &Parameters;

    /// Mutable access, for stages that adjust the resume state.
    fn raw_mut(&mut self) -> &mut Parameters;
}

/// Capability: the resolved client registration.
pub trait HasClient {
    /// The client, once `LoadClient` resolved it.
    fn client(&self) -> Option<&Client>;

    /// Populates the client. Called exactly once, by `LoadClient`.
    fn set_client(&mut self, client: Client);

    /// Fails fast if no earlier stage populated the client.
    fn assert_client(&self) -> Result<&Client, PipelineError> {
        self.client().ok_or_else(|| {
            PipelineError::capability_unmet("client not resolved; LoadClient must run first")
        })
    }
}

/// Capability: the validated redirect URI.
pub trait HasRedirectUri {
    /// The redirect URI, once validated against the client registration.
    fn redirect_uri(&self) -> Option<&str>;

    /// Records the validated redirect URI.
    fn set_redirect_uri(&mut self, uri: String);

    /// Fails fast if no earlier stage validated the redirect URI.
    fn assert_redirect_uri(&self) -> Result<&str, PipelineError> {
        self.redirect_uri().ok_or_else(|| {
            PipelineError::capability_unmet(
                "redirect URI not validated; RedirectUriValidator must run first",
            )
        })
    }
}

/// Capability: the validated resource partition.
pub trait HasResources {
    /// The partition, once `RequestedResourcesValidator` produced it.
    fn resources(&self) -> Option<&Resources>;

    /// Records the validated partition.
    fn set_resources(&mut self, resources: Resources);

    /// Fails fast if no earlier stage validated the requested resources.
    fn assert_resources(&self) -> Result<&Resources, PipelineError> {
        self.resources().ok_or_else(|| {
            PipelineError::capability_unmet(
                "resources not validated; RequestedResourcesValidator must run first",
            )
        })
    }
}

/// Capability: the parsed `prompt` modes.
pub trait HasPrompt {
    /// Parsed prompt modes, in request order.
    fn prompt_modes(&self) -> &[PromptMode];

    /// Drops the `prompt` parameter from the parsed modes and from the raw
    /// parameters, so resumption after the interaction does not re-trigger
    /// the gate.
    fn suppress_prompt(&mut self);
}

/// Capability: the write-once terminal outcome.
pub trait HasOutcome {
    /// The terminal outcome, if any stage set one.
    fn outcome(&self) -> Option<&AuthorizeOutcome>;

    /// Sets the terminal outcome.
    ///
    /// The first stage to set it owns the result; a second write is a
    /// pipeline-configuration bug and fails fast.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ResponseOverwrite`] if an outcome is already set.
    fn set_outcome(
        &mut self,
        stage: &'static str,
        outcome: AuthorizeOutcome,
    ) -> Result<(), PipelineError>;

    /// Terminates with an error page: no redirect, no `Location` echoing
    /// unvalidated input. For failures before the redirect URI is trusted.
    fn reject_page(
        &mut self,
        stage: &'static str,
        error: AuthorizeErrorCode,
        description: impl Into<String>,
    ) -> Result<(), PipelineError>
    where
        Self: Sized,
    {
        let description = description.into();
        tracing::debug!(stage, error = %error, %description, "authorize request rejected");
        self.set_outcome(
            stage,
            AuthorizeOutcome::ErrorPage(AuthorizeErrorPage {
                error,
                error_description: Some(description),
            }),
        )
    }
}

// =============================================================================
// Decision items
// =============================================================================

/// Cross-stage handoff values not otherwise modeled on the context.
///
/// A small closed set of named optional fields; stages that produce a value
/// own its field, stages that consume it read it.
#[derive(Debug, Clone, Default)]
pub struct DecisionItems {
    /// Effective grant derived from `response_type`.
    pub grant: Option<GrantKind>,

    /// Whether `scope` contains `openid`.
    pub is_openid_request: bool,

    /// Whether the request asks for at least one API scope.
    pub is_api_resource_request: bool,

    /// Half-hash of `state` for the `s_hash` claim.
    pub state_hash: Option<String>,
}

// =============================================================================
// Authorize context
// =============================================================================

/// Mutable per-request state for the authorize endpoint.
///
/// Created by the hosting layer from the parsed parameters and the caller's
/// principal; mutated in place by each stage; discarded at request end
/// except for the values the handler persists into an issued code.
#[derive(Debug)]
pub struct AuthorizeContext {
    /// The caller's principal, possibly unauthenticated.
    pub subject: Subject,

    /// Untrusted transport parameters.
    raw: Parameters,

    /// Resolved client. Populated by `LoadClient`.
    client: Option<Client>,

    /// Client identifier as taken from the request by `LoadClient`.
    pub client_id: Option<String>,

    /// Redirect URI. Populated only after validation.
    redirect_uri: Option<String>,

    /// Raw `response_type` value, recorded by the main validator.
    pub response_type: Option<String>,

    /// Parsed `response_mode`, recorded by the main validator.
    pub response_mode: Option<ResponseMode>,

    /// Requested scope names, deduplicated, in request order.
    pub requested_scopes: Vec<String>,

    /// The `state` parameter.
    pub state: Option<String>,

    /// The `nonce` parameter.
    pub nonce: Option<String>,

    /// PKCE code challenge, recorded by the PKCE validator.
    pub code_challenge: Option<String>,

    /// PKCE challenge method, recorded by the PKCE validator.
    pub code_challenge_method: Option<PkceMethod>,

    /// Parsed prompt modes.
    prompt_modes: Vec<PromptMode>,

    /// Maximum session age in seconds, if requested.
    pub max_age: Option<u64>,

    /// Requested authentication context class references.
    pub acr_values: Vec<String>,

    /// The `login_hint` parameter.
    pub login_hint: Option<String>,

    /// The `ui_locales` parameter.
    pub ui_locales: Option<String>,

    /// Validated resource partition.
    resources: Option<Resources>,

    /// Cross-stage handoff values.
    pub items: DecisionItems,

    /// Terminal outcome. Write-once.
    response: Option<AuthorizeOutcome>,
}

impl AuthorizeContext {
    /// Creates a context from the parsed parameters and the caller's
    /// principal. Every decision field starts empty; stages populate them
    /// as they validate.
    #[must_use]
    pub fn new(subject: Subject, raw: Parameters) -> Self {
        Self {
            subject,
            raw,
            client: None,
            client_id: None,
            redirect_uri: None,
            response_type: None,
            response_mode: None,
            requested_scopes: Vec::new(),
            state: None,
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            prompt_modes: Vec::new(),
            max_age: None,
            acr_values: Vec::new(),
            login_hint: None,
            ui_locales: None,
            resources: None,
            items: DecisionItems::default(),
            response: None,
        }
    }

    /// Records the parsed prompt modes.
    pub fn set_prompt_modes(&mut self, modes: Vec<PromptMode>) {
        self.prompt_modes = modes;
    }

    /// Consumes the context, yielding the terminal outcome.
    #[must_use]
    pub fn into_outcome(self) -> Option<AuthorizeOutcome> {
        self.response
    }

    /// Terminates with a redirect error. Only callable once the redirect
    /// URI has been validated; the ordering contract is enforced through
    /// the capability assertion.
    pub fn reject_redirect(
        &mut self,
        stage: &'static str,
        error: AuthorizeErrorCode,
        description: impl Into<String>,
    ) -> Result<(), PipelineError> {
        let redirect_uri = self.assert_redirect_uri()?.to_string();
        let response_mode = self.effective_response_mode();
        let description = description.into();
        tracing::debug!(stage, error = %error, %description, "authorize request rejected");
        self.set_outcome(
            stage,
            AuthorizeOutcome::ErrorRedirect(AuthorizeErrorRedirect {
                redirect_uri,
                response_mode,
                error,
                error_description: Some(description),
                state: self.state.clone(),
            }),
        )
    }

    /// Terminates with an interaction-required outcome, carrying the
    /// current raw parameters as resume state.
    pub fn require_interaction(
        &mut self,
        stage: &'static str,
        kind: InteractionKind,
    ) -> Result<(), PipelineError> {
        tracing::debug!(stage, kind = ?kind, "interaction required");
        let resume = self.raw.clone();
        self.set_outcome(
            stage,
            AuthorizeOutcome::Interaction(InteractionRequired { kind, resume }),
        )
    }

    /// The response mode to deliver with: the requested one, or the
    /// grant's default, or `query` when no grant was derived yet.
    #[must_use]
    pub fn effective_response_mode(&self) -> ResponseMode {
        self.response_mode.unwrap_or_else(|| {
            self.items
                .grant
                .map_or(ResponseMode::Query, |grant| grant.default_response_mode())
        })
    }
}

impl PipelineContext for AuthorizeContext {
    fn has_response(&self) -> bool {
        self.response.is_some()
    }
}

impl HasOutcome for AuthorizeContext {
    fn outcome(&self) -> Option<&AuthorizeOutcome> {
        self.response.as_ref()
    }

    fn set_outcome(
        &mut self,
        stage: &'static str,
        outcome: AuthorizeOutcome,
    ) -> Result<(), PipelineError> {
        if self.response.is_some() {
            return Err(PipelineError::ResponseOverwrite { stage });
        }
        self.response = Some(outcome);
        Ok(())
    }
}

impl HasRawParameters for AuthorizeContext {
    fn raw(&self) -> &Parameters {
        &self.raw
    }

    fn raw_mut(&mut self) -> &mut Parameters {
        &mut self.raw
    }
}

impl HasClient for AuthorizeContext {
    fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    fn set_client(&mut self, client: Client) {
        self.client_id = Some(client.client_id.clone());
        self.client = Some(client);
    }
}

impl HasRedirectUri for AuthorizeContext {
    fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    fn set_redirect_uri(&mut self, uri: String) {
        self.redirect_uri = Some(uri);
    }
}

impl HasResources for AuthorizeContext {
    fn resources(&self) -> Option<&Resources> {
        self.resources.as_ref()
    }

    fn set_resources(&mut self, resources: Resources) {
        self.items.is_api_resource_request = !resources.api_scopes.is_empty();
        self.resources = Some(resources);
    }
}

impl HasPrompt for AuthorizeContext {
    fn prompt_modes(&self) -> &[PromptMode] {
        &self.prompt_modes
    }

    fn suppress_prompt(&mut self) {
        self.prompt_modes.clear();
        self.raw.remove(crate::params::names::PROMPT);
    }
}
