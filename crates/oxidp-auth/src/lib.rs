//! # oxidp-auth
//!
//! OAuth 2.0 / OpenID Connect authorize-endpoint protocol engine for the
//! OxIdP authorization server.
//!
//! This crate implements the decision state machine behind the `authorize`
//! endpoint: whether to issue an authorization code, demand login or
//! consent, or reject the request, and how to deliver each outcome.
//!
//! ## Modules
//!
//! - [`config`] - Engine configuration (code lifetime, input limits)
//! - [`params`] - Transport parameter collection and parameter names
//! - [`subject`] - The caller's principal
//! - [`types`] - Domain types: clients, resources, consent, codes, flows
//! - [`context`] - Per-request context and capability views
//! - [`outcome`] - Terminal outcomes and their delivery taxonomy
//! - [`stages`] - The ordered authorize decision pipeline
//! - [`consent`] - Consent decision policy
//! - [`signing`] - Signing-credential metadata and `s_hash`
//! - [`encode`] - Query / fragment / form_post response encoders
//! - [`storage`] - Collaborator traits and in-memory backends
//! - [`error`] - Error taxonomy
//!
//! ## Flow
//!
//! The hosting layer parses the transport request into [`params::Parameters`],
//! attaches the caller's [`subject::Subject`], and dispatches the resulting
//! [`context::AuthorizeContext`] through the compiled pipeline:
//!
//! ```ignore
//! let services = AuthorizeServices { /* stores, policy, config */ };
//! let dispatcher = build_dispatcher(&services)?;
//!
//! let mut ctx = AuthorizeContext::new(subject, params);
//! dispatcher.dispatch(&mut ctx, &cancel).await?;
//!
//! let response = encode_outcome(
//!     ctx.outcome().expect("pipeline always terminates with an outcome"),
//!     &InteractionUrls::default(),
//! );
//! ```
//!
//! Stages run strictly sequentially per request; the first stage to set the
//! outcome owns it, and the engine fails fast on any second write.

pub mod config;
pub mod consent;
pub mod context;
pub mod encode;
pub mod error;
pub mod outcome;
pub mod params;
pub mod signing;
pub mod stages;
pub mod storage;
pub mod subject;
pub mod types;

pub use config::{AuthorizeConfig, InputLengthConfig};
pub use consent::ConsentService;
pub use context::{
    AuthorizeContext, DecisionItems, HasClient, HasOutcome, HasPrompt, HasRawParameters,
    HasRedirectUri, HasResources,
};
pub use encode::{InteractionUrls, encode_outcome};
pub use error::{AuthError, ErrorCategory};
pub use outcome::{
    AuthorizeErrorCode, AuthorizeErrorPage, AuthorizeErrorRedirect, AuthorizeOutcome,
    AuthorizeSuccess, InteractionKind, InteractionRequired,
};
pub use params::Parameters;
pub use signing::{SigningAlgorithm, SigningCredential, SigningKeyCache};
pub use stages::{AuthorizeServices, build_authorize_pipeline, build_dispatcher};
pub use storage::{
    AuthorizationCodeStore, ClientStore, ConsentStore, ProfileService, ResourceStore,
};
pub use subject::Subject;
pub use types::{
    ApiResource, ApiScope, AuthorizationCode, Client, ClientValidationError, ConsentRecord,
    GrantKind, IdentityResource, PkceMethod, PromptMode, ResponseMode, Resources,
};

/// Type alias for authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oxidp_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::AuthorizeConfig;
    pub use crate::consent::ConsentService;
    pub use crate::context::{
        AuthorizeContext, HasClient, HasOutcome, HasPrompt, HasRawParameters, HasRedirectUri,
        HasResources,
    };
    pub use crate::encode::{InteractionUrls, encode_outcome};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::outcome::{AuthorizeErrorCode, AuthorizeOutcome, InteractionKind};
    pub use crate::params::Parameters;
    pub use crate::stages::{AuthorizeServices, build_authorize_pipeline, build_dispatcher};
    pub use crate::storage::{
        AuthorizationCodeStore, ClientStore, ConsentStore, ProfileService, ResourceStore,
    };
    pub use crate::subject::Subject;
    pub use crate::types::{
        Client, GrantKind, PkceMethod, PromptMode, ResponseMode, Resources,
    };
}
