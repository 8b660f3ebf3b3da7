//! Domain types for the authorize protocol engine.

pub mod client;
pub mod code;
pub mod consent;
pub mod flow;
pub mod resources;

pub use client::{Client, ClientValidationError};
pub use code::AuthorizationCode;
pub use consent::ConsentRecord;
pub use flow::{GrantKind, PkceMethod, PromptMode, ResponseMode, parse_response_type};
pub use resources::{ApiResource, ApiScope, IdentityResource, Resources};
