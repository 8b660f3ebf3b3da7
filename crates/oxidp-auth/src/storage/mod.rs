//! Collaborator interfaces consumed by the pipeline stages.
//!
//! The engine never talks to persistence directly; every store lookup goes
//! through one of these traits. Implementations must tolerate many
//! concurrent pipeline invocations: reads dominate, writes (consent
//! updates) are rare and must not corrupt concurrent reads. Timeouts and
//! retries belong to the implementations, never to the pipeline.

pub mod memory;

use async_trait::async_trait;

use crate::AuthResult;
use crate::subject::Subject;
use crate::types::client::Client;
use crate::types::code::AuthorizationCode;
use crate::types::consent::ConsentRecord;
use crate::types::resources::Resources;

pub use memory::{
    AlwaysActiveProfileService, InMemoryClientStore, InMemoryCodeStore, InMemoryConsentStore,
    InMemoryResourceStore,
};

/// Lookup of registered clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds an enabled client by its identifier.
    ///
    /// Returns `None` for unknown clients and for known-but-disabled ones;
    /// callers cannot distinguish the two, which keeps the error surface
    /// identical for both.
    async fn find_enabled_client_by_id(&self, client_id: &str) -> AuthResult<Option<Client>>;
}

/// Resolution of scope names into the resource partition.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Partitions the scope names into identity resources, API scopes, and
    /// their owning API resources; unrecognized names land in
    /// `missing_scopes`.
    async fn find_resources_by_scope(&self, names: &[String]) -> AuthResult<Resources>;
}

/// Persistence for remembered consent.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Fetches the consent record for a subject/client pair.
    async fn get(&self, subject_id: &str, client_id: &str) -> AuthResult<Option<ConsentRecord>>;

    /// Upserts a consent record.
    async fn put(&self, record: ConsentRecord) -> AuthResult<()>;

    /// Removes the consent record for a subject/client pair, if any.
    async fn remove(&self, subject_id: &str, client_id: &str) -> AuthResult<()>;
}

/// Profile/account status checks.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Returns `true` if the subject's account is active for this client.
    /// Inactive subjects are forced back through login.
    async fn is_active(&self, subject: &Subject, client: &Client) -> AuthResult<bool>;
}

/// Persistence for issued authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Stores the code record and returns the unguessable code value the
    /// client will redeem.
    async fn store(&self, code: AuthorizationCode) -> AuthResult<String>;
}
