//! In-memory store implementations.
//!
//! Reference backends for tests and for embedders that do not need a
//! database. Reader-writer locks match the access pattern: lookups dominate,
//! mutation is rare.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::subject::Subject;
use crate::types::client::Client;
use crate::types::code::AuthorizationCode;
use crate::types::consent::ConsentRecord;
use crate::types::resources::{ApiResource, ApiScope, IdentityResource, Resources};

use super::{AuthorizationCodeStore, ClientStore, ConsentStore, ProfileService, ResourceStore};

/// In-memory client registry.
#[derive(Default)]
pub struct InMemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a client registration.
    pub fn add(&self, client: Client) {
        self.clients
            .write()
            .expect("client store lock poisoned")
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn find_enabled_client_by_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        let clients = self.clients.read().expect("client store lock poisoned");
        Ok(clients.get(client_id).filter(|c| c.enabled).cloned())
    }
}

/// In-memory resource registry.
#[derive(Default)]
pub struct InMemoryResourceStore {
    identity: RwLock<Vec<IdentityResource>>,
    api_scopes: RwLock<Vec<ApiScope>>,
    api_resources: RwLock<Vec<ApiResource>>,
}

impl InMemoryResourceStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an identity resource.
    pub fn add_identity_resource(&self, resource: IdentityResource) {
        self.identity
            .write()
            .expect("resource store lock poisoned")
            .push(resource);
    }

    /// Registers an API scope.
    pub fn add_api_scope(&self, scope: ApiScope) {
        self.api_scopes
            .write()
            .expect("resource store lock poisoned")
            .push(scope);
    }

    /// Registers an API resource.
    pub fn add_api_resource(&self, resource: ApiResource) {
        self.api_resources
            .write()
            .expect("resource store lock poisoned")
            .push(resource);
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn find_resources_by_scope(&self, names: &[String]) -> AuthResult<Resources> {
        let identity = self.identity.read().expect("resource store lock poisoned");
        let api_scopes = self.api_scopes.read().expect("resource store lock poisoned");
        let api_resources = self
            .api_resources
            .read()
            .expect("resource store lock poisoned");

        let mut resources = Resources::new();
        for name in names {
            if let Some(id) = identity.iter().find(|r| &r.name == name) {
                resources.identity_resources.push(id.clone());
            } else if let Some(scope) = api_scopes.iter().find(|s| &s.name == name) {
                resources.api_scopes.push(scope.clone());
                for api in api_resources.iter().filter(|a| a.scopes.contains(name)) {
                    if !resources.api_resources.iter().any(|r| r.name == api.name) {
                        resources.api_resources.push(api.clone());
                    }
                }
            } else {
                resources.push_missing(name.clone());
            }
        }

        Ok(resources)
    }
}

/// In-memory consent store keyed by subject/client pair.
#[derive(Default)]
pub struct InMemoryConsentStore {
    records: RwLock<HashMap<(String, String), ConsentRecord>>,
}

impl InMemoryConsentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStore for InMemoryConsentStore {
    async fn get(&self, subject_id: &str, client_id: &str) -> AuthResult<Option<ConsentRecord>> {
        let records = self.records.read().expect("consent store lock poisoned");
        Ok(records
            .get(&(subject_id.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn put(&self, record: ConsentRecord) -> AuthResult<()> {
        let mut records = self.records.write().expect("consent store lock poisoned");
        records.insert(
            (record.subject_id.clone(), record.client_id.clone()),
            record,
        );
        Ok(())
    }

    async fn remove(&self, subject_id: &str, client_id: &str) -> AuthResult<()> {
        let mut records = self.records.write().expect("consent store lock poisoned");
        records.remove(&(subject_id.to_string(), client_id.to_string()));
        Ok(())
    }
}

/// Profile service that reports every subject active.
#[derive(Default)]
pub struct AlwaysActiveProfileService;

#[async_trait]
impl ProfileService for AlwaysActiveProfileService {
    async fn is_active(&self, _subject: &Subject, _client: &Client) -> AuthResult<bool> {
        Ok(true)
    }
}

/// In-memory authorization code store.
#[derive(Default)]
pub struct InMemoryCodeStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl InMemoryCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a stored code record (token-endpoint side; exposed for
    /// tests).
    #[must_use]
    pub fn get(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes
            .read()
            .expect("code store lock poisoned")
            .get(code)
            .cloned()
    }

    /// Number of stored codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.read().expect("code store lock poisoned").len()
    }

    /// Returns `true` if no codes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryCodeStore {
    async fn store(&self, code: AuthorizationCode) -> AuthResult<String> {
        let value = AuthorizationCode::generate_code();
        let mut codes = self.codes.write().expect("code store lock poisoned");
        if codes.contains_key(&value) {
            // 256-bit collision; if this fires, the RNG is broken.
            return Err(AuthError::internal("authorization code collision"));
        }
        codes.insert(value.clone(), code);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::flow::GrantKind;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn client(enabled: bool) -> Client {
        Client {
            client_id: "web-app".to_string(),
            client_name: "Web App".to_string(),
            enabled,
            allowed_grant_types: vec![GrantKind::Code],
            redirect_uris: vec!["https://app.example.com/cb".to_string()],
            allowed_scopes: vec![],
            require_pkce: true,
            allow_plain_text_pkce: false,
            require_consent: false,
            allow_remember_consent: true,
            consent_lifetime: None,
            enable_local_login: true,
            identity_provider_restrictions: vec![],
            user_sso_lifetime: None,
        }
    }

    #[tokio::test]
    async fn test_client_store_filters_disabled() {
        let store = InMemoryClientStore::new();
        store.add(client(true));

        let found = store.find_enabled_client_by_id("web-app").await.unwrap();
        assert!(found.is_some());

        store.add(client(false));
        let found = store.find_enabled_client_by_id("web-app").await.unwrap();
        assert!(found.is_none());

        let found = store.find_enabled_client_by_id("other").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_resource_store_partitions() {
        let store = InMemoryResourceStore::new();
        store.add_identity_resource(IdentityResource::open_id());
        store.add_api_scope(ApiScope::new("api1.read"));
        store.add_api_resource(ApiResource::new("api1", vec!["api1.read".to_string()]));

        let resources = store
            .find_resources_by_scope(&[
                "openid".to_string(),
                "api1.read".to_string(),
                "bogus".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(resources.identity_resources.len(), 1);
        assert_eq!(resources.api_scopes.len(), 1);
        assert_eq!(resources.api_resources.len(), 1);
        assert_eq!(resources.missing_scopes, vec!["bogus"]);
        assert!(!resources.is_valid(3));
        assert!(resources.matched_count() == 2);
    }

    #[tokio::test]
    async fn test_resource_store_dedupes_api_resources() {
        let store = InMemoryResourceStore::new();
        store.add_api_scope(ApiScope::new("api1.read"));
        store.add_api_scope(ApiScope::new("api1.write"));
        store.add_api_resource(ApiResource::new(
            "api1",
            vec!["api1.read".to_string(), "api1.write".to_string()],
        ));

        let resources = store
            .find_resources_by_scope(&["api1.read".to_string(), "api1.write".to_string()])
            .await
            .unwrap();

        assert_eq!(resources.api_scopes.len(), 2);
        assert_eq!(resources.api_resources.len(), 1);
        assert!(resources.is_valid(2));
    }

    #[tokio::test]
    async fn test_consent_store_roundtrip() {
        let store = InMemoryConsentStore::new();
        assert!(store.get("alice", "web-app").await.unwrap().is_none());

        let record = ConsentRecord::new(
            "alice",
            "web-app",
            vec!["openid".to_string()],
            None,
        );
        store.put(record.clone()).await.unwrap();

        let stored = store.get("alice", "web-app").await.unwrap().unwrap();
        assert_eq!(stored.scopes, record.scopes);

        store.remove("alice", "web-app").await.unwrap();
        assert!(store.get("alice", "web-app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_store_returns_fresh_value() {
        let store = InMemoryCodeStore::new();
        let now = OffsetDateTime::now_utc();
        let record = AuthorizationCode {
            id: Uuid::new_v4(),
            client_id: "web-app".to_string(),
            subject_id: "alice".to_string(),
            granted_scopes: vec!["openid".to_string()],
            redirect_uri: "https://app.example.com/cb".to_string(),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            state_hash: None,
            session_id: None,
            created_at: now,
            expires_at: now + time::Duration::minutes(5),
        };

        let code = store.store(record.clone()).await.unwrap();
        assert_eq!(code.len(), 43);
        assert_eq!(store.len(), 1);

        let stored = store.get(&code).unwrap();
        assert_eq!(stored.client_id, "web-app");

        let second = store.store(record).await.unwrap();
        assert_ne!(code, second);
        assert_eq!(store.len(), 2);
    }
}
