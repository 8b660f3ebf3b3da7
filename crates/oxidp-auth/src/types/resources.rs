//! Resource model: identity resources, API scopes, API resources, and the
//! partition of a requested scope set.

use serde::{Deserialize, Serialize};

/// An identity resource: a named set of claims about the user
/// (e.g. `openid`, `profile`, `email`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResource {
    /// Scope name clients request.
    pub name: String,

    /// Human-readable display name for the consent page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Whether the resource cannot be deselected on the consent page.
    pub required: bool,
}

impl IdentityResource {
    /// Creates the `openid` identity resource.
    #[must_use]
    pub fn open_id() -> Self {
        Self {
            name: "openid".to_string(),
            display_name: Some("Your user identifier".to_string()),
            required: true,
        }
    }

    /// Creates an identity resource with the given scope name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            required: false,
        }
    }
}

/// An API scope: a named unit of API access clients request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiScope {
    /// Scope name clients request.
    pub name: String,

    /// Human-readable display name for the consent page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ApiScope {
    /// Creates an API scope with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }
}

/// An API resource: a protected API grouping one or more scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    /// Resource name (becomes a token audience).
    pub name: String,

    /// Names of the scopes belonging to this API.
    pub scopes: Vec<String>,
}

impl ApiResource {
    /// Creates an API resource covering the given scopes.
    #[must_use]
    pub fn new(name: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scopes,
        }
    }
}

/// Partition of a requested scope set into recognized resources and the
/// scopes nothing recognized.
///
/// The partition [`is_valid`](Self::is_valid) iff `missing_scopes` is empty
/// and every requested scope was counted into exactly one of the recognized
/// buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Identity resources matched by requested scopes.
    pub identity_resources: Vec<IdentityResource>,

    /// API scopes matched by requested scopes.
    pub api_scopes: Vec<ApiScope>,

    /// API resources owning the matched API scopes.
    pub api_resources: Vec<ApiResource>,

    /// Requested scopes that resolved to nothing, or that the client is not
    /// entitled to.
    pub missing_scopes: Vec<String>,
}

impl Resources {
    /// Creates an empty partition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requested scopes that resolved to a recognized resource.
    ///
    /// API resources are reached through their scopes and are not counted
    /// separately.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.identity_resources.len() + self.api_scopes.len()
    }

    /// Returns `true` if nothing was recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identity_resources.is_empty() && self.api_scopes.is_empty()
    }

    /// Returns `true` if the partition fully covers a request of
    /// `requested_count` scopes: no missing scopes, and every requested
    /// scope counted.
    #[must_use]
    pub fn is_valid(&self, requested_count: usize) -> bool {
        self.missing_scopes.is_empty() && self.matched_count() == requested_count
    }

    /// Names of every recognized scope, identity resources first.
    #[must_use]
    pub fn scope_names(&self) -> Vec<String> {
        self.identity_resources
            .iter()
            .map(|r| r.name.clone())
            .chain(self.api_scopes.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// Records a scope the store or the client entitlement rejected.
    pub fn push_missing(&mut self, scope: impl Into<String>) {
        self.missing_scopes.push(scope.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition() -> Resources {
        Resources {
            identity_resources: vec![IdentityResource::open_id(), IdentityResource::new("profile")],
            api_scopes: vec![ApiScope::new("api1.read")],
            api_resources: vec![ApiResource::new("api1", vec!["api1.read".to_string()])],
            missing_scopes: vec![],
        }
    }

    #[test]
    fn test_matched_count_excludes_api_resources() {
        let resources = partition();
        assert_eq!(resources.matched_count(), 3);
    }

    #[test]
    fn test_is_valid() {
        let resources = partition();
        assert!(resources.is_valid(3));
        assert!(!resources.is_valid(4));

        let mut with_missing = partition();
        with_missing.push_missing("unknown");
        assert!(!with_missing.is_valid(3));
        assert!(!with_missing.is_valid(4));
    }

    #[test]
    fn test_is_empty() {
        assert!(Resources::new().is_empty());
        assert!(!partition().is_empty());

        // API resources alone do not make a partition non-empty.
        let only_api_resource = Resources {
            api_resources: vec![ApiResource::new("api1", vec![])],
            ..Resources::new()
        };
        assert!(only_api_resource.is_empty());
    }

    #[test]
    fn test_scope_names_order() {
        let resources = partition();
        assert_eq!(resources.scope_names(), vec!["openid", "profile", "api1.read"]);
    }
}
