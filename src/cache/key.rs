//! Cache Key Module
//!
//! Logical key of a cached value: an identifier plus optional extra
//! parameters. Parameters are normalized (sorted) when the full key is built,
//! so insertion order never matters.

use std::fmt;

use serde::Serialize;

// == Cache Key ==
/// Identifier and extra parameters for a single cached value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheKey {
    /// Primary identifier, e.g. `restaurant:7` or `popular_items:7d`
    pub identifier: String,
    /// Extra parameters in caller order
    pub params: Vec<(String, String)>,
}

impl CacheKey {
    // == Constructor ==
    /// Creates a key with no extra parameters.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            params: Vec::new(),
        }
    }

    /// Adds an extra parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Returns the same key with a different identifier prefix, used by the
    /// two-level strategy to keep L1 and L2 entries apart.
    pub fn tiered(&self, tier: &str) -> Self {
        Self {
            identifier: format!("{}:{}", tier, self.identifier),
            params: self.params.clone(),
        }
    }

    /// Parameters sorted by name, then value.
    pub fn sorted_params(&self) -> Vec<(&str, &str)> {
        let mut params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        params.sort();
        params
    }
}

impl From<&str> for CacheKey {
    fn from(identifier: &str) -> Self {
        CacheKey::new(identifier)
    }
}

impl From<String> for CacheKey {
    fn from(identifier: String) -> Self {
        CacheKey::new(identifier)
    }
}

impl From<&String> for CacheKey {
    fn from(identifier: &String) -> Self {
        CacheKey::new(identifier.as_str())
    }
}

// == Entity Scope ==
/// Identifier token tying cached values to one entity, e.g. `restaurant:7`.
///
/// Keys that embed a scope token are cleared by scoped invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    pub kind: &'static str,
    pub id: String,
}

impl Scope {
    pub fn restaurant(id: impl ToString) -> Self {
        Self { kind: "restaurant", id: id.to_string() }
    }

    pub fn item(id: impl ToString) -> Self {
        Self { kind: "item", id: id.to_string() }
    }

    pub fn customer(id: impl ToString) -> Self {
        Self { kind: "customer", id: id.to_string() }
    }

    pub fn order(id: impl ToString) -> Self {
        Self { kind: "order", id: id.to_string() }
    }

    /// Identifier token, e.g. `restaurant:7`.
    pub fn token(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }

    /// Key for a value scoped to this entity.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.token())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
