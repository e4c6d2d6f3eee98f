//! Invalidation Engine
//!
//! Turns "entity X changed" into the set of clears that keeps cached views
//! consistent with the write, following the relationships between entities.
//! Planning is pure; execution is sequential and best-effort.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{CacheClient, Namespace, Scope};
use crate::error::{CacheError, Result};
use crate::models::requests::optional_id;

// == Entity Change ==
/// A durable write that cached data may depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "kebab-case")]
pub enum EntityChange {
    Restaurant {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<String>,
    },
    MenuItem {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "optional_id")]
        restaurant_id: Option<String>,
    },
    Customer {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<String>,
    },
    Order {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "optional_id")]
        customer_id: Option<String>,
        #[serde(default, deserialize_with = "optional_id")]
        restaurant_id: Option<String>,
    },
    Review {
        #[serde(default, deserialize_with = "optional_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "optional_id")]
        customer_id: Option<String>,
        #[serde(default, deserialize_with = "optional_id")]
        restaurant_id: Option<String>,
    },
}

// == Clear Operation ==
/// One step of a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClearOp {
    /// Every key of the namespace
    Namespace { namespace: Namespace },
    /// Keys of the namespace carrying the entity's scope token
    Scoped { namespace: Namespace, scope: Scope },
}

impl fmt::Display for ClearOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearOp::Namespace { namespace } => write!(f, "{}", namespace),
            ClearOp::Scoped { namespace, scope } => write!(f, "{}[{}]", namespace, scope),
        }
    }
}

fn all(namespace: Namespace) -> ClearOp {
    ClearOp::Namespace { namespace }
}

fn scoped(namespace: Namespace, scope: Scope) -> ClearOp {
    ClearOp::Scoped { namespace, scope }
}

impl EntityChange {
    pub fn restaurant(id: impl ToString) -> Self {
        EntityChange::Restaurant { id: Some(id.to_string()) }
    }

    pub fn menu_item(id: impl ToString, restaurant_id: impl ToString) -> Self {
        EntityChange::MenuItem {
            id: Some(id.to_string()),
            restaurant_id: Some(restaurant_id.to_string()),
        }
    }

    pub fn customer(id: impl ToString) -> Self {
        EntityChange::Customer { id: Some(id.to_string()) }
    }

    /// Change named by a notification: an entity name ("restaurant",
    /// "menu-item", ...) or a namespace name. Returns None for a known
    /// namespace that has no cascade rule.
    pub fn from_notification(entity: &str, id: Option<&str>) -> Result<Option<Self>> {
        let id = id.map(str::to_string);
        let change = match entity {
            "restaurant" | "restaurants" | "restaurant-detail" | "restaurant-list"
            | "restaurant-menus" => EntityChange::Restaurant { id },
            "menu-item" | "menu_item" | "menu-items" => {
                EntityChange::MenuItem { id, restaurant_id: None }
            }
            "customer" | "customers" | "customer-preferences" => EntityChange::Customer { id },
            "order" | "orders" | "order-tracking" | "order-history" => EntityChange::Order {
                id,
                customer_id: None,
                restaurant_id: None,
            },
            "review" | "reviews" => EntityChange::Review {
                id,
                customer_id: None,
                restaurant_id: None,
            },
            other => {
                return match other.parse::<Namespace>() {
                    Ok(_) => Ok(None),
                    Err(_) => Err(CacheError::UnknownEntity(other.to_string())),
                }
            }
        };
        Ok(Some(change))
    }

    /// Attaches the owning customer and restaurant where the entity has them.
    pub fn with_related(mut self, customer: Option<String>, restaurant: Option<String>) -> Self {
        match &mut self {
            EntityChange::MenuItem { restaurant_id, .. } => {
                if restaurant.is_some() {
                    *restaurant_id = restaurant;
                }
            }
            EntityChange::Order { customer_id, restaurant_id, .. }
            | EntityChange::Review { customer_id, restaurant_id, .. } => {
                if customer.is_some() {
                    *customer_id = customer;
                }
                if restaurant.is_some() {
                    *restaurant_id = restaurant;
                }
            }
            EntityChange::Restaurant { .. } | EntityChange::Customer { .. } => {}
        }
        self
    }

    /// Entity name used in logs and reports.
    pub fn entity(&self) -> &'static str {
        match self {
            EntityChange::Restaurant { .. } => "restaurant",
            EntityChange::MenuItem { .. } => "menu-item",
            EntityChange::Customer { .. } => "customer",
            EntityChange::Order { .. } => "order",
            EntityChange::Review { .. } => "review",
        }
    }

    // == Planning ==
    /// Clears required by this change, in execution order. The same clear
    /// may appear more than once.
    pub fn plan(&self) -> Vec<ClearOp> {
        match self {
            EntityChange::Restaurant { id } => restaurant_plan(id.as_deref()),
            EntityChange::MenuItem { id, restaurant_id } => {
                menu_item_plan(id.as_deref(), restaurant_id.as_deref())
            }
            EntityChange::Customer { id } => customer_plan(id.as_deref()),
            EntityChange::Order { id, customer_id, restaurant_id } => {
                let mut ops = vec![
                    all(Namespace::Orders),
                    all(Namespace::OrderHistory),
                    all(Namespace::AnalyticsRevenue),
                ];
                if let Some(id) = id {
                    ops.push(scoped(Namespace::OrderTracking, Scope::order(id)));
                }
                ops.extend(dependents_plan(customer_id.as_deref(), restaurant_id.as_deref()));
                ops
            }
            EntityChange::Review { customer_id, restaurant_id, .. } => {
                let mut ops = vec![all(Namespace::Reviews)];
                ops.extend(dependents_plan(customer_id.as_deref(), restaurant_id.as_deref()));
                ops
            }
        }
    }
}

fn restaurant_plan(id: Option<&str>) -> Vec<ClearOp> {
    let mut ops = match id {
        Some(id) => {
            let scope = Scope::restaurant(id);
            vec![
                scoped(Namespace::RestaurantDetail, scope.clone()),
                scoped(Namespace::RestaurantMenus, scope.clone()),
                scoped(Namespace::RestaurantAnalytics, scope.clone()),
                scoped(Namespace::AnalyticsRestaurants, scope),
            ]
        }
        None => vec![all(Namespace::RestaurantDetail), all(Namespace::RestaurantMenus)],
    };
    // Restaurant attributes show up in listings and search
    ops.push(all(Namespace::RestaurantList));
    ops.push(all(Namespace::SearchResults));
    ops
}

fn menu_item_plan(id: Option<&str>, restaurant_id: Option<&str>) -> Vec<ClearOp> {
    let mut ops = Vec::new();

    match restaurant_id {
        Some(restaurant_id) => {
            if let Some(id) = id {
                ops.push(scoped(Namespace::MenuItems, Scope::item(id)));
            }
            ops.push(scoped(Namespace::MenuItems, Scope::restaurant(restaurant_id)));
            ops.push(scoped(Namespace::RestaurantMenus, Scope::restaurant(restaurant_id)));
        }
        // Without the owner the item's listings cannot be located
        None => {
            ops.push(all(Namespace::MenuItems));
            ops.push(all(Namespace::RestaurantMenus));
        }
    }

    ops.push(all(Namespace::SearchResults));
    ops.push(all(Namespace::Categories));
    ops.push(all(Namespace::Dietary));

    if let Some(restaurant_id) = restaurant_id {
        ops.push(scoped(Namespace::RestaurantAnalytics, Scope::restaurant(restaurant_id)));
    }

    ops.extend(restaurant_plan(restaurant_id));
    ops
}

fn customer_plan(id: Option<&str>) -> Vec<ClearOp> {
    match id {
        Some(id) => {
            let scope = Scope::customer(id);
            vec![
                scoped(Namespace::Customers, scope.clone()),
                scoped(Namespace::CustomerPreferences, scope),
            ]
        }
        None => vec![all(Namespace::Customers), all(Namespace::CustomerPreferences)],
    }
}

/// Orders and reviews feed customer and restaurant aggregates.
fn dependents_plan(customer_id: Option<&str>, restaurant_id: Option<&str>) -> Vec<ClearOp> {
    let mut ops = Vec::new();
    if let Some(customer_id) = customer_id {
        ops.extend(customer_plan(Some(customer_id)));
        ops.push(scoped(Namespace::AnalyticsCustomers, Scope::customer(customer_id)));
    }
    if let Some(restaurant_id) = restaurant_id {
        ops.extend(restaurant_plan(Some(restaurant_id)));
        ops.push(scoped(Namespace::RestaurantAnalytics, Scope::restaurant(restaurant_id)));
    }
    ops
}

/// Cascade of every entity kind with placeholder ids, for diagnostics.
pub fn describe_rules() -> BTreeMap<&'static str, Vec<String>> {
    let placeholder = || Some("{id}".to_string());
    let owner = || Some("{restaurant_id}".to_string());
    let customer = || Some("{customer_id}".to_string());

    [
        EntityChange::Restaurant { id: placeholder() },
        EntityChange::MenuItem { id: placeholder(), restaurant_id: owner() },
        EntityChange::Customer { id: placeholder() },
        EntityChange::Order { id: placeholder(), customer_id: customer(), restaurant_id: owner() },
        EntityChange::Review { id: placeholder(), customer_id: customer(), restaurant_id: owner() },
    ]
    .into_iter()
    .map(|change| {
        let ops = change.plan().iter().map(ToString::to_string).collect();
        (change.entity(), ops)
    })
    .collect()
}

// == Invalidation Report ==
/// Outcome of executing a cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvalidationReport {
    /// Clear operations attempted
    pub operations: usize,
    /// Keys removed across all operations
    pub keys_cleared: u64,
    /// Descriptions of operations that failed
    pub failures: Vec<String>,
}

impl InvalidationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// == Invalidator ==
/// Executes cascades against the cache.
#[derive(Debug, Clone)]
pub struct Invalidator {
    client: CacheClient,
}

impl Invalidator {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Plans and executes the cascade for a change.
    pub async fn apply(&self, change: &EntityChange) -> InvalidationReport {
        let report = self.execute(&change.plan()).await;
        info!(
            "Invalidated {} keys for {} change ({} operations, {} failed)",
            report.keys_cleared,
            change.entity(),
            report.operations,
            report.failures.len()
        );
        report
    }

    /// Runs clear operations in order. A failed clear is logged and the
    /// remaining ones still run.
    pub async fn execute(&self, ops: &[ClearOp]) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        for op in ops {
            report.operations += 1;
            let result = match op {
                ClearOp::Namespace { namespace } => self.client.clear_namespace(*namespace).await,
                ClearOp::Scoped { namespace, scope } => {
                    self.client.clear_scoped(*namespace, scope).await
                }
            };

            match result {
                Ok(removed) => report.keys_cleared += removed,
                Err(e) => {
                    warn!("Failed to clear {}: {}", op, e);
                    report.failures.push(format!("{}: {}", op, e));
                }
            }
        }

        report
    }

    // == Notification ==
    /// Write-path entry point: `entity` is an entity name ("restaurant",
    /// "menu-item", ...) or a namespace name. Names without a cascade rule
    /// clear their own namespace.
    pub async fn notify_changed(&self, entity: &str, id: Option<&str>) -> Result<InvalidationReport> {
        let change = EntityChange::from_notification(entity, id)?;
        Ok(match change {
            Some(change) => self.apply(&change).await,
            None => {
                let namespace: Namespace = entity.parse()?;
                self.execute(&[all(namespace)]).await
            }
        })
    }
}
