//! Namespace Module
//!
//! Closed set of cache namespaces and the deployment environments that select
//! a TTL tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Namespace ==
/// Logical class of cached value. Every namespace has exactly one TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    RestaurantDetail,
    RestaurantList,
    RestaurantMenus,
    RestaurantAnalytics,
    RestaurantCapacity,
    MenuItems,
    Categories,
    Dietary,
    Customers,
    CustomerSessions,
    CustomerPreferences,
    Orders,
    OrderTracking,
    OrderHistory,
    Reviews,
    AnalyticsRestaurants,
    AnalyticsCustomers,
    AnalyticsRevenue,
    AnalyticsPopular,
    SearchResults,
    SearchFilters,
    SearchSuggestions,
    RealtimeDelivery,
    RealtimeAvailability,
    RealtimePricing,
    RealtimeNotifications,
    SystemHealth,
    PerformanceMetrics,
}

impl Namespace {
    /// Every namespace, in declaration order.
    pub const ALL: [Namespace; 28] = [
        Namespace::RestaurantDetail,
        Namespace::RestaurantList,
        Namespace::RestaurantMenus,
        Namespace::RestaurantAnalytics,
        Namespace::RestaurantCapacity,
        Namespace::MenuItems,
        Namespace::Categories,
        Namespace::Dietary,
        Namespace::Customers,
        Namespace::CustomerSessions,
        Namespace::CustomerPreferences,
        Namespace::Orders,
        Namespace::OrderTracking,
        Namespace::OrderHistory,
        Namespace::Reviews,
        Namespace::AnalyticsRestaurants,
        Namespace::AnalyticsCustomers,
        Namespace::AnalyticsRevenue,
        Namespace::AnalyticsPopular,
        Namespace::SearchResults,
        Namespace::SearchFilters,
        Namespace::SearchSuggestions,
        Namespace::RealtimeDelivery,
        Namespace::RealtimeAvailability,
        Namespace::RealtimePricing,
        Namespace::RealtimeNotifications,
        Namespace::SystemHealth,
        Namespace::PerformanceMetrics,
    ];

    /// Namespaces holding derived aggregates.
    pub const ANALYTICS: [Namespace; 5] = [
        Namespace::RestaurantAnalytics,
        Namespace::AnalyticsRestaurants,
        Namespace::AnalyticsCustomers,
        Namespace::AnalyticsRevenue,
        Namespace::AnalyticsPopular,
    ];

    /// Namespaces holding search indexes.
    pub const SEARCH: [Namespace; 3] = [
        Namespace::SearchResults,
        Namespace::Categories,
        Namespace::Dietary,
    ];

    /// Wire name used inside full keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::RestaurantDetail => "restaurant-detail",
            Namespace::RestaurantList => "restaurant-list",
            Namespace::RestaurantMenus => "restaurant-menus",
            Namespace::RestaurantAnalytics => "restaurant-analytics",
            Namespace::RestaurantCapacity => "restaurant-capacity",
            Namespace::MenuItems => "menu-items",
            Namespace::Categories => "categories",
            Namespace::Dietary => "dietary",
            Namespace::Customers => "customers",
            Namespace::CustomerSessions => "customer-sessions",
            Namespace::CustomerPreferences => "customer-preferences",
            Namespace::Orders => "orders",
            Namespace::OrderTracking => "order-tracking",
            Namespace::OrderHistory => "order-history",
            Namespace::Reviews => "reviews",
            Namespace::AnalyticsRestaurants => "analytics-restaurants",
            Namespace::AnalyticsCustomers => "analytics-customers",
            Namespace::AnalyticsRevenue => "analytics-revenue",
            Namespace::AnalyticsPopular => "analytics-popular",
            Namespace::SearchResults => "search-results",
            Namespace::SearchFilters => "search-filters",
            Namespace::SearchSuggestions => "search-suggestions",
            Namespace::RealtimeDelivery => "realtime-delivery",
            Namespace::RealtimeAvailability => "realtime-availability",
            Namespace::RealtimePricing => "realtime-pricing",
            Namespace::RealtimeNotifications => "realtime-notifications",
            Namespace::SystemHealth => "system-health",
            Namespace::PerformanceMetrics => "performance-metrics",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .iter()
            .copied()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| CacheError::UnknownNamespace(s.to_string()))
    }
}

// == Environment ==
/// Deployment environment; selects the TTL tier once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Short TTLs for fast feedback
    #[default]
    Development,
    /// Medium TTLs
    Staging,
    /// Long TTLs
    Production,
}

impl Environment {
    /// Parses an environment name, falling back to development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
