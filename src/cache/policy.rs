//! Policy Registry Module
//!
//! Maps every namespace to a TTL and builds deterministic full keys. The TTL
//! tier is picked once from the environment; lookups afterwards are pure.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheKey, Environment, Namespace, Scope};

// == TTL Classes ==
/// Kinds of data that share a TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Static,
    RestaurantDetails,
    MenuItems,
    CustomerProfiles,
    Dynamic,
    OrderStatus,
    DeliveryTracking,
    LiveReviews,
    Realtime,
    DeliverySlots,
    Capacity,
    DynamicPricing,
    AnalyticsShort,
    AnalyticsMedium,
    AnalyticsLong,
    AnalyticsDaily,
    Session,
    Search,
    SearchSuggestions,
}

impl TtlClass {
    /// TTL class of a namespace.
    pub fn of(namespace: Namespace) -> Self {
        match namespace {
            Namespace::RestaurantDetail | Namespace::RestaurantList => TtlClass::RestaurantDetails,
            Namespace::RestaurantMenus | Namespace::MenuItems => TtlClass::MenuItems,
            Namespace::RestaurantAnalytics => TtlClass::AnalyticsMedium,
            Namespace::RestaurantCapacity => TtlClass::Realtime,
            Namespace::Categories | Namespace::Dietary => TtlClass::Search,
            Namespace::Customers | Namespace::CustomerPreferences => TtlClass::CustomerProfiles,
            Namespace::CustomerSessions => TtlClass::Session,
            Namespace::Orders => TtlClass::OrderStatus,
            Namespace::OrderTracking => TtlClass::DeliveryTracking,
            Namespace::OrderHistory => TtlClass::Static,
            Namespace::Reviews => TtlClass::LiveReviews,
            Namespace::AnalyticsRestaurants | Namespace::AnalyticsCustomers => TtlClass::AnalyticsLong,
            Namespace::AnalyticsRevenue => TtlClass::AnalyticsDaily,
            Namespace::AnalyticsPopular | Namespace::PerformanceMetrics => TtlClass::AnalyticsShort,
            Namespace::SearchResults | Namespace::SearchFilters => TtlClass::Search,
            Namespace::SearchSuggestions => TtlClass::SearchSuggestions,
            Namespace::RealtimeDelivery => TtlClass::DeliverySlots,
            Namespace::RealtimeAvailability => TtlClass::Capacity,
            Namespace::RealtimePricing => TtlClass::DynamicPricing,
            Namespace::RealtimeNotifications | Namespace::SystemHealth => TtlClass::Realtime,
        }
    }
}

// == TTL Table ==
/// TTL in seconds for every class, for one environment tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlTable {
    pub static_data: u64,
    pub restaurant_details: u64,
    pub menu_items: u64,
    pub customer_profiles: u64,
    pub dynamic_data: u64,
    pub order_status: u64,
    pub delivery_tracking: u64,
    pub live_reviews: u64,
    pub realtime_data: u64,
    pub delivery_slots: u64,
    pub restaurant_capacity: u64,
    pub dynamic_pricing: u64,
    pub analytics_short: u64,
    pub analytics_medium: u64,
    pub analytics_long: u64,
    pub analytics_daily: u64,
    pub session: u64,
    pub search_results: u64,
    pub search_suggestions: u64,
}

impl TtlTable {
    /// Long tier, used in production.
    pub fn production() -> Self {
        Self {
            static_data: 1800,
            restaurant_details: 2400,
            menu_items: 1800,
            customer_profiles: 3600,
            dynamic_data: 300,
            order_status: 180,
            delivery_tracking: 120,
            live_reviews: 240,
            realtime_data: 60,
            delivery_slots: 30,
            restaurant_capacity: 60,
            dynamic_pricing: 120,
            analytics_short: 900,
            analytics_medium: 3600,
            analytics_long: 14400,
            analytics_daily: 86400,
            session: 1800,
            search_results: 300,
            search_suggestions: 600,
        }
    }

    /// Medium tier, used in staging.
    pub fn staging() -> Self {
        Self {
            static_data: 900,
            restaurant_details: 900,
            menu_items: 900,
            dynamic_data: 180,
            realtime_data: 45,
            analytics_short: 600,
            ..Self::production()
        }
    }

    /// Short tier, used in development.
    pub fn development() -> Self {
        Self {
            static_data: 300,
            restaurant_details: 300,
            menu_items: 300,
            customer_profiles: 300,
            dynamic_data: 60,
            realtime_data: 30,
            analytics_short: 180,
            ..Self::production()
        }
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Staging => Self::staging(),
            Environment::Production => Self::production(),
        }
    }

    /// Seconds for a TTL class.
    pub fn seconds(&self, class: TtlClass) -> u64 {
        match class {
            TtlClass::Static => self.static_data,
            TtlClass::RestaurantDetails => self.restaurant_details,
            TtlClass::MenuItems => self.menu_items,
            TtlClass::CustomerProfiles => self.customer_profiles,
            TtlClass::Dynamic => self.dynamic_data,
            TtlClass::OrderStatus => self.order_status,
            TtlClass::DeliveryTracking => self.delivery_tracking,
            TtlClass::LiveReviews => self.live_reviews,
            TtlClass::Realtime => self.realtime_data,
            TtlClass::DeliverySlots => self.delivery_slots,
            TtlClass::Capacity => self.restaurant_capacity,
            TtlClass::DynamicPricing => self.dynamic_pricing,
            TtlClass::AnalyticsShort => self.analytics_short,
            TtlClass::AnalyticsMedium => self.analytics_medium,
            TtlClass::AnalyticsLong => self.analytics_long,
            TtlClass::AnalyticsDaily => self.analytics_daily,
            TtlClass::Session => self.session,
            TtlClass::Search => self.search_results,
            TtlClass::SearchSuggestions => self.search_suggestions,
        }
    }
}

// == Policy Registry ==
/// TTL policy and key construction for every namespace.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    environment: Environment,
    prefix: String,
    table: TtlTable,
    overrides: HashMap<Namespace, u64>,
}

impl PolicyRegistry {
    // == Constructor ==
    /// Creates a registry for an environment tier and key prefix.
    pub fn new(environment: Environment, prefix: impl Into<String>) -> Self {
        Self {
            environment,
            prefix: prefix.into(),
            table: TtlTable::for_environment(environment),
            overrides: HashMap::new(),
        }
    }

    /// Pins a namespace to an explicit TTL. Only available while building
    /// the registry; it is immutable once shared.
    pub fn with_ttl(mut self, namespace: Namespace, seconds: u64) -> Self {
        self.overrides.insert(namespace, seconds);
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn table(&self) -> &TtlTable {
        &self.table
    }

    // == TTL Lookup ==
    /// TTL in seconds for a namespace.
    pub fn ttl_for(&self, namespace: Namespace) -> u64 {
        self.overrides
            .get(&namespace)
            .copied()
            .unwrap_or_else(|| self.table.seconds(TtlClass::of(namespace)))
    }

    pub fn ttl_duration(&self, namespace: Namespace) -> Duration {
        Duration::from_secs(self.ttl_for(namespace))
    }

    /// TTL used when a namespace name is not recognised.
    pub fn default_ttl(&self) -> u64 {
        self.table.dynamic_data
    }

    /// TTL for a namespace given by name; unknown names get the default TTL.
    pub fn ttl_for_name(&self, name: &str) -> u64 {
        match name.parse::<Namespace>() {
            Ok(namespace) => self.ttl_for(namespace),
            Err(_) => self.default_ttl(),
        }
    }

    // == Key Construction ==
    /// Builds `prefix:namespace:identifier[?k=v&...]`.
    ///
    /// Parameters are sorted and URL-encoded; `%` and `?` in the identifier
    /// are escaped, so distinct inputs never share a full key.
    pub fn build_key(&self, namespace: Namespace, key: &CacheKey) -> String {
        let mut full = format!(
            "{}:{}:{}",
            self.prefix,
            namespace.as_str(),
            escape_identifier(&key.identifier)
        );

        let params = key.sorted_params();
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            full.push('?');
            full.push_str(&query.join("&"));
        }

        full
    }

    /// Glob matching every key in a namespace.
    pub fn namespace_pattern(&self, namespace: Namespace) -> String {
        format!("{}:{}:*", escape_glob(&self.prefix), namespace.as_str())
    }

    /// Glob matching every key under the prefix.
    pub fn all_keys_pattern(&self) -> String {
        format!("{}:*", escape_glob(&self.prefix))
    }

    /// Globs matching the keys of a namespace whose identifier carries the
    /// scope token as a whole `:`-delimited segment.
    pub fn scoped_patterns(&self, namespace: Namespace, scope: &Scope) -> Vec<String> {
        let base = format!("{}:{}:", escape_glob(&self.prefix), namespace.as_str());
        let token = escape_glob(&escape_identifier(&scope.token()));
        vec![
            format!("{}{}", base, token),
            format!("{}{}[:?]*", base, token),
            format!("{}*:{}", base, token),
            format!("{}*:{}[:?]*", base, token),
        ]
    }

    /// Namespace segment of a full key, if it carries this prefix.
    pub fn namespace_of<'a>(&self, full_key: &'a str) -> Option<&'a str> {
        full_key
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(':')?
            .split(':')
            .next()
    }
}

fn escape_identifier(identifier: &str) -> String {
    identifier.replace('%', "%25").replace('?', "%3F")
}

/// Backslash-escapes glob metacharacters.
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
