//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key construction over arbitrary identifiers and
//! parameter sets.

use proptest::prelude::*;

use crate::backend::glob_match;
use crate::cache::{CacheKey, Environment, Namespace, PolicyRegistry, Scope};

// == Strategies ==
fn namespace_strategy() -> impl Strategy<Value = Namespace> {
    (0..Namespace::ALL.len()).prop_map(|i| Namespace::ALL[i])
}

/// Identifiers including the characters that carry meaning in a full key.
fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:?&=%*]{1,24}"
}

/// Parameter sets with unique names.
fn params_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z&=?%]{1,8}", "[a-zA-Z0-9&=?% ]{0,12}", 0..6)
        .prop_map(|m| m.into_iter().collect())
}

fn registry() -> PolicyRegistry {
    PolicyRegistry::new(Environment::Production, "prop")
}

fn key_of(identifier: &str, params: &[(String, String)]) -> CacheKey {
    params
        .iter()
        .fold(CacheKey::new(identifier), |key, (k, v)| key.with_param(k.clone(), v))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // The same logical request always yields the same full key.
    #[test]
    fn prop_build_key_deterministic(
        ns in namespace_strategy(),
        identifier in identifier_strategy(),
        params in params_strategy(),
    ) {
        let policy = registry();
        let key = key_of(&identifier, &params);
        prop_assert_eq!(policy.build_key(ns, &key), policy.build_key(ns, &key.clone()));
    }

    // Parameter insertion order never changes the key.
    #[test]
    fn prop_params_order_invariant(
        ns in namespace_strategy(),
        identifier in identifier_strategy(),
        (params, shuffled) in params_strategy()
            .prop_flat_map(|p| (Just(p.clone()), Just(p).prop_shuffle())),
    ) {
        let policy = registry();
        prop_assert_eq!(
            policy.build_key(ns, &key_of(&identifier, &params)),
            policy.build_key(ns, &key_of(&identifier, &shuffled))
        );
    }

    // Distinct (namespace, identifier, params) never share a full key.
    #[test]
    fn prop_build_key_injective(
        a in (namespace_strategy(), identifier_strategy(), params_strategy()),
        b in (namespace_strategy(), identifier_strategy(), params_strategy()),
    ) {
        let policy = registry();
        let key_a = policy.build_key(a.0, &key_of(&a.1, &a.2));
        let key_b = policy.build_key(b.0, &key_of(&b.1, &b.2));
        if a != b {
            prop_assert_ne!(key_a, key_b);
        }
    }

    // Every key of a namespace matches that namespace's clear pattern.
    #[test]
    fn prop_namespace_pattern_covers_keys(
        ns in namespace_strategy(),
        identifier in identifier_strategy(),
        params in params_strategy(),
    ) {
        let policy = registry();
        let key = policy.build_key(ns, &key_of(&identifier, &params));
        prop_assert!(glob_match(&policy.namespace_pattern(ns), &key));
    }

    // A scoped clear for restaurant N never touches restaurant N followed by
    // more digits.
    #[test]
    fn prop_scope_does_not_match_longer_ids(id in 1u32..10_000, suffix in 0u32..10) {
        let policy = registry();
        let ns = Namespace::RestaurantDetail;
        let own = policy.build_key(ns, &Scope::restaurant(id).key());
        let other = policy.build_key(ns, &Scope::restaurant(format!("{}{}", id, suffix)).key());
        let patterns = policy.scoped_patterns(ns, &Scope::restaurant(id));

        prop_assert!(patterns.iter().any(|p| glob_match(p, &own)));
        prop_assert!(!patterns.iter().any(|p| glob_match(p, &other)));
    }
}
