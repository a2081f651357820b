//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Strategy for user-writable property names.
///
/// Names never start with `sys`, the prefix reserved for server-managed
/// properties.
pub fn property_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,15}")
        .expect("valid regex")
        .prop_filter("reserved prefix", |name| !name.starts_with("sys"))
}

/// Strategy for collection names.
pub fn collection_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}")
        .expect("valid regex")
        .prop_filter("users is reserved", |name| name != "users")
}

/// Strategy for scalar JSON values that survive a JSON round trip.
pub fn primitive_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        ".{0,24}".prop_map(Value::String),
    ]
}

/// Strategy for a property map of up to `max` entries.
pub fn property_map(max: usize) -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(property_name(), primitive_value(), 0..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn names_avoid_reserved_prefix(name in property_name()) {
            prop_assert!(!name.starts_with("sys"));
            prop_assert!(!name.is_empty());
        }

        #[test]
        fn maps_respect_size(map in property_map(4)) {
            prop_assert!(map.len() <= 4);
        }
    }
}
