//! Right-biased recursive deep merge over YAML mappings.
//!
//! This is the merge primitive the whole resolution engine is built on: it
//! flattens the raw document tree of an instance into a single configuration
//! mapping and backs the per-field merge inside
//! [`Application::combine`](crate::application::Application::combine).
//!
//! The merge is pure; neither operand is mutated. For a key present in both
//! operands the overlay side wins unless both values are mappings, in which
//! case the merge recurses. Conflicting values of different shapes (scalar
//! vs. list vs. mapping) are simply replaced by the overlay value.

use serde_yaml::{Mapping, Value};

/// Merges `overlay` onto `base`, returning a new mapping.
///
/// Keys present in only one operand are carried over unchanged. Keys present
/// in both are merged recursively when both values are mappings and replaced
/// by the overlay value otherwise. The operation is right-biased and
/// non-commutative.
#[must_use]
pub fn deep_merge(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut result = base.clone();
    for (key, overlay_value) in overlay {
        let merged = match (result.get(key), overlay_value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                Value::Mapping(deep_merge(existing, incoming))
            }
            _ => overlay_value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// Merges two arbitrary YAML values with the same bias as [`deep_merge`]:
/// mapping-onto-mapping recurses, everything else takes the overlay value.
#[must_use]
pub fn deep_merge_value(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(b), Value::Mapping(o)) => Value::Mapping(deep_merge(b, o)),
        _ => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn disjoint_keys_union() {
        let a = mapping("x: 1\ny: two");
        let b = mapping("z: [3]");
        let merged = deep_merge(&a, &b);
        assert_eq!(merged, mapping("x: 1\ny: two\nz: [3]"));
    }

    #[test]
    fn overlay_wins_on_scalar_conflict() {
        let a = mapping("replicas: 1");
        let b = mapping("replicas: 2");
        assert_eq!(deep_merge(&a, &b), mapping("replicas: 2"));
    }

    #[test]
    fn nested_mappings_merge_recursively() {
        let a = mapping("labels:\n  team: x\n  tier: backend");
        let b = mapping("labels:\n  env: prod\n  tier: frontend");
        let merged = deep_merge(&a, &b);
        assert_eq!(merged, mapping("labels:\n  team: x\n  tier: frontend\n  env: prod"));
    }

    #[test]
    fn type_conflicts_are_replaced_not_merged() {
        let a = mapping("value: [1, 2, 3]");
        let b = mapping("value: scalar");
        assert_eq!(deep_merge(&a, &b), mapping("value: scalar"));

        let a = mapping("value:\n  nested: true");
        let b = mapping("value: [1]");
        assert_eq!(deep_merge(&a, &b), mapping("value: [1]"));
    }

    #[test]
    fn lists_are_replaced_never_concatenated() {
        let a = mapping("hosts: [a, b]");
        let b = mapping("hosts: [c]");
        assert_eq!(deep_merge(&a, &b), mapping("hosts: [c]"));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let a = mapping("shared:\n  from: a\nonly_a: 1");
        let b = mapping("shared:\n  from: b");
        let a_before = a.clone();
        let b_before = b.clone();
        let _ = deep_merge(&a, &b);
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn merge_is_not_commutative_on_conflicts() {
        let a = mapping("k: 1");
        let b = mapping("k: 2");
        assert_ne!(deep_merge(&a, &b), deep_merge(&b, &a));
    }

    #[test]
    fn value_merge_recurses_only_for_mappings() {
        let a: Value = serde_yaml::from_str("nested:\n  keep: 1").unwrap();
        let b: Value = serde_yaml::from_str("nested:\n  add: 2").unwrap();
        let merged = deep_merge_value(&a, &b);
        let expected: Value = serde_yaml::from_str("nested:\n  keep: 1\n  add: 2").unwrap();
        assert_eq!(merged, expected);

        let scalar: Value = serde_yaml::from_str("plain").unwrap();
        assert_eq!(deep_merge_value(&a, &scalar), scalar);
    }
}
