use crate::value::Value;

/// Deep-merges `other` into `base`.
///
/// Objects merge key by key, arrays element by element (extra trailing elements of
/// `other` are appended). Any other pairing keeps `base`, so a conflicting scalar
/// always resolves to the earlier value.
pub fn merge(base: &Value, other: &Value) -> Value {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            let mut out = base_map.clone();
            for (key, value) in other_map {
                let merged = match out.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (Value::Array(base_items), Value::Array(other_items)) => {
            let mut out = base_items.clone();
            for (index, value) in other_items.iter().enumerate() {
                match out.get_mut(index) {
                    Some(existing) => *existing = merge(existing, value),
                    None => out.push(value.clone()),
                }
            }
            Value::Array(out)
        }
        _ => base.clone(),
    }
}

/// Folds [`merge`] over `values` in order; `None` when empty.
pub fn merge_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
    let mut values = values.into_iter();
    let first = values.next()?.clone();
    Some(values.fold(first, |acc, next| merge(&acc, next)))
}

/// Layers two independent rewrites of `original` on top of each other.
///
/// Leaves only `later` changed come from `later`, leaves only `earlier` changed come
/// from `earlier`. Where both changed the same leaf, `later` wins.
pub fn overlay(original: &Value, earlier: Value, later: Value) -> Value {
    if later == *original {
        return earlier;
    }
    if earlier == *original {
        return later;
    }
    match (original, earlier, later) {
        (Value::Object(base), Value::Object(mut out), Value::Object(changes)) => {
            for (key, value) in changes {
                match out.get_mut(&key) {
                    Some(slot) => {
                        let previous = std::mem::take(slot);
                        *slot = match base.get(&key) {
                            Some(unchanged) => overlay(unchanged, previous, value),
                            None => merge(&previous, &value),
                        };
                    }
                    None => {
                        out.insert(key, value);
                    }
                }
            }
            Value::Object(out)
        }
        (Value::Array(base), Value::Array(mut out), Value::Array(changes)) => {
            for (index, value) in changes.into_iter().enumerate() {
                match out.get_mut(index) {
                    Some(slot) => {
                        let previous = std::mem::take(slot);
                        *slot = match base.get(index) {
                            Some(unchanged) => overlay(unchanged, previous, value),
                            None => merge(&previous, &value),
                        };
                    }
                    None => out.push(value),
                }
            }
            Value::Array(out)
        }
        (_, _, later) => later,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn disjoint_keys_are_combined() {
        assert_eq!(
            merge(&value!({"a": 1}), &value!({"b": 2})),
            value!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn scalar_conflicts_keep_the_base() {
        assert_eq!(merge(&value!({"x": 1}), &value!({"x": 2})), value!({"x": 1}));
        assert_eq!(merge(&value!("a"), &value!("b")), value!("a"));
        assert_eq!(merge(&value!(1), &value!({"a": 1})), value!(1));
    }

    #[test]
    fn nested_structures_merge_recursively() {
        let merged = merge(
            &value!({"o": {"a": [1, {"p": 1}]}}),
            &value!({"o": {"a": [9, {"q": 2}, 3], "b": true}}),
        );
        assert_eq!(merged, value!({"o": {"a": [1, {"p": 1, "q": 2}, 3], "b": true}}));
    }

    #[test]
    fn merge_all_folds_in_order() {
        let values = [value!({"x": 1}), value!({"x": 2, "y": 2}), value!({"z": 3})];
        assert_eq!(merge_all(&values), Some(value!({"x": 1, "y": 2, "z": 3})));
        assert_eq!(merge_all(std::iter::empty()), None);
    }

    #[test]
    fn overlay_keeps_changes_from_both_rewrites() {
        let original = value!({"d": "2017-01-01", "n": 1});
        let earlier = value!({"d": "typed", "n": 1});
        let later = value!({"d": "2017-01-01", "n": 1, "filled": true});
        assert_eq!(
            overlay(&original, earlier, later),
            value!({"d": "typed", "n": 1, "filled": true})
        );
    }

    #[test]
    fn overlay_prefers_the_later_rewrite_of_one_leaf() {
        let original = value!({"a": [1, 2]});
        let earlier = value!({"a": [10, 2]});
        let later = value!({"a": [20, 3]});
        assert_eq!(overlay(&original, earlier, later), value!({"a": [20, 3]}));
        assert_eq!(overlay(&original, value!({"a": [1, 2]}), value!({"a": [1, 2]})), original);
    }
}
