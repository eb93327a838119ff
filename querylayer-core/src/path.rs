//! Dot-separated path helpers over JSON trees.
//!
//! [`remove_path`] deletes whatever a path points at and prunes the objects and
//! arrays that the deletion left empty. It never edits its input: it returns a
//! new tree. [`set_path`] writes a value under a dotted key, creating the
//! intermediate objects.
//!
//! Path segments address object keys; numeric segments address array slots.
//! A non-numeric segment that meets an array applies to every element, so
//! `or.name` reaches the `name` key of each member of an `or` list.

use serde_json::{Map, Value};

enum Pruned {
    Untouched,
    Emptied,
    Replaced(Value),
}

fn finish_object(map: Map<String, Value>) -> Pruned {
    if map.is_empty() {
        Pruned::Emptied
    } else {
        Pruned::Replaced(Value::Object(map))
    }
}

fn prune(value: &Value, segments: &[&str]) -> Pruned {
    let Some((segment, rest)) = segments.split_first() else {
        return Pruned::Untouched;
    };

    match value {
        Value::Object(map) => {
            let Some(child) = map.get(*segment) else {
                return Pruned::Untouched;
            };

            let outcome = if rest.is_empty() {
                Pruned::Emptied
            } else {
                prune(child, rest)
            };

            let mut map = map.clone();
            match outcome {
                Pruned::Untouched => return Pruned::Untouched,
                Pruned::Emptied => map.retain(|key, _| key != segment),
                Pruned::Replaced(replacement) => {
                    map.insert(segment.to_string(), replacement);
                }
            }
            finish_object(map)
        }
        Value::Array(items) => {
            let outcomes = match segment.parse::<usize>() {
                Ok(index) => items
                    .iter()
                    .enumerate()
                    .map(|(position, item)| match position == index {
                        true if rest.is_empty() => Pruned::Emptied,
                        true => prune(item, rest),
                        false => Pruned::Untouched,
                    })
                    .collect::<Vec<_>>(),
                Err(_) => items.iter().map(|item| prune(item, segments)).collect(),
            };

            if outcomes.iter().all(|outcome| matches!(outcome, Pruned::Untouched)) {
                return Pruned::Untouched;
            }

            let remaining = items
                .iter()
                .zip(outcomes)
                .filter_map(|(item, outcome)| match outcome {
                    Pruned::Untouched => Some(item.clone()),
                    Pruned::Emptied => None,
                    Pruned::Replaced(replacement) => Some(replacement),
                })
                .collect::<Vec<_>>();

            if remaining.is_empty() {
                Pruned::Emptied
            } else {
                Pruned::Replaced(Value::Array(remaining))
            }
        }
        _ => Pruned::Untouched,
    }
}

/// Returns `value` with the node at `path` removed and emptied parents pruned.
///
/// Returns `None` if nothing is left of the tree. A path that does not exist
/// leaves the tree unchanged, including any objects that were empty to begin with.
pub fn remove_path(value: &Value, path: &str) -> Option<Value> {
    let segments = path.split('.').collect::<Vec<_>>();

    tracing::trace!(path = %path, "Pruning condition path");

    match prune(value, &segments) {
        Pruned::Untouched => Some(value.clone()),
        Pruned::Emptied => None,
        Pruned::Replaced(replacement) => Some(replacement),
    }
}

/// Writes `value` under a dotted `path`, creating (or replacing non-object)
/// intermediate nodes.
pub fn set_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, tail)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, tail, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // ─── REMOVE ───

    #[test]
    fn test_remove_leaf_key() {
        let value = json!({"age": {"gte": 1, "lte": 5}});
        assert_eq!(remove_path(&value, "age.gte"), Some(json!({"age": {"lte": 5}})));
    }

    #[test]
    fn test_remove_prunes_empty_parents() {
        let value = json!({"age": {"gte": 1}});
        assert_eq!(remove_path(&value, "age.gte"), None);
    }

    #[test]
    fn test_remove_array_index() {
        let value = json!({"and": [{"a": 1}, {"b": 2}, {"c": 3}]});
        assert_eq!(
            remove_path(&value, "and.1"),
            Some(json!({"and": [{"a": 1}, {"c": 3}]}))
        );
    }

    #[test]
    fn test_remove_inside_indexed_element_prunes_slot() {
        let value = json!({"and": [{"a": 1}, {"b": 2}]});
        assert_eq!(remove_path(&value, "and.0.a"), Some(json!({"and": [{"b": 2}]})));
        assert_eq!(remove_path(&json!({"and": [{"a": 1}]}), "and.0.a"), None);
    }

    #[test]
    fn test_remove_fans_out_over_arrays() {
        let value = json!({"or": [{"name": 1, "x": 1}, {"name": 2}, {"other": 3}]});
        assert_eq!(
            remove_path(&value, "or.name"),
            Some(json!({"or": [{"x": 1}, {"other": 3}]}))
        );
    }

    #[test]
    fn test_remove_deeply_nested() {
        let value = json!({"and": [{"or": [{"a": {"eq": 1}}, {"b": 2}]}, {"c": 3}]});
        assert_eq!(
            remove_path(&value, "and.0.or.0.a.eq"),
            Some(json!({"and": [{"or": [{"b": 2}]}, {"c": 3}]}))
        );
    }

    #[test]
    fn test_remove_missing_path_is_untouched() {
        let value = json!({"a": {}, "b": [1, 2]});
        assert_eq!(remove_path(&value, "a.x"), Some(value.clone()));
        assert_eq!(remove_path(&value, "b.7"), Some(value.clone()));
        assert_eq!(remove_path(&value, "b.0.x"), Some(value.clone()));
        assert_eq!(remove_path(&value, "zzz"), Some(value.clone()));
    }

    #[test]
    fn test_remove_does_not_touch_input() {
        let value = json!({"a": 1});
        let _ = remove_path(&value, "a");
        assert_eq!(value, json!({"a": 1}));
    }

    // ─── SET ───

    #[test]
    fn test_set_path_creates_parents() {
        let mut target = Map::new();
        set_path(&mut target, "where.contacts", json!({"a": 1}));
        assert_eq!(Value::Object(target), json!({"where": {"contacts": {"a": 1}}}));
    }

    #[test]
    fn test_set_path_keeps_siblings() {
        let mut target = json!({"where": {"and": [{"a": 1}]}})
            .as_object()
            .cloned()
            .unwrap();
        set_path(&mut target, "where.events", json!({"b": 2}));
        assert_eq!(
            Value::Object(target),
            json!({"where": {"and": [{"a": 1}], "events": {"b": 2}}})
        );
    }
}
