//! Structural diff of JSON values
//!
//! Produces typed `(path, kind)` entries rather than rendered path strings.
//! Arrays are compared as multisets: reordering the points of a series is not
//! a change, and numbers compare by value (`3` equals `3.0`).

use crate::path::DiffPath;
use serde_json::Value;
use std::fmt::Write as _;

/// What happened at a diff path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Object member present only in the new value
    Added,
    /// Object member present only in the old value
    Removed,
    /// Scalar value or type differs
    Changed,
    /// Array element present only in the new value
    ItemAdded,
    /// Array element present only in the old value
    ItemRemoved,
}

/// One difference between two values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Where the difference is
    pub path: DiffPath,
    /// What kind of difference
    pub kind: ChangeKind,
}

impl DiffEntry {
    fn new(path: DiffPath, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

/// Diff two values, returning entries in discovery order
///
/// For objects, removed and changed members are reported in the old value's
/// key order, followed by added members in the new value's key order.
#[must_use]
pub fn diff_values(old: &Value, new: &Value) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    diff_at(&DiffPath::root(), old, new, &mut out);
    out
}

/// Check two values for equality, ignoring array order
#[must_use]
pub fn equivalent(a: &Value, b: &Value) -> bool {
    canonical_key(a) == canonical_key(b)
}

fn diff_at(path: &DiffPath, old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    match (old, new) {
        (Value::Object(before), Value::Object(after)) => {
            for (key, old_value) in before {
                match after.get(key) {
                    Some(new_value) => diff_at(&path.key(key), old_value, new_value, out),
                    None => out.push(DiffEntry::new(path.key(key), ChangeKind::Removed)),
                }
            }
            for key in after.keys().filter(|k| !before.contains_key(*k)) {
                out.push(DiffEntry::new(path.key(key), ChangeKind::Added));
            }
        }
        (Value::Array(before), Value::Array(after)) => diff_unordered(path, before, after, out),
        _ => {
            if !equivalent(old, new) {
                out.push(DiffEntry::new(path.clone(), ChangeKind::Changed));
            }
        }
    }
}

fn diff_unordered(path: &DiffPath, before: &[Value], after: &[Value], out: &mut Vec<DiffEntry>) {
    let mut unmatched: Vec<(usize, String)> = after
        .iter()
        .enumerate()
        .map(|(i, v)| (i, canonical_key(v)))
        .collect();

    let mut removed = Vec::new();
    for (i, value) in before.iter().enumerate() {
        let key = canonical_key(value);
        match unmatched.iter().position(|(_, k)| *k == key) {
            Some(pos) => {
                unmatched.remove(pos);
            }
            None => removed.push(i),
        }
    }

    // Pair leftovers so an edited point reports where it changed instead of
    // a remove/add pair.
    let paired = removed.len().min(unmatched.len());
    for (old_idx, (new_idx, _)) in removed.iter().zip(unmatched.iter()).take(paired) {
        diff_at(&path.index(*new_idx), &before[*old_idx], &after[*new_idx], out);
    }
    for old_idx in &removed[paired..] {
        out.push(DiffEntry::new(path.index(*old_idx), ChangeKind::ItemRemoved));
    }
    for (new_idx, _) in &unmatched[paired..] {
        out.push(DiffEntry::new(path.index(*new_idx), ChangeKind::ItemAdded));
    }
}

/// Order-insensitive canonical encoding used for multiset matching
fn canonical_key(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                let _ = write!(out, "n:{f}");
            }
            None => {
                let _ = write!(out, "n:{n}");
            }
        },
        Value::String(s) => {
            let _ = write!(out, "s:{s:?}");
        }
        Value::Array(items) => {
            let mut keys: Vec<String> = items.iter().map(canonical_key).collect();
            keys.sort();
            out.push('[');
            out.push_str(&keys.join(","));
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{key:?}:");
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kinds(entries: &[DiffEntry]) -> Vec<(String, ChangeKind)> {
        entries
            .iter()
            .map(|e| (e.path.to_string(), e.kind))
            .collect()
    }

    #[test]
    fn identical_values_have_no_diff() {
        let v = json!({"Defects": [{"version": "1.0", "value": 3}]});
        assert!(diff_values(&v, &v.clone()).is_empty());
    }

    #[test]
    fn edited_point_reports_nested_change() {
        let old = json!({"Defects": [{"version": "1.0", "value": 3}]});
        let new = json!({"Defects": [{"version": "1.0", "value": 5}]});
        assert_eq!(
            kinds(&diff_values(&old, &new)),
            vec![("Defects[0].value".to_string(), ChangeKind::Changed)]
        );
    }

    #[test]
    fn reordered_points_are_not_a_change() {
        let old = json!({"Coverage": [{"version": "1", "value": 10}, {"version": "2", "value": 20}]});
        let new = json!({"Coverage": [{"version": "2", "value": 20}, {"version": "1", "value": 10}]});
        assert!(diff_values(&old, &new).is_empty());
    }

    #[test]
    fn integer_and_float_compare_by_value() {
        assert!(equivalent(&json!(3), &json!(3.0)));
        assert!(!equivalent(&json!(3), &json!("3")));
    }

    #[test]
    fn added_and_removed_members() {
        let old = json!({"A": 1, "B": 2});
        let new = json!({"B": 2, "C": 3});
        assert_eq!(
            kinds(&diff_values(&old, &new)),
            vec![
                ("A".to_string(), ChangeKind::Removed),
                ("C".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn extra_points_are_item_changes() {
        let old = json!({"S": [{"version": "1", "value": 1}]});
        let new = json!({"S": [{"version": "1", "value": 1}, {"version": "2", "value": 2}]});
        assert_eq!(
            kinds(&diff_values(&old, &new)),
            vec![("S[1]".to_string(), ChangeKind::ItemAdded)]
        );

        assert_eq!(
            kinds(&diff_values(&new, &old)),
            vec![("S[1]".to_string(), ChangeKind::ItemRemoved)]
        );
    }

    #[test]
    fn type_change_is_a_change() {
        let old = json!({"S": [1, 2]});
        let new = json!({"S": {"ATLS": []}});
        assert_eq!(
            kinds(&diff_values(&old, &new)),
            vec![("S".to_string(), ChangeKind::Changed)]
        );
    }

    #[test]
    fn root_scalar_change_has_root_path() {
        let entries = diff_values(&json!(1), &json!(2));
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
    }
}
