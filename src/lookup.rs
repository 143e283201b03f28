//! Reassembling full records in recommendation order.
//!
//! Bulk fetches (`WHERE id IN (...)`, batched store reads) return rows in
//! whatever order the store likes. These helpers put them back in the order
//! of the canonical id list.

use std::collections::HashMap;
use std::hash::Hash;

/// Returns the records whose key appears in `ids`, in `ids` order. Ids with
/// no matching record are skipped. Repeated ids yield repeated records.
pub fn reorder_by_ids<T, K, F>(ids: &[K], records: Vec<T>, key_of: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut by_id: HashMap<K, T> = HashMap::with_capacity(records.len());
    for record in records {
        by_id.entry(key_of(&record)).or_insert(record);
    }
    ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}

/// Fetches `ids` with `fetch` (order not assumed) and reorders the result.
pub fn fetch_in_order<T, F>(ids: &[String], fetch: F, key_of: impl Fn(&T) -> String) -> Vec<T>
where
    T: Clone,
    F: FnOnce(&[String]) -> Vec<T>,
{
    let fetched = fetch(ids);
    reorder_by_ids(ids, fetched, key_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: String,
        name: &'static str,
    }

    fn row(id: &str, name: &'static str) -> Row {
        Row {
            id: id.to_string(),
            name,
        }
    }

    #[test]
    fn test_reorder_follows_id_order() {
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let fetched = vec![row("a", "A"), row("b", "B"), row("c", "C")];
        let ordered = reorder_by_ids(&ids, fetched, |r| r.id.clone());
        let names: Vec<_> = ordered.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_missing_ids_are_skipped() {
        let ids = vec!["x".to_string(), "a".to_string()];
        let ordered = reorder_by_ids(&ids, vec![row("a", "A")], |r| r.id.clone());
        assert_eq!(ordered, vec![row("a", "A")]);
    }

    #[test]
    fn test_fetch_in_order() {
        let ids = vec!["b".to_string(), "a".to_string()];
        let ordered = fetch_in_order(
            &ids,
            |wanted| {
                let mut rows: Vec<Row> = wanted.iter().map(|id| row(id, "?")).collect();
                rows.sort_by(|a, b| a.id.cmp(&b.id));
                rows
            },
            |r: &Row| r.id.clone(),
        );
        assert_eq!(ordered[0].id, "b");
        assert_eq!(ordered[1].id, "a");
    }
}
