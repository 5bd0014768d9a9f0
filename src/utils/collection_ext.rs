//! Collection helpers used by the sampler and reload paths.

use std::collections::HashMap;
use std::hash::Hash;

/// Convert a Vec to a HashMap using the given key extraction function.
///
/// # Example
/// ```ignore
/// let by_id = vec_to_map(records, |r| r.id.clone());
/// ```
#[inline]
pub fn vec_to_map<T, K, F>(items: Vec<T>, key_fn: F) -> HashMap<K, T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    items.into_iter().map(|item| (key_fn(&item), item)).collect()
}

/// Group a Vec into buckets by key, preserving per-bucket insertion order.
#[inline]
pub fn group_by<T, K, F>(items: Vec<T>, key_fn: F) -> HashMap<K, Vec<T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut map: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        map.entry(key_fn(&item)).or_default().push(item);
    }
    map
}
