//! Dimension universe: the set of dimension keys observed by any collector.
//!
//! The universe is never assumed fixed. A device or channel seen by only one
//! collector still gets a row, with zeros everywhere else; building the
//! union in one place removes the bug class of a dimension silently missing
//! from the cross product.

use std::collections::BTreeSet;

/// Union of all observed keys, sorted so row emission is deterministic
/// across runs.
pub fn dimension_universe<'a, K>(keys: impl IntoIterator<Item = &'a K>) -> Vec<K>
where
    K: Ord + Clone + 'a,
{
    let set: BTreeSet<K> = keys.into_iter().cloned().collect();
    set.into_iter().collect()
}
