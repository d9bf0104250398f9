//! Cross-source merging of two evidence sources for one logical metric.

use engine_core::MetricMap;

/// Union two per-dimension maps: per key, `pv` adds (both are legitimate
/// distinct occurrences) while `uv` unions (a user seen in both sources
/// counts once). This asymmetry is the point; a plain map-sum would
/// double-count users.
pub fn merge<K: Ord>(mut a: MetricMap<K>, b: MetricMap<K>) -> MetricMap<K> {
    for (key, stats) in b {
        let entry = a.entry(key).or_default();
        entry.pv += stats.pv;
        entry.uv.extend(stats.uv);
    }
    a
}
