//! Category-to-policy usage reconciliation.
//!
//! Pure functions over pre-fetched data: no client, no IO. The caller fetches
//! the complete category and policy sets first; pagination and auth are the
//! API client's concern.

use std::collections::{BTreeMap, BTreeSet};

/// The slice of a URL-filtering policy the reconciler needs: its identifier
/// and the category identifiers it references.
#[derive(Debug, Clone)]
pub struct PolicyLink {
    pub policy_id: String,
    pub category_ids: Vec<String>,
}

/// Result of a reconciliation run. Recomputed fresh on every invocation,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    /// Categories referenced by at least one policy, with the referencing
    /// policy identifiers. Every key is a member of the input category set;
    /// every value set is non-empty.
    pub used: BTreeMap<String, BTreeSet<String>>,
    /// Categories referenced by no policy.
    pub unused: BTreeSet<String>,
}

/// Computes which categories are referenced by at least one policy.
///
/// A category identifier referenced by a policy but absent from
/// `category_ids` is ignored: the two fetches behind the inputs are not
/// transactionally consistent, so stale or foreign references are expected
/// and are not an error.
pub fn reconcile(category_ids: &BTreeSet<String>, policies: &[PolicyLink]) -> Usage {
    let mut used: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for policy in policies {
        for category_id in &policy.category_ids {
            if category_ids.contains(category_id) {
                used.entry(category_id.clone())
                    .or_default()
                    .insert(policy.policy_id.clone());
            }
        }
    }

    let unused = category_ids
        .iter()
        .filter(|id| !used.contains_key(*id))
        .cloned()
        .collect();

    Usage { used, unused }
}

/// Merges two URL lists, dropping duplicates while preserving first-seen
/// order. The dedupe key is the exact string: no normalization of scheme,
/// trailing slash, or case.
pub fn merge_urls(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());

    for url in existing.iter().chain(incoming.iter()) {
        if seen.insert(url.as_str()) {
            merged.push(url.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn link(policy_id: &str, categories: &[&str]) -> PolicyLink {
        PolicyLink {
            policy_id: policy_id.to_string(),
            category_ids: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn urls(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_used_and_unused_partition_the_input() {
        let categories = ids(&["CUSTOM_A", "CUSTOM_B", "CUSTOM_C"]);
        let policies = vec![
            link("P1", &["CUSTOM_A"]),
            link("P2", &["CUSTOM_A", "CUSTOM_B"]),
        ];

        let usage = reconcile(&categories, &policies);

        let mut combined: BTreeSet<String> = usage.used.keys().cloned().collect();
        for id in &usage.unused {
            assert!(combined.insert(id.clone()), "category in both partitions: {}", id);
        }
        assert_eq!(combined, categories);
        for (id, referencing) in &usage.used {
            assert!(!referencing.is_empty(), "used category {} has no policies", id);
        }
    }

    #[test]
    fn test_reference_scenario() {
        let categories = ids(&["CUSTOM_A", "CUSTOM_B", "CUSTOM_C"]);
        let policies = vec![
            link("P1", &["CUSTOM_A"]),
            link("P2", &["CUSTOM_A", "CUSTOM_B"]),
        ];

        let usage = reconcile(&categories, &policies);

        assert_eq!(usage.used.len(), 2);
        assert_eq!(usage.used["CUSTOM_A"], ids(&["P1", "P2"]));
        assert_eq!(usage.used["CUSTOM_B"], ids(&["P2"]));
        assert_eq!(usage.unused, ids(&["CUSTOM_C"]));
    }

    #[test]
    fn test_no_references_means_all_unused() {
        let categories = ids(&["CUSTOM_A", "CUSTOM_B"]);
        let policies = vec![link("P1", &[])];

        let usage = reconcile(&categories, &policies);

        assert!(usage.used.is_empty());
        assert_eq!(usage.unused, categories);
    }

    #[test]
    fn test_foreign_references_are_ignored() {
        let categories = ids(&["CUSTOM_A"]);
        let policies = vec![
            link("P1", &["CUSTOM_A", "CUSTOM_DELETED", "SOCIAL_MEDIA"]),
            link("P2", &["CUSTOM_GONE"]),
        ];

        let usage = reconcile(&categories, &policies);

        assert_eq!(usage.used.len(), 1);
        assert_eq!(usage.used["CUSTOM_A"], ids(&["P1"]));
        assert!(usage.unused.is_empty());

        // Same result as if the foreign identifiers were never present.
        let clean = reconcile(&categories, &[link("P1", &["CUSTOM_A"])]);
        assert_eq!(usage.used, clean.used);
        assert_eq!(usage.unused, clean.unused);
    }

    #[test]
    fn test_duplicate_references_from_one_policy_count_once() {
        let categories = ids(&["CUSTOM_A"]);
        let policies = vec![link("P1", &["CUSTOM_A", "CUSTOM_A"])];

        let usage = reconcile(&categories, &policies);

        assert_eq!(usage.used["CUSTOM_A"], ids(&["P1"]));
    }

    #[test]
    fn test_empty_inputs() {
        let usage = reconcile(&BTreeSet::new(), &[]);
        assert!(usage.used.is_empty());
        assert!(usage.unused.is_empty());
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let merged = merge_urls(&urls(&["a", "b"]), &urls(&["b", "c"]));
        assert_eq!(merged, urls(&["a", "b", "c"]));
    }

    #[test]
    fn test_merge_url_scenario() {
        let merged = merge_urls(
            &urls(&["http://a.com", "http://b.com"]),
            &urls(&["http://b.com", "http://c.com"]),
        );
        assert_eq!(merged, urls(&["http://a.com", "http://b.com", "http://c.com"]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = urls(&["http://a.com", "http://b.com"]);
        let incoming = urls(&["http://b.com", "http://c.com"]);

        let once = merge_urls(&existing, &incoming);
        let twice = merge_urls(&once, &incoming);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_is_case_sensitive() {
        let merged = merge_urls(&urls(&["http://A.com"]), &urls(&["http://a.com"]));
        assert_eq!(merged, urls(&["http://A.com", "http://a.com"]));
    }

    #[test]
    fn test_merge_dedupes_within_incoming() {
        let merged = merge_urls(&[], &urls(&["x.com", "x.com", "y.com"]));
        assert_eq!(merged, urls(&["x.com", "y.com"]));
    }
}
