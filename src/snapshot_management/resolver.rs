//! Flattening of a snapshot forest.
//!
//! Nodes come out in pre-order: a node before all of its descendants, siblings
//! in the order the endpoint reported them. Filters are evaluated per node, so
//! a node that fails them does not hide its descendants.

use chrono::{DateTime, Duration, Utc};

use crate::gateway::types::{SnapshotForest, SnapshotNode};

/// Criteria a snapshot must meet to be resolved. Every supplied criterion must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotFilter {
    /// Exact snapshot name.
    pub name: Option<String>,
    /// Only snapshots created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl SnapshotFilter {
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keeps snapshots older than `days` days. The cutoff is fixed here, from
    /// `now`, and reused for every node.
    ///
    /// A cutoff before the earliest representable instant matches nothing.
    pub fn older_than_days(mut self, days: u32, now: DateTime<Utc>) -> Self {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.created_before = Some(cutoff);
        self
    }

    pub fn is_age_filtered(&self) -> bool {
        self.created_before.is_some()
    }

    pub fn matches(&self, node: &SnapshotNode) -> bool {
        if let Some(ref name) = self.name {
            if &node.name != name {
                return false;
            }
        }
        if let Some(cutoff) = self.created_before {
            if node.created >= cutoff {
                return false;
            }
        }
        true
    }
}

/// Build a `SnapshotFilter` that matches snapshots by exact name.
pub fn by_name<S: Into<String>>(name: S) -> SnapshotFilter {
    SnapshotFilter::default().named(name)
}

/// Returns every node of `forest` accepted by `filter`, in pre-order.
pub fn resolve<'a>(forest: &'a SnapshotForest, filter: &SnapshotFilter) -> Vec<&'a SnapshotNode> {
    let mut resolved = Vec::new();
    let mut stack: Vec<_> = forest.roots().iter().rev().copied().collect();

    while let Some(index) = stack.pop() {
        let node = forest.node(index);
        if filter.matches(node) {
            resolved.push(node);
        }
        stack.extend(node.children.iter().rev().copied());
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    /// Two roots, with `base` used at several depths.
    fn forest() -> SnapshotForest {
        let mut forest = SnapshotForest::new("web01");
        let base = forest.push(None, "snapshot-1", "base", "", at(1));
        let patch = forest.push(Some(base), "snapshot-2", "patch", "", at(25));
        forest.push(Some(base), "snapshot-3", "nightly", "", at(3));
        forest.push(Some(patch), "snapshot-5", "base", "", at(2));
        let second = forest.push(None, "snapshot-4", "base", "", at(28));
        forest.push(Some(second), "snapshot-6", "old", "", at(4));
        forest
    }

    fn ids(nodes: &[&SnapshotNode]) -> Vec<String> {
        nodes.iter().map(|node| node.id.clone()).collect()
    }

    fn count_nodes(forest: &SnapshotForest) -> usize {
        fn below(forest: &SnapshotForest, node: &SnapshotNode) -> usize {
            1 + node
                .children
                .iter()
                .map(|child| below(forest, forest.node(*child)))
                .sum::<usize>()
        }
        forest
            .roots()
            .iter()
            .map(|root| below(forest, forest.node(*root)))
            .sum()
    }

    #[test]
    fn test_unfiltered_visits_every_node_once_in_preorder() {
        let forest = forest();
        let resolved = resolve(&forest, &SnapshotFilter::default());

        assert_eq!(resolved.len(), count_nodes(&forest));
        assert_eq!(
            ids(&resolved),
            vec![
                "snapshot-1",
                "snapshot-2",
                "snapshot-5",
                "snapshot-3",
                "snapshot-4",
                "snapshot-6"
            ]
        );
    }

    #[test]
    fn test_name_lookup_returns_all_duplicates() {
        let forest = forest();
        let resolved = resolve(&forest, &by_name("base"));
        assert_eq!(
            ids(&resolved),
            vec!["snapshot-1", "snapshot-5", "snapshot-4"]
        );
        assert!(resolve(&forest, &by_name("Base")).is_empty());
    }

    #[test]
    fn test_age_filter_tests_each_node_independently() {
        let forest = forest();
        let now = at(31);
        let filter = SnapshotFilter::default().older_than_days(10, now);
        let cutoff = now - Duration::days(10);
        let resolved = resolve(&forest, &filter);

        // snapshot-5 sits under a recent parent, snapshot-6 under a recent root.
        assert_eq!(
            ids(&resolved),
            vec!["snapshot-1", "snapshot-5", "snapshot-3", "snapshot-6"]
        );
        assert!(resolved.iter().all(|node| node.created < cutoff));

        let expected = resolve(&forest, &SnapshotFilter::default())
            .into_iter()
            .filter(|node| node.created < cutoff)
            .count();
        assert_eq!(resolved.len(), expected);
    }

    #[test]
    fn test_age_cutoff_is_strict() {
        let mut forest = SnapshotForest::new("db01");
        forest.push(None, "snapshot-1", "edge", "", at(11));
        let filter = SnapshotFilter::default().older_than_days(10, at(21));
        assert!(resolve(&forest, &filter).is_empty());
    }

    #[test]
    fn test_age_cutoff_beyond_calendar_matches_nothing() {
        let forest = forest();
        let filter = SnapshotFilter::default().older_than_days(u32::MAX, at(31));
        assert_eq!(filter.created_before, Some(DateTime::<Utc>::MIN_UTC));
        assert!(resolve(&forest, &filter).is_empty());

        let filter = SnapshotFilter::default().older_than_days(100_000_000, Utc::now());
        assert!(resolve(&forest, &filter).is_empty());
    }

    #[test]
    fn test_combined_filters() {
        let forest = forest();
        let filter = by_name("base").older_than_days(10, at(31));
        assert!(filter.is_age_filtered());
        assert_eq!(
            ids(&resolve(&forest, &filter)),
            vec!["snapshot-1", "snapshot-5"]
        );
    }

    #[test]
    fn test_empty_forest() {
        let forest = SnapshotForest::new("db01");
        assert!(resolve(&forest, &SnapshotFilter::default()).is_empty());
    }
}
