//! Parent → children indices
//!
//! Each index is an ordered set per parent plus a reverse multimap. Parents
//! own their lists independently: linking a child under one parent never
//! removes it from another.

use crate::domain::EntityId;
use std::collections::HashMap;

/// Relation walked by `ContentStore::child_ids`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    MatchMarkets,
    MarketOutcomes,
    TournamentMatches,
}

#[derive(Debug, Default)]
pub struct ChildIndex {
    children: HashMap<EntityId, Vec<EntityId>>,
    parents: HashMap<EntityId, Vec<EntityId>>,
}

impl ChildIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full child list of `parent`
    ///
    /// Duplicates keep their first position. Returns true if the list changed.
    pub fn replace(&mut self, parent: &EntityId, children: &[EntityId]) -> bool {
        let mut next: Vec<EntityId> = Vec::with_capacity(children.len());
        for child in children {
            if !next.contains(child) {
                next.push(child.clone());
            }
        }

        if self.children.get(parent).map(Vec::as_slice) == Some(next.as_slice()) {
            return false;
        }

        if let Some(previous) = self.children.remove(parent) {
            for child in previous {
                self.unlink(&child, parent);
            }
        }

        for child in &next {
            self.link(child, parent);
        }
        self.children.insert(parent.clone(), next);
        true
    }

    /// Append `child` under `parent` unless already there
    ///
    /// Returns true if the index changed.
    pub fn insert(&mut self, parent: &EntityId, child: &EntityId) -> bool {
        let siblings = self.children.entry(parent.clone()).or_default();
        if siblings.contains(child) {
            return false;
        }
        siblings.push(child.clone());
        self.link(child, parent);
        true
    }

    /// Ordered children; empty when the parent is unknown
    pub fn children(&self, parent: &EntityId) -> &[EntityId] {
        self.children
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First parent the child was linked under
    pub fn parent(&self, child: &EntityId) -> Option<&EntityId> {
        self.parents.get(child).and_then(|parents| parents.first())
    }

    /// Every parent listing the child, in link order
    pub fn parents(&self, child: &EntityId) -> &[EntityId] {
        self.parents
            .get(child)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of parents with at least one child entry
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn link(&mut self, child: &EntityId, parent: &EntityId) {
        let parents = self.parents.entry(child.clone()).or_default();
        if !parents.contains(parent) {
            parents.push(parent.clone());
        }
    }

    fn unlink(&mut self, child: &EntityId, parent: &EntityId) {
        if let Some(parents) = self.parents.get_mut(child) {
            parents.retain(|p| p != parent);
            if parents.is_empty() {
                self.parents.remove(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::from(*s)).collect()
    }

    #[test]
    fn test_replace_dedups_and_keeps_order() {
        let mut index = ChildIndex::new();
        let parent = EntityId::from("m1");

        assert!(index.replace(&parent, &ids(&["o2", "o1", "o2", "o3"])));
        assert_eq!(index.children(&parent), ids(&["o2", "o1", "o3"]).as_slice());
        assert_eq!(index.parent(&EntityId::from("o1")), Some(&parent));

        // Same content is not a change
        assert!(!index.replace(&parent, &ids(&["o2", "o1", "o3"])));
    }

    #[test]
    fn test_insert_appends_once() {
        let mut index = ChildIndex::new();
        let parent = EntityId::from("123");

        assert!(index.insert(&parent, &EntityId::from("m1")));
        assert!(index.insert(&parent, &EntityId::from("m2")));
        assert!(!index.insert(&parent, &EntityId::from("m1")));
        assert_eq!(index.children(&parent), ids(&["m1", "m2"]).as_slice());
    }

    #[test]
    fn test_shared_child_stays_under_every_parent() {
        let mut index = ChildIndex::new();
        let m1 = EntityId::from("m1");
        let m2 = EntityId::from("m2");

        index.replace(&m1, &ids(&["o1", "o2"]));
        index.replace(&m2, &ids(&["o1", "o3"]));
        assert!(index.insert(&m2, &EntityId::from("o2")));

        assert_eq!(index.children(&m1), ids(&["o1", "o2"]).as_slice());
        assert_eq!(index.children(&m2), ids(&["o1", "o3", "o2"]).as_slice());
        assert_eq!(index.parent(&EntityId::from("o1")), Some(&m1));
        assert_eq!(index.parents(&EntityId::from("o1")), &[m1.clone(), m2.clone()][..]);

        // Replacing one list leaves the other parent's links alone
        index.replace(&m1, &ids(&["o2"]));
        assert_eq!(index.parents(&EntityId::from("o1")), &[m2.clone()][..]);
        assert_eq!(index.children(&m2), ids(&["o1", "o3", "o2"]).as_slice());
    }

    #[test]
    fn test_replace_drops_old_reverse_entries() {
        let mut index = ChildIndex::new();
        let parent = EntityId::from("p");

        index.replace(&parent, &ids(&["c1", "c2"]));
        index.replace(&parent, &ids(&["c2"]));

        assert_eq!(index.parent(&EntityId::from("c1")), None);
        assert_eq!(index.parent(&EntityId::from("c2")), Some(&parent));
    }

    #[test]
    fn test_unknown_parent_has_no_children() {
        let index = ChildIndex::new();
        assert!(index.children(&EntityId::from("missing")).is_empty());
        assert!(index.is_empty());
    }
}
