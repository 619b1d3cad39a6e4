// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The column-extent tracker.
//!
//! A column is the set of nodes sharing one `(tree, side, depth)` slot in the
//! layout grid. During a pass the tracker remembers, per column, the furthest
//! bottom edge reached so far and which node reached it. The traversal
//! consults it to detect when a freshly computed position would run into a
//! branch laid out earlier, either within the same tree or in an earlier tree
//! of the forest.
//!
//! Extents are a pass-local notion: the tracker is fully cleared at the start
//! of every pass so stale records never bleed into the next one.

use hashbrown::HashMap;

use crate::types::{NodeId, Side};

/// Addressing key for one column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ColumnKey {
    /// Index of the tree in the forest's stacking order.
    pub tree: usize,
    /// Which half of the tree the column belongs to.
    pub side: Side,
    /// Depth below the tree's center node (children of the root are depth 1).
    pub depth: usize,
}

/// The furthest-down edge recorded for a column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnExtent {
    /// `top + height` of the contributing node.
    pub max_bottom: f64,
    /// The node that reached the edge.
    pub node: NodeId,
}

/// Per-pass record of maximum bottom edges, keyed by column.
#[derive(Clone, Debug, Default)]
pub struct ColumnExtents {
    map: HashMap<ColumnKey, ColumnExtent>,
}

impl ColumnExtents {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all records. Called at the start of every pass.
    pub fn reset(&mut self) {
        self.map.clear();
    }

    /// Record a bottom edge, keeping the maximum per column.
    pub fn record(&mut self, key: ColumnKey, bottom: f64, node: NodeId) {
        let current = self.map.get(&key).map(|e| e.max_bottom);
        if current.is_none_or(|max| max < bottom) {
            self.map.insert(
                key,
                ColumnExtent {
                    max_bottom: bottom,
                    node,
                },
            );
        }
    }

    /// Look up the extent for a column, if any node has been recorded there.
    #[must_use]
    pub fn query(&self, key: ColumnKey) -> Option<&ColumnExtent> {
        self.map.get(&key)
    }

    /// Find the nearest earlier tree with a record at this side/depth.
    ///
    /// Scans trees `before_tree - 1 .. 0` and returns the first non-empty
    /// record, together with the tree index it was found in. Used when the
    /// current tree has no local history at the column yet but an earlier
    /// tree's branch may still occupy it.
    #[must_use]
    pub fn query_across_trees(
        &self,
        side: Side,
        depth: usize,
        before_tree: usize,
    ) -> Option<(usize, &ColumnExtent)> {
        (0..before_tree).rev().find_map(|tree| {
            self.map
                .get(&ColumnKey { tree, side, depth })
                .map(|e| (tree, e))
        })
    }

    /// Add `delta` to an existing record's bottom edge.
    ///
    /// Used when a collision shift retroactively moves the contributing node;
    /// no-op for columns with no record.
    pub fn bump(&mut self, key: ColumnKey, delta: f64) {
        if let Some(extent) = self.map.get_mut(&key) {
            extent.max_bottom += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> NodeId {
        NodeId::new(n, 1)
    }

    fn key(tree: usize, depth: usize) -> ColumnKey {
        ColumnKey {
            tree,
            side: Side::Left,
            depth,
        }
    }

    #[test]
    fn record_keeps_the_maximum() {
        let mut extents = ColumnExtents::new();
        extents.record(key(0, 1), 120.0, id(1));
        extents.record(key(0, 1), 80.0, id(2));
        let e = extents.query(key(0, 1)).unwrap();
        assert_eq!(e.max_bottom, 120.0);
        assert_eq!(e.node, id(1));

        extents.record(key(0, 1), 200.0, id(3));
        let e = extents.query(key(0, 1)).unwrap();
        assert_eq!(e.max_bottom, 200.0);
        assert_eq!(e.node, id(3));
    }

    #[test]
    fn reset_clears_every_record() {
        let mut extents = ColumnExtents::new();
        extents.record(key(0, 1), 50.0, id(1));
        extents.record(key(1, 2), 90.0, id(2));
        extents.reset();
        assert!(extents.query(key(0, 1)).is_none());
        assert!(extents.query(key(1, 2)).is_none());
    }

    #[test]
    fn cross_tree_query_prefers_the_nearest_earlier_tree() {
        let mut extents = ColumnExtents::new();
        extents.record(key(0, 2), 300.0, id(1));
        extents.record(key(1, 2), 140.0, id(2));

        // Tree 2 has no local history at depth 2; tree 1 is nearer than tree 0.
        let (tree, e) = extents.query_across_trees(Side::Left, 2, 2).unwrap();
        assert_eq!(tree, 1);
        assert_eq!(e.max_bottom, 140.0);

        // Tree 1 only sees tree 0.
        let (tree, e) = extents.query_across_trees(Side::Left, 2, 1).unwrap();
        assert_eq!(tree, 0);
        assert_eq!(e.max_bottom, 300.0);

        // The first tree has nothing before it.
        assert!(extents.query_across_trees(Side::Left, 2, 0).is_none());

        // Sides are independent.
        assert!(extents.query_across_trees(Side::Right, 2, 2).is_none());
    }

    #[test]
    fn bump_moves_only_existing_records() {
        let mut extents = ColumnExtents::new();
        extents.record(key(0, 1), 100.0, id(1));
        extents.bump(key(0, 1), 35.0);
        assert_eq!(extents.query(key(0, 1)).unwrap().max_bottom, 135.0);

        extents.bump(key(0, 3), 35.0);
        assert!(extents.query(key(0, 3)).is_none());
    }
}
