// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node forest: a slot arena of trees whose nodes carry independent
//! `left` and `right` child lists.
//!
//! Caller-supplied data enters as [`NodeSeed`] values and is stored per node
//! as [`NodeData`]. The engine writes its own annotations (direction, tree
//! index, sibling flags, pinned fork offset, fetch timestamps) alongside;
//! those are never external input.

use crate::types::{Direction, NodeFlags, NodeId, Side};

/// Caller-supplied description of one node and its (optionally pre-populated)
/// subtrees.
#[derive(Clone, Debug, Default)]
pub struct NodeSeed {
    /// Stable application key. Nodes without one are still tracked by their
    /// arena identity, which is stable for the node's lifetime.
    pub key: Option<String>,
    /// Display label, if the host wants the engine to carry it.
    pub label: Option<String>,
    /// Pre-populated left children.
    pub left: Vec<NodeSeed>,
    /// Pre-populated right children.
    pub right: Vec<NodeSeed>,
    /// Real (non-virtual) left child count, usable before children are fetched.
    pub left_num: Option<usize>,
    /// Real (non-virtual) right child count, usable before children are fetched.
    pub right_num: Option<usize>,
    /// Virtual left child count.
    pub left_virtual_num: Option<usize>,
    /// Virtual right child count.
    pub right_virtual_num: Option<usize>,
    /// Whether the left side starts expanded.
    pub open_left: bool,
    /// Whether the right side starts expanded.
    pub open_right: bool,
    /// Placeholder node not yet backed by real data (drawn dashed).
    pub is_virtual: bool,
}

impl NodeSeed {
    /// A seed with a label and everything else defaulted.
    #[must_use]
    pub fn labeled(label: &str) -> Self {
        Self {
            label: Some(String::from(label)),
            ..Self::default()
        }
    }
}

/// Stored per-node caller data.
#[derive(Clone, Debug, Default)]
pub struct NodeData {
    /// Stable application key, if supplied.
    pub key: Option<String>,
    /// Display label, if supplied.
    pub label: Option<String>,
    /// Real left child count.
    pub left_num: Option<usize>,
    /// Real right child count.
    pub right_num: Option<usize>,
    /// Virtual left child count.
    pub left_virtual_num: Option<usize>,
    /// Virtual right child count.
    pub right_virtual_num: Option<usize>,
    /// Left side expanded.
    pub open_left: bool,
    /// Right side expanded.
    pub open_right: bool,
    /// Placeholder node.
    pub is_virtual: bool,
}

impl NodeData {
    fn from_seed(seed: &NodeSeed) -> Self {
        Self {
            key: seed.key.clone(),
            label: seed.label.clone(),
            left_num: seed.left_num,
            right_num: seed.right_num,
            left_virtual_num: seed.left_virtual_num,
            right_virtual_num: seed.right_virtual_num,
            open_left: seed.open_left,
            open_right: seed.open_right,
            is_virtual: seed.is_virtual,
        }
    }

    /// Whether the given side is expanded.
    #[must_use]
    pub fn open(&self, side: Side) -> bool {
        match side {
            Side::Left => self.open_left,
            Side::Right => self.open_right,
        }
    }

    /// Stored real child count for a side, defaulting to 0.
    #[must_use]
    pub fn num(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_num,
            Side::Right => self.right_num,
        }
        .unwrap_or(0)
    }

    /// Stored virtual child count for a side, defaulting to 0.
    #[must_use]
    pub fn virtual_num(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_virtual_num,
            Side::Right => self.right_virtual_num,
        }
        .unwrap_or(0)
    }
}

/// Engine-written annotations. Direction and tree index are assigned on the
/// node's first placement and then treated as immutable.
#[derive(Clone, Debug, Default)]
pub(crate) struct Annotations {
    pub(crate) direction: Option<Direction>,
    pub(crate) tree_index: Option<usize>,
    pub(crate) flags: NodeFlags,
    /// Distance from the node's top to where its child branches fan out.
    /// Pinned on first height measurement; later heights may only clamp it.
    pub(crate) fork_offset: Option<f64>,
    pub(crate) fetched_at_left: Option<u64>,
    pub(crate) fetched_at_right: Option<u64>,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    parent: Option<NodeId>,
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    pub(crate) data: NodeData,
    pub(crate) note: Annotations,
}

/// A forest of dual-direction trees, stored in a generational slot arena.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    nodes: Vec<Option<Node>>,
    /// Last generation per slot (persists across frees).
    generations: Vec<u32>,
    free_list: Vec<usize>,
    roots: Vec<NodeId>,
}

impl Forest {
    /// Create an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from one seed per tree, preserving stacking order.
    #[must_use]
    pub fn from_seeds(seeds: Vec<NodeSeed>) -> Self {
        let mut forest = Self::new();
        for seed in seeds {
            forest.push_tree(seed);
        }
        forest
    }

    /// Append a tree to the forest; returns its center node.
    pub fn push_tree(&mut self, seed: NodeSeed) -> NodeId {
        let root = self.insert_seed(None, &seed);
        self.roots.push(root);
        root
    }

    /// The center nodes of all trees, in stacking order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns true if `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Caller data for a live node.
    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node_opt(id).map(|n| &n.data)
    }

    /// Children on one side, or an empty slice for stale ids.
    #[must_use]
    pub fn children(&self, id: NodeId, side: Side) -> &[NodeId] {
        match self.node_opt(id) {
            Some(n) => match side {
                Side::Left => &n.left,
                Side::Right => &n.right,
            },
            None => &[],
        }
    }

    /// Parent of a live node, or `None` for roots and stale ids.
    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Whether a side is expanded. Stale ids read as closed.
    #[must_use]
    pub fn open(&self, id: NodeId, side: Side) -> bool {
        self.data(id).is_some_and(|d| d.open(side))
    }

    /// Flip a side's open flag; returns the new state.
    pub fn toggle_open(&mut self, id: NodeId, side: Side) -> bool {
        match self.node_opt_mut(id) {
            Some(n) => {
                let flag = match side {
                    Side::Left => &mut n.data.open_left,
                    Side::Right => &mut n.data.open_right,
                };
                *flag = !*flag;
                *flag
            }
            None => false,
        }
    }

    /// Direction annotation, if the node has been placed at least once.
    #[must_use]
    pub fn direction(&self, id: NodeId) -> Option<Direction> {
        self.node_opt(id).and_then(|n| n.note.direction)
    }

    /// Tree index annotation, if the node has been placed at least once.
    #[must_use]
    pub fn tree_index(&self, id: NodeId) -> Option<usize> {
        self.node_opt(id).and_then(|n| n.note.tree_index)
    }

    /// Annotation flags (root / first / last / virtual) as of the last pass.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node_opt(id)
            .map(|n| n.note.flags)
            .unwrap_or(NodeFlags::empty())
    }

    /// Pinned fork offset, once a height has been observed.
    #[must_use]
    pub fn fork_offset(&self, id: NodeId) -> Option<f64> {
        self.node_opt(id).and_then(|n| n.note.fork_offset)
    }

    /// When children on a side were last fetched, if ever.
    #[must_use]
    pub fn fetched_at(&self, id: NodeId, side: Side) -> Option<u64> {
        self.node_opt(id).and_then(|n| match side {
            Side::Left => n.note.fetched_at_left,
            Side::Right => n.note.fetched_at_right,
        })
    }

    /// Real (non-virtual) child count for display.
    ///
    /// Counts materialized children when present; otherwise falls back to the
    /// caller-supplied per-side count.
    #[must_use]
    pub fn real_child_count(&self, id: NodeId, side: Side) -> usize {
        let children = self.children(id, side);
        if children.is_empty() {
            return self.data(id).map(|d| d.num(side)).unwrap_or(0);
        }
        children
            .iter()
            .filter(|c| self.data(**c).is_none_or(|d| !d.is_virtual))
            .count()
    }

    /// Replace a side's children with freshly fetched seeds.
    ///
    /// Old children (and their subtrees) are removed. Per-side counts are
    /// rederived: virtual = seeds flagged virtual, real = total − virtual.
    /// The side's fetch timestamp is set to `now_ms`.
    pub fn set_children(&mut self, id: NodeId, side: Side, seeds: Vec<NodeSeed>, now_ms: u64) {
        if !self.is_alive(id) {
            return;
        }
        let old: Vec<NodeId> = self.children(id, side).to_vec();
        for child in old {
            self.remove(child);
        }

        let virtual_num = seeds.iter().filter(|s| s.is_virtual).count();
        let real_num = seeds.len() - virtual_num;
        let mut new_children = Vec::with_capacity(seeds.len());
        for seed in &seeds {
            new_children.push(self.insert_seed(Some(id), seed));
        }

        let node = self.node_mut(id);
        match side {
            Side::Left => {
                node.left = new_children;
                node.data.left_num = Some(real_num);
                node.data.left_virtual_num = Some(virtual_num);
                node.note.fetched_at_left = Some(now_ms);
            }
            Side::Right => {
                node.right = new_children;
                node.data.right_num = Some(real_num);
                node.data.right_virtual_num = Some(virtual_num);
                node.note.fetched_at_right = Some(now_ms);
            }
        }
    }

    /// Remove a node and its subtree. The id becomes stale immediately.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        let (left, right) = {
            let n = self.node_mut(id);
            (core::mem::take(&mut n.left), core::mem::take(&mut n.right))
        };
        for child in left.into_iter().chain(right) {
            self.remove(child);
        }
        self.roots.retain(|r| *r != id);
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    // --- internals ---

    fn insert_seed(&mut self, parent: Option<NodeId>, seed: &NodeSeed) -> NodeId {
        let id = self.alloc(parent, NodeData::from_seed(seed));
        let left: Vec<NodeId> = seed
            .left
            .iter()
            .map(|child| self.insert_seed(Some(id), child))
            .collect();
        let right: Vec<NodeId> = seed
            .right
            .iter()
            .map(|child| self.insert_seed(Some(id), child))
            .collect();
        let node = self.node_mut(id);
        node.left = left;
        node.right = right;
        id
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node ids carry 32-bit slot indices."
    )]
    fn alloc(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let node = Node {
            generation: 0,
            parent,
            left: Vec::new(),
            right: Vec::new(),
            data,
            note: Annotations::default(),
        };
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node { generation, ..node });
            NodeId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node { generation, ..node }));
            self.generations.push(generation);
            NodeId::new((self.nodes.len() - 1) as u32, generation)
        }
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_build_linked_subtrees_on_both_sides() {
        let mut forest = Forest::new();
        let root = forest.push_tree(NodeSeed {
            label: Some(String::from("root")),
            left: vec![NodeSeed::labeled("l0"), NodeSeed::labeled("l1")],
            right: vec![NodeSeed::labeled("r0")],
            open_left: true,
            ..NodeSeed::default()
        });

        assert_eq!(forest.roots(), &[root]);
        let left = forest.children(root, Side::Left).to_vec();
        assert_eq!(left.len(), 2);
        assert_eq!(forest.children(root, Side::Right).len(), 1);
        assert_eq!(forest.parent_of(left[0]), Some(root));
        assert_eq!(forest.parent_of(root), None);
        assert!(forest.open(root, Side::Left));
        assert!(!forest.open(root, Side::Right));
    }

    #[test]
    fn set_children_rederives_counts_and_timestamp() {
        let mut forest = Forest::new();
        let root = forest.push_tree(NodeSeed::labeled("root"));

        forest.set_children(
            root,
            Side::Right,
            vec![
                NodeSeed::labeled("a"),
                NodeSeed {
                    is_virtual: true,
                    ..NodeSeed::labeled("ghost")
                },
                NodeSeed::labeled("b"),
            ],
            1234,
        );

        let data = forest.data(root).unwrap();
        assert_eq!(data.right_num, Some(2));
        assert_eq!(data.right_virtual_num, Some(1));
        assert_eq!(forest.fetched_at(root, Side::Right), Some(1234));
        assert_eq!(forest.real_child_count(root, Side::Right), 2);
        assert_eq!(forest.children(root, Side::Right).len(), 3);
    }

    #[test]
    fn set_children_removes_the_old_subtree() {
        let mut forest = Forest::new();
        let root = forest.push_tree(NodeSeed {
            left: vec![NodeSeed {
                left: vec![NodeSeed::labeled("grandchild")],
                ..NodeSeed::labeled("child")
            }],
            ..NodeSeed::labeled("root")
        });
        let old_child = forest.children(root, Side::Left)[0];
        let old_grandchild = forest.children(old_child, Side::Left)[0];

        forest.set_children(root, Side::Left, vec![NodeSeed::labeled("new")], 1);
        assert!(!forest.is_alive(old_child));
        assert!(!forest.is_alive(old_grandchild));
        assert_eq!(forest.children(root, Side::Left).len(), 1);
    }

    #[test]
    fn slot_reuse_bumps_generations() {
        let mut forest = Forest::new();
        let root = forest.push_tree(NodeSeed::labeled("root"));
        forest.set_children(root, Side::Left, vec![NodeSeed::labeled("a")], 1);
        let a = forest.children(root, Side::Left)[0];
        forest.set_children(root, Side::Left, vec![NodeSeed::labeled("b")], 2);
        let b = forest.children(root, Side::Left)[0];

        assert!(!forest.is_alive(a));
        assert!(forest.is_alive(b));
        if a.0 == b.0 {
            assert!(b.1 > a.1, "generation must increase on reuse");
        }
    }

    #[test]
    fn real_child_count_falls_back_to_declared_numbers() {
        let mut forest = Forest::new();
        let root = forest.push_tree(NodeSeed {
            left_num: Some(4),
            ..NodeSeed::labeled("root")
        });
        // No materialized children yet; the declared count stands in.
        assert_eq!(forest.real_child_count(root, Side::Left), 4);
        assert_eq!(forest.real_child_count(root, Side::Right), 0);
    }
}
