// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One placement pass over the forest.
//!
//! A pass walks every tree in stacking order, the left half first (the walk
//! that also places the tree's center node) and then the right half. Nodes
//! are visited pre-order, so a sibling's entire subtree is placed before the
//! next sibling starts; the column-extent tracker then only ever has to look
//! "up and back" to detect overlap with branches laid out earlier.
//!
//! A node with no measured width cannot be placed. It is still emitted so the
//! host can render and measure it, its subtree is still walked, and the pass
//! reports `sizes_ready = false` so the scheduler knows to run again once
//! measurements arrive.

use hashbrown::HashMap;
use kurbo::Size;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::extents::{ColumnExtents, ColumnKey};
use crate::forest::Forest;
use crate::geometry::GeometryStore;
use crate::types::{Direction, LayoutBounds, LayoutOptions, NodeFlags, NodeId, Side};

/// Traversal context recorded for each node visited in a pass.
#[derive(Clone, Debug)]
pub(crate) struct PassCtx {
    /// Depth below the center node (children of the center are depth 1).
    pub depth: usize,
    /// Position in the sibling list.
    pub index: usize,
    /// Parent, or `None` for the center node.
    pub parent: Option<NodeId>,
    /// Ancestor chain, center node first.
    pub parents: SmallVec<[NodeId; 8]>,
}

/// Result of one pass.
#[derive(Clone, Debug)]
pub struct PassOutput {
    /// Every emitted node, in render order.
    pub nodes: Vec<NodeId>,
    /// Bounding box of everything placed.
    pub bounds: LayoutBounds,
    /// False when at least one emitted node had no measured width yet.
    pub sizes_ready: bool,
}

struct Frame {
    id: NodeId,
    depth: usize,
    index: usize,
    parent: Option<NodeId>,
}

/// A single pass, borrowing the engine's stores for its duration.
pub(crate) struct LayoutPass<'a> {
    forest: &'a mut Forest,
    geometry: &'a mut GeometryStore,
    extents: &'a mut ColumnExtents,
    options: &'a LayoutOptions,
    plane: Size,
    max_node_width: f64,
    ctx: HashMap<NodeId, PassCtx>,
    bounds: LayoutBounds,
    sizes_ready: bool,
}

impl<'a> LayoutPass<'a> {
    pub(crate) fn new(
        forest: &'a mut Forest,
        geometry: &'a mut GeometryStore,
        extents: &'a mut ColumnExtents,
        options: &'a LayoutOptions,
        plane: Size,
        max_node_width: f64,
    ) -> Self {
        Self {
            forest,
            geometry,
            extents,
            options,
            plane,
            max_node_width,
            ctx: HashMap::new(),
            bounds: LayoutBounds::reset(),
            sizes_ready: true,
        }
    }

    /// Run the pass over every tree.
    pub(crate) fn run(mut self) -> PassOutput {
        self.extents.reset();
        let roots: Vec<NodeId> = self.forest.roots().to_vec();
        debug!(trees = roots.len(), "layout pass start");

        let mut nodes = Vec::new();
        for (tree, root) in roots.iter().enumerate() {
            let left = self.walk_side(&roots, tree, *root, Side::Left, true, &[]);
            let right = self.walk_side(&roots, tree, *root, Side::Right, false, &left);
            nodes.extend(left);
            nodes.extend(right);
        }

        debug!(
            emitted = nodes.len(),
            sizes_ready = self.sizes_ready,
            "layout pass done"
        );
        PassOutput {
            nodes,
            bounds: self.bounds,
            sizes_ready: self.sizes_ready,
        }
    }

    /// Width a card column occupies, before any node has been measured.
    fn node_width(&self) -> f64 {
        if self.max_node_width > 0.0 {
            self.max_node_width
        } else {
            self.options.card_width
        }
    }

    fn walk_side(
        &mut self,
        roots: &[NodeId],
        tree: usize,
        root: NodeId,
        side: Side,
        include_center: bool,
        other_side: &[NodeId],
    ) -> Vec<NodeId> {
        let mut emitted = Vec::new();
        let mut stack = vec![Frame {
            id: root,
            depth: 0,
            index: 0,
            parent: None,
        }];

        while let Some(frame) = stack.pop() {
            let descend = self.visit(roots, tree, side, include_center, other_side, &frame, &mut emitted);
            if descend {
                let children: SmallVec<[NodeId; 8]> =
                    self.forest.children(frame.id, side).iter().copied().collect();
                for (index, child) in children.iter().enumerate().rev() {
                    stack.push(Frame {
                        id: *child,
                        depth: frame.depth + 1,
                        index,
                        parent: Some(frame.id),
                    });
                }
            }
        }
        emitted
    }

    /// Place one node. Returns whether its children should be walked.
    #[allow(
        clippy::too_many_lines,
        reason = "Placement, collision handling, and bookkeeping form one sequential step."
    )]
    fn visit(
        &mut self,
        roots: &[NodeId],
        tree: usize,
        side: Side,
        include_center: bool,
        other_side: &[NodeId],
        frame: &Frame,
        emitted: &mut Vec<NodeId>,
    ) -> bool {
        let id = frame.id;
        let is_root = frame.parent.is_none();

        let parents = match frame.parent {
            Some(p) => {
                let mut chain = self.ctx.get(&p).map(|c| c.parents.clone()).unwrap_or_default();
                chain.push(p);
                chain
            }
            None => SmallVec::new(),
        };
        self.ctx.insert(
            id,
            PassCtx {
                depth: frame.depth,
                index: frame.index,
                parent: frame.parent,
                parents,
            },
        );

        let is_virtual = self.forest.data(id).is_some_and(|d| d.is_virtual);
        {
            let note = &mut self.forest.node_mut(id).note;
            note.direction = Some(if is_root {
                Direction::Center
            } else {
                side.direction()
            });
            note.tree_index = Some(tree);
            let mut flags = NodeFlags::empty();
            flags.set(NodeFlags::ROOT, is_root);
            flags.set(NodeFlags::VIRTUAL, is_virtual);
            note.flags = flags;
        }

        // Unmeasured nodes are emitted for measurement but not placed. Their
        // subtree is still walked, open or not, so it gets measured too.
        if !self.geometry.has_size(id) {
            self.sizes_ready = false;
            if !is_root || include_center {
                emitted.push(id);
            }
            return true;
        }

        // Pin the fork point at the node's first measured height; later
        // growth may not push it below the card's center.
        if let Some(h) = self.geometry.get(id).and_then(|g| g.height) {
            let note = &mut self.forest.node_mut(id).note;
            note.fork_offset = Some(match note.fork_offset {
                None => h / 2.0,
                Some(f) => f.min(h / 2.0),
            });
        }

        let open = self.forest.open(id, side);
        if is_root {
            if !include_center {
                return open;
            }
            self.place_center(roots, tree, id);
            emitted.push(id);
            return open;
        }

        let parent = frame.parent.expect("non-root node has a parent");
        let peers: SmallVec<[NodeId; 8]> =
            self.forest.children(parent, side).iter().copied().collect();
        {
            let note = &mut self.forest.node_mut(id).note;
            note.flags.set(NodeFlags::FIRST, frame.index == 0);
            note.flags.set(NodeFlags::LAST, frame.index + 1 == peers.len());
        }

        let gap_y = self.options.card_gap_y;
        let span_width = self.node_width() + self.options.card_gap_x;
        let prev_peer = (frame.index > 0).then(|| peers[frame.index - 1]);
        let span_height = prev_peer.map_or(0.0, |p| self.geometry.height_or(p, 0.0)) + gap_y;

        let total_height = peers
            .iter()
            .map(|p| self.geometry.height_or(*p, 0.0))
            .sum::<f64>()
            + (peers.len() as f64 - 1.0) * gap_y;

        let parent_fork = self
            .forest
            .fork_offset(parent)
            .unwrap_or_else(|| self.geometry.height_or(parent, 0.0) / 2.0);
        let mut first_peer_top =
            self.geometry.top_or(parent, 0.0) + parent_fork - total_height / 2.0;
        if peers.len() > 1 {
            // The first and last sibling bracket the fan symmetrically; a
            // height difference between them skews the visual center, so the
            // block shifts by a quarter of it.
            let height_diff = self.geometry.height_or(peers[0], 0.0)
                - self.geometry.height_or(peers[peers.len() - 1], 0.0);
            first_peer_top -= height_diff / 4.0;
        }

        let mut top = match prev_peer {
            None => first_peer_top,
            Some(p) => self.geometry.top_or(p, 0.0) + span_height,
        };
        let left = self.geometry.left_or(parent, 0.0) + side.sign() * span_width;

        // Check the column for a branch laid out earlier, in this tree or an
        // earlier one.
        let key = ColumnKey {
            tree,
            side,
            depth: frame.depth,
        };
        let occupied = match self.extents.query(key) {
            Some(e) => Some((e.max_bottom, true)),
            None => self
                .extents
                .query_across_trees(side, frame.depth, tree)
                .map(|(_, e)| (e.max_bottom, false)),
        };
        if let Some((max_bottom, at_cur_tree)) = occupied {
            let limit = max_bottom + self.options.branch_gap;
            if top < limit {
                let diff = limit - top;
                top = limit;
                trace!(?side, tree, depth = frame.depth, diff, at_cur_tree, "column collision");
                let diff = if at_cur_tree {
                    self.shift_ancestors(tree, side, frame.depth, id, diff)
                } else {
                    self.shift_emitted(tree, side, emitted, diff);
                    diff
                };
                self.shift_other_side(tree, other_side, at_cur_tree, diff);
            }
        }

        self.geometry.set_position(id, top, left);

        match side {
            Side::Left => self.bounds.include_left(left),
            Side::Right => self.bounds.include_right(left + span_width),
        }
        self.bounds.include_top(top);
        self.bounds.include_bottom(top + span_height);

        if frame.index + 1 == peers.len() {
            self.extents
                .record(key, top + self.geometry.height_or(id, 0.0), id);
        }

        emitted.push(id);
        open
    }

    fn place_center(&mut self, roots: &[NodeId], tree: usize, id: NodeId) {
        let gap_y = self.options.card_gap_y;
        let (top, left) = if tree == 0 {
            // The first center anchors the whole forest: the stacked centers
            // are vertically centered in the plane, the cards horizontally.
            let centers_total = roots
                .iter()
                .map(|r| self.geometry.height_or(*r, 0.0))
                .sum::<f64>()
                + (roots.len() as f64 - 1.0) * gap_y;
            let top = (self.plane.height.max(centers_total) - centers_total) / 2.0;
            let left = (self.plane.width - self.node_width()) / 2.0;
            (top, left)
        } else {
            let prev = roots[tree - 1];
            let span_height = self.geometry.height_or(prev, 0.0) + gap_y;
            let top = self.geometry.top_or(prev, 0.0) + span_height;
            let left = self.geometry.left_or(prev, 0.0);
            self.bounds.include_bottom(top + span_height);
            (top, left)
        };
        self.geometry.set_position(id, top, left);
    }

    /// Same-tree collision: pull the ancestor chain down, nearest first, with
    /// the shift halving at every ancestor that is not a first child.
    /// Returns the decayed remainder, which the opposite side absorbs.
    fn shift_ancestors(
        &mut self,
        tree: usize,
        side: Side,
        depth: usize,
        id: NodeId,
        mut diff: f64,
    ) -> f64 {
        let parents = self
            .ctx
            .get(&id)
            .map(|c| c.parents.clone())
            .unwrap_or_default();
        let mut walk_depth = depth;
        for ancestor in parents.iter().rev() {
            self.geometry.shift_top(*ancestor, diff);
            walk_depth -= 1;
            self.extents.bump(
                ColumnKey {
                    tree,
                    side,
                    depth: walk_depth,
                },
                diff,
            );
            if self.ctx.get(ancestor).is_some_and(|c| c.index > 0) {
                diff /= 2.0;
            }
        }
        diff
    }

    /// Cross-tree collision: everything this walk has emitted so far moves
    /// down as a block, and each touched column's extent moves with it.
    fn shift_emitted(&mut self, tree: usize, side: Side, emitted: &[NodeId], diff: f64) {
        let mut bumped: SmallVec<[usize; 8]> = SmallVec::new();
        for n in emitted {
            self.geometry.shift_top(*n, diff);
            if let Some(ctx) = self.ctx.get(n)
                && !bumped.contains(&ctx.depth)
            {
                bumped.push(ctx.depth);
                self.extents.bump(
                    ColumnKey {
                        tree,
                        side,
                        depth: ctx.depth,
                    },
                    diff,
                );
            }
        }
    }

    /// Either kind of collision also moves the already-walked opposite side,
    /// so the two halves stay attached to their shared centers. Within one
    /// tree the center itself stays put.
    fn shift_other_side(&mut self, tree: usize, other_side: &[NodeId], at_cur_tree: bool, diff: f64) {
        let mut bumped: SmallVec<[(Side, usize); 8]> = SmallVec::new();
        for n in other_side {
            if at_cur_tree && self.forest.flags(*n).contains(NodeFlags::ROOT) {
                continue;
            }
            self.geometry.shift_top(*n, diff);
            let Some(ctx) = self.ctx.get(n) else { continue };
            let depth = ctx.depth;
            let Some(node_side) = self.forest.direction(*n).and_then(Direction::side) else {
                continue;
            };
            if bumped.contains(&(node_side, depth)) {
                continue;
            }
            bumped.push((node_side, depth));
            self.extents.bump(
                ColumnKey {
                    tree,
                    side: node_side,
                    depth,
                },
                diff,
            );
        }
    }
}
