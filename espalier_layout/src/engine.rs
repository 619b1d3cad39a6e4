// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine: owns the forest and its geometry, schedules passes, and
//! handles expand/collapse with child fetching.
//!
//! All timing is caller-passed milliseconds. The engine never blocks and
//! never runs a pass on its own; hosts call [`LayoutEngine::poll`] from their
//! frame loop and apply the returned placements. Requests made while a pass
//! would be premature collapse into a single pending slot, so a burst of
//! size reports ends in one relayout after the quiescence window.

use kurbo::Size;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extents::ColumnExtents;
use crate::forest::{Forest, NodeData, NodeSeed};
use crate::geometry::GeometryStore;
use crate::types::{LayoutBounds, LayoutOptions, NodeId, Side};
use crate::walk::{LayoutPass, PassOutput};

/// Supplies children for a node side on expand.
///
/// The engine is synchronous; hosts with async data sources resolve the
/// future themselves and call [`LayoutEngine::toggle_children`] when the
/// data is at hand, or implement this with a cache in front.
pub trait ChildSource {
    /// Fetch failure type.
    type Error;

    /// Produce the children for one side of `node`.
    fn fetch_children(&mut self, node: &NodeData, side: Side)
    -> Result<Vec<NodeSeed>, Self::Error>;
}

/// Why a toggle did not complete.
#[derive(Debug, Error)]
pub enum ToggleError<E> {
    /// The node id no longer refers to a live node.
    #[error("node is no longer in the forest")]
    Stale,
    /// The child fetch failed. The side still toggled open; a later
    /// collapse/expand retries the fetch.
    #[error("child fetch failed: {0}")]
    Fetch(E),
}

/// What a successful toggle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The side's new open state.
    pub open: bool,
    /// Whether children were fetched (rather than served from cache).
    pub fetched: bool,
    /// The node to bring into view: the middle child after an expand, the
    /// toggled node itself after a collapse.
    pub focus: Option<NodeId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PassState {
    Idle,
    Pending { due_at_ms: u64 },
    InPass,
}

/// The incremental layout engine.
#[derive(Debug)]
pub struct LayoutEngine {
    forest: Forest,
    geometry: GeometryStore,
    extents: ColumnExtents,
    options: LayoutOptions,
    container: Option<Size>,
    /// Widest measured card so far; every column is as wide as the widest.
    max_node_width: f64,
    state: PassState,
    positions_dirty: bool,
    tree_changed: bool,
    anchor: Option<NodeId>,
    last_bounds: LayoutBounds,
}

impl LayoutEngine {
    /// Create an engine with no trees.
    #[must_use]
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            forest: Forest::new(),
            geometry: GeometryStore::new(),
            extents: ColumnExtents::new(),
            options,
            container: None,
            max_node_width: 0.0,
            state: PassState::Idle,
            positions_dirty: false,
            tree_changed: false,
            anchor: None,
            last_bounds: LayoutBounds::reset(),
        }
    }

    /// Replace the whole forest. Geometry for surviving measurements is
    /// keyed by node identity, so everything starts unmeasured.
    pub fn replace_forest(&mut self, seeds: Vec<NodeSeed>, now_ms: u64) {
        info!(trees = seeds.len(), "forest replaced");
        self.forest = Forest::from_seeds(seeds);
        self.tree_changed = true;
        self.anchor = None;
        self.schedule(now_ms);
    }

    /// True once after each forest replacement; hosts use it to re-center
    /// the view when the new layout settles.
    pub fn take_tree_changed(&mut self) -> bool {
        core::mem::take(&mut self.tree_changed)
    }

    /// The node whose on-screen position should be preserved across the next
    /// relayout, recorded at the change that made the relayout necessary.
    pub fn take_anchor(&mut self) -> Option<NodeId> {
        self.anchor.take()
    }

    /// Report a rendered card's measured size.
    ///
    /// A both-zero size means the card is hidden and is ignored. Height
    /// changes beyond the tolerance schedule a debounced relayout anchored
    /// on the node; width changes only feed the shared column width.
    pub fn report_size(&mut self, id: NodeId, size: Size, now_ms: u64) {
        if size.width + size.height <= 0.0 {
            return;
        }
        if !self.forest.is_alive(id) {
            warn!(?id, "size report for a node not in the forest");
            return;
        }

        let old_height = self.geometry.get(id).and_then(|g| g.height);
        if let Some(old) = old_height {
            let diff = (size.height - old).abs();
            // Some renderers report a 1px flutter forever; treating it as a
            // change would oscillate.
            if diff > self.options.size_tolerance {
                debug!(?id, old, new = size.height, "card height changed");
                self.positions_dirty = true;
                self.anchor = Some(id);
                self.debounce(now_ms);
            }
        }

        let width = if size.width > 0.0 {
            size.width
        } else {
            self.options.card_width
        };
        self.max_node_width = self.max_node_width.max(width);
        self.geometry.set_size(id, size);
    }

    /// Ask for a relayout. Ignored while a pass is running.
    pub fn request_refresh(&mut self, now_ms: u64) {
        if self.state == PassState::InPass {
            return;
        }
        self.schedule(now_ms);
    }

    /// Update the measured container size the layout plane derives from.
    pub fn set_container(&mut self, size: Size, now_ms: u64) {
        if self.container != Some(size) {
            self.container = Some(size);
            self.schedule(now_ms);
        }
    }

    /// Run a pending pass if its due time has arrived.
    pub fn poll(&mut self, now_ms: u64) -> Option<PassOutput> {
        match self.state {
            PassState::Pending { due_at_ms } if now_ms >= due_at_ms => Some(self.run_pass(now_ms)),
            _ => None,
        }
    }

    /// Expand or collapse one side of a node, fetching children on first
    /// expand (or when the cache has gone stale).
    ///
    /// # Errors
    ///
    /// [`ToggleError::Stale`] if the id is dead. [`ToggleError::Fetch`] if
    /// the fetch failed; the side has still toggled open so the host's UI
    /// stays consistent with the click, just with nothing underneath.
    pub fn toggle_children<S: ChildSource>(
        &mut self,
        id: NodeId,
        side: Side,
        source: &mut S,
        now_ms: u64,
    ) -> Result<ToggleOutcome, ToggleError<S::Error>> {
        if !self.forest.is_alive(id) {
            return Err(ToggleError::Stale);
        }

        let mut fetched = false;
        if !self.forest.open(id, side) && self.needs_fetch(id, side, now_ms) {
            let data = self.forest.data(id).ok_or(ToggleError::Stale)?.clone();
            match source.fetch_children(&data, side) {
                Ok(seeds) => {
                    debug!(?id, ?side, children = seeds.len(), "children fetched");
                    self.forest.set_children(id, side, seeds, now_ms);
                    fetched = true;
                }
                Err(e) => {
                    warn!(?id, ?side, "child fetch failed");
                    self.forest.toggle_open(id, side);
                    self.anchor = Some(id);
                    self.schedule(now_ms);
                    return Err(ToggleError::Fetch(e));
                }
            }
        }

        let open = self.forest.toggle_open(id, side);
        let focus = if open {
            let children = self.forest.children(id, side);
            children.get(children.len() / 2).copied().or(Some(id))
        } else {
            Some(id)
        };
        self.anchor = Some(id);
        self.schedule(now_ms);
        Ok(ToggleOutcome {
            open,
            fetched,
            focus,
        })
    }

    fn needs_fetch(&self, id: NodeId, side: Side, now_ms: u64) -> bool {
        if !self.options.cache_children {
            return true;
        }
        if self.forest.children(id, side).is_empty() {
            return true;
        }
        match (self.forest.fetched_at(id, side), self.options.cache_max_age_ms) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(at), Some(max_age)) => now_ms.saturating_sub(at) > max_age,
        }
    }

    fn schedule(&mut self, now_ms: u64) {
        self.state = PassState::Pending { due_at_ms: now_ms };
    }

    fn debounce(&mut self, now_ms: u64) {
        // Latest-wins: every report pushes the due time out again.
        self.state = PassState::Pending {
            due_at_ms: now_ms + self.options.refresh_quiescence_ms,
        };
    }

    fn run_pass(&mut self, now_ms: u64) -> PassOutput {
        self.state = PassState::InPass;
        let plane = self.options.plane_size(self.container);
        let output = LayoutPass::new(
            &mut self.forest,
            &mut self.geometry,
            &mut self.extents,
            &self.options,
            plane,
            self.max_node_width,
        )
        .run();

        self.last_bounds = output.bounds;
        self.positions_dirty = false;
        // Cards emitted without a size need a render-measure round trip
        // before placement can finish; try again after quiescence.
        self.state = if output.sizes_ready {
            PassState::Idle
        } else {
            PassState::Pending {
                due_at_ms: now_ms + self.options.refresh_quiescence_ms,
            }
        };
        output
    }

    /// The forest being laid out.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Positions and sizes by node identity.
    #[must_use]
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    /// Bounding box from the most recent pass.
    #[must_use]
    pub fn bounds(&self) -> LayoutBounds {
        self.last_bounds
    }

    /// The option set the engine was built with.
    #[must_use]
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Widest card measured so far, or the configured fallback.
    #[must_use]
    pub fn column_width(&self) -> f64 {
        if self.max_node_width > 0.0 {
            self.max_node_width
        } else {
            self.options.card_width
        }
    }

    /// Whether a relayout is pending or a size change is waiting on one.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state == PassState::Idle && !self.positions_dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::NodeSeed;

    struct FixedSource {
        children: Vec<NodeSeed>,
        calls: usize,
    }

    impl ChildSource for FixedSource {
        type Error = &'static str;

        fn fetch_children(
            &mut self,
            _node: &NodeData,
            _side: Side,
        ) -> Result<Vec<NodeSeed>, Self::Error> {
            self.calls += 1;
            Ok(self.children.clone())
        }
    }

    struct FailingSource;

    impl ChildSource for FailingSource {
        type Error = &'static str;

        fn fetch_children(
            &mut self,
            _node: &NodeData,
            _side: Side,
        ) -> Result<Vec<NodeSeed>, Self::Error> {
            Err("backend down")
        }
    }

    fn engine_with_tree() -> LayoutEngine {
        let mut engine = LayoutEngine::new(LayoutOptions::default());
        engine.replace_forest(vec![NodeSeed::labeled("root")], 0);
        engine
    }

    fn settle(engine: &mut LayoutEngine, now_ms: u64) -> PassOutput {
        let mut now = now_ms;
        loop {
            if let Some(out) = engine.poll(now) {
                if out.sizes_ready {
                    return out;
                }
                for n in &out.nodes {
                    engine.report_size(*n, Size::new(200.0, 40.0), now);
                }
            }
            now += 1;
        }
    }

    #[test]
    fn unready_pass_rearms_until_sizes_arrive() {
        let mut engine = engine_with_tree();
        let out = engine.poll(0).expect("replace_forest schedules a pass");
        assert!(!out.sizes_ready);
        assert!(!engine.is_settled());

        let root = engine.forest().roots()[0];
        engine.report_size(root, Size::new(200.0, 40.0), 1);
        let out = settle(&mut engine, 2);
        assert!(out.sizes_ready);
        assert!(engine.is_settled());
        assert!(engine.geometry().is_placed(root));
    }

    #[test]
    fn size_reports_coalesce_into_one_debounced_pass() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        engine.report_size(root, Size::new(200.0, 40.0), 0);
        settle(&mut engine, 0);

        // A burst of height changes within the quiescence window.
        engine.report_size(root, Size::new(200.0, 80.0), 100);
        engine.report_size(root, Size::new(200.0, 90.0), 110);
        engine.report_size(root, Size::new(200.0, 95.0), 119);

        assert!(engine.poll(120).is_none(), "still inside the window");
        assert!(engine.poll(139).is_some(), "one pass after quiescence");
        assert!(engine.poll(140).is_none(), "burst produced a single pass");
    }

    #[test]
    fn sub_tolerance_height_noise_does_not_schedule() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        engine.report_size(root, Size::new(200.0, 40.0), 0);
        settle(&mut engine, 0);

        engine.report_size(root, Size::new(200.0, 40.5), 50);
        engine.report_size(root, Size::new(200.0, 39.5), 60);
        assert!(engine.poll(10_000).is_none());
        assert!(engine.is_settled());
        // The size itself is still recorded.
        assert_eq!(engine.geometry().height_or(root, 0.0), 39.5);
    }

    #[test]
    fn zero_size_reports_are_ignored() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        engine.report_size(root, Size::new(200.0, 40.0), 0);
        settle(&mut engine, 0);

        // Hidden cards measure 0x0; keep the last real size.
        engine.report_size(root, Size::ZERO, 10);
        assert_eq!(engine.geometry().height_or(root, 0.0), 40.0);
        assert!(engine.poll(10_000).is_none());
    }

    #[test]
    fn toggle_fetches_once_and_serves_cache_after() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        let mut source = FixedSource {
            children: vec![
                NodeSeed::labeled("a"),
                NodeSeed {
                    is_virtual: true,
                    ..NodeSeed::labeled("ghost")
                },
                NodeSeed::labeled("b"),
            ],
            calls: 0,
        };

        let out = engine
            .toggle_children(root, Side::Right, &mut source, 100)
            .unwrap();
        assert!(out.open);
        assert!(out.fetched);
        assert_eq!(source.calls, 1);
        assert_eq!(engine.forest().real_child_count(root, Side::Right), 2);
        assert_eq!(
            engine.forest().data(root).unwrap().right_virtual_num,
            Some(1)
        );
        // Expand focuses the middle child.
        let children = engine.forest().children(root, Side::Right);
        assert_eq!(out.focus, Some(children[1]));

        // Collapse, then re-expand: cache holds, no second fetch.
        let out = engine
            .toggle_children(root, Side::Right, &mut source, 200)
            .unwrap();
        assert!(!out.open);
        assert!(!out.fetched);
        assert_eq!(out.focus, Some(root));
        let out = engine
            .toggle_children(root, Side::Right, &mut source, 300)
            .unwrap();
        assert!(out.open);
        assert!(!out.fetched);
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn stale_cache_refetches() {
        let mut engine = LayoutEngine::new(LayoutOptions {
            cache_max_age_ms: Some(1_000),
            ..LayoutOptions::default()
        });
        engine.replace_forest(vec![NodeSeed::labeled("root")], 0);
        let root = engine.forest().roots()[0];
        let mut source = FixedSource {
            children: vec![NodeSeed::labeled("a")],
            calls: 0,
        };

        engine
            .toggle_children(root, Side::Left, &mut source, 0)
            .unwrap();
        engine
            .toggle_children(root, Side::Left, &mut source, 500)
            .unwrap();
        // Within max age: served from cache.
        engine
            .toggle_children(root, Side::Left, &mut source, 900)
            .unwrap();
        assert_eq!(source.calls, 1);

        engine
            .toggle_children(root, Side::Left, &mut source, 1_500)
            .unwrap();
        // Beyond max age: refetched.
        engine
            .toggle_children(root, Side::Left, &mut source, 3_000)
            .unwrap();
        assert_eq!(source.calls, 2);
    }

    #[test]
    fn failed_fetch_still_opens_the_side() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        let mut source = FailingSource;

        let err = engine
            .toggle_children(root, Side::Left, &mut source, 0)
            .unwrap_err();
        assert!(matches!(err, ToggleError::Fetch("backend down")));
        assert!(engine.forest().open(root, Side::Left));
        assert!(!engine.is_settled());
    }

    #[test]
    fn toggling_a_dead_node_is_an_error() {
        let mut engine = engine_with_tree();
        let root = engine.forest().roots()[0];
        let mut source = FixedSource {
            children: vec![NodeSeed::labeled("a")],
            calls: 0,
        };
        engine
            .toggle_children(root, Side::Left, &mut source, 0)
            .unwrap();
        let child = engine.forest().children(root, Side::Left)[0];
        engine.replace_forest(vec![NodeSeed::labeled("fresh")], 10);

        let err = engine
            .toggle_children(child, Side::Left, &mut source, 20)
            .unwrap_err();
        assert!(matches!(err, ToggleError::Stale));
    }

    #[test]
    fn replace_forest_flags_tree_change_and_anchors_reset() {
        let mut engine = engine_with_tree();
        assert!(engine.take_tree_changed());
        assert!(!engine.take_tree_changed());

        let root = engine.forest().roots()[0];
        engine.report_size(root, Size::new(200.0, 40.0), 0);
        settle(&mut engine, 0);
        engine.report_size(root, Size::new(200.0, 80.0), 100);
        assert_eq!(engine.take_anchor(), Some(root));

        engine.replace_forest(vec![NodeSeed::labeled("other")], 200);
        assert!(engine.take_tree_changed());
        assert_eq!(engine.take_anchor(), None);
    }
}
