// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The geometry store: a non-owning side table of per-node positions and
//! sizes, keyed by node identity.
//!
//! Fields arrive independently: `top`/`left` are written only by the
//! traversal engine, `width`/`height` only by measurement intake, and either
//! pair may be known first. Writes therefore merge into the existing entry
//! rather than replacing it. Entries are never invalidated; records for nodes
//! that have left the forest are simply no longer consulted.

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};

use crate::types::NodeId;

/// One geometry record. Any subset of the fields may be known.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeGeometry {
    /// Vertical position in the layout plane.
    pub top: Option<f64>,
    /// Horizontal position in the layout plane.
    pub left: Option<f64>,
    /// Measured width.
    pub width: Option<f64>,
    /// Measured height.
    pub height: Option<f64>,
}

impl NodeGeometry {
    /// Top-left corner, if placed.
    #[must_use]
    pub fn origin(&self) -> Option<Point> {
        Some(Point::new(self.left?, self.top?))
    }

    /// Measured size, if known.
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        Some(Size::new(self.width?, self.height?))
    }

    /// Full rectangle; requires both placement and measurement.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        let origin = self.origin()?;
        Some(Rect::from_origin_size(origin, self.size()?))
    }
}

/// Side table mapping node identity to geometry.
#[derive(Clone, Debug, Default)]
pub struct GeometryStore {
    map: HashMap<NodeId, NodeGeometry>,
}

impl GeometryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node's record.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeGeometry> {
        self.map.get(&id)
    }

    /// Write a node's placement, merging with any known size.
    pub fn set_position(&mut self, id: NodeId, top: f64, left: f64) {
        let entry = self.map.entry(id).or_default();
        entry.top = Some(top);
        entry.left = Some(left);
    }

    /// Write a node's measured size, merging with any known placement.
    pub fn set_size(&mut self, id: NodeId, size: Size) {
        let entry = self.map.entry(id).or_default();
        entry.width = Some(size.width);
        entry.height = Some(size.height);
    }

    /// Move a placed node down (or up, for negative `delta`).
    ///
    /// No-op for nodes that have never been placed.
    pub fn shift_top(&mut self, id: NodeId, delta: f64) {
        if let Some(entry) = self.map.get_mut(&id)
            && let Some(top) = entry.top
        {
            entry.top = Some(top + delta);
        }
    }

    /// `top` with a fallback for unplaced nodes.
    #[must_use]
    pub fn top_or(&self, id: NodeId, default: f64) -> f64 {
        self.get(id).and_then(|g| g.top).unwrap_or(default)
    }

    /// `left` with a fallback for unplaced nodes.
    #[must_use]
    pub fn left_or(&self, id: NodeId, default: f64) -> f64 {
        self.get(id).and_then(|g| g.left).unwrap_or(default)
    }

    /// `width` with a fallback for unmeasured nodes.
    #[must_use]
    pub fn width_or(&self, id: NodeId, default: f64) -> f64 {
        self.get(id).and_then(|g| g.width).unwrap_or(default)
    }

    /// `height` with a fallback for unmeasured nodes.
    #[must_use]
    pub fn height_or(&self, id: NodeId, default: f64) -> f64 {
        self.get(id).and_then(|g| g.height).unwrap_or(default)
    }

    /// Whether the node has ever reported a measured width.
    #[must_use]
    pub fn has_size(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|g| g.width.is_some())
    }

    /// Whether the node has ever been placed.
    #[must_use]
    pub fn is_placed(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|g| g.top.is_some())
    }

    /// Full rectangle for a node that is both placed and measured.
    #[must_use]
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.get(id).and_then(NodeGeometry::rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> NodeId {
        NodeId::new(n, 1)
    }

    #[test]
    fn size_and_position_merge_independently() {
        let mut store = GeometryStore::new();
        store.set_size(id(0), Size::new(200.0, 48.0));
        assert!(store.has_size(id(0)));
        assert!(!store.is_placed(id(0)));
        assert_eq!(store.rect(id(0)), None);

        store.set_position(id(0), 10.0, 30.0);
        assert_eq!(
            store.rect(id(0)),
            Some(Rect::from_origin_size(
                Point::new(30.0, 10.0),
                Size::new(200.0, 48.0)
            ))
        );

        // A later size update keeps the placement.
        store.set_size(id(0), Size::new(200.0, 64.0));
        assert_eq!(store.top_or(id(0), 0.0), 10.0);
        assert_eq!(store.height_or(id(0), 0.0), 64.0);
    }

    #[test]
    fn defaults_apply_for_unknown_nodes() {
        let store = GeometryStore::new();
        assert_eq!(store.top_or(id(9), 7.0), 7.0);
        assert_eq!(store.width_or(id(9), 200.0), 200.0);
        assert!(!store.has_size(id(9)));
    }

    #[test]
    fn shift_top_only_moves_placed_nodes() {
        let mut store = GeometryStore::new();
        store.set_size(id(1), Size::new(100.0, 40.0));
        store.shift_top(id(1), 25.0);
        assert!(!store.is_placed(id(1)));

        store.set_position(id(1), 100.0, 0.0);
        store.shift_top(id(1), 25.0);
        assert_eq!(store.top_or(id(1), 0.0), 125.0);
        store.shift_top(id(1), -5.0);
        assert_eq!(store.top_or(id(1), 0.0), 120.0);
    }
}
