// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the layout engine: node identifiers, directions, flags,
//! and the flat option set.

use kurbo::Size;

/// Identifier for a node in the forest (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// One of the two expandable sides of a node.
///
/// Every node can carry an independent child list on each side; the shared
/// root of a tree fans out in both directions at once.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    /// Children branch off toward negative x.
    Left,
    /// Children branch off toward positive x.
    Right,
}

impl Side {
    /// The annotation direction corresponding to this side.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Left => Direction::Left,
            Self::Right => Direction::Right,
        }
    }

    /// Sign of the horizontal step away from the parent.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Which half of a tree a node belongs to.
///
/// Assigned on first placement and immutable afterwards; re-parenting a node
/// under the opposite direction is not supported.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// The shared root of a tree.
    Center,
    /// A node in the left half.
    Left,
    /// A node in the right half.
    Right,
}

impl Direction {
    /// The side this direction lies on, or `None` for the center node.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Center => None,
            Self::Left => Some(Side::Left),
            Self::Right => Some(Side::Right),
        }
    }
}

bitflags::bitflags! {
    /// Per-node annotation flags written by the traversal engine.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Shared root of its tree.
        const ROOT    = 0b0000_0001;
        /// First node in its sibling list (this pass).
        const FIRST   = 0b0000_0010;
        /// Last node in its sibling list (this pass).
        const LAST    = 0b0000_0100;
        /// Placeholder child not yet backed by fetched data.
        const VIRTUAL = 0b0000_1000;
    }
}

/// Flat option set for the layout engine. All fields have defaults.
#[derive(Clone, Debug)]
pub struct LayoutOptions {
    /// Nominal canvas width; the layout plane is 1.5× this (or the measured
    /// container, whichever is larger).
    pub canvas_width: f64,
    /// Nominal canvas height; the layout plane is 1.5× this.
    pub canvas_height: f64,
    /// Fallback card width used before any node has been measured.
    pub card_width: f64,
    /// Horizontal spacing between a parent card and its children.
    pub card_gap_x: f64,
    /// Vertical gap between stacked siblings, and between stacked tree centers.
    pub card_gap_y: f64,
    /// Clearance enforced between vertically adjacent branches sharing a column.
    pub branch_gap: f64,
    /// Whether fetched children are cached on the node.
    pub cache_children: bool,
    /// Maximum cache age in milliseconds before a re-expand refetches.
    /// `None` means cached children never go stale.
    pub cache_max_age_ms: Option<u64>,
    /// Measured size deltas at or below this many pixels are treated as noise.
    pub size_tolerance: f64,
    /// Quiescence window for measurement-triggered relayouts, in milliseconds.
    pub refresh_quiescence_ms: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            canvas_width: 1280.0,
            canvas_height: 800.0,
            card_width: 200.0,
            // 40 + two 16px stub lines + the 26px toggle button.
            card_gap_x: 40.0 + 16.0 * 2.0 + 26.0,
            card_gap_y: 20.0,
            branch_gap: 50.0,
            cache_children: true,
            cache_max_age_ms: None,
            size_tolerance: 1.0,
            refresh_quiescence_ms: 20,
        }
    }
}

impl LayoutOptions {
    /// The layout plane the traversal centers content against.
    ///
    /// 1.5× the configured canvas, widened to the measured container when the
    /// host supplies one.
    #[must_use]
    pub fn plane_size(&self, container: Option<Size>) -> Size {
        let base = container.unwrap_or(Size::new(self.canvas_width, self.canvas_height));
        Size::new(
            (base.width * 1.5).max(self.canvas_width * 1.5),
            (base.height * 1.5).max(self.canvas_height * 1.5),
        )
    }
}

/// Bounding box of everything placed during one pass, in layout-plane
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutBounds {
    /// Leftmost placed edge.
    pub min_left: f64,
    /// Topmost placed edge.
    pub min_top: f64,
    /// Rightmost placed edge (including the horizontal span).
    pub max_left: f64,
    /// Bottommost placed edge (including the vertical span).
    pub max_top: f64,
}

impl Default for LayoutBounds {
    fn default() -> Self {
        Self::reset()
    }
}

impl LayoutBounds {
    /// The pass-start baseline: mins at `+inf`, maxes at 0.
    #[must_use]
    pub const fn reset() -> Self {
        Self {
            min_left: f64::INFINITY,
            min_top: f64::INFINITY,
            max_left: 0.0,
            max_top: 0.0,
        }
    }

    /// Widen the box to include a point contribution. Non-finite values
    /// contribute 0 so the box stays well-defined before measurement.
    pub fn include_left(&mut self, left: f64) {
        self.min_left = self.min_left.min(finite_or_zero(left));
    }

    /// Widen the right edge.
    pub fn include_right(&mut self, right: f64) {
        self.max_left = self.max_left.max(finite_or_zero(right));
    }

    /// Widen the top edge.
    pub fn include_top(&mut self, top: f64) {
        self.min_top = self.min_top.min(finite_or_zero(top));
    }

    /// Widen the bottom edge.
    pub fn include_bottom(&mut self, bottom: f64) {
        self.max_top = self.max_top.max(finite_or_zero(bottom));
    }
}

pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_signs_and_directions() {
        assert_eq!(Side::Left.sign(), -1.0);
        assert_eq!(Side::Right.sign(), 1.0);
        assert_eq!(Side::Left.direction(), Direction::Left);
        assert_eq!(Direction::Center.side(), None);
        assert_eq!(Direction::Right.side(), Some(Side::Right));
    }

    #[test]
    fn plane_size_takes_the_larger_of_container_and_canvas() {
        let options = LayoutOptions::default();
        let plane = options.plane_size(None);
        assert_eq!(plane, Size::new(1280.0 * 1.5, 800.0 * 1.5));

        let plane = options.plane_size(Some(Size::new(2000.0, 400.0)));
        assert_eq!(plane.width, 3000.0);
        assert_eq!(plane.height, 1200.0);
    }

    #[test]
    fn bounds_ignore_non_finite_contributions() {
        let mut bounds = LayoutBounds::reset();
        bounds.include_bottom(f64::NAN);
        bounds.include_right(f64::INFINITY);
        assert_eq!(bounds.max_top, 0.0);
        assert_eq!(bounds.max_left, 0.0);
        bounds.include_top(12.0);
        bounds.include_left(-4.0);
        assert_eq!(bounds.min_top, 12.0);
        assert_eq!(bounds.min_left, -4.0);
    }
}
