// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connector geometry: the stub lines, elbows, and vertical rails drawn
//! between a card and its children.
//!
//! Every function here is a pure measurement over the layout's forest and
//! geometry; the host draws with whatever it likes. Virtual (placeholder)
//! children get a dashed rail that spans the whole fan, while the solid rail
//! only covers the real children, with its ends trimmed by the elbow radius.

use espalier_layout::{Forest, GeometryStore, LayoutOptions, NodeId};

use crate::viewport::ViewOptions;

/// Stroke width of connector lines.
pub const LINE_SIZE: f64 = 2.0;

/// Vertical center of a card, or of its fork point when `fork` is given.
#[must_use]
pub fn node_center_y(geometry: &GeometryStore, id: NodeId, fork: Option<f64>) -> f64 {
    geometry.top_or(id, 0.0) + fork.unwrap_or_else(|| geometry.height_or(id, 0.0) / 2.0)
}

/// Vertical center of a card's fork point, where its child branches meet.
#[must_use]
pub fn fork_center_y(forest: &Forest, geometry: &GeometryStore, id: NodeId) -> f64 {
    node_center_y(geometry, id, forest.fork_offset(id))
}

/// Length of the horizontal line between a card's toggle button and its
/// children's rail.
#[must_use]
pub fn horizontal_line_width(layout: &LayoutOptions, view: &ViewOptions) -> f64 {
    layout.card_gap_x - view.button_gap * 2.0 - view.toggle_button_size
}

/// Height of the dashed rail spanning a full sibling fan, virtual children
/// included. Zero for an empty fan.
#[must_use]
pub fn dashed_rail_height(geometry: &GeometryStore, children: &[NodeId]) -> f64 {
    let (Some(first), Some(last)) = (children.first(), children.last()) else {
        return 0.0;
    };
    let buffer = 1.0;
    let first_half = geometry.height_or(*first, 0.0) / 2.0;
    let last_half = geometry.height_or(*last, 0.0) / 2.0;
    node_center_y(geometry, *last, None) - node_center_y(geometry, *first, None)
        - first_half.min(last_half) * 2.0
        + buffer
}

/// The solid rail segment covering a fan's real children.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolidRail {
    /// Rail height, 0 when there are no real children.
    pub height: f64,
    /// Vertical offset of the rail's top from the parent's fork center.
    pub offset_top: f64,
}

/// Compute the solid rail for one sibling fan.
///
/// The rail runs from the first real child's center to the last real
/// child's (always at least down to the parent's fork center, so the elbow
/// has something to land on). Ends at a real first/last child are trimmed
/// by the elbow radius; ends at a virtual child meet the dashed rail flush.
#[must_use]
pub fn solid_rail(
    forest: &Forest,
    geometry: &GeometryStore,
    parent: NodeId,
    children: &[NodeId],
    view: &ViewOptions,
) -> SolidRail {
    let parent_center = fork_center_y(forest, geometry, parent);
    let buffer = 1.0;

    let is_virtual = |id: NodeId| forest.data(id).is_some_and(|d| d.is_virtual);
    let mut first_real = None;
    let mut last_real = None;
    for child in children {
        if !is_virtual(*child) {
            let center = node_center_y(geometry, *child, None);
            if first_real.is_none() {
                first_real = Some(center);
            }
            last_real = Some(center);
        }
    }
    let (Some(first), Some(last)) = (first_real, last_real) else {
        return SolidRail::default();
    };

    let mut height;
    let mut offset_top = 0.0;
    if first < parent_center {
        height = last.max(parent_center) - first;
        offset_top = first - parent_center;
    } else {
        height = last - parent_center;
    }

    if children.first().is_some_and(|c| !is_virtual(*c)) {
        height -= view.corner_radius;
        offset_top += view.corner_radius - LINE_SIZE / 2.0;
    }
    if children.last().is_some_and(|c| !is_virtual(*c)) {
        height -= view.corner_radius;
    }

    SolidRail {
        height: if height == 0.0 {
            0.0
        } else {
            height + LINE_SIZE / 2.0 + buffer
        },
        offset_top,
    }
}

/// Vertical distance from a child's center to its parent's fork center, the
/// length of the child-side elbow drop. Zero for center nodes.
#[must_use]
pub fn elbow_drop(forest: &Forest, geometry: &GeometryStore, id: NodeId) -> f64 {
    let Some(parent) = forest.parent_of(id) else {
        return 0.0;
    };
    (fork_center_y(forest, geometry, parent) - node_center_y(geometry, id, None)).abs()
}
