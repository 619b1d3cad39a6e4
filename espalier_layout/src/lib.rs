// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Espalier Layout: an incremental layout engine for dual-direction trees.
//!
//! Espalier lays out forests of trees whose nodes grow children to the left
//! and to the right of a shared center card, the shape used by lineage views,
//! dependency explorers, and call-graph browsers.
//!
//! - Places cards without knowing their sizes up front: unmeasured cards are
//!   emitted for the host to render and measure, and placement converges over
//!   debounced passes as sizes arrive.
//! - Keeps vertically stacked trees and sibling fans from overlapping with a
//!   per-column extent tracker and an ancestor-decay collision resolver.
//! - Expands and collapses subtrees on demand, fetching children through a
//!   host-supplied [`ChildSource`] with optional caching.
//!
//! ## Where this fits
//!
//! This crate computes positions; it draws nothing and owns no event loop.
//! Hosts feed it measured card sizes and caller-passed timestamps, poll it
//! once per frame, and read back placements. The companion `espalier_view`
//! crate turns the resulting bounds into canvas sizing, zoom, and scroll
//! behavior.
//!
//! ## API overview
//!
//! - [`LayoutEngine`]: owns the forest, schedules passes, handles toggles.
//! - [`Forest`] / [`NodeSeed`] / [`NodeData`]: the tree model and its input.
//! - [`GeometryStore`] / [`NodeGeometry`]: per-node positions and sizes.
//! - [`LayoutOptions`]: spacing, caching, and debounce configuration.
//! - [`PassOutput`]: the emitted node list and bounding box of one pass.
//!
//! Key operations:
//! - [`LayoutEngine::replace_forest`] installs a new forest.
//! - [`LayoutEngine::report_size`] feeds one card's measured size.
//! - [`LayoutEngine::poll`] runs a due pass and returns its [`PassOutput`].
//! - [`LayoutEngine::toggle_children`] expands or collapses one side of a
//!   node, fetching children through a [`ChildSource`].
//!
//! All timing is caller-passed milliseconds; the engine never blocks, spawns,
//! or reads a clock.

mod engine;
mod extents;
mod forest;
mod geometry;
mod types;
mod walk;

pub use engine::{ChildSource, LayoutEngine, ToggleError, ToggleOutcome};
pub use extents::{ColumnExtent, ColumnExtents, ColumnKey};
pub use forest::{Forest, NodeData, NodeSeed};
pub use geometry::{GeometryStore, NodeGeometry};
pub use types::{Direction, LayoutBounds, LayoutOptions, NodeFlags, NodeId, Side};
pub use walk::PassOutput;
