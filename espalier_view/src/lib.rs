// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Espalier View: the viewport model that sits on top of [`espalier_layout`].
//!
//! Layout passes produce node positions and a bounding box in an unbounded
//! plane; this crate turns those into everything a scrollable, zoomable host
//! surface needs:
//!
//! - [`Viewport`]: canvas sizing and translation under zoom, scroll state,
//!   and anchor preservation so the card a user just toggled stays put on
//!   screen while the layout shifts around it.
//! - [`ViewMargins`] and [`Viewport::scroll_into_view_if_needed`]: minimal
//!   scrolling to reveal a card with room for its toggle chrome.
//! - [`connector`]: pure geometry for the lines and rails drawn between
//!   parents and their sibling fans.
//!
//! Nothing here draws or owns an event loop; hosts apply the computed
//! [`CanvasStyle`] and scroll offsets to whatever surface they render with.

pub mod connector;
mod scroll;
mod viewport;

pub use scroll::ViewMargins;
pub use viewport::{CanvasStyle, ScrollModel, ViewOptions, Viewport};
