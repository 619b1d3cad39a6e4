// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The viewport model: canvas sizing under zoom, scroll state, and anchor
//! preservation across relayouts.
//!
//! Everything here is a pure model of what a host would do to a scrollable
//! element wrapping the layout canvas. The host applies [`CanvasStyle`] to
//! the canvas and [`ScrollModel::offset`] to the scroll container after each
//! call that changes them.

use kurbo::{Point, Rect, Size, Vec2};
use tracing::debug;

use espalier_layout::LayoutBounds;

/// Viewport and chrome configuration.
#[derive(Clone, Debug)]
pub struct ViewOptions {
    /// Blank margin kept around the content at zoom 1.
    pub safe_margin: f64,
    /// Lower zoom clamp.
    pub min_zoom: f64,
    /// Upper zoom clamp.
    pub max_zoom: f64,
    /// Zoom increment per step.
    pub zoom_step: f64,
    /// Corner radius of connector elbows.
    pub corner_radius: f64,
    /// Length of the stub line between a card and its toggle button.
    pub button_gap: f64,
    /// Diameter of the expand/collapse button.
    pub toggle_button_size: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            safe_margin: 100.0,
            min_zoom: 0.25,
            max_zoom: 1.25,
            zoom_step: 0.25,
            corner_radius: 12.0,
            button_gap: 16.0,
            toggle_button_size: 26.0,
        }
    }
}

/// Style the host applies to the canvas element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanvasStyle {
    /// Canvas element size.
    pub size: Size,
    /// Translation applied before scaling.
    pub translate: Vec2,
    /// Scale factor (the zoom).
    pub scale: f64,
}

/// Pure model of a scroll container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollModel {
    /// Current scroll position.
    pub offset: Vec2,
    /// Visible area of the container.
    pub viewport: Size,
    /// Scrollable content size.
    pub content: Size,
}

impl ScrollModel {
    /// Largest valid offset on each axis.
    #[must_use]
    pub fn max_offset(&self) -> Vec2 {
        Vec2::new(
            (self.content.width - self.viewport.width).max(0.0),
            (self.content.height - self.viewport.height).max(0.0),
        )
    }

    /// Scroll to an absolute position, clamped to the valid range.
    pub fn scroll_to(&mut self, target: Vec2) {
        let max = self.max_offset();
        self.offset = Vec2::new(target.x.clamp(0.0, max.x), target.y.clamp(0.0, max.y));
    }

    /// Scroll by a delta, clamped to the valid range.
    pub fn scroll_by(&mut self, delta: Vec2) {
        self.scroll_to(self.offset + delta);
    }
}

#[derive(Clone, Copy, Debug)]
struct AnchorSnapshot {
    scroll: Vec2,
    screen: Point,
}

/// The viewport: zoom state, canvas style, and scroll position, kept
/// consistent with the layout bounds fed in after every pass.
#[derive(Clone, Debug)]
pub struct Viewport {
    options: ViewOptions,
    zoom: f64,
    style: CanvasStyle,
    scroll: ScrollModel,
    anchor: Option<AnchorSnapshot>,
    deferred_scroll_left: Option<f64>,
}

impl Viewport {
    /// Create a viewport of the given visible size at zoom 1.
    #[must_use]
    pub fn new(options: ViewOptions, viewport: Size) -> Self {
        Self {
            options,
            zoom: 1.0,
            style: CanvasStyle {
                scale: 1.0,
                ..CanvasStyle::default()
            },
            scroll: ScrollModel {
                viewport,
                ..ScrollModel::default()
            },
            anchor: None,
            deferred_scroll_left: None,
        }
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Style for the canvas element as of the last [`Self::apply_layout`].
    #[must_use]
    pub fn style(&self) -> CanvasStyle {
        self.style
    }

    /// The scroll container model.
    #[must_use]
    pub fn scroll(&self) -> &ScrollModel {
        &self.scroll
    }

    /// Mutable scroll access for host-driven panning.
    pub fn scroll_mut(&mut self) -> &mut ScrollModel {
        &mut self.scroll
    }

    /// The configuration this viewport was built with.
    #[must_use]
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Resize the visible area.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.scroll.viewport = size;
        let offset = self.scroll.offset;
        self.scroll.scroll_to(offset);
    }

    /// Recompute the canvas style for fresh layout bounds at the current
    /// zoom. Call after every completed layout pass.
    pub fn apply_layout(&mut self, bounds: LayoutBounds, plane: Size) {
        self.resize_canvas(self.zoom, bounds, plane);
    }

    /// Change the zoom and recompute the canvas, keeping the scroll position
    /// proportionally stable when zooming in from at least 1.
    pub fn set_zoom(&mut self, zoom: f64, bounds: LayoutBounds, plane: Size) {
        let zoom = zoom.clamp(self.options.min_zoom, self.options.max_zoom);
        let prev = self.zoom;
        let old_offset_x = self.scroll.offset.x;
        let old_scrollable_x = self.scroll.content.width - self.scroll.viewport.width;

        self.resize_canvas(zoom, bounds, plane);

        // Zooming in grows the canvas to the right; carry the horizontal
        // scroll proportionally so the view does not appear to jump left.
        // The move is deferred to the next frame, after the host has applied
        // the new canvas size.
        if zoom >= 1.0 && prev >= 1.0 && (zoom - prev).abs() > f64::EPSILON {
            let new_scrollable_x = self.scroll.content.width - self.scroll.viewport.width;
            if old_scrollable_x > 0.0 && new_scrollable_x > 0.0 {
                self.deferred_scroll_left =
                    Some(old_offset_x * new_scrollable_x / old_scrollable_x);
            }
        }
        self.zoom = zoom;
    }

    /// Zoom in one step.
    pub fn zoom_in(&mut self, bounds: LayoutBounds, plane: Size) {
        self.set_zoom(self.zoom + self.options.zoom_step, bounds, plane);
    }

    /// Zoom out one step.
    pub fn zoom_out(&mut self, bounds: LayoutBounds, plane: Size) {
        self.set_zoom(self.zoom - self.options.zoom_step, bounds, plane);
    }

    /// Apply any deferred scroll correction. Call once per frame.
    pub fn on_frame(&mut self) {
        if let Some(left) = self.deferred_scroll_left.take() {
            let y = self.scroll.offset.y;
            self.scroll.scroll_to(Vec2::new(left, y));
        }
    }

    fn resize_canvas(&mut self, zoom: f64, bounds: LayoutBounds, plane: Size) {
        let safe_base = self.options.safe_margin;
        let safe_span = safe_base * zoom * (zoom + 1.0);

        let min_left = finite_min(bounds.min_left);
        let min_top = finite_min(bounds.min_top);
        let new_width = bounds.max_left.max(plane.width);
        let new_height = bounds.max_top.max(plane.height);
        let need_trans_x = -min_left.min(0.0);
        let need_trans_y = -min_top.min(0.0);
        // Scaling is centered differently per axis: horizontally about the
        // left edge, vertically about the center. The canvas grows by the
        // halved difference on each side.
        let zoom_add_width = new_width * (1.0 / zoom - 1.0) / 2.0;
        let zoom_add_height = new_height * (zoom - 1.0) / 2.0;
        let mut trans_x = need_trans_x * zoom + zoom_add_width * zoom;
        let trans_y = need_trans_y + zoom_add_height * zoom;

        // Zooming in makes the width correction negative; content may not
        // start left of the canvas edge.
        if min_left < -trans_x {
            trans_x = -min_left;
        }

        self.style = CanvasStyle {
            size: Size::new(
                new_width + zoom_add_width + safe_span,
                new_height + if zoom > 1.0 { 0.0 } else { zoom_add_height } + safe_base,
            ),
            translate: Vec2::new(trans_x + safe_span, trans_y + safe_base),
            scale: zoom,
        };
        self.scroll.content = self.style.size;
        let offset = self.scroll.offset;
        self.scroll.scroll_to(offset);
        debug!(zoom, size = ?self.style.size, translate = ?self.style.translate, "canvas resized");
    }

    /// Map a layout-plane point to viewport coordinates.
    #[must_use]
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(
            self.style.translate.x + p.x * self.zoom - self.scroll.offset.x,
            self.style.translate.y + p.y * self.zoom - self.scroll.offset.y,
        )
    }

    /// Map a layout-plane rectangle to viewport coordinates.
    #[must_use]
    pub fn screen_rect(&self, r: Rect) -> Rect {
        let origin = self.to_screen(r.origin());
        Rect::from_origin_size(
            origin,
            Size::new(r.width() * self.zoom, r.height() * self.zoom),
        )
    }

    /// Remember where a node sits on screen before a relayout moves it.
    pub fn record_anchor(&mut self, node_origin: Point) {
        self.anchor = Some(AnchorSnapshot {
            scroll: self.scroll.offset,
            screen: self.to_screen(node_origin),
        });
    }

    /// After a relayout, scroll so the anchored node lands where it was.
    ///
    /// Scroll positions are whole pixels; the delta rounds away from zero so
    /// the correction never falls short.
    pub fn reconcile_anchor(&mut self, node_origin: Point) {
        let Some(snapshot) = self.anchor.take() else {
            return;
        };
        // Screen position the node would have at the snapshot's scroll.
        let screen = Point::new(
            self.style.translate.x + node_origin.x * self.zoom - snapshot.scroll.x,
            self.style.translate.y + node_origin.y * self.zoom - snapshot.scroll.y,
        );
        let diff_x = round_out(screen.x - snapshot.screen.x);
        let diff_y = round_out(screen.y - snapshot.screen.y);
        debug!(diff_x, diff_y, "anchor reconciled");
        self.scroll
            .scroll_to(snapshot.scroll + Vec2::new(diff_x, diff_y));
    }

    /// Drop any recorded anchor without scrolling.
    pub fn clear_anchor(&mut self) {
        self.anchor = None;
    }

    /// Center the scroll on the canvas middle, the initial position after a
    /// forest change.
    pub fn center(&mut self) {
        let max = self.scroll.max_offset();
        self.scroll.scroll_to(Vec2::new(max.x / 2.0, max.y / 2.0));
    }

    /// Scroll so a layout-plane rectangle sits centered in the viewport.
    pub fn center_on(&mut self, rect: Rect) {
        let center = self.to_screen(rect.center());
        let target = self.scroll.offset
            + Vec2::new(
                center.x - self.scroll.viewport.width / 2.0,
                center.y - self.scroll.viewport.height / 2.0,
            );
        self.scroll.scroll_to(target);
    }
}

/// Bounds mins start at `+inf` and stay there when nothing was placed.
fn finite_min(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn round_out(v: f64) -> f64 {
    if v >= 0.0 { v.ceil() } else { v.floor() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min_left: f64, min_top: f64, max_left: f64, max_top: f64) -> LayoutBounds {
        LayoutBounds {
            min_left,
            min_top,
            max_left,
            max_top,
        }
    }

    const PLANE: Size = Size::new(1920.0, 1200.0);

    #[test]
    fn canvas_at_zoom_one_is_content_plus_margins() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        vp.apply_layout(bounds(-100.0, 40.0, 2500.0, 1500.0), PLANE);
        let style = vp.style();
        // zoom 1: no scale corrections, safe_span = 100 * 1 * 2.
        assert_eq!(style.size, Size::new(2500.0 + 200.0, 1500.0 + 100.0));
        assert_eq!(style.translate, Vec2::new(100.0 + 200.0, 0.0 + 100.0));
        assert_eq!(style.scale, 1.0);
    }

    #[test]
    fn canvas_formula_across_zoom_levels() {
        for zoom in [0.25, 0.5, 1.0, 1.25] {
            let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
            let b = bounds(-50.0, -20.0, 2400.0, 1400.0);
            vp.set_zoom(zoom, b, PLANE);
            let style = vp.style();

            let safe_span = 100.0 * zoom * (zoom + 1.0);
            let new_width: f64 = 2400.0;
            let new_height: f64 = 1400.0;
            let zoom_add_width = new_width * (1.0 / zoom - 1.0) / 2.0;
            let zoom_add_height = new_height * (zoom - 1.0) / 2.0;
            let mut trans_x = 50.0 * zoom + zoom_add_width * zoom;
            if -50.0 < -trans_x {
                trans_x = 50.0;
            }
            let trans_y = 20.0 + zoom_add_height * zoom;

            assert!((style.size.width - (new_width + zoom_add_width + safe_span)).abs() < 1e-9);
            let expect_h =
                new_height + if zoom > 1.0 { 0.0 } else { zoom_add_height } + 100.0;
            assert!((style.size.height - expect_h).abs() < 1e-9);
            assert!((style.translate.x - (trans_x + safe_span)).abs() < 1e-9);
            assert!((style.translate.y - (trans_y + 100.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn zoom_steps_clamp_at_the_limits() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        let b = bounds(0.0, 0.0, 2000.0, 1000.0);
        vp.zoom_in(b, PLANE);
        assert_eq!(vp.zoom(), 1.25);
        vp.zoom_in(b, PLANE);
        assert_eq!(vp.zoom(), 1.25);

        for _ in 0..6 {
            vp.zoom_out(b, PLANE);
        }
        assert_eq!(vp.zoom(), 0.25);
    }

    #[test]
    fn zoom_in_carries_horizontal_scroll_proportionally() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        let b = bounds(0.0, 0.0, 3000.0, 1000.0);
        vp.apply_layout(b, PLANE);
        vp.scroll_mut().scroll_to(Vec2::new(1000.0, 0.0));
        let old_scrollable = vp.scroll().content.width - 800.0;

        vp.set_zoom(1.25, b, PLANE);
        let new_scrollable = vp.scroll().content.width - 800.0;
        // Deferred until the next frame.
        assert_eq!(vp.scroll().offset.x, 1000.0);
        vp.on_frame();
        let expected = 1000.0 * new_scrollable / old_scrollable;
        assert!((vp.scroll().offset.x - expected).abs() < 1e-9);
    }

    #[test]
    fn zoom_out_does_not_arm_a_deferred_correction() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        let b = bounds(0.0, 0.0, 3000.0, 1000.0);
        vp.apply_layout(b, PLANE);
        vp.scroll_mut().scroll_to(Vec2::new(500.0, 0.0));
        vp.set_zoom(0.75, b, PLANE);
        let before = vp.scroll().offset;
        vp.on_frame();
        assert_eq!(vp.scroll().offset, before);
    }

    #[test]
    fn anchor_is_preserved_within_a_pixel() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        vp.apply_layout(bounds(0.0, 0.0, 3000.0, 2000.0), PLANE);
        vp.scroll_mut().scroll_to(Vec2::new(600.0, 400.0));

        let before = Point::new(1200.0, 700.0);
        vp.record_anchor(before);
        let screen_before = vp.to_screen(before);

        // The relayout moved the node down and right a fractional amount.
        vp.apply_layout(bounds(0.0, 0.0, 3000.0, 2000.0), PLANE);
        let after = Point::new(1237.3, 861.8);
        vp.reconcile_anchor(after);

        let screen_after = vp.to_screen(after);
        assert!((screen_after.x - screen_before.x).abs() <= 1.0);
        assert!((screen_after.y - screen_before.y).abs() <= 1.0);
    }

    #[test]
    fn center_splits_the_scrollable_range() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        vp.apply_layout(bounds(0.0, 0.0, 2800.0, 1400.0), PLANE);
        vp.center();
        let max = vp.scroll().max_offset();
        assert_eq!(vp.scroll().offset, Vec2::new(max.x / 2.0, max.y / 2.0));
    }

    #[test]
    fn empty_bounds_fall_back_to_the_plane() {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        vp.apply_layout(LayoutBounds::reset(), PLANE);
        let style = vp.style();
        assert_eq!(style.size.width, PLANE.width + 200.0);
        assert_eq!(style.size.height, PLANE.height + 100.0);
    }
}
