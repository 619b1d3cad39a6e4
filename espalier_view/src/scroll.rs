// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll-into-view for layout-plane rectangles.

use kurbo::Rect;

use crate::viewport::{ViewOptions, Viewport};

/// Margins kept between a revealed rectangle and the viewport edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewMargins {
    /// Margin above.
    pub top: f64,
    /// Margin below.
    pub bottom: f64,
    /// Margin to the left.
    pub left: f64,
    /// Margin to the right.
    pub right: f64,
}

impl Default for ViewMargins {
    fn default() -> Self {
        Self {
            top: 10.0,
            bottom: 10.0,
            left: 10.0,
            right: 10.0,
        }
    }
}

impl ViewMargins {
    /// Margins for revealing a card: enough horizontal room that the toggle
    /// button and its stub line stay visible too.
    #[must_use]
    pub fn for_card(options: &ViewOptions) -> Self {
        let x = options.button_gap + options.toggle_button_size + 20.0;
        Self {
            top: 100.0,
            bottom: 100.0,
            left: x,
            right: x,
        }
    }
}

impl Viewport {
    /// Scroll just enough that `rect` (in layout-plane coordinates) is fully
    /// visible with the given margins. Returns whether a scroll happened.
    ///
    /// A rectangle already contained on an axis leaves that axis untouched;
    /// one sticking out above or to the left aligns to the near edge, one
    /// sticking out below or to the right to the far edge.
    pub fn scroll_into_view_if_needed(&mut self, rect: Rect, margins: ViewMargins) -> bool {
        let el = self.screen_rect(rect);
        let view = self.scroll().viewport;
        let mut delta_x = 0.0;
        let mut delta_y = 0.0;

        if el.x0 < 0.0 {
            delta_x = el.x0 - margins.left;
        } else if el.x1 > view.width {
            delta_x = el.x1 - view.width + margins.right;
        }
        if el.y0 < 0.0 {
            delta_y = el.y0 - margins.top;
        } else if el.y1 > view.height {
            delta_y = el.y1 - view.height + margins.bottom;
        }

        if delta_x == 0.0 && delta_y == 0.0 {
            return false;
        }
        self.scroll_mut().scroll_by(kurbo::Vec2::new(delta_x, delta_y));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use espalier_layout::LayoutBounds;
    use kurbo::{Size, Vec2};

    fn viewport() -> Viewport {
        let mut vp = Viewport::new(ViewOptions::default(), Size::new(800.0, 600.0));
        vp.apply_layout(
            LayoutBounds {
                min_left: 0.0,
                min_top: 0.0,
                max_left: 4000.0,
                max_top: 3000.0,
            },
            Size::new(1920.0, 1200.0),
        );
        vp.scroll_mut().scroll_to(Vec2::new(1000.0, 1000.0));
        vp
    }

    #[test]
    fn contained_rect_does_not_scroll() {
        let mut vp = viewport();
        // Screen position: translate (200,100) + p - scroll (1000,1000).
        let rect = Rect::new(1100.0, 1100.0, 1300.0, 1160.0);
        let before = vp.scroll().offset;
        assert!(!vp.scroll_into_view_if_needed(rect, ViewMargins::default()));
        assert_eq!(vp.scroll().offset, before);
    }

    #[test]
    fn rect_above_aligns_to_the_top_margin() {
        let mut vp = viewport();
        let rect = Rect::new(1100.0, 800.0, 1300.0, 860.0);
        assert!(vp.scroll_into_view_if_needed(rect, ViewMargins::default()));
        // el.y0 was 800 + 100 - 1000 = -100; scrolls by -110.
        assert_eq!(vp.scroll().offset, Vec2::new(1000.0, 890.0));
        // Now visible 10px below the top edge.
        assert_eq!(vp.screen_rect(rect).y0, 10.0);
    }

    #[test]
    fn rect_beyond_the_right_edge_aligns_to_the_far_side() {
        let mut vp = viewport();
        let margins = ViewMargins::default();
        let rect = Rect::new(1700.0, 1100.0, 1900.0, 1160.0);
        // el.x1 = 1900 + 200 - 1000 = 1100 > 800.
        assert!(vp.scroll_into_view_if_needed(rect, margins));
        assert_eq!(vp.scroll().offset.x, 1000.0 + 300.0 + margins.right);
        assert_eq!(vp.screen_rect(rect).x1, 800.0 - margins.right);
    }

    #[test]
    fn card_margins_reserve_room_for_the_toggle_chrome() {
        let options = ViewOptions::default();
        let m = ViewMargins::for_card(&options);
        assert_eq!(m.left, 16.0 + 26.0 + 20.0);
        assert_eq!(m.right, m.left);
        assert_eq!(m.top, 100.0);
        assert_eq!(m.bottom, 100.0);
    }
}
