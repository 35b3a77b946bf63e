//! View transform: zoom level, pan offset and the screen/canvas mapping.
//!
//! Every consumer (dragging, marquee hit-testing, routing, rendering) must
//! route through [`ViewTransform::to_screen`] / [`ViewTransform::to_canvas`]
//! rather than re-deriving the transform, so the mapping can never drift
//! between components during zoom or pan.

use crate::constants::{FIT_PADDING, MAX_ZOOM, MIN_ZOOM};
use egui::{pos2, vec2, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom and pan state for one logical page.
///
/// The mapping is `canvas = (screen - pan) / zoom`; pan is applied before
/// scaling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewTransform {
    /// Current zoom factor, clamped to `[MIN_ZOOM, MAX_ZOOM]`
    pub zoom: f32,
    /// Screen-space pan offset
    pub pan: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    /// Converts a canvas-space point to screen space.
    pub fn to_screen(&self, canvas: Pos2) -> Pos2 {
        pos2(canvas.x * self.zoom, canvas.y * self.zoom) + self.pan
    }

    /// Converts a screen-space point to canvas space.
    pub fn to_canvas(&self, screen: Pos2) -> Pos2 {
        let p = screen - self.pan;
        pos2(p.x / self.zoom, p.y / self.zoom)
    }

    /// Converts a canvas-space rectangle to screen space.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    /// Sets the zoom level, clamped to the permitted range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Applies a zoom delta while keeping the canvas point under `cursor`
    /// (a screen-space position) visually fixed.
    pub fn zoom_around(&mut self, cursor: Pos2, zoom_delta: f32) {
        let before = self.to_canvas(cursor);
        let old_zoom = self.zoom;
        self.set_zoom(self.zoom + zoom_delta);
        if (self.zoom - old_zoom).abs() <= f32::EPSILON {
            return;
        }
        // Re-anchor the pan so `before` still maps to `cursor`.
        let after = self.to_screen(before);
        self.pan += cursor - after;
    }

    /// Accumulates a screen-space pan delta. No clamping; the canvas is
    /// infinite.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Fits the bounding box of `content` rects (plus padding) into a
    /// viewport of the given size, centered, using the largest zoom that
    /// still fits (capped at `MAX_ZOOM`).
    ///
    /// An empty content set resets to the default transform centered on the
    /// origin.
    pub fn fit_to_content(&mut self, content: &[Rect], viewport: Vec2) {
        let mut bounds: Option<Rect> = None;
        for rect in content {
            bounds = Some(match bounds {
                Some(b) => b.union(*rect),
                None => *rect,
            });
        }
        let Some(bounds) = bounds else {
            self.zoom = 1.0;
            self.pan = viewport / 2.0;
            return;
        };

        let padded = bounds.expand(FIT_PADDING);
        let zoom_x = viewport.x / padded.width().max(1.0);
        let zoom_y = viewport.y / padded.height().max(1.0);
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);

        // Center the padded bounds in the viewport.
        let content_center = padded.center();
        self.pan = vec2(viewport.x / 2.0, viewport.y / 2.0)
            - vec2(content_center.x * self.zoom, content_center.y * self.zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn round_trip_screen_canvas() {
        let view = ViewTransform {
            zoom: 1.6,
            pan: vec2(37.0, -12.0),
        };
        let canvas = pos2(123.0, 456.0);
        let back = view.to_canvas(view.to_screen(canvas));
        assert!((back.x - canvas.x).abs() < 1e-3);
        assert!((back.y - canvas.y).abs() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewTransform::default();
        view.set_zoom(100.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.set_zoom(0.0);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn zoom_to_cursor_keeps_point_fixed() {
        let mut view = ViewTransform::default();
        let cursor = pos2(200.0, 200.0);
        let before = view.to_canvas(cursor);

        view.zoom_around(cursor, 0.5);

        let after = view.to_canvas(cursor);
        assert!((after.x - before.x).abs() < 1e-3, "{after:?} vs {before:?}");
        assert!((after.y - before.y).abs() < 1e-3);
        assert!(view.zoom > 1.0);
    }

    #[test]
    fn zoom_at_clamp_boundary_leaves_pan_untouched() {
        let mut view = ViewTransform {
            zoom: MAX_ZOOM,
            pan: vec2(10.0, 10.0),
        };
        view.zoom_around(pos2(100.0, 100.0), 0.5);
        assert_eq!(view.pan, vec2(10.0, 10.0));
    }

    #[test]
    fn fit_to_content_contains_all_rects() {
        let mut view = ViewTransform::default();
        let content = [
            Rect::from_min_size(pos2(-100.0, -50.0), vec2(80.0, 40.0)),
            Rect::from_min_size(pos2(400.0, 300.0), vec2(120.0, 60.0)),
        ];
        let viewport = vec2(800.0, 600.0);
        view.fit_to_content(&content, viewport);

        for rect in &content {
            for corner in [
                rect.min,
                rect.max,
                pos2(rect.min.x, rect.max.y),
                pos2(rect.max.x, rect.min.y),
            ] {
                let s = view.to_screen(corner);
                assert!(s.x >= 0.0 && s.x <= viewport.x, "{s:?} outside viewport");
                assert!(s.y >= 0.0 && s.y <= viewport.y, "{s:?} outside viewport");
            }
        }
    }

    #[test]
    fn fit_to_empty_content_recenters_origin() {
        let mut view = ViewTransform {
            zoom: 2.0,
            pan: vec2(500.0, 500.0),
        };
        view.fit_to_content(&[], vec2(800.0, 600.0));
        assert_eq!(view.zoom, 1.0);
        assert_eq!(view.to_screen(pos2(0.0, 0.0)), pos2(400.0, 300.0));
    }
}
