//! Pure geometry and connector-routing utilities.
//!
//! Everything in this module is a stateless transform from item rectangles
//! (plus optional explicit anchors) to drawable polylines, Bézier control
//! points and arrowhead triangles. Routing functions never panic; degenerate
//! inputs (zero-size rectangles, coincident centers) fall back to a straight
//! line between centers.

use crate::constants::{
    ALIGNMENT_TOLERANCE, ELBOW_STANDOFF, MAX_AVOIDANCE_PASSES, OBSTACLE_MARGIN,
};
use crate::types::Anchor;
use egui::{pos2, vec2, Pos2, Rect, Vec2};

/// Resolves an anchor to its point on the rectangle boundary.
///
/// `None` resolves to the rectangle center, which is what the automatic
/// router connects.
pub fn anchor_point(rect: Rect, anchor: Option<Anchor>) -> Pos2 {
    match anchor {
        None => rect.center(),
        Some(Anchor::Top) => pos2(rect.center().x, rect.min.y),
        Some(Anchor::Bottom) => pos2(rect.center().x, rect.max.y),
        Some(Anchor::Left) => pos2(rect.min.x, rect.center().y),
        Some(Anchor::Right) => pos2(rect.max.x, rect.center().y),
    }
}

/// True when the rectangle cannot meaningfully participate in routing.
fn degenerate(rect: Rect) -> bool {
    !rect.width().is_finite()
        || !rect.height().is_finite()
        || rect.width() <= f32::EPSILON
        || rect.height() <= f32::EPSILON
}

/// Computes an obstacle-aware orthogonal polyline between two item
/// rectangles, connecting their centers.
///
/// The dominant axis picks the elbow orientation: |Δx| ≥ |Δy| routes
/// horizontal-first, otherwise vertical-first. The path runs a fixed
/// standoff out of the start before turning; when the two standoffs would
/// cross, the elbow falls back to the true midpoint. After elbow selection
/// the elbow segment is probed against `obstacles` (all other rendered
/// rectangles) and pushed outward past each intersecting obstacle's far
/// edge plus a margin, with a bounded number of passes.
pub fn orthogonal_path(from: Rect, to: Rect, obstacles: &[Rect]) -> Vec<Pos2> {
    let start = from.center();
    let end = to.center();

    if degenerate(from) || degenerate(to) || (end - start).length_sq() < f32::EPSILON {
        return vec![start, end];
    }

    let delta = end - start;
    if delta.x.abs() >= delta.y.abs() {
        horizontal_first(start, end, obstacles)
    } else {
        vertical_first(start, end, obstacles)
    }
}

/// Horizontal-first elbow: out along x, across along y, in along x.
fn horizontal_first(start: Pos2, end: Pos2, obstacles: &[Rect]) -> Vec<Pos2> {
    let sign = if end.x >= start.x { 1.0 } else { -1.0 };
    let mut elbow_x = if (end.x - start.x).abs() > 2.0 * ELBOW_STANDOFF {
        start.x + sign * ELBOW_STANDOFF
    } else {
        (start.x + end.x) / 2.0
    };

    // Push the vertical elbow segment past any obstacle it crosses.
    for _ in 0..MAX_AVOIDANCE_PASSES {
        let seg_min_y = start.y.min(end.y);
        let seg_max_y = start.y.max(end.y);
        let hit = obstacles.iter().find(|r| {
            elbow_x >= r.min.x && elbow_x <= r.max.x && seg_max_y >= r.min.y && seg_min_y <= r.max.y
        });
        match hit {
            Some(r) => {
                elbow_x = if sign > 0.0 {
                    r.max.x + OBSTACLE_MARGIN
                } else {
                    r.min.x - OBSTACLE_MARGIN
                };
            }
            None => break,
        }
    }

    vec![
        start,
        pos2(elbow_x, start.y),
        pos2(elbow_x, end.y),
        end,
    ]
}

/// Vertical-first elbow: out along y, across along x, in along y.
fn vertical_first(start: Pos2, end: Pos2, obstacles: &[Rect]) -> Vec<Pos2> {
    let sign = if end.y >= start.y { 1.0 } else { -1.0 };
    let mut elbow_y = if (end.y - start.y).abs() > 2.0 * ELBOW_STANDOFF {
        start.y + sign * ELBOW_STANDOFF
    } else {
        (start.y + end.y) / 2.0
    };

    for _ in 0..MAX_AVOIDANCE_PASSES {
        let seg_min_x = start.x.min(end.x);
        let seg_max_x = start.x.max(end.x);
        let hit = obstacles.iter().find(|r| {
            elbow_y >= r.min.y && elbow_y <= r.max.y && seg_max_x >= r.min.x && seg_min_x <= r.max.x
        });
        match hit {
            Some(r) => {
                elbow_y = if sign > 0.0 {
                    r.max.y + OBSTACLE_MARGIN
                } else {
                    r.min.y - OBSTACLE_MARGIN
                };
            }
            None => break,
        }
    }

    vec![
        start,
        pos2(start.x, elbow_y),
        pos2(end.x, elbow_y),
        end,
    ]
}

/// Computes the polyline for a connection with explicit anchors on both
/// ends.
///
/// Nearly-aligned endpoints (within a small tolerance on the cross axis)
/// get a straight segment. Otherwise the shape depends on the axis classes
/// of the two anchors: two horizontal-facing anchors produce a Z with a
/// vertical middle leg, two vertical-facing anchors a Z with a horizontal
/// middle leg, and mixed anchors an L with a single corner.
pub fn anchored_path(from: Rect, from_anchor: Anchor, to: Rect, to_anchor: Anchor) -> Vec<Pos2> {
    let start = anchor_point(from, Some(from_anchor));
    let end = anchor_point(to, Some(to_anchor));

    if degenerate(from) || degenerate(to) {
        return vec![from.center(), to.center()];
    }

    let aligned_horizontally = (start.y - end.y).abs() <= ALIGNMENT_TOLERANCE;
    let aligned_vertically = (start.x - end.x).abs() <= ALIGNMENT_TOLERANCE;
    if aligned_horizontally || aligned_vertically {
        return vec![start, end];
    }

    match (from_anchor.is_horizontal(), to_anchor.is_horizontal()) {
        // Both exit sideways: vertical middle leg halfway across.
        (true, true) => {
            let mid_x = (start.x + end.x) / 2.0;
            vec![start, pos2(mid_x, start.y), pos2(mid_x, end.y), end]
        }
        // Both exit up/down: horizontal middle leg halfway across.
        (false, false) => {
            let mid_y = (start.y + end.y) / 2.0;
            vec![start, pos2(start.x, mid_y), pos2(end.x, mid_y), end]
        }
        // Mixed: single corner, exiting along the source anchor's axis.
        (true, false) => vec![start, pos2(end.x, start.y), end],
        (false, true) => vec![start, pos2(start.x, end.y), end],
    }
}

/// Cubic Bézier control points between two rectangle centers.
///
/// The control offset is horizontal and proportional to Δx, which gives
/// long connections a gentle S sweep and short ones a near-straight curve.
pub fn curved_path(from: Rect, to: Rect) -> [Pos2; 4] {
    let start = from.center();
    let end = to.center();
    let offset = (end.x - start.x) * 0.5;
    [
        start,
        pos2(start.x + offset, start.y),
        pos2(end.x - offset, end.y),
        end,
    ]
}

/// Evaluates a cubic Bézier at parameter `t` in [0, 1].
pub fn cubic_point(curve: &[Pos2; 4], t: f32) -> Pos2 {
    let t = t.clamp(0.0, 1.0);
    let u = 1.0 - t;
    let p = curve[0].to_vec2() * (u * u * u)
        + curve[1].to_vec2() * (3.0 * u * u * t)
        + curve[2].to_vec2() * (3.0 * u * t * t)
        + curve[3].to_vec2() * (t * t * t);
    p.to_pos2()
}

/// A 3-point arrowhead triangle at `tip`, oriented along `approach_angle`
/// (radians, the direction of travel into the tip).
pub fn arrowhead(tip: Pos2, approach_angle: f32, length: f32) -> [Pos2; 3] {
    const SPREAD: f32 = 0.45;
    let wing = |angle: f32| -> Pos2 {
        tip - vec2(angle.cos(), angle.sin()) * length
    };
    [
        tip,
        wing(approach_angle - SPREAD),
        wing(approach_angle + SPREAD),
    ]
}

/// Rounds a point to the nearest grid multiple when snapping is enabled,
/// otherwise returns it unchanged.
pub fn snap_to_grid(pos: Pos2, grid: f32, enabled: bool) -> Pos2 {
    if !enabled || grid <= f32::EPSILON {
        return pos;
    }
    pos2((pos.x / grid).round() * grid, (pos.y / grid).round() * grid)
}

/// The approach angle (radians) of the final segment of a polyline.
///
/// Degenerate polylines report an angle of zero.
pub fn final_approach_angle(path: &[Pos2]) -> f32 {
    for window in path.windows(2).rev() {
        let d = window[1] - window[0];
        if d.length_sq() > f32::EPSILON {
            return d.y.atan2(d.x);
        }
    }
    0.0
}

/// The midpoint of a polyline by arc length, plus the direction angle of
/// the segment it falls on. Used for the mid-path flow marker.
pub fn path_midpoint(path: &[Pos2]) -> Option<(Pos2, f32)> {
    if path.len() < 2 {
        return None;
    }
    let total: f32 = path.windows(2).map(|w| (w[1] - w[0]).length()).sum();
    if total <= f32::EPSILON {
        return None;
    }
    let mut remaining = total / 2.0;
    for window in path.windows(2) {
        let seg = window[1] - window[0];
        let len = seg.length();
        if remaining <= len && len > f32::EPSILON {
            let t = remaining / len;
            let point = window[0] + seg * t;
            return Some((point, seg.y.atan2(seg.x)));
        }
        remaining -= len;
    }
    let last = path[path.len() - 1];
    Some((last, final_approach_angle(path)))
}

/// Minimum distance from a point to a line segment.
pub fn point_to_segment_distance(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let seg: Vec2 = b - a;
    let to_point: Vec2 = point - a;
    let len_sq = seg.length_sq();
    if len_sq < 0.0001 {
        // Segment is essentially a point
        return to_point.length();
    }
    let t = (to_point.dot(seg) / len_sq).clamp(0.0, 1.0);
    let projection = a + seg * t;
    (point - projection).length()
}

/// Minimum distance from a point to any segment of a polyline.
pub fn point_to_path_distance(point: Pos2, path: &[Pos2]) -> f32 {
    path.windows(2)
        .map(|w| point_to_segment_distance(point, w[0], w[1]))
        .fold(f32::INFINITY, f32::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GRID_SIZE;

    fn rect_at(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_center_size(pos2(x, y), vec2(w, h))
    }

    #[test]
    fn anchor_points_are_edge_midpoints() {
        let r = rect_at(100.0, 100.0, 40.0, 20.0);
        assert_eq!(anchor_point(r, None), pos2(100.0, 100.0));
        assert_eq!(anchor_point(r, Some(Anchor::Top)), pos2(100.0, 90.0));
        assert_eq!(anchor_point(r, Some(Anchor::Bottom)), pos2(100.0, 110.0));
        assert_eq!(anchor_point(r, Some(Anchor::Left)), pos2(80.0, 100.0));
        assert_eq!(anchor_point(r, Some(Anchor::Right)), pos2(120.0, 100.0));
    }

    #[test]
    fn horizontal_dominant_routes_horizontal_first() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(400.0, 100.0, 40.0, 40.0);
        let path = orthogonal_path(from, to, &[]);

        assert_eq!(path.len(), 4);
        assert_eq!(path[0], pos2(0.0, 0.0));
        assert_eq!(path[3], pos2(400.0, 100.0));
        // First leg is horizontal, standoff distance out of the start.
        assert_eq!(path[1], pos2(ELBOW_STANDOFF, 0.0));
        assert_eq!(path[2], pos2(ELBOW_STANDOFF, 100.0));
    }

    #[test]
    fn vertical_dominant_routes_vertical_first() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(100.0, 400.0, 40.0, 40.0);
        let path = orthogonal_path(from, to, &[]);

        assert_eq!(path.len(), 4);
        assert_eq!(path[1], pos2(0.0, ELBOW_STANDOFF));
        assert_eq!(path[2], pos2(100.0, ELBOW_STANDOFF));
    }

    #[test]
    fn close_endpoints_fall_back_to_midpoint_elbow() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(60.0, 10.0, 40.0, 40.0);
        let path = orthogonal_path(from, to, &[]);
        // 60 < 2 * standoff, so the elbow sits halfway.
        assert_eq!(path[1].x, 30.0);
        assert_eq!(path[2].x, 30.0);
    }

    #[test]
    fn elbow_is_pushed_past_obstacles() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(400.0, 300.0, 40.0, 40.0);
        // An obstacle sitting right on the default elbow line.
        let obstacle = rect_at(ELBOW_STANDOFF, 150.0, 60.0, 60.0);
        let path = orthogonal_path(from, to, &[obstacle]);

        let elbow_x = path[1].x;
        assert!(
            elbow_x > obstacle.max.x,
            "elbow {elbow_x} should clear the obstacle at {}",
            obstacle.max.x
        );
        assert_eq!(path[1].x, path[2].x);
    }

    #[test]
    fn avoidance_is_bounded() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(4000.0, 300.0, 40.0, 40.0);
        // A wall of obstacles the router cannot fully escape; it must still
        // terminate and return a 4-point path.
        let wall: Vec<Rect> = (0..200)
            .map(|i| rect_at(i as f32 * 30.0, 150.0, 40.0, 400.0))
            .collect();
        let path = orthogonal_path(from, to, &wall);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn degenerate_rect_falls_back_to_straight_line() {
        let from = Rect::from_center_size(pos2(10.0, 10.0), Vec2::ZERO);
        let to = rect_at(200.0, 50.0, 40.0, 40.0);
        let path = orthogonal_path(from, to, &[]);
        assert_eq!(path, vec![pos2(10.0, 10.0), pos2(200.0, 50.0)]);
    }

    #[test]
    fn coincident_centers_fall_back_to_straight_line() {
        let a = rect_at(50.0, 50.0, 40.0, 40.0);
        let b = rect_at(50.0, 50.0, 60.0, 20.0);
        let path = orthogonal_path(a, b, &[]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn aligned_anchors_draw_straight_line() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(200.0, 1.0, 40.0, 40.0);
        let path = anchored_path(from, Anchor::Right, to, Anchor::Left);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn same_axis_anchors_produce_z_shape() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(200.0, 150.0, 40.0, 40.0);
        let path = anchored_path(from, Anchor::Right, to, Anchor::Left);

        assert_eq!(path.len(), 4);
        // Middle leg is vertical, halfway between the anchor x positions.
        let mid_x = (20.0 + 180.0) / 2.0;
        assert_eq!(path[1], pos2(mid_x, 0.0));
        assert_eq!(path[2], pos2(mid_x, 150.0));
    }

    #[test]
    fn mixed_axis_anchors_produce_l_shape() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(200.0, 150.0, 40.0, 40.0);
        let path = anchored_path(from, Anchor::Right, to, Anchor::Top);

        assert_eq!(path.len(), 3);
        assert_eq!(path[1], pos2(200.0, 0.0));
    }

    #[test]
    fn curved_path_control_points_scale_with_dx() {
        let from = rect_at(0.0, 0.0, 40.0, 40.0);
        let to = rect_at(300.0, 100.0, 40.0, 40.0);
        let curve = curved_path(from, to);
        assert_eq!(curve[0], pos2(0.0, 0.0));
        assert_eq!(curve[1], pos2(150.0, 0.0));
        assert_eq!(curve[2], pos2(150.0, 100.0));
        assert_eq!(curve[3], pos2(300.0, 100.0));
    }

    #[test]
    fn cubic_point_hits_endpoints() {
        let curve = [
            pos2(0.0, 0.0),
            pos2(10.0, 0.0),
            pos2(20.0, 10.0),
            pos2(30.0, 10.0),
        ];
        assert_eq!(cubic_point(&curve, 0.0), curve[0]);
        assert_eq!(cubic_point(&curve, 1.0), curve[3]);
    }

    #[test]
    fn arrowhead_points_back_along_approach() {
        let tri = arrowhead(pos2(100.0, 0.0), 0.0, 12.0);
        assert_eq!(tri[0], pos2(100.0, 0.0));
        // Both wings sit behind the tip for a rightward approach.
        assert!(tri[1].x < 100.0 && tri[2].x < 100.0);
        // Wings straddle the approach axis.
        assert!(tri[1].y < 0.0 && tri[2].y > 0.0 || tri[1].y > 0.0 && tri[2].y < 0.0);
    }

    #[test]
    fn snap_to_grid_rounds_to_nearest_multiple() {
        let snapped = snap_to_grid(pos2(27.0, 52.0), GRID_SIZE, true);
        assert_eq!(snapped, pos2(20.0, 60.0));
    }

    #[test]
    fn snap_to_grid_is_idempotent() {
        let p = pos2(133.7, -41.2);
        let once = snap_to_grid(p, GRID_SIZE, true);
        let twice = snap_to_grid(once, GRID_SIZE, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn snap_to_grid_disabled_is_identity() {
        let p = pos2(133.7, -41.2);
        assert_eq!(snap_to_grid(p, GRID_SIZE, false), p);
    }

    #[test]
    fn path_midpoint_of_straight_line() {
        let path = [pos2(0.0, 0.0), pos2(100.0, 0.0)];
        let (mid, angle) = path_midpoint(&path).unwrap();
        assert_eq!(mid, pos2(50.0, 0.0));
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn point_to_path_distance_uses_closest_segment() {
        let path = [pos2(0.0, 0.0), pos2(100.0, 0.0), pos2(100.0, 100.0)];
        let d = point_to_path_distance(pos2(105.0, 50.0), &path);
        assert!((d - 5.0).abs() < 1e-4);
    }
}
