// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Rectangles in integer pixel space, frame clamping, and the hit-testing
//! used to tell a move from a resize from a fresh draw. Everything here is
//! pure; no annotation state is touched.

use crate::models::annotation::Point;

/// Axis-aligned rectangle in pixel coordinates.
///
/// Signed so that in-flight drag geometry may leave the frame before it is
/// clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanned by two drag points, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let (ax, ay) = (a.x.floor() as i64, a.y.floor() as i64);
        let (bx, by) = (b.x.floor() as i64, b.y.floor() as i64);
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: (ax - bx).abs(),
            height: (ay - by).abs(),
        }
    }

    fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width * self.height
    }

    /// Zero or negative width/height.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Edge-inclusive containment.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x as f64
            && p.x <= self.right() as f64
            && p.y >= self.y as f64
            && p.y <= self.bottom() as f64
    }

    pub fn translated(&self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Intersection with `bounds`, or `None` when nothing is left.
    pub fn clipped_to(&self, bounds: &Rect) -> Option<Rect> {
        let left = self.x.max(bounds.x);
        let top = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());
        let clipped = Rect::from_edges(left, top, right, bottom);
        if clipped.is_degenerate() {
            None
        } else {
            Some(clipped)
        }
    }

    /// Slide the rectangle back inside `bounds` keeping its size; a
    /// rectangle larger than the bounds is cut down to them.
    pub fn shifted_into(&self, bounds: &Rect) -> Rect {
        let width = self.width.min(bounds.width);
        let height = self.height.min(bounds.height);
        let x = self.x.clamp(bounds.x, bounds.right() - width);
        let y = self.y.clamp(bounds.y, bounds.bottom() - height);
        Rect::new(x, y, width, height)
    }
}

/// A resize handle: one of the four corners or four edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl Handle {
    fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft | Handle::Left)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight | Handle::Right)
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight | Handle::Top)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight | Handle::Bottom)
    }
}

/// Where a point falls relative to a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Handle(Handle),
    Inside,
    Outside,
}

/// Proximity thresholds for handle detection, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub corner: f64,
    pub edge: f64,
}

impl Tolerance {
    /// Scale screen-space thresholds into image space.
    pub fn scaled(&self, display_scale: f64) -> Self {
        if display_scale <= 0.0 {
            return *self;
        }
        Self {
            corner: self.corner / display_scale,
            edge: self.edge / display_scale,
        }
    }
}

/// Classify `p` against `rect`. Corners win over edges, edges over the body.
pub fn zone_at(rect: &Rect, p: Point, tol: &Tolerance) -> Zone {
    if !rect.contains(p) {
        return Zone::Outside;
    }
    let (left, top) = (rect.x as f64, rect.y as f64);
    let (right, bottom) = (rect.right() as f64, rect.bottom() as f64);
    let near = |a: f64, b: f64, t: f64| (a - b).abs() <= t;

    let near_left = near(p.x, left, tol.corner);
    let near_right = near(p.x, right, tol.corner);
    let near_top = near(p.y, top, tol.corner);
    let near_bottom = near(p.y, bottom, tol.corner);

    if near_left && near_top {
        Zone::Handle(Handle::TopLeft)
    } else if near_right && near_top {
        Zone::Handle(Handle::TopRight)
    } else if near_left && near_bottom {
        Zone::Handle(Handle::BottomLeft)
    } else if near_right && near_bottom {
        Zone::Handle(Handle::BottomRight)
    } else if near(p.y, top, tol.edge) {
        Zone::Handle(Handle::Top)
    } else if near(p.y, bottom, tol.edge) {
        Zone::Handle(Handle::Bottom)
    } else if near(p.x, left, tol.edge) {
        Zone::Handle(Handle::Left)
    } else if near(p.x, right, tol.edge) {
        Zone::Handle(Handle::Right)
    } else {
        Zone::Inside
    }
}

/// Pick the box under `p`. Overlaps resolve to the smallest area; equal
/// areas to the earliest box.
pub fn pick<I>(rects: I, p: Point, tol: &Tolerance) -> Option<(usize, Zone)>
where
    I: IntoIterator<Item = Rect>,
{
    rects
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| match zone_at(&r, p, tol) {
            Zone::Outside => None,
            zone => Some((i, zone, r.area())),
        })
        .min_by_key(|(_, _, area)| *area)
        .map(|(i, zone, _)| (i, zone))
}

/// Resize `original` by dragging `handle` to `p`.
///
/// Opposite edges stay fixed, the result never shrinks below `min_size`
/// on a dragged axis, and dragged edges stop at `bounds`.
pub fn resize(original: &Rect, handle: Handle, p: Point, min_size: i64, bounds: &Rect) -> Rect {
    let px = p.x.floor() as i64;
    let py = p.y.floor() as i64;
    let (mut left, mut top) = (original.x, original.y);
    let (mut right, mut bottom) = (original.right(), original.bottom());

    if handle.moves_left() {
        left = px.min(right - min_size).max(bounds.x);
    }
    if handle.moves_right() {
        right = px.max(left + min_size).min(bounds.right());
    }
    if handle.moves_top() {
        top = py.min(bottom - min_size).max(bounds.y);
    }
    if handle.moves_bottom() {
        bottom = py.max(top + min_size).min(bounds.bottom());
    }
    Rect::from_edges(left, top, right, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> Tolerance {
        Tolerance { corner: 15.0, edge: 10.0 }
    }

    #[test]
    fn test_from_corners_any_order() {
        let r = Rect::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(r, Rect::new(10, 20, 40, 60));
    }

    #[test]
    fn test_zone_priorities() {
        let r = Rect::new(100, 100, 200, 200);
        assert_eq!(zone_at(&r, Point::new(105.0, 105.0), &tol()), Zone::Handle(Handle::TopLeft));
        assert_eq!(zone_at(&r, Point::new(295.0, 298.0), &tol()), Zone::Handle(Handle::BottomRight));
        assert_eq!(zone_at(&r, Point::new(200.0, 104.0), &tol()), Zone::Handle(Handle::Top));
        assert_eq!(zone_at(&r, Point::new(296.0, 200.0), &tol()), Zone::Handle(Handle::Right));
        assert_eq!(zone_at(&r, Point::new(200.0, 200.0), &tol()), Zone::Inside);
        assert_eq!(zone_at(&r, Point::new(99.0, 200.0), &tol()), Zone::Outside);
    }

    #[test]
    fn test_pick_prefers_smallest_box() {
        let big = Rect::new(0, 0, 400, 400);
        let small = Rect::new(150, 150, 100, 100);
        let hit = pick(vec![big, small], Point::new(200.0, 200.0), &tol());
        assert_eq!(hit, Some((1, Zone::Inside)));
        assert_eq!(pick(vec![small], Point::new(10.0, 10.0), &tol()), None);
    }

    #[test]
    fn test_tolerance_scaling() {
        let t = tol().scaled(0.5);
        assert_eq!(t.corner, 30.0);
        assert_eq!(tol().scaled(0.0), tol());
    }

    #[test]
    fn test_clip_and_shift() {
        let bounds = Rect::new(0, 0, 100, 100);
        let r = Rect::new(-10, 90, 30, 30);
        assert_eq!(r.clipped_to(&bounds), Some(Rect::new(0, 90, 20, 10)));
        assert_eq!(r.shifted_into(&bounds), Rect::new(0, 70, 30, 30));
        assert_eq!(Rect::new(200, 200, 10, 10).clipped_to(&bounds), None);
        assert_eq!(Rect::new(-5, -5, 300, 50).shifted_into(&bounds), Rect::new(0, 0, 100, 50));
    }

    #[test]
    fn test_resize_keeps_opposite_edges() {
        let bounds = Rect::new(0, 0, 640, 480);
        let r = Rect::new(100, 100, 100, 100);
        let out = resize(&r, Handle::BottomRight, Point::new(250.0, 260.0), 10, &bounds);
        assert_eq!(out, Rect::new(100, 100, 150, 160));

        let out = resize(&r, Handle::TopLeft, Point::new(195.0, 50.0), 10, &bounds);
        assert_eq!(out, Rect::new(190, 50, 10, 150));

        let out = resize(&r, Handle::Right, Point::new(900.0, 0.0), 10, &bounds);
        assert_eq!(out, Rect::new(100, 100, 540, 100));

        let out = resize(&r, Handle::Top, Point::new(0.0, -40.0), 10, &bounds);
        assert_eq!(out, Rect::new(100, 0, 100, 200));
    }
}
