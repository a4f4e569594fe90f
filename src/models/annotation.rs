// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the per-frame bounding box, the frame resolution it
//! is bounded by, and the image-space point used by pointer gestures.

use crate::util::geometry::Rect;
use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The whole frame as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i64, self.height as i64)
    }
}

/// A bounding box placed on one sampled frame.
///
/// `object_type` is an owned copy taken when the box is created, so later
/// edits to the grounding's object selection never touch existing boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub object_type: String,
    pub track_id: String,
}

impl BoundingBox {
    /// Build a box from a rectangle already clamped to the frame.
    ///
    /// Negative origins are clamped to zero; callers validate geometry first.
    pub fn from_rect(rect: Rect, object_type: impl Into<String>, track_id: impl Into<String>) -> Self {
        Self {
            x: rect.x.max(0) as u32,
            y: rect.y.max(0) as u32,
            width: rect.width.max(0) as u32,
            height: rect.height.max(0) as u32,
            object_type: object_type.into(),
            track_id: track_id.into(),
        }
    }

    /// Geometry of this box.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.x as i64,
            self.y as i64,
            self.width as i64,
            self.height as i64,
        )
    }

    /// Replace the geometry, keeping identity.
    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x.max(0) as u32;
        self.y = rect.y.max(0) as u32;
        self.width = rect.width.max(0) as u32;
        self.height = rect.height.max(0) as u32;
    }

    /// Pixel area.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the box lies inside the frame and has positive size.
    pub fn fits(&self, resolution: &Resolution) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= resolution.width as u64
            && self.y as u64 + self.height as u64 <= resolution.height as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_rect_roundtrip() {
        let rect = Rect::new(10, 20, 30, 40);
        let bbox = BoundingBox::from_rect(rect, "person", "person_001");
        assert_eq!(bbox.rect(), rect);
        assert_eq!(bbox.area(), 1200);
    }

    #[test]
    fn test_box_fits_frame() {
        let res = Resolution::new(100, 50);
        let inside = BoundingBox::from_rect(Rect::new(90, 40, 10, 10), "car", "car_001");
        let outside = BoundingBox::from_rect(Rect::new(95, 40, 10, 10), "car", "car_001");
        assert!(inside.fits(&res));
        assert!(!outside.fits(&res));
    }

    #[test]
    fn test_box_serializes_flat_fields() {
        let bbox = BoundingBox::from_rect(Rect::new(1, 2, 3, 4), "dog", "dog_002");
        let json = serde_json::to_value(&bbox).unwrap();
        assert_eq!(json["x"], 1);
        assert_eq!(json["height"], 4);
        assert_eq!(json["object_type"], "dog");
        assert_eq!(json["track_id"], "dog_002");
    }
}
