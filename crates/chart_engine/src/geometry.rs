//! Geometry primitives shared by layout, hit-testing and label placement
//!
//! All values are in the logical units of the viewport handed to the layout
//! calculator. The y axis grows downward.

use serde::{Deserialize, Serialize};

/// A rectangle in layout coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    /// Create a new rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from two opposite corners in any order
    pub fn from_corners(a: LayoutPoint, b: LayoutPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Build a rectangle of the given size centered on a point
    pub fn centered(center: LayoutPoint, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Get the right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Get the center X coordinate
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Get the center Y coordinate
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> LayoutPoint {
        LayoutPoint::new(self.center_x(), self.center_y())
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink the rectangle by the given padding
    pub fn inset(&self, padding: f64) -> Self {
        self.inset_sides(padding, padding, padding, padding)
    }

    /// Shrink by different amounts on each side
    ///
    /// Never grows the rectangle: negative amounts are ignored and the size
    /// bottoms out at zero.
    pub fn inset_sides(&self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        let top = top.max(0.0);
        let right = right.max(0.0);
        let bottom = bottom.max(0.0);
        let left = left.max(0.0);
        let width = (self.width - left - right).max(0.0);
        let height = (self.height - top - bottom).max(0.0);
        Self {
            x: (self.x + left).min(self.x + self.width),
            y: (self.y + top).min(self.y + self.height),
            width,
            height,
        }
    }

    /// Edge-inclusive containment test
    pub fn contains(&self, point: LayoutPoint) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }
}

/// A point in layout coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from this one along `angle` (radians, clockwise on screen)
    pub fn polar(&self, radius: f64, angle: f64) -> Self {
        Self::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn distance(&self, other: LayoutPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Upright bounding box of this box rotated by `degrees`
    pub fn rotated(&self, degrees: f64) -> Size {
        if degrees == 0.0 {
            return *self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        Size::new(
            self.width * cos + self.height * sin,
            self.width * sin + self.height * cos,
        )
    }

    /// Half of the extent of this (upright) box along a unit direction
    pub fn half_extent_along(&self, direction_angle: f64) -> f64 {
        let (sin, cos) = direction_angle.sin_cos();
        (self.width * cos.abs() + self.height * sin.abs()) / 2.0
    }
}

/// Shortest distance from `point` to the segment `a`-`b`
pub fn distance_to_segment(point: LayoutPoint, a: LayoutPoint, b: LayoutPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    point.distance(LayoutPoint::new(a.x + t * dx, a.y + t * dy))
}

/// Even-odd polygon containment
pub fn polygon_contains(polygon: &[LayoutPoint], point: LayoutPoint) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let cross_x = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Approximate an annular sector with a polygon
///
/// The arc is sampled every `step` radians; both arcs are included, so a zero
/// inner radius degenerates to a pie wedge through the center.
pub fn sector_polygon(
    center: LayoutPoint,
    inner_radius: f64,
    outer_radius: f64,
    start_angle: f64,
    end_angle: f64,
    step: f64,
) -> Vec<LayoutPoint> {
    let sweep = end_angle - start_angle;
    let samples = ((sweep.abs() / step.max(1e-3)).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(2 * samples + 2);
    for i in 0..=samples {
        let angle = start_angle + sweep * i as f64 / samples as f64;
        points.push(center.polar(outer_radius, angle));
    }
    if inner_radius > 0.0 {
        for i in (0..=samples).rev() {
            let angle = start_angle + sweep * i as f64 / samples as f64;
            points.push(center.polar(inner_radius, angle));
        }
    } else {
        points.push(center);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rect_inset() {
        let rect = LayoutRect::new(10.0, 20.0, 100.0, 80.0);
        let inset = rect.inset(5.0);

        assert_eq!(inset.x, 15.0);
        assert_eq!(inset.y, 25.0);
        assert_eq!(inset.width, 90.0);
        assert_eq!(inset.height, 70.0);
    }

    #[test]
    fn test_inset_never_grows() {
        let rect = LayoutRect::new(0.0, 0.0, 10.0, 10.0);
        let inset = rect.inset_sides(-5.0, 20.0, 0.0, 0.0);

        assert_eq!(inset.y, 0.0);
        assert_eq!(inset.width, 0.0);
        assert_eq!(inset.height, 10.0);
    }

    #[test]
    fn test_layout_rect_center() {
        let rect = LayoutRect::new(0.0, 0.0, 100.0, 80.0);

        assert_eq!(rect.center_x(), 50.0);
        assert_eq!(rect.center_y(), 40.0);
    }

    #[test]
    fn test_rotated_size() {
        let size = Size::new(40.0, 10.0);
        let quarter = size.rotated(90.0);
        assert!((quarter.width - 10.0).abs() < 1e-9);
        assert!((quarter.height - 40.0).abs() < 1e-9);
        assert_eq!(size.rotated(0.0), size);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = LayoutPoint::new(0.0, 0.0);
        let b = LayoutPoint::new(10.0, 0.0);
        assert_eq!(distance_to_segment(LayoutPoint::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(LayoutPoint::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(LayoutPoint::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_polygon_contains() {
        let square = vec![
            LayoutPoint::new(0.0, 0.0),
            LayoutPoint::new(10.0, 0.0),
            LayoutPoint::new(10.0, 10.0),
            LayoutPoint::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, LayoutPoint::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, LayoutPoint::new(15.0, 5.0)));
        assert!(!polygon_contains(&square[..2], LayoutPoint::new(5.0, 0.0)));
    }

    #[test]
    fn test_sector_polygon_contains_bisector() {
        let center = LayoutPoint::new(50.0, 50.0);
        let polygon = sector_polygon(center, 10.0, 40.0, 0.0, std::f64::consts::FRAC_PI_2, 0.05);
        let inside = center.polar(25.0, std::f64::consts::FRAC_PI_4);
        let hole = center.polar(5.0, std::f64::consts::FRAC_PI_4);
        let outside = center.polar(25.0, std::f64::consts::PI);
        assert!(polygon_contains(&polygon, inside));
        assert!(!polygon_contains(&polygon, hole));
        assert!(!polygon_contains(&polygon, outside));
    }
}
