//! Shared segment geometry used by hit-testing and snapping.

use kurbo::{Point, Rect, Vec2};

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    point.distance(proj)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Intersection point of segments (a-b) and (c-d), if they cross.
///
/// Collinear overlaps report no single intersection point and return None.
pub fn segment_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let r = Vec2::new(b.x - a.x, b.y - a.y);
    let s = Vec2::new(d.x - c.x, d.y - c.y);
    let denom = r.cross(s);
    if denom.abs() < 1e-12 {
        return None;
    }
    let ac = Vec2::new(c.x - a.x, c.y - a.y);
    let t = ac.cross(s) / denom;
    let u = ac.cross(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(Point::new(a.x + t * r.x, a.y + t * r.y))
    } else {
        None
    }
}

/// Test if two line segments (a-b) and (c-d) intersect, including touching.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let cross =
        |o: Point, p: Point, q: Point| (p.x - o.x) * (q.y - o.y) - (p.y - o.y) * (q.x - o.x);
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear cases: an endpoint lies on the other segment.
    let on_segment = |p: Point, q: Point, r: Point| {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };
    (d1.abs() < 1e-10 && on_segment(c, d, a))
        || (d2.abs() < 1e-10 && on_segment(c, d, b))
        || (d3.abs() < 1e-10 && on_segment(a, b, c))
        || (d4.abs() < 1e-10 && on_segment(a, b, d))
}

/// Test if any segment of a polyline intersects or lies inside a rectangle.
pub fn polyline_intersects_rect(points: &[Point], rect: Rect) -> bool {
    if points.iter().any(|p| rect.contains(*p)) {
        return true;
    }
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    let edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    for w in points.windows(2) {
        for &(c, d) in &edges {
            if segments_intersect(w[0], w[1], c, d) {
                return true;
            }
        }
    }
    false
}

/// Even-odd containment test for a point in a simple polygon.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Rotate a point around a center by an angle in radians.
pub fn rotate_about(p: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Reflect a point across the axis through `a` and `b`.
pub fn reflect_across(p: Point, a: Point, b: Point) -> Point {
    let d = Vec2::new(b.x - a.x, b.y - a.y);
    let len_sq = d.hypot2();
    if len_sq < f64::EPSILON {
        return p;
    }
    let t = (Vec2::new(p.x - a.x, p.y - a.y).dot(d)) / len_sq;
    let foot = Point::new(a.x + t * d.x, a.y + t * d.y);
    Point::new(2.0 * foot.x - p.x, 2.0 * foot.y - p.y)
}

/// Axis-aligned bounding box of a point set.
pub fn bounding_of(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::new(first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        rect = rect.union_pt(*p);
    }
    Some(rect)
}

/// Sample a circular arc into a polyline, endpoints included.
///
/// Angles are radians; `end` may be less than `start` for clockwise arcs.
pub fn sample_arc(center: Point, radius: f64, start: f64, end: f64, segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    let step = (end - start) / segments as f64;
    (0..=segments)
        .map(|i| {
            let angle = start + step * i as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(-4.0, 0.0), a, b) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_intersection_crossing() {
        let p = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        )
        .unwrap();
        assert!((p.x - 5.0).abs() < 1e-9 && (p.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_intersection_disjoint() {
        assert!(
            segment_intersection(
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 1.0),
            )
            .is_none()
        );
    }

    #[test]
    fn test_polyline_intersects_rect_crossing_edge() {
        let pts = [Point::new(-5.0, 5.0), Point::new(15.0, 5.0)];
        assert!(polyline_intersects_rect(
            &pts,
            Rect::new(0.0, 0.0, 10.0, 10.0)
        ));
        let far = [Point::new(-5.0, 50.0), Point::new(15.0, 50.0)];
        assert!(!polyline_intersects_rect(
            &far,
            Rect::new(0.0, 0.0, 10.0, 10.0)
        ));
    }

    #[test]
    fn test_sample_arc_endpoints() {
        let pts = sample_arc(Point::new(0.0, 0.0), 2.0, 0.0, std::f64::consts::PI, 8);
        assert_eq!(pts.len(), 9);
        assert!((pts[0].x - 2.0).abs() < 1e-9);
        assert!((pts[8].x + 2.0).abs() < 1e-9);
    }
}
