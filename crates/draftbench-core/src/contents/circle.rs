//! Circle content.

use crate::content::{Content, point_from, point_to};
use crate::geometry::Geometries;
use crate::math::{reflect_across, rotate_about, sample_arc};
use crate::registry::{ContentModel, EditPoint, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::{Point, Vec2};
use serde_json::json;
use std::f64::consts::TAU;

pub const TYPE: &str = "circle";

/// Segments used to approximate a full circle.
const CIRCLE_SEGMENTS: usize = 36;

/// Build a circle content.
pub fn make(center: Point, radius: f64) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "center": point_to(center),
        "radius": radius,
    }))
}

fn center_of(content: &Content) -> Option<Point> {
    content.get("center").and_then(point_from)
}

fn radius_of(content: &Content) -> Option<f64> {
    content.get("radius").and_then(serde_json::Value::as_f64)
}

fn with_center(content: &Content, center: Point) -> Content {
    content.edit(|map| {
        map.insert("center".into(), point_to(center));
    })
}

fn translate(content: &Content, delta: Vec2) -> Content {
    match center_of(content) {
        Some(center) => with_center(content, center + delta),
        None => content.clone(),
    }
}

fn rotate(content: &Content, pivot: Point, angle: f64) -> Content {
    match center_of(content) {
        Some(center) => with_center(content, rotate_about(center, pivot, angle)),
        None => content.clone(),
    }
}

fn mirror(content: &Content, a: Point, b: Point) -> Content {
    match center_of(content) {
        Some(center) => with_center(content, reflect_across(center, a, b)),
        None => content.clone(),
    }
}

fn geometries(content: &Content, _ctx: &ModelCtx) -> Result<Geometries, String> {
    let center = center_of(content).ok_or("circle without center")?;
    let radius = radius_of(content).ok_or("circle without radius")?;
    let mut ring = sample_arc(center, radius, 0.0, TAU, CIRCLE_SEGMENTS);
    // Drop the duplicated closing point; from_polyline closes the ring.
    ring.pop();
    let mut geometry = Geometries::from_polyline(ring, true);
    geometry.points.push(center);
    Ok(geometry)
}

fn edit_points(content: &Content) -> Vec<EditPoint> {
    let Some(center) = center_of(content) else {
        return Vec::new();
    };
    let Some(radius) = radius_of(content) else {
        return Vec::new();
    };
    vec![
        EditPoint {
            point: center,
            part: None,
        },
        EditPoint {
            point: Point::new(center.x + radius, center.y),
            part: None,
        },
    ]
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    let Some(center) = center_of(content) else {
        return Vec::new();
    };
    let Some(radius) = radius_of(content) else {
        return Vec::new();
    };
    let mut out = vec![SnapPoint {
        point: center,
        kind: SnapKind::Center,
        part: None,
        param: None,
    }];
    // Quadrant points.
    for (i, (dx, dy)) in [(radius, 0.0), (0.0, radius), (-radius, 0.0), (0.0, -radius)]
        .into_iter()
        .enumerate()
    {
        out.push(SnapPoint {
            point: Point::new(center.x + dx, center.y + dy),
            kind: SnapKind::Endpoint,
            part: None,
            param: Some(i as f64 * TAU / 4.0),
        });
    }
    out
}

fn is_valid(content: &Content) -> Result<(), String> {
    let center = center_of(content).ok_or("circle needs a `center` point")?;
    let radius = radius_of(content).ok_or("circle needs a `radius`")?;
    if !center.x.is_finite() || !center.y.is_finite() {
        return Err("circle center must be finite".into());
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(format!("circle radius must be positive, is {radius}"));
    }
    Ok(())
}

/// Capability table for circles.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        translate: Some(translate),
        rotate: Some(rotate),
        mirror: Some(mirror),
        geometries: Some(geometries),
        edit_points: Some(edit_points),
        snap_points: Some(snap_points),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::standard_registry;

    #[test]
    fn test_geometry_closes_region() {
        let registry = standard_registry();
        let store: Vec<Option<Content>> = Vec::new();
        let ctx = ModelCtx::new(&store, &registry);
        let geometry = geometries(&make(Point::new(0.0, 0.0), 10.0), &ctx).unwrap();
        assert_eq!(geometry.lines.len(), CIRCLE_SEGMENTS);
        assert_eq!(geometry.regions.len(), 1);
        let bounds = geometry.bounding.unwrap();
        assert!((bounds.width() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_snap() {
        let registry = standard_registry();
        let store: Vec<Option<Content>> = Vec::new();
        let ctx = ModelCtx::new(&store, &registry);
        let snaps = snap_points(&make(Point::new(5.0, 5.0), 2.0), &ctx);
        assert!(snaps.iter().any(|s| s.kind == SnapKind::Center
            && s.point == Point::new(5.0, 5.0)));
        assert_eq!(snaps.len(), 5);
    }

    #[test]
    fn test_zero_radius_is_invalid() {
        assert!(is_valid(&make(Point::new(0.0, 0.0), 0.0)).is_err());
        assert!(is_valid(&make(Point::new(0.0, 0.0), 1.0)).is_ok());
    }
}
