//! Polyline content: connected straight segments.

use crate::content::{Content, points_from, points_to};
use crate::geometry::Geometries;
use crate::math::{reflect_across, rotate_about};
use crate::registry::{ContentModel, EditPoint, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::{Point, Vec2};
use serde_json::json;

use super::line;

pub const TYPE: &str = "polyline";

/// Build a polyline content through the given vertices.
pub fn make(points: &[Point]) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "points": points_to(points),
    }))
}

fn vertices(content: &Content) -> Vec<Point> {
    content.get("points").and_then(points_from).unwrap_or_default()
}

fn map_vertices(content: &Content, f: impl Fn(Point) -> Point) -> Content {
    let mapped: Vec<Point> = vertices(content).into_iter().map(f).collect();
    content.edit(|map| {
        map.insert("points".into(), points_to(&mapped));
    })
}

fn translate(content: &Content, delta: Vec2) -> Content {
    map_vertices(content, |p| p + delta)
}

fn rotate(content: &Content, center: Point, angle: f64) -> Content {
    map_vertices(content, |p| rotate_about(p, center, angle))
}

fn mirror(content: &Content, a: Point, b: Point) -> Content {
    map_vertices(content, |p| reflect_across(p, a, b))
}

/// Decompose into one line per segment.
fn explode(content: &Content, _ctx: &ModelCtx) -> Option<Vec<Content>> {
    let points = vertices(content);
    if points.len() < 2 {
        return None;
    }
    Some(points.windows(2).map(|w| line::make(w[0], w[1])).collect())
}

fn geometries(content: &Content, _ctx: &ModelCtx) -> Result<Geometries, String> {
    let points = content
        .get("points")
        .and_then(points_from)
        .ok_or("polyline without points")?;
    Ok(Geometries::from_polyline(points, false))
}

fn edit_points(content: &Content) -> Vec<EditPoint> {
    vertices(content)
        .into_iter()
        .enumerate()
        .map(|(i, point)| EditPoint {
            point,
            // A vertex belongs to the segment it starts, the last to the
            // segment it ends.
            part: Some(i.saturating_sub(1)),
        })
        .collect()
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    let points = vertices(content);
    let mut out: Vec<SnapPoint> = points
        .iter()
        .enumerate()
        .map(|(i, &p)| SnapPoint {
            point: p,
            kind: SnapKind::Endpoint,
            part: Some(i.saturating_sub(1)),
            param: None,
        })
        .collect();
    for (i, w) in points.windows(2).enumerate() {
        out.push(SnapPoint {
            point: w[0].midpoint(w[1]),
            kind: SnapKind::Midpoint,
            part: Some(i),
            param: Some(0.5),
        });
    }
    out
}

fn is_valid(content: &Content) -> Result<(), String> {
    let points = content
        .get("points")
        .and_then(points_from)
        .ok_or("polyline needs a `points` array")?;
    if points.len() < 2 {
        return Err(format!(
            "polyline needs at least 2 points, has {}",
            points.len()
        ));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err("polyline points must be finite".into());
    }
    Ok(())
}

/// Capability table for polylines.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        translate: Some(translate),
        rotate: Some(rotate),
        mirror: Some(mirror),
        explode: Some(explode),
        geometries: Some(geometries),
        edit_points: Some(edit_points),
        snap_points: Some(snap_points),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}
