//! Line content: a single straight segment.

use crate::content::{Content, point_from, points_from, points_to};
use crate::geometry::Geometries;
use crate::math::{reflect_across, rotate_about};
use crate::registry::{ContentModel, EditPoint, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::{Point, Vec2};
use serde_json::json;

pub const TYPE: &str = "line";

/// Build a line content between two points.
pub fn make(start: Point, end: Point) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "points": points_to(&[start, end]),
    }))
}

fn endpoints(content: &Content) -> Option<(Point, Point)> {
    let points = content.get("points")?.as_array()?;
    Some((point_from(points.first()?)?, point_from(points.get(1)?)?))
}

fn map_endpoints(content: &Content, f: impl Fn(Point) -> Point) -> Content {
    let Some((start, end)) = endpoints(content) else {
        return content.clone();
    };
    content.edit(|map| {
        map.insert("points".into(), points_to(&[f(start), f(end)]));
    })
}

fn translate(content: &Content, delta: Vec2) -> Content {
    map_endpoints(content, |p| p + delta)
}

fn rotate(content: &Content, center: Point, angle: f64) -> Content {
    map_endpoints(content, |p| rotate_about(p, center, angle))
}

fn mirror(content: &Content, a: Point, b: Point) -> Content {
    map_endpoints(content, |p| reflect_across(p, a, b))
}

/// Split the segment at the given points, producing one line per piece.
fn break_at(content: &Content, cuts: &[Point]) -> Option<Vec<Content>> {
    let (start, end) = endpoints(content)?;
    let seg = Vec2::new(end.x - start.x, end.y - start.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON || cuts.is_empty() {
        return None;
    }
    let mut params: Vec<f64> = cuts
        .iter()
        .map(|p| (Vec2::new(p.x - start.x, p.y - start.y).dot(seg) / len_sq).clamp(0.0, 1.0))
        .filter(|t| *t > 1e-9 && *t < 1.0 - 1e-9)
        .collect();
    if params.is_empty() {
        return None;
    }
    params.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut stops = vec![0.0];
    stops.extend(params);
    stops.push(1.0);
    let at = |t: f64| Point::new(start.x + seg.x * t, start.y + seg.y * t);
    Some(stops.windows(2).map(|w| make(at(w[0]), at(w[1]))).collect())
}

fn geometries(content: &Content, _ctx: &ModelCtx) -> Result<Geometries, String> {
    let points = content
        .get("points")
        .and_then(points_from)
        .ok_or("line without points")?;
    Ok(Geometries::from_polyline(points, false))
}

fn edit_points(content: &Content) -> Vec<EditPoint> {
    endpoints(content)
        .map(|(start, end)| {
            vec![
                EditPoint {
                    point: start,
                    part: Some(0),
                },
                EditPoint {
                    point: end,
                    part: Some(0),
                },
            ]
        })
        .unwrap_or_default()
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    let Some((start, end)) = endpoints(content) else {
        return Vec::new();
    };
    vec![
        SnapPoint {
            point: start,
            kind: SnapKind::Endpoint,
            part: Some(0),
            param: Some(0.0),
        },
        SnapPoint {
            point: end,
            kind: SnapKind::Endpoint,
            part: Some(0),
            param: Some(1.0),
        },
        SnapPoint {
            point: start.midpoint(end),
            kind: SnapKind::Midpoint,
            part: Some(0),
            param: Some(0.5),
        },
    ]
}

fn is_valid(content: &Content) -> Result<(), String> {
    let points = content
        .get("points")
        .and_then(points_from)
        .ok_or("line needs a `points` array of two points")?;
    if points.len() != 2 {
        return Err(format!("line needs exactly 2 points, has {}", points.len()));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err("line points must be finite".into());
    }
    Ok(())
}

/// Capability table for lines.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        translate: Some(translate),
        rotate: Some(rotate),
        mirror: Some(mirror),
        break_at: Some(break_at),
        geometries: Some(geometries),
        edit_points: Some(edit_points),
        snap_points: Some(snap_points),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}
