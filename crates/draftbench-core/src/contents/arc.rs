//! Circular arc content.

use crate::content::{Content, point_from, point_to};
use crate::geometry::Geometries;
use crate::math::{rotate_about, sample_arc};
use crate::registry::{ContentModel, EditPoint, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::{Point, Vec2};
use serde_json::{Value, json};
use std::f64::consts::TAU;

pub const TYPE: &str = "arc";

/// Build an arc content. Angles are radians, counter-clockwise from +x;
/// `end` greater than `start` sweeps counter-clockwise.
pub fn make(center: Point, radius: f64, start: f64, end: f64) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "center": point_to(center),
        "radius": radius,
        "start_angle": start,
        "end_angle": end,
    }))
}

struct ArcFields {
    center: Point,
    radius: f64,
    start: f64,
    end: f64,
}

fn fields(content: &Content) -> Option<ArcFields> {
    Some(ArcFields {
        center: content.get("center").and_then(point_from)?,
        radius: content.get("radius").and_then(Value::as_f64)?,
        start: content.get("start_angle").and_then(Value::as_f64)?,
        end: content.get("end_angle").and_then(Value::as_f64)?,
    })
}

fn translate(content: &Content, delta: Vec2) -> Content {
    let Some(arc) = fields(content) else {
        return content.clone();
    };
    content.edit(|map| {
        map.insert("center".into(), point_to(arc.center + delta));
    })
}

fn rotate(content: &Content, pivot: Point, angle: f64) -> Content {
    let Some(arc) = fields(content) else {
        return content.clone();
    };
    content.edit(|map| {
        map.insert("center".into(), point_to(rotate_about(arc.center, pivot, angle)));
        map.insert("start_angle".into(), json!(arc.start + angle));
        map.insert("end_angle".into(), json!(arc.end + angle));
    })
}

fn sample(arc: &ArcFields) -> Vec<Point> {
    let sweep = (arc.end - arc.start).abs();
    let segments = ((sweep / TAU * 36.0).ceil() as usize).max(8);
    sample_arc(arc.center, arc.radius, arc.start, arc.end, segments)
}

fn geometries(content: &Content, _ctx: &ModelCtx) -> Result<Geometries, String> {
    let arc = fields(content).ok_or("arc missing center/radius/angles")?;
    Ok(Geometries::from_polyline(sample(&arc), false))
}

fn point_at(arc: &ArcFields, angle: f64) -> Point {
    Point::new(
        arc.center.x + arc.radius * angle.cos(),
        arc.center.y + arc.radius * angle.sin(),
    )
}

fn edit_points(content: &Content) -> Vec<EditPoint> {
    let Some(arc) = fields(content) else {
        return Vec::new();
    };
    vec![
        EditPoint {
            point: arc.center,
            part: None,
        },
        EditPoint {
            point: point_at(&arc, arc.start),
            part: None,
        },
        EditPoint {
            point: point_at(&arc, arc.end),
            part: None,
        },
    ]
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    let Some(arc) = fields(content) else {
        return Vec::new();
    };
    vec![
        SnapPoint {
            point: point_at(&arc, arc.start),
            kind: SnapKind::Endpoint,
            part: None,
            param: Some(arc.start),
        },
        SnapPoint {
            point: point_at(&arc, arc.end),
            kind: SnapKind::Endpoint,
            part: None,
            param: Some(arc.end),
        },
        SnapPoint {
            point: point_at(&arc, (arc.start + arc.end) / 2.0),
            kind: SnapKind::Midpoint,
            part: None,
            param: Some((arc.start + arc.end) / 2.0),
        },
        SnapPoint {
            point: arc.center,
            kind: SnapKind::Center,
            part: None,
            param: None,
        },
    ]
}

fn is_valid(content: &Content) -> Result<(), String> {
    let arc = fields(content).ok_or("arc needs center, radius, and angles")?;
    if !(arc.radius.is_finite() && arc.radius > 0.0) {
        return Err(format!("arc radius must be positive, is {}", arc.radius));
    }
    if !arc.start.is_finite() || !arc.end.is_finite() {
        return Err("arc angles must be finite".into());
    }
    if (arc.end - arc.start).abs() < 1e-9 {
        return Err("arc sweep must be non-zero".into());
    }
    Ok(())
}

/// Capability table for arcs. Mirroring is intentionally absent: an arc
/// has an orientation the two-point mirror cannot express without flipping
/// its sweep, so the mirror command simply excludes arcs.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        translate: Some(translate),
        rotate: Some(rotate),
        geometries: Some(geometries),
        edit_points: Some(edit_points),
        snap_points: Some(snap_points),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}
