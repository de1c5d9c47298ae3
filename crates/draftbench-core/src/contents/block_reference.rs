//! Block reference content: draws a block at another insertion point.

use crate::content::{Content, point_from, point_to};
use crate::geometry::Geometries;
use crate::registry::{ContentModel, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::{Point, Vec2};
use serde_json::{Value, json};
use std::collections::HashMap;

use super::block;

pub const TYPE: &str = "blockReference";

/// Build a reference to the block at `target`, drawn at `insert`.
pub fn make(target: usize, insert: Point) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "ref": target,
        "insert": point_to(insert),
    }))
}

fn target_of(content: &Content) -> Option<usize> {
    content.get("ref").and_then(Value::as_u64).map(|n| n as usize)
}

fn insert_of(content: &Content) -> Option<Point> {
    content.get("insert").and_then(point_from)
}

/// Displacement from the block's base point to this reference's insert.
fn displacement(content: &Content, ctx: &ModelCtx) -> Option<Vec2> {
    let insert = insert_of(content)?;
    let target = ctx.content(target_of(content)?)?;
    let base = block::base_of(target)?;
    Some(insert - base)
}

fn translate(content: &Content, delta: Vec2) -> Content {
    match insert_of(content) {
        Some(insert) => content.edit(|map| {
            map.insert("insert".into(), point_to(insert + delta));
        }),
        None => content.clone(),
    }
}

fn geometries(content: &Content, ctx: &ModelCtx) -> Result<Geometries, String> {
    let Some(target) = target_of(content) else {
        return Err("block reference without `ref`".into());
    };
    let Some(delta) = displacement(content, ctx) else {
        // Dangling reference: render as nothing rather than failing.
        return Ok(Geometries::empty());
    };
    Ok(ctx.geometries_of(target)?.translated(delta))
}

/// Decompose into copies of the block's children at this insert point.
fn explode(content: &Content, ctx: &ModelCtx) -> Option<Vec<Content>> {
    let target = ctx.content(target_of(content)?)?;
    let delta = displacement(content, ctx)?;
    let mut out = Vec::new();
    for child in block::children_of(target) {
        let child_content = ctx.content(child)?;
        let translate = ctx
            .registry
            .model(child_content.type_tag())
            .and_then(|m| m.translate)?;
        out.push(translate(child_content, delta));
    }
    (!out.is_empty()).then_some(out)
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    insert_of(content)
        .map(|insert| {
            vec![SnapPoint {
                point: insert,
                kind: SnapKind::Endpoint,
                part: None,
                param: None,
            }]
        })
        .unwrap_or_default()
}

fn ref_ids(content: &Content) -> Vec<usize> {
    target_of(content).map(|t| vec![t]).unwrap_or_default()
}

fn update_ref_id(content: &Content, remap: &HashMap<usize, usize>) -> Content {
    let Some(target) = target_of(content) else {
        return content.clone();
    };
    let new_target = remap.get(&target).copied().unwrap_or(target);
    content.edit(|map| {
        map.insert("ref".into(), Value::from(new_target));
    })
}

fn is_valid(content: &Content) -> Result<(), String> {
    if target_of(content).is_none() {
        return Err("block reference needs a `ref` slot index".into());
    }
    if insert_of(content).is_none() {
        return Err("block reference needs an `insert` point".into());
    }
    Ok(())
}

/// Capability table for block references.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        translate: Some(translate),
        explode: Some(explode),
        geometries: Some(geometries),
        snap_points: Some(snap_points),
        ref_ids: Some(ref_ids),
        update_ref_id: Some(update_ref_id),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}
