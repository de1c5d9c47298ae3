//! Block content: a reusable group of other slots.
//!
//! A block does not own copies of its children; it references them by
//! store index. Block references (`block_reference`) draw the whole group
//! elsewhere. Reference integrity keeps children alive while the block
//! exists, and the block alive while references to it exist.

use crate::content::{Content, point_from, point_to};
use crate::geometry::Geometries;
use crate::registry::{ContentModel, ModelCtx};
use crate::snap::{SnapKind, SnapPoint};
use kurbo::Point;
use serde_json::{Value, json};
use std::collections::HashMap;

pub const TYPE: &str = "block";

/// Build a block with a base (insertion anchor) point and child slots.
pub fn make(base: Point, children: Vec<usize>) -> Content {
    Content::from_tagged(json!({
        "type": TYPE,
        "base": point_to(base),
        "children": children,
    }))
}

pub(crate) fn base_of(content: &Content) -> Option<Point> {
    content.get("base").and_then(point_from)
}

pub(crate) fn children_of(content: &Content) -> Vec<usize> {
    content
        .get("children")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_u64().map(|n| n as usize))
                .collect()
        })
        .unwrap_or_default()
}

fn geometries(content: &Content, ctx: &ModelCtx) -> Result<Geometries, String> {
    let mut merged = Geometries::empty();
    for child in children_of(content) {
        merged.merge(&ctx.geometries_of(child)?);
    }
    Ok(merged)
}

fn snap_points(content: &Content, _ctx: &ModelCtx) -> Vec<SnapPoint> {
    base_of(content)
        .map(|base| {
            vec![SnapPoint {
                point: base,
                kind: SnapKind::Endpoint,
                part: None,
                param: None,
            }]
        })
        .unwrap_or_default()
}

fn ref_ids(content: &Content) -> Vec<usize> {
    children_of(content)
}

fn update_ref_id(content: &Content, remap: &HashMap<usize, usize>) -> Content {
    let children: Vec<Value> = children_of(content)
        .into_iter()
        // A dangling child keeps its old number; it stays dangling.
        .map(|child| Value::from(remap.get(&child).copied().unwrap_or(child)))
        .collect();
    content.edit(|map| {
        map.insert("children".into(), Value::Array(children));
    })
}

fn child_by_point(content: &Content, ctx: &ModelCtx, point: Point) -> Option<usize> {
    children_of(content).into_iter().find(|&child| {
        // Closed-interval containment: degenerate boxes from axis-aligned
        // lines still respond to a pick on them.
        ctx.geometries_of(child)
            .ok()
            .and_then(|g| g.bounding)
            .is_some_and(|b| {
                point.x >= b.x0 && point.x <= b.x1 && point.y >= b.y0 && point.y <= b.y1
            })
    })
}

fn is_valid(content: &Content) -> Result<(), String> {
    if base_of(content).is_none() {
        return Err("block needs a `base` point".into());
    }
    let children = content
        .get("children")
        .and_then(Value::as_array)
        .ok_or("block needs a `children` array")?;
    if children.is_empty() {
        return Err("block needs at least one child".into());
    }
    if children.iter().any(|v| v.as_u64().is_none()) {
        return Err("block children must be slot indices".into());
    }
    Ok(())
}

/// Capability table for blocks. Transform capabilities are absent on
/// purpose: the children are independent slots, so moving the block value
/// would double-transform them. Edit commands exclude blocks through
/// their predicates and operate on the children directly.
pub fn model() -> ContentModel {
    ContentModel {
        type_tag: TYPE,
        geometries: Some(geometries),
        snap_points: Some(snap_points),
        ref_ids: Some(ref_ids),
        update_ref_id: Some(update_ref_id),
        child_by_point: Some(child_by_point),
        is_valid: Some(is_valid),
        ..ContentModel::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::{line, standard_registry};

    #[test]
    fn test_geometry_unions_children() {
        let registry = standard_registry();
        let store = vec![
            Some(line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0))),
            Some(line::make(Point::new(0.0, 0.0), Point::new(0.0, 20.0))),
            Some(make(Point::new(0.0, 0.0), vec![0, 1])),
        ];
        let ctx = ModelCtx::new(&store, &registry);
        let geometry = geometries(store[2].as_ref().unwrap(), &ctx).unwrap();
        let bounds = geometry.bounding.unwrap();
        assert_eq!((bounds.width(), bounds.height()), (10.0, 20.0));
        assert_eq!(geometry.lines.len(), 2);
    }

    #[test]
    fn test_ref_ids_and_remap() {
        let block = make(Point::new(0.0, 0.0), vec![3, 5]);
        assert_eq!(ref_ids(&block), vec![3, 5]);
        let remap = HashMap::from([(3usize, 0usize), (5usize, 1usize)]);
        let updated = update_ref_id(&block, &remap);
        assert_eq!(children_of(&updated), vec![0, 1]);
    }

    #[test]
    fn test_child_by_point() {
        let registry = standard_registry();
        let store = vec![
            Some(line::make(Point::new(0.0, 0.0), Point::new(10.0, 0.0))),
            Some(line::make(Point::new(100.0, 0.0), Point::new(110.0, 0.0))),
            Some(make(Point::new(0.0, 0.0), vec![0, 1])),
        ];
        let ctx = ModelCtx::new(&store, &registry);
        let block = store[2].as_ref().unwrap();
        assert_eq!(child_by_point(block, &ctx, Point::new(105.0, 0.0)), Some(1));
        assert_eq!(child_by_point(block, &ctx, Point::new(500.0, 0.0)), None);
    }

    #[test]
    fn test_empty_block_is_invalid() {
        assert!(is_valid(&make(Point::new(0.0, 0.0), Vec::new())).is_err());
        assert!(is_valid(&make(Point::new(0.0, 0.0), vec![0])).is_ok());
    }
}
