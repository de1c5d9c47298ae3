//! Point snapping against nearby indexed content.

use crate::content::Content;
use crate::geometry::GeometryCache;
use crate::math::segment_intersection;
use crate::registry::{ModelCtx, Registry};
use crate::spatial::SpatialIndex;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Kind of geometric feature a snap candidate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapKind {
    Endpoint,
    Intersection,
    Midpoint,
    Center,
}

/// One snap candidate offered by a content's `snap_points` capability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapPoint {
    pub point: Point,
    pub kind: SnapKind,
    /// Sub-feature the point belongs to, if addressable.
    pub part: Option<usize>,
    /// Curve parameter of the point on its feature, if meaningful.
    pub param: Option<f64>,
}

impl SnapPoint {
    pub fn new(point: Point, kind: SnapKind) -> Self {
        Self {
            point,
            kind,
            part: None,
            param: None,
        }
    }
}

/// What a resolved snap attached to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTargetRef {
    /// Store index of the snapped content.
    pub index: usize,
    pub part: Option<usize>,
    pub param: Option<f64>,
}

/// Result of a snap resolution: a position, plus the target feature when a
/// candidate was within tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    pub position: Point,
    pub target: Option<SnapTargetRef>,
}

impl SnapResult {
    /// A result that found nothing: the raw cursor position.
    pub fn none(position: Point) -> Self {
        Self {
            position,
            target: None,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.target.is_some()
    }
}

/// Snap behavior configuration.
#[derive(Debug, Clone)]
pub struct SnapConfig {
    pub enabled: bool,
    /// Enabled snap kinds in priority order; kinds not listed are off.
    pub priority: Vec<SnapKind>,
    /// Grid spacing for the lowest-priority grid fallback, if on.
    pub grid: Option<f64>,
    /// Operator-entered nudge, applied after ranking.
    pub offset: Option<Vec2>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: vec![
                SnapKind::Endpoint,
                SnapKind::Intersection,
                SnapKind::Midpoint,
                SnapKind::Center,
            ],
            grid: None,
            offset: None,
        }
    }
}

struct Candidate {
    point: Point,
    kind: SnapKind,
    index: usize,
    part: Option<usize>,
    param: Option<f64>,
}

/// Resolve the best snap for a cursor position.
///
/// Candidates come from the spatial index region around the cursor; they
/// are ranked by distance, then by kind priority, then by lowest store
/// index, so identical input always resolves identically. The numeric
/// offset is applied to the chosen point after ranking, never before.
pub fn resolve_snap(
    cursor: Point,
    tolerance: f64,
    store: &[Option<Content>],
    registry: &Registry,
    index: &SpatialIndex,
    cache: &mut GeometryCache,
    config: &SnapConfig,
) -> SnapResult {
    let mut result = if config.enabled {
        best_candidate(cursor, tolerance, store, registry, index, cache, config)
            .map(|c| SnapResult {
                position: c.point,
                target: Some(SnapTargetRef {
                    index: c.index,
                    part: c.part,
                    param: c.param,
                }),
            })
            .unwrap_or_else(|| grid_fallback(cursor, config))
    } else {
        SnapResult::none(cursor)
    };
    if let Some(offset) = config.offset {
        result.position += offset;
    }
    result
}

fn best_candidate(
    cursor: Point,
    tolerance: f64,
    store: &[Option<Content>],
    registry: &Registry,
    index: &SpatialIndex,
    cache: &mut GeometryCache,
    config: &SnapConfig,
) -> Option<Candidate> {
    let region = Rect::new(
        cursor.x - tolerance,
        cursor.y - tolerance,
        cursor.x + tolerance,
        cursor.y + tolerance,
    );
    let nearby = index.query(region);
    let mut candidates: Vec<Candidate> = Vec::new();

    let rank_of = |kind: SnapKind| config.priority.iter().position(|&k| k == kind);
    let ctx = ModelCtx::new(store, registry);
    for &slot in &nearby {
        let Some(content) = store.get(slot).and_then(Option::as_ref) else {
            continue;
        };
        if !content.visible() {
            continue;
        }
        let Some(snap_points) = registry
            .model(content.type_tag())
            .and_then(|m| m.snap_points)
        else {
            continue;
        };
        for sp in snap_points(content, &ctx) {
            if rank_of(sp.kind).is_some() {
                candidates.push(Candidate {
                    point: sp.point,
                    kind: sp.kind,
                    index: slot,
                    part: sp.part,
                    param: sp.param,
                });
            }
        }
    }

    if rank_of(SnapKind::Intersection).is_some() {
        collect_intersections(&nearby, store, registry, cache, &mut candidates);
    }

    candidates.retain(|c| c.point.distance(cursor) <= tolerance);
    candidates.sort_by(|a, b| {
        let da = a.point.distance(cursor);
        let db = b.point.distance(cursor);
        da.partial_cmp(&db)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| rank_of(a.kind).cmp(&rank_of(b.kind)))
            .then_with(|| a.index.cmp(&b.index))
    });
    candidates.into_iter().next()
}

/// Pairwise segment intersections between nearby contents.
fn collect_intersections(
    nearby: &[usize],
    store: &[Option<Content>],
    registry: &Registry,
    cache: &mut GeometryCache,
    candidates: &mut Vec<Candidate>,
) {
    let geometries: Vec<_> = nearby
        .iter()
        .map(|&slot| (slot, cache.geometries(slot, store, registry)))
        .collect();
    for (i, (slot_a, geom_a)) in geometries.iter().enumerate() {
        for (slot_b, geom_b) in geometries.iter().skip(i + 1) {
            for &(a0, a1) in &geom_a.lines {
                for &(b0, b1) in &geom_b.lines {
                    if let Some(point) = segment_intersection(a0, a1, b0, b1) {
                        candidates.push(Candidate {
                            point,
                            kind: SnapKind::Intersection,
                            index: (*slot_a).min(*slot_b),
                            part: None,
                            param: None,
                        });
                    }
                }
            }
        }
    }
}

/// Snap to the nearest grid intersection when no content snap matched.
fn grid_fallback(cursor: Point, config: &SnapConfig) -> SnapResult {
    match config.grid {
        Some(grid) if grid > 0.0 => SnapResult::none(Point::new(
            (cursor.x / grid).round() * grid,
            (cursor.y / grid).round() * grid,
        )),
        _ => SnapResult::none(cursor),
    }
}
