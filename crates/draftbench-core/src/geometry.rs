//! Derived geometry and its identity-keyed cache.

use crate::content::Content;
use crate::math::bounding_of;
use crate::registry::{ModelCtx, Registry};
use kurbo::{Point, Rect, Vec2};
use std::collections::HashMap;
use std::sync::Arc;

/// Derived geometry for one content.
///
/// Never persisted; always recomputable from the content value plus the
/// full store (cross-referencing types resolve other slots).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometries {
    /// Feature points (vertices, centers).
    pub points: Vec<Point>,
    /// Segments used for hit-testing and intersection.
    pub lines: Vec<(Point, Point)>,
    /// Axis-aligned bounding box, when the content has any extent.
    pub bounding: Option<Rect>,
    /// Dash-expanded polylines handed to render collaborators.
    pub rendering_lines: Vec<Vec<Point>>,
    /// Closed fill regions, when the content has any.
    pub regions: Vec<Vec<Point>>,
}

impl Geometries {
    /// Geometry of a content that failed to compute: renders as nothing,
    /// hits nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build geometry from an open or closed polyline.
    pub fn from_polyline(points: Vec<Point>, closed: bool) -> Self {
        let mut lines: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
        if closed && points.len() > 2 {
            lines.push((points[points.len() - 1], points[0]));
        }
        let bounding = bounding_of(&points);
        let mut rendering = points.clone();
        if closed && points.len() > 2 {
            rendering.push(points[0]);
        }
        Self {
            points: points.clone(),
            lines,
            bounding,
            rendering_lines: vec![rendering],
            regions: if closed { vec![points] } else { Vec::new() },
        }
    }

    /// Merge another geometry into this one (containers union children).
    pub fn merge(&mut self, other: &Geometries) {
        self.points.extend_from_slice(&other.points);
        self.lines.extend_from_slice(&other.lines);
        self.rendering_lines.extend(other.rendering_lines.iter().cloned());
        self.regions.extend(other.regions.iter().cloned());
        self.bounding = match (self.bounding, other.bounding) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
    }

    /// The same geometry displaced by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        let shift = |p: &Point| Point::new(p.x + delta.x, p.y + delta.y);
        Self {
            points: self.points.iter().map(shift).collect(),
            lines: self.lines.iter().map(|(a, b)| (shift(a), shift(b))).collect(),
            bounding: self.bounding.map(|r| r + delta),
            rendering_lines: self
                .rendering_lines
                .iter()
                .map(|poly| poly.iter().map(shift).collect())
                .collect(),
            regions: self
                .regions
                .iter()
                .map(|poly| poly.iter().map(shift).collect())
                .collect(),
        }
    }
}

/// Record the identities of every content `content` resolves, directly or
/// through further references. A cached entry is valid only while all of
/// them are unchanged.
fn collect_deps(
    content: &Content,
    store: &[Option<Content>],
    registry: &Registry,
    deps: &mut Vec<(usize, usize)>,
) {
    let Some(ref_ids) = registry.model(content.type_tag()).and_then(|m| m.ref_ids) else {
        return;
    };
    for dep in ref_ids(content) {
        if deps.iter().any(|(seen, _)| *seen == dep) {
            continue;
        }
        if let Some(target) = store.get(dep).and_then(Option::as_ref) {
            deps.push((dep, target.identity()));
            collect_deps(target, store, registry, deps);
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    /// Identity of the content the entry was computed from.
    identity: usize,
    /// Identities of referenced contents at compute time. A hit requires
    /// these to be unchanged too.
    deps: Vec<(usize, usize)>,
    geometries: Arc<Geometries>,
}

/// Per-slot memoized geometry, invalidated by content value identity.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: HashMap<usize, CacheEntry>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for the content at `index`, computing on miss.
    ///
    /// A computation failure degrades to empty geometry so one malformed
    /// content cannot abort a frame or an index maintenance pass.
    pub fn geometries(
        &mut self,
        index: usize,
        store: &[Option<Content>],
        registry: &Registry,
    ) -> Arc<Geometries> {
        let Some(content) = store.get(index).and_then(Option::as_ref) else {
            self.entries.remove(&index);
            return Arc::new(Geometries::empty());
        };
        if let Some(entry) = self.entries.get(&index) {
            let deps_fresh = entry.deps.iter().all(|(dep, identity)| {
                store
                    .get(*dep)
                    .and_then(Option::as_ref)
                    .is_some_and(|c| c.identity() == *identity)
            });
            if entry.identity == content.identity() && deps_fresh {
                return Arc::clone(&entry.geometries);
            }
        }
        let ctx = ModelCtx::new(store, registry);
        let geometries = match registry.model(content.type_tag()).and_then(|m| m.geometries) {
            Some(compute) => match compute(content, &ctx) {
                Ok(g) => g,
                Err(reason) => {
                    log::warn!(
                        "geometry for slot {index} ({}) failed: {reason}",
                        content.type_tag()
                    );
                    Geometries::empty()
                }
            },
            None => Geometries::empty(),
        };
        let mut deps = Vec::new();
        collect_deps(content, store, registry, &mut deps);
        let geometries = Arc::new(geometries);
        self.entries.insert(
            index,
            CacheEntry {
                identity: content.identity(),
                deps,
                geometries: Arc::clone(&geometries),
            },
        );
        geometries
    }

    /// Drop entries whose slots no longer hold content.
    pub fn prune(&mut self, store: &[Option<Content>]) {
        self.entries
            .retain(|&index, _| store.get(index).and_then(Option::as_ref).is_some());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
