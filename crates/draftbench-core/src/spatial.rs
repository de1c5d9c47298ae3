//! Bounding-box index over the committed store.

use kurbo::Rect;
use std::collections::{HashMap, HashSet};

/// Grid cell size in model units. Coarse enough that small shapes land in
/// one cell, fine enough that a region query prunes most of the store.
const CELL_SIZE: f64 = 256.0;

/// Uniform-grid spatial index mapping slot indices to bounding boxes.
///
/// The index always mirrors exactly the committed store: maintenance runs
/// on every committed change notification, and preview content is never
/// inserted. Visibility does not exclude content here; hit-testing filters
/// by visibility separately.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: HashMap<(i64, i64), Vec<usize>>,
    bounds: HashMap<usize, Rect>,
}

fn cell_of(x: f64, y: f64) -> (i64, i64) {
    ((x / CELL_SIZE).floor() as i64, (y / CELL_SIZE).floor() as i64)
}

fn cells_covering(rect: Rect) -> impl Iterator<Item = (i64, i64)> {
    let (x0, y0) = cell_of(rect.x0, rect.y0);
    let (x1, y1) = cell_of(rect.x1, rect.y1);
    (x0..=x1).flat_map(move |cx| (y0..=y1).map(move |cy| (cx, cy)))
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the entry for a slot.
    pub fn insert(&mut self, index: usize, bounding: Rect) {
        self.remove(index);
        for cell in cells_covering(bounding) {
            self.cells.entry(cell).or_default().push(index);
        }
        self.bounds.insert(index, bounding);
    }

    /// Drop the entry for a slot, if present.
    pub fn remove(&mut self, index: usize) {
        let Some(old) = self.bounds.remove(&index) else {
            return;
        };
        for cell in cells_covering(old) {
            if let Some(entries) = self.cells.get_mut(&cell) {
                entries.retain(|&i| i != index);
                if entries.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.bounds.clear();
    }

    /// The indexed bounding box of a slot.
    pub fn bounding(&self, index: usize) -> Option<Rect> {
        self.bounds.get(&index).copied()
    }

    /// Number of indexed slots.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// All slots whose bounding box intersects `region`, sorted by index.
    pub fn query(&self, region: Rect) -> Vec<usize> {
        let region = normalized(region);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for cell in cells_covering(region) {
            let Some(entries) = self.cells.get(&cell) else {
                continue;
            };
            for &index in entries {
                if !seen.insert(index) {
                    continue;
                }
                if let Some(bounding) = self.bounds.get(&index) {
                    if rects_intersect(region, *bounding) {
                        out.push(index);
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}

fn normalized(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.min(rect.x1),
        rect.y0.min(rect.y1),
        rect.x0.max(rect.x1),
        rect.y0.max(rect.y1),
    )
}

/// Closed-interval AABB intersection: touching edges count as a hit,
/// matching degenerate boxes from axis-aligned lines and points.
fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}
