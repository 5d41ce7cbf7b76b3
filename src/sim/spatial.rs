//! Uniform grid index for radius queries over stationary entities
//!
//! Entities are bucketed by the grid cell containing their centre. A query
//! visits the buckets the query circle (grown by the largest indexed radius)
//! can reach, limited to the occupied key range, then applies an exact circle
//! test. When that span holds more buckets than there are entries, a linear
//! scan is cheaper and is used instead.

use std::collections::HashMap;

use glam::Vec2;

use super::cell::EntityId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: EntityId,
    pos: Vec2,
    radius: f32,
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    buckets: HashMap<(i32, i32), Vec<usize>>,
    entries: Vec<Entry>,
    max_radius: f32,
    /// Inclusive (min, max) bucket keys in use
    occupied: Option<((i32, i32), (i32, i32))>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size.is_finite() && cell_size > 0.0 { cell_size } else { 4.0 },
            buckets: HashMap::new(),
            entries: Vec::new(),
            max_radius: 0.0,
            occupied: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
        self.max_radius = 0.0;
        self.occupied = None;
    }

    #[inline]
    fn key(&self, p: Vec2) -> Option<(i32, i32)> {
        if !p.is_finite() {
            return None;
        }
        let limit = i32::MAX as f32 * self.cell_size;
        if p.x.abs() >= limit || p.y.abs() >= limit {
            return None;
        }
        Some((
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        ))
    }

    /// Index an entity. Non-finite positions are skipped.
    pub fn insert(&mut self, id: EntityId, pos: Vec2, radius: f32) {
        let Some(key) = self.key(pos) else {
            return;
        };
        let radius = radius.max(0.0);
        self.max_radius = self.max_radius.max(radius);
        self.occupied = Some(match self.occupied {
            Some((lo, hi)) => ((lo.0.min(key.0), lo.1.min(key.1)), (hi.0.max(key.0), hi.1.max(key.1))),
            None => (key, key),
        });
        self.buckets.entry(key).or_default().push(self.entries.len());
        self.entries.push(Entry { id, pos, radius });
    }

    /// Rebuild from scratch
    pub fn rebuild(&mut self, items: impl IntoIterator<Item = (EntityId, Vec2, f32)>) {
        self.clear();
        for (id, pos, radius) in items {
            self.insert(id, pos, radius);
        }
    }

    /// Ids of indexed circles overlapping the query circle, in insertion order
    pub fn query_nearby(&self, pos: Vec2, radius: f32) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.query_into(pos, radius, &mut out);
        out
    }

    pub fn query_into(&self, pos: Vec2, radius: f32, out: &mut Vec<EntityId>) {
        out.clear();
        if self.entries.is_empty() || !pos.is_finite() || !radius.is_finite() {
            return;
        }
        let radius = radius.max(0.0);
        let hit = |e: &Entry| {
            let r = radius + e.radius;
            e.pos.distance_squared(pos) <= r * r
        };
        let Some((used_lo, used_hi)) = self.occupied else {
            return;
        };

        // Keys outside i32 range fall back to the occupied range
        let reach = radius + self.max_radius;
        let lo = self.key(pos - Vec2::splat(reach)).unwrap_or(used_lo);
        let hi = self.key(pos + Vec2::splat(reach)).unwrap_or(used_hi);
        let (x0, y0) = (lo.0.max(used_lo.0), lo.1.max(used_lo.1));
        let (x1, y1) = (hi.0.min(used_hi.0), hi.1.min(used_hi.1));
        if x0 > x1 || y0 > y1 {
            return;
        }

        let span = (i64::from(x1) - i64::from(x0) + 1) * (i64::from(y1) - i64::from(y0) + 1);
        if span > self.entries.len() as i64 {
            out.extend(self.entries.iter().filter(|e| hit(*e)).map(|e| e.id));
            return;
        }

        let mut hits: Vec<usize> = Vec::new();
        for gx in x0..=x1 {
            for gy in y0..=y1 {
                if let Some(bucket) = self.buckets.get(&(gx, gy)) {
                    hits.extend(bucket.iter().copied().filter(|&idx| hit(&self.entries[idx])));
                }
            }
        }
        hits.sort_unstable();
        out.extend(hits.into_iter().map(|idx| self.entries[idx].id));
    }
}
