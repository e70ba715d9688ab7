//! Deduplicated vertex storage with adjacency and staged displacements.
//!
//! Vertices are stored in an arena and addressed by [`VertexId`]. Interning
//! goes through a hash grid whose cell size equals the merge tolerance, so a
//! lookup only has to search the 27 cells around a coordinate.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Rotation3, Vector3};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{TopologyError, TopologyResult};

/// Default per-axis distance under which two coordinates are the same vertex.
pub const DEFAULT_VERTEX_TOLERANCE: f64 = 0.001;

/// Z distance under which two adjacent vertices count as co-planar for the
/// pole test.
pub const POLE_EPSILON: f64 = 0.01;

/// Stable index of a vertex inside a [`VertexTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexId(pub(crate) u32);

impl VertexId {
    /// Position of this vertex in the table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A unique vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    position: Point3<f64>,
    is_pole: bool,
    pending: Vec<Vector3<f64>>,
}

impl Vertex {
    fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            is_pole: true,
            pending: Vec::new(),
        }
    }

    /// Current position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// True if no adjacent vertex is lower than, or level with, this one.
    #[inline]
    #[must_use]
    pub const fn is_pole(&self) -> bool {
        self.is_pole
    }

    /// Displacements proposed for this vertex in the current round.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[Vector3<f64>] {
        &self.pending
    }
}

type CellKey = (i64, i64, i64);

/// Arena of unique vertices.
///
/// # Example
///
/// ```
/// use mesh_topology::{Point3, VertexTable};
///
/// let mut table = VertexTable::new();
/// let a = table.intern(Point3::new(1.0, 2.0, 3.0)).unwrap();
/// let b = table.intern(Point3::new(1.0004, 2.0, 3.0)).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct VertexTable {
    vertices: Vec<Vertex>,
    adjacency: Vec<HashSet<VertexId>>,
    grid: HashMap<CellKey, SmallVec<[VertexId; 2]>>,
    grid_stale: bool,
    tolerance: f64,
}

impl Default for VertexTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexTable {
    /// Create an empty table with [`DEFAULT_VERTEX_TOLERANCE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_VERTEX_TOLERANCE)
    }

    /// Create an empty table with a custom merge tolerance.
    ///
    /// Non-positive tolerances are raised to the smallest positive `f64`,
    /// which makes interning effectively exact.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        let tolerance = if tolerance > 0.0 {
            tolerance
        } else {
            f64::MIN_POSITIVE
        };
        Self {
            vertices: Vec::new(),
            adjacency: Vec::new(),
            grid: HashMap::new(),
            grid_stale: false,
            tolerance,
        }
    }

    /// Merge tolerance used by [`intern`](Self::intern).
    #[inline]
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of unique vertices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the table holds no vertices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Look up a vertex.
    #[must_use]
    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    /// Position of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    #[inline]
    #[must_use]
    pub fn position(&self, id: VertexId) -> Point3<f64> {
        self.vertices[id.index()].position
    }

    /// Whether a vertex is currently a pole.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    #[inline]
    #[must_use]
    pub fn is_pole(&self, id: VertexId) -> bool {
        self.vertices[id.index()].is_pole
    }

    /// Iterate over all vertices with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (id_from_index(i), v))
    }

    /// Vertices sharing a face with `id`, in no particular order.
    pub fn neighbors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.adjacency
            .get(id.index())
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Return the id of the vertex within tolerance of `coord`, creating it if
    /// none exists.
    ///
    /// Equality is per-axis `|a - b| <= tolerance` and is not transitive; when
    /// several stored vertices match, the one inserted first wins.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MalformedGeometry`] if any coordinate is NaN
    /// or infinite.
    pub fn intern(&mut self, coord: Point3<f64>) -> TopologyResult<VertexId> {
        if !coord.iter().all(|c| c.is_finite()) {
            return Err(TopologyError::malformed(format!(
                "non-finite vertex coordinate ({}, {}, {})",
                coord.x, coord.y, coord.z
            )));
        }

        if self.grid_stale {
            self.rebuild_grid();
        }

        if let Some(existing) = self.find(&coord) {
            return Ok(existing);
        }

        let id = VertexId(
            u32::try_from(self.vertices.len())
                .map_err(|_| TopologyError::CapacityExceeded { kind: "vertices" })?,
        );
        self.vertices.push(Vertex::new(coord));
        self.adjacency.push(HashSet::new());
        self.grid.entry(self.cell_of(&coord)).or_default().push(id);
        Ok(id)
    }

    /// Find the first-inserted vertex within tolerance of `coord`.
    #[must_use]
    pub fn find(&self, coord: &Point3<f64>) -> Option<VertexId> {
        if self.grid_stale {
            // Positions moved since the grid was built; fall back to a scan.
            return self
                .iter()
                .find(|(_, v)| self.matches(&v.position, coord))
                .map(|(id, _)| id);
        }

        let (cx, cy, cz) = self.cell_of(coord);
        let mut best: Option<VertexId> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    let Some(bucket) = self.grid.get(&key) else {
                        continue;
                    };
                    for &id in bucket {
                        if best.is_some_and(|b| b <= id) {
                            continue;
                        }
                        if self.matches(&self.vertices[id.index()].position, coord) {
                            best = Some(id);
                        }
                    }
                }
            }
        }
        best
    }

    /// Record that `a` and `b` share a face and update both pole flags.
    ///
    /// `a` stops being a pole if `b` is strictly lower, otherwise `b` stops
    /// being one. Both stop if their Z values are within [`POLE_EPSILON`].
    pub fn set_adjacency(&mut self, a: VertexId, b: VertexId) {
        if a == b {
            return;
        }
        self.adjacency[a.index()].insert(b);
        self.adjacency[b.index()].insert(a);

        let za = self.vertices[a.index()].position.z;
        let zb = self.vertices[b.index()].position.z;
        if zb < za {
            self.vertices[a.index()].is_pole = false;
        } else {
            self.vertices[b.index()].is_pole = false;
        }
        if (zb - za).abs() < POLE_EPSILON {
            self.vertices[a.index()].is_pole = false;
            self.vertices[b.index()].is_pole = false;
        }
    }

    /// Recompute every pole flag from the adjacency sets and current Z.
    ///
    /// Returns the number of poles.
    pub fn refresh_poles(&mut self) -> usize {
        let mut poles = 0;
        for i in 0..self.vertices.len() {
            let z = self.vertices[i].position.z;
            let is_pole = self.adjacency[i].iter().all(|n| {
                let nz = self.vertices[n.index()].position.z;
                nz >= z && (nz - z).abs() >= POLE_EPSILON
            });
            self.vertices[i].is_pole = is_pole;
            if is_pole {
                poles += 1;
            }
        }
        poles
    }

    /// Propose a displacement for a vertex. Nothing moves until
    /// [`commit_displacements`](Self::commit_displacements).
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    pub fn stage_displacement(&mut self, id: VertexId, vector: Vector3<f64>) {
        self.vertices[id.index()].pending.push(vector);
    }

    /// True if the vertex already has a proposal this round.
    #[must_use]
    pub fn has_pending(&self, id: VertexId) -> bool {
        self.vertices
            .get(id.index())
            .is_some_and(|v| !v.pending.is_empty())
    }

    /// Number of vertices with at least one staged proposal.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.vertices.iter().filter(|v| !v.pending.is_empty()).count()
    }

    /// Move every vertex by the mean of its staged proposals and clear them.
    ///
    /// Returns the applied vector per moved vertex, in id order.
    pub fn commit_displacements(&mut self) -> Vec<(VertexId, Vector3<f64>)> {
        let mut applied = Vec::new();
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            if vertex.pending.is_empty() {
                continue;
            }
            let sum: Vector3<f64> = vertex.pending.iter().sum();
            #[allow(clippy::cast_precision_loss)]
            // Proposal counts per vertex are tiny
            let mean = sum / vertex.pending.len() as f64;
            vertex.position += mean;
            vertex.pending.clear();
            applied.push((id_from_index(i), mean));
        }
        if !applied.is_empty() {
            self.grid_stale = true;
            debug!(moved = applied.len(), "Committed staged displacements");
        }
        applied
    }

    /// Overwrite a single vertex position.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    pub fn set_position(&mut self, id: VertexId, position: Point3<f64>) {
        self.vertices[id.index()].position = position;
        self.grid_stale = true;
    }

    /// Rotate every vertex about the origin.
    pub fn transform(&mut self, rotation: &Rotation3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position = rotation * vertex.position;
        }
        self.grid_stale = true;
    }

    /// Copy of all positions, in id order.
    #[must_use]
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Restore positions from a [`positions`](Self::positions) snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::SnapshotMismatch`] if the snapshot length
    /// differs from the table length.
    pub fn restore_positions(&mut self, snapshot: &[Point3<f64>]) -> TopologyResult<()> {
        if snapshot.len() != self.vertices.len() {
            return Err(TopologyError::SnapshotMismatch {
                expected: self.vertices.len(),
                got: snapshot.len(),
            });
        }
        for (vertex, position) in self.vertices.iter_mut().zip(snapshot) {
            vertex.position = *position;
        }
        self.grid_stale = true;
        Ok(())
    }

    /// Lowest Z over all vertices, or `None` for an empty table.
    #[must_use]
    pub fn min_z(&self) -> Option<f64> {
        self.vertices
            .iter()
            .map(|v| v.position.z)
            .reduce(f64::min)
    }

    fn matches(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        (a.x - b.x).abs() <= self.tolerance
            && (a.y - b.y).abs() <= self.tolerance
            && (a.z - b.z).abs() <= self.tolerance
    }

    #[allow(clippy::cast_possible_truncation)]
    // Saturating float-to-int cast; far-out coordinates share edge cells
    fn cell_of(&self, coord: &Point3<f64>) -> CellKey {
        (
            (coord.x / self.tolerance).floor() as i64,
            (coord.y / self.tolerance).floor() as i64,
            (coord.z / self.tolerance).floor() as i64,
        )
    }

    fn rebuild_grid(&mut self) {
        let mut grid: HashMap<CellKey, SmallVec<[VertexId; 2]>> =
            HashMap::with_capacity(self.vertices.len());
        for (i, vertex) in self.vertices.iter().enumerate() {
            grid.entry(self.cell_of(&vertex.position))
                .or_default()
                .push(id_from_index(i));
        }
        self.grid = grid;
        self.grid_stale = false;
    }
}

#[allow(clippy::cast_possible_truncation)]
// Indices come from vectors whose length was checked against u32 on insert
const fn id_from_index(index: usize) -> VertexId {
    VertexId(index as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn intern_merges_within_tolerance() {
        let mut table = VertexTable::new();
        let a = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = table.intern(Point3::new(0.0009, -0.0009, 0.001)).unwrap();
        let c = table.intern(Point3::new(0.0011, 0.0, 0.0)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn intern_across_cell_boundary() {
        let mut table = VertexTable::new();
        // 0.0099.. and 0.0101 land in different grid cells
        let a = table.intern(Point3::new(0.009_95, 0.0, 0.0)).unwrap();
        let b = table.intern(Point3::new(0.010_05, 0.0, 0.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn intern_first_inserted_wins() {
        let mut table = VertexTable::new();
        let a = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = table.intern(Point3::new(0.0018, 0.0, 0.0)).unwrap();
        assert_ne!(a, b);

        // Within tolerance of both; the older vertex is returned
        let c = table.intern(Point3::new(0.0009, 0.0, 0.0)).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn intern_rejects_non_finite() {
        let mut table = VertexTable::new();
        assert!(matches!(
            table.intern(Point3::new(f64::NAN, 0.0, 0.0)),
            Err(TopologyError::MalformedGeometry { .. })
        ));
        assert!(table.intern(Point3::new(0.0, f64::INFINITY, 0.0)).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn intern_after_moving_vertices() {
        let mut table = VertexTable::new();
        let a = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        table.set_position(a, Point3::new(5.0, 5.0, 5.0));

        assert_eq!(table.intern(Point3::new(5.0, 5.0, 5.0)).unwrap(), a);
        let b = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn adjacency_pole_rules() {
        let mut table = VertexTable::new();
        let low = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let high = table.intern(Point3::new(1.0, 0.0, 1.0)).unwrap();
        let level = table.intern(Point3::new(0.0, 1.0, 0.005)).unwrap();

        table.set_adjacency(low, high);
        assert!(table.is_pole(low));
        assert!(!table.is_pole(high));

        // Co-planar neighbour removes pole status from both
        table.set_adjacency(low, level);
        assert!(!table.is_pole(low));
        assert!(!table.is_pole(level));

        assert_eq!(table.neighbors(low).count(), 2);
    }

    #[test]
    fn refresh_poles_tracks_moves() {
        let mut table = VertexTable::new();
        let a = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = table.intern(Point3::new(1.0, 0.0, 1.0)).unwrap();
        let c = table.intern(Point3::new(0.0, 1.0, 1.0)).unwrap();
        table.set_adjacency(a, b);
        table.set_adjacency(a, c);
        table.set_adjacency(b, c);
        assert!(table.is_pole(a));

        table.set_position(a, Point3::new(0.0, 0.0, 2.0));
        let poles = table.refresh_poles();
        assert!(!table.is_pole(a));
        assert_eq!(poles, 0);
    }

    #[test]
    fn commit_applies_mean() {
        let mut table = VertexTable::new();
        let a = table.intern(Point3::new(0.0, 0.0, 0.0)).unwrap();
        let b = table.intern(Point3::new(1.0, 0.0, 0.0)).unwrap();

        table.stage_displacement(a, Vector3::new(1.0, 0.0, 0.0));
        table.stage_displacement(a, Vector3::new(0.0, 1.0, 0.0));
        table.stage_displacement(a, Vector3::new(2.0, 2.0, 3.0));
        assert!(table.has_pending(a));
        assert!(!table.has_pending(b));
        assert_eq!(table.pending_count(), 1);

        let applied = table.commit_displacements();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, a);

        let p = table.position(a);
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 1.0);
        assert_relative_eq!(p.z, 1.0);
        assert!(!table.has_pending(a));
        assert_relative_eq!(table.position(b).x, 1.0);
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut table = VertexTable::new();
        table.intern(Point3::new(1.0, 2.0, 3.0)).unwrap();
        let snapshot = table.positions();

        table.transform(&Rotation3::from_axis_angle(
            &Vector3::x_axis(),
            std::f64::consts::FRAC_PI_2,
        ));
        assert_relative_eq!(table.min_z().unwrap(), 2.0, epsilon = 1e-12);

        table.restore_positions(&snapshot).unwrap();
        assert_relative_eq!(table.min_z().unwrap(), 3.0);
        assert!(table.restore_positions(&[]).is_err());
    }

    #[test]
    fn zero_tolerance_is_exact() {
        let mut table = VertexTable::with_tolerance(0.0);
        let a = table.intern(Point3::new(1.0, 1.0, 1.0)).unwrap();
        let b = table.intern(Point3::new(1.0, 1.0, 1.0 + 1e-9)).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.intern(Point3::new(1.0, 1.0, 1.0)).unwrap(), a);
    }
}
