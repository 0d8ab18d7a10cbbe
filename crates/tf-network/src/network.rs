//! Road network representation and builder.
//!
//! # Data layout
//!
//! Segments and junctions live in `Vec`s indexed by their ids, so `segment()`
//! and `junction()` are O(1).  Segment-to-segment adjacency (the only thing
//! the router walks) is stored in **Compressed Sparse Row** form in both
//! directions:
//!
//! ```text
//! successors of s   = succ[ succ_start[s] .. succ_start[s+1] ]
//! predecessors of s = pred[ pred_start[s] .. pred_start[s+1] ]
//! ```
//!
//! Each CSR row is sorted by `SegmentId`, which the router relies on for its
//! lexicographic tie-break.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps planar points to the nearest `JunctionId`.
//! Used at scenario load time to snap spawn coordinates onto the network.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tf_core::{JunctionId, Point, SegmentId};

use crate::geometry::{
    chords_intersect, crossing_overlap, movement_chord, ConflictKind, ConflictZone, Movement,
};
use crate::{NetworkError, NetworkResult};

/// Default distance from a junction centre to its stop lines.
pub const DEFAULT_JUNCTION_RADIUS_M: f32 = 8.0;
/// Default lane width.
pub const DEFAULT_LANE_WIDTH_M: f32 = 3.5;

// ── R-tree junction entry ─────────────────────────────────────────────────────

#[derive(Clone)]
struct JunctionEntry {
    point: [f32; 2],
    id:    JunctionId,
}

impl RTreeObject for JunctionEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for JunctionEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── RoadSegment ───────────────────────────────────────────────────────────────

/// A directed stretch of road between two junctions.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSegment {
    pub id:              SegmentId,
    pub from:            JunctionId,
    pub to:              JunctionId,
    pub length_m:        f32,
    pub lanes:           u8,
    pub speed_limit_mps: f32,
}

impl RoadSegment {
    /// Free-flow traversal time in milliseconds, never below 1 so that every
    /// path cost is strictly positive.
    pub fn free_flow_ms(&self) -> u32 {
        let secs = self.length_m / self.speed_limit_mps.max(0.1);
        ((secs * 1000.0).ceil() as u32).max(1)
    }

    /// Number of vehicles the segment holds at `spacing_m` headway.
    pub fn capacity(&self, spacing_m: f32) -> f32 {
        (self.lanes.max(1) as f32 * self.length_m / spacing_m.max(0.1)).max(1.0)
    }
}

// ── Junction ──────────────────────────────────────────────────────────────────

/// A point where segments meet, with its precomputed conflict table.
#[derive(Clone, Debug)]
pub struct Junction {
    pub id:        JunctionId,
    pub pos:       Point,
    /// Incoming segments (approaches), ascending.
    pub incoming:  Vec<SegmentId>,
    /// Outgoing segments, ascending.
    pub outgoing:  Vec<SegmentId>,
    /// Every legal movement, ascending.
    pub movements: Vec<Movement>,
    /// Conflicting movement pairs, sorted by `(a, b)` for binary search.
    pub zones:     Vec<ConflictZone>,
}

impl Junction {
    /// `true` if `a` and `b` may not occupy the junction at the same time.
    ///
    /// A movement always conflicts with itself: two vehicles on the same path
    /// are serialized.
    pub fn conflicts(&self, a: Movement, b: Movement) -> bool {
        if a == b {
            return true;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.zones.binary_search_by(|z| z.key().cmp(&key)).is_ok()
    }

    /// The zone record for a conflicting pair, if any.
    pub fn zone(&self, a: Movement, b: Movement) -> Option<&ConflictZone> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.zones
            .binary_search_by(|z| z.key().cmp(&key))
            .ok()
            .map(|i| &self.zones[i])
    }

    /// `true` if this junction has a movement `from → to`.
    pub fn has_movement(&self, m: Movement) -> bool {
        self.movements.binary_search(&m).is_ok()
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed segment graph plus per-junction conflict tables.
///
/// Do not construct directly; use [`RoadNetworkBuilder`].
pub struct RoadNetwork {
    segments:  Vec<RoadSegment>,
    junctions: Vec<Junction>,

    // ── CSR segment adjacency ─────────────────────────────────────────────
    succ_start: Vec<u32>,
    succ:       Vec<SegmentId>,
    pred_start: Vec<u32>,
    pred:       Vec<SegmentId>,

    // ── Runtime state ─────────────────────────────────────────────────────
    closed:   Vec<bool>,
    revision: u64,

    lane_width_m:      f32,
    junction_radius_m: f32,
    spatial_idx:       RTree<JunctionEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no junctions or segments.
    pub fn empty() -> Self {
        Self {
            segments:          Vec::new(),
            junctions:         Vec::new(),
            succ_start:        vec![0],
            succ:              Vec::new(),
            pred_start:        vec![0],
            pred:              Vec::new(),
            closed:            Vec::new(),
            revision:          0,
            lane_width_m:      DEFAULT_LANE_WIDTH_M,
            junction_radius_m: DEFAULT_JUNCTION_RADIUS_M,
            spatial_idx:       RTree::new(),
        }
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    #[inline]
    pub fn lane_width_m(&self) -> f32 {
        self.lane_width_m
    }

    #[inline]
    pub fn junction_radius_m(&self) -> f32 {
        self.junction_radius_m
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// Segment record, or `SegmentNotFound`.
    #[inline]
    pub fn segment(&self, id: SegmentId) -> NetworkResult<&RoadSegment> {
        self.segments.get(id.index()).ok_or(NetworkError::SegmentNotFound(id))
    }

    /// Junction record, or `JunctionNotFound`.
    #[inline]
    pub fn junction(&self, id: JunctionId) -> NetworkResult<&Junction> {
        self.junctions.get(id.index()).ok_or(NetworkError::JunctionNotFound(id))
    }

    /// Segments reachable from `id` by traversing its end junction.
    ///
    /// Topological only: closed segments are included.
    pub fn neighbors(&self, id: SegmentId) -> NetworkResult<&[SegmentId]> {
        self.segment(id)?;
        Ok(self.successors(id))
    }

    /// Segments from which `id` is reachable in one junction traversal.
    pub fn predecessors_of(&self, id: SegmentId) -> NetworkResult<&[SegmentId]> {
        self.segment(id)?;
        Ok(self.predecessors(id))
    }

    /// Conflict table of junction `id`.
    pub fn conflict_zones(&self, id: JunctionId) -> NetworkResult<&[ConflictZone]> {
        Ok(&self.junction(id)?.zones)
    }

    /// The junction a vehicle on `seg` arrives at.
    #[inline]
    pub fn end_junction(&self, seg: SegmentId) -> NetworkResult<JunctionId> {
        Ok(self.segment(seg)?.to)
    }

    /// `true` if movements `a` and `b` through junction `j` conflict.
    pub fn movements_conflict(&self, j: JunctionId, a: Movement, b: Movement) -> NetworkResult<bool> {
        Ok(self.junction(j)?.conflicts(a, b))
    }

    // Unchecked CSR rows; callers have validated `id`.
    #[inline]
    pub(crate) fn successors(&self, id: SegmentId) -> &[SegmentId] {
        let start = self.succ_start[id.index()] as usize;
        let end = self.succ_start[id.index() + 1] as usize;
        &self.succ[start..end]
    }

    #[inline]
    pub(crate) fn predecessors(&self, id: SegmentId) -> &[SegmentId] {
        let start = self.pred_start[id.index()] as usize;
        let end = self.pred_start[id.index() + 1] as usize;
        &self.pred[start..end]
    }

    // ── Open / closed ─────────────────────────────────────────────────────

    /// `false` for closed or unknown segments.
    #[inline]
    pub fn is_open(&self, id: SegmentId) -> bool {
        self.closed.get(id.index()).is_some_and(|c| !c)
    }

    /// Counter bumped on every open/closed change.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Close `id` to new traffic.  Returns `false` if it was already closed.
    ///
    /// Vehicles already on the segment may still leave it; routers will not
    /// route through it.
    pub fn close_segment(&mut self, id: SegmentId) -> NetworkResult<bool> {
        self.segment(id)?;
        let was_open = !self.closed[id.index()];
        if was_open {
            self.closed[id.index()] = true;
            self.revision += 1;
            tracing::info!(segment = id.0, revision = self.revision, "segment closed");
        }
        Ok(was_open)
    }

    /// Reopen `id`.  Returns `false` if it was already open.
    pub fn reopen_segment(&mut self, id: SegmentId) -> NetworkResult<bool> {
        self.segment(id)?;
        let was_closed = self.closed[id.index()];
        if was_closed {
            self.closed[id.index()] = false;
            self.revision += 1;
            tracing::info!(segment = id.0, revision = self.revision, "segment reopened");
        }
        Ok(was_closed)
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    /// Planar position of a vehicle at `offset_m` along `seg` in `lane`
    /// (lane 0 is the rightmost).
    pub fn position(&self, seg: SegmentId, offset_m: f32, lane: u8) -> NetworkResult<Point> {
        let s = self.segment(seg)?;
        let a = self.junctions[s.from.index()].pos;
        let b = self.junctions[s.to.index()].pos;
        let t = if s.length_m > 0.0 { (offset_m / s.length_m).clamp(0.0, 1.0) } else { 0.0 };
        let lateral = (lane as f32 + 0.5) * self.lane_width_m;
        Ok(a.lerp(b, t).offset(a.direction_to(b).right_normal(), lateral))
    }

    /// Nearest junction to `pos`; `None` only for an empty network.
    pub fn nearest_junction(&self, pos: Point) -> Option<JunctionId> {
        self.spatial_idx.nearest_neighbor(&[pos.x, pos.y]).map(|e| e.id)
    }

    /// The segment `from → to`, if one exists.
    pub fn segment_between(&self, from: JunctionId, to: JunctionId) -> Option<SegmentId> {
        let j = self.junctions.get(from.index())?;
        j.outgoing
            .iter()
            .copied()
            .find(|&s| self.segments[s.index()].to == to)
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// Segment ids are assigned in insertion order, so scenario files can refer
/// to them by position.  `build()` derives successor/predecessor CSR rows,
/// every junction's movement list and its geometric conflict table.
///
/// # Example
///
/// ```
/// use tf_core::Point;
/// use tf_network::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_junction(Point::new(0.0, 0.0));
/// let c = b.add_junction(Point::new(200.0, 0.0));
/// let (ac, ca) = b.add_road(a, c, 1, 13.9);
/// let net = b.build().unwrap();
/// assert_eq!(net.segment_count(), 2);
/// assert_eq!(net.segment(ac).unwrap().length_m, 200.0);
/// assert_eq!(net.segment(ca).unwrap().from, c);
/// ```
pub struct RoadNetworkBuilder {
    junctions:         Vec<Point>,
    raw_segments:      Vec<RawSegment>,
    declared:          Vec<(Movement, Movement)>,
    junction_radius_m: f32,
    lane_width_m:      f32,
    allow_u_turns:     bool,
}

struct RawSegment {
    from:            JunctionId,
    to:              JunctionId,
    length_m:        Option<f32>,
    lanes:           u8,
    speed_limit_mps: f32,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self {
            junctions:         Vec::new(),
            raw_segments:      Vec::new(),
            declared:          Vec::new(),
            junction_radius_m: DEFAULT_JUNCTION_RADIUS_M,
            lane_width_m:      DEFAULT_LANE_WIDTH_M,
            allow_u_turns:     false,
        }
    }

    /// Distance from junction centre to stop line used for conflict geometry.
    pub fn junction_radius(mut self, radius_m: f32) -> Self {
        self.junction_radius_m = radius_m;
        self
    }

    pub fn lane_width(mut self, width_m: f32) -> Self {
        self.lane_width_m = width_m;
        self
    }

    /// Permit U-turns everywhere.  Without this, a U-turn is only offered
    /// when it is the sole way out of a junction (dead ends).
    pub fn allow_u_turns(mut self, allow: bool) -> Self {
        self.allow_u_turns = allow;
        self
    }

    /// Add a junction and return its `JunctionId` (sequential from 0).
    pub fn add_junction(&mut self, pos: Point) -> JunctionId {
        let id = JunctionId(self.junctions.len() as u32);
        self.junctions.push(pos);
        id
    }

    /// Add a **directed** segment whose length is the straight-line distance
    /// between its junctions.
    pub fn add_segment(&mut self, from: JunctionId, to: JunctionId, lanes: u8, speed_limit_mps: f32) -> SegmentId {
        self.push_segment(from, to, None, lanes, speed_limit_mps)
    }

    /// Add a directed segment with an explicit length (curved roads).
    pub fn add_segment_with_length(
        &mut self,
        from:            JunctionId,
        to:              JunctionId,
        length_m:        f32,
        lanes:           u8,
        speed_limit_mps: f32,
    ) -> SegmentId {
        self.push_segment(from, to, Some(length_m), lanes, speed_limit_mps)
    }

    /// Convenience: add one directed segment each way.
    pub fn add_road(&mut self, a: JunctionId, b: JunctionId, lanes: u8, speed_limit_mps: f32) -> (SegmentId, SegmentId) {
        let ab = self.add_segment(a, b, lanes, speed_limit_mps);
        let ba = self.add_segment(b, a, lanes, speed_limit_mps);
        (ab, ba)
    }

    /// Declare an extra conflict the chord geometry would miss (e.g. a
    /// shared pedestrian crossing).  Both movements must meet at the same
    /// junction; `build()` rejects them otherwise.
    pub fn add_conflict(&mut self, a: Movement, b: Movement) {
        self.declared.push((a, b));
    }

    pub fn junction_count(&self) -> usize { self.junctions.len() }
    pub fn segment_count(&self) -> usize { self.raw_segments.len() }

    fn push_segment(
        &mut self,
        from:            JunctionId,
        to:              JunctionId,
        length_m:        Option<f32>,
        lanes:           u8,
        speed_limit_mps: f32,
    ) -> SegmentId {
        let id = SegmentId(self.raw_segments.len() as u32);
        self.raw_segments.push(RawSegment { from, to, length_m, lanes, speed_limit_mps });
        id
    }

    /// Validate and freeze the network.
    ///
    /// Fails with `JunctionNotFound` for dangling junction ids and
    /// `InvalidTopology` for degenerate segments or misplaced declared
    /// conflicts.
    pub fn build(self) -> NetworkResult<RoadNetwork> {
        let nj = self.junctions.len();
        let ns = self.raw_segments.len();

        // ── Segments ──────────────────────────────────────────────────────
        let mut segments = Vec::with_capacity(ns);
        for (i, raw) in self.raw_segments.iter().enumerate() {
            let from = *self.junctions.get(raw.from.index()).ok_or(NetworkError::JunctionNotFound(raw.from))?;
            let to = *self.junctions.get(raw.to.index()).ok_or(NetworkError::JunctionNotFound(raw.to))?;
            if raw.from == raw.to {
                return Err(NetworkError::InvalidTopology(format!("segment {i} is a self-loop")));
            }
            let length_m = raw.length_m.unwrap_or_else(|| from.distance_m(to));
            if !(length_m > 0.0) || raw.lanes == 0 || !(raw.speed_limit_mps > 0.0) {
                return Err(NetworkError::InvalidTopology(format!(
                    "segment {i} needs positive length, lanes and speed limit"
                )));
            }
            segments.push(RoadSegment {
                id: SegmentId(i as u32),
                from: raw.from,
                to: raw.to,
                length_m,
                lanes: raw.lanes,
                speed_limit_mps: raw.speed_limit_mps,
            });
        }

        // ── Junction in/out lists ─────────────────────────────────────────
        let mut incoming: Vec<Vec<SegmentId>> = vec![Vec::new(); nj];
        let mut outgoing: Vec<Vec<SegmentId>> = vec![Vec::new(); nj];
        for s in &segments {
            outgoing[s.from.index()].push(s.id);
            incoming[s.to.index()].push(s.id);
        }

        // ── Successor rows (sorted because `outgoing` is) ─────────────────
        let mut succ_rows: Vec<Vec<SegmentId>> = Vec::with_capacity(ns);
        for s in &segments {
            let outs = &outgoing[s.to.index()];
            let mut row: Vec<SegmentId> = outs
                .iter()
                .copied()
                .filter(|&o| self.allow_u_turns || segments[o.index()].to != s.from)
                .collect();
            if row.is_empty() {
                // Dead end: the U-turn is the only way out.
                row.extend_from_slice(outs);
            }
            succ_rows.push(row);
        }

        let mut pred_rows: Vec<Vec<SegmentId>> = vec![Vec::new(); ns];
        for (i, row) in succ_rows.iter().enumerate() {
            for &n in row {
                pred_rows[n.index()].push(SegmentId(i as u32));
            }
        }

        let (succ_start, succ) = flatten_csr(&succ_rows);
        let (pred_start, pred) = flatten_csr(&pred_rows);

        // ── Movements and conflict tables ─────────────────────────────────
        let mut junctions = Vec::with_capacity(nj);
        for j in 0..nj {
            let jid = JunctionId(j as u32);
            let center = self.junctions[j];
            let mut movements: Vec<Movement> = incoming[j]
                .iter()
                .flat_map(|&inc| succ_rows[inc.index()].iter().map(move |&out| Movement::new(inc, out)))
                .collect();
            movements.sort_unstable();

            let chords: Vec<(Point, Point)> = movements
                .iter()
                .map(|m| {
                    let origin = self.junctions[segments[m.from.index()].from.index()];
                    let dest = self.junctions[segments[m.to.index()].to.index()];
                    movement_chord(center, origin, dest, self.junction_radius_m, self.lane_width_m)
                })
                .collect();

            let mut zones = Vec::new();
            for a in 0..movements.len() {
                for b in (a + 1)..movements.len() {
                    let (ma, mb) = (movements[a], movements[b]);
                    if ma.from == mb.from && ma.to != mb.to {
                        continue; // diverging: serialized by lane order
                    }
                    if ma.to == mb.to {
                        zones.push(ConflictZone::new(ma, mb, ConflictKind::Merge, self.junction_radius_m));
                        continue;
                    }
                    let (p1, p2) = chords[a];
                    let (q1, q2) = chords[b];
                    if chords_intersect(p1, p2, q1, q2) {
                        let overlap = crossing_overlap(p1, p2, q1, q2, self.lane_width_m, self.junction_radius_m);
                        zones.push(ConflictZone::new(ma, mb, ConflictKind::Crossing, overlap));
                    }
                }
            }

            junctions.push(Junction {
                id: jid,
                pos: center,
                incoming: incoming[j].clone(),
                outgoing: outgoing[j].clone(),
                movements,
                zones,
            });
        }

        for &(a, b) in &self.declared {
            let ja = segments.get(a.from.index()).map(|s| s.to).ok_or(NetworkError::SegmentNotFound(a.from))?;
            let jb = segments.get(b.from.index()).map(|s| s.to).ok_or(NetworkError::SegmentNotFound(b.from))?;
            let junction = &mut junctions[ja.index()];
            if ja != jb || !junction.has_movement(a) || !junction.has_movement(b) {
                return Err(NetworkError::InvalidTopology(format!(
                    "declared conflict {a} / {b} does not name two movements of one junction"
                )));
            }
            if !junction.conflicts(a, b) {
                junction.zones.push(ConflictZone::new(a, b, ConflictKind::Declared, self.junction_radius_m));
            }
        }
        for j in &mut junctions {
            j.zones.sort_by(|x, y| x.key().cmp(&y.key()));
        }

        let entries: Vec<JunctionEntry> = junctions
            .iter()
            .map(|j| JunctionEntry { point: [j.pos.x, j.pos.y], id: j.id })
            .collect();

        Ok(RoadNetwork {
            segments,
            junctions,
            succ_start,
            succ,
            pred_start,
            pred,
            closed: vec![false; ns],
            revision: 0,
            lane_width_m: self.lane_width_m,
            junction_radius_m: self.junction_radius_m,
            spatial_idx: RTree::bulk_load(entries),
        })
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten per-row vectors into a CSR `(row_start, values)` pair.
fn flatten_csr(rows: &[Vec<SegmentId>]) -> (Vec<u32>, Vec<SegmentId>) {
    let mut start = Vec::with_capacity(rows.len() + 1);
    let mut values = Vec::with_capacity(rows.iter().map(Vec::len).sum());
    start.push(0u32);
    for row in rows {
        let mut sorted = row.clone();
        sorted.sort_unstable();
        values.extend(sorted);
        start.push(values.len() as u32);
    }
    (start, values)
}
