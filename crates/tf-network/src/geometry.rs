//! Junction movement geometry.
//!
//! A **movement** is a path through a junction from an incoming segment to an
//! outgoing one.  Each movement is approximated by a straight chord from the
//! stop line of the incoming lane to the entry of the outgoing lane, both
//! pushed half a lane to the right of travel (right-hand traffic):
//!
//! ```text
//!            │ ↓ │   │
//!            │ ↓ │   │       N→S chord:  x = -w/2
//!   ─────────┼─┼─┼───┼────   E→W chord:  y = +w/2
//!    ← ← ← ← ← ┼ ← ← ← ←     they cross at (-w/2, +w/2)
//!   ─────────┼─┼─┼───┼────
//!            │   │ ↑ │       S→N chord:  x = +w/2, parallel to N→S
//! ```
//!
//! Two movements conflict when their chords intersect (`Crossing`) or they
//! feed the same outgoing segment (`Merge`).  Movements that share only the
//! incoming segment diverge and are serialized by lane order instead.

use tf_core::{Point, SegmentId};

/// A path through a junction: `from` (incoming) → `to` (outgoing).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Movement {
    pub from: SegmentId,
    pub to:   SegmentId,
}

impl Movement {
    #[inline]
    pub const fn new(from: SegmentId, to: SegmentId) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}→{}", self.from.0, self.to.0)
    }
}

/// Why two movements conflict.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConflictKind {
    /// The chords cross inside the junction box.
    Crossing,
    /// Both movements enter the same outgoing segment.
    Merge,
    /// Declared by the scenario rather than derived from geometry.
    Declared,
}

/// A pair of conflicting movements and the length of road they share.
///
/// `a < b` always holds so each pair is stored once.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ConflictZone {
    pub a:         Movement,
    pub b:         Movement,
    pub kind:      ConflictKind,
    /// Approximate length of the overlap region in metres.
    pub overlap_m: f32,
}

impl ConflictZone {
    /// Normalize the pair ordering.
    pub fn new(a: Movement, b: Movement, kind: ConflictKind, overlap_m: f32) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self { a, b, kind, overlap_m }
    }

    #[inline]
    pub fn key(&self) -> (Movement, Movement) {
        (self.a, self.b)
    }
}

// ── Chord construction ────────────────────────────────────────────────────────

/// End points of a movement chord.
///
/// `from_origin` is the junction the incoming segment starts at, `to_dest`
/// the junction the outgoing segment ends at, `center` the junction itself.
pub(crate) fn movement_chord(
    center:      Point,
    from_origin: Point,
    to_dest:     Point,
    radius_m:    f32,
    lane_width:  f32,
) -> (Point, Point) {
    let in_travel = from_origin.direction_to(center);
    let out_travel = center.direction_to(to_dest);
    let half = lane_width * 0.5;

    let entry = center
        .offset(center.direction_to(from_origin), radius_m)
        .offset(in_travel.right_normal(), half);
    let exit = center
        .offset(out_travel, radius_m)
        .offset(out_travel.right_normal(), half);
    (entry, exit)
}

/// Signed area of the triangle (a, b, c); sign gives orientation.
#[inline]
fn cross(a: Point, b: Point, c: Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) - 1e-4
        && p.x <= a.x.max(b.x) + 1e-4
        && p.y >= a.y.min(b.y) - 1e-4
        && p.y <= a.y.max(b.y) + 1e-4
}

/// `true` if closed segments `p1p2` and `q1q2` share at least one point.
pub(crate) fn chords_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    const EPS: f32 = 1e-4;
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }
    (d1.abs() <= EPS && on_segment(q1, q2, p1))
        || (d2.abs() <= EPS && on_segment(q1, q2, p2))
        || (d3.abs() <= EPS && on_segment(p1, p2, q1))
        || (d4.abs() <= EPS && on_segment(p1, p2, q2))
}

/// Overlap length of two crossing chords: one lane width divided by the sine
/// of the crossing angle, capped at the junction diameter.
pub(crate) fn crossing_overlap(
    p1: Point, p2: Point, q1: Point, q2: Point, lane_width: f32, radius_m: f32,
) -> f32 {
    let u = p1.direction_to(p2);
    let v = q1.direction_to(q2);
    let sin = (u.x * v.y - u.y * v.x).abs();
    if sin <= 1e-3 {
        return 2.0 * radius_m;
    }
    (lane_width / sin).min(2.0 * radius_m)
}
