//! Canned network layouts used by demos and tests.

use tf_core::{JunctionId, Point, SegmentId};

use crate::network::{RoadNetwork, RoadNetworkBuilder};
use crate::NetworkResult;

/// Ids of a single signalised cross-roads built by [`four_way`].
///
/// Arrays are indexed by arm in the order **N, E, S, W**.
#[derive(Copy, Clone, Debug)]
pub struct FourWay {
    pub center:   JunctionId,
    /// Outer end of each arm.
    pub arms:     [JunctionId; 4],
    /// Segment driving *towards* the centre on each arm.
    pub inbound:  [SegmentId; 4],
    /// Segment driving *away from* the centre on each arm.
    pub outbound: [SegmentId; 4],
}

impl FourWay {
    pub const N: usize = 0;
    pub const E: usize = 1;
    pub const S: usize = 2;
    pub const W: usize = 3;
}

/// A cross-roads with four `arm_m`-long two-way arms meeting at the origin.
///
/// Segment ids are assigned arm by arm: arm `i` gets `inbound = 2i` and
/// `outbound = 2i + 1`.
pub fn four_way(arm_m: f32, lanes: u8, speed_limit_mps: f32) -> NetworkResult<(RoadNetwork, FourWay)> {
    let mut b = RoadNetworkBuilder::new();
    let center = b.add_junction(Point::new(0.0, 0.0));
    let dirs = [(0.0, 1.0), (1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)];

    let mut arms = [JunctionId::INVALID; 4];
    let mut inbound = [SegmentId::INVALID; 4];
    let mut outbound = [SegmentId::INVALID; 4];
    for (i, (dx, dy)) in dirs.into_iter().enumerate() {
        arms[i] = b.add_junction(Point::new(dx * arm_m, dy * arm_m));
        let (inb, out) = b.add_road(arms[i], center, lanes, speed_limit_mps);
        inbound[i] = inb;
        outbound[i] = out;
    }
    Ok((b.build()?, FourWay { center, arms, inbound, outbound }))
}
