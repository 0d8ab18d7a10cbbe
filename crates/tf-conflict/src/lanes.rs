//! Per-lane ordering of committed vehicle positions.

use tf_agent::AgentStore;
use tf_core::{AgentId, SegmentId};

#[cfg(feature = "fx-hash")]
type LaneMap = rustc_hash::FxHashMap<(SegmentId, u8), Vec<LaneOccupant>>;
#[cfg(not(feature = "fx-hash"))]
type LaneMap = std::collections::HashMap<(SegmentId, u8), Vec<LaneOccupant>>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LaneOccupant {
    pub agent:     AgentId,
    /// Front bumper position on the segment.
    pub offset_m:  f32,
    pub length_m:  f32,
    pub speed_mps: f32,
}

impl LaneOccupant {
    /// Rear bumper position; negative while the tail is still in the
    /// junction behind the segment start.
    #[inline]
    pub fn rear_m(&self) -> f32 {
        self.offset_m - self.length_m
    }
}

/// Live agents grouped by `(segment, lane)`, each group sorted from the
/// rear of the lane to the front.  Equal offsets order the lower id in front.
#[derive(Debug, Default)]
pub struct LaneIndex {
    lanes: LaneMap,
}

impl LaneIndex {
    pub fn build(agents: &AgentStore) -> Self {
        let mut lanes = LaneMap::default();
        for a in agents.live_ids() {
            let i = a.index();
            lanes.entry((agents.segment[i], agents.lane[i])).or_default().push(LaneOccupant {
                agent:     a,
                offset_m:  agents.offset_m[i],
                length_m:  agents.vehicle[i].length_m,
                speed_mps: agents.speed_mps[i],
            });
        }
        for list in lanes.values_mut() {
            list.sort_by(|x, y| x.offset_m.total_cmp(&y.offset_m).then(y.agent.cmp(&x.agent)));
        }
        Self { lanes }
    }

    pub fn lane(&self, segment: SegmentId, lane: u8) -> &[LaneOccupant] {
        self.lanes.get(&(segment, lane)).map_or(&[], Vec::as_slice)
    }

    /// Nearest vehicle in front of position `offset_m` held by `agent`.
    pub fn leader(&self, segment: SegmentId, lane: u8, offset_m: f32, agent: AgentId) -> Option<&LaneOccupant> {
        self.lane(segment, lane)
            .iter()
            .filter(|o| o.agent != agent)
            .find(|o| o.offset_m > offset_m || (o.offset_m == offset_m && o.agent < agent))
    }

    /// Nearest vehicle behind position `offset_m` held by `agent`.
    pub fn follower(&self, segment: SegmentId, lane: u8, offset_m: f32, agent: AgentId) -> Option<&LaneOccupant> {
        self.lane(segment, lane)
            .iter()
            .rev()
            .filter(|o| o.agent != agent)
            .find(|o| o.offset_m < offset_m || (o.offset_m == offset_m && o.agent > agent))
    }

    /// The vehicle closest to the start of the lane.
    pub fn rearmost(&self, segment: SegmentId, lane: u8) -> Option<&LaneOccupant> {
        self.lane(segment, lane).first()
    }

    /// `true` if nobody is ahead of `agent` in its lane.
    pub fn is_front(&self, segment: SegmentId, lane: u8, agent: AgentId) -> bool {
        self.lane(segment, lane).last().is_some_and(|o| o.agent == agent)
    }

    /// Pairs `(behind, ahead)` of consecutive vehicles whose bodies overlap,
    /// sorted by segment, lane and position.
    pub fn overlapping_pairs(&self) -> Vec<(AgentId, AgentId)> {
        let mut keys: Vec<&(SegmentId, u8)> = self.lanes.keys().collect();
        keys.sort();
        let mut out = Vec::new();
        for key in keys {
            for w in self.lanes[key].windows(2) {
                if w[1].rear_m() < w[0].offset_m {
                    out.push((w[0].agent, w[1].agent));
                }
            }
        }
        out
    }
}
