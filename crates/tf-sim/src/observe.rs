//! Building per-agent observations from the committed state.
//!
//! Runs sequentially before the decision phase so that policies only ever
//! see immutable data.

use rstar::primitives::GeomWithData;
use rstar::RTree;

use tf_agent::AgentStore;
use tf_conflict::{LaneIndex, Resolver};
use tf_control::TrafficControl;
use tf_core::{AgentId, Point, Tick};
use tf_mobility::RouteStore;
use tf_network::RoadNetwork;
use tf_policy::{EgoState, LeaderInfo, Observation, ObservationConfig, VisibleAgent};

use crate::SimResult;

type Entry = GeomWithData<[f32; 2], AgentId>;

/// Planar positions of every live agent, for range queries.
pub struct AgentIndex {
    tree: RTree<Entry>,
}

impl AgentIndex {
    pub fn build(network: &RoadNetwork, agents: &AgentStore) -> SimResult<Self> {
        let mut entries = Vec::with_capacity(agents.count);
        for a in agents.live_ids() {
            let i = a.index();
            let p = network.position(agents.segment[i], agents.offset_m[i], agents.lane[i])?;
            entries.push(Entry::new([p.x, p.y], a));
        }
        Ok(Self { tree: RTree::bulk_load(entries) })
    }

    /// Agents within `range_m` of `at`, nearest first, ties by id.
    pub fn within(&self, at: Point, range_m: f32) -> Vec<(AgentId, Point, f32)> {
        let mut found: Vec<(AgentId, Point, f32)> = self
            .tree
            .locate_within_distance([at.x, at.y], range_m * range_m)
            .map(|e| {
                let p = Point::new(e.geom()[0], e.geom()[1]);
                (e.data, p, at.distance_m(p))
            })
            .collect();
        found.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));
        found
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Read-only world view shared by every observation of one tick.
pub struct ObserveInput<'a> {
    pub network:   &'a RoadNetwork,
    pub agents:    &'a AgentStore,
    pub routes:    &'a RouteStore,
    pub control:   &'a TrafficControl,
    pub resolver:  &'a Resolver,
    pub lanes:     &'a LaneIndex,
    pub index:     &'a AgentIndex,
    pub occupancy: &'a [u32],
    pub config:    &'a ObservationConfig,
    pub tick:      Tick,
}

impl ObserveInput<'_> {
    pub fn observe(&self, agent: AgentId) -> SimResult<Observation> {
        let k = self.agents.kinematics(agent)?;
        let i = agent.index();
        let seg = self.network.segment(k.segment)?;
        let position = self.network.position(k.segment, k.offset_m, k.lane)?;
        let next_segment = self.routes.next_segment(agent);

        let ego = EgoState {
            segment:          k.segment,
            offset_m:         k.offset_m,
            lane:             k.lane,
            lanes:            seg.lanes,
            speed_mps:        k.speed_mps,
            accel_mps2:       self.agents.accel_mps2[i],
            segment_length_m: seg.length_m,
            speed_limit_mps:  seg.speed_limit_mps,
            dist_to_line_m:   (seg.length_m - k.offset_m).max(0.0),
            position,
            vehicle:          self.agents.vehicle[i],
        };

        let leader = match self.lanes.leader(k.segment, k.lane, k.offset_m, agent) {
            Some(o) => Some(LeaderInfo { agent: o.agent, gap_m: o.rear_m() - k.offset_m, speed_mps: o.speed_mps }),
            None => match next_segment {
                Some(next) => {
                    let lanes = self.network.segment(next)?.lanes;
                    self.lanes.rearmost(next, k.lane.min(lanes.saturating_sub(1))).map(|o| LeaderInfo {
                        agent:     o.agent,
                        gap_m:     ego.dist_to_line_m + o.rear_m(),
                        speed_mps: o.speed_mps,
                    })
                }
                None => None,
            },
        };

        let visible = self
            .index
            .within(position, self.config.sensor_range_m)
            .into_iter()
            .filter(|&(other, _, _)| other != agent)
            .take(self.config.max_visible)
            .map(|(other, p, distance_m)| {
                let j = other.index();
                VisibleAgent {
                    agent:     other,
                    relative:  Point::new(p.x - position.x, p.y - position.y),
                    distance_m,
                    speed_mps: self.agents.speed_mps[j],
                    segment:   self.agents.segment[j],
                    lane:      self.agents.lane[j],
                }
            })
            .collect();

        let occ = |s: tf_core::SegmentId| self.occupancy.get(s.index()).copied().unwrap_or(0);
        Ok(Observation {
            agent,
            tick: self.tick,
            ego,
            leader,
            visible,
            segment_occupancy: occ(k.segment),
            next_segment,
            next_segment_occupancy: next_segment.map_or(0, occ),
            signal: self.control.signal_state(seg.to, k.segment, self.tick),
            holds_reservation: self.resolver.holds_reservation(agent, self.tick),
        })
    }
}
