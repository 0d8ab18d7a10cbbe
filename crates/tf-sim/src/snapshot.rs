//! Read-only copies of the committed world state.

use tf_conflict::Reservation;
use tf_control::SignalPhase;
use tf_core::{AgentId, AgentStatus, JunctionId, Point, ReservationId, SegmentId, Tick};

#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    pub agent:       AgentId,
    pub status:      AgentStatus,
    pub segment:     SegmentId,
    pub offset_m:    f32,
    pub lane:        u8,
    pub speed_mps:   f32,
    pub accel_mps2:  f32,
    pub position:    Point,
    pub reservation: Option<ReservationId>,
}

/// Everything a renderer or test needs to describe one instant.
///
/// Terminal agents are listed too; filter on `status` for live ones.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSnapshot {
    pub tick:         Tick,
    pub agents:       Vec<AgentSnapshot>,
    pub reservations: Vec<Reservation>,
    pub signals:      Vec<(JunctionId, SignalPhase)>,
    pub closed:       Vec<SegmentId>,
}

impl WorldSnapshot {
    pub fn agent(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.agents.get(agent.index())
    }

    pub fn live(&self) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.agents.iter().filter(|a| a.status.is_live())
    }
}
