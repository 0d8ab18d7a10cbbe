//! `TrafficControl`: the per-junction controller registry.

use std::collections::BTreeMap;

use tf_core::{JunctionId, SegmentId, Tick};
use tf_network::RoadNetwork;

use crate::controller::{Controller, SignalController};
use crate::phase::{Allowed, SignalPhase, SignalState};
use crate::{ControlError, ControlResult};

/// Vehicles queued per approach, as fed to [`TrafficControl::advance`].
pub type QueueCounts = BTreeMap<SegmentId, u32>;

/// Signal controllers keyed by junction.  Junctions without an entry are
/// uncontrolled.
#[derive(Clone, Debug, Default)]
pub struct TrafficControl {
    controllers: BTreeMap<JunctionId, Controller>,
}

impl TrafficControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `controller` to `junction` after checking that every phase
    /// names only approaches of that junction.
    pub fn insert(&mut self, network: &RoadNetwork, junction: JunctionId, controller: Controller) -> ControlResult<()> {
        let j = network.junction(junction)?;
        for phase in controller.phases() {
            if let Some(&bad) = phase.green.iter().find(|s| !j.incoming.contains(s)) {
                return Err(ControlError::NotAnApproach { junction, segment: bad });
            }
        }
        if self.controllers.contains_key(&junction) {
            return Err(ControlError::Duplicate(junction));
        }
        self.controllers.insert(junction, controller);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn is_controlled(&self, junction: JunctionId) -> bool {
        self.controllers.contains_key(&junction)
    }

    pub fn controller(&self, junction: JunctionId) -> Option<&Controller> {
        self.controllers.get(&junction)
    }

    pub fn junctions(&self) -> impl Iterator<Item = JunctionId> + '_ {
        self.controllers.keys().copied()
    }

    /// Approaches of `junction` allowed to proceed at `tick`.
    pub fn allowed_directions(&self, junction: JunctionId, tick: Tick) -> Allowed<'_> {
        match self.controllers.get(&junction) {
            None => Allowed::All,
            Some(c) => Allowed::Only(c.allowed_directions(tick)),
        }
    }

    #[inline]
    pub fn is_allowed(&self, junction: JunctionId, approach: SegmentId, tick: Tick) -> bool {
        self.allowed_directions(junction, tick).contains(approach)
    }

    /// Signal state seen from `approach` into `junction`.
    pub fn signal_state(&self, junction: JunctionId, approach: SegmentId, tick: Tick) -> SignalState {
        match self.allowed_directions(junction, tick) {
            Allowed::All => SignalState::Uncontrolled,
            a if a.contains(approach) => SignalState::Green,
            _ => SignalState::Red,
        }
    }

    pub fn phase(&self, junction: JunctionId, tick: Tick) -> Option<SignalPhase> {
        self.controllers.get(&junction).map(|c| c.phase_at(tick))
    }

    /// Step every controller.  `queues` holds all approaches network-wide;
    /// each controller reads only its own.
    pub fn advance(&mut self, tick: Tick, queues: &QueueCounts) {
        for c in self.controllers.values_mut() {
            c.advance(tick, queues);
        }
    }

    pub fn reset(&mut self) {
        for c in self.controllers.values_mut() {
            c.reset();
        }
    }
}
