//! Controller polymorphism: one trait, one tagged enum.

use tf_core::{SegmentId, Tick};

use crate::adaptive::{AdaptiveConfig, AdaptivePhase};
use crate::control::QueueCounts;
use crate::fixed::FixedPhase;
use crate::phase::{PhaseSpec, SignalPhase};
use crate::ControlResult;

/// Anything that can say which approaches may proceed.
pub trait SignalController {
    /// Sorted approaches allowed to proceed at `tick`.
    fn allowed_directions(&self, tick: Tick) -> &[SegmentId];

    /// Step internal state.  Called once per tick before any query for that
    /// tick.  Time-driven controllers ignore it.
    fn advance(&mut self, _tick: Tick, _queues: &QueueCounts) {}
}

impl SignalController for FixedPhase {
    fn allowed_directions(&self, tick: Tick) -> &[SegmentId] {
        self.allowed(tick)
    }
}

impl SignalController for AdaptivePhase {
    fn allowed_directions(&self, _tick: Tick) -> &[SegmentId] {
        self.allowed()
    }

    fn advance(&mut self, tick: Tick, queues: &QueueCounts) {
        AdaptivePhase::advance(self, tick, queues);
    }
}

/// Scenario description of a controller.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ControllerSpec {
    Fixed {
        phases:          Vec<PhaseSpec>,
        #[cfg_attr(feature = "serde", serde(default))]
        clearance_ticks: u64,
        #[cfg_attr(feature = "serde", serde(default))]
        offset_ticks:    u64,
    },
    Adaptive {
        phases: Vec<PhaseSpec>,
        #[cfg_attr(feature = "serde", serde(default))]
        config: AdaptiveConfig,
    },
}

/// A built controller.
#[derive(Clone, Debug)]
pub enum Controller {
    Fixed(FixedPhase),
    Adaptive(AdaptivePhase),
}

impl Controller {
    pub fn from_spec(spec: ControllerSpec) -> ControlResult<Self> {
        let normalize = |phases: Vec<PhaseSpec>| -> Vec<PhaseSpec> {
            phases
                .into_iter()
                .map(|p| PhaseSpec::new(p.label, p.green, p.duration_ticks))
                .collect()
        };
        Ok(match spec {
            ControllerSpec::Fixed { phases, clearance_ticks, offset_ticks } => {
                Controller::Fixed(FixedPhase::new(normalize(phases), clearance_ticks, offset_ticks)?)
            }
            ControllerSpec::Adaptive { phases, config } => {
                Controller::Adaptive(AdaptivePhase::new(normalize(phases), config)?)
            }
        })
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        match self {
            Controller::Fixed(c) => c.phases(),
            Controller::Adaptive(c) => c.phases(),
        }
    }

    pub fn phase_at(&self, tick: Tick) -> SignalPhase {
        match self {
            Controller::Fixed(c) => c.phase_at(tick),
            Controller::Adaptive(c) => c.phase_view(),
        }
    }

    /// Restore the state the controller had before tick 0.
    pub fn reset(&mut self) {
        if let Controller::Adaptive(c) = self {
            c.reset();
        }
    }
}

impl SignalController for Controller {
    fn allowed_directions(&self, tick: Tick) -> &[SegmentId] {
        match self {
            Controller::Fixed(c) => c.allowed_directions(tick),
            Controller::Adaptive(c) => c.allowed_directions(tick),
        }
    }

    fn advance(&mut self, tick: Tick, queues: &QueueCounts) {
        match self {
            Controller::Fixed(c) => SignalController::advance(c, tick, queues),
            Controller::Adaptive(c) => SignalController::advance(c, tick, queues),
        }
    }
}
