//! Fixed-time signal plan.
//!
//! Phases run in order with fixed green times.  Whenever an approach that is
//! green in one phase is red in the next, an all-red clearance interval is
//! inserted between them:
//!
//! ```text
//!   phases A(30) B(30), clearance 5
//!
//!   tick  0 ──── 30 ── 35 ──── 65 ── 70
//!         │  A   │ red │  B   │ red │  A …
//! ```
//!
//! State is a pure function of the tick, so `advance` is a no-op.

use tf_core::{SegmentId, Tick};

use crate::phase::{PhaseSpec, SignalPhase};
use crate::{ControlError, ControlResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Green(usize),
    Clearance,
}

/// Cyclic fixed-time controller.
#[derive(Clone, Debug)]
pub struct FixedPhase {
    phases:   Vec<PhaseSpec>,
    /// `(start, end, slot)` within one cycle, contiguous from 0.
    schedule: Vec<(u64, u64, Slot)>,
    cycle:    u64,
    offset:   u64,
}

impl FixedPhase {
    /// Build the timetable.  `offset_ticks` shifts the cycle start so that
    /// neighbouring junctions can be coordinated.
    pub fn new(mut phases: Vec<PhaseSpec>, clearance_ticks: u64, offset_ticks: u64) -> ControlResult<Self> {
        if phases.is_empty() {
            return Err(ControlError::NoPhases);
        }
        phases.iter_mut().for_each(PhaseSpec::normalise);
        if let Some(p) = phases.iter().find(|p| p.duration_ticks == 0) {
            return Err(ControlError::InvalidTiming(format!(
                "phase {:?} has zero duration",
                p.label
            )));
        }

        let mut schedule = Vec::with_capacity(phases.len() * 2);
        let mut t = 0u64;
        for (i, phase) in phases.iter().enumerate() {
            schedule.push((t, t + phase.duration_ticks, Slot::Green(i)));
            t += phase.duration_ticks;
            let next = &phases[(i + 1) % phases.len()];
            if clearance_ticks > 0 && phase.loses_green_to(next) {
                schedule.push((t, t + clearance_ticks, Slot::Clearance));
                t += clearance_ticks;
            }
        }
        Ok(Self { phases, schedule, cycle: t, offset: offset_ticks })
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    /// Length of one full cycle including clearances.
    pub fn cycle_ticks(&self) -> u64 {
        self.cycle
    }

    fn slot_at(&self, tick: Tick) -> Slot {
        let pos = (tick.0 + self.offset) % self.cycle;
        // Schedule is contiguous and covers [0, cycle).
        let i = self.schedule.partition_point(|&(_, end, _)| end <= pos);
        self.schedule[i].2
    }

    pub fn allowed(&self, tick: Tick) -> &[SegmentId] {
        match self.slot_at(tick) {
            Slot::Green(i) => &self.phases[i].green,
            Slot::Clearance => &[],
        }
    }

    pub fn phase_at(&self, tick: Tick) -> SignalPhase {
        match self.slot_at(tick) {
            Slot::Green(i) => SignalPhase {
                label:     Some(self.phases[i].label.clone()),
                green:     self.phases[i].green.clone(),
                clearance: false,
            },
            Slot::Clearance => SignalPhase { label: None, green: Vec::new(), clearance: true },
        }
    }

    /// Ticks until the current slot ends.
    pub fn ticks_remaining(&self, tick: Tick) -> u64 {
        let pos = (tick.0 + self.offset) % self.cycle;
        let i = self.schedule.partition_point(|&(_, end, _)| end <= pos);
        self.schedule[i].1 - pos
    }
}
