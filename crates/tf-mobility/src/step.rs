//! One kinematic step for one agent.

use tf_agent::{Kinematics, VehicleSpec};
use tf_core::{AgentId, SegmentId};
use tf_network::{Movement, RoadNetwork};
use tf_policy::Action;

use crate::{BrakeMode, Limit, MobilityResult};

/// A proposed next state, not yet committed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    pub agent:      AgentId,
    /// Committed state at the start of the tick.
    pub start:      Kinematics,
    /// Proposed state at the end of the tick.
    pub next:       Kinematics,
    /// Acceleration actually applied after clamping and limits, never below
    /// `-max_brake_mps2`.  A hold the brakes cannot honour still ends at the
    /// line with zero speed; the excess deceleration is not reported.
    pub accel_mps2: f32,
    /// Route segment after `start.segment`; `None` on the goal segment.
    pub route_next: Option<SegmentId>,
    /// `next` lies on `route_next`.
    pub crossed:    bool,
    /// The goal segment's end was reached.
    pub completed:  bool,
    pub distance_m: f32,
    /// Lane change applied on the start segment (-1, 0, +1).
    pub lane_delta: i8,
}

impl Candidate {
    /// The junction movement this agent is heading for, if any.
    #[inline]
    pub fn movement(&self) -> Option<Movement> {
        self.route_next.map(|to| Movement::new(self.start.segment, to))
    }

    /// Lane on the start segment after the lane change.
    #[inline]
    pub fn target_lane(&self) -> u8 {
        (self.start.lane as i16 + self.lane_delta as i16) as u8
    }
}

/// Integrate one step of `dt_secs` from `start`.
///
/// The result always satisfies `0 <= next.offset_m <= length(next.segment)`.
/// With a hold limit the agent never passes its stop line.
#[allow(clippy::too_many_arguments)]
pub fn integrate(
    network:    &RoadNetwork,
    agent:      AgentId,
    vehicle:    &VehicleSpec,
    start:      Kinematics,
    route_next: Option<SegmentId>,
    action:     Action,
    limit:      Limit,
    dt_secs:    f32,
) -> MobilityResult<Candidate> {
    let seg = network.segment(start.segment)?;
    let length = seg.length_m;
    let dt = dt_secs;
    let v = start.speed_mps.max(0.0);
    let b = vehicle.max_brake_mps2;
    let dist_to_line = (length - start.offset_m).max(0.0);

    let mut v_cap = vehicle.max_speed_mps.min(seg.speed_limit_mps);
    if let Some(cap) = limit.speed_cap {
        v_cap = v_cap.min(cap.max(0.0));
    }

    let mut a = action.accel_mps2.clamp(-b, vehicle.max_accel_mps2);
    match limit.hold_at_line {
        Some(BrakeMode::Hard) => a = -b,
        Some(BrakeMode::Comfort) => {
            let (travel, v_next) = advance(v, a, v_cap, dt);
            // Keep the requested action while a full stop before the line
            // is still possible afterwards.
            if travel + v_next * v_next / (2.0 * b) > dist_to_line {
                let needed = if dist_to_line > 0.0 { v * v / (2.0 * dist_to_line) } else { b };
                a = -needed.min(b);
            }
        }
        None => {}
    }

    let (mut travel, mut v_next) = advance(v, a, v_cap, dt);

    if limit.hold_at_line.is_some() && travel >= dist_to_line {
        travel = dist_to_line;
        v_next = 0.0;
    }
    if let Some(max) = limit.max_advance_m {
        let max = max.max(0.0);
        if travel > max {
            travel = max;
            v_next = (2.0 * max / dt - v).clamp(0.0, v_next);
        }
    }

    let lane_delta = if limit.lane_lock || action.lane_delta == 0 {
        0
    } else {
        let target = (start.lane as i16 + action.lane_delta as i16).clamp(0, seg.lanes as i16 - 1);
        (target - start.lane as i16) as i8
    };
    let lane = (start.lane as i16 + lane_delta as i16) as u8;

    let mut next = Kinematics {
        segment:   start.segment,
        offset_m:  start.offset_m + travel,
        lane,
        speed_mps: v_next,
    };
    let mut crossed = false;
    let mut completed = false;

    match route_next {
        None => {
            if next.offset_m >= length {
                next.offset_m = length;
                completed = true;
            }
        }
        Some(to) if next.offset_m > length => {
            let to_seg = network.segment(to)?;
            next.segment = to;
            next.offset_m = (next.offset_m - length).min(to_seg.length_m);
            next.lane = next.lane.min(to_seg.lanes.saturating_sub(1));
            crossed = true;
        }
        Some(_) => next.offset_m = next.offset_m.min(length),
    }

    Ok(Candidate {
        agent,
        start,
        next,
        accel_mps2: ((v_next - v) / dt).max(-b),
        route_next,
        crossed,
        completed,
        distance_m: travel,
        lane_delta,
    })
}

/// Distance covered and end speed under constant `a`, stopping at zero.
fn advance(v: f32, a: f32, v_cap: f32, dt: f32) -> (f32, f32) {
    let raw = v + a * dt;
    if raw < 0.0 && a < 0.0 {
        return (v * v / (-2.0 * a), 0.0);
    }
    let v_next = raw.clamp(0.0, v_cap);
    ((v + v_next) * 0.5 * dt, v_next)
}
