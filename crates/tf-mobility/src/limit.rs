//! Constraints the resolver places on a re-integrated step.

/// How to hold an agent at its stop line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BrakeMode {
    /// Decelerate just enough to stop at the line (yield).
    Comfort,
    /// Full braking (stop).
    Hard,
}

/// Caps applied to one agent's step.  `Limit::NONE` leaves the action alone.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Limit {
    /// Do not pass the end of the current segment.
    pub hold_at_line:  Option<BrakeMode>,
    /// Maximum distance travelled this tick.
    pub max_advance_m: Option<f32>,
    /// Maximum speed at the end of the tick.
    pub speed_cap:     Option<f32>,
    /// Ignore the requested lane change.
    pub lane_lock:     bool,
}

impl Limit {
    pub const NONE: Limit = Limit {
        hold_at_line:  None,
        max_advance_m: None,
        speed_cap:     None,
        lane_lock:     false,
    };

    pub fn hold(mode: BrakeMode) -> Self {
        Limit { hold_at_line: Some(mode), ..Self::NONE }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Tightest combination of two limits.
    pub fn merge(self, other: Limit) -> Limit {
        let hold = match (self.hold_at_line, other.hold_at_line) {
            (Some(BrakeMode::Hard), _) | (_, Some(BrakeMode::Hard)) => Some(BrakeMode::Hard),
            (a, b) => a.or(b),
        };
        let min = |a: Option<f32>, b: Option<f32>| match (a, b) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        };
        Limit {
            hold_at_line:  hold,
            max_advance_m: min(self.max_advance_m, other.max_advance_m),
            speed_cap:     min(self.speed_cap, other.speed_cap),
            lane_lock:     self.lane_lock || other.lane_lock,
        }
    }
}
