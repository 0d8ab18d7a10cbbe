use tf_core::TfError;

/// Conflict resolution tuning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConflictConfig {
    /// N: consecutive denied ticks before an agent is flagged Deadlocked.
    pub deadlock_ticks:        u32,
    /// Upper bound on a reservation's length.  Must stay below
    /// `deadlock_ticks` so an escalated agent is served in time.
    pub max_reservation_ticks: u64,
    /// Agents further than this from their stop line do not contend.
    pub approach_zone_m:       f32,
    /// Agents expected at the line later than this do not contend.
    pub approach_horizon_ms:   u64,
    /// Distance past the stop line after which a reservation is released.
    pub clear_distance_m:      f32,
    /// Speed floor used when estimating arrival and crossing time.
    pub min_crossing_speed_mps: f32,
    /// Bumper-to-bumper gap kept when following, merging and changing lanes.
    pub min_gap_m:             f32,
    /// Within this distance of the line an agent counts as arrived.
    pub stop_line_tolerance_m: f32,
    /// Released reservations kept for auditing.
    pub history_limit:         usize,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            deadlock_ticks:         50,
            max_reservation_ticks:  40,
            approach_zone_m:        30.0,
            approach_horizon_ms:    4_000,
            clear_distance_m:       10.0,
            min_crossing_speed_mps: 2.0,
            min_gap_m:              2.0,
            stop_line_tolerance_m:  0.5,
            history_limit:          4_096,
        }
    }
}

impl ConflictConfig {
    pub fn validate(&self) -> Result<(), TfError> {
        if self.deadlock_ticks == 0 || self.max_reservation_ticks == 0 {
            return Err(TfError::Config("deadlock_ticks and max_reservation_ticks must be > 0".into()));
        }
        if self.max_reservation_ticks >= self.deadlock_ticks as u64 {
            return Err(TfError::Config(format!(
                "max_reservation_ticks ({}) must be < deadlock_ticks ({})",
                self.max_reservation_ticks, self.deadlock_ticks
            )));
        }
        if !(self.approach_zone_m > 0.0 && self.clear_distance_m >= 0.0 && self.min_crossing_speed_mps > 0.0) {
            return Err(TfError::Config("approach zone and crossing speed must be > 0".into()));
        }
        if !(self.min_gap_m >= 0.0 && self.stop_line_tolerance_m >= 0.0) {
            return Err(TfError::Config("gaps and tolerances must be >= 0".into()));
        }
        Ok(())
    }
}
