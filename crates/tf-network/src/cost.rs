//! Segment cost models and routing configuration.
//!
//! All costs are integer milliseconds so that path sums are exact and route
//! comparison is deterministic across platforms.

use tf_core::{SegmentId, TfError};

use crate::network::RoadNetwork;

// ── CostModel ─────────────────────────────────────────────────────────────────

/// Per-segment traversal cost in milliseconds.
///
/// Implementations must return at least 1 for every segment so that every
/// non-empty path has strictly positive cost.
pub trait CostModel: Send + Sync {
    fn segment_cost_ms(&self, network: &RoadNetwork, seg: SegmentId) -> u32;
}

/// Free-flow traversal time: `length / speed_limit`.
#[derive(Copy, Clone, Debug, Default)]
pub struct FreeFlow;

impl CostModel for FreeFlow {
    #[inline]
    fn segment_cost_ms(&self, network: &RoadNetwork, seg: SegmentId) -> u32 {
        network.segment(seg).map_or(u32::MAX, |s| s.free_flow_ms())
    }
}

// ── CongestionCosts ───────────────────────────────────────────────────────────

/// Free-flow time scaled by a congestion multiplier:
///
/// ```text
/// cost = free_flow_ms × (1 + α · (occupancy / capacity)^β)
/// capacity = lanes × length / vehicle_spacing
/// ```
///
/// Built once per tick from the committed occupancy counts, then shared
/// read-only with every routing query of that tick.
#[derive(Clone, Debug)]
pub struct CongestionCosts {
    cost_ms: Vec<u32>,
}

impl CongestionCosts {
    /// `occupancy[s]` is the number of agents currently on segment `s`.
    /// Missing entries count as empty.
    pub fn new(network: &RoadNetwork, config: &RoutingConfig, occupancy: &[u32]) -> Self {
        let cost_ms = network
            .segments()
            .iter()
            .map(|s| {
                let occ = occupancy.get(s.id.index()).copied().unwrap_or(0) as f32;
                let ratio = occ / s.capacity(config.vehicle_spacing_m);
                let mult = 1.0 + config.congestion_alpha * ratio.powf(config.congestion_beta);
                ((s.free_flow_ms() as f32 * mult).ceil() as u32).max(1)
            })
            .collect();
        Self { cost_ms }
    }

    /// Cost table with every multiplier at 1.
    pub fn free_flow(network: &RoadNetwork) -> Self {
        Self { cost_ms: network.segments().iter().map(|s| s.free_flow_ms()).collect() }
    }

    #[inline]
    pub fn cost_of(&self, seg: SegmentId) -> Option<u32> {
        self.cost_ms.get(seg.index()).copied()
    }

    /// Sum of segment costs along `segments`, saturating.
    pub fn path_cost_ms(&self, segments: &[SegmentId]) -> u32 {
        segments
            .iter()
            .fold(0u32, |acc, &s| acc.saturating_add(self.cost_of(s).unwrap_or(u32::MAX)))
    }
}

impl CostModel for CongestionCosts {
    #[inline]
    fn segment_cost_ms(&self, _network: &RoadNetwork, seg: SegmentId) -> u32 {
        self.cost_of(seg).unwrap_or(u32::MAX)
    }
}

// ── RoutingConfig ─────────────────────────────────────────────────────────────

/// Congestion cost shape and replanning policy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoutingConfig {
    /// Multiplier scale α.
    pub congestion_alpha: f32,
    /// Multiplier exponent β.
    pub congestion_beta: f32,
    /// Headway per vehicle used to derive segment capacity.
    pub vehicle_spacing_m: f32,
    /// Hysteresis: replan only when the remaining route costs more than
    /// `replan_ratio ×` the best alternative.
    pub replan_ratio: f32,
    /// Ticks between congestion re-evaluations of an agent's route.
    pub replan_interval_ticks: u64,
    /// Ticks a Waiting agent sits before its next routing attempt when the
    /// network has not changed in between.
    pub waiting_retry_ticks: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            congestion_alpha:      1.0,
            congestion_beta:       2.0,
            vehicle_spacing_m:     7.5,
            replan_ratio:          1.25,
            replan_interval_ticks: 50,
            waiting_retry_ticks:   20,
        }
    }
}

impl RoutingConfig {
    /// `true` if an alternative costing `best_ms` justifies abandoning a
    /// remaining route that costs `current_ms`.
    #[inline]
    pub fn should_switch(&self, current_ms: u32, best_ms: u32) -> bool {
        current_ms as f64 > best_ms as f64 * self.replan_ratio as f64
    }

    pub fn validate(&self) -> Result<(), TfError> {
        if !(self.congestion_alpha >= 0.0) || !(self.congestion_beta > 0.0) {
            return Err(TfError::Config("congestion alpha must be >= 0 and beta > 0".into()));
        }
        if !(self.vehicle_spacing_m > 0.0) {
            return Err(TfError::Config("vehicle_spacing_m must be > 0".into()));
        }
        if !(self.replan_ratio >= 1.0) {
            return Err(TfError::Config("replan_ratio must be >= 1.0".into()));
        }
        if self.replan_interval_ticks == 0 || self.waiting_retry_ticks == 0 {
            return Err(TfError::Config("replan and retry intervals must be > 0".into()));
        }
        Ok(())
    }
}
