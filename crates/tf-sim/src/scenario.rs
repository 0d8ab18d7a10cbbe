//! Scenario files: network, signals, spawns and configuration in one JSON
//! document, consumed once at setup.
//!
//! ```json
//! {
//!   "config":  { "sim": { "tick_duration_ms": 100, "total_ticks": 3000, "seed": 7 } },
//!   "network": { "kind": "four_way", "arm_m": 120.0, "lanes": 1, "speed_limit_mps": 13.9 },
//!   "signals": [
//!     { "junction": 0, "controller": { "kind": "fixed", "clearance_ticks": 30,
//!       "phases": [ { "label": "NS", "green": [0, 4], "duration_ticks": 300 },
//!                   { "label": "EW", "green": [2, 6], "duration_ticks": 300 } ] } }
//!   ],
//!   "spawns":  [ { "tick": 0, "start": 0, "goal": 5 } ],
//!   "random":  { "routes": [[0, 5], [2, 7]], "period_ticks": 30 }
//! }
//! ```
//!
//! `spawn_csv` may name a CSV spawn list (see `tf_schedule::loader`);
//! relative paths resolve against the scenario file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tf_agent::{AgentInit, Kinematics, VehicleSpec};
use tf_control::{ControlError, Controller, ControllerSpec, TrafficControl};
use tf_core::{JunctionId, Point, SegmentId, Tick};
use tf_network::{four_way, Movement, NetworkError, RoadNetwork, RoadNetworkBuilder};
use tf_schedule::{load_spawns_csv, RandomSpawnConfig, RandomSpawner, ScheduleError, SpawnRequest};

use crate::EngineConfig;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("scenario JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

// ── Network ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkSpec {
    /// A single cross-roads; see [`tf_network::four_way`] for segment ids.
    FourWay {
        arm_m:           f32,
        #[serde(default = "one_lane")]
        lanes:           u8,
        speed_limit_mps: f32,
    },
    /// Junctions by position, segments by junction index.
    Explicit {
        junctions:         Vec<[f32; 2]>,
        segments:          Vec<SegmentSpec>,
        #[serde(default)]
        conflicts:         Vec<[[u32; 2]; 2]>,
        #[serde(default)]
        junction_radius_m: Option<f32>,
        #[serde(default)]
        lane_width_m:      Option<f32>,
        #[serde(default)]
        allow_u_turns:     bool,
    },
}

fn one_lane() -> u8 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub from:            u32,
    pub to:              u32,
    #[serde(default = "one_lane")]
    pub lanes:           u8,
    pub speed_limit_mps: f32,
    /// Overrides the straight-line length.
    #[serde(default)]
    pub length_m:        Option<f32>,
    /// Also add the reverse segment (`to → from`) right after this one.
    #[serde(default)]
    pub two_way:         bool,
}

impl NetworkSpec {
    pub fn build(&self) -> ScenarioResult<RoadNetwork> {
        match self {
            NetworkSpec::FourWay { arm_m, lanes, speed_limit_mps } => {
                Ok(four_way(*arm_m, *lanes, *speed_limit_mps)?.0)
            }
            NetworkSpec::Explicit { junctions, segments, conflicts, junction_radius_m, lane_width_m, allow_u_turns } => {
                let mut b = RoadNetworkBuilder::new().allow_u_turns(*allow_u_turns);
                if let Some(r) = junction_radius_m {
                    b = b.junction_radius(*r);
                }
                if let Some(w) = lane_width_m {
                    b = b.lane_width(*w);
                }
                for &[x, y] in junctions {
                    b.add_junction(Point::new(x, y));
                }
                for s in segments {
                    let (from, to) = (JunctionId(s.from), JunctionId(s.to));
                    match s.length_m {
                        Some(len) => {
                            b.add_segment_with_length(from, to, len, s.lanes, s.speed_limit_mps);
                            if s.two_way {
                                b.add_segment_with_length(to, from, len, s.lanes, s.speed_limit_mps);
                            }
                        }
                        None => {
                            b.add_segment(from, to, s.lanes, s.speed_limit_mps);
                            if s.two_way {
                                b.add_segment(to, from, s.lanes, s.speed_limit_mps);
                            }
                        }
                    }
                }
                for &[a, c] in conflicts {
                    b.add_conflict(
                        Movement::new(SegmentId(a[0]), SegmentId(a[1])),
                        Movement::new(SegmentId(c[0]), SegmentId(c[1])),
                    );
                }
                Ok(b.build()?)
            }
        }
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub junction:   JunctionId,
    pub controller: ControllerSpec,
}

// ── Spawns ────────────────────────────────────────────────────────────────────

/// One scheduled vehicle, flat for hand-written files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub tick:      u64,
    pub start:     SegmentId,
    pub goal:      SegmentId,
    #[serde(default)]
    pub lane:      u8,
    #[serde(default)]
    pub offset_m:  f32,
    #[serde(default)]
    pub speed_mps: f32,
    #[serde(default)]
    pub vehicle:   VehicleSpec,
}

impl SpawnSpec {
    pub fn to_request(&self) -> SpawnRequest {
        SpawnRequest::new(Tick(self.tick), AgentInit {
            start:   Kinematics { segment: self.start, offset_m: self.offset_m, lane: self.lane, speed_mps: self.speed_mps },
            goal:    self.goal,
            vehicle: self.vehicle,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomSpec {
    /// `(entry, exit)` segment pairs.
    pub routes: Vec<(SegmentId, SegmentId)>,
    #[serde(flatten)]
    pub config: RandomSpawnConfig,
    /// Defaults to the simulation seed.
    #[serde(default)]
    pub seed:   Option<u64>,
}

// ── Scenario ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config:    EngineConfig,
    pub network:   NetworkSpec,
    #[serde(default)]
    pub signals:   Vec<SignalSpec>,
    #[serde(default)]
    pub spawns:    Vec<SpawnSpec>,
    #[serde(default)]
    pub spawn_csv: Option<PathBuf>,
    #[serde(default)]
    pub random:    Option<RandomSpec>,
}

/// A scenario turned into engine inputs.
pub struct LoadedScenario {
    pub config:  EngineConfig,
    pub network: RoadNetwork,
    pub control: TrafficControl,
    pub spawns:  Vec<SpawnRequest>,
    pub spawner: Option<RandomSpawner>,
}

impl Scenario {
    pub fn from_json_str(s: &str) -> ScenarioResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a scenario file.  A relative `spawn_csv` is rewritten to sit
    /// next to the file.
    pub fn from_path(path: &Path) -> ScenarioResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ScenarioError::Io { path: path.to_path_buf(), source })?;
        let mut scenario = Self::from_json_str(&text)?;
        if let (Some(csv), Some(dir)) = (scenario.spawn_csv.as_mut(), path.parent()) {
            if csv.is_relative() {
                *csv = dir.join(&*csv);
            }
        }
        Ok(scenario)
    }

    /// Build the network, controllers and spawn sources.
    pub fn load(self) -> ScenarioResult<LoadedScenario> {
        let network = self.network.build()?;

        let mut control = TrafficControl::new();
        for s in self.signals {
            control.insert(&network, s.junction, Controller::from_spec(s.controller)?)?;
        }

        let mut spawns: Vec<SpawnRequest> = self.spawns.iter().map(SpawnSpec::to_request).collect();
        if let Some(csv) = &self.spawn_csv {
            spawns.extend(load_spawns_csv(csv)?);
        }
        for r in &spawns {
            r.validate()?;
        }

        let spawner = match self.random {
            Some(r) => Some(RandomSpawner::new(r.config, r.routes, r.seed.unwrap_or(self.config.sim.seed))?),
            None => None,
        };

        tracing::info!(
            segments = network.segment_count(),
            junctions = network.junction_count(),
            signals = control.len(),
            spawns = spawns.len(),
            random = spawner.is_some(),
            "scenario loaded"
        );
        Ok(LoadedScenario { config: self.config, network, control, spawns, spawner })
    }
}
