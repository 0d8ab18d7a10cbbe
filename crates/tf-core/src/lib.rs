//! `tf-core`: foundational types for the `rust_traffic` simulation engine.
//!
//! This crate is a dependency of every other `tf-*` crate.  It intentionally
//! has no `tf-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `SegmentId`, `JunctionId`, `ReservationId`      |
//! | [`geo`]         | `Point` (planar metres), distance, interpolation           |
//! | [`time`]        | `Tick`, `SimClock`, `SimConfig`                            |
//! | [`rng`]         | `AgentRng` (per-agent), `SimRng` (global)                  |
//! | [`status`]      | `AgentStatus` lifecycle enum                               |
//! | [`error`]       | `TfError`, `TfResult`                                      |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required for scenario and config loading in `tf-sim`.      |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod status;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{TfError, TfResult};
pub use geo::Point;
pub use ids::{AgentId, JunctionId, ReservationId, SegmentId};
pub use rng::{AgentRng, SimRng};
pub use status::AgentStatus;
pub use time::{SimClock, SimConfig, Tick};
