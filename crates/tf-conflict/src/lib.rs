//! `tf-conflict`: who may enter a junction, and who must wait.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`config`]   | `ConflictConfig`                                              |
//! | [`book`]     | `ReservationBook` arena, `Reservation`                        |
//! | [`deadlock`] | `DeadlockTracker`: consecutive-denial counters                |
//! | [`lanes`]    | `LaneIndex`: per-lane ordering of committed positions         |
//! | [`resolver`] | `Resolver`, `Resolution`, `Verdict`, `Decision`               |
//! | [`error`]    | `ConflictError`, `ConflictResult<T>`                          |
//!
//! # Two-step protocol
//!
//! [`Resolver::resolve`] is a pure function of the resolver state and the
//! tick's candidates: calling it twice yields identical resolutions.  Only
//! [`Resolver::commit`] mutates state (grants, releases, deadlock counters),
//! and it re-checks the reservation invariant before returning.
//!
//! # Determinism
//!
//! Candidates arrive in a `BTreeMap` keyed by `AgentId`, junctions are
//! visited in id order, and every ranking ends with the agent id, so the
//! outcome never depends on hash order or thread scheduling.
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                   |
//! |-----------|----------------------------------------------------------|
//! | `serde`   | Derives `Serialize`/`Deserialize` on `ConflictConfig`.   |
//! | `fx-hash` | Uses `rustc_hash::FxHashMap` inside `LaneIndex`.         |

pub mod book;
pub mod config;
pub mod deadlock;
pub mod error;
pub mod lanes;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use book::{Reservation, ReservationBook};
pub use config::ConflictConfig;
pub use deadlock::DeadlockTracker;
pub use error::{ConflictError, ConflictResult};
pub use lanes::{LaneIndex, LaneOccupant};
pub use resolver::{CommitReport, Decision, DenyReason, Grant, Resolution, ResolveInput, Resolver, Verdict};
