//! `tf-schedule`: when and where new vehicles enter the network.
//!
//! # Crate layout
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`request`] | `SpawnRequest`                                        |
//! | [`queue`]   | `SpawnQueue` (`BTreeMap<Tick, Vec<SpawnRequest>>`)    |
//! | [`random`]  | `RandomSpawner`, `RandomSpawnConfig`                  |
//! | [`loader`]  | `load_spawns_csv`, `load_spawns_reader`               |
//! | [`error`]   | `ScheduleError`, `ScheduleResult<T>`                  |
//!
//! Scenario spawns are pushed into a `SpawnQueue` once at build time; each
//! tick the simulation drains everything due.  A `RandomSpawner` adds
//! periodic traffic on top, drawing entry/exit pairs from its own `SimRng`
//! so runs with the same seed spawn the same vehicles.

pub mod error;
pub mod loader;
pub mod queue;
pub mod random;
pub mod request;

#[cfg(test)]
mod tests;

pub use error::{ScheduleError, ScheduleResult};
pub use loader::{load_spawns_csv, load_spawns_reader};
pub use queue::SpawnQueue;
pub use random::{RandomSpawnConfig, RandomSpawner};
pub use request::SpawnRequest;
