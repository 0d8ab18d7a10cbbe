//! `tf-agent`: Structure-of-Arrays agent registry for the `rust_traffic`
//! engine.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`vehicle`]   | `VehicleSpec`, `Kinematics`, `AgentInit`                   |
//! | [`store`]     | `AgentStore` (SoA arrays), `AgentRngs` (per-agent RNG)     |
//! | [`builder`]   | `AgentStoreBuilder` (fluent construction)                  |
//!
//! # Growth model
//!
//! Agents spawn and leave throughout a run, so every SoA array grows by one
//! slot per spawn.  Slots are never reused: an `AgentId` names the same
//! vehicle for the whole run, which keeps metrics and output rows stable.
//! Terminal agents (`Completed`/`Removed`) keep their slot and are skipped by
//! [`AgentStore::live_ids`].
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                 |
//! |---------|--------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on all public types. |

pub mod builder;
pub mod store;
pub mod vehicle;


pub use builder::AgentStoreBuilder;
pub use store::{AgentRngs, AgentStore};
pub use vehicle::{AgentInit, Kinematics, VehicleSpec};
