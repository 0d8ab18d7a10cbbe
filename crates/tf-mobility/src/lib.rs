//! `tf-mobility`: point-mass kinematics and per-agent route tracking.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                        |
//! |------------|-----------------------------------------------------------------|
//! | [`limit`]  | `Limit`, `BrakeMode`: constraints for the second pass           |
//! | [`step`]   | `integrate`: one kinematic step, `Candidate`                    |
//! | [`route`]  | `RouteStore`: `RoutePlan` + cursor per agent                    |
//! | [`engine`] | `MobilityEngine<R>`: router + routes + propose/commit           |
//! | [`error`]  | `MobilityError`, `MobilityResult<T>`                            |
//!
//! # Movement model
//!
//! Each tick an agent's action is turned into a **candidate** next state:
//!
//! ```text
//! a  = clamp(action, -max_brake, max_accel)
//! v' = clamp(v + a·dt, 0, min(max_speed, speed_limit))
//! Δs = (v + v') / 2 · dt
//! ```
//!
//! Candidates are never written back directly.  The conflict resolver looks
//! at them first; agents that must yield, stop or follow are re-integrated
//! once from the same starting state under a [`Limit`].
//!
//! A candidate whose offset passes the end of a segment is moved onto the
//! next segment of the route in the same step (**atomic crossing**): the
//! committed state is always `offset ∈ [0, length]` of exactly one segment.
//! Reaching the end of the goal segment completes the trip.

pub mod engine;
pub mod error;
pub mod limit;
pub mod route;
pub mod step;


pub use engine::MobilityEngine;
pub use error::{MobilityError, MobilityResult};
pub use limit::{BrakeMode, Limit};
pub use route::RouteStore;
pub use step::{integrate, Candidate};
