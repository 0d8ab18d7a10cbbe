//! `tf-network`: road network graph, conflict geometry, and routing.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`network`]  | `RoadNetwork`, `RoadSegment`, `Junction`, `RoadNetworkBuilder` |
//! | [`geometry`] | `Movement`, `ConflictZone`, movement path intersection         |
//! | [`cost`]     | `CostModel` trait, `FreeFlow`, `CongestionCosts`, `RoutingConfig` |
//! | [`router`]   | `Router` trait, `RoutePlan`, `DijkstraRouter`                  |
//! | [`layout`]   | Canned layouts (`four_way`) for demos and tests                |
//! | [`error`]    | `NetworkError`, `NetworkResult<T>`                             |
//!
//! # Mutability
//!
//! Topology is frozen by [`RoadNetworkBuilder::build`].  The only runtime
//! mutation is the per-segment open/closed flag, changed between ticks by the
//! simulation's control surface.  Every change bumps
//! [`RoadNetwork::revision`] so route holders know to revalidate.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public config types.    |

pub mod cost;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod network;
pub mod router;


pub use cost::{CongestionCosts, CostModel, FreeFlow, RoutingConfig};
pub use error::{NetworkError, NetworkResult};
pub use geometry::{ConflictKind, ConflictZone, Movement};
pub use layout::{four_way, FourWay};
pub use network::{Junction, RoadNetwork, RoadNetworkBuilder, RoadSegment};
pub use router::{DijkstraRouter, RoutePlan, Router};
