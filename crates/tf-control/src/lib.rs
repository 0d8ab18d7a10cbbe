//! `tf-control`: the traffic control layer.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                     |
//! |----------------|--------------------------------------------------------------|
//! | [`phase`]      | `PhaseSpec`, `SignalPhase`, `SignalState`, `Allowed`         |
//! | [`fixed`]      | `FixedPhase`: cyclic timetable with all-red clearance        |
//! | [`adaptive`]   | `AdaptivePhase`: queue-pressure controller                   |
//! | [`controller`] | `SignalController` trait, `Controller` enum, `ControllerSpec` |
//! | [`control`]    | `TrafficControl`: per-junction registry used by the engine   |
//! | [`error`]      | `ControlError`, `ControlResult<T>`                           |
//!
//! # Semantics
//!
//! Signals act on **approaches** (incoming segments).  At any tick a
//! controlled junction lets a set of approaches proceed; every other approach
//! is red.  Junctions without a controller are uncontrolled and let every
//! approach proceed, leaving right-of-way to the conflict resolver alone.
//!
//! Controllers are deterministic: given the same sequence of
//! `advance(tick, queues)` calls they produce the same phases.

pub mod adaptive;
pub mod control;
pub mod controller;
pub mod error;
pub mod fixed;
pub mod phase;


pub use adaptive::{AdaptiveConfig, AdaptivePhase};
pub use control::{QueueCounts, TrafficControl};
pub use controller::{Controller, ControllerSpec, SignalController};
pub use error::{ControlError, ControlResult};
pub use fixed::FixedPhase;
pub use phase::{Allowed, PhaseSpec, SignalPhase, SignalState};
