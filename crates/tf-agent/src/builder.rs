//! Fluent builder for constructing `AgentStore` + `AgentRngs` in one step.
//!
//! # Usage
//!
//! ```rust
//! use tf_agent::{AgentInit, AgentStoreBuilder, Kinematics, VehicleSpec};
//! use tf_core::{SegmentId, Tick};
//!
//! let (mut store, mut rngs) = AgentStoreBuilder::new(/*seed=*/ 42)
//!     .capacity(256)
//!     .build();
//!
//! let id = store.spawn(
//!     AgentInit {
//!         start:   Kinematics::at_rest(SegmentId(0), 0.0, 0),
//!         goal:    SegmentId(3),
//!         vehicle: VehicleSpec::default(),
//!     },
//!     Tick(0),
//! );
//! rngs.grow_to(store.count);
//! assert_eq!(id.0, 0);
//! assert_eq!(rngs.len(), 1);
//! ```

use crate::{AgentRngs, AgentStore};

/// Fluent builder for [`AgentStore`] + [`AgentRngs`].
pub struct AgentStoreBuilder {
    seed:     u64,
    capacity: usize,
}

impl AgentStoreBuilder {
    /// Create a builder using `seed` as the global RNG seed.
    pub fn new(seed: u64) -> Self {
        Self { seed, capacity: 0 }
    }

    /// Pre-allocate room for `n` agents.  Purely a performance hint.
    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    /// Construct an empty `AgentStore` and `AgentRngs`.
    pub fn build(self) -> (AgentStore, AgentRngs) {
        let store = AgentStore::with_capacity(self.capacity);
        let rngs = AgentRngs::new(0, self.seed);
        (store, rngs)
    }
}
