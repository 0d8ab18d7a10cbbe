//! Simulation observer trait for progress reporting and data collection.

use tf_agent::AgentStore;
use tf_core::{AgentId, Tick};

use crate::TickSummary;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] and
/// [`Sim::step`][crate::Sim::step] at key points in the tick loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter { interval: u64 }
///
/// impl SimObserver for ProgressPrinter {
///     fn on_tick_end(&mut self, summary: &TickSummary) {
///         if summary.tick.0 % self.interval == 0 {
///             println!("tick {}: {} live", summary.tick, summary.live);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called at the end of each tick with what happened in it.
    fn on_tick_end(&mut self, _summary: &TickSummary) {}

    /// Called at snapshot intervals (every `sim.output_interval_ticks` ticks)
    /// with read-only access to the committed agent state.
    fn on_snapshot(&mut self, _tick: Tick, _agents: &AgentStore) {}

    /// Per-agent rewards for the tick, ascending id.  Only called when the
    /// simulation has a reward model.
    fn on_rewards(&mut self, _tick: Tick, _rewards: &[(AgentId, f32)]) {}

    /// Polled after every tick of [`Sim::run`][crate::Sim::run]; returning
    /// `true` pauses the run.
    fn wants_pause(&mut self) -> bool {
        false
    }

    /// Called once when `run` reaches the end tick.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
