//! four_way: a signalised cross-roads driven by the cruise policy.
//!
//! Usage: `four_way [scenario.json] [output-dir]`
//!
//! Defaults to the bundled `scenarios/four_way.json` and writes CSV output
//! to `output/four_way`.  Set `RUST_LOG=debug` for per-tick engine logs.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use tf_core::AgentStatus;
use tf_network::DijkstraRouter;
use tf_output::{CsvWriter, SimOutputObserver};
use tf_policy::CruisePolicy;
use tf_sim::{Scenario, SimBuilder};

const DEFAULT_SCENARIO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/four_way.json");
const DEFAULT_OUTPUT:   &str = "output/four_way";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let scenario_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_SCENARIO.to_owned()));
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_owned()));

    println!("=== four_way / rust_traffic ===");

    // 1. Scenario.
    let loaded = Scenario::from_path(&scenario_path)
        .and_then(Scenario::load)
        .with_context(|| format!("loading {}", scenario_path.display()))?;
    let sim_config = loaded.config.sim.clone();

    #[cfg(feature = "parallel")]
    if let Some(n) = sim_config.num_threads {
        rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
    }

    println!(
        "Network: {} segments  |  Ticks: {} × {} ms  |  Seed: {}",
        loaded.network.segment_count(),
        sim_config.total_ticks,
        sim_config.tick_duration_ms,
        sim_config.seed,
    );

    // 2. Sim.
    let mut sim = SimBuilder::from_scenario(loaded, CruisePolicy::default(), DijkstraRouter).build()?;

    // 3. Output.
    std::fs::create_dir_all(&output_dir)?;
    let writer = CsvWriter::new(&output_dir)?;
    let mut obs = SimOutputObserver::new(writer, &sim_config);

    // 4. Run.
    let t0 = Instant::now();
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    obs.write_metrics(&sim.metrics);
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }

    // 5. Summary.
    let g = &sim.metrics.global;
    let simulated_s = sim_config.total_ticks as f64 * sim_config.tick_duration_ms as f64 / 1000.0;
    println!();
    println!("Simulated {simulated_s:.0} s in {:.3} s wall", elapsed.as_secs_f64());
    println!("  spawned    : {}", g.spawned);
    println!("  completed  : {}", g.completed);
    println!("  collisions : {}", g.collisions);
    println!("  deadlocks  : {}", g.deadlocks);
    println!("  timeouts   : {}", g.timeouts);
    println!("  replans    : {}", g.replans);
    println!("  overruns   : {}", g.overruns);
    println!("Output written to {}", output_dir.display());
    println!();

    // 6. Per-agent table.
    println!("{:<6} {:<10} {:>8} {:>10} {:>8} {:>8}", "Agent", "Status", "Dist m", "Travel s", "Wait s", "Reward");
    println!("{}", "-".repeat(56));
    let tick_s = sim_config.tick_duration_ms as f64 / 1000.0;
    for (i, m) in sim.metrics.agents().iter().enumerate() {
        let status = sim.agents.status.get(i).copied().unwrap_or(AgentStatus::Removed);
        let travel = m.travel_ticks().map(|t| format!("{:.1}", t as f64 * tick_s)).unwrap_or_else(|| "-".into());
        println!(
            "{:<6} {:<10} {:>8.1} {:>10} {:>8.1} {:>8.2}",
            i,
            status.as_str(),
            m.distance_m,
            travel,
            m.wait_ticks as f64 * tick_s,
            m.total_reward,
        );
    }

    Ok(())
}
