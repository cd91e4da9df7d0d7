//! Parareal on the 3-D reference advection-diffusion problem.
//!
//! Runs the reference profile with an increasing number of correction
//! passes, reports the error against sequential fine integration and the
//! measured timers, and optionally writes per-worker output files.
//!
//! Usage: `cargo run --release --example advection_demo [WORKERS] [OUTPUT_DIR]`

use std::time::Instant;

use parareal_bench::reference_profile;
use parareal_engine::{FileSink, RunOptions, RunParameters, TimerRecord};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let workers: usize = args.next().map(|s| s.parse().unwrap()).unwrap_or(4);
    let output_dir = args.next();

    let profile = reference_profile(workers).unwrap();
    let name = profile.name;
    let (mut engine, y0, params) = profile.into_engine().unwrap();
    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir).unwrap();
        engine.set_sink(FileSink::new(dir));
    }

    info!(
        profile = name,
        workers,
        fine_steps = params.fine_steps,
        coarse_steps = params.coarse_steps,
        memory_bytes = engine.memory_bytes(),
        "starting demo"
    );

    let start = Instant::now();
    let reference = engine.sequential_fine(&y0, &params).unwrap();
    let sequential_time = start.elapsed();
    println!("sequential fine: {sequential_time:.3?}\n");

    let mut options = RunOptions::default().verbose();
    if output_dir.is_some() {
        options = options.emitting();
    }

    for k in 0..=workers as u32 {
        let params = RunParameters { iterations: k, ..params };
        let out = engine.run(&y0, &params, &options).unwrap();
        let err = out.solution.max_interior_diff(&reference);
        let speedup = sequential_time.as_secs_f64() / out.timers.total.as_secs_f64();
        let bound = out
            .timers
            .estimated_cost_ratio(k)
            .map(|r| TimerRecord::speedup_bound(k, workers, r));
        println!(
            "K = {k}: max error {err:>9.3e}  measured speedup {speedup:>5.2}  bound {}",
            bound.map_or_else(|| "-".to_string(), |b| format!("{b:.2}")),
        );
        println!("       {}", out.timers);
        if let Some(e) = out.persistence_error {
            eprintln!("       output failed: {e}");
        }
    }

    engine.teardown();
}
