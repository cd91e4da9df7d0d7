//! Parareal on the scalar test ODE `dy/dt = -y`.
//!
//! Demonstrates: build profile → engine → run with 0..=W correction passes
//! → compare against the sequential fine solution and `exp(-1)`.
//!
//! Set `RUST_LOG=parareal_engine=debug` to see per-pass logging.

use parareal_bench::decay_profile;
use parareal_engine::{RunOptions, RunParameters};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let workers = 4;
    let (mut engine, y0, params) = decay_profile(workers).unwrap().into_engine().unwrap();
    let reference = engine.sequential_fine(&y0, &params).unwrap().as_slice()[0];
    let exact = (-1.0f64).exp();

    println!("=== Parareal decay demo: W = {workers} ===");
    println!("  sequential fine  y(1) = {reference:.12}");
    println!("  exact            y(1) = {exact:.12}\n");

    for k in 0..=workers as u32 {
        let params = RunParameters { iterations: k, ..params };
        let out = engine.run(&y0, &params, &RunOptions::default()).unwrap();
        let y = out.solution.as_slice()[0];
        println!(
            "  K = {k}: y(1) = {y:.12}  |y - fine| = {:>9.3e}  |y - exact| = {:>9.3e}",
            (y - reference).abs(),
            (y - exact).abs(),
        );
    }

    let report = engine.teardown();
    println!("\nworkers joined: {}/{}", report.workers_joined, report.worker_count);
}
