mod config;
mod report;
mod telemetry;

use clap::Parser;
use config::{CliArgs, RunConfig};
use telemetry::init_telemetry;
use trapezoid::{Trapezoid, WorkerPool};

// Using mimalloc for better performance under contention between worker
// threads.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let pool = WorkerPool::builder()
        .workers(config.workers)
        .queue_capacity(config.queue_capacity)
        .build()?;
    let trapezoid = Trapezoid::new(config.polynomial.clone(), config.lower, config.upper)?;

    report::print_header(&config);
    let result = config
        .convergence
        .run_with(&trapezoid, &pool, report::print_step);

    // Drain and join the workers even if a pass failed.
    pool.wait()?;
    let report = result?;

    report::print_summary(&config, &report);

    tracing::info!("Finished: {:?}", pool.stats());
    Ok(())
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting integration with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Integrating {} over [{}, {}] with {} workers",
            config.polynomial,
            config.lower,
            config.upper,
            config.workers
        );
    }
}
