//! Console logging for the `trapezoid-cli` binary.
//!
//! Events from the library (pool start-up and shutdown, pass phases, job
//! panics) and from the binary go through `tracing` to a human-readable
//! `fmt` layer on stderr, leaving stdout for the convergence report.
//!
//! The level defaults to `info` and can be overridden with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=trapezoid=trace cargo run --bin trapezoid-cli
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
