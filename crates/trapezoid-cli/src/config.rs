use anyhow::bail;
use clap::Parser;
use trapezoid::{
    Convergence, DEFAULT_QUEUE_SLOTS_PER_WORKER, Growth, Polynomial, TASKS_PER_WORKER,
};

/// Runtime configuration for the `trapezoid-cli` binary.
///
/// These settings control the integrand, the interval, the size of the
/// worker pool and the resolution schedule. All values are parsed from CLI
/// arguments or environment variables (a `.env` file is honoured), with
/// defaults that reproduce the classic `2x² + 3x + 0.5` over `[2, 20]` run.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trapezoid-cli",
    version,
    about = "Integrates a polynomial with the parallel trapezoidal rule until it converges"
)]
pub struct CliArgs {
    /// Lower bound of the integration interval.
    ///
    /// Environment variable: `LOWER_BOUND`
    #[arg(long, env = "LOWER_BOUND", default_value_t = 2.0, allow_negative_numbers = true)]
    pub lower: f64,

    /// Upper bound of the integration interval. Must be greater than
    /// `--lower`.
    ///
    /// Environment variable: `UPPER_BOUND`
    #[arg(long, env = "UPPER_BOUND", default_value_t = 20.0, allow_negative_numbers = true)]
    pub upper: f64,

    /// Polynomial coefficients in ascending power order, comma separated.
    ///
    /// The default "0.5,3,2" is `2x² + 3x + 0.5`.
    ///
    /// Environment variable: `COEFFICIENTS`
    #[arg(long, env = "COEFFICIENTS", default_value = "0.5,3,2", allow_hyphen_values = true)]
    pub coefficients: String,

    /// Number of worker threads in the pool. Defaults to the number of
    /// logical CPUs.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub workers: Option<usize>,

    /// Tasks created per worker for each pass. More tasks than workers keeps
    /// every thread busy when ranges take uneven time.
    ///
    /// Environment variable: `TASKS_PER_WORKER`
    #[arg(long, env = "TASKS_PER_WORKER", default_value_t = TASKS_PER_WORKER)]
    pub tasks_per_worker: usize,

    /// Capacity of the shared job queue. Submitting blocks while the queue
    /// is full. Defaults to ten slots per worker.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Number of intervals for the first pass.
    ///
    /// Environment variable: `START_N`
    #[arg(long, env = "START_N", default_value_t = 10)]
    pub start_n: usize,

    /// Factor by which the interval count grows between passes.
    ///
    /// Environment variable: `GROWTH`
    #[arg(long, env = "GROWTH", default_value_t = 10)]
    pub growth: usize,

    /// Fixed number of intervals added between passes. Overrides
    /// `--growth`, e.g. `--start-n 50 --step 50` tries 50, 100, 150, ...
    ///
    /// Environment variable: `STEP`
    #[arg(long, env = "STEP")]
    pub step: Option<usize>,

    /// Largest interval count to try.
    ///
    /// Environment variable: `MAX_N`
    #[arg(long, env = "MAX_N", default_value_t = 1_000_000)]
    pub max_n: usize,

    /// Relative difference between successive estimates that counts as
    /// converged.
    ///
    /// Environment variable: `TOLERANCE`
    #[arg(long, env = "TOLERANCE", default_value_t = 1e-6)]
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub polynomial: Polynomial,
    pub lower: f64,
    pub upper: f64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub convergence: Convergence,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let polynomial: Polynomial = args.coefficients.parse()?;

        if !(args.lower.is_finite() && args.upper.is_finite() && args.lower < args.upper) {
            bail!(
                "LOWER_BOUND ({}) must be finite and below UPPER_BOUND ({})",
                args.lower,
                args.upper
            );
        }

        let workers = args.workers.unwrap_or_else(num_cpus::get);
        if workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.tasks_per_worker == 0 {
            bail!("TASKS_PER_WORKER must be greater than 0");
        }
        let num_tasks = workers
            .checked_mul(args.tasks_per_worker)
            .ok_or_else(|| anyhow::anyhow!("Overflow in task count computation"))?;

        let queue_capacity = match args.queue_capacity {
            Some(0) => bail!("QUEUE_CAPACITY must be greater than 0"),
            Some(capacity) => capacity,
            None => workers
                .checked_mul(DEFAULT_QUEUE_SLOTS_PER_WORKER)
                .ok_or_else(|| anyhow::anyhow!("Overflow in queue capacity computation"))?,
        };

        let convergence = Convergence {
            start_n: args.start_n,
            growth: args.step.map_or(Growth::Factor(args.growth), Growth::Step),
            max_n: args.max_n,
            tolerance: args.tolerance,
            num_tasks: Some(num_tasks),
        };
        convergence.validate()?;

        Ok(Self {
            polynomial,
            lower: args.lower,
            upper: args.upper,
            workers,
            queue_capacity,
            convergence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<RunConfig> {
        let argv = std::iter::once("trapezoid-cli").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        RunConfig::try_from(args)
    }

    #[test]
    fn defaults_describe_reference_run() {
        let config = parse(&["--workers", "3"]).unwrap();
        assert_eq!(config.polynomial, Polynomial::reference());
        assert_eq!((config.lower, config.upper), (2.0, 20.0));
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 30);
        assert_eq!(config.convergence.start_n, 10);
        assert_eq!(config.convergence.max_n, 1_000_000);
        assert_eq!(config.convergence.num_tasks, Some(12));
    }

    #[test]
    fn explicit_overrides() {
        let config = parse(&[
            "--lower",
            "-1",
            "--upper",
            "1.5",
            "--coefficients",
            "-2,0,1",
            "--workers",
            "2",
            "--tasks-per-worker",
            "8",
            "--queue-capacity",
            "5",
            "--start-n",
            "4",
            "--growth",
            "2",
            "--max-n",
            "64",
            "--tolerance",
            "1e-9",
        ])
        .unwrap();
        assert_eq!(config.polynomial.coefficients(), [-2.0, 0.0, 1.0]);
        assert_eq!((config.lower, config.upper), (-1.0, 1.5));
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.convergence.num_tasks, Some(16));
        assert_eq!(config.convergence.growth, Growth::Factor(2));
        assert_eq!(config.convergence.tolerance, 1e-9);
    }

    #[test]
    fn step_overrides_growth_factor() {
        let config = parse(&["--start-n", "50", "--step", "50", "--tolerance", "1e-9"]).unwrap();
        assert_eq!(config.convergence.growth, Growth::Step(50));
        assert_eq!(config.convergence.start_n, 50);
        assert_eq!(config.convergence.tolerance, 1e-9);
    }

    #[test]
    fn rejects_invalid_settings() {
        for args in [
            &["--workers", "0"][..],
            &["--lower", "5", "--upper", "5"],
            &["--lower", "5", "--upper", "1"],
            &["--tasks-per-worker", "0"],
            &["--queue-capacity", "0"],
            &["--coefficients", "1,two"],
            &["--growth", "1"],
            &["--step", "0"],
            &["--start-n", "0"],
            &["--max-n", "5"],
            &["--tolerance", "0"],
        ] {
            assert!(parse(args).is_err(), "{args:?} should be rejected");
        }
    }
}
