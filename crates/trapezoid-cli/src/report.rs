//! Human-readable convergence report on stdout.

use crate::config::RunConfig;
use trapezoid::{ConvergenceReport, Step};

const SEPARATOR_WIDTH: usize = 60;

pub fn print_header(config: &RunConfig) {
    println!("Using worker pool with {} threads", config.workers);
    println!("f(x) = {} over [{}, {}]", config.polynomial, config.lower, config.upper);
    println!("{}", "=".repeat(SEPARATOR_WIDTH));
}

pub fn print_step(step: &Step) {
    println!("{}", step_line(step));
}

pub fn print_summary(config: &RunConfig, report: &ConvergenceReport) {
    let exact = config.polynomial.antiderivative_between(config.lower, config.upper);
    let estimate = report.estimate();

    println!("{}", "=".repeat(SEPARATOR_WIDTH));
    if report.converged {
        println!("Converged at n={}", report.final_n());
    } else {
        println!(
            "Did not converge within tolerance {} by n={}",
            config.convergence.tolerance,
            report.final_n()
        );
    }
    println!("Final estimate: {estimate:.6}");
    println!("Exact value:    {exact:.6}");
    println!("Absolute error: {:.3e}", (estimate - exact).abs());
    println!(
        "Total time:     {:.3} ms",
        report.total_elapsed().as_secs_f64() * 1e3
    );
}

fn step_line(step: &Step) -> String {
    format!(
        "n={}: area={:.6}, time={:.3} ms",
        step.n,
        step.estimate,
        step.elapsed.as_secs_f64() * 1e3
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn step_line_format() {
        let step = Step {
            n: 1000,
            estimate: 5931.000_054,
            elapsed: Duration::from_micros(1_250),
        };
        assert_eq!(step_line(&step), "n=1000: area=5931.000054, time=1.250 ms");
    }
}
