//! Repeated passes at growing resolution until two successive estimates
//! agree.

use crate::{
    error::{Error, Result},
    evaluator::Evaluator,
    integrator::{TASKS_PER_WORKER, Trapezoid},
    pool::WorkerPool,
};
use std::time::{Duration, Instant};

/// One integration pass within a convergence run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub n: usize,
    pub estimate: f64,
    pub elapsed: Duration,
}

/// Outcome of [`Convergence::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct ConvergenceReport {
    /// Every pass, in the order it ran. Never empty.
    pub steps: Vec<Step>,
    /// Whether the last two estimates met the tolerance before `max_n` was
    /// reached.
    pub converged: bool,
}

impl ConvergenceReport {
    /// The estimate from the last pass.
    pub fn estimate(&self) -> f64 {
        self.steps.last().map_or(f64::NAN, |step| step.estimate)
    }

    /// The resolution of the last pass.
    pub fn final_n(&self) -> usize {
        self.steps.last().map_or(0, |step| step.n)
    }

    pub fn total_elapsed(&self) -> Duration {
        self.steps.iter().map(|step| step.elapsed).sum()
    }
}

/// How `n` advances from one pass to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Growth {
    /// `n, n * k, n * k², ...`
    Factor(usize),
    /// `n, n + k, n + 2k, ...`
    Step(usize),
}

impl Growth {
    fn next(self, n: usize) -> Option<usize> {
        match self {
            Self::Factor(k) => n.checked_mul(k),
            Self::Step(k) => n.checked_add(k),
        }
    }
}

/// Settings for the resolution schedule, `start_n` advanced by `growth`
/// after every pass.
///
/// A run stops as soon as `|estimate - previous| < tolerance * max(1,
/// |estimate|)`, or after the last pass whose `n` does not exceed `max_n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence {
    pub start_n: usize,
    pub growth: Growth,
    pub max_n: usize,
    pub tolerance: f64,
    /// Tasks per pass; `None` uses `pool.workers() * TASKS_PER_WORKER`.
    pub num_tasks: Option<usize>,
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            start_n: 10,
            growth: Growth::Factor(10),
            max_n: 1_000_000,
            tolerance: 1e-6,
            num_tasks: None,
        }
    }
}

impl Convergence {
    /// Checks the schedule without running anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `start_n` is zero, a growth
    /// factor is below two or a step is zero, `max_n < start_n`, `tolerance` is not a positive finite
    /// number, or `num_tasks` is `Some(0)`.
    pub fn validate(&self) -> Result<()> {
        if self.start_n == 0 {
            return Err(Error::invalid_config("start_n must be greater than 0"));
        }
        match self.growth {
            Growth::Factor(k) if k < 2 => {
                return Err(Error::invalid_config("growth factor must be at least 2"));
            }
            Growth::Step(0) => {
                return Err(Error::invalid_config("growth step must be greater than 0"));
            }
            _ => {}
        }
        if self.max_n < self.start_n {
            return Err(Error::invalid_config(format!(
                "max_n ({}) must not be below start_n ({})",
                self.max_n, self.start_n
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::invalid_config(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.num_tasks == Some(0) {
            return Err(Error::invalid_config("num_tasks must be greater than 0"));
        }
        Ok(())
    }

    /// The resolutions a run would visit if it never converged early.
    pub fn schedule(&self) -> impl Iterator<Item = usize> + use<> {
        let (growth, max_n) = (self.growth, self.max_n);
        core::iter::successors(Some(self.start_n), move |n| growth.next(*n))
            .take_while(move |n| *n <= max_n)
    }

    /// Integrates at each scheduled resolution on `pool` until two
    /// successive estimates agree within the tolerance.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Convergence::validate`] or from any
    /// pass; earlier steps are discarded in that case.
    pub fn run<E>(&self, trapezoid: &Trapezoid<E>, pool: &WorkerPool) -> Result<ConvergenceReport>
    where
        E: Evaluator + 'static,
    {
        self.run_with(trapezoid, pool, |_| {})
    }

    /// Like [`Convergence::run`], calling `on_step` right after each pass.
    pub fn run_with<E, F>(
        &self,
        trapezoid: &Trapezoid<E>,
        pool: &WorkerPool,
        mut on_step: F,
    ) -> Result<ConvergenceReport>
    where
        E: Evaluator + 'static,
        F: FnMut(&Step),
    {
        self.validate()?;
        let num_tasks = match self.num_tasks {
            Some(tasks) => tasks,
            None => pool
                .workers()
                .checked_mul(TASKS_PER_WORKER)
                .ok_or_else(|| Error::invalid_config("overflow in task count"))?,
        };

        let mut steps: Vec<Step> = Vec::new();
        let mut converged = false;

        for n in self.schedule() {
            let started = Instant::now();
            let estimate = trapezoid.integrate(pool, n, num_tasks)?;
            let elapsed = started.elapsed();

            #[cfg(feature = "tracing")]
            tracing::debug!("n={} estimate={} elapsed={:?}", n, estimate, elapsed);

            let previous = steps.last().map(|step| step.estimate);
            let step = Step {
                n,
                estimate,
                elapsed,
            };
            on_step(&step);
            steps.push(step);

            if let Some(previous) = previous {
                if (estimate - previous).abs() < self.tolerance * estimate.abs().max(1.0) {
                    converged = true;
                    break;
                }
            }
        }

        #[cfg(feature = "tracing")]
        if !converged {
            tracing::warn!(
                "No convergence within tolerance {} up to n={}",
                self.tolerance,
                self.max_n
            );
        }

        Ok(ConvergenceReport { steps, converged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Polynomial;

    #[test]
    fn schedule_grows_geometrically() {
        let schedule: Vec<_> = Convergence::default().schedule().collect();
        assert_eq!(schedule, [10, 100, 1_000, 10_000, 100_000, 1_000_000]);

        let custom = Convergence {
            start_n: 3,
            growth: Growth::Factor(2),
            max_n: 40,
            ..Convergence::default()
        };
        assert_eq!(custom.schedule().collect::<Vec<_>>(), [3, 6, 12, 24]);
    }

    #[test]
    fn schedule_with_fixed_step() {
        let linear = Convergence {
            start_n: 50,
            growth: Growth::Step(50),
            max_n: 220,
            ..Convergence::default()
        };
        assert_eq!(linear.schedule().collect::<Vec<_>>(), [50, 100, 150, 200]);
    }

    #[test]
    fn schedule_stops_on_overflow() {
        let huge = Convergence {
            start_n: usize::MAX / 2,
            growth: Growth::Factor(4),
            max_n: usize::MAX,
            ..Convergence::default()
        };
        assert_eq!(huge.schedule().count(), 1);
    }

    #[test]
    fn converges_on_reference_polynomial() {
        let pool = WorkerPool::new(4).unwrap();
        let trapezoid = Trapezoid::new(Polynomial::reference(), 2.0, 20.0).unwrap();

        let report = Convergence {
            tolerance: 1e-8,
            ..Convergence::default()
        }
        .run(&trapezoid, &pool)
        .unwrap();
        pool.wait().unwrap();

        assert!(report.converged);
        assert!(report.steps.len() >= 2);
        assert!((report.estimate() - 5931.0).abs() < 1e-3);
        assert_eq!(report.final_n(), report.steps.last().unwrap().n);
        assert!(
            report
                .steps
                .windows(2)
                .all(|pair| pair[1].n == pair[0].n * 10)
        );
    }

    #[test]
    fn fixed_step_run_converges() {
        let pool = WorkerPool::new(2).unwrap();
        let trapezoid = Trapezoid::new(Polynomial::reference(), 2.0, 20.0).unwrap();

        let report = Convergence {
            start_n: 50,
            growth: Growth::Step(50),
            max_n: 100_000,
            tolerance: 1e-6,
            num_tasks: Some(8),
        }
        .run(&trapezoid, &pool)
        .unwrap();
        pool.wait().unwrap();

        assert!(report.converged);
        assert!(report.steps.windows(2).all(|pair| pair[1].n == pair[0].n + 50));
        assert!((report.estimate() - 5931.0).abs() < 0.1);
    }

    #[test]
    fn observer_sees_every_step() {
        let pool = WorkerPool::new(2).unwrap();
        let trapezoid = Trapezoid::new(Polynomial::reference(), 2.0, 20.0).unwrap();

        let mut seen = Vec::new();
        let report = Convergence::default()
            .run_with(&trapezoid, &pool, |step| seen.push(*step))
            .unwrap();
        pool.wait().unwrap();

        assert_eq!(seen, report.steps);
    }

    #[test]
    fn reports_non_convergence() {
        let pool = WorkerPool::new(2).unwrap();
        let trapezoid = Trapezoid::new(|x: f64| x.sin() * 1e3, 0.0, 100.0).unwrap();

        let report = Convergence {
            start_n: 2,
            growth: Growth::Factor(2),
            max_n: 16,
            tolerance: 1e-12,
            num_tasks: Some(3),
        }
        .run(&trapezoid, &pool)
        .unwrap();
        pool.wait().unwrap();

        assert!(!report.converged);
        assert_eq!(
            report.steps.iter().map(|s| s.n).collect::<Vec<_>>(),
            [2, 4, 8, 16]
        );
        assert_eq!(report.final_n(), 16);
    }

    #[test]
    fn exact_rule_converges_after_two_passes() {
        let pool = WorkerPool::new(2).unwrap();
        let trapezoid = Trapezoid::new(|x: f64| 3.0 * x - 1.0, -2.0, 2.0).unwrap();

        let report = Convergence::default().run(&trapezoid, &pool).unwrap();
        pool.wait().unwrap();

        assert!(report.converged);
        assert_eq!(report.steps.len(), 2);
        assert!((report.estimate() + 4.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_schedule() {
        let bad = [
            Convergence {
                start_n: 0,
                ..Convergence::default()
            },
            Convergence {
                growth: Growth::Factor(1),
                ..Convergence::default()
            },
            Convergence {
                growth: Growth::Step(0),
                ..Convergence::default()
            },
            Convergence {
                max_n: 5,
                ..Convergence::default()
            },
            Convergence {
                tolerance: 0.0,
                ..Convergence::default()
            },
            Convergence {
                tolerance: f64::NAN,
                ..Convergence::default()
            },
            Convergence {
                num_tasks: Some(0),
                ..Convergence::default()
            },
        ];
        for settings in bad {
            assert!(
                matches!(settings.validate(), Err(Error::InvalidConfig { .. })),
                "{settings:?}"
            );
        }
        assert_eq!(Convergence::default().validate(), Ok(()));
    }
}
