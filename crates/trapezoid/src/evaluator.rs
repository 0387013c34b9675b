use crate::error::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// A pure scalar function `f64 -> f64` that can be sampled from many workers
/// at once.
///
/// Implementations must be safe for concurrent invocation and must not rely
/// on call order: the integrator samples disjoint index ranges on different
/// threads and in no particular order.
///
/// Every `Fn(f64) -> f64 + Send + Sync` is an [`Evaluator`], so closures and
/// function items can be passed directly:
///
/// ```
/// use trapezoid::Evaluator;
///
/// let square = |x: f64| x * x;
/// assert_eq!(square.evaluate(3.0), 9.0);
/// ```
pub trait Evaluator: Send + Sync {
    /// Samples the function at `x`.
    fn evaluate(&self, x: f64) -> f64;
}

impl<F> Evaluator for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn evaluate(&self, x: f64) -> f64 {
        self(x)
    }
}

/// A polynomial with real coefficients stored in ascending power order.
///
/// `Polynomial::new(vec![0.5, 3.0, 2.0])` is `2x² + 3x + 0.5`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Creates a polynomial from coefficients in ascending power order.
    ///
    /// An empty coefficient list is the zero polynomial.
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// The polynomial `2x² + 3x + 0.5`. Its integral over `[2, 20]` is
    /// exactly `5931`.
    pub fn reference() -> Self {
        Self::new(vec![0.5, 3.0, 2.0])
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluates `F(b) - F(a)` where `F` is the antiderivative with zero
    /// constant term.
    pub fn antiderivative_between(&self, a: f64, b: f64) -> f64 {
        self.antiderivative(b) - self.antiderivative(a)
    }

    fn antiderivative(&self, x: f64) -> f64 {
        // Horner over c_k / (k + 1), then one extra factor of x.
        self.coefficients
            .iter()
            .enumerate()
            .rev()
            .fold(0.0, |acc, (k, c)| acc * x + c / (k as f64 + 1.0))
            * x
    }
}

impl Evaluator for Polynomial {
    #[inline]
    fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for (power, c) in self.coefficients.iter().enumerate().rev() {
            if *c == 0.0 {
                continue;
            }
            if wrote {
                f.write_str(if *c < 0.0 { " - " } else { " + " })?;
            } else if *c < 0.0 {
                f.write_str("-")?;
            }
            let c = c.abs();
            match power {
                0 => write!(f, "{c}")?,
                1 => write!(f, "{c}x")?,
                _ => write!(f, "{c}x^{power}")?,
            }
            wrote = true;
        }
        if !wrote {
            f.write_str("0")?;
        }
        Ok(())
    }
}

/// Parses a comma-separated coefficient list in ascending power order, e.g.
/// `"0.5,3,2"`.
impl FromStr for Polynomial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::invalid_config("coefficient list is empty"));
        }
        let coefficients = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>()
                    .ok()
                    .filter(|c| c.is_finite())
                    .ok_or_else(|| {
                        Error::invalid_config(format!("invalid coefficient `{part}`"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(coefficients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_evaluators() {
        let f = |x: f64| 2.0 * x + 1.0;
        assert_eq!(f.evaluate(3.0), 7.0);

        fn cube(x: f64) -> f64 {
            x * x * x
        }
        assert_eq!(cube.evaluate(2.0), 8.0);
    }

    #[test]
    fn reference_polynomial_matches_closed_form() {
        let p = Polynomial::reference();
        for x in [-3.0, 0.0, 1.5, 2.0, 20.0] {
            let expected = 2.0 * x * x + 3.0 * x + 0.5;
            assert!((p.evaluate(x) - expected).abs() < 1e-12, "x = {x}");
        }
        assert_eq!(p.degree(), 2);
    }

    #[test]
    fn reference_polynomial_exact_integral() {
        let p = Polynomial::reference();
        assert!((p.antiderivative_between(2.0, 20.0) - 5931.0).abs() < 1e-9);
    }

    #[test]
    fn zero_polynomial() {
        let p = Polynomial::new(Vec::new());
        assert_eq!(p.evaluate(42.0), 0.0);
        assert_eq!(p.antiderivative_between(-1.0, 1.0), 0.0);
        assert_eq!(p.degree(), 0);
        assert_eq!(p.to_string(), "0");
    }

    #[test]
    fn parses_coefficient_list() {
        let p: Polynomial = " 0.5, 3 ,2".parse().unwrap();
        assert_eq!(p, Polynomial::reference());
        assert_eq!(p.to_string(), "2x^2 + 3x + 0.5");

        let q: Polynomial = "-1,0,-4".parse().unwrap();
        assert_eq!(q.to_string(), "-4x^2 - 1");
    }

    #[test]
    fn rejects_bad_coefficients() {
        assert!(matches!(
            "".parse::<Polynomial>(),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            "1,,2".parse::<Polynomial>(),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            "1,x".parse::<Polynomial>(),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            "inf".parse::<Polynomial>(),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
