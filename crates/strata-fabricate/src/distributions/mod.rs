//! Sampling collaborators used by variable expressions.
//!
//! Every function here is a pure draw over parameter vectors: it knows
//! nothing about levels. Parameter vectors are recycled to `n` draws and
//! `n` must be a multiple of every parameter length. Missing parameter
//! values (`None`) produce `Value::Null` for the affected draws.

mod link;
mod sampling;

use rand::RngCore;
use thiserror::Error;

use strata_core::{Column, Value};

pub use link::Link;
pub use sampling::{normal_cdf, sample_binomial, sample_normal, sample_poisson, sample_uniform};

/// Largest trial count or Poisson mean accepted by count draws (2^53, the
/// last integer an `f64` holds exactly).
pub const MAX_COUNT: f64 = 9_007_199_254_740_992.0;

/// Validation failures raised by sampling functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("'{param}' must not be empty")]
    Empty { param: String },
    #[error("N ({n}) is not a multiple of the length of '{param}' ({len})")]
    LengthMismatch { param: String, len: usize, n: usize },
    #[error("'{param}' must be {expected}, got {value}")]
    OutOfRange {
        param: String,
        expected: &'static str,
        value: f64,
    },
    #[error("unknown link function '{0}' (expected identity, logit or probit)")]
    UnknownLink(String),
    #[error("{0}")]
    Invalid(String),
}

/// Check that `n` draws can be taken from a parameter of length `len`.
pub fn check_param_length(param: &str, len: usize, n: usize) -> Result<(), DistributionError> {
    if len == 0 {
        return Err(DistributionError::Empty {
            param: param.to_string(),
        });
    }
    if n % len != 0 {
        return Err(DistributionError::LengthMismatch {
            param: param.to_string(),
            len,
            n,
        });
    }
    Ok(())
}

fn check_n(n: usize) -> Result<(), DistributionError> {
    if n == 0 {
        return Err(DistributionError::Invalid(
            "N must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn finite(param: &str, value: f64) -> Result<f64, DistributionError> {
    if !value.is_finite() {
        return Err(DistributionError::OutOfRange {
            param: param.to_string(),
            expected: "a finite number",
            value,
        });
    }
    Ok(value)
}

fn probability(param: &str, raw: f64, link: Link) -> Result<f64, DistributionError> {
    let p = link.apply(finite(param, raw)?);
    if !(0.0..=1.0).contains(&p) || p.is_nan() {
        return Err(DistributionError::OutOfRange {
            param: param.to_string(),
            expected: "a probability in [0, 1]",
            value: raw,
        });
    }
    Ok(p)
}

fn non_negative(param: &str, value: f64) -> Result<f64, DistributionError> {
    let value = finite(param, value)?;
    if value < 0.0 {
        return Err(DistributionError::OutOfRange {
            param: param.to_string(),
            expected: "non-negative",
            value,
        });
    }
    Ok(value)
}

/// Draw 0/1 outcomes with success probability `prob` after `link`.
pub fn draw_binary(
    prob: &[Option<f64>],
    n: usize,
    link: Link,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    check_param_length("prob", prob.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        match prob[i % prob.len()] {
            None => out.push(Value::Null),
            Some(raw) => {
                let p = probability("prob", raw, link)?;
                out.push(Value::Int(i64::from(sample_uniform(rng) < p)));
            }
        }
    }
    Ok(out)
}

/// Draw the number of successes out of `trials` attempts.
pub fn draw_binomial(
    prob: &[Option<f64>],
    trials: &[Option<f64>],
    n: usize,
    link: Link,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    check_param_length("prob", prob.len(), n)?;
    check_param_length("trials", trials.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(raw), Some(trials)) = (prob[i % prob.len()], trials[i % trials.len()]) else {
            out.push(Value::Null);
            continue;
        };
        let p = probability("prob", raw, link)?;
        if !(0.0..=MAX_COUNT).contains(&trials) || trials.fract() != 0.0 {
            return Err(DistributionError::OutOfRange {
                param: "trials".to_string(),
                expected: "an integer between 0 and 2^53",
                value: trials,
            });
        }
        let successes = sample_binomial(trials as u64, p, rng);
        out.push(Value::Int(successes as i64));
    }
    Ok(out)
}

/// Draw Poisson counts with the given mean.
pub fn draw_count(
    mean: &[Option<f64>],
    n: usize,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    check_param_length("mean", mean.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        match mean[i % mean.len()] {
            None => out.push(Value::Null),
            Some(lambda) => {
                let lambda = non_negative("mean", lambda)?;
                if lambda > MAX_COUNT {
                    return Err(DistributionError::OutOfRange {
                        param: "mean".to_string(),
                        expected: "at most 2^53",
                        value: lambda,
                    });
                }
                out.push(Value::Int(sample_poisson(lambda, rng) as i64));
            }
        }
    }
    Ok(out)
}

/// Draw categories with fixed probabilities.
///
/// Probabilities are normalized to sum to one. Draws are category labels
/// when `categories` is given, 1-based category numbers otherwise.
pub fn draw_categorical(
    prob: &[f64],
    n: usize,
    categories: Option<&[String]>,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    if prob.is_empty() {
        return Err(DistributionError::Empty {
            param: "prob".to_string(),
        });
    }
    for value in prob {
        non_negative("prob", *value)?;
    }
    let total: f64 = prob.iter().sum();
    if total <= 0.0 {
        return Err(DistributionError::Invalid(
            "'prob' must contain at least one positive weight".to_string(),
        ));
    }
    if let Some(categories) = categories {
        if categories.len() != prob.len() {
            return Err(DistributionError::Invalid(format!(
                "{} categories given for {} probabilities",
                categories.len(),
                prob.len()
            )));
        }
    }

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let target = sample_uniform(rng) * total;
        let mut cumulative = 0.0;
        let mut chosen = prob.len() - 1;
        for (idx, weight) in prob.iter().enumerate() {
            cumulative += weight;
            if target < cumulative {
                chosen = idx;
                break;
            }
        }
        out.push(match categories {
            Some(categories) => Value::Text(categories[chosen].clone()),
            None => Value::Int(chosen as i64 + 1),
        });
    }
    Ok(out)
}

/// Bucket a latent variable into ordered categories.
///
/// A value `x` falls into bucket `i` when `breaks[i] < x <= breaks[i + 1]`.
/// This draw is deterministic and does not consume randomness.
pub fn draw_ordered(
    x: &[Option<f64>],
    breaks: &[f64],
    labels: Option<&[String]>,
) -> Result<Column, DistributionError> {
    if breaks.len() < 2 {
        return Err(DistributionError::Invalid(
            "'breaks' needs at least two values".to_string(),
        ));
    }
    if breaks.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(DistributionError::Invalid(
            "'breaks' must be strictly increasing".to_string(),
        ));
    }
    if let Some(labels) = labels {
        if labels.len() != breaks.len() - 1 {
            return Err(DistributionError::Invalid(format!(
                "{} labels given for {} buckets",
                labels.len(),
                breaks.len() - 1
            )));
        }
    }

    let mut out = Vec::with_capacity(x.len());
    for value in x {
        let Some(value) = value else {
            out.push(Value::Null);
            continue;
        };
        let bucket = breaks
            .windows(2)
            .position(|pair| pair[0] < *value && *value <= pair[1])
            .ok_or_else(|| DistributionError::OutOfRange {
                param: "x".to_string(),
                expected: "inside the range covered by 'breaks'",
                value: *value,
            })?;
        out.push(match labels {
            Some(labels) => Value::Text(labels[bucket].clone()),
            None => Value::Int(bucket as i64 + 1),
        });
    }
    Ok(out)
}

/// Draw from a normal distribution.
pub fn draw_normal(
    mean: &[Option<f64>],
    sd: &[Option<f64>],
    n: usize,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    check_param_length("mean", mean.len(), n)?;
    check_param_length("sd", sd.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(mean), Some(sd)) = (mean[i % mean.len()], sd[i % sd.len()]) else {
            out.push(Value::Null);
            continue;
        };
        let mean = finite("mean", mean)?;
        let sd = non_negative("sd", sd)?;
        out.push(Value::Float(sample_normal(mean, sd, rng)));
    }
    Ok(out)
}

/// Draw from a continuous uniform distribution on `[min, max)`.
pub fn draw_uniform(
    min: &[Option<f64>],
    max: &[Option<f64>],
    n: usize,
    rng: &mut dyn RngCore,
) -> Result<Column, DistributionError> {
    check_n(n)?;
    check_param_length("min", min.len(), n)?;
    check_param_length("max", max.len(), n)?;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let (Some(lo), Some(hi)) = (min[i % min.len()], max[i % max.len()]) else {
            out.push(Value::Null);
            continue;
        };
        let (lo, hi) = (finite("min", lo)?, finite("max", hi)?);
        if lo > hi {
            return Err(DistributionError::Invalid(format!(
                "'min' ({lo}) must not exceed 'max' ({hi})"
            )));
        }
        out.push(Value::Float(lo + (hi - lo) * sample_uniform(rng)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn param_length_must_divide_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = draw_binary(&[Some(0.1), Some(0.2), Some(0.3)], 4, Link::Identity, &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            DistributionError::LengthMismatch {
                param: "prob".to_string(),
                len: 3,
                n: 4
            }
        );
    }

    #[test]
    fn identity_link_rejects_out_of_range_probabilities() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = draw_binary(&[Some(1.5)], 2, Link::Identity, &mut rng).unwrap_err();
        assert!(matches!(err, DistributionError::OutOfRange { .. }));
    }

    #[test]
    fn logit_link_accepts_any_real() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let draws = draw_binary(&[Some(40.0), Some(-40.0)], 4, Link::Logit, &mut rng)
            .expect("logit draws");
        assert_eq!(
            draws,
            vec![Value::Int(1), Value::Int(0), Value::Int(1), Value::Int(0)]
        );
    }

    #[test]
    fn missing_parameters_produce_nulls() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let draws = draw_count(&[Some(2.0), None], 4, &mut rng).expect("count draws");
        assert!(draws[1].is_null());
        assert!(draws[3].is_null());
        assert!(draws[0].as_i64().is_some());
    }

    #[test]
    fn ordered_draw_buckets_latent_values() {
        let labels = vec!["low".to_string(), "high".to_string()];
        let draws = draw_ordered(
            &[Some(-1.0), Some(0.0), Some(2.0)],
            &[-10.0, 0.0, 10.0],
            Some(&labels),
        )
        .expect("ordered draws");
        assert_eq!(
            draws,
            vec![Value::from("low"), Value::from("low"), Value::from("high")]
        );
    }

    #[test]
    fn categorical_respects_zero_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let draws = draw_categorical(&[0.0, 1.0, 0.0], 20, None, &mut rng).expect("draws");
        assert!(draws.iter().all(|value| *value == Value::Int(2)));
    }

    #[test]
    fn binomial_requires_integer_trials() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = draw_binomial(&[Some(0.5)], &[Some(2.5)], 1, Link::Identity, &mut rng)
            .unwrap_err();
        assert!(matches!(err, DistributionError::OutOfRange { .. }));
    }

    #[test]
    fn non_finite_parameters_are_out_of_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let out_of_range = |result: Result<Column, DistributionError>| {
            matches!(result, Err(DistributionError::OutOfRange { .. }))
        };

        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(out_of_range(draw_binary(&[Some(value)], 2, Link::Logit, &mut rng)));
            assert!(out_of_range(draw_count(&[Some(value)], 2, &mut rng)));
            assert!(out_of_range(draw_normal(&[Some(value)], &[Some(1.0)], 2, &mut rng)));
            assert!(out_of_range(draw_normal(&[Some(0.0)], &[Some(value)], 2, &mut rng)));
            assert!(out_of_range(draw_uniform(&[Some(0.0)], &[Some(value)], 2, &mut rng)));
            assert!(out_of_range(draw_binomial(
                &[Some(0.5)],
                &[Some(value)],
                2,
                Link::Identity,
                &mut rng
            )));
        }
        assert!(out_of_range(draw_categorical(&[1.0, f64::INFINITY], 2, None, &mut rng)));
    }

    #[test]
    fn huge_counts_are_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let draws = draw_binomial(&[Some(0.5)], &[Some(1e13)], 2, Link::Identity, &mut rng)
            .expect("binomial draws");
        for draw in &draws {
            let successes = draw.as_i64().expect("integer draw");
            assert!((0..=10_000_000_000_000).contains(&successes));
        }
        let draws = draw_count(&[Some(1e12)], 2, &mut rng).expect("count draws");
        assert!(draws.iter().all(|draw| draw.as_i64().is_some_and(|v| v > 0)));

        assert!(matches!(
            draw_count(&[Some(1e300)], 2, &mut rng),
            Err(DistributionError::OutOfRange { .. })
        ));
        assert!(matches!(
            draw_binomial(&[Some(0.5)], &[Some(1e300)], 2, Link::Identity, &mut rng),
            Err(DistributionError::OutOfRange { .. })
        ));
    }
}
