//! # Distance and similarity statistics
//!
//! Functions over histogram bin counts:
//!
//! - [`difference`] measures how differently two equal-shaped histograms are populated, using one
//!   of three [`Metric`]s.
//! - [`coverage_ratio`] is the fraction of bins holding at least one sample.
//! - [`entropy`] is the Shannon entropy of the counts taken as a distribution.
//!
//! Two dimensional histograms are flattened in row-major order before being compared.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt, str::FromStr};

use ndarray::{Array1, ArrayView1, ArrayView2};
use ndarray_stats::EntropyExt;
use serde::{Deserialize, Serialize};

use crate::ErrorKind;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Distance metrics between two histograms `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Number of bins occupied in exactly one of the histograms.
    ///
    /// Normalized by dividing by the number of bins.
    Binary,

    /// Sum of the absolute differences between the bins. Both histograms must hold the same
    /// number of samples.
    ///
    /// Normalized by dividing by the total number of samples in both histograms.
    Single,

    /// Euclidean norm of the bin differences.
    ///
    /// The normalized form is not a scaled Euclidean distance but the variance ratio
    /// `0.5 * var(a - b) / (var(a) + var(b))`, using population variances.
    Squared,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StatsError {
    #[error("Cannot compare bins of different lengths ({0} and {1})")]
    LengthMismatch(usize, usize),

    #[error("Cannot compare bins with different sample totals ({0} and {1})")]
    TotalMismatch(u64, u64),

    #[error("Statistic requested over an empty set of bins")]
    EmptyInput,

    #[error("Entropy is undefined for a distribution with no samples")]
    ZeroDistribution,

    #[error("Unknown metric `{0}`, expected one of binary, single or squared")]
    UnknownMetric(String),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Calculate the distance between two sets of bins using the given metric.
pub fn difference(
    a: ArrayView1<u64>,
    b: ArrayView1<u64>,
    metric: Metric,
    normalized: bool,
) -> Result<f64, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch(a.len(), b.len()));
    }

    if a.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    match metric {
        Metric::Binary => Ok(difference_binary(a, b, normalized)),
        Metric::Single => difference_single(a, b, normalized),
        Metric::Squared => Ok(difference_squared(a, b, normalized)),
    }
}

/// Calculate the distance between two grids of bins, flattened in row-major order.
pub fn difference_2d(
    a: ArrayView2<u64>,
    b: ArrayView2<u64>,
    metric: Metric,
    normalized: bool,
) -> Result<f64, StatsError> {
    if a.dim() != b.dim() {
        return Err(StatsError::LengthMismatch(a.len(), b.len()));
    }

    let flat_a: Array1<u64> = a.iter().copied().collect();
    let flat_b: Array1<u64> = b.iter().copied().collect();

    difference(flat_a.view(), flat_b.view(), metric, normalized)
}

/// Fraction of bins with at least one sample.
pub fn coverage_ratio(bins: ArrayView1<u64>) -> Result<f64, StatsError> {
    if bins.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    let covered = bins.iter().filter(|&&c| c > 0).count();

    Ok(covered as f64 / bins.len() as f64)
}

/// Shannon entropy, in nats, of the bins normalized by their total.
pub fn entropy(bins: ArrayView1<u64>) -> Result<f64, StatsError> {
    if bins.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    let total = bins.sum();
    if total == 0 {
        return Err(StatsError::ZeroDistribution);
    }

    let probs = bins.mapv(|c| c as f64 / total as f64);

    probs.entropy().map_err(|_| StatsError::EmptyInput)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn difference_binary(a: ArrayView1<u64>, b: ArrayView1<u64>, normalized: bool) -> f64 {
    let differing = a
        .iter()
        .zip(b.iter())
        .filter(|&(&x, &y)| (x > 0) != (y > 0))
        .count() as f64;

    if normalized {
        differing / a.len() as f64
    }
    else {
        differing
    }
}

fn difference_single(
    a: ArrayView1<u64>,
    b: ArrayView1<u64>,
    normalized: bool,
) -> Result<f64, StatsError> {
    let sum_a = a.sum();
    let sum_b = b.sum();

    if sum_a != sum_b {
        return Err(StatsError::TotalMismatch(sum_a, sum_b));
    }

    let abs_diff = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| if x > y { x - y } else { y - x })
        .sum::<u64>() as f64;

    // Two empty histograms do not differ
    if normalized && sum_a > 0 {
        Ok(abs_diff / (sum_a + sum_b) as f64)
    }
    else {
        Ok(abs_diff)
    }
}

fn difference_squared(a: ArrayView1<u64>, b: ArrayView1<u64>, normalized: bool) -> f64 {
    let a = a.mapv(|x| x as f64);
    let b = b.mapv(|x| x as f64);
    let diff = &a - &b;

    if normalized {
        let denom = a.var(0.0) + b.var(0.0);

        // Both constant, so their difference is too and has no variance
        if denom == 0.0 {
            return 0.0;
        }

        0.5 * diff.var(0.0) / denom
    }
    else {
        diff.mapv(|d| d * d).sum().sqrt()
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for Metric {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Metric::Binary),
            "single" => Ok(Metric::Single),
            "squared" => Ok(Metric::Squared),
            _ => Err(StatsError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Binary => "binary",
            Metric::Single => "single",
            Metric::Squared => "squared",
        };
        write!(f, "{}", name)
    }
}

impl StatsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StatsError::LengthMismatch(..) | StatsError::TotalMismatch(..) => {
                ErrorKind::Precondition
            }
            StatsError::EmptyInput | StatsError::ZeroDistribution => {
                ErrorKind::StatisticsUndefined
            }
            StatsError::UnknownMetric(_) => ErrorKind::Configuration,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
