//! # Histogram Engine
//!
//! Counting histograms with a fixed number of equal width bins over a fixed range. Bin `i` covers
//! `[lo + i*w, lo + (i+1)*w)` where `w = (hi - lo) / num_bins`, except the last bin which also
//! includes `hi`. Samples outside `[lo, hi]` (and NaNs) are dropped, they are neither clamped
//! into the edge bins nor reported.
//!
//! Two dimensional histograms are stored with the x bin as the row and the y bin as the column,
//! so `counts[[x_bin, y_bin]]`. When flattened for comparison they are read in row-major order.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    stats::{self, Metric, StatsError},
    ErrorKind,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Operations shared by the one and two dimensional histograms.
pub trait Histogram: Clone {
    /// The bin counts in row-major order.
    fn flat_counts(&self) -> Array1<u64>;

    /// Add the counts of `other` to this histogram.
    ///
    /// Both histograms must have the same bins.
    fn accumulate(&mut self, other: &Self) -> Result<(), HistogramError>;

    /// Total number of samples counted.
    fn total(&self) -> u64 {
        self.flat_counts().sum()
    }

    /// Fraction of bins holding at least one sample.
    fn coverage(&self) -> f64 {
        let counts = self.flat_counts();
        counts.iter().filter(|&&c| c > 0).count() as f64 / counts.len() as f64
    }

    /// Shannon entropy of the bin counts, see [`stats::entropy`].
    fn entropy(&self) -> Result<f64, StatsError> {
        stats::entropy(self.flat_counts().view())
    }

    /// Distance between this histogram and `other`, see [`stats::difference`].
    fn difference(&self, other: &Self, metric: Metric, normalized: bool) -> Result<f64, StatsError> {
        stats::difference(
            self.flat_counts().view(),
            other.flat_counts().view(),
            metric,
            normalized,
        )
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The bins along one axis of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    num_bins: usize,
    lo: f64,
    hi: f64,
}

/// A one dimensional counting histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1d {
    pub spec: BinSpec,
    pub counts: Array1<u64>,
}

/// A two dimensional counting histogram, indexed `[[x_bin, y_bin]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2d {
    pub x_spec: BinSpec,
    pub y_spec: BinSpec,
    pub counts: Array2<u64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HistogramError {
    #[error("A histogram needs at least one bin")]
    NoBins,

    #[error("Invalid histogram range [{0}, {1}], the upper bound must be finite and above the lower bound")]
    InvalidRange(f64, f64),

    #[error("Expected the same number of x and y samples, found {0} and {1}")]
    SampleLengthMismatch(usize, usize),

    #[error("Cannot combine histograms with different bins")]
    BinMismatch,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Bin `samples` into `num_bins` bins over `range`.
pub fn histogram_1d(
    samples: &[f64],
    num_bins: usize,
    range: (f64, f64),
) -> Result<Histogram1d, HistogramError> {
    let spec = BinSpec::new(num_bins, range)?;
    Ok(Histogram1d::from_samples(spec, samples.iter().copied()))
}

/// Bin the pairs `(xs[i], ys[i])` into a `num_bins` by `num_bins` grid.
pub fn histogram_2d(
    xs: &[f64],
    ys: &[f64],
    num_bins: usize,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Result<Histogram2d, HistogramError> {
    if xs.len() != ys.len() {
        return Err(HistogramError::SampleLengthMismatch(xs.len(), ys.len()));
    }

    let x_spec = BinSpec::new(num_bins, x_range)?;
    let y_spec = BinSpec::new(num_bins, y_range)?;

    Ok(Histogram2d::from_samples(
        x_spec,
        y_spec,
        xs.iter().copied().zip(ys.iter().copied()),
    ))
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BinSpec {
    pub fn new(num_bins: usize, range: (f64, f64)) -> Result<Self, HistogramError> {
        let (lo, hi) = range;

        if num_bins == 0 {
            return Err(HistogramError::NoBins);
        }

        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(HistogramError::InvalidRange(lo, hi));
        }

        Ok(Self { num_bins, lo, hi })
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Width of each bin
    pub fn width(&self) -> f64 {
        (self.hi - self.lo) / self.num_bins as f64
    }

    /// Get the bin a value falls into, or `None` if it is outside the range.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        // Negated comparison so NaN is dropped too
        if !(value >= self.lo && value <= self.hi) {
            return None;
        }

        let index = ((value - self.lo) / self.width()).floor() as usize;

        // The last bin is closed, and rounding can push values just below hi over the edge
        Some(index.min(self.num_bins - 1))
    }
}

impl Histogram1d {
    /// An empty histogram
    pub fn zeros(spec: BinSpec) -> Self {
        Self {
            spec,
            counts: Array1::zeros(spec.num_bins),
        }
    }

    pub fn from_samples<I>(spec: BinSpec, samples: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut hist = Self::zeros(spec);

        for index in samples.into_iter().filter_map(|s| spec.bin_index(s)) {
            hist.counts[index] += 1;
        }

        hist
    }
}

impl Histogram for Histogram1d {
    fn flat_counts(&self) -> Array1<u64> {
        self.counts.clone()
    }

    fn accumulate(&mut self, other: &Self) -> Result<(), HistogramError> {
        if self.spec != other.spec {
            return Err(HistogramError::BinMismatch);
        }

        self.counts += &other.counts;
        Ok(())
    }
}

impl Histogram2d {
    /// An empty histogram
    pub fn zeros(x_spec: BinSpec, y_spec: BinSpec) -> Self {
        Self {
            x_spec,
            y_spec,
            counts: Array2::zeros((x_spec.num_bins, y_spec.num_bins)),
        }
    }

    /// Build a histogram from `(x, y)` sample pairs. A pair is dropped if either value is out of
    /// range.
    pub fn from_samples<I>(x_spec: BinSpec, y_spec: BinSpec, samples: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut hist = Self::zeros(x_spec, y_spec);

        for (x, y) in samples {
            if let (Some(i), Some(j)) = (x_spec.bin_index(x), y_spec.bin_index(y)) {
                hist.counts[[i, j]] += 1;
            }
        }

        hist
    }
}

impl Histogram for Histogram2d {
    fn flat_counts(&self) -> Array1<u64> {
        // Logical iteration order of ndarray is row-major whatever the memory layout
        self.counts.iter().copied().collect()
    }

    fn accumulate(&mut self, other: &Self) -> Result<(), HistogramError> {
        if self.x_spec != other.x_spec || self.y_spec != other.y_spec {
            return Err(HistogramError::BinMismatch);
        }

        self.counts += &other.counts;
        Ok(())
    }
}

impl HistogramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistogramError::NoBins | HistogramError::InvalidRange(..) => ErrorKind::Configuration,
            HistogramError::SampleLengthMismatch(..) | HistogramError::BinMismatch => {
                ErrorKind::Precondition
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
