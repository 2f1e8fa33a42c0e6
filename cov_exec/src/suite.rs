//! # Suite aggregation
//!
//! A [`SuiteRecord`] holds the result of every scenario run in a suite, alongside a separate
//! [`SuiteSummary`] of suite-wide results. The [`SuiteAggregator`] works over an inclusive range
//! of scenarios in the record, summing their histograms into suite-wide coverage and entropy
//! figures, and comparing a baseline scenario against every scenario in the range.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, fmt, str::FromStr};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    histogram::{Histogram, Histogram1d, Histogram2d, HistogramError},
    sampler::{DepartureEvent, TelemetrySampler},
    stats::{Metric, StatsError},
    ErrorKind,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A histogram feature which can be looked up in a scenario and summarised across the suite.
pub trait SuiteFeature: Copy + Ord + fmt::Display {
    type Hist: Histogram;

    /// Get this feature from a scenario, if it has been recorded.
    fn of(self, scenario: &ScenarioResult) -> Option<&FeatureStats<Self::Hist>>;

    /// Store the suite-wide stats of this feature in the summary.
    fn store(self, summary: &mut SuiteSummary, stats: FeatureStats<Self::Hist>);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A histogram with its coverage and entropy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats<H> {
    pub histogram: H,

    /// Fraction of bins with at least one sample
    pub coverage: f64,

    /// Entropy of the histogram, `None` if it holds no samples
    pub entropy: Option<f64>,
}

/// The binned behaviour of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub id: String,

    pub num_samples: usize,

    pub features_1d: BTreeMap<Feature1d, FeatureStats<Histogram1d>>,

    pub features_2d: BTreeMap<Feature2d, FeatureStats<Histogram2d>>,

    pub departures: Vec<DepartureEvent>,
}

/// The distances between a baseline scenario and each scenario in the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub baseline: String,
    pub feature: String,
    pub metric: Metric,
    pub normalized: bool,
    pub distances: BTreeMap<String, f64>,
}

/// Suite-wide results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub features_1d: BTreeMap<Feature1d, FeatureStats<Histogram1d>>,

    pub features_2d: BTreeMap<Feature2d, FeatureStats<Histogram2d>>,

    pub comparisons: Vec<Comparison>,
}

/// Every scenario result in a suite, plus the suite-wide summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteRecord {
    pub scenarios: Vec<ScenarioResult>,

    pub summary: SuiteSummary,
}

/// Aggregates and compares the scenarios with indices `first..=last` in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteAggregator {
    first: usize,
    last: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One dimensional histogram features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature1d {
    Speed,
    Steering,
    Throttle,
    Brake,
    Distance,
}

/// Two dimensional histogram features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature2d {
    /// Steering input (x) against speed (y)
    SteeringSpeed,

    /// Speed at departure (x) against departure angle (y)
    DepartureSpeedAngle,
}

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("The suite has no scenarios")]
    EmptySuite,

    #[error("Invalid scenario range {0}..={1} for a suite of {2} scenarios")]
    InvalidRange(usize, usize, usize),

    #[error("Scenario {0} has no {1} histogram")]
    MissingFeature(String, String),

    #[error("Scenario {0} is not in the suite")]
    UnknownScenario(String),

    #[error("Unknown feature `{0}`")]
    UnknownFeature(String),

    #[error("Cannot combine the {0} histogram of scenario {1}: {2}")]
    Histogram(String, String, HistogramError),

    #[error("Cannot compare the {0} histogram of scenario {1}: {2}")]
    Stats(String, String, StatsError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<H: Histogram> FeatureStats<H> {
    /// Calculate the coverage and entropy of a histogram.
    pub fn new(histogram: H) -> Self {
        let entropy = match histogram.entropy() {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("No entropy for histogram: {}", e);
                None
            }
        };

        Self {
            coverage: histogram.coverage(),
            entropy,
            histogram,
        }
    }
}

impl ScenarioResult {
    /// Capture the binned behaviour of a finished run.
    pub fn from_sampler(id: &str, sampler: &TelemetrySampler) -> Self {
        let features_1d = Feature1d::ALL
            .iter()
            .map(|&f| {
                let hist = match f {
                    Feature1d::Speed => sampler.speed_bins(),
                    Feature1d::Steering => sampler.steering_bins(),
                    Feature1d::Throttle => sampler.throttle_bins(),
                    Feature1d::Brake => sampler.brake_bins(),
                    Feature1d::Distance => sampler.distance_bins(),
                };
                (f, FeatureStats::new(hist))
            })
            .collect();

        let features_2d = Feature2d::ALL
            .iter()
            .map(|&f| {
                let hist = match f {
                    Feature2d::SteeringSpeed => sampler.steering_speed_bins(),
                    Feature2d::DepartureSpeedAngle => sampler.departure_speed_angle_bins(),
                };
                (f, FeatureStats::new(hist))
            })
            .collect();

        Self {
            id: id.to_string(),
            num_samples: sampler.num_samples(),
            features_1d,
            features_2d,
            departures: sampler.departures().to_vec(),
        }
    }
}

impl SuiteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scenario: ScenarioResult) {
        self.scenarios.push(scenario);
    }

    /// Get a scenario by its id.
    pub fn scenario(&self, id: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.id == id)
    }
}

impl SuiteAggregator {
    /// Aggregate over the scenarios with indices `first..=last`.
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Aggregate over every scenario in the record.
    pub fn whole_suite(record: &SuiteRecord) -> Result<Self, SuiteError> {
        match record.scenarios.len() {
            0 => Err(SuiteError::EmptySuite),
            n => Ok(Self::new(0, n - 1)),
        }
    }

    /// Sum a one dimensional feature across the suite and store its coverage and entropy in the
    /// summary.
    pub fn aggregate_1d(
        &self,
        record: &mut SuiteRecord,
        feature: Feature1d,
    ) -> Result<FeatureStats<Histogram1d>, SuiteError> {
        self.aggregate(record, feature)
    }

    /// Sum a two dimensional feature across the suite and store its coverage and entropy in the
    /// summary.
    pub fn aggregate_2d(
        &self,
        record: &mut SuiteRecord,
        feature: Feature2d,
    ) -> Result<FeatureStats<Histogram2d>, SuiteError> {
        self.aggregate(record, feature)
    }

    /// Sum a feature across the suite.
    pub fn aggregate<F: SuiteFeature>(
        &self,
        record: &mut SuiteRecord,
        feature: F,
    ) -> Result<FeatureStats<F::Hist>, SuiteError> {
        let mut scenarios = self.scenarios(record)?.iter();

        // The range is never empty
        let first = scenarios.next().ok_or(SuiteError::EmptySuite)?;
        let mut total = Self::feature_of(first, feature)?.histogram.clone();

        for scenario in scenarios {
            let hist = &Self::feature_of(scenario, feature)?.histogram;

            total.accumulate(hist).map_err(|e| {
                SuiteError::Histogram(feature.to_string(), scenario.id.clone(), e)
            })?;
        }

        let stats = FeatureStats::new(total);

        info!(
            "Suite {} coverage: {:.3}, entropy: {}",
            feature,
            stats.coverage,
            stats
                .entropy
                .map(|e| format!("{:.3}", e))
                .unwrap_or_else(|| String::from("undefined"))
        );

        feature.store(&mut record.summary, stats.clone());

        Ok(stats)
    }

    /// Compare the baseline scenario's feature against the same feature of every scenario in the
    /// range, including the baseline itself.
    ///
    /// The distances are returned by scenario id, and stored as a [`Comparison`] in the summary.
    pub fn compare_one_to_all<F: SuiteFeature>(
        &self,
        record: &mut SuiteRecord,
        baseline_id: &str,
        feature: F,
        metric: Metric,
        normalized: bool,
    ) -> Result<BTreeMap<String, f64>, SuiteError> {
        let baseline = record
            .scenario(baseline_id)
            .ok_or_else(|| SuiteError::UnknownScenario(baseline_id.to_string()))?;
        let baseline_hist = &Self::feature_of(baseline, feature)?.histogram;

        let mut distances = BTreeMap::new();

        for scenario in self.scenarios(record)? {
            let hist = &Self::feature_of(scenario, feature)?.histogram;

            let dist = baseline_hist
                .difference(hist, metric, normalized)
                .map_err(|e| SuiteError::Stats(feature.to_string(), scenario.id.clone(), e))?;

            distances.insert(scenario.id.clone(), dist);
        }

        info!(
            "Compared {} of scenario {} to {} scenarios ({} metric)",
            feature,
            baseline_id,
            distances.len(),
            metric
        );

        record.summary.comparisons.push(Comparison {
            baseline: baseline_id.to_string(),
            feature: feature.to_string(),
            metric,
            normalized,
            distances: distances.clone(),
        });

        Ok(distances)
    }

    /// The scenarios in this aggregator's range.
    fn scenarios<'a>(&self, record: &'a SuiteRecord) -> Result<&'a [ScenarioResult], SuiteError> {
        let len = record.scenarios.len();

        if len == 0 {
            return Err(SuiteError::EmptySuite);
        }

        if self.first > self.last || self.last >= len {
            return Err(SuiteError::InvalidRange(self.first, self.last, len));
        }

        Ok(&record.scenarios[self.first..=self.last])
    }

    fn feature_of<F: SuiteFeature>(
        scenario: &ScenarioResult,
        feature: F,
    ) -> Result<&FeatureStats<F::Hist>, SuiteError> {
        feature
            .of(scenario)
            .ok_or_else(|| SuiteError::MissingFeature(scenario.id.clone(), feature.to_string()))
    }
}

impl Feature1d {
    pub const ALL: [Feature1d; 5] = [
        Feature1d::Speed,
        Feature1d::Steering,
        Feature1d::Throttle,
        Feature1d::Brake,
        Feature1d::Distance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature1d::Speed => "speed",
            Feature1d::Steering => "steering",
            Feature1d::Throttle => "throttle",
            Feature1d::Brake => "brake",
            Feature1d::Distance => "distance",
        }
    }
}

impl Feature2d {
    pub const ALL: [Feature2d; 2] = [Feature2d::SteeringSpeed, Feature2d::DepartureSpeedAngle];

    pub fn name(&self) -> &'static str {
        match self {
            Feature2d::SteeringSpeed => "steering_speed",
            Feature2d::DepartureSpeedAngle => "departure_speed_angle",
        }
    }
}

impl SuiteFeature for Feature1d {
    type Hist = Histogram1d;

    fn of(self, scenario: &ScenarioResult) -> Option<&FeatureStats<Histogram1d>> {
        scenario.features_1d.get(&self)
    }

    fn store(self, summary: &mut SuiteSummary, stats: FeatureStats<Histogram1d>) {
        summary.features_1d.insert(self, stats);
    }
}

impl SuiteFeature for Feature2d {
    type Hist = Histogram2d;

    fn of(self, scenario: &ScenarioResult) -> Option<&FeatureStats<Histogram2d>> {
        scenario.features_2d.get(&self)
    }

    fn store(self, summary: &mut SuiteSummary, stats: FeatureStats<Histogram2d>) {
        summary.features_2d.insert(self, stats);
    }
}

impl fmt::Display for Feature1d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Feature2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Feature1d {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| SuiteError::UnknownFeature(s.to_string()))
    }
}

impl FromStr for Feature2d {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| SuiteError::UnknownFeature(s.to_string()))
    }
}

impl SuiteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SuiteError::EmptySuite
            | SuiteError::InvalidRange(..)
            | SuiteError::MissingFeature(..)
            | SuiteError::UnknownScenario(_) => ErrorKind::Precondition,
            SuiteError::UnknownFeature(_) => ErrorKind::Configuration,
            SuiteError::Histogram(_, _, e) => e.kind(),
            SuiteError::Stats(_, _, e) => e.kind(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::histogram::{histogram_1d, histogram_2d};
    use ndarray::arr1;

    fn scenario(id: &str, steering: &[f64], speed: &[f64]) -> ScenarioResult {
        let mut features_1d = BTreeMap::new();
        features_1d.insert(
            Feature1d::Steering,
            FeatureStats::new(histogram_1d(steering, 4, (-1.0, 1.0)).unwrap()),
        );
        features_1d.insert(
            Feature1d::Speed,
            FeatureStats::new(histogram_1d(speed, 4, (0.0, 100.0)).unwrap()),
        );

        let mut features_2d = BTreeMap::new();
        features_2d.insert(
            Feature2d::SteeringSpeed,
            FeatureStats::new(histogram_2d(steering, speed, 4, (-1.0, 1.0), (0.0, 100.0)).unwrap()),
        );

        ScenarioResult {
            id: id.to_string(),
            num_samples: steering.len(),
            features_1d,
            features_2d,
            departures: Vec::new(),
        }
    }

    fn suite() -> SuiteRecord {
        let mut record = SuiteRecord::new();
        record.push(scenario("97", &[-0.9, -0.4], &[10.0, 30.0]));
        record.push(scenario("98", &[-0.9, 0.9], &[10.0, 90.0]));
        record.push(scenario("99", &[0.1, 0.2], &[60.0, 60.0]));
        record
    }

    #[test]
    fn test_single_scenario_identity() -> Result<(), SuiteError> {
        let mut record = suite();
        let original = record.scenarios[1].clone();

        let agg = SuiteAggregator::new(1, 1);
        let steering = agg.aggregate_1d(&mut record, Feature1d::Steering)?;
        let steering_speed = agg.aggregate_2d(&mut record, Feature2d::SteeringSpeed)?;

        assert_eq!(steering, original.features_1d[&Feature1d::Steering]);
        assert_eq!(steering_speed, original.features_2d[&Feature2d::SteeringSpeed]);

        Ok(())
    }

    #[test]
    fn test_aggregate() -> Result<(), SuiteError> {
        let mut record = suite();

        let agg = SuiteAggregator::whole_suite(&record)?;
        let steering = agg.aggregate_1d(&mut record, Feature1d::Steering)?;

        assert_eq!(steering.histogram.counts, arr1(&[2u64, 1, 2, 1]));
        assert_eq!(steering.coverage, 1.0);
        assert!(steering.entropy.is_some());

        let steering_speed = agg.aggregate_2d(&mut record, Feature2d::SteeringSpeed)?;
        assert_eq!(steering_speed.histogram.total(), 6);
        assert_eq!(steering_speed.histogram.counts[[0, 0]], 2);
        assert_eq!(steering_speed.coverage, 4.0 / 16.0);

        // Results are stored in the summary, not alongside the scenarios
        assert_eq!(record.summary.features_1d[&Feature1d::Steering], steering);
        assert_eq!(record.summary.features_2d[&Feature2d::SteeringSpeed], steering_speed);
        assert_eq!(record.scenarios.len(), 3);

        // Partial range
        let steering = SuiteAggregator::new(0, 1).aggregate_1d(&mut record, Feature1d::Steering)?;
        assert_eq!(steering.histogram.counts, arr1(&[2u64, 1, 0, 1]));
        assert_eq!(steering.coverage, 0.75);

        Ok(())
    }

    #[test]
    fn test_aggregate_errors() {
        let mut record = suite();

        assert!(matches!(
            SuiteAggregator::new(0, 3).aggregate_1d(&mut record, Feature1d::Steering),
            Err(SuiteError::InvalidRange(0, 3, 3))
        ));
        assert!(matches!(
            SuiteAggregator::new(2, 1).aggregate_1d(&mut record, Feature1d::Steering),
            Err(SuiteError::InvalidRange(2, 1, 3))
        ));

        let err = SuiteAggregator::new(0, 2)
            .aggregate_1d(&mut record, Feature1d::Throttle)
            .unwrap_err();
        assert!(matches!(err, SuiteError::MissingFeature(ref id, ref f) if id == "97" && f == "throttle"));
        assert_eq!(err.kind(), ErrorKind::Precondition);

        assert!(matches!(
            SuiteAggregator::whole_suite(&SuiteRecord::new()),
            Err(SuiteError::EmptySuite)
        ));
    }

    #[test]
    fn test_empty_aggregate_has_no_entropy() -> Result<(), SuiteError> {
        let mut record = SuiteRecord::new();
        record.push(scenario("1", &[], &[]));
        record.push(scenario("2", &[5.0], &[500.0]));

        let stats =
            SuiteAggregator::whole_suite(&record)?.aggregate_1d(&mut record, Feature1d::Steering)?;

        assert_eq!(stats.coverage, 0.0);
        assert_eq!(stats.entropy, None);

        Ok(())
    }

    #[test]
    fn test_compare_one_to_all() -> Result<(), SuiteError> {
        let mut record = suite();
        let agg = SuiteAggregator::whole_suite(&record)?;

        let distances =
            agg.compare_one_to_all(&mut record, "97", Feature1d::Steering, Metric::Binary, true)?;

        // 97 occupies bins 0 and 1, 98 bins 0 and 3, 99 bin 2
        assert_eq!(distances["97"], 0.0);
        assert_eq!(distances["98"], 0.5);
        assert_eq!(distances["99"], 0.75);

        let distances =
            agg.compare_one_to_all(&mut record, "97", Feature2d::SteeringSpeed, Metric::Single, false)?;
        assert_eq!(distances["97"], 0.0);
        assert_eq!(distances["98"], 2.0);

        assert_eq!(record.summary.comparisons.len(), 2);
        assert_eq!(record.summary.comparisons[0].baseline, "97");
        assert_eq!(record.summary.comparisons[0].feature, "steering");
        assert_eq!(record.summary.comparisons[1].feature, "steering_speed");

        Ok(())
    }

    #[test]
    fn test_compare_errors() {
        let mut record = suite();
        record.push(scenario("100", &[0.5], &[50.0]));
        let agg = SuiteAggregator::whole_suite(&record).unwrap();

        assert!(matches!(
            agg.compare_one_to_all(&mut record, "42", Feature1d::Speed, Metric::Binary, true),
            Err(SuiteError::UnknownScenario(_))
        ));

        // Scenario 100 has fewer samples than the baseline
        let err = agg
            .compare_one_to_all(&mut record, "97", Feature1d::Speed, Metric::Single, true)
            .unwrap_err();
        assert!(matches!(err, SuiteError::Stats(_, ref id, StatsError::TotalMismatch(2, 1)) if id == "100"));
        assert_eq!(err.kind(), ErrorKind::Precondition);

        assert!(record.summary.comparisons.is_empty());
    }

    #[test]
    fn test_feature_names() {
        assert_eq!("brake".parse::<Feature1d>().unwrap(), Feature1d::Brake);
        assert_eq!(
            "departure_speed_angle".parse::<Feature2d>().unwrap(),
            Feature2d::DepartureSpeedAngle
        );
        assert!("yaw".parse::<Feature1d>().is_err());
        assert_eq!(Feature2d::SteeringSpeed.to_string(), "steering_speed");
    }
}
