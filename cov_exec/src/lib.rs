//! # Coverage library.
//!
//! Behavioural coverage of driving simulator test suites. Telemetry recorded
//! while a vehicle drives a scenario is binned into histograms, whose
//! occupancy gives a coverage score per scenario and across a suite, and
//! whose differences measure how alike two scenario runs behaved.
//!
//! The flow through the library is:
//!
//! - A `RoadProvider` supplies the road centreline for a scenario,
//!   from which a `RoadModel` is built.
//! - A `TelemetrySampler` is fed one `TelemetryFrame` per simulation
//!   tick, and records departure events as the vehicle leaves the road.
//! - At the end of the run the sampler's histograms are captured in a
//!   `ScenarioResult` and pushed into a `SuiteRecord`.
//! - The `SuiteAggregator` sums histograms across the suite and compares
//!   scenarios using the metrics in `stats`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Histogram engine - fixed range counting histograms in one and two dimensions
pub mod histogram;

/// Executable parameters
pub mod params;

/// Telemetry replay - reads recorded runs and feeds them through a sampler
pub mod replay;

/// Road module - centreline geometry, off-road predicate and road providers
pub mod road;

/// Telemetry sampler - accumulates vehicle signals and detects departures
pub mod sampler;

/// Distance, coverage and entropy statistics over histogram counts
pub mod stats;

/// Suite aggregation and scenario comparison
pub mod suite;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The category of an error raised by the library.
///
/// All errors are fatal to the coverage computation of the scenario they arise in, the kind
/// allows callers to report them distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// Invalid construction parameters (road, histogram or sampler configuration).
    Configuration,

    /// An operation was invoked with inputs that break its contract.
    Precondition,

    /// The geometric departure angle search could not complete.
    Geometry,

    /// A statistic was requested that is undefined for the given data.
    StatisticsUndefined,

    /// A collaborator (road provider, telemetry recording) could not be read.
    Io,
}
