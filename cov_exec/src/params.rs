//! # Coverage Executable Parameters
//!
//! This module provides parameters for the coverage executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    sampler::SamplerParams,
    stats::Metric,
    suite::{Feature1d, Feature2d},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CovExecParams {
    /// Directory containing the prefabs and recordings. Relative paths are taken from the
    /// software root.
    pub data_dir: PathBuf,

    /// The scenarios making up the suite, in suite order
    pub scenarios: Vec<ScenarioParams>,

    /// Comparisons to run once the suite has been aggregated
    pub comparison: ComparisonParams,

    #[serde(default)]
    pub sampler: SamplerParams,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScenarioParams {
    /// Identifier of the scenario within the suite
    pub id: String,

    /// Prefab file describing the scenario's roads, relative to the data directory
    pub prefab: PathBuf,

    /// Name of the road the vehicle drives along
    pub road_id: String,

    /// Telemetry recording of the run, relative to the data directory
    pub recording: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ComparisonParams {
    /// Scenario the rest of the suite is compared against. If not set the first scenario in the
    /// suite is used.
    pub baseline: Option<String>,

    #[serde(default)]
    pub features_1d: Vec<Feature1d>,

    #[serde(default)]
    pub features_2d: Vec<Feature2d>,

    pub metric: Metric,

    pub normalized: bool,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
