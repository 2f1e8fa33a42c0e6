//! Coverage executable entry point.
//!
//! # Architecture
//!
//! The executable replays the recorded runs of a test suite and computes the suite's behavioural
//! coverage:
//!
//!     - Initialise the session and logging
//!     - Load parameters
//!     - For each scenario in the suite:
//!         - Get the road from the scenario's prefab
//!         - Replay the recorded telemetry through a sampler
//!         - Store the binned result in the suite record
//!     - Aggregate every feature across the suite
//!     - Compare the baseline scenario against the suite
//!     - Save the suite record into the session
//!
//! A scenario which fails is reported and left out of the suite.
//!
//! # Usage
//!
//! `cov_exec [params_file]`, where `params_file` defaults to `$COV_SW_ROOT/params/cov_exec.toml`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::env;
use std::path::Path;

// Internal
use cov_lib::{
    params::{CovExecParams, ScenarioParams},
    replay::{self, ReplayError},
    road::PrefabRoadProvider,
    sampler::SamplerParams,
    suite::{Feature1d, Feature2d, ScenarioResult, SuiteAggregator, SuiteRecord},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the default parameter file.
const PARAMS_FILE: &str = "cov_exec.toml";

/// Directory, relative to the software root, in which sessions are created.
const SESSIONS_DIR: &str = "sessions";

/// Session-relative path of the saved suite record.
const SUITE_RECORD_PATH: &str = "suite_record.json";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("cov_exec", SESSIONS_DIR).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Coverage Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let args: Vec<String> = env::args().collect();
    debug!("CLI arguments: {:?}", args);

    let params = match args.get(1) {
        Some(path) => util::params::load_from_path::<CovExecParams, _>(path),
        None => util::params::load::<CovExecParams>(PARAMS_FILE),
    }
    .wrap_err("Could not load the coverage executable parameters")?;

    info!("Parameters loaded, {} scenarios in suite", params.scenarios.len());

    // ---- RUN SCENARIOS ----

    let data_dir = match params.data_dir.is_absolute() {
        true => params.data_dir.clone(),
        false => host::get_sw_root()
            .wrap_err("Could not find the software root")?
            .join(&params.data_dir),
    };

    let mut record = SuiteRecord::new();

    for scenario in params.scenarios.iter() {
        match run_scenario(&data_dir, scenario, &params.sampler) {
            Ok(result) => record.push(result),
            Err(e) => error!(
                "Scenario {} failed ({:?} error) and is excluded from the suite: {}",
                scenario.id,
                e.kind(),
                e
            ),
        }
    }

    if params.scenarios.len() != record.scenarios.len() {
        warn!(
            "Only {} of {} scenarios completed",
            record.scenarios.len(),
            params.scenarios.len()
        );
    }

    // ---- SUITE PROCESSING ----

    let aggregator = SuiteAggregator::whole_suite(&record).wrap_err("No scenarios completed")?;

    for &feature in Feature1d::ALL.iter() {
        aggregator
            .aggregate_1d(&mut record, feature)
            .wrap_err_with(|| format!("Failed to aggregate {}", feature))?;
    }
    for &feature in Feature2d::ALL.iter() {
        aggregator
            .aggregate_2d(&mut record, feature)
            .wrap_err_with(|| format!("Failed to aggregate {}", feature))?;
    }

    let cmp = &params.comparison;
    let baseline = match &cmp.baseline {
        Some(b) => b.clone(),
        None => record.scenarios[0].id.clone(),
    };

    for &feature in cmp.features_1d.iter() {
        let distances = aggregator
            .compare_one_to_all(&mut record, &baseline, feature, cmp.metric, cmp.normalized)
            .wrap_err_with(|| format!("Failed to compare {} against {}", feature, baseline))?;
        debug!("{} distances from {}: {:?}", feature, baseline, distances);
    }
    for &feature in cmp.features_2d.iter() {
        let distances = aggregator
            .compare_one_to_all(&mut record, &baseline, feature, cmp.metric, cmp.normalized)
            .wrap_err_with(|| format!("Failed to compare {} against {}", feature, baseline))?;
        debug!("{} distances from {}: {:?}", feature, baseline, distances);
    }

    // ---- SHUTDOWN ----

    session.save(SUITE_RECORD_PATH, record);
    session.exit();

    Ok(())
}

/// Replay a single scenario's recording.
fn run_scenario(
    data_dir: &Path,
    scenario: &ScenarioParams,
    sampler_params: &SamplerParams,
) -> Result<ScenarioResult, ReplayError> {
    info!("Running scenario {}", scenario.id);

    let provider = PrefabRoadProvider::new(data_dir.join(&scenario.prefab));
    let frames = replay::read_recording(data_dir.join(&scenario.recording))?;

    replay::run_scenario(
        &scenario.id,
        &provider,
        &scenario.road_id,
        &frames,
        sampler_params,
    )
}
