//! # Telemetry replay
//!
//! Recorded runs are CSV files with one row per collection tick:
//!
//! ```text
//! pos_x,pos_y,pos_z,vel_x,vel_y,vel_z,steering_input,throttle_input,brake_input
//! 0.0,0.0,0.0,10.0,0.0,0.0,0.0,0.6,0.0
//! ```
//!
//! Replaying a recording feeds each row through [`TelemetrySampler::collect`] in order, exactly
//! as the simulator harness would on each tick.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::{
    road::{ProviderError, RoadError, RoadProvider},
    sampler::{SamplerError, SamplerParams, TelemetryFrame, TelemetrySampler},
    suite::ScenarioResult,
    ErrorKind,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single row of a recording.
#[derive(Debug, Deserialize)]
struct TelemetryRecord {
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    vel_x: f64,
    vel_y: f64,
    vel_z: f64,
    steering_input: f64,
    throttle_input: f64,
    brake_input: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Cannot open the recording {0:?}: {1}")]
    OpenError(PathBuf, io::Error),

    #[error("Cannot read row {0} of the recording: {1}")]
    RecordError(usize, csv::Error),

    #[error("Cannot get the road: {0}")]
    Provider(#[from] ProviderError),

    #[error("Cannot build the road model: {0}")]
    Road(#[from] RoadError),

    #[error("Cannot create the sampler: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Cannot collect frame {0}: {1}")]
    Collect(usize, SamplerError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read the frames of a recording from a CSV source.
pub fn read_frames<R: io::Read>(reader: R) -> Result<Vec<TelemetryFrame>, ReplayError> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .enumerate()
        .map(|(row, record)| {
            record
                .map(|r: TelemetryRecord| TelemetryFrame::from(r))
                .map_err(|e| ReplayError::RecordError(row, e))
        })
        .collect()
}

/// Read the frames of a recording file.
pub fn read_recording<P: AsRef<Path>>(path: P) -> Result<Vec<TelemetryFrame>, ReplayError> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| ReplayError::OpenError(path.to_path_buf(), e))?;

    let frames = read_frames(file)?;

    debug!("Read {} frames from {:?}", frames.len(), path);

    Ok(frames)
}

/// Feed frames through the sampler in order, returning the number collected.
pub fn replay<'a, I>(sampler: &mut TelemetrySampler, frames: I) -> Result<usize, ReplayError>
where
    I: IntoIterator<Item = &'a TelemetryFrame>,
{
    let mut num_frames = 0;

    for (i, frame) in frames.into_iter().enumerate() {
        sampler
            .collect(frame)
            .map_err(|e| ReplayError::Collect(i, e))?;
        num_frames += 1;
    }

    Ok(num_frames)
}

/// Run a whole scenario: build the road, replay the frames and capture the result.
pub fn run_scenario<P: RoadProvider>(
    id: &str,
    provider: &P,
    road_id: &str,
    frames: &[TelemetryFrame],
    params: &SamplerParams,
) -> Result<ScenarioResult, ReplayError> {
    let road = provider.road_curve(road_id)?.into_model()?;
    let mut sampler = TelemetrySampler::new(road, params.clone())?;

    let num_frames = replay(&mut sampler, frames)?;

    info!(
        "Scenario {}: {} frames, {} departures",
        id,
        num_frames,
        sampler.departures().len()
    );

    Ok(ScenarioResult::from_sampler(id, &sampler))
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<TelemetryRecord> for TelemetryFrame {
    fn from(r: TelemetryRecord) -> Self {
        TelemetryFrame {
            position_m: Vector3::new(r.pos_x, r.pos_y, r.pos_z),
            velocity_ms: Vector3::new(r.vel_x, r.vel_y, r.vel_z),
            steering_input: r.steering_input,
            throttle_input: r.throttle_input,
            brake_input: r.brake_input,
        }
    }
}

impl ReplayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplayError::OpenError(..) | ReplayError::RecordError(..) => ErrorKind::Io,
            ReplayError::Provider(e) => e.kind(),
            ReplayError::Road(e) => e.kind(),
            ReplayError::Sampler(e) | ReplayError::Collect(_, e) => e.kind(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        histogram::Histogram,
        road::RoadCurve,
        sampler::RoadState,
        suite::{Feature1d, Feature2d},
    };
    use nalgebra::Point2;

    const RECORDING: &str = "\
pos_x,pos_y,pos_z,vel_x,vel_y,vel_z,steering_input,throttle_input,brake_input
0.0,0.0,0.0,10.0,0.0,0.0,0.0,0.6,0.0
10.0,0.5,0.0,10.0,1.0,0.0,0.1,0.6,0.0
20.0,2.0,0.0,10.0,1.0,0.0,0.2,0.4,0.0
30.0,3.0,0.0,10.0,0.0,0.0,0.0,0.0,0.8
40.0,0.0,0.0,10.0,-1.0,0.0,-0.3,0.5,0.0
";

    /// A straight road along the x axis.
    struct StraightRoad;

    impl RoadProvider for StraightRoad {
        fn road_curve(&self, road_id: &str) -> Result<RoadCurve, ProviderError> {
            match road_id {
                "road_0" => Ok(RoadCurve {
                    points_m: vec![Point2::new(-10.0, 0.0), Point2::new(100.0, 0.0)],
                    width_m: 4.0,
                }),
                _ => Err(ProviderError::RoadNotFound(road_id.to_string())),
            }
        }
    }

    #[test]
    fn test_read_frames() -> Result<(), ReplayError> {
        let frames = read_frames(RECORDING.as_bytes())?;

        assert_eq!(frames.len(), 5);
        assert_eq!(frames[1].position_m, Vector3::new(10.0, 0.5, 0.0));
        assert_eq!(frames[3].brake_input, 0.8);

        let broken = "pos_x,pos_y\n1.0,2.0\n";
        assert!(matches!(
            read_frames(broken.as_bytes()),
            Err(ReplayError::RecordError(0, _))
        ));

        Ok(())
    }

    #[test]
    fn test_read_recording() -> Result<(), ReplayError> {
        let mut path = std::env::temp_dir();
        path.push("cov_lib_replay_test_recording.csv");
        std::fs::write(&path, RECORDING).unwrap();

        assert_eq!(read_recording(&path)?.len(), 5);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(read_recording(&path), Err(ReplayError::OpenError(..))));

        Ok(())
    }

    #[test]
    fn test_run_scenario() -> Result<(), ReplayError> {
        let frames = read_frames(RECORDING.as_bytes())?;
        let params = SamplerParams {
            initial_road_state: RoadState::OnRoad,
            ..Default::default()
        };

        let result = run_scenario("97", &StraightRoad, "road_0", &frames, &params)?;

        assert_eq!(result.id, "97");
        assert_eq!(result.num_samples, 5);
        assert_eq!(result.departures.len(), 1);
        assert_eq!(result.departures[0].step, 2);

        assert_eq!(result.features_1d.len(), Feature1d::ALL.len());
        assert_eq!(result.features_1d[&Feature1d::Brake].histogram.total(), 5);
        assert_eq!(
            result.features_2d[&Feature2d::DepartureSpeedAngle].histogram.total(),
            1
        );
        assert_eq!(
            result.features_2d[&Feature2d::DepartureSpeedAngle].entropy,
            Some(0.0)
        );

        assert!(matches!(
            run_scenario("97", &StraightRoad, "road_9", &frames, &params),
            Err(ReplayError::Provider(ProviderError::RoadNotFound(_)))
        ));

        Ok(())
    }

    #[test]
    fn test_replay_reports_frame() {
        let mut frames = read_frames(RECORDING.as_bytes()).unwrap();
        frames[3].velocity_ms = Vector3::new(std::f64::NAN, 0.0, 0.0);

        let err = run_scenario("97", &StraightRoad, "road_0", &frames, &SamplerParams::default())
            .unwrap_err();

        assert!(matches!(err, ReplayError::Collect(3, SamplerError::NonFiniteFrame(3))));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}
