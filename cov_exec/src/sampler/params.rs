//! Telemetry sampler parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::RoadState;
use crate::road::OFFROAD_THRESHOLD_FACTOR;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default number of bins along each histogram axis
pub const NUM_BINS: usize = 16;

pub const STEERING_RANGE: (f64, f64) = (-1.0, 1.0);

pub const THROTTLE_BRAKE_RANGE: (f64, f64) = (0.0, 1.0);

pub const SPEED_RANGE_KPH: (f64, f64) = (0.0, 100.0);

pub const DEPARTURE_ANGLE_RANGE_RAD: (f64, f64) = (-std::f64::consts::PI, std::f64::consts::PI);

pub const DISTANCE_RANGE_M: (f64, f64) = (0.0, 10.0);

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for the telemetry sampler.
///
/// The histogram ranges are fixed rather than fitted to the data, samples outside them are not
/// counted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplerParams {
    /// Number of bins along each histogram axis
    pub num_bins: usize,

    /// Range of the steering input histogram
    pub steering_range: (f64, f64),

    /// Range of the throttle and brake input histograms
    pub throttle_brake_range: (f64, f64),

    /// Range of the speed histograms, in kilometers per hour
    pub speed_range_kph: (f64, f64),

    /// Range of the departure angle axis
    pub departure_angle_range_rad: (f64, f64),

    /// Range of the distance to centreline histogram
    pub distance_range_m: (f64, f64),

    /// Fraction of the lane half width beyond which the vehicle is off the road
    pub offroad_threshold_factor: f64,

    /// Road state assumed before the first sample
    pub initial_road_state: RoadState,

    /// Initial multiple of the velocity used to build the departure search segment
    pub search_scale_start: f64,

    /// Amount the velocity multiple grows by on each search attempt
    pub search_scale_step: f64,

    /// Number of search attempts before the departure angle is abandoned
    pub max_search_attempts: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            num_bins: NUM_BINS,
            steering_range: STEERING_RANGE,
            throttle_brake_range: THROTTLE_BRAKE_RANGE,
            speed_range_kph: SPEED_RANGE_KPH,
            departure_angle_range_rad: DEPARTURE_ANGLE_RANGE_RAD,
            distance_range_m: DISTANCE_RANGE_M,
            offroad_threshold_factor: OFFROAD_THRESHOLD_FACTOR,
            initial_road_state: RoadState::OffRoad,
            search_scale_start: 5.0,
            search_scale_step: 5.0,
            max_search_attempts: 200,
        }
    }
}
