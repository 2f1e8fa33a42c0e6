//! Telemetry sampler state and data types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Conversion from meters per second to kilometers per hour.
pub const MS_TO_KPH: f64 = 3.6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The vehicle state polled from the simulator on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Position of the vehicle in the world frame
    pub position_m: Vector3<f64>,

    /// Velocity of the vehicle in the world frame
    pub velocity_ms: Vector3<f64>,

    /// Steering input in [-1, 1]
    pub steering_input: f64,

    /// Throttle input in [0, 1]
    pub throttle_input: f64,

    /// Brake input in [0, 1]
    pub brake_input: f64,
}

/// A departure of the vehicle from the road.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepartureEvent {
    /// Index of the collection step on which the vehicle left the road
    pub step: usize,

    /// Position of the vehicle when it was first off the road
    pub position_m: Point2<f64>,

    /// Speed of the vehicle when it left the road
    pub speed_kph: f64,

    /// Angle between the road and the vehicle's line of travel, in (-pi, pi]
    pub angle_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Whether the vehicle is on or off the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadState {
    OnRoad,
    OffRoad,
}

/// A change between road states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadEdge {
    /// The vehicle left the road
    Departure,

    /// The vehicle came back onto the road
    Return,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RoadState {
    /// Runs start off the road so that the first on-road sample is not a departure.
    fn default() -> Self {
        RoadState::OffRoad
    }
}

impl RoadState {
    /// Get the state following an off-road check, and the edge crossed to get there if the state
    /// changed.
    pub fn transition(self, offroad: bool) -> (RoadState, Option<RoadEdge>) {
        match (self, offroad) {
            (RoadState::OnRoad, true) => (RoadState::OffRoad, Some(RoadEdge::Departure)),
            (RoadState::OffRoad, false) => (RoadState::OnRoad, Some(RoadEdge::Return)),
            (state, _) => (state, None),
        }
    }
}

impl TelemetryFrame {
    /// Position projected onto the road plane
    pub fn position_2d(&self) -> Point2<f64> {
        Point2::new(self.position_m.x, self.position_m.y)
    }

    /// Velocity projected onto the road plane
    pub fn velocity_2d(&self) -> Vector2<f64> {
        Vector2::new(self.velocity_ms.x, self.velocity_ms.y)
    }

    /// Magnitude of the full velocity vector in kilometers per hour
    pub fn speed_kph(&self) -> f64 {
        self.velocity_ms.norm() * MS_TO_KPH
    }

    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite())
            && self.velocity_ms.iter().all(|v| v.is_finite())
            && self.steering_input.is_finite()
            && self.throttle_input.is_finite()
            && self.brake_input.is_finite()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
