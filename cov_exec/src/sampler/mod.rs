//! # Telemetry Sampler
//!
//! The sampler is fed one [`TelemetryFrame`] per simulation tick of a run. Each frame's signals
//! are appended to per-signal series, the vehicle's distance to the road centreline is measured,
//! and the road state machine is advanced:
//!
//! ```text
//!             off road (departure event recorded)
//!   ┌─────────┐ ──────────────────────────────► ┌──────────┐
//!   │ OnRoad  │                                 │ OffRoad  │
//!   └─────────┘ ◄────────────────────────────── └──────────┘
//!             on road (no event)
//! ```
//!
//! Only the transition from on to off the road creates a [`DepartureEvent`], so a vehicle which
//! stays off the road for many ticks produces a single event. The initial state is set by
//! [`SamplerParams::initial_road_state`].
//!
//! ## Departure angle
//!
//! When the vehicle leaves the road its line of travel is extended either side of its position,
//! starting at `search_scale_start` times the velocity and growing by `search_scale_step` each
//! attempt, until it crosses the centreline. The angle is then the signed difference between the
//! bearing from the nearest centreline vertex to the crossing and the bearing from the vehicle to
//! the crossing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, trace};
use nalgebra::{Point2, Vector2};

use crate::{
    histogram::{BinSpec, Histogram1d, Histogram2d, HistogramError},
    road::{RoadError, RoadModel, Segment},
    ErrorKind,
};
use util::maths::ang_diff;

pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Accumulates the telemetry of a single run.
#[derive(Debug, Clone)]
pub struct TelemetrySampler {
    road: RoadModel,

    params: SamplerParams,

    state: RoadState,

    steering_spec: BinSpec,
    throttle_brake_spec: BinSpec,
    speed_spec: BinSpec,
    angle_spec: BinSpec,
    distance_spec: BinSpec,

    speed_kph: Vec<f64>,
    steering: Vec<f64>,
    throttle: Vec<f64>,
    brake: Vec<f64>,
    distance_m: Vec<f64>,

    departures: Vec<DepartureEvent>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Invalid road: {0}")]
    Road(#[from] RoadError),

    #[error("Invalid histogram parameters: {0}")]
    Histogram(#[from] HistogramError),

    #[error("Invalid departure search parameters: {0}")]
    InvalidSearchParams(&'static str),

    #[error("Telemetry frame at step {0} contains non-finite values")]
    NonFiniteFrame(usize),

    #[error("Vehicle left the road at step {0} with zero planar velocity")]
    ZeroVelocity(usize),

    #[error(
        "No crossing with the road found for the departure at step {step} after {attempts} \
         attempts (velocity scale {max_scale})"
    )]
    NoIntersection {
        step: usize,
        attempts: usize,
        max_scale: f64,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetrySampler {
    /// Create a new sampler for a run on the given road.
    pub fn new(road: RoadModel, params: SamplerParams) -> Result<Self, SamplerError> {
        let road = road.with_threshold_factor(params.offroad_threshold_factor)?;

        if !(params.search_scale_start.is_finite() && params.search_scale_start > 0.0) {
            return Err(SamplerError::InvalidSearchParams(
                "search_scale_start must be positive",
            ));
        }
        if !(params.search_scale_step.is_finite() && params.search_scale_step > 0.0) {
            return Err(SamplerError::InvalidSearchParams(
                "search_scale_step must be positive",
            ));
        }
        if params.max_search_attempts == 0 {
            return Err(SamplerError::InvalidSearchParams(
                "max_search_attempts must be at least 1",
            ));
        }

        Ok(Self {
            steering_spec: BinSpec::new(params.num_bins, params.steering_range)?,
            throttle_brake_spec: BinSpec::new(params.num_bins, params.throttle_brake_range)?,
            speed_spec: BinSpec::new(params.num_bins, params.speed_range_kph)?,
            angle_spec: BinSpec::new(params.num_bins, params.departure_angle_range_rad)?,
            distance_spec: BinSpec::new(params.num_bins, params.distance_range_m)?,
            state: params.initial_road_state,
            road,
            params,
            speed_kph: Vec::new(),
            steering: Vec::new(),
            throttle: Vec::new(),
            brake: Vec::new(),
            distance_m: Vec::new(),
            departures: Vec::new(),
        })
    }

    /// Collect the telemetry of one tick.
    ///
    /// Returns the departure event if the vehicle left the road on this tick. On error the
    /// frame's signals have still been recorded and the road state advanced.
    pub fn collect(
        &mut self,
        frame: &TelemetryFrame,
    ) -> Result<Option<DepartureEvent>, SamplerError> {
        let step = self.num_samples();

        if !frame.is_finite() {
            return Err(SamplerError::NonFiniteFrame(step));
        }

        let position_m = frame.position_2d();
        let speed_kph = frame.speed_kph();
        let distance_m = self.road.distance_to_centreline(&position_m);

        self.speed_kph.push(speed_kph);
        self.steering.push(frame.steering_input);
        self.throttle.push(frame.throttle_input);
        self.brake.push(frame.brake_input);
        self.distance_m.push(distance_m);

        let (next_state, edge) = self.state.transition(self.road.is_offroad(distance_m));
        self.state = next_state;

        match edge {
            Some(RoadEdge::Departure) => {
                let angle_rad = self.departure_angle(step, position_m, frame.velocity_2d())?;

                let event = DepartureEvent {
                    step,
                    position_m,
                    speed_kph,
                    angle_rad,
                };

                info!(
                    "Departure at step {}: {:.2} kph, angle {:.3} rad, {:.2} m from centreline",
                    step, speed_kph, angle_rad, distance_m
                );

                self.departures.push(event);
                Ok(Some(event))
            }
            Some(RoadEdge::Return) => {
                debug!("Vehicle back on the road at step {}", step);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Calculate the angle at which a vehicle at `position_m` travelling along `velocity_ms` left
    /// the road.
    fn departure_angle(
        &self,
        step: usize,
        position_m: Point2<f64>,
        velocity_ms: Vector2<f64>,
    ) -> Result<f64, SamplerError> {
        if velocity_ms.norm() == 0.0 {
            return Err(SamplerError::ZeroVelocity(step));
        }

        // Grow the line of travel until it reaches the road
        let mut scale = self.params.search_scale_start;
        let mut crossing_m = None;

        for attempt in 0..self.params.max_search_attempts {
            let travel = Segment::centred(position_m, velocity_ms, scale);

            if let Some(p) = self.road.intersect(&travel, &position_m) {
                crossing_m = Some(p);
                break;
            }

            trace!(
                "No road crossing on attempt {} at velocity scale {}",
                attempt,
                scale
            );
            scale += self.params.search_scale_step;
        }

        let crossing_m = crossing_m.ok_or(SamplerError::NoIntersection {
            step,
            attempts: self.params.max_search_attempts,
            max_scale: scale - self.params.search_scale_step,
        })?;

        let road_bearing_rad = self.road_bearing_to(&crossing_m);
        let vehicle_to_crossing = crossing_m - position_m;
        let vehicle_bearing_rad = vehicle_to_crossing.y.atan2(vehicle_to_crossing.x);

        Ok(ang_diff(road_bearing_rad, vehicle_bearing_rad))
    }

    /// Bearing from the centreline vertex nearest to `crossing_m` towards the crossing.
    ///
    /// If the crossing is on the vertex the bearing of the road at that vertex is used instead.
    fn road_bearing_to(&self, crossing_m: &Point2<f64>) -> f64 {
        let points = self.road.points_m();
        let nearest = self.road.nearest_vertex(crossing_m);

        let mut dir = crossing_m - points[nearest];

        if dir.norm() == 0.0 {
            dir = match nearest + 1 < points.len() {
                true => points[nearest + 1] - points[nearest],
                false => points[nearest] - points[nearest - 1],
            };
        }

        dir.y.atan2(dir.x)
    }

    pub fn road(&self) -> &RoadModel {
        &self.road
    }

    pub fn params(&self) -> &SamplerParams {
        &self.params
    }

    /// The current road state
    pub fn state(&self) -> RoadState {
        self.state
    }

    /// Number of frames collected so far
    pub fn num_samples(&self) -> usize {
        self.speed_kph.len()
    }

    pub fn departures(&self) -> &[DepartureEvent] {
        &self.departures
    }

    pub fn speed_bins(&self) -> Histogram1d {
        Histogram1d::from_samples(self.speed_spec, self.speed_kph.iter().copied())
    }

    pub fn steering_bins(&self) -> Histogram1d {
        Histogram1d::from_samples(self.steering_spec, self.steering.iter().copied())
    }

    pub fn throttle_bins(&self) -> Histogram1d {
        Histogram1d::from_samples(self.throttle_brake_spec, self.throttle.iter().copied())
    }

    pub fn brake_bins(&self) -> Histogram1d {
        Histogram1d::from_samples(self.throttle_brake_spec, self.brake.iter().copied())
    }

    pub fn distance_bins(&self) -> Histogram1d {
        Histogram1d::from_samples(self.distance_spec, self.distance_m.iter().copied())
    }

    /// Steering input on the x axis against speed on the y axis.
    pub fn steering_speed_bins(&self) -> Histogram2d {
        Histogram2d::from_samples(
            self.steering_spec,
            self.speed_spec,
            self.steering
                .iter()
                .copied()
                .zip(self.speed_kph.iter().copied()),
        )
    }

    /// Speed at departure on the x axis against departure angle on the y axis.
    pub fn departure_speed_angle_bins(&self) -> Histogram2d {
        Histogram2d::from_samples(
            self.speed_spec,
            self.angle_spec,
            self.departures.iter().map(|d| (d.speed_kph, d.angle_rad)),
        )
    }
}

impl SamplerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SamplerError::Road(e) => e.kind(),
            SamplerError::Histogram(e) => e.kind(),
            SamplerError::InvalidSearchParams(_) => ErrorKind::Configuration,
            SamplerError::NonFiniteFrame(_) | SamplerError::ZeroVelocity(_) => {
                ErrorKind::Precondition
            }
            SamplerError::NoIntersection { .. } => ErrorKind::Geometry,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::histogram::Histogram;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    /// A straight road along the x axis with a vertex every 10 m and an off-road threshold of 1 m.
    fn straight_road() -> RoadModel {
        RoadModel::new(
            (0..=10).map(|i| Point2::new(i as f64 * 10.0, 0.0)).collect(),
            4.0,
        )
        .unwrap()
    }

    fn on_road_params() -> SamplerParams {
        SamplerParams {
            initial_road_state: RoadState::OnRoad,
            ..Default::default()
        }
    }

    fn frame(x: f64, y: f64, vx: f64, vy: f64) -> TelemetryFrame {
        TelemetryFrame {
            position_m: Vector3::new(x, y, 0.0),
            velocity_ms: Vector3::new(vx, vy, 0.0),
            steering_input: 0.0,
            throttle_input: 0.5,
            brake_input: 0.0,
        }
    }

    #[test]
    fn test_single_excursion() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        assert!(sampler.collect(&frame(10.0, 0.0, 10.0, 0.0))?.is_none());
        assert!(sampler.collect(&frame(20.0, 0.5, 10.0, 1.0))?.is_none());
        assert!(sampler.collect(&frame(30.0, 2.0, 10.0, 1.0))?.is_some());
        assert_eq!(sampler.state(), RoadState::OffRoad);
        assert!(sampler.collect(&frame(40.0, 0.5, 10.0, -1.0))?.is_none());
        assert_eq!(sampler.state(), RoadState::OnRoad);
        assert!(sampler.collect(&frame(50.0, 0.0, 10.0, 0.0))?.is_none());

        assert_eq!(sampler.num_samples(), 5);
        assert_eq!(sampler.departures().len(), 1);
        assert_eq!(sampler.departures()[0].step, 2);

        Ok(())
    }

    #[test]
    fn test_sustained_excursion() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        sampler.collect(&frame(10.0, 0.0, 10.0, 0.0))?;
        for i in 0..8 {
            sampler.collect(&frame(20.0 + i as f64, 2.0 + i as f64, 1.0, 1.0))?;
        }

        assert_eq!(sampler.departures().len(), 1);
        assert_eq!(sampler.departure_speed_angle_bins().total(), 1);

        Ok(())
    }

    #[test]
    fn test_default_starts_off_road() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), SamplerParams::default())?;

        // Starting off the road is not a departure
        sampler.collect(&frame(10.0, 3.0, 0.0, 0.0))?;
        assert_eq!(sampler.departures().len(), 0);

        sampler.collect(&frame(10.0, 0.0, 1.0, 0.0))?;
        sampler.collect(&frame(20.0, 3.0, 1.0, 1.0))?;
        assert_eq!(sampler.departures().len(), 1);

        Ok(())
    }

    #[test]
    fn test_departure_angle() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        sampler.collect(&frame(40.0, 0.0, 1.0, 1.0))?;

        // The line of travel crosses the road at (42, 0), nearest vertex (40, 0)
        let event = sampler.collect(&frame(45.0, 3.0, 1.0, 1.0))?.unwrap();

        assert!((event.angle_rad - 3.0 * PI / 4.0).abs() < 1e-9);
        assert!((event.speed_kph - 2f64.sqrt() * MS_TO_KPH).abs() < 1e-9);
        assert_eq!(event.position_m, Point2::new(45.0, 3.0));

        Ok(())
    }

    #[test]
    fn test_departure_angle_short_velocity() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        sampler.collect(&frame(40.0, 0.0, 0.1, 0.1))?;

        // Needs several search attempts before the line reaches the road
        let event = sampler.collect(&frame(45.0, 3.0, 0.1, 0.1))?.unwrap();

        assert!((event.angle_rad - 3.0 * PI / 4.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_departure_on_vertex() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        sampler.collect(&frame(40.0, 0.0, 0.0, 1.0))?;

        // Crossing is exactly on the vertex (50, 0), so the road's own bearing (0) is used
        let event = sampler.collect(&frame(50.0, 3.0, 0.0, 1.0))?.unwrap();

        assert!((event.angle_rad - PI / 2.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_zero_velocity_departure() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), on_road_params())?;

        sampler.collect(&frame(10.0, 0.0, 1.0, 0.0))?;

        assert!(matches!(
            sampler.collect(&frame(10.0, 3.0, 0.0, 0.0)),
            Err(SamplerError::ZeroVelocity(1))
        ));
        assert_eq!(sampler.departures().len(), 0);
        assert_eq!(sampler.num_samples(), 2);

        Ok(())
    }

    #[test]
    fn test_no_intersection() -> Result<(), SamplerError> {
        let road = RoadModel::new(vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)], 4.0)?;
        let params = SamplerParams {
            max_search_attempts: 10,
            ..on_road_params()
        };
        let mut sampler = TelemetrySampler::new(road, params)?;

        sampler.collect(&frame(5.0, 0.0, 1.0, 0.0))?;

        // Travelling parallel to the road never crosses it
        let err = sampler.collect(&frame(5.0, 5.0, 1.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            SamplerError::NoIntersection { step: 1, attempts: 10, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Geometry);

        Ok(())
    }

    #[test]
    fn test_invalid_params() {
        let params = SamplerParams {
            num_bins: 0,
            ..Default::default()
        };
        assert!(matches!(
            TelemetrySampler::new(straight_road(), params),
            Err(SamplerError::Histogram(HistogramError::NoBins))
        ));

        let params = SamplerParams {
            max_search_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            TelemetrySampler::new(straight_road(), params),
            Err(SamplerError::InvalidSearchParams(_))
        ));

        let params = SamplerParams {
            offroad_threshold_factor: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            TelemetrySampler::new(straight_road(), params),
            Err(SamplerError::Road(RoadError::InvalidThresholdFactor(_)))
        ));
    }

    #[test]
    fn test_histograms() -> Result<(), SamplerError> {
        let mut sampler = TelemetrySampler::new(straight_road(), SamplerParams::default())?;

        let frames = [
            (-1.0, 0.0, 0.0, 10.0),
            (0.0, 1.0, 0.0, 20.0),
            (1.0, 0.0, 1.0, 40.0),
        ];

        for (i, &(steering, throttle, brake, speed_ms)) in frames.iter().enumerate() {
            sampler.collect(&TelemetryFrame {
                position_m: Vector3::new(i as f64, 0.5, 0.0),
                velocity_ms: Vector3::new(speed_ms, 0.0, 0.0),
                steering_input: steering,
                throttle_input: throttle,
                brake_input: brake,
            })?;
        }

        // 36 and 72 kph are counted, 144 kph is outside the speed range
        let speed = sampler.speed_bins();
        assert_eq!(speed.total(), 2);
        assert_eq!(speed.counts[5], 1);
        assert_eq!(speed.counts[11], 1);

        let steering = sampler.steering_bins();
        assert_eq!(steering.counts[0], 1);
        assert_eq!(steering.counts[8], 1);
        assert_eq!(steering.counts[15], 1);

        assert_eq!(sampler.throttle_bins().counts[15], 1);
        assert_eq!(sampler.throttle_bins().counts[0], 2);
        assert_eq!(sampler.brake_bins().counts[15], 1);

        // All samples at 0.5 m from the centreline, bin width 0.625 m
        assert_eq!(sampler.distance_bins().counts[0], 3);

        let steering_speed = sampler.steering_speed_bins();
        assert_eq!(steering_speed.counts.dim(), (16, 16));
        assert_eq!(steering_speed.total(), 2);
        assert_eq!(steering_speed.counts[[0, 5]], 1);
        assert_eq!(steering_speed.counts[[8, 11]], 1);

        assert_eq!(sampler.departure_speed_angle_bins().total(), 0);

        Ok(())
    }
}
