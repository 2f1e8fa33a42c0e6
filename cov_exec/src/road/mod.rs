//! # Road Model
//!
//! The road is described by its centreline, a polyline in the XY plane, and the width of the
//! lane. The model answers how far a point is from the centreline and whether that distance puts
//! the vehicle off the road.
//!
//! The off-road threshold is `half_width_m * offroad_threshold_factor`. With the default factor
//! of [`OFFROAD_THRESHOLD_FACTOR`] this is a quarter of the full lane width, inside the lane
//! edge. Use [`RoadModel::with_threshold_factor`] to change it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod geometry;
pub mod prefab;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;

use crate::ErrorKind;
pub use geometry::Segment;
pub use prefab::{PrefabRoadProvider, ProviderError, RoadCurve, RoadProvider};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The fraction of the lane half width beyond which the vehicle is considered off the road.
pub const OFFROAD_THRESHOLD_FACTOR: f64 = 0.5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Immutable model of a single road.
#[derive(Debug, Clone)]
pub struct RoadModel {
    /// Centreline points in authoring order
    points_m: Vec<Point2<f64>>,

    /// Half of the lane width
    half_width_m: f64,

    /// Multiplier applied to the half width to get the off-road threshold
    offroad_threshold_factor: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RoadError {
    #[error("A road centreline needs at least 2 points, found {0}")]
    TooFewPoints(usize),

    #[error("The road width must be positive and finite, found {0}")]
    InvalidWidth(f64),

    #[error("The off-road threshold factor must be positive and finite, found {0}")]
    InvalidThresholdFactor(f64),

    #[error("Centreline point {0} is not finite")]
    NonFinitePoint(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoadModel {
    /// Build a road from its centreline and full lane width.
    pub fn new(points_m: Vec<Point2<f64>>, width_m: f64) -> Result<Self, RoadError> {
        if points_m.len() < 2 {
            return Err(RoadError::TooFewPoints(points_m.len()));
        }

        if !(width_m.is_finite() && width_m > 0.0) {
            return Err(RoadError::InvalidWidth(width_m));
        }

        if let Some(i) = points_m
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(RoadError::NonFinitePoint(i));
        }

        Ok(Self {
            points_m,
            half_width_m: width_m / 2.0,
            offroad_threshold_factor: OFFROAD_THRESHOLD_FACTOR,
        })
    }

    /// Replace the off-road threshold factor.
    pub fn with_threshold_factor(mut self, factor: f64) -> Result<Self, RoadError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(RoadError::InvalidThresholdFactor(factor));
        }

        self.offroad_threshold_factor = factor;
        Ok(self)
    }

    pub fn points_m(&self) -> &[Point2<f64>] {
        &self.points_m
    }

    pub fn half_width_m(&self) -> f64 {
        self.half_width_m
    }

    /// Distance from the centreline beyond which the vehicle is off the road.
    pub fn offroad_threshold_m(&self) -> f64 {
        self.half_width_m * self.offroad_threshold_factor
    }

    /// Iterate over the segments making up the centreline.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points_m
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
    }

    /// Minimum distance from `point_m` to the centreline.
    pub fn distance_to_centreline(&self, point_m: &Point2<f64>) -> f64 {
        self.segments()
            .map(|seg| seg.distance_to(point_m))
            .fold(std::f64::INFINITY, f64::min)
    }

    /// Whether a distance from the centreline is off the road.
    pub fn is_offroad(&self, distance_m: f64) -> bool {
        distance_m > self.offroad_threshold_m()
    }

    /// Find where `query` crosses the centreline.
    ///
    /// If the query crosses more than once the crossing closest to `near_m` is returned.
    pub fn intersect(&self, query: &Segment, near_m: &Point2<f64>) -> Option<Point2<f64>> {
        self.segments()
            .filter_map(|seg| query.intersection(&seg))
            .fold(None, |best: Option<Point2<f64>>, p| match best {
                Some(b) if (b - near_m).norm() <= (p - near_m).norm() => Some(b),
                _ => Some(p),
            })
    }

    /// Get the index of the centreline vertex nearest to `point_m`.
    ///
    /// Ties are broken towards the earlier vertex.
    pub fn nearest_vertex(&self, point_m: &Point2<f64>) -> usize {
        let mut nearest = 0;
        let mut nearest_dist = std::f64::INFINITY;

        for (i, p) in self.points_m.iter().enumerate() {
            let dist = (p - point_m).norm();
            if dist < nearest_dist {
                nearest = i;
                nearest_dist = dist;
            }
        }

        nearest
    }
}

impl RoadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
