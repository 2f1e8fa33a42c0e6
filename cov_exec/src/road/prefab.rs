//! # Road providers
//!
//! A road provider supplies the centreline and lane width of a named road in a scenario. The
//! only provider implemented reads the `Node` entries of a road out of a scenario prefab file.
//! A prefab road looks like:
//!
//! ```text
//! new DecalRoad(road_0) {
//!    drivability = "1";
//!    Node = "0 0 0.01 8";
//!    Node = "10 0 0.01 8";
//! };
//! ```
//!
//! where each node is `x y z width`. Only the XY position of each node is kept, and the width of
//! the first node is taken as the lane width.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use log::debug;
use nalgebra::Point2;
use regex::Regex;

use super::{RoadError, RoadModel};
use crate::ErrorKind;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Matches a floating point number, with optional sign and exponent.
const NUMBER_PATTERN: &str = r"[-+]?(?:\d*\.\d+|\d+\.?)(?:[Ee][+-]?\d+)?";

/// Matches a single node entry inside a road block.
const NODE_PATTERN: &str = r"Node.*?;";

/// Number of values in a node: x, y, z and width.
const NODE_NUM_VALUES: usize = 4;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of road geometry for a scenario.
pub trait RoadProvider {
    /// Get the centreline and lane width of the given road.
    fn road_curve(&self, road_id: &str) -> Result<RoadCurve, ProviderError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Centreline points and lane width of a road, as supplied by a [`RoadProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoadCurve {
    pub points_m: Vec<Point2<f64>>,
    pub width_m: f64,
}

/// Reads roads out of a scenario prefab file.
#[derive(Debug, Clone)]
pub struct PrefabRoadProvider {
    path: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Cannot read the prefab file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("The road {0} was not found in the prefab")]
    RoadNotFound(String),

    #[error("The road {0} has no nodes")]
    NoNodes(String),

    #[error("Expected {} values in node `{1}` of road {0}, found {2}", NODE_NUM_VALUES)]
    MalformedNode(String, String, usize),

    #[error("Invalid road search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RoadCurve {
    /// Build the road model for this curve.
    pub fn into_model(self) -> Result<RoadModel, RoadError> {
        RoadModel::new(self.points_m, self.width_m)
    }
}

impl PrefabRoadProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Extract the named road from the text of a prefab.
    pub fn parse_road(prefab: &str, road_id: &str) -> Result<RoadCurve, ProviderError> {
        let road_re = Regex::new(&format!(r"(?s)\({}\).*?\}};", regex::escape(road_id)))?;
        let node_re = Regex::new(NODE_PATTERN)?;
        let number_re = Regex::new(NUMBER_PATTERN)?;

        let road_block = road_re
            .find(prefab)
            .ok_or_else(|| ProviderError::RoadNotFound(road_id.to_string()))?
            .as_str();

        let mut points_m = Vec::new();
        let mut width_m = None;

        for node in node_re.find_iter(road_block) {
            let values: Vec<f64> = number_re
                .find_iter(node.as_str())
                .filter_map(|m| m.as_str().parse().ok())
                .collect();

            if values.len() != NODE_NUM_VALUES {
                return Err(ProviderError::MalformedNode(
                    road_id.to_string(),
                    node.as_str().to_string(),
                    values.len(),
                ));
            }

            points_m.push(Point2::new(values[0], values[1]));
            width_m.get_or_insert(values[3]);
        }

        match width_m {
            Some(width_m) => Ok(RoadCurve { points_m, width_m }),
            None => Err(ProviderError::NoNodes(road_id.to_string())),
        }
    }
}

impl RoadProvider for PrefabRoadProvider {
    fn road_curve(&self, road_id: &str) -> Result<RoadCurve, ProviderError> {
        let prefab = std::fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::FileLoadError(self.path.clone(), e))?;

        let curve = Self::parse_road(&prefab, road_id)?;

        debug!(
            "Parsed road {} from {:?}: {} nodes, width {} m",
            road_id,
            self.path,
            curve.points_m.len(),
            curve.width_m
        );

        Ok(curve)
    }
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::InvalidPattern(_) => ErrorKind::Configuration,
            _ => ErrorKind::Io,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
