//! Domain data structures for positions, vehicle sets, and arrival predictions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Estimated time of arrival, in whole minutes.
pub type Minutes = i64;

/// Vehicles near a point, in the proximity order chosen by the upstream cluster.
pub type VehicleSet = Vec<Coordinate>;

/// Arrival predictions positionally aligned with the [`VehicleSet`] they were computed for.
pub type PredictionSet = Vec<Minutes>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Point on the globe in decimal degrees.
///
/// Equality is exact floating point equality; two coordinates are only the same
/// if both components compare equal.
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate from its components.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({}, {})", self.latitude, self.longitude)
    }
}
