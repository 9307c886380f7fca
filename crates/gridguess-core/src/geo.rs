//! Great-circle geometry on a spherical Earth.
//!
//! This module provides the feedback geometry for a guess:
//! - `Coordinates`: a validated latitude/longitude pair
//! - `distance_km`: haversine distance
//! - `initial_bearing_degrees`: forward azimuth from one point toward another
//! - `Cardinal`: the 8-point compass rose

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rejected coordinate values
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A point on the globe in decimal degrees.
///
/// Construction through [`Coordinates::new`] guarantees both values are
/// finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Degrees north of the equator (negative is south)
    pub latitude: f64,
    /// Degrees east of Greenwich (negative is west)
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Whether the point lies north of the equator
    pub fn is_northern(&self) -> bool {
        self.latitude >= 0.0
    }
}

/// Haversine distance between two points in kilometres.
///
/// Symmetric, and exactly zero when both points are equal.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let sin_dphi = (delta_phi / 2.0).sin();
    let sin_dlambda = (delta_lambda / 2.0).sin();
    let h = sin_dphi * sin_dphi + phi1.cos() * phi2.cos() * sin_dlambda * sin_dlambda;

    // Rounding can push h a hair past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial great-circle bearing from `from` toward `to`, in [0, 360).
///
/// The result is meaningless when the points coincide; callers treat equal
/// coordinates as a correct guess before asking for a direction.
pub fn initial_bearing_degrees(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// The eight compass-rose directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinal {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Cardinal {
    /// All directions clockwise from north
    pub const ALL: [Cardinal; 8] = [
        Cardinal::N,
        Cardinal::NE,
        Cardinal::E,
        Cardinal::SE,
        Cardinal::S,
        Cardinal::SW,
        Cardinal::W,
        Cardinal::NW,
    ];

    /// Map a bearing to the nearest of the 8 directions.
    ///
    /// Uses `round(bearing / 45) mod 8` with ties going to the higher
    /// index, so 22.5° is NE and 337.5° wraps to N.
    pub fn from_bearing(bearing_degrees: f64) -> Self {
        let sector = (bearing_degrees.rem_euclid(360.0) / 45.0 + 0.5).floor() as usize;
        Self::ALL[sector % 8]
    }

    /// Position on the rose, 0 (N) through 7 (NW)
    pub fn index(self) -> usize {
        self as usize
    }

    /// The diametrically opposite direction
    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 4) % 8]
    }

    /// Short label, e.g. "NE"
    pub fn label(self) -> &'static str {
        match self {
            Cardinal::N => "N",
            Cardinal::NE => "NE",
            Cardinal::E => "E",
            Cardinal::SE => "SE",
            Cardinal::S => "S",
            Cardinal::SW => "SW",
            Cardinal::W => "W",
            Cardinal::NW => "NW",
        }
    }

    /// Long-form name used in player-facing messages
    pub fn description(self) -> &'static str {
        match self {
            Cardinal::N => "north",
            Cardinal::NE => "north-east",
            Cardinal::E => "east",
            Cardinal::SE => "south-east",
            Cardinal::S => "south",
            Cardinal::SW => "south-west",
            Cardinal::W => "west",
            Cardinal::NW => "north-west",
        }
    }
}

impl std::fmt::Display for Cardinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
