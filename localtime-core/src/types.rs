//! Domain types shared by the lookup, the location client and the sync loop.
//!
//! All values here are immutable once produced; none carry identity beyond
//! their fields.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A point reported by the location provider, in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite and inside their geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// TimezoneId
// ---------------------------------------------------------------------------

/// An IANA zone name such as `Europe/London`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimezoneId(pub String);

impl TimezoneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimezoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TimezoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TimezoneId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// AccuracyLevel
// ---------------------------------------------------------------------------

/// Coarseness tier requested from the provider.
///
/// Discriminants are the provider's wire values; declaration order is the
/// coarse-to-fine ordering, so `AccuracyLevel::City < AccuracyLevel::Street`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyLevel {
    None = 0,
    Country = 1,
    City = 4,
    Neighborhood = 5,
    Street = 6,
    Exact = 8,
}

impl AccuracyLevel {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl Default for AccuracyLevel {
    fn default() -> Self {
        Self::City
    }
}

impl fmt::Display for AccuracyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Country => "country",
            Self::City => "city",
            Self::Neighborhood => "neighborhood",
            Self::Street => "street",
            Self::Exact => "exact",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// LocationEvent
// ---------------------------------------------------------------------------

/// One decoded `LocationUpdated` notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationEvent {
    pub coordinate: Coordinate,
    /// 0-based position of the notification within its stream.
    pub sequence: u64,
}
