//! Coordinate → IANA zone resolution.
//!
//! Pure and stateless from the caller's point of view: the only failure mode
//! is "no zone found", expressed as `None`.

use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::types::{Coordinate, TimezoneId};

/// Resolves a coordinate to the zone that contains it.
pub trait TimezoneLookup {
    fn lookup(&self, coordinate: Coordinate) -> Option<TimezoneId>;
}

/// Lookup backed by the polygon dataset embedded in `tzf-rs`.
///
/// Building the finder decodes the whole dataset, so construct one per process
/// and reuse it.
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl TzfLookup {
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneLookup for TzfLookup {
    fn lookup(&self, coordinate: Coordinate) -> Option<TimezoneId> {
        if !coordinate.is_valid() {
            return None;
        }
        // tzf takes (longitude, latitude).
        let name = self
            .finder
            .get_tz_name(coordinate.longitude, coordinate.latitude);
        canonical_zone(name)
    }
}

/// Accept `name` only if it is a zone the tz database knows about.
pub fn canonical_zone(name: &str) -> Option<TimezoneId> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>()
        .ok()
        .map(|tz| TimezoneId::from(tz.name()))
}
