//! localtime core library: domain types, configuration, timezone lookup.
//!
//! Public API surface:
//! - [`types`]: coordinates, zone identifiers, accuracy tiers, location events
//! - [`config`]: YAML daemon configuration
//! - [`lookup`]: coordinate → IANA zone resolution
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod lookup;
pub mod types;

pub use config::{AgentConfig, Config, TimedateConfig, DEFAULT_CONFIG_PATH};
pub use error::ConfigError;
pub use lookup::{TimezoneLookup, TzfLookup};
pub use types::{AccuracyLevel, Coordinate, LocationEvent, TimezoneId};
