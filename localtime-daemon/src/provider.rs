//! Seams between the session logic and the location provider transport.
//!
//! [`crate::bus::GeoClue`] implements these over D-Bus; tests implement them
//! in memory.

use std::fmt;
use std::future::Future;

use futures_util::Stream;
use localtime_core::{AccuracyLevel, Config, Coordinate};

use crate::error::RemoteError;

/// Object path of a provider-side client (session) object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientHandle(pub String);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Object path of a provider-side location object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationRef(pub String);

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One writable property of the client object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientProperty {
    DistanceThreshold(u32),
    RequestedAccuracyLevel(AccuracyLevel),
    DesktopId(String),
}

impl ClientProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DistanceThreshold(_) => "DistanceThreshold",
            Self::RequestedAccuracyLevel(_) => "RequestedAccuracyLevel",
            Self::DesktopId(_) => "DesktopId",
        }
    }
}

/// Properties written to the client object right after it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub distance_threshold: u32,
    pub accuracy: AccuracyLevel,
    pub desktop_id: String,
}

impl ClientSettings {
    pub fn properties(&self) -> [ClientProperty; 3] {
        [
            ClientProperty::DistanceThreshold(self.distance_threshold),
            ClientProperty::RequestedAccuracyLevel(self.accuracy),
            ClientProperty::DesktopId(self.desktop_id.clone()),
        ]
    }
}

impl From<&Config> for ClientSettings {
    fn from(config: &Config) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            accuracy: config.accuracy,
            desktop_id: config.desktop_id.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// A raw message pushed by the provider.
pub trait Notification: Send + 'static {
    /// Fully qualified signal name (`interface.member`); `None` for anything
    /// that is not a signal.
    fn name(&self) -> Option<String>;

    /// Object path the signal was emitted from.
    fn object_path(&self) -> Option<String>;

    /// `(old, new)` location object paths carried in the body.
    fn location_refs(&self) -> Result<(LocationRef, LocationRef), String>;
}

/// Remote operations the session consumes.
pub trait LocationProvider: Send + Sync + 'static {
    type Notification: Notification;
    type Notifications: Stream<Item = Self::Notification> + Send + Unpin + 'static;

    fn create_client(&self) -> impl Future<Output = Result<ClientHandle, RemoteError>> + Send;

    fn set_client_property(
        &self,
        client: &ClientHandle,
        property: ClientProperty,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn start_client(
        &self,
        client: &ClientHandle,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn stop_client(
        &self,
        client: &ClientHandle,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Drop the provider-side client object.
    fn release_client(
        &self,
        client: &ClientHandle,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Begin receiving notifications addressed to this connection.
    fn subscribe(&self) -> impl Future<Output = Result<Self::Notifications, RemoteError>> + Send;

    fn read_location(
        &self,
        location: &LocationRef,
    ) -> impl Future<Output = Result<Coordinate, RemoteError>> + Send;
}
