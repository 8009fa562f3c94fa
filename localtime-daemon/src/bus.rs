//! D-Bus bindings for GeoClue2 and timedated.
//!
//! Names are grouped by the remote interface they belong to.

use futures_util::stream::{BoxStream, StreamExt};
use localtime_core::{Coordinate, TimezoneId};
use zbus::proxy::CacheProperties;
use zbus::zvariant::{ObjectPath, OwnedObjectPath};
use zbus::{proxy, Connection, DBusError, MatchRule, Message, MessageStream};

use crate::applier::TimezoneApplier;
use crate::error::{DaemonError, RemoteError};
use crate::provider::{
    ClientHandle, ClientProperty, LocationProvider, LocationRef, Notification,
};
use crate::stream::EVENT_QUEUE_DEPTH;

// GeoClue2
pub const GEOCLUE_SERVICE: &str = "org.freedesktop.GeoClue2";
pub const GEOCLUE_MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
pub const GEOCLUE_MANAGER_INTERFACE: &str = "org.freedesktop.GeoClue2.Manager";
pub const GEOCLUE_CLIENT_INTERFACE: &str = "org.freedesktop.GeoClue2.Client";
pub const GEOCLUE_LOCATION_INTERFACE: &str = "org.freedesktop.GeoClue2.Location";
pub const LOCATION_UPDATED_SIGNAL: &str = "org.freedesktop.GeoClue2.Client.LocationUpdated";

// GeoClue answers Client.Start with AccessDenied and this text when no agent
// is registered for the caller's UID.
pub const ACCESS_DENIED_ERROR: &str = "org.freedesktop.DBus.Error.AccessDenied";
pub const MISSING_AGENT_MARKER: &str = "no agent for UID";

// timedated
pub const TIMEDATE_SERVICE: &str = "org.freedesktop.timedate1";
pub const TIMEDATE_PATH: &str = "/org/freedesktop/timedate1";
pub const TIMEDATE_INTERFACE: &str = "org.freedesktop.timedate1";
pub const SET_TIMEZONE_ACTION: &str = "org.freedesktop.timedate1.set-timezone";

#[proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager",
    gen_blocking = false
)]
trait Manager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;

    fn delete_client(&self, client: &ObjectPath<'_>) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2",
    gen_blocking = false
)]
trait Client {
    fn start(&self) -> zbus::Result<()>;

    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn distance_threshold(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_distance_threshold(&self, value: u32) -> zbus::Result<()>;

    #[zbus(property)]
    fn requested_accuracy_level(&self) -> zbus::Result<u32>;

    #[zbus(property)]
    fn set_requested_accuracy_level(&self, value: u32) -> zbus::Result<()>;

    #[zbus(property)]
    fn desktop_id(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn set_desktop_id(&self, value: &str) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2",
    gen_blocking = false
)]
trait Location {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;
}

#[proxy(
    interface = "org.freedesktop.timedate1",
    default_service = "org.freedesktop.timedate1",
    default_path = "/org/freedesktop/timedate1",
    gen_blocking = false
)]
trait Timedate1 {
    fn set_timezone(&self, timezone: &str, interactive: bool) -> zbus::Result<()>;
}

impl From<zbus::Error> for RemoteError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, message, _) => Self {
                name: Some(name.to_string()),
                message: message.unwrap_or_default(),
            },
            zbus::Error::FDO(fdo) => Self {
                name: Some(fdo.name().to_string()),
                message: fdo.description().unwrap_or_default().to_string(),
            },
            other => Self::local(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Location provider
// ---------------------------------------------------------------------------

/// [`LocationProvider`] over a GeoClue2 service on a shared bus connection.
#[derive(Debug, Clone)]
pub struct GeoClue {
    conn: Connection,
}

impl GeoClue {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn client_proxy(&self, client: &ClientHandle) -> zbus::Result<ClientProxy<'static>> {
        // Short-lived proxies: no property cache.
        ClientProxy::builder(&self.conn)
            .path(client.0.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await
    }
}

impl LocationProvider for GeoClue {
    type Notification = Message;
    type Notifications = BoxStream<'static, Message>;

    async fn create_client(&self) -> Result<ClientHandle, RemoteError> {
        let manager = ManagerProxy::new(&self.conn).await?;
        let path = manager.get_client().await?;
        Ok(ClientHandle(path.to_string()))
    }

    async fn set_client_property(
        &self,
        client: &ClientHandle,
        property: ClientProperty,
    ) -> Result<(), RemoteError> {
        let proxy = self.client_proxy(client).await?;
        match property {
            ClientProperty::DistanceThreshold(meters) => {
                proxy.set_distance_threshold(meters).await?
            }
            ClientProperty::RequestedAccuracyLevel(level) => {
                proxy.set_requested_accuracy_level(level.as_u32()).await?
            }
            ClientProperty::DesktopId(id) => proxy.set_desktop_id(&id).await?,
        }
        Ok(())
    }

    async fn start_client(&self, client: &ClientHandle) -> Result<(), RemoteError> {
        Ok(self.client_proxy(client).await?.start().await?)
    }

    async fn stop_client(&self, client: &ClientHandle) -> Result<(), RemoteError> {
        Ok(self.client_proxy(client).await?.stop().await?)
    }

    async fn release_client(&self, client: &ClientHandle) -> Result<(), RemoteError> {
        let path = ObjectPath::try_from(client.0.as_str()).map_err(zbus::Error::from)?;
        let manager = ManagerProxy::new(&self.conn).await?;
        Ok(manager.delete_client(&path).await?)
    }

    async fn subscribe(&self) -> Result<Self::Notifications, RemoteError> {
        // Client signals are unicast to this connection; the rule only narrows
        // delivery to signals from the provider.
        let rule = MatchRule::builder()
            .msg_type(zbus::message::Type::Signal)
            .sender(GEOCLUE_SERVICE)?
            .build();
        let stream =
            MessageStream::for_match_rule(rule, &self.conn, Some(EVENT_QUEUE_DEPTH)).await?;
        Ok(stream
            .filter_map(|message| async move {
                match message {
                    Ok(message) => Some(message),
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping unreadable bus message");
                        None
                    }
                }
            })
            .boxed())
    }

    async fn read_location(&self, location: &LocationRef) -> Result<Coordinate, RemoteError> {
        let proxy = LocationProxy::builder(&self.conn)
            .path(location.0.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        let latitude = proxy.latitude().await?;
        let longitude = proxy.longitude().await?;
        Ok(Coordinate::new(latitude, longitude))
    }
}

impl Notification for Message {
    fn name(&self) -> Option<String> {
        let header = self.header();
        if header.message_type() != zbus::message::Type::Signal {
            return None;
        }
        let interface = header.interface()?;
        let member = header.member()?;
        Some(format!("{interface}.{member}"))
    }

    fn object_path(&self) -> Option<String> {
        self.header().path().map(|path| path.to_string())
    }

    fn location_refs(&self) -> Result<(LocationRef, LocationRef), String> {
        let (old, new): (OwnedObjectPath, OwnedObjectPath) = self
            .body()
            .deserialize()
            .map_err(|err| err.to_string())?;
        Ok((LocationRef(old.to_string()), LocationRef(new.to_string())))
    }
}

// ---------------------------------------------------------------------------
// Timezone applier
// ---------------------------------------------------------------------------

/// [`TimezoneApplier`] calling `org.freedesktop.timedate1.SetTimezone`.
#[derive(Debug, Clone)]
pub struct Timedate {
    conn: Connection,
    interactive: bool,
}

impl Timedate {
    pub fn new(conn: Connection, interactive: bool) -> Self {
        Self { conn, interactive }
    }
}

impl TimezoneApplier for Timedate {
    async fn apply(&self, zone: &TimezoneId) -> Result<(), DaemonError> {
        let apply_err = |err: zbus::Error| DaemonError::Apply {
            zone: zone.clone(),
            source: RemoteError::from(err),
        };
        let proxy = Timedate1Proxy::new(&self.conn).await.map_err(apply_err)?;
        proxy
            .set_timezone(zone.as_str(), self.interactive)
            .await
            .map_err(apply_err)
    }
}
