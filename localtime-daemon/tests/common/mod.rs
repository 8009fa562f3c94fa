//! In-memory provider, agent launcher and applier shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use localtime_core::{Coordinate, TimezoneId};
use localtime_daemon::bus::{ACCESS_DENIED_ERROR, LOCATION_UPDATED_SIGNAL};
use localtime_daemon::{
    AgentLauncher, AgentProcess, ClientHandle, ClientProperty, DaemonError, LocationProvider,
    LocationRef, LocationSession, Notification, RemoteError, SessionOptions, TimezoneApplier,
};
use tokio::sync::mpsc;

pub const CLIENT_PATH: &str = "/org/freedesktop/GeoClue2/Client/1";

pub fn no_agent_error() -> RemoteError {
    RemoteError::new(
        ACCESS_DENIED_ERROR,
        "'localtimed' disallowed, no agent for UID 973",
    )
}

pub fn rejected(message: &str) -> RemoteError {
    RemoteError::new("org.freedesktop.DBus.Error.Failed", message)
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeNotification {
    pub name: Option<String>,
    pub path: Option<String>,
    pub refs: Result<(String, String), String>,
}

impl FakeNotification {
    pub fn updated(old: &str, new: &str) -> Self {
        Self {
            name: Some(LOCATION_UPDATED_SIGNAL.to_string()),
            path: Some(CLIENT_PATH.to_string()),
            refs: Ok((old.to_string(), new.to_string())),
        }
    }

    pub fn other(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            path: Some(CLIENT_PATH.to_string()),
            refs: Err("not a location update".to_string()),
        }
    }

    pub fn for_client(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn malformed() -> Self {
        Self {
            name: Some(LOCATION_UPDATED_SIGNAL.to_string()),
            path: Some(CLIENT_PATH.to_string()),
            refs: Err("expected signature `oo`, got `s`".to_string()),
        }
    }
}

impl Notification for FakeNotification {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn object_path(&self) -> Option<String> {
        self.path.clone()
    }

    fn location_refs(&self) -> Result<(LocationRef, LocationRef), String> {
        self.refs
            .clone()
            .map(|(old, new)| (LocationRef(old), LocationRef(new)))
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<String>>,
    create_error: Mutex<Option<RemoteError>>,
    reject_property: Mutex<Option<&'static str>>,
    start_results: Mutex<VecDeque<Result<(), RemoteError>>>,
    stop_error: Mutex<Option<RemoteError>>,
    release_error: Mutex<Option<RemoteError>>,
    locations: Mutex<HashMap<String, Coordinate>>,
    read_delay: Mutex<Duration>,
    start_delay: Mutex<Duration>,
    feed: Mutex<Option<mpsc::UnboundedSender<FakeNotification>>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn fail_create(&self, err: RemoteError) {
        *self.create_error.lock().unwrap() = Some(err);
    }

    pub fn reject_property(&self, name: &'static str) {
        *self.reject_property.lock().unwrap() = Some(name);
    }

    pub fn queue_start(&self, result: Result<(), RemoteError>) {
        self.start_results.lock().unwrap().push_back(result);
    }

    pub fn fail_stop(&self, err: RemoteError) {
        *self.stop_error.lock().unwrap() = Some(err);
    }

    pub fn fail_release(&self, err: RemoteError) {
        *self.release_error.lock().unwrap() = Some(err);
    }

    pub fn set_location(&self, path: &str, latitude: f64, longitude: f64) {
        self.locations
            .lock()
            .unwrap()
            .insert(path.to_string(), Coordinate::new(latitude, longitude));
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    /// Hold every Start call open for `delay`.
    pub fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.lock().unwrap() = delay;
    }

    /// Deliver a notification as if pushed by the provider.
    pub fn push(&self, notification: FakeNotification) {
        let feed = self.feed.lock().unwrap();
        let sender = feed.as_ref().expect("subscribe() not called yet");
        sender.send(notification).expect("notification stream dropped");
    }

    /// Simulate losing the bus: the notification stream ends.
    pub fn end_notifications(&self) {
        self.feed.lock().unwrap().take();
    }
}

impl LocationProvider for FakeProvider {
    type Notification = FakeNotification;
    type Notifications = BoxStream<'static, FakeNotification>;

    async fn create_client(&self) -> Result<ClientHandle, RemoteError> {
        self.record("GetClient");
        match self.create_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(ClientHandle(CLIENT_PATH.to_string())),
        }
    }

    async fn set_client_property(
        &self,
        _client: &ClientHandle,
        property: ClientProperty,
    ) -> Result<(), RemoteError> {
        let rendered = match &property {
            ClientProperty::DistanceThreshold(meters) => meters.to_string(),
            ClientProperty::RequestedAccuracyLevel(level) => level.as_u32().to_string(),
            ClientProperty::DesktopId(id) => id.clone(),
        };
        self.record(format!("Set {}={}", property.name(), rendered));
        if *self.reject_property.lock().unwrap() == Some(property.name()) {
            return Err(rejected("property is read-only"));
        }
        Ok(())
    }

    async fn start_client(&self, _client: &ClientHandle) -> Result<(), RemoteError> {
        self.record("Start");
        let delay = *self.start_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.start_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn stop_client(&self, _client: &ClientHandle) -> Result<(), RemoteError> {
        self.record("Stop");
        match self.stop_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn release_client(&self, _client: &ClientHandle) -> Result<(), RemoteError> {
        self.record("DeleteClient");
        match self.release_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn subscribe(&self) -> Result<Self::Notifications, RemoteError> {
        self.record("Subscribe");
        let (tx, rx) = mpsc::unbounded_channel();
        *self.feed.lock().unwrap() = Some(tx);
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|notification| (notification, rx))
        })
        .boxed())
    }

    async fn read_location(&self, location: &LocationRef) -> Result<Coordinate, RemoteError> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("Read {}", location.0));
        self.locations
            .lock()
            .unwrap()
            .get(&location.0)
            .copied()
            .ok_or_else(|| {
                RemoteError::new(
                    "org.freedesktop.DBus.Error.UnknownObject",
                    format!("no object at {}", location.0),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Agent launcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AgentCounters {
    pub spawned: AtomicUsize,
    pub live: AtomicUsize,
    pub terminated: AtomicUsize,
}

#[derive(Default)]
pub struct FakeLauncher {
    pub counters: Arc<AgentCounters>,
    pub fail_spawn: bool,
    pub fail_terminate: bool,
}

impl FakeLauncher {
    pub fn spawned(&self) -> usize {
        self.counters.spawned.load(Ordering::SeqCst)
    }
}

pub struct FakeAgent {
    counters: Arc<AgentCounters>,
    fail_terminate: bool,
}

impl AgentLauncher for FakeLauncher {
    type Agent = FakeAgent;

    fn spawn(&self) -> Result<FakeAgent, DaemonError> {
        self.counters.spawned.fetch_add(1, Ordering::SeqCst);
        if self.fail_spawn {
            return Err(DaemonError::HelperSpawn {
                path: "/usr/libexec/geoclue-2.0/demos/agent".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeAgent {
            counters: self.counters.clone(),
            fail_terminate: self.fail_terminate,
        })
    }
}

impl AgentProcess for FakeAgent {
    async fn terminate(self) -> Result<(), DaemonError> {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        self.counters.terminated.fetch_add(1, Ordering::SeqCst);
        if self.fail_terminate {
            return Err(DaemonError::HelperExit {
                path: "/usr/libexec/geoclue-2.0/demos/agent".into(),
                detail: "exited with exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingApplier {
    pub applied: Mutex<Vec<String>>,
}

impl RecordingApplier {
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

impl TimezoneApplier for RecordingApplier {
    async fn apply(&self, zone: &TimezoneId) -> Result<(), DaemonError> {
        self.applied.lock().unwrap().push(zone.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

pub type FakeSession = LocationSession<FakeProvider, FakeLauncher>;

pub fn options() -> SessionOptions {
    SessionOptions {
        agent_settle: Duration::ZERO,
        ..SessionOptions::default()
    }
}

pub async fn open(provider: &Arc<FakeProvider>, launcher: Option<FakeLauncher>) -> FakeSession {
    LocationSession::open(provider.clone(), launcher, options())
        .await
        .expect("open session")
}
