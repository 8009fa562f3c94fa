//! Provider-side session lifecycle: Open → Start → Close.
//!
//! # State machine
//!
//! ```text
//! Open ──start()──▶ Starting ──ok──▶ Running ──close()──▶ Closed
//!   ▲                  │
//!   └──── failed ──────┘        Open ──close()──▶ Closed
//! ```
//!
//! The state lives in an atomic so that `close()` is a single gated
//! transition: the first caller tears down, later callers return `Ok(())`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use localtime_core::Config;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::agent::{AgentLauncher, AgentProcess};
use crate::error::{provider_err, DaemonError};
use crate::provider::{ClientHandle, ClientSettings, LocationProvider};
use crate::stream::{pump, LocationEventStream, EVENT_QUEUE_DEPTH};

const OPEN: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const CLOSED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Starting,
    Running,
    Closed,
}

impl SessionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            OPEN => Self::Open,
            STARTING => Self::Starting,
            RUNNING => Self::Running,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub client: ClientSettings,
    /// Pause between spawning the fallback agent and retrying Start.
    pub agent_settle: Duration,
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            client: ClientSettings::from(config),
            agent_settle: Duration::from_millis(config.agent.settle_ms),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Resources that exist only while the session is running.
struct Active<A> {
    close_tx: watch::Sender<bool>,
    pump: JoinHandle<()>,
    agent: Option<A>,
}

/// One subscription to the location provider.
pub struct LocationSession<P: LocationProvider, L: AgentLauncher> {
    provider: Arc<P>,
    launcher: Option<L>,
    client: ClientHandle,
    options: SessionOptions,
    state: AtomicU8,
    active: Mutex<Option<Active<L::Agent>>>,
}

impl<P: LocationProvider, L: AgentLauncher> LocationSession<P, L> {
    /// Create and configure a provider-side client. No events flow yet.
    ///
    /// `launcher` is the fallback used when the provider reports that no
    /// consent agent is registered; `None` surfaces that condition as an error.
    pub async fn open(
        provider: Arc<P>,
        launcher: Option<L>,
        options: SessionOptions,
    ) -> Result<Self, DaemonError> {
        let client = provider
            .create_client()
            .await
            .map_err(provider_err("Manager.GetClient"))?;
        tracing::debug!(client = %client, "created location client");

        for property in options.client.properties() {
            let name = property.name();
            if let Err(err) = provider.set_client_property(&client, property).await {
                if let Err(release_err) = provider.release_client(&client).await {
                    tracing::warn!(
                        client = %client,
                        error = %release_err,
                        "failed to release half-configured client",
                    );
                }
                tracing::debug!(property = name, "client property rejected");
                return Err(DaemonError::Provider {
                    call: "Client.SetProperty",
                    source: err,
                });
            }
        }

        tracing::info!(
            client = %client,
            accuracy = %options.client.accuracy,
            distance_threshold = options.client.distance_threshold,
            desktop_id = %options.client.desktop_id,
            "location session opened",
        );

        Ok(Self {
            provider,
            launcher,
            client,
            options,
            state: AtomicU8::new(OPEN),
            active: Mutex::new(None),
        })
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    /// Begin location delivery and return the event stream.
    pub async fn start(&self) -> Result<LocationEventStream, DaemonError> {
        if let Err(raw) =
            self.state
                .compare_exchange(OPEN, STARTING, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(DaemonError::InvalidState {
                operation: "start",
                state: SessionState::from_raw(raw),
            });
        }

        match self.start_inner().await {
            Ok((stream, active)) => {
                *self.lock_active() = Some(active);
                self.state.store(RUNNING, Ordering::Release);
                tracing::info!(client = %self.client, "location session started");
                Ok(stream)
            }
            Err(err) => {
                self.state.store(OPEN, Ordering::Release);
                Err(err)
            }
        }
    }

    async fn start_inner(&self) -> Result<(LocationEventStream, Active<L::Agent>), DaemonError> {
        // Subscribe before Start so the first update cannot slip past.
        let notifications = self
            .provider
            .subscribe()
            .await
            .map_err(provider_err("subscribe"))?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (close_tx, close_rx) = watch::channel(false);
        let pump = tokio::spawn(pump(
            self.provider.clone(),
            self.client.clone(),
            notifications,
            events_tx,
            close_rx.clone(),
        ));

        let agent = match self.start_with_fallback().await {
            Ok(agent) => agent,
            Err(err) => {
                let _ = close_tx.send(true);
                if let Err(join_err) = pump.await {
                    tracing::warn!(error = %join_err, "location pump failed during aborted start");
                }
                return Err(err);
            }
        };

        let stream = LocationEventStream::new(events_rx, close_rx);
        Ok((
            stream,
            Active {
                close_tx,
                pump,
                agent,
            },
        ))
    }

    /// Issue Start; on a missing-agent rejection spawn the fallback agent and
    /// retry exactly once. Never leaves the agent running on failure.
    async fn start_with_fallback(&self) -> Result<Option<L::Agent>, DaemonError> {
        let err = match self.provider.start_client(&self.client).await {
            Ok(()) => return Ok(None),
            Err(err) => err,
        };

        let launcher = match &self.launcher {
            Some(launcher) if err.is_missing_agent() => launcher,
            _ => return Err(provider_err("Client.Start")(err)),
        };

        tracing::warn!(error = %err, "no consent agent registered; spawning fallback agent");
        let agent = launcher.spawn()?;

        if !self.options.agent_settle.is_zero() {
            tokio::time::sleep(self.options.agent_settle).await;
        }

        match self.provider.start_client(&self.client).await {
            Ok(()) => Ok(Some(agent)),
            Err(retry_err) => {
                if let Err(term_err) = agent.terminate().await {
                    tracing::warn!(error = %term_err, "failed to terminate fallback agent");
                }
                Err(provider_err("Client.Start")(retry_err))
            }
        }
    }

    /// Stop delivery and release everything the session holds.
    ///
    /// Every teardown step runs even when an earlier one fails; the first
    /// error is returned. Calling `close` again is a no-op.
    pub async fn close(&self) -> Result<(), DaemonError> {
        let previous = loop {
            let current = self.state.load(Ordering::Acquire);
            match current {
                CLOSED => return Ok(()),
                STARTING => {
                    return Err(DaemonError::InvalidState {
                        operation: "close",
                        state: SessionState::Starting,
                    })
                }
                _ => {}
            }
            if self
                .state
                .compare_exchange(current, CLOSED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break current;
            }
        };

        let active = self.lock_active().take();
        let mut first_err: Option<DaemonError> = None;
        let mut record = |err: DaemonError| {
            tracing::warn!(error = %err, "location session teardown step failed");
            first_err.get_or_insert(err);
        };

        let mut agent = None;
        if let Some(active) = active {
            // Pump first, so nothing more is produced once close returns.
            let _ = active.close_tx.send(true);
            if let Err(err) = active.pump.await {
                record(DaemonError::Task(format!("location pump: {err}")));
            }
            agent = active.agent;
        }

        if previous == RUNNING {
            if let Err(err) = self.provider.stop_client(&self.client).await {
                record(provider_err("Client.Stop")(err));
            }
        }

        if let Some(agent) = agent {
            if let Err(err) = agent.terminate().await {
                record(err);
            }
        }

        if let Err(err) = self.provider.release_client(&self.client).await {
            record(provider_err("Manager.DeleteClient")(err));
        }

        tracing::info!(client = %self.client, "location session closed");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Active<L::Agent>>> {
        // Poisoning only happens if a holder panicked; the data is still an Option.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<P: LocationProvider, L: AgentLauncher> Drop for LocationSession<P, L> {
    fn drop(&mut self) {
        if self.state() != SessionState::Closed {
            tracing::warn!(client = %self.client, "location session dropped without close");
            if let Some(active) = self.lock_active().take() {
                let _ = active.close_tx.send(true);
                active.pump.abort();
            }
        }
    }
}
