use std::fmt;
use std::path::PathBuf;

use localtime_core::TimezoneId;
use thiserror::Error;

use crate::session::SessionState;

/// Error surface for the location session, the event stream, the sync loop
/// and systemd management.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A remote call to the location provider was rejected.
    #[error("location provider call {call} failed: {source}")]
    Provider {
        call: &'static str,
        #[source]
        source: RemoteError,
    },

    /// Misuse of the session state machine; indicates a bug in the caller.
    #[error("cannot {operation} a session that is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// A location notification could not be turned into coordinates.
    #[error("undecodable location notification: {0}")]
    Decode(String),

    #[error("failed to spawn consent agent {path}: {source}")]
    HelperSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("consent agent {path} did not exit cleanly: {detail}")]
    HelperExit { path: PathBuf, detail: String },

    #[error("failed to apply timezone {zone}: {source}")]
    Apply {
        zone: TimezoneId,
        #[source]
        source: RemoteError,
    },

    #[error("provider notification stream ended")]
    NotificationsEnded,

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("config error: {0}")]
    Config(#[from] localtime_core::ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("systemd error: {0}")]
    Systemd(String),

    #[error("background task failure: {0}")]
    Task(String),
}

/// A rejected D-Bus call, reduced to the parts callers branch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RemoteError {
    /// D-Bus error name, e.g. `org.freedesktop.DBus.Error.AccessDenied`.
    pub name: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: message.into(),
        }
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
        }
    }

    /// The provider refused to start because no consent agent is registered
    /// for the calling user.
    pub fn is_missing_agent(&self) -> bool {
        self.name.as_deref() == Some(crate::bus::ACCESS_DENIED_ERROR)
            && self.message.contains(crate::bus::MISSING_AGENT_MARKER)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if self.message.is_empty() => f.write_str(name),
            Some(name) => write!(f, "{name}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn provider_err(call: &'static str) -> impl FnOnce(RemoteError) -> DaemonError {
    move |source| DaemonError::Provider { call, source }
}
