//! Fallback consent agent process.
//!
//! Only spawned when the provider rejects Start because no agent is
//! registered for the calling user.

use std::future::Future;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;

use localtime_core::AgentConfig;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::error::DaemonError;

pub trait AgentLauncher: Send + Sync + 'static {
    type Agent: AgentProcess;

    fn spawn(&self) -> Result<Self::Agent, DaemonError>;
}

pub trait AgentProcess: Send + 'static {
    /// Signal the process to exit and wait until it has.
    fn terminate(self) -> impl Future<Output = Result<(), DaemonError>> + Send;
}

/// Spawns the configured agent binary as a child of the daemon.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    path: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// `None` when the agent fallback is disabled.
    pub fn from_config(config: &AgentConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(&config.path, config.args.clone()))
    }
}

impl AgentLauncher for ProcessLauncher {
    type Agent = AgentChild;

    fn spawn(&self) -> Result<AgentChild, DaemonError> {
        let child = Command::new(&self.path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::HelperSpawn {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!(
            path = %self.path.display(),
            pid = child.id(),
            "spawned fallback consent agent",
        );
        Ok(AgentChild {
            child,
            path: self.path.clone(),
        })
    }
}

#[derive(Debug)]
pub struct AgentChild {
    child: Child,
    path: PathBuf,
}

impl AgentChild {
    fn exit_err(&self, detail: impl Into<String>) -> DaemonError {
        DaemonError::HelperExit {
            path: self.path.clone(),
            detail: detail.into(),
        }
    }
}

impl AgentProcess for AgentChild {
    async fn terminate(mut self) -> Result<(), DaemonError> {
        // `id()` is None once the child has been reaped.
        if let Some(pid) = self.child.id() {
            let pid = i32::try_from(pid).map_err(|_| self.exit_err(format!("pid {pid} out of range")))?;
            if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                // ESRCH: exited on its own between id() and kill().
                if errno != nix::errno::Errno::ESRCH {
                    return Err(self.exit_err(format!("SIGTERM failed: {errno}")));
                }
            }
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|err| self.exit_err(format!("wait failed: {err}")))?;

        if status.success() || status.signal() == Some(Signal::SIGTERM as i32) {
            tracing::debug!(path = %self.path.display(), %status, "consent agent exited");
            Ok(())
        } else {
            Err(self.exit_err(format!("exited with {status}")))
        }
    }
}
