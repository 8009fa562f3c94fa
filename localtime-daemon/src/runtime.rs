use std::sync::Arc;

use localtime_core::{Config, TzfLookup};
use zbus::Connection;

use crate::agent::ProcessLauncher;
use crate::bus::{GeoClue, Timedate};
use crate::error::{io_err, DaemonError};
use crate::session::{LocationSession, SessionOptions};
use crate::sync::SyncLoop;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon until the location stream fails or a shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    config.validate()?;

    let conn = Connection::system().await?;
    tracing::info!("connected to system bus");

    let provider = Arc::new(GeoClue::new(conn.clone()));
    let launcher = ProcessLauncher::from_config(&config.agent);
    let session = LocationSession::open(provider, launcher, SessionOptions::from(&config)).await?;

    let mut events = match session.start().await {
        Ok(events) => events,
        Err(err) => {
            if let Err(close_err) = session.close().await {
                tracing::warn!(error = %close_err, "closing session after failed start");
            }
            return Err(err);
        }
    };

    let lookup = tokio::task::spawn_blocking(TzfLookup::new)
        .await
        .map_err(|err| DaemonError::Task(format!("timezone dataset load: {err}")))?;
    let applier = Timedate::new(conn.clone(), config.timedate.interactive);
    let mut sync = SyncLoop::new(lookup, applier);

    let outcome = tokio::select! {
        result = sync.run(&mut events) => result,
        signal = shutdown_signal() => {
            match signal {
                Ok(name) => {
                    tracing::info!(signal = name, "shutting down daemon");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
    };

    let closed = session.close().await;
    outcome?;
    closed
}

async fn shutdown_signal() -> Result<&'static str, DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).map_err(|e| io_err("SIGTERM handler", e))?;
    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        ctrl_c = tokio::signal::ctrl_c() => {
            ctrl_c.map_err(|e| io_err("SIGINT handler", e))?;
            Ok("SIGINT")
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
