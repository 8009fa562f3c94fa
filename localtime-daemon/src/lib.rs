//! localtimed runtime: GeoClue location session, event stream, timezone sync
//! loop, and systemd integration.

pub mod agent;
pub mod applier;
pub mod bus;
mod error;
pub mod paths;
pub mod provider;
mod runtime;
pub mod session;
pub mod stream;
pub mod sync;
pub mod systemd;

pub use agent::{AgentLauncher, AgentProcess, ProcessLauncher};
pub use applier::TimezoneApplier;
pub use error::{DaemonError, RemoteError};
pub use provider::{ClientHandle, ClientProperty, ClientSettings, LocationProvider, LocationRef, Notification};
pub use runtime::{run, start_blocking};
pub use session::{LocationSession, SessionOptions, SessionState};
pub use stream::{decode_notification, Decoded, LocationEventStream};
pub use sync::{SyncLoop, SyncOutcome};
pub use systemd::{install as install_systemd, uninstall as uninstall_systemd};
