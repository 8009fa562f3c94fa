use std::future::Future;

use localtime_core::TimezoneId;

use crate::error::DaemonError;

/// Commits a zone as the system timezone. Implemented over D-Bus by
/// [`crate::bus::Timedate`].
pub trait TimezoneApplier: Send + Sync {
    fn apply(&self, zone: &TimezoneId) -> impl Future<Output = Result<(), DaemonError>> + Send;
}
