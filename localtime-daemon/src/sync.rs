//! Location event → timezone application loop.
//!
//! Single consumer: the last-applied zone is plain mutable state, so events
//! must be handled one at a time.

use localtime_core::{LocationEvent, TimezoneId, TimezoneLookup};

use crate::applier::TimezoneApplier;
use crate::error::DaemonError;
use crate::stream::LocationEventStream;

/// What happened to one location event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied(TimezoneId),
    /// Resolved to the zone applied last time; nothing sent.
    Unchanged(TimezoneId),
    NoZone,
    /// The applier rejected the zone; last-applied is left untouched.
    ApplyFailed(TimezoneId),
}

pub struct SyncLoop<Z, A> {
    lookup: Z,
    applier: A,
    last_applied: Option<TimezoneId>,
}

impl<Z: TimezoneLookup, A: TimezoneApplier> SyncLoop<Z, A> {
    pub fn new(lookup: Z, applier: A) -> Self {
        Self {
            lookup,
            applier,
            last_applied: None,
        }
    }

    pub fn last_applied(&self) -> Option<&TimezoneId> {
        self.last_applied.as_ref()
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub async fn handle(&mut self, event: LocationEvent) -> SyncOutcome {
        let Some(zone) = self.lookup.lookup(event.coordinate) else {
            tracing::warn!(
                coordinate = %event.coordinate,
                sequence = event.sequence,
                "no timezone found for location",
            );
            return SyncOutcome::NoZone;
        };

        if self.last_applied.as_ref() == Some(&zone) {
            tracing::debug!(zone = %zone, sequence = event.sequence, "timezone unchanged");
            return SyncOutcome::Unchanged(zone);
        }

        match self.applier.apply(&zone).await {
            Ok(()) => {
                tracing::info!(
                    zone = %zone,
                    coordinate = %event.coordinate,
                    "system timezone updated",
                );
                self.last_applied = Some(zone.clone());
                SyncOutcome::Applied(zone)
            }
            Err(err) => {
                tracing::error!(zone = %zone, error = %err, "failed to set timezone");
                SyncOutcome::ApplyFailed(zone)
            }
        }
    }

    /// Consume `events` until the stream ends. A terminal stream error ends
    /// the loop and is returned.
    pub async fn run(&mut self, events: &mut LocationEventStream) -> Result<(), DaemonError> {
        while let Some(event) = events.next().await {
            self.handle(event?).await;
        }
        Ok(())
    }
}
