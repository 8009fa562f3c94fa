//! Translation of raw provider notifications into an ordered stream of
//! [`LocationEvent`]s.
//!
//! One background pump task per running session reads notifications, decodes
//! them and forwards them into a bounded queue. The consumer side
//! ([`LocationEventStream`]) shares the session's close signal, so nothing is
//! yielded once the session is closed even if events are still queued.

use std::sync::Arc;

use futures_util::StreamExt;
use localtime_core::LocationEvent;
use tokio::sync::{mpsc, watch};

use crate::bus::LOCATION_UPDATED_SIGNAL;
use crate::error::DaemonError;
use crate::provider::{ClientHandle, LocationProvider, LocationRef, Notification};

/// Pending decoded events before the pump stops reading notifications.
pub const EVENT_QUEUE_DEPTH: usize = 10;

type EventResult = Result<LocationEvent, DaemonError>;

/// Ordered, single-pass, cancellable sequence of location events.
///
/// Yields `Some(Ok(_))` per `LocationUpdated` notification, at most one
/// `Some(Err(_))` when the provider breaks its contract, and `None` once the
/// owning session is closed.
#[derive(Debug)]
pub struct LocationEventStream {
    events: mpsc::Receiver<EventResult>,
    closed: watch::Receiver<bool>,
    finished: bool,
}

impl LocationEventStream {
    pub(crate) fn new(events: mpsc::Receiver<EventResult>, closed: watch::Receiver<bool>) -> Self {
        Self {
            events,
            closed,
            finished: false,
        }
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Option<EventResult> {
        if self.finished || *self.closed.borrow() {
            self.finished = true;
            return None;
        }

        let item = tokio::select! {
            biased;
            // Err means the session was dropped without Close; also terminal.
            _ = self.closed.wait_for(|closed| *closed) => None,
            item = self.events.recv() => item,
        };

        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

/// Result of decoding one notification.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// Not a `LocationUpdated` signal for this client.
    Ignored,
    Updated { old: LocationRef, new: LocationRef },
}

/// Classify and decode a raw notification.
///
/// Unrelated traffic is `Ignored`; a `LocationUpdated` signal whose body is
/// not two object paths is a `Decode` error.
pub fn decode_notification<N: Notification>(
    notification: &N,
    client: &ClientHandle,
) -> Result<Decoded, DaemonError> {
    if notification.name().as_deref() != Some(LOCATION_UPDATED_SIGNAL) {
        return Ok(Decoded::Ignored);
    }
    if let Some(path) = notification.object_path() {
        if path != client.0 {
            tracing::debug!(path = %path, client = %client, "ignoring update for another client");
            return Ok(Decoded::Ignored);
        }
    }
    let (old, new) = notification
        .location_refs()
        .map_err(|reason| DaemonError::Decode(format!("LocationUpdated body: {reason}")))?;
    Ok(Decoded::Updated { old, new })
}

/// Background activity of a running session.
///
/// Exits when the close signal fires, after forwarding a terminal error, or
/// when the consumer has dropped its stream.
pub(crate) async fn pump<P: LocationProvider>(
    provider: Arc<P>,
    client: ClientHandle,
    mut notifications: P::Notifications,
    events: mpsc::Sender<EventResult>,
    mut closed: watch::Receiver<bool>,
) {
    let mut sequence = 0u64;

    loop {
        let notification = tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => break,
            next = notifications.next() => next,
        };

        let item = match notification {
            None => Err(DaemonError::NotificationsEnded),
            Some(notification) => match decode_notification(&notification, &client) {
                Ok(Decoded::Ignored) => continue,
                Ok(Decoded::Updated { old, new }) => {
                    tracing::debug!(old = %old, new = %new, "location updated");
                    provider
                        .read_location(&new)
                        .await
                        .map(|coordinate| LocationEvent {
                            coordinate,
                            sequence,
                        })
                        .map_err(|err| {
                            DaemonError::Decode(format!("reading location {new}: {err}"))
                        })
                }
                Err(err) => Err(err),
            },
        };

        let terminal = item.is_err();
        if let Err(err) = &item {
            tracing::error!(error = %err, "location stream failed");
        }

        // A slow consumer applies backpressure here; Close still wins.
        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => break,
            sent = events.send(item) => {
                if sent.is_err() {
                    tracing::debug!("location stream consumer went away");
                    break;
                }
            }
        }

        if terminal {
            break;
        }
        sequence += 1;
    }
}
