mod common;

use common::{open, FakeNotification, FakeProvider, RecordingApplier};
use localtime_core::TzfLookup;
use localtime_daemon::{SyncLoop, SyncOutcome};

const BASE: &str = "/org/freedesktop/GeoClue2/Client/1/Location";

#[tokio::test]
async fn travelling_applies_only_zone_changes() {
    let provider = FakeProvider::new();
    let stops = [
        (40.7128, -74.0060),
        (40.7306, -73.9352),
        (51.5074, -0.1278),
    ];
    for (i, (lat, lon)) in stops.iter().enumerate() {
        provider.set_location(&format!("{BASE}/{}", i + 1), *lat, *lon);
    }

    let session = open(&provider, None).await;
    let mut events = session.start().await.expect("start");
    for i in 0..stops.len() {
        provider.push(FakeNotification::updated(
            &format!("{BASE}/{i}"),
            &format!("{BASE}/{}", i + 1),
        ));
    }

    let mut sync = SyncLoop::new(TzfLookup::new(), RecordingApplier::default());
    let mut outcomes = Vec::new();
    for _ in 0..stops.len() {
        let event = events.next().await.expect("event").expect("ok");
        outcomes.push(sync.handle(event).await);
    }
    session.close().await.expect("close");

    assert!(matches!(outcomes[0], SyncOutcome::Applied(_)));
    assert!(matches!(outcomes[1], SyncOutcome::Unchanged(_)));
    assert!(matches!(outcomes[2], SyncOutcome::Applied(_)));
    assert_eq!(
        sync.applier().applied(),
        vec!["America/New_York", "Europe/London"]
    );
    assert_eq!(
        sync.last_applied().map(|zone| zone.as_str()),
        Some("Europe/London")
    );
}

#[tokio::test]
async fn run_ends_cleanly_when_session_closes() {
    let provider = FakeProvider::new();
    provider.set_location(&format!("{BASE}/1"), 35.6762, 139.6503);

    let session = open(&provider, None).await;
    let mut events = session.start().await.expect("start");
    provider.push(FakeNotification::updated(&format!("{BASE}/0"), &format!("{BASE}/1")));

    let mut sync = SyncLoop::new(TzfLookup::new(), RecordingApplier::default());
    let first = events.next().await.expect("event").expect("ok");
    sync.handle(first).await;

    session.close().await.expect("close");
    sync.run(&mut events).await.expect("clean end");
    assert_eq!(sync.applier().applied(), vec!["Asia/Tokyo"]);
}
