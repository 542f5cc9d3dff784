//! Batching behaviour end to end against a capturing transport.

use integration_tests::fixtures::{
    campaign_page, client_batcher, client_batcher_with_store, config_with_batch_size,
    direct_page, every_event_type,
};
use integration_tests::mocks::{Channel, MockTransport};
use std::sync::Arc;
use tracker_client::{EventBatcher, ExecutionContext, LifecycleEvent, TrackerConfig, Visibility};
use tracker_core::{EventType, FileStore, MemoryStore, TrackEvent};

/// Nine copies queue up, the tenth flushes all ten in one batch.
#[tokio::test]
async fn test_tenth_promo_copy_triggers_flush() {
    let transport = MockTransport::new();
    let batcher = client_batcher(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        direct_page(),
    );

    for _ in 0..9 {
        batcher.track(TrackEvent::promo_copy(42));
    }
    assert_eq!(transport.batch_count(), 0, "nothing should be sent before the threshold");

    batcher.track(TrackEvent::promo_copy(42));

    let batches = transport.captured_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 10);
    assert!(batches[0].events.iter().all(|e| {
        e.event_type == EventType::PromoCopy
            && e.promo_id == Some(42)
            && e.session_id == batcher.session_id().as_str()
    }));
    assert_eq!(batcher.queue_len(), 0);
}

/// Hiding the page flushes whatever is queued.
#[tokio::test]
async fn test_page_hide_flushes_two_events() {
    let transport = MockTransport::new();
    let batcher = client_batcher(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        direct_page(),
    );

    batcher.track(TrackEvent::promo_view(1));
    batcher.track(TrackEvent::promo_view(2));

    let flushed = batcher.handle_lifecycle(LifecycleEvent::VisibilityChanged(Visibility::Hidden));

    assert_eq!(flushed, 2);
    assert_eq!(transport.event_count(), 2);
    assert_eq!(transport.channels(), vec![Channel::Beacon]);
    assert_eq!(batcher.queue_len(), 0);
}

/// A manual flush delivers every event type in insertion order, each with
/// the campaign attribution of the page.
#[tokio::test]
async fn test_flush_preserves_order_and_attribution() {
    let transport = MockTransport::new();
    let batcher = client_batcher(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        campaign_page(),
    );

    let events = every_event_type();
    for event in events.clone() {
        batcher.track(event);
    }
    assert_eq!(batcher.flush(), events.len());

    let batches = transport.captured_batches();
    assert_eq!(batches.len(), 1);

    let delivered: Vec<_> = batches[0].events.iter().map(|e| e.event_type).collect();
    let expected: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(delivered, expected);

    for event in &batches[0].events {
        assert_eq!(event.utm_source.as_deref(), Some("yandex"));
        assert_eq!(event.utm_medium.as_deref(), Some("cpc"));
        assert_eq!(event.utm_campaign.as_deref(), Some("autumn"));
        assert_eq!(event.referrer.as_deref(), Some("https://yandex.ru/search/"));
    }
}

/// Events tracked after a flush start a fresh batch.
#[tokio::test]
async fn test_events_after_flush_start_new_batch() {
    let transport = MockTransport::new();
    let batcher = client_batcher(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        direct_page(),
    );

    batcher.track(TrackEvent::showcase_view(1));
    batcher.flush();
    batcher.track(TrackEvent::showcase_open(1));
    batcher.flush();

    let batches = transport.captured_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].events[0].event_type, EventType::ShowcaseView);
    assert_eq!(batches[1].len(), 1);
    assert_eq!(batches[1].events[0].event_type, EventType::ShowcaseOpen);
}

/// A failed delivery drops the batch: nothing is re-queued or retried.
#[tokio::test]
async fn test_failed_delivery_is_not_requeued() {
    let transport = MockTransport::without_beacon();
    transport.set_should_fail(true);
    let batcher = client_batcher(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        direct_page(),
    );

    batcher.track(TrackEvent::promo_open(5, Some(1)));
    batcher.track(TrackEvent::promo_open(6, Some(1)));
    assert!(batcher.flush_now().await.is_err());
    assert_eq!(batcher.queue_len(), 0);

    transport.set_should_fail(false);
    batcher.track(TrackEvent::promo_open(7, Some(1)));
    assert_eq!(batcher.flush_now().await.unwrap(), 1);

    let batches = transport.captured_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].events[0].promo_id, Some(7));
    assert_eq!(transport.channels(), vec![Channel::Post]);
}

/// Concurrent trackers never lose or duplicate events.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tracking_delivers_each_event_once() {
    let transport = MockTransport::new();
    let batcher = client_batcher(
        config_with_batch_size(10),
        Arc::new(transport.clone()),
        direct_page(),
    );

    let mut handles = Vec::new();
    for worker in 0..10u64 {
        let batcher = batcher.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..10u64 {
                batcher.track(TrackEvent::promo_view(worker * 100 + i));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    batcher.flush();

    let batches = transport.captured_batches();
    assert!(batches.iter().all(|b| b.len() == 10));

    let mut ids: Vec<_> = batches
        .iter()
        .flat_map(|b| b.events.iter().map(|e| e.promo_id.unwrap()))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 100);
    assert_eq!(batcher.queue_len(), 0);
}

/// The session id survives restarts on the same profile and differs on a
/// fresh one.
#[tokio::test]
async fn test_session_id_persists_per_profile() {
    let dir = tempfile::tempdir().unwrap();
    let profile = dir.path().join("storage.json");
    let transport = Arc::new(MockTransport::new());

    let first = client_batcher_with_store(
        TrackerConfig::default(),
        transport.clone(),
        Arc::new(FileStore::new(&profile)),
        direct_page(),
    );
    let session = first.session_id().clone();
    drop(first);

    let second = client_batcher_with_store(
        TrackerConfig::default(),
        transport.clone(),
        Arc::new(FileStore::new(&profile)),
        direct_page(),
    );
    assert_eq!(second.session_id(), &session);

    let other = client_batcher_with_store(
        TrackerConfig::default(),
        transport,
        Arc::new(MemoryStore::new()),
        direct_page(),
    );
    assert_ne!(other.session_id(), &session);
}

/// Server renders get a throwaway id and never deliver.
#[tokio::test]
async fn test_server_render_never_delivers() {
    let transport = MockTransport::new();
    let batcher = Arc::new(EventBatcher::new(
        TrackerConfig::default(),
        Arc::new(transport.clone()),
        ExecutionContext::Server,
    ));

    assert!(batcher.start_flush_task().is_none());
    assert!(batcher.session_id().as_str().starts_with("ssr_"));

    // Ten trip the threshold, two stay queued for the final flush.
    for id in 0..12 {
        batcher.track(TrackEvent::promo_view(id));
    }
    assert_eq!(batcher.queue_len(), 2);
    assert_eq!(batcher.flush_now().await.unwrap(), 2);

    assert_eq!(transport.batch_count(), 0);
    assert_eq!(batcher.queue_len(), 0);
}
