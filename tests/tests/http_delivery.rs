//! Delivery over real HTTP against the local collector.

use integration_tests::collector::Collector;
use integration_tests::fixtures::{campaign_page, client_batcher, direct_page};
use std::sync::Arc;
use std::time::Duration;
use tracker_client::{HttpTransport, TrackerConfig};
use tracker_core::{DeliveryErrorCode, EventType, TrackEvent};

const WAIT: Duration = Duration::from_secs(5);

fn config_for(collector: &Collector, use_beacon: bool) -> TrackerConfig {
    TrackerConfig {
        use_beacon,
        ..TrackerConfig::with_api_url(collector.base_url())
    }
}

#[tokio::test]
async fn test_beacon_flush_reaches_collector() {
    let collector = Collector::spawn().await;
    let config = config_for(&collector, true);
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let batcher = client_batcher(config, transport, campaign_page());

    batcher.track(TrackEvent::promo_view(1));
    batcher.track(TrackEvent::promo_copy(1));
    batcher.track(TrackEvent::promo_open(1, Some(7)));
    assert_eq!(batcher.flush(), 3);

    let batches = collector.wait_for_batches(1, WAIT).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(collector.rejected(), 0);

    let events = &batches[0].events;
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].event_type, EventType::PromoOpen);
    assert_eq!(events[2].store_id, Some(7));
    assert!(events
        .iter()
        .all(|e| e.session_id == batcher.session_id().as_str()));
    assert_eq!(events[0].utm_campaign.as_deref(), Some("autumn"));
}

#[tokio::test]
async fn test_threshold_flush_falls_back_to_post() {
    let collector = Collector::spawn().await;
    let config = TrackerConfig {
        batch_size: 2,
        ..config_for(&collector, false)
    };
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let batcher = client_batcher(config, transport, direct_page());

    batcher.track(TrackEvent::deal_open(3, None));
    batcher.track(TrackEvent::finance_open(4, Some(2)));

    let batches = collector.wait_for_batches(1, WAIT).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0].events[0].event_type, EventType::DealOpen);
    assert_eq!(batches[0].events[0].store_id, None);
    assert!(batches[0].events[0].utm_source.is_none());
    assert_eq!(batcher.queue_len(), 0);
}

#[tokio::test]
async fn test_flush_now_waits_for_delivery() {
    let collector = Collector::spawn().await;
    let config = config_for(&collector, true);
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let batcher = client_batcher(config, transport, direct_page());

    batcher.track(TrackEvent::showcase_view(9));
    assert_eq!(batcher.flush_now().await.unwrap(), 1);

    // Awaited flush goes through post, so the collector already has it.
    let batches = collector.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].events[0].showcase_id, Some(9));
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_network_error() {
    let config = TrackerConfig {
        request_timeout_ms: 500,
        ..TrackerConfig::with_api_url("http://127.0.0.1:9")
    };
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    let batcher = client_batcher(config, transport, direct_page());

    batcher.track(TrackEvent::promo_view(1));
    let err = batcher.flush_now().await.unwrap_err();

    assert_eq!(err.error_code(), Some(DeliveryErrorCode::Network.code()));
    assert_eq!(batcher.queue_len(), 0);
}
