//! Maintenance probe against the local collector.

use axum::http::StatusCode;
use integration_tests::collector::Collector;
use telemetry::{health, HealthStatus};
use tracker_client::{MaintenanceProbe, RouteDecision, SiteStatus, TrackerConfig};

fn probe_for(collector: &Collector) -> MaintenanceProbe {
    MaintenanceProbe::new(&TrackerConfig::with_api_url(collector.base_url())).unwrap()
}

// The health registry is process-wide, so status transitions are checked in
// a single test.
#[tokio::test]
async fn test_status_transitions_update_health() {
    let collector = Collector::spawn().await;
    let probe = probe_for(&collector);

    assert_eq!(probe.check().await, SiteStatus::Available);
    assert_eq!(health().ingest_api.status(), HealthStatus::Healthy);
    assert_eq!(probe.route("/stores/ozon").await, RouteDecision::Pass);

    collector.set_health_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(probe.check().await, SiteStatus::Maintenance);
    assert_eq!(health().ingest_api.status(), HealthStatus::Maintenance);
    assert_eq!(
        probe.route("/stores/ozon").await,
        RouteDecision::Redirect("/maintenance".to_string())
    );

    // Only 503 means maintenance.
    collector.set_health_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(probe.route("/hot").await, RouteDecision::Pass);
    assert_eq!(health().ingest_api.status(), HealthStatus::Healthy);

    collector.set_health_status(StatusCode::OK);
    assert_eq!(probe.route("/").await, RouteDecision::Pass);
}

#[tokio::test]
async fn test_bypassed_paths_pass_during_maintenance() {
    let collector = Collector::spawn().await;
    collector.set_health_status(StatusCode::SERVICE_UNAVAILABLE);
    let probe = probe_for(&collector);

    for path in ["/maintenance", "/_next/static/app.js", "/static/logo", "/favicon.ico"] {
        assert_eq!(probe.route(path).await, RouteDecision::Pass, "{path}");
    }
}
