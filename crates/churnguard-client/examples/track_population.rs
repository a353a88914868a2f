//! Population tracking example: start the tracker, load the first page,
//! narrow the view with a debounced search, load a second page and let
//! the background poll refresh, then shut down cleanly.
//!
//! ```bash
//! CHURNGUARD_URL=http://localhost:8000/api cargo run --example track_population
//! ```

use std::sync::Arc;
use std::time::Duration;

use churnguard_client::{ClientConfig, HttpGateway, PopulationTracker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churnguard_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = std::env::var("CHURNGUARD_URL")
        .unwrap_or_else(|_| "http://localhost:8000/api".to_string());
    let config = ClientConfig::new(base_url).with_poll_interval(Duration::from_secs(5));
    let gateway = Arc::new(HttpGateway::new(&config)?);

    let tracker = PopulationTracker::start(gateway, &config);
    tracker.refresh().await;

    let snap = tracker.snapshot();
    println!(
        "page 1: {} of {} customers ({} churn / {} safe)",
        snap.records.len(),
        snap.tally.total_records,
        snap.tally.churn_count,
        snap.tally.safe_count
    );

    if snap.can_load_more {
        tracker.load_more().await;
        let snap = tracker.snapshot();
        println!("after load more: {} customers on page {}", snap.records.len(), snap.page);
    }

    // Type a search; the fetch fires after the debounce window.
    tracker.set_search("CUST-0");
    tokio::time::sleep(config.debounce + Duration::from_millis(200)).await;
    let snap = tracker.snapshot();
    println!("search '{}': {} matches", snap.filter.search, snap.tally.total_records);

    // Back to the neutral view; the next poll tick will keep it fresh.
    tracker.set_search("");
    tokio::time::sleep(Duration::from_secs(6)).await;
    let metrics = tracker.metrics();
    println!(
        "fetches planned: {}, pages applied: {}, stale discarded: {}, polls suppressed: {}",
        metrics.fetches_planned,
        metrics.pages_applied,
        metrics.stale_discarded,
        metrics.polls_suppressed
    );

    tracker.join().await;
    println!("tracker shut down");
    Ok(())
}
