//! Batch prediction example: edit a few rows, run one batch call against
//! a live gateway and print the outcomes plus the CSV export.
//!
//! ```bash
//! CHURNGUARD_URL=http://localhost:8000/api cargo run --example batch_run
//! ```

use churnguard_client::{BatchRunner, ClientConfig, HttpGateway};
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
    let config = ClientConfig::new(base_url);
    let gateway = HttpGateway::new(&config)?;

    let mut runner = BatchRunner::new();
    runner.add_row();
    println!("Submitting {} rows", runner.rows().len());

    // Make one row look clearly at risk.
    if let Some(row) = runner.row_mut(0) {
        row.satisfaction_score = "1".into();
        row.customer_support_calls = "8".into();
        row.monthly_logins = "2".into();
    }

    match runner.run(&gateway).await {
        Ok(results) => {
            for outcome in results {
                println!(
                    "  {}: churn={} ({}%) risk={}",
                    outcome.customer_id,
                    outcome.is_churn,
                    outcome.churn_probability_pct,
                    outcome.risk_level
                );
            }
            let summary = runner.summary();
            println!(
                "\n{} churned of {} ({:.1}%)",
                summary.churned, summary.total, summary.churn_rate_pct
            );
            println!("\nCSV export:\n{}", runner.export_csv());
        }
        Err(e) => {
            eprintln!("batch run failed: {e}");
            eprintln!("rows are preserved for editing; fix and rerun");
        }
    }

    Ok(())
}
