//! # `ChurnGuard` Client
//!
//! Client-side data synchronization and request orchestration for the
//! `ChurnGuard` churn-prediction dashboard. The crate produces view
//! state; a renderer consumes it.
//!
//! ## Views
//!
//! - [`population`] / [`tracker`] - Paginated, filtered, auto-refreshing
//!   customer list with stale-response discard and gated polling
//! - [`batch`] - Multi-row batch prediction with summary and CSV export
//! - [`predict`] - Single-prediction form with a local risk hint
//! - [`history`] - Full-set prediction ledger with client-side paging
//! - [`detail`] - Per-customer detail and probability timeline
//! - [`dashboard`] - Aggregate statistics with a polled refresh
//!
//! ## Ordering discipline
//!
//! ```text
//! trigger (edit / load-more / poll tick)
//!   -> plan   (capture epoch + filter + page under the lock)
//!   -> fetch  (gateway round-trip, lock released)
//!   -> apply  (discard if the epoch went stale, else replace/append)
//! ```
//!
//! Last-writer-by-filter-identity wins, never last-network-completion.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Common test patterns that are acceptable
#![cfg_attr(
    test,
    allow(
        clippy::field_reassign_with_default,
        clippy::float_cmp,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::too_many_lines
    )
)]

/// Client error types.
pub mod error;

/// Client configuration.
pub mod config;

/// Domain and wire types.
pub mod model;

/// Gateway trait and HTTP implementation.
pub mod gateway;

/// Input validation and payload normalization.
pub mod validate;

/// Batch prediction orchestrator.
pub mod batch;

/// Single-prediction form flow.
pub mod predict;

/// Population synchronizer state machine.
pub mod population;

/// Population tracker (timer lifecycle owner).
pub mod tracker;

/// Periodic task handle.
pub mod poller;

/// History ledger view.
pub mod history;

/// Customer detail inspector.
pub mod detail;

/// Dashboard statistics view.
pub mod dashboard;

/// Synchronization metrics.
pub mod metrics;

/// Testing utilities (mock gateway, fixtures).
pub mod testing;

pub use batch::{BatchRunner, BatchSummary};
pub use config::ClientConfig;
pub use dashboard::{DashboardView, StatsPoller};
pub use detail::{CustomerInspector, InspectorState};
pub use error::{ClientError, ClientResult, ValidationErrors};
pub use gateway::{Gateway, HttpGateway};
pub use history::HistoryLedger;
pub use model::{
    BatchOutcome, CustomerDetail, CustomerPage, CustomerRecord, DashboardStats, HistoryFilter,
    HistoryRecord, PageTally, PopulationFilter, PredictPayload, PredictionResult, RiskLevel,
    StatusTab,
};
pub use population::{Applied, PopulationPhase, PopulationSnapshot, PopulationView};
pub use predict::PredictForm;
pub use tracker::PopulationTracker;
pub use validate::{normalize_row, RowDraft};
