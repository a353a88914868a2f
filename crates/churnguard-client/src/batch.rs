//! Batch prediction orchestrator.
//!
//! [`BatchRunner`] owns an ordered list of editable rows, turns them into
//! one gateway batch call, and holds the resulting outcome list plus its
//! derived summary. The editable rows survive any failure untouched;
//! results are replaced atomically on success and cleared on failure so a
//! stale result set is never shown next to an error banner.

use tracing::{debug, error, info};

use crate::error::{ClientError, ClientResult, ValidationErrors};
use crate::gateway::Gateway;
use crate::model::{BatchOutcome, PredictPayload};
use crate::validate::{default_customer_id, normalize_row, RowDraft};

/// Default filename offered for the exported results artifact.
pub const EXPORT_FILENAME: &str = "churn_predictions.csv";

/// Header line of the exported CSV.
pub const EXPORT_HEADER: &str = "Customer ID,Is Churn,Probability %,Risk Level";

/// Derived counts over one batch's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    /// Rows scored in the batch.
    pub total: usize,
    /// Rows predicted to churn.
    pub churned: usize,
    /// Rows predicted to stay.
    pub retained: usize,
    /// Churn rate as a percentage; `0.0` for an empty batch.
    pub churn_rate_pct: f64,
}

impl BatchSummary {
    /// Derives the summary from a list of outcomes.
    #[must_use]
    pub fn derive(outcomes: &[BatchOutcome]) -> Self {
        let total = outcomes.len();
        let churned = outcomes.iter().filter(|o| o.is_churn).count();
        let churn_rate_pct = if total == 0 {
            0.0
        } else {
            churned as f64 / total as f64 * 100.0
        };
        Self {
            total,
            churned,
            retained: total - churned,
            churn_rate_pct,
        }
    }
}

/// The batch prediction flow: editable rows in, outcome list out.
#[derive(Debug)]
pub struct BatchRunner {
    rows: Vec<RowDraft>,
    results: Vec<BatchOutcome>,
    last_error: Option<String>,
}

impl BatchRunner {
    /// Creates a runner with three default rows (`CUST-001..003`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: (0..3).map(RowDraft::batch_default).collect(),
            results: Vec::new(),
            last_error: None,
        }
    }

    // ── Row editing ──

    /// The editable rows, in table order.
    #[must_use]
    pub fn rows(&self) -> &[RowDraft] {
        &self.rows
    }

    /// Mutable access to one row for field edits.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut RowDraft> {
        self.rows.get_mut(index)
    }

    /// Appends a default row. Its customer id reflects the row's position
    /// at append time; earlier rows keep whatever ids they carry.
    pub fn add_row(&mut self) -> &RowDraft {
        let row = RowDraft::batch_default(self.rows.len());
        self.rows.push(row);
        debug!(rows = self.rows.len(), "appended batch row");
        &self.rows[self.rows.len() - 1]
    }

    /// Removes the row at `index`. Surviving rows are not re-indexed.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidState`] when only one row remains (the table
    /// must never be empty), or when `index` is out of bounds.
    pub fn remove_row(&mut self, index: usize) -> ClientResult<()> {
        if self.rows.len() == 1 {
            return Err(ClientError::InvalidState {
                expected: "at least two rows".into(),
                actual: "a single row".into(),
            });
        }
        if index >= self.rows.len() {
            return Err(ClientError::InvalidState {
                expected: format!("row index below {}", self.rows.len()),
                actual: index.to_string(),
            });
        }
        self.rows.remove(index);
        Ok(())
    }

    // ── Running ──

    /// Normalizes every row and issues one batch-predict call.
    ///
    /// On success the result set is replaced atomically. On any failure
    /// the rows stay editable as they were, the results are cleared, and
    /// a single user-facing message is recorded.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] with row-scoped fields when any row
    /// fails normalization (no network call is made), otherwise the
    /// gateway error.
    pub async fn run<G: Gateway + ?Sized>(&mut self, gateway: &G) -> ClientResult<&[BatchOutcome]> {
        let payloads = match self.normalize_rows() {
            Ok(payloads) => payloads,
            Err(e) => {
                self.results.clear();
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        debug!(rows = payloads.len(), "running batch prediction");
        match gateway.predict_batch(&payloads).await {
            Ok(outcomes) => {
                info!(rows = outcomes.len(), "batch prediction complete");
                self.results = outcomes;
                self.last_error = None;
                Ok(&self.results)
            }
            Err(e) => {
                error!(error = %e, "batch prediction failed");
                self.results.clear();
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn normalize_rows(&self) -> ClientResult<Vec<PredictPayload>> {
        let mut errors = ValidationErrors::new();
        let mut payloads = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            match normalize_row(row, Some(default_customer_id(i))) {
                Ok(payload) => payloads.push(payload),
                Err(ClientError::Validation(row_errors)) => {
                    errors.extend_prefixed(&format!("row {}", i + 1), row_errors);
                }
                Err(other) => return Err(other),
            }
        }
        errors.into_result()?;
        Ok(payloads)
    }

    // ── Results ──

    /// Outcomes of the last successful run, in submission order.
    #[must_use]
    pub fn results(&self) -> &[BatchOutcome] {
        &self.results
    }

    /// Message from the last failed run, if the most recent run failed.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Summary of the current result set.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::derive(&self.results)
    }

    /// Serializes the current result set as CSV. Pure projection; no
    /// network access.
    #[must_use]
    pub fn export_csv(&self) -> String {
        export_csv(&self.results)
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes outcomes into the four-column export format: the fixed
/// header, then one line per row, joined with `\n` and no trailing
/// newline.
#[must_use]
pub fn export_csv(outcomes: &[BatchOutcome]) -> String {
    let mut lines = Vec::with_capacity(outcomes.len() + 1);
    lines.push(EXPORT_HEADER.to_string());
    for o in outcomes {
        lines.push(format!(
            "{},{},{},{}",
            csv_field(&o.customer_id),
            o.is_churn,
            o.churn_probability_pct,
            o.risk_level
        ));
    }
    lines.join("\n")
}

/// Quotes a field when it contains a delimiter, quote or newline;
/// embedded quotes are doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
