//! History ledger view.
//!
//! One full-set fetch per discrete filter change, then purely client-side
//! pagination over the returned set. Deletion removes the record from the
//! in-memory set on gateway confirmation and reclamps the current page so
//! the view never points past the end of the set.

use tracing::{debug, info, warn};

use crate::error::ClientResult;
use crate::gateway::Gateway;
use crate::model::{HistoryFilter, HistoryRecord};

/// Derived counts over the loaded ledger set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerSummary {
    /// Records in the loaded set.
    pub total: usize,
    /// Records with a churn outcome.
    pub churned: usize,
    /// Records with a safe outcome.
    pub retained: usize,
    /// Churn rate as a percentage; `0.0` for an empty set.
    pub churn_rate_pct: f64,
}

/// The history ledger: full-set records, discrete filters, client paging.
#[derive(Debug)]
pub struct HistoryLedger {
    records: Vec<HistoryRecord>,
    filter: HistoryFilter,
    page: usize,
    page_size: usize,
    loaded: bool,
    last_error: Option<String>,
}

impl HistoryLedger {
    /// Creates an empty ledger paging `page_size` rows at a time.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            filter: HistoryFilter::default(),
            page: 1,
            page_size: page_size.max(1),
            loaded: false,
            last_error: None,
        }
    }

    // ── Accessors ──

    /// The full loaded set, in server order.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// The filter the loaded set was fetched under.
    #[must_use]
    pub fn filter(&self) -> HistoryFilter {
        self.filter
    }

    /// Current 1-based page.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages the loaded set spans; at least 1.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(self.page_size).max(1)
    }

    /// `true` once at least one fetch has been applied.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Message from the last failed operation, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The rows of the current page.
    #[must_use]
    pub fn page_rows(&self) -> &[HistoryRecord] {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.records.len());
        if start >= self.records.len() {
            &[]
        } else {
            &self.records[start..end]
        }
    }

    /// Summary tallies over the full loaded set, not just the visible page.
    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        let total = self.records.len();
        let churned = self.records.iter().filter(|r| r.is_churn).count();
        let churn_rate_pct = if total == 0 {
            0.0
        } else {
            churned as f64 / total as f64 * 100.0
        };
        LedgerSummary {
            total,
            churned,
            retained: total - churned,
            churn_rate_pct,
        }
    }

    // ── Paging ──

    /// Moves to `page`, clamped into `1..=total_pages()`.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    /// Moves to the next page if one exists.
    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    /// Moves to the previous page if one exists.
    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    // ── Fetching and deletion ──

    /// Applies `filter` and fetches the full matching set.
    ///
    /// Filters are discrete selects, so the fetch fires immediately. On
    /// success the set is replaced and paging restarts at page 1; on
    /// failure the previous set stays visible.
    ///
    /// # Errors
    ///
    /// The gateway error, also recorded on the ledger.
    pub async fn apply_filter<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
        filter: HistoryFilter,
    ) -> ClientResult<()> {
        self.filter = filter;
        debug!(filtered = !filter.is_empty(), "fetching history set");
        match gateway.history(&filter).await {
            Ok(records) => {
                info!(records = records.len(), "history set loaded");
                self.records = records;
                self.page = 1;
                self.loaded = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "history fetch failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Refetches the full set under the current filter.
    ///
    /// # Errors
    ///
    /// The gateway error, also recorded on the ledger.
    pub async fn refresh<G: Gateway + ?Sized>(&mut self, gateway: &G) -> ClientResult<()> {
        self.apply_filter(gateway, self.filter).await
    }

    /// Deletes one record, removing it from the loaded set on gateway
    /// confirmation and reclamping the current page.
    ///
    /// # Errors
    ///
    /// The gateway error; the set is untouched when the delete fails.
    pub async fn delete<G: Gateway + ?Sized>(&mut self, gateway: &G, id: u64) -> ClientResult<()> {
        match gateway.delete_history(id).await {
            Ok(()) => {
                self.records.retain(|r| r.id != id);
                // Deleting the last row of the last page must not leave
                // the view pointing past the end.
                self.page = self.page.clamp(1, self.total_pages());
                self.last_error = None;
                info!(id, remaining = self.records.len(), "history record deleted");
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "history delete failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::model::RiskLevel;
    use crate::testing::{mock_history, MockGateway};

    async fn loaded_ledger(gateway: &MockGateway, count: usize, page_size: usize) -> HistoryLedger {
        gateway.queue_history(Ok(mock_history(count)));
        let mut ledger = HistoryLedger::new(page_size);
        ledger
            .apply_filter(gateway, HistoryFilter::default())
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_fetch_loads_full_set_and_pages_client_side() {
        let gateway = MockGateway::new();
        let ledger = loaded_ledger(&gateway, 40, 15).await;

        assert_eq!(ledger.records().len(), 40);
        assert_eq!(ledger.total_pages(), 3);
        assert_eq!(ledger.page(), 1);
        assert_eq!(ledger.page_rows().len(), 15);
        // One network call regardless of page navigation.
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_page_navigation_clamps() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 40, 15).await;

        ledger.set_page(3);
        assert_eq!(ledger.page_rows().len(), 10);

        ledger.next_page();
        assert_eq!(ledger.page(), 3);

        ledger.set_page(99);
        assert_eq!(ledger.page(), 3);

        ledger.set_page(0);
        assert_eq!(ledger.page(), 1);
        ledger.prev_page();
        assert_eq!(ledger.page(), 1);
    }

    #[tokio::test]
    async fn test_filter_change_refetches_and_resets_page() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 40, 15).await;
        ledger.set_page(3);

        gateway.queue_history(Ok(mock_history(5)));
        let filter = HistoryFilter {
            risk_level: Some(RiskLevel::High),
            is_churn: Some(true),
        };
        ledger.apply_filter(&gateway, filter).await.unwrap();

        assert_eq!(ledger.page(), 1);
        assert_eq!(ledger.records().len(), 5);
        assert_eq!(ledger.filter(), filter);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_set() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 20, 15).await;

        gateway.queue_history(Err(ClientError::ConnectionFailed("down".into())));
        let err = ledger.refresh(&gateway).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(ledger.records().len(), 20);
        assert!(ledger.last_error().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_delete_removes_record_on_confirmation() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 20, 15).await;

        gateway.queue_delete(Ok(()));
        ledger.delete(&gateway, 7).await.unwrap();
        assert_eq!(ledger.records().len(), 19);
        assert!(ledger.records().iter().all(|r| r.id != 7));
    }

    #[tokio::test]
    async fn test_delete_clamps_emptied_last_page() {
        let gateway = MockGateway::new();
        // 16 records, page size 15: page 2 holds exactly one row.
        let mut ledger = loaded_ledger(&gateway, 16, 15).await;
        ledger.set_page(2);
        let lone = ledger.page_rows()[0].id;

        gateway.queue_delete(Ok(()));
        ledger.delete(&gateway, lone).await.unwrap();

        assert_eq!(ledger.total_pages(), 1);
        assert_eq!(ledger.page(), 1);
        assert_eq!(ledger.page_rows().len(), 15);
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_set_untouched() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 10, 15).await;

        gateway.queue_delete(Err(ClientError::NotFound {
            resource: "history record 3".into(),
        }));
        let err = ledger.delete(&gateway, 3).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert_eq!(ledger.records().len(), 10);
    }

    #[tokio::test]
    async fn test_delete_last_remaining_record() {
        let gateway = MockGateway::new();
        let mut ledger = loaded_ledger(&gateway, 1, 15).await;

        gateway.queue_delete(Ok(()));
        ledger.delete(&gateway, 1).await.unwrap();
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.page(), 1);
        assert_eq!(ledger.total_pages(), 1);
        assert!(ledger.page_rows().is_empty());
    }

    #[tokio::test]
    async fn test_summary_counts_full_set() {
        let gateway = MockGateway::new();
        // mock_history churns even ids: 5 of 10.
        let ledger = loaded_ledger(&gateway, 10, 3).await;
        let summary = ledger.summary();
        assert_eq!(summary.total, 10);
        assert_eq!(summary.churned, 5);
        assert_eq!(summary.retained, 5);
        assert_eq!(summary.churn_rate_pct, 50.0);
    }

    #[test]
    fn test_empty_ledger_summary_is_zero_rate() {
        let ledger = HistoryLedger::new(15);
        assert!(!ledger.is_loaded());
        let summary = ledger.summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.churn_rate_pct, 0.0);
        assert!(ledger.page_rows().is_empty());
    }
}
