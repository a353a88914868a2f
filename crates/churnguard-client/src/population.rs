//! Population synchronizer state machine.
//!
//! The paginated, filtered, auto-refreshing customer list. All ordering
//! guarantees come from an explicit plan/apply discipline:
//!
//! - a trigger (filter change, load more, poll tick) *plans* a fetch,
//!   capturing the filter epoch, target page and trigger kind;
//! - the caller performs the gateway round-trip for the plan;
//! - the response is *applied* under the same plan, and is discarded when
//!   the plan's epoch no longer matches the view (a newer filter landed
//!   while the fetch was in flight).
//!
//! Last-writer-by-filter-identity wins, never last-network-completion.
//! The async methods ([`PopulationView::change_filter`] and friends) drive
//! plan, fetch and apply sequentially; concurrent triggers from the
//! tracker's timer tasks interleave through the same plan/apply pairs.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::metrics::SyncMetrics;
use crate::model::{CustomerPage, CustomerRecord, PageTally, PopulationFilter};

/// View lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulationPhase {
    /// Nothing fetched yet.
    #[default]
    Idle,
    /// A filter change or refresh is replacing the list.
    LoadingInitial,
    /// A further page is being appended.
    LoadingMore,
    /// The list reflects the most recently applied fetch.
    Ready,
    /// The last applied fetch failed; previous records remain visible.
    Error,
}

impl std::fmt::Display for PopulationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PopulationPhase::Idle => "idle",
            PopulationPhase::LoadingInitial => "loading-initial",
            PopulationPhase::LoadingMore => "loading-more",
            PopulationPhase::Ready => "ready",
            PopulationPhase::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Trigger that planned a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Filter change or explicit refresh; replaces the list from page 1.
    Initial,
    /// Load-more; appends the next page.
    More,
    /// Background poll; replaces page 1 without a loading phase.
    Poll,
}

/// A planned population fetch carrying the identity it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    epoch: u64,
    /// Filter the fetch is scoped to.
    pub filter: PopulationFilter,
    /// 1-based page to request.
    pub page: u32,
    /// Trigger that planned the fetch.
    pub kind: FetchKind,
}

impl FetchPlan {
    /// Filter epoch the plan was issued under.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Outcome of applying a fetch response to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The list was replaced from page 1.
    Replaced,
    /// A further page was appended.
    Appended,
    /// The fetch failed; the view entered [`PopulationPhase::Error`].
    Failed,
    /// The response was stale and discarded without touching the view.
    Stale,
}

/// Renderable snapshot of the population view.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSnapshot {
    /// Accumulated records in page order.
    pub records: Vec<CustomerRecord>,
    /// Highest applied page.
    pub page: u32,
    /// Server counters for the most recently applied page.
    pub tally: PageTally,
    /// Current phase.
    pub phase: PopulationPhase,
    /// Filter the records belong to.
    pub filter: PopulationFilter,
    /// Banner message from the last failed fetch, if any.
    pub last_error: Option<String>,
    /// Whether the load-more control should be offered.
    pub can_load_more: bool,
}

/// The population view state machine.
#[derive(Debug)]
pub struct PopulationView {
    filter: PopulationFilter,
    records: Vec<CustomerRecord>,
    page: u32,
    tally: PageTally,
    phase: PopulationPhase,
    epoch: u64,
    more_inflight: bool,
    last_error: Option<String>,
    metrics: Arc<SyncMetrics>,
}

impl PopulationView {
    /// Creates an empty view with its own metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(SyncMetrics::new()))
    }

    /// Creates an empty view recording into shared `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: Arc<SyncMetrics>) -> Self {
        Self {
            filter: PopulationFilter::neutral(),
            records: Vec::new(),
            page: 1,
            tally: PageTally::default(),
            phase: PopulationPhase::Idle,
            epoch: 0,
            more_inflight: false,
            last_error: None,
            metrics,
        }
    }

    // ── Accessors ──

    /// Accumulated records in page order.
    #[must_use]
    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    /// Highest applied page (1-based).
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Server counters for the most recently applied page.
    #[must_use]
    pub fn tally(&self) -> PageTally {
        self.tally
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PopulationPhase {
        self.phase
    }

    /// Filter the view is scoped to.
    #[must_use]
    pub fn filter(&self) -> &PopulationFilter {
        &self.filter
    }

    /// Banner message from the last failed fetch.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Metrics shared with the tracker.
    #[must_use]
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Whether load-more should be offered: another page exists, no search
    /// narrows the list, and no load is already in flight.
    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.tally.has_more
            && self.filter.search.is_empty()
            && !self.more_inflight
            && !matches!(
                self.phase,
                PopulationPhase::LoadingInitial | PopulationPhase::LoadingMore
            )
    }

    /// Renderable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            records: self.records.clone(),
            page: self.page,
            tally: self.tally,
            phase: self.phase,
            filter: self.filter.clone(),
            last_error: self.last_error.clone(),
            can_load_more: self.can_load_more(),
        }
    }

    // ── Planning ──

    /// Plans the page-1 fetch for a new filter.
    ///
    /// Bumps the filter epoch, which invalidates every fetch still in
    /// flight (their responses will apply as [`Applied::Stale`]), resets
    /// pagination and enters [`PopulationPhase::LoadingInitial`].
    pub fn begin_filter_change(&mut self, filter: PopulationFilter) -> FetchPlan {
        self.epoch += 1;
        self.filter = filter.clone();
        self.more_inflight = false;
        self.phase = PopulationPhase::LoadingInitial;
        self.metrics.record_fetch_planned();
        debug!(
            epoch = self.epoch,
            search = %filter.search,
            status = %filter.status,
            "planned initial population fetch"
        );
        FetchPlan {
            epoch: self.epoch,
            filter,
            page: 1,
            kind: FetchKind::Initial,
        }
    }

    /// Plans a refresh of the current filter from page 1.
    pub fn begin_refresh(&mut self) -> FetchPlan {
        self.begin_filter_change(self.filter.clone())
    }

    /// Plans fetching the next page, or `None` when load-more is not
    /// currently offered (no further page, active search, or a load
    /// already in flight).
    pub fn begin_load_more(&mut self) -> Option<FetchPlan> {
        if !self.can_load_more() {
            return None;
        }
        self.more_inflight = true;
        self.phase = PopulationPhase::LoadingMore;
        self.metrics.record_fetch_planned();
        let page = self.page + 1;
        debug!(epoch = self.epoch, page, "planned load-more fetch");
        Some(FetchPlan {
            epoch: self.epoch,
            filter: self.filter.clone(),
            page,
            kind: FetchKind::More,
        })
    }

    /// Plans a background poll refresh, or `None` when polling is gated
    /// off: polls only refresh the unfiltered first page and never
    /// preempt a user-initiated load.
    pub fn begin_poll(&mut self) -> Option<FetchPlan> {
        let loading = matches!(
            self.phase,
            PopulationPhase::LoadingInitial | PopulationPhase::LoadingMore
        );
        if self.page != 1 || !self.filter.is_neutral() || loading {
            self.metrics.record_poll_suppressed();
            return None;
        }
        self.metrics.record_fetch_planned();
        debug!(epoch = self.epoch, "planned poll refresh");
        Some(FetchPlan {
            epoch: self.epoch,
            filter: self.filter.clone(),
            page: 1,
            kind: FetchKind::Poll,
        })
    }

    // ── Applying ──

    /// Applies a fetch outcome under its plan.
    ///
    /// A plan whose epoch no longer matches is discarded whole, success or
    /// failure alike: the filter it served no longer exists. Failures for
    /// a current plan enter [`PopulationPhase::Error`] but keep the
    /// previously displayed records.
    pub fn apply(
        &mut self,
        plan: &FetchPlan,
        outcome: Result<CustomerPage, ClientError>,
    ) -> Applied {
        if plan.epoch != self.epoch {
            self.metrics.record_stale_discarded();
            warn!(
                plan_epoch = plan.epoch,
                current_epoch = self.epoch,
                page = plan.page,
                "discarded stale population response"
            );
            return Applied::Stale;
        }
        match outcome {
            Ok(page) => self.apply_page(plan, page),
            Err(e) => {
                if plan.kind == FetchKind::More {
                    self.more_inflight = false;
                }
                self.phase = PopulationPhase::Error;
                self.last_error = Some(e.to_string());
                self.metrics.record_fetch_failed();
                warn!(kind = ?plan.kind, page = plan.page, error = %e, "population fetch failed");
                Applied::Failed
            }
        }
    }

    fn apply_page(&mut self, plan: &FetchPlan, page: CustomerPage) -> Applied {
        let applied = match plan.kind {
            FetchKind::Initial | FetchKind::Poll => {
                self.records = page.results;
                self.page = 1;
                Applied::Replaced
            }
            FetchKind::More => {
                self.records.extend(page.results);
                self.page = plan.page;
                self.more_inflight = false;
                Applied::Appended
            }
        };
        self.tally = page.pagination;
        self.phase = PopulationPhase::Ready;
        self.last_error = None;
        self.metrics.record_page_applied();
        debug!(
            kind = ?plan.kind,
            page = self.page,
            records = self.records.len(),
            total = self.tally.total_records,
            "applied population page"
        );
        applied
    }

    // ── Async drivers ──

    /// Applies a new filter end to end: plan, fetch, apply.
    ///
    /// Refetches even when `filter` equals the current one, which is how
    /// an explicit refresh behaves.
    pub async fn change_filter<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
        filter: PopulationFilter,
    ) -> Applied {
        let plan = self.begin_filter_change(filter);
        let outcome = gateway.customers(plan.page, &plan.filter).await;
        self.apply(&plan, outcome)
    }

    /// Refreshes the current filter from page 1.
    pub async fn refresh<G: Gateway + ?Sized>(&mut self, gateway: &G) -> Applied {
        let plan = self.begin_refresh();
        let outcome = gateway.customers(plan.page, &plan.filter).await;
        self.apply(&plan, outcome)
    }

    /// Fetches and appends the next page; `None` when load-more is not
    /// currently offered. Failures are reported through
    /// [`PopulationView::last_error`].
    pub async fn load_more<G: Gateway + ?Sized>(&mut self, gateway: &G) -> Option<Applied> {
        let plan = self.begin_load_more()?;
        let outcome = gateway.customers(plan.page, &plan.filter).await;
        Some(self.apply(&plan, outcome))
    }

    /// Performs one poll refresh; `None` when polling is gated off.
    pub async fn poll_once<G: Gateway + ?Sized>(&mut self, gateway: &G) -> Option<Applied> {
        let plan = self.begin_poll()?;
        let outcome = gateway.customers(plan.page, &plan.filter).await;
        Some(self.apply(&plan, outcome))
    }
}

impl Default for PopulationView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerPage, StatusTab};
    use crate::testing::{mock_customer, mock_page, MockGateway};

    fn search_filter(text: &str) -> PopulationFilter {
        PopulationFilter {
            search: text.into(),
            status: StatusTab::All,
        }
    }

    fn tab_filter(status: StatusTab) -> PopulationFilter {
        PopulationFilter {
            search: String::new(),
            status,
        }
    }

    fn ready_view(pages_loaded: u32) -> PopulationView {
        let mut view = PopulationView::new();
        let plan = view.begin_filter_change(PopulationFilter::neutral());
        view.apply(&plan, Ok(mock_page(0, 2, true)));
        for p in 2..=pages_loaded {
            let plan = view.begin_load_more().unwrap();
            view.apply(&plan, Ok(mock_page((p as usize - 1) * 2, 2, true)));
        }
        view
    }

    #[test]
    fn test_initial_fetch_populates_view() {
        let mut view = PopulationView::new();
        assert_eq!(view.phase(), PopulationPhase::Idle);

        let plan = view.begin_filter_change(PopulationFilter::neutral());
        assert_eq!(view.phase(), PopulationPhase::LoadingInitial);
        assert_eq!(plan.page, 1);

        let applied = view.apply(&plan, Ok(mock_page(0, 3, true)));
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(view.phase(), PopulationPhase::Ready);
        assert_eq!(view.records().len(), 3);
        assert_eq!(view.page(), 1);
        assert!(view.tally().has_more);
    }

    #[test]
    fn test_stale_response_discarded_by_filter_identity() {
        let mut view = PopulationView::new();

        // Search "A" fires, then "B" before A's response lands.
        let plan_a = view.begin_filter_change(search_filter("A"));
        let plan_b = view.begin_filter_change(search_filter("B"));

        // B's response arrives first and is applied.
        let page_b = CustomerPage {
            results: vec![mock_customer(10, false)],
            ..mock_page(0, 0, false)
        };
        assert_eq!(view.apply(&plan_b, Ok(page_b)), Applied::Replaced);

        // A's slower response arrives afterwards and must be discarded.
        assert_eq!(view.apply(&plan_a, Ok(mock_page(0, 5, true))), Applied::Stale);

        assert_eq!(view.records().len(), 1);
        assert_eq!(view.records()[0].customer_id, "CUST-011");
        assert_eq!(view.filter().search, "B");
        assert_eq!(view.metrics().snapshot().stale_discarded, 1);
    }

    #[test]
    fn test_stale_error_discarded_without_touching_state() {
        let mut view = PopulationView::new();
        let plan_a = view.begin_filter_change(search_filter("A"));
        let _plan_b = view.begin_filter_change(search_filter("B"));

        let applied = view.apply(
            &plan_a,
            Err(ClientError::ConnectionFailed("timed out".into())),
        );
        assert_eq!(applied, Applied::Stale);
        assert_eq!(view.phase(), PopulationPhase::LoadingInitial);
        assert_eq!(view.last_error(), None);
    }

    #[test]
    fn test_load_more_appends_in_page_order() {
        let mut view = ready_view(1);
        assert!(view.can_load_more());

        let plan = view.begin_load_more().unwrap();
        assert_eq!(plan.page, 2);
        assert_eq!(view.phase(), PopulationPhase::LoadingMore);

        let applied = view.apply(&plan, Ok(mock_page(2, 2, false)));
        assert_eq!(applied, Applied::Appended);
        assert_eq!(view.page(), 2);
        let ids: Vec<&str> = view.records().iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["CUST-001", "CUST-002", "CUST-003", "CUST-004"]);

        // Server said no further page.
        assert!(!view.can_load_more());
    }

    #[test]
    fn test_load_more_refused_while_one_is_in_flight() {
        let mut view = ready_view(1);
        let first = view.begin_load_more();
        assert!(first.is_some());
        assert!(view.begin_load_more().is_none());
    }

    #[test]
    fn test_load_more_refused_with_active_search() {
        let mut view = PopulationView::new();
        let plan = view.begin_filter_change(search_filter("CUST"));
        view.apply(&plan, Ok(mock_page(0, 2, true)));
        // has_more is true but search narrows the list.
        assert!(!view.can_load_more());
        assert!(view.begin_load_more().is_none());
    }

    #[test]
    fn test_load_more_refused_before_first_page() {
        let mut view = PopulationView::new();
        assert!(view.begin_load_more().is_none());
    }

    #[test]
    fn test_load_more_allowed_under_status_tab() {
        let mut view = PopulationView::new();
        let plan = view.begin_filter_change(tab_filter(StatusTab::Churn));
        view.apply(&plan, Ok(mock_page(0, 2, true)));
        assert!(view.can_load_more());
    }

    #[test]
    fn test_poll_gated_off_past_page_one() {
        let mut view = ready_view(2);
        assert_eq!(view.page(), 2);
        assert!(view.begin_poll().is_none());
        assert_eq!(view.metrics().snapshot().polls_suppressed, 1);
    }

    #[test]
    fn test_poll_gated_off_under_filter() {
        let mut view = PopulationView::new();
        let plan = view.begin_filter_change(search_filter("x"));
        view.apply(&plan, Ok(mock_page(0, 1, false)));
        assert!(view.begin_poll().is_none());

        let plan = view.begin_filter_change(tab_filter(StatusTab::Safe));
        view.apply(&plan, Ok(mock_page(0, 1, false)));
        assert!(view.begin_poll().is_none());
    }

    #[test]
    fn test_poll_gated_off_during_loads() {
        let mut view = PopulationView::new();
        let _plan = view.begin_refresh();
        assert_eq!(view.phase(), PopulationPhase::LoadingInitial);
        assert!(view.begin_poll().is_none());

        let mut view = ready_view(1);
        let _more = view.begin_load_more().unwrap();
        assert!(view.begin_poll().is_none());
    }

    #[test]
    fn test_poll_replaces_first_page_without_loading_phase() {
        let mut view = ready_view(1);
        let plan = view.begin_poll().unwrap();
        // Polling stays invisible: no loading phase while in flight.
        assert_eq!(view.phase(), PopulationPhase::Ready);

        let applied = view.apply(&plan, Ok(mock_page(0, 3, true)));
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(view.records().len(), 3);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_failure_keeps_last_known_good_records() {
        let mut view = ready_view(1);
        assert_eq!(view.records().len(), 2);

        let plan = view.begin_poll().unwrap();
        let applied = view.apply(
            &plan,
            Err(ClientError::Gateway {
                status: 503,
                message: "unavailable".into(),
            }),
        );
        assert_eq!(applied, Applied::Failed);
        assert_eq!(view.phase(), PopulationPhase::Error);
        assert_eq!(view.records().len(), 2);
        assert!(view.last_error().unwrap().contains("503"));
    }

    #[test]
    fn test_poll_allowed_again_after_error() {
        let mut view = ready_view(1);
        let plan = view.begin_poll().unwrap();
        view.apply(&plan, Err(ClientError::ConnectionFailed("down".into())));
        assert_eq!(view.phase(), PopulationPhase::Error);

        // The next tick is the recovery path.
        let plan = view.begin_poll().unwrap();
        let applied = view.apply(&plan, Ok(mock_page(0, 2, true)));
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(view.phase(), PopulationPhase::Ready);
        assert_eq!(view.last_error(), None);
    }

    #[test]
    fn test_filter_change_invalidates_pending_load_more() {
        let mut view = ready_view(1);
        let more_plan = view.begin_load_more().unwrap();

        // The user edits the filter while page 2 is in flight.
        let filter_plan = view.begin_filter_change(search_filter("CUST-9"));

        assert_eq!(view.apply(&more_plan, Ok(mock_page(2, 2, true))), Applied::Stale);
        assert_eq!(view.apply(&filter_plan, Ok(mock_page(8, 1, false))), Applied::Replaced);
        assert_eq!(view.records().len(), 1);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_tally_is_server_authoritative() {
        let mut view = PopulationView::new();
        let plan = view.begin_filter_change(tab_filter(StatusTab::Churn));
        let mut page = mock_page(0, 3, true);
        page.pagination.total_records = 45;
        page.pagination.churn_count = 45;
        page.pagination.safe_count = 0;
        view.apply(&plan, Ok(page));

        // Counters come from the envelope, never from the subset length.
        assert_eq!(view.records().len(), 3);
        assert_eq!(view.tally().total_records, 45);
        assert_eq!(view.tally().churn_count, 45);
    }

    #[tokio::test]
    async fn test_change_filter_driver_round_trip() {
        let gateway = MockGateway::new();
        gateway.queue_customers(Ok(mock_page(0, 3, true)));

        let mut view = PopulationView::new();
        let applied = view.change_filter(&gateway, PopulationFilter::neutral()).await;
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(view.records().len(), 3);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            crate::testing::GatewayCall::Customers { page: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_status_tab_records_match_predicate() {
        let gateway = MockGateway::new();
        let churners = CustomerPage {
            results: (0..4).map(|i| mock_customer(i * 2, true)).collect(),
            ..mock_page(0, 0, false)
        };
        gateway.queue_customers(Ok(churners));

        let mut view = PopulationView::new();
        view.change_filter(&gateway, tab_filter(StatusTab::Churn)).await;
        assert!(view.records().iter().all(|r| r.is_churn));
    }

    #[tokio::test]
    async fn test_load_more_driver_accumulates_pages() {
        let gateway = MockGateway::new();
        gateway.queue_customers(Ok(mock_page(0, 2, true)));
        gateway.queue_customers(Ok(mock_page(2, 2, false)));

        let mut view = PopulationView::new();
        view.change_filter(&gateway, PopulationFilter::neutral()).await;
        let applied = view.load_more(&gateway).await;
        assert_eq!(applied, Some(Applied::Appended));
        assert_eq!(view.records().len(), 4);
        assert_eq!(view.page(), 2);

        // No further page, so the driver declines without a network call.
        assert_eq!(view.load_more(&gateway).await, None);
        assert_eq!(gateway.customer_fetches(), 2);
    }

    #[tokio::test]
    async fn test_poll_once_driver_respects_gate() {
        let gateway = MockGateway::new();
        gateway.queue_customers(Ok(mock_page(0, 1, false)));

        let mut view = PopulationView::new();
        view.change_filter(&gateway, search_filter("CUST")).await;

        // Gated: no network call is made.
        assert_eq!(view.poll_once(&gateway).await, None);
        assert_eq!(gateway.customer_fetches(), 1);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let view = ready_view(1);
        let snap = view.snapshot();
        assert_eq!(snap.records.len(), view.records().len());
        assert_eq!(snap.phase, PopulationPhase::Ready);
        assert!(snap.can_load_more);
        assert_eq!(snap.last_error, None);
    }
}
