//! Testing utilities for the client views.
//!
//! Provides a scriptable [`MockGateway`] and fixture builders for
//! exercising the views without a running churn service.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::model::{
    BatchOutcome, CustomerDetail, CustomerPage, CustomerRecord, DashboardStats, HistoryFilter,
    HistoryRecord, LatestPrediction, PageTally, PopulationFilter, PredictPayload,
    PredictionResult, ProgressPoint, RiskLevel, StatusTab,
};

/// A recorded call against [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    /// `predict` with the payload's customer id (if any).
    Predict(Option<String>),
    /// `predict_batch` with the number of rows submitted.
    PredictBatch(usize),
    /// `customers` with the requested page and filter.
    Customers {
        /// Requested page number.
        page: u32,
        /// Search text at request time.
        search: String,
        /// Status tab at request time.
        status: StatusTab,
    },
    /// `customer_detail` with the requested id.
    CustomerDetail(String),
    /// `history` with the requested filter.
    History(HistoryFilter),
    /// `delete_history` with the record id.
    DeleteHistory(u64),
    /// `stats`.
    Stats,
}

/// Scriptable in-memory gateway.
///
/// Responses are queued per endpoint and consumed in call order. An empty
/// queue yields `ConnectionFailed` so a test that forgets to script a
/// response fails loudly instead of hanging.
#[derive(Debug, Default)]
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    predict_responses: Mutex<VecDeque<ClientResult<PredictionResult>>>,
    batch_responses: Mutex<VecDeque<ClientResult<Vec<BatchOutcome>>>>,
    customer_responses: Mutex<VecDeque<ClientResult<CustomerPage>>>,
    detail_responses: Mutex<VecDeque<ClientResult<CustomerDetail>>>,
    history_responses: Mutex<VecDeque<ClientResult<Vec<HistoryRecord>>>>,
    delete_responses: Mutex<VecDeque<ClientResult<()>>>,
    stats_responses: Mutex<VecDeque<ClientResult<DashboardStats>>>,
}

impl MockGateway {
    /// Creates a mock with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a single-predict response.
    pub fn queue_predict(&self, response: ClientResult<PredictionResult>) {
        self.predict_responses.lock().push_back(response);
    }

    /// Queues a batch-predict response.
    pub fn queue_batch(&self, response: ClientResult<Vec<BatchOutcome>>) {
        self.batch_responses.lock().push_back(response);
    }

    /// Queues a population page response.
    pub fn queue_customers(&self, response: ClientResult<CustomerPage>) {
        self.customer_responses.lock().push_back(response);
    }

    /// Queues a customer detail response.
    pub fn queue_detail(&self, response: ClientResult<CustomerDetail>) {
        self.detail_responses.lock().push_back(response);
    }

    /// Queues a history response.
    pub fn queue_history(&self, response: ClientResult<Vec<HistoryRecord>>) {
        self.history_responses.lock().push_back(response);
    }

    /// Queues a history delete response.
    pub fn queue_delete(&self, response: ClientResult<()>) {
        self.delete_responses.lock().push_back(response);
    }

    /// Queues a stats response.
    pub fn queue_stats(&self, response: ClientResult<DashboardStats>) {
        self.stats_responses.lock().push_back(response);
    }

    /// Returns every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Number of population page fetches made so far.
    #[must_use]
    pub fn customer_fetches(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, GatewayCall::Customers { .. }))
            .count()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn next<T>(queue: &Mutex<VecDeque<ClientResult<T>>>, endpoint: &str) -> ClientResult<T> {
        queue.lock().pop_front().unwrap_or_else(|| {
            Err(ClientError::ConnectionFailed(format!(
                "no scripted {endpoint} response"
            )))
        })
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn predict(&self, payload: &PredictPayload) -> ClientResult<PredictionResult> {
        self.record(GatewayCall::Predict(payload.customer_id.clone()));
        Self::next(&self.predict_responses, "predict")
    }

    async fn predict_batch(&self, payloads: &[PredictPayload]) -> ClientResult<Vec<BatchOutcome>> {
        self.record(GatewayCall::PredictBatch(payloads.len()));
        Self::next(&self.batch_responses, "batch")
    }

    async fn customers(&self, page: u32, filter: &PopulationFilter) -> ClientResult<CustomerPage> {
        self.record(GatewayCall::Customers {
            page,
            search: filter.search.clone(),
            status: filter.status,
        });
        Self::next(&self.customer_responses, "customers")
    }

    async fn customer_detail(&self, customer_id: &str) -> ClientResult<CustomerDetail> {
        self.record(GatewayCall::CustomerDetail(customer_id.to_string()));
        Self::next(&self.detail_responses, "customer detail")
    }

    async fn history(&self, filter: &HistoryFilter) -> ClientResult<Vec<HistoryRecord>> {
        self.record(GatewayCall::History(*filter));
        Self::next(&self.history_responses, "history")
    }

    async fn delete_history(&self, id: u64) -> ClientResult<()> {
        self.record(GatewayCall::DeleteHistory(id));
        Self::next(&self.delete_responses, "delete")
    }

    async fn stats(&self) -> ClientResult<DashboardStats> {
        self.record(GatewayCall::Stats);
        Self::next(&self.stats_responses, "stats")
    }
}

/// Fixed timestamp used by fixtures so assertions are reproducible.
#[must_use]
pub fn mock_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_705_312_800, 0).unwrap_or_default()
}

/// Builds a customer record; churners get high probability and risk.
#[must_use]
pub fn mock_customer(index: usize, is_churn: bool) -> CustomerRecord {
    CustomerRecord {
        customer_id: format!("CUST-{:03}", index + 1),
        is_churn,
        churn_probability: if is_churn { 0.82 } else { 0.12 },
        risk_level: if is_churn { RiskLevel::High } else { RiskLevel::Low },
        last_prediction_date: mock_timestamp(),
        total_predictions: 3,
    }
}

/// Builds a population page of `count` alternating customers starting at
/// `start` (0-based), with the given `has_more` flag.
#[must_use]
pub fn mock_page(start: usize, count: usize, has_more: bool) -> CustomerPage {
    let results: Vec<CustomerRecord> = (start..start + count)
        .map(|i| mock_customer(i, i % 2 == 0))
        .collect();
    let churn_count = results.iter().filter(|r| r.is_churn).count() as u64;
    let safe_count = results.len() as u64 - churn_count;
    CustomerPage {
        pagination: PageTally {
            has_more,
            total_records: 120,
            churn_count,
            safe_count,
        },
        results,
    }
}

/// Builds a single-predict result for `customer_id`.
#[must_use]
pub fn mock_result(customer_id: &str, is_churn: bool) -> PredictionResult {
    PredictionResult {
        id: 1,
        customer_id: customer_id.to_string(),
        is_churn,
        churn_probability: if is_churn { 0.73 } else { 0.18 },
        churn_probability_pct: if is_churn { 73.2 } else { 18.4 },
        risk_level: if is_churn { RiskLevel::High } else { RiskLevel::Low },
        risk_factors: vec!["Low satisfaction score".into()],
        recommendations: vec!["Offer a loyalty discount".into()],
        created_at: mock_timestamp(),
    }
}

/// Builds a batch outcome row.
#[must_use]
pub fn mock_outcome(customer_id: &str, is_churn: bool, pct: f64) -> BatchOutcome {
    BatchOutcome {
        customer_id: customer_id.to_string(),
        is_churn,
        churn_probability_pct: pct,
        risk_level: if pct >= 75.0 {
            RiskLevel::Critical
        } else if pct >= 50.0 {
            RiskLevel::High
        } else if pct >= 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        },
    }
}

/// Builds `count` history records with ids `1..=count`.
#[must_use]
pub fn mock_history(count: usize) -> Vec<HistoryRecord> {
    (1..=count as u64)
        .map(|id| HistoryRecord {
            id,
            customer_id: format!("CUST-{id:03}"),
            age: 35,
            contract_type: crate::model::ContractType::Monthly,
            monthly_spend: 80.0,
            satisfaction_score: 3,
            customer_support_calls: 2,
            monthly_logins: 10,
            last_purchase_days_ago: 20,
            is_churn: id % 2 == 0,
            churn_probability: 0.5,
            risk_level: RiskLevel::Medium,
            created_at: mock_timestamp(),
        })
        .collect()
}

/// Builds a customer detail with a three-point progress timeline.
#[must_use]
pub fn mock_detail(customer_id: &str) -> CustomerDetail {
    let progress: Vec<ProgressPoint> = [0.35, 0.52, 0.73]
        .iter()
        .map(|p| ProgressPoint {
            date: mock_timestamp(),
            churn_probability: *p,
            risk_level: RiskLevel::Medium,
            is_churn: *p > 0.5,
        })
        .collect();
    CustomerDetail {
        customer_id: customer_id.to_string(),
        latest_prediction: LatestPrediction {
            is_churn: true,
            churn_probability: 0.73,
            risk_level: RiskLevel::High,
            risk_factors: vec!["Frequent support calls".into()],
            recommendations: vec!["Assign a success manager".into()],
            date: mock_timestamp(),
        },
        progress,
    }
}

/// Builds dashboard stats with a full risk breakdown.
#[must_use]
pub fn mock_stats() -> DashboardStats {
    DashboardStats {
        total_predictions: 200,
        churned: 80,
        not_churned: 120,
        churn_rate_pct: 40.0,
        avg_churn_probability_pct: 37.5,
        risk_breakdown: RiskLevel::ALL
            .iter()
            .map(|level| crate::model::RiskSlice {
                risk_level: *level,
                count: 50,
            })
            .collect(),
        daily_trend: vec![crate::model::TrendPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            total: 20,
            churned: 8,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_scripted_queue() {
        let gateway = MockGateway::new();
        gateway.queue_customers(Ok(mock_page(0, 3, true)));

        let page = gateway
            .customers(1, &PopulationFilter::neutral())
            .await
            .unwrap();
        assert_eq!(page.results.len(), 3);
        assert_eq!(gateway.customer_fetches(), 1);

        // Unscripted second call fails loudly.
        let err = gateway
            .customers(2, &PopulationFilter::neutral())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no scripted"));
    }

    #[tokio::test]
    async fn test_mock_gateway_records_call_identity() {
        let gateway = MockGateway::new();
        gateway.queue_delete(Ok(()));
        gateway.delete_history(42).await.unwrap();
        assert_eq!(gateway.calls(), vec![GatewayCall::DeleteHistory(42)]);
    }

    #[test]
    fn test_mock_page_counts_match_rows() {
        let page = mock_page(0, 4, false);
        let churn = page.results.iter().filter(|r| r.is_churn).count() as u64;
        assert_eq!(page.pagination.churn_count, churn);
        assert_eq!(
            page.pagination.safe_count + page.pagination.churn_count,
            page.results.len() as u64
        );
    }
}
