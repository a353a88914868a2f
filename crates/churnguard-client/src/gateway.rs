//! Gateway trait and HTTP implementation.
//!
//! [`Gateway`] is the seam every view depends on; [`HttpGateway`] talks to
//! the churn service over its REST surface, and
//! [`crate::testing::MockGateway`] substitutes scripted responses in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, ValidationErrors};
use crate::model::{
    BatchOutcome, CustomerDetail, CustomerPage, DashboardStats, HistoryFilter, HistoryRecord,
    PopulationFilter, PredictPayload, PredictionResult,
};

/// Async interface to the remote prediction service.
///
/// All methods are fallible and non-blocking; callers own retry policy
/// (the views deliberately never retry on their own).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Scores a single payload and stores the prediction.
    ///
    /// # Errors
    ///
    /// `Validation` when the gateway rejects fields, otherwise transport
    /// or status errors.
    async fn predict(&self, payload: &PredictPayload) -> ClientResult<PredictionResult>;

    /// Scores a batch of payloads in one call.
    ///
    /// # Errors
    ///
    /// Transport or status errors; the whole batch fails together.
    async fn predict_batch(&self, payloads: &[PredictPayload]) -> ClientResult<Vec<BatchOutcome>>;

    /// Fetches one page of the customer population under `filter`.
    ///
    /// # Errors
    ///
    /// Transport or status errors.
    async fn customers(&self, page: u32, filter: &PopulationFilter) -> ClientResult<CustomerPage>;

    /// Fetches one customer's detail and probability timeline.
    ///
    /// # Errors
    ///
    /// `NotFound` when the customer does not exist.
    async fn customer_detail(&self, customer_id: &str) -> ClientResult<CustomerDetail>;

    /// Fetches the full history set matching `filter`.
    ///
    /// # Errors
    ///
    /// Transport or status errors.
    async fn history(&self, filter: &HistoryFilter) -> ClientResult<Vec<HistoryRecord>>;

    /// Deletes one history record.
    ///
    /// # Errors
    ///
    /// `NotFound` when the record does not exist.
    async fn delete_history(&self, id: u64) -> ClientResult<()>;

    /// Fetches aggregate dashboard statistics.
    ///
    /// # Errors
    ///
    /// Transport or status errors.
    async fn stats(&self) -> ClientResult<DashboardStats>;
}

// -- Gateway REST API response types --

#[derive(Deserialize)]
struct BatchResponse {
    results: Vec<BatchOutcome>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, String>>,
}

/// HTTP client for the churn service REST API.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl HttpGateway {
    /// Creates a gateway client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the configuration is
    /// invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    /// Returns the base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Helper to perform a GET request and deserialize JSON.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> ClientResult<T> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("gateway: {e}")))?;
        read_json(resp, resource).await
    }

    /// Helper to POST a JSON body and deserialize the JSON response.
    async fn post_json<B, T>(&self, url: &str, body: &B, resource: &str) -> ClientResult<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("gateway: {e}")))?;
        read_json(resp, resource).await
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn predict(&self, payload: &PredictPayload) -> ClientResult<PredictionResult> {
        debug!(
            customer = payload.customer_id.as_deref().unwrap_or("<assigned>"),
            "requesting single prediction"
        );
        self.post_json(&self.url("/predict/"), payload, "prediction")
            .await
    }

    async fn predict_batch(&self, payloads: &[PredictPayload]) -> ClientResult<Vec<BatchOutcome>> {
        debug!(rows = payloads.len(), "requesting batch prediction");
        let resp: BatchResponse = self
            .post_json(&self.url("/predict/batch/"), payloads, "batch prediction")
            .await?;
        Ok(resp.results)
    }

    async fn customers(&self, page: u32, filter: &PopulationFilter) -> ClientResult<CustomerPage> {
        let query = population_query(page, self.page_size, filter);
        debug!(page, search = %filter.search, status = %filter.status, "fetching customer page");
        self.get_json(&self.url("/customers/"), &query, "customer page")
            .await
    }

    async fn customer_detail(&self, customer_id: &str) -> ClientResult<CustomerDetail> {
        debug!(customer = customer_id, "fetching customer detail");
        self.get_json(
            &self.url(&format!("/customers/{customer_id}")),
            &[],
            &format!("customer '{customer_id}'"),
        )
        .await
    }

    async fn history(&self, filter: &HistoryFilter) -> ClientResult<Vec<HistoryRecord>> {
        let query = history_query(filter);
        debug!(filtered = !filter.is_empty(), "fetching history");
        self.get_json(&self.url("/history/"), &query, "history").await
    }

    async fn delete_history(&self, id: u64) -> ClientResult<()> {
        debug!(id, "deleting history record");
        let resp = self
            .client
            .delete(self.url(&format!("/history/{id}/")))
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("gateway: {e}")))?;
        read_ok(resp, &format!("history record {id}")).await
    }

    async fn stats(&self) -> ClientResult<DashboardStats> {
        self.get_json(&self.url("/stats/"), &[], "stats").await
    }
}

/// Builds the query string pairs for a population page request. The
/// `search` and `status` parameters are omitted entirely when neutral,
/// matching what the gateway expects.
fn population_query(page: u32, limit: u32, filter: &PopulationFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if !filter.search.is_empty() {
        query.push(("search", filter.search.clone()));
    }
    if let Some(status) = filter.status.query_value() {
        query.push(("status", status.to_string()));
    }
    query
}

/// Builds the query string pairs for a history request; unset filters are
/// omitted.
fn history_query(filter: &HistoryFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(level) = filter.risk_level {
        query.push(("risk_level", level.as_str().to_string()));
    }
    if let Some(is_churn) = filter.is_churn {
        query.push(("is_churn", is_churn.to_string()));
    }
    query
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: Response,
    resource: &str,
) -> ClientResult<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(error_for_status(status, &body, resource));
    }
    resp.json::<T>()
        .await
        .map_err(|e| ClientError::Decode(format!("failed to parse {resource} response: {e}")))
}

async fn read_ok(resp: Response, resource: &str) -> ClientResult<()> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(error_for_status(status, &body, resource));
    }
    Ok(())
}

/// Maps an error status and its body to a typed error. A body carrying a
/// field→message map becomes `Validation` so forms can render inline; a
/// plain `error` string becomes the banner message.
fn error_for_status(status: StatusCode, body: &str, resource: &str) -> ClientError {
    if status == StatusCode::NOT_FOUND {
        return ClientError::NotFound {
            resource: resource.to_string(),
        };
    }
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    if let Some(fields) = parsed.errors {
        if !fields.is_empty() {
            let mut errors = ValidationErrors::new();
            for (field, message) in fields {
                errors.push(field, message);
            }
            return ClientError::Validation(errors);
        }
    }
    let message = parsed
        .error
        .unwrap_or_else(|| body.trim().to_string());
    ClientError::Gateway {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusTab;

    #[test]
    fn test_population_query_neutral_filter() {
        let filter = PopulationFilter::neutral();
        let query = population_query(1, 50, &filter);
        assert_eq!(
            query,
            vec![("page", "1".to_string()), ("limit", "50".to_string())]
        );
    }

    #[test]
    fn test_population_query_with_search_and_status() {
        let filter = PopulationFilter {
            search: "CUST-0".into(),
            status: StatusTab::Churn,
        };
        let query = population_query(3, 50, &filter);
        assert!(query.contains(&("page", "3".to_string())));
        assert!(query.contains(&("search", "CUST-0".to_string())));
        assert!(query.contains(&("status", "churn".to_string())));
    }

    #[test]
    fn test_history_query_omits_unset_filters() {
        assert!(history_query(&HistoryFilter::default()).is_empty());

        let filter = HistoryFilter {
            risk_level: Some(crate::model::RiskLevel::High),
            is_churn: Some(true),
        };
        let query = history_query(&filter);
        assert!(query.contains(&("risk_level", "High".to_string())));
        assert!(query.contains(&("is_churn", "true".to_string())));
    }

    #[test]
    fn test_error_for_status_not_found() {
        let err = error_for_status(StatusCode::NOT_FOUND, "", "customer 'CUST-9'");
        assert!(matches!(err, ClientError::NotFound { .. }));
        assert!(err.to_string().contains("CUST-9"));
    }

    #[test]
    fn test_error_for_status_field_map_becomes_validation() {
        let body = r#"{"errors": {"Age": "Ensure this value is less than or equal to 80."}}"#;
        let err = error_for_status(StatusCode::BAD_REQUEST, body, "prediction");
        let errors = err.as_validation().unwrap();
        assert!(errors.get("Age").unwrap().contains("less than or equal"));
    }

    #[test]
    fn test_error_for_status_error_string_becomes_banner() {
        let body = r#"{"error": "model not loaded"}"#;
        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, body, "prediction");
        match err {
            ClientError::Gateway { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "model not loaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_for_status_raw_body_fallback() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, "<html>upstream down</html>", "stats");
        match err {
            ClientError::Gateway { status, message } => {
                assert_eq!(status, 502);
                assert!(message.contains("upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_gateway_trims_trailing_slash() {
        let config = ClientConfig::new("http://localhost:8000/api/");
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8000/api");
        assert_eq!(gateway.url("/stats/"), "http://localhost:8000/api/stats/");
    }

    #[test]
    fn test_http_gateway_rejects_invalid_config() {
        let config = ClientConfig::new("not-a-url");
        assert!(HttpGateway::new(&config).is_err());
    }
}
