//! Domain and wire types shared across the client views.
//!
//! Everything the gateway produces or consumes lives here: customer
//! records, prediction payloads and results, pagination envelopes, the
//! history ledger rows and the dashboard aggregates. Views never mutate
//! gateway-owned fields; they replace or append whole records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ── Enums ──

/// Risk band assigned by the gateway.
///
/// Ordinal: `Low < Medium < High < Critical`. Unrecognized wire values
/// decode as [`RiskLevel::Low`] rather than failing the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    /// Customer unlikely to churn.
    Low,
    /// Some churn indicators present.
    Medium,
    /// Strong churn indicators present.
    High,
    /// Churn imminent without intervention.
    Critical,
}

impl RiskLevel {
    /// All levels in ascending order.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Returns the wire string for this level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    /// Display weight for sorting and visual intensity (1 lightest,
    /// 4 heaviest). Exhaustive over the enum, so renderers never key
    /// styling off free-form strings.
    #[must_use]
    pub fn display_weight(self) -> u8 {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    /// Lenient parse used at the wire boundary; unknown strings map to
    /// [`RiskLevel::Low`].
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Low,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(s: String) -> Self {
        RiskLevel::from_wire(&s)
    }
}

impl From<RiskLevel> for String {
    fn from(level: RiskLevel) -> Self {
        level.as_str().to_string()
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(ClientError::Configuration(format!(
                "invalid risk level: '{other}' (expected Low/Medium/High/Critical)"
            ))),
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Population status filter tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusTab {
    /// Every customer regardless of outcome.
    #[default]
    All,
    /// Only customers predicted to churn.
    Churn,
    /// Only customers predicted to stay.
    Safe,
}

impl StatusTab {
    /// Returns the tab identifier string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTab::All => "all",
            StatusTab::Churn => "churn",
            StatusTab::Safe => "safe",
        }
    }

    /// Value for the `status` query parameter; `None` means the parameter
    /// is omitted entirely (the gateway treats absence as "all").
    #[must_use]
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            StatusTab::All => None,
            StatusTab::Churn => Some("churn"),
            StatusTab::Safe => Some("safe"),
        }
    }
}

impl std::str::FromStr for StatusTab {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusTab::All),
            "churn" | "churned" => Ok(StatusTab::Churn),
            "safe" | "retained" => Ok(StatusTab::Safe),
            other => Err(ClientError::Configuration(format!(
                "invalid status tab: '{other}' (expected all/churn/safe)"
            ))),
        }
    }
}

impl std::fmt::Display for StatusTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Contract billing cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContractType {
    /// Month-to-month billing.
    #[default]
    Monthly,
    /// Yearly billing.
    Annual,
}

impl ContractType {
    /// Returns the wire string for this contract type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContractType::Monthly => "Monthly",
            ContractType::Annual => "Annual",
        }
    }
}

impl std::str::FromStr for ContractType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(ContractType::Monthly),
            "annual" | "yearly" => Ok(ContractType::Annual),
            other => Err(ClientError::Configuration(format!(
                "invalid contract type: '{other}' (expected Monthly/Annual)"
            ))),
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Filters ──

/// Filter state for the population view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationFilter {
    /// Free-text customer id search; empty means no search.
    pub search: String,
    /// Churn status tab.
    pub status: StatusTab,
}

impl PopulationFilter {
    /// Filter matching everything (empty search, `All` tab).
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// `true` when neither search nor tab narrows the population. Only a
    /// neutral page 1 is eligible for background polling.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.search.is_empty() && self.status == StatusTab::All
    }
}

/// Discrete filters for the history ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Restrict to one risk level.
    pub risk_level: Option<RiskLevel>,
    /// Restrict to churn (`true`) or safe (`false`) outcomes.
    pub is_churn: Option<bool>,
}

impl HistoryFilter {
    /// `true` when no restriction is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.risk_level.is_none() && self.is_churn.is_none()
    }
}

// ── Population records ──

/// One customer row in the population view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Unique, stable customer key.
    pub customer_id: String,
    /// Latest predicted outcome.
    pub is_churn: bool,
    /// Latest churn probability in `[0, 1]`.
    pub churn_probability: f64,
    /// Latest risk band.
    pub risk_level: RiskLevel,
    /// When the latest prediction was made.
    pub last_prediction_date: DateTime<Utc>,
    /// How many predictions exist for this customer (at least 1).
    pub total_predictions: u32,
}

/// Server-authoritative pagination counters for the population view.
///
/// `has_more` comes from the gateway and is never inferred from page
/// length; the accumulated client list is a strict subset whenever a
/// filter is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTally {
    /// Whether another page exists after the one just served.
    pub has_more: bool,
    /// Total records matching the filter.
    pub total_records: u64,
    /// Matching records predicted to churn.
    pub churn_count: u64,
    /// Matching records predicted to stay.
    pub safe_count: u64,
}

/// One page of the population listing as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPage {
    /// Records for the requested page, in server order.
    pub results: Vec<CustomerRecord>,
    /// Counters for the filter the page was served under.
    pub pagination: PageTally,
}

// ── Prediction payloads and results ──

/// Gateway-ready prediction payload with coerced numeric fields.
///
/// Produced by the validator from a [`crate::validate::RowDraft`]; field
/// names on the wire keep the capitalized form the scoring service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictPayload {
    /// Customer id; omitted when the gateway should assign one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Age in years, 18..=80.
    #[serde(rename = "Age")]
    pub age: u32,
    /// Months subscribed, 0..=72.
    #[serde(rename = "Subscription_Duration_Months")]
    pub subscription_duration_months: u32,
    /// Billing cadence.
    #[serde(rename = "Contract_Type")]
    pub contract_type: ContractType,
    /// Logins in the last month, 0..=30.
    #[serde(rename = "Monthly_Logins")]
    pub monthly_logins: u32,
    /// Days since the last purchase, 0..=180.
    #[serde(rename = "Last_Purchase_Days_Ago")]
    pub last_purchase_days_ago: u32,
    /// Daily app usage in minutes, 0..=120.
    #[serde(rename = "App_Usage_Time_Min")]
    pub app_usage_time_min: f64,
    /// Monthly spend in dollars, 10..=400.
    #[serde(rename = "Monthly_Spend")]
    pub monthly_spend: f64,
    /// Fraction of purchases made with a discount, 0..=0.6.
    #[serde(rename = "Discount_Usage_Percentage")]
    pub discount_usage_percentage: f64,
    /// Support calls in the last month, 0..=10.
    #[serde(rename = "Customer_Support_Calls")]
    pub customer_support_calls: u32,
    /// Self-reported satisfaction, 1..=5.
    #[serde(rename = "Satisfaction_Score")]
    pub satisfaction_score: u32,
}

/// A stored prediction as returned by the single-predict endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Gateway-assigned record id, used for history deletion.
    pub id: u64,
    /// Customer the prediction belongs to.
    pub customer_id: String,
    /// Predicted outcome.
    pub is_churn: bool,
    /// Churn probability in `[0, 1]`.
    pub churn_probability: f64,
    /// Churn probability as a percentage, pre-rounded by the gateway.
    pub churn_probability_pct: f64,
    /// Assigned risk band.
    pub risk_level: RiskLevel,
    /// Contributing factors, most significant first.
    #[serde(default)]
    pub risk_factors: Vec<String>,
    /// Suggested interventions, most relevant first.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// When the prediction was made.
    pub created_at: DateTime<Utc>,
}

/// One row of a batch-predict response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Customer the row was scored for.
    pub customer_id: String,
    /// Predicted outcome.
    pub is_churn: bool,
    /// Churn probability as a percentage, pre-rounded by the gateway.
    pub churn_probability_pct: f64,
    /// Assigned risk band.
    pub risk_level: RiskLevel,
}

// ── History ledger ──

/// One archived prediction in the history ledger.
///
/// Carries the input snapshot alongside the outcome so the ledger can be
/// audited without refetching inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Gateway-assigned record id.
    pub id: u64,
    /// Customer the prediction was made for.
    pub customer_id: String,
    /// Age at prediction time.
    pub age: u32,
    /// Contract type at prediction time.
    pub contract_type: ContractType,
    /// Monthly spend at prediction time.
    pub monthly_spend: f64,
    /// Satisfaction score at prediction time.
    pub satisfaction_score: u32,
    /// Support calls at prediction time.
    pub customer_support_calls: u32,
    /// Monthly logins at prediction time.
    pub monthly_logins: u32,
    /// Days since last purchase at prediction time.
    pub last_purchase_days_ago: u32,
    /// Predicted outcome.
    pub is_churn: bool,
    /// Churn probability in `[0, 1]`.
    pub churn_probability: f64,
    /// Assigned risk band.
    pub risk_level: RiskLevel,
    /// When the prediction was made.
    pub created_at: DateTime<Utc>,
}

// ── Customer detail ──

/// Latest prediction block of a customer detail response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPrediction {
    /// Predicted outcome.
    pub is_churn: bool,
    /// Churn probability in `[0, 1]`.
    pub churn_probability: f64,
    /// Assigned risk band.
    pub risk_level: RiskLevel,
    /// Contributing factors, most significant first.
    #[serde(default)]
    pub risk_factors: Vec<String>,
    /// Suggested interventions, most relevant first.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// When the prediction was made.
    pub date: DateTime<Utc>,
}

/// One point of a customer's probability timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    /// When the prediction was made.
    pub date: DateTime<Utc>,
    /// Churn probability in `[0, 1]`.
    pub churn_probability: f64,
    /// Assigned risk band.
    pub risk_level: RiskLevel,
    /// Predicted outcome.
    pub is_churn: bool,
}

/// Full detail for one customer, including the probability timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetail {
    /// Customer key.
    pub customer_id: String,
    /// The most recent prediction.
    pub latest_prediction: LatestPrediction,
    /// Prediction timeline in server (chronological) order.
    #[serde(default)]
    pub progress: Vec<ProgressPoint>,
}

// ── Dashboard aggregates ──

/// Count of predictions in one risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSlice {
    /// The risk band.
    pub risk_level: RiskLevel,
    /// Predictions currently in that band.
    pub count: u64,
}

/// Predictions made on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// The day bucket.
    pub date: NaiveDate,
    /// Predictions made that day.
    pub total: u64,
    /// Of those, predicted churns.
    pub churned: u64,
}

/// Aggregate dashboard statistics. Pure read; carries no view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// All predictions ever made.
    pub total_predictions: u64,
    /// Predictions with a churn outcome.
    pub churned: u64,
    /// Predictions with a safe outcome.
    pub not_churned: u64,
    /// Churn rate as a percentage.
    pub churn_rate_pct: f64,
    /// Mean churn probability as a percentage.
    pub avg_churn_probability_pct: f64,
    /// Per-band prediction counts.
    #[serde(default)]
    pub risk_breakdown: Vec<RiskSlice>,
    /// Daily prediction volume.
    #[serde(default)]
    pub daily_trend: Vec<TrendPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_round_trip() {
        for level in RiskLevel::ALL {
            let parsed: RiskLevel = level.as_str().parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn test_risk_level_strict_parse_rejects_unknown() {
        let err = "Extreme".parse::<RiskLevel>().unwrap_err();
        assert!(err.to_string().contains("Extreme"));
    }

    #[test]
    fn test_risk_level_wire_fallback() {
        assert_eq!(RiskLevel::from_wire("Critical"), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_wire("something-new"), RiskLevel::Low);

        let decoded: RiskLevel = serde_json::from_str("\"Extreme\"").unwrap();
        assert_eq!(decoded, RiskLevel::Low);
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"High\"");
    }

    #[test]
    fn test_display_weight_is_ordinal() {
        let weights: Vec<u8> = RiskLevel::ALL.iter().map(|l| l.display_weight()).collect();
        assert_eq!(weights, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_status_tab_query_value() {
        assert_eq!(StatusTab::All.query_value(), None);
        assert_eq!(StatusTab::Churn.query_value(), Some("churn"));
        assert_eq!(StatusTab::Safe.query_value(), Some("safe"));
    }

    #[test]
    fn test_population_filter_neutrality() {
        assert!(PopulationFilter::neutral().is_neutral());
        let searched = PopulationFilter {
            search: "CUST".into(),
            status: StatusTab::All,
        };
        assert!(!searched.is_neutral());
        let tabbed = PopulationFilter {
            search: String::new(),
            status: StatusTab::Churn,
        };
        assert!(!tabbed.is_neutral());
    }

    #[test]
    fn test_predict_payload_wire_names() {
        let payload = PredictPayload {
            customer_id: Some("CUST-001".into()),
            age: 35,
            subscription_duration_months: 12,
            contract_type: ContractType::Monthly,
            monthly_logins: 10,
            last_purchase_days_ago: 20,
            app_usage_time_min: 30.0,
            monthly_spend: 80.0,
            discount_usage_percentage: 0.2,
            customer_support_calls: 2,
            satisfaction_score: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["customer_id"], "CUST-001");
        assert_eq!(json["Age"], 35);
        assert_eq!(json["Contract_Type"], "Monthly");
        assert_eq!(json["Monthly_Spend"], 80.0);
        assert_eq!(json["Satisfaction_Score"], 3);
    }

    #[test]
    fn test_predict_payload_omits_blank_customer_id() {
        let payload = PredictPayload {
            customer_id: None,
            age: 35,
            subscription_duration_months: 18,
            contract_type: ContractType::Annual,
            monthly_logins: 10,
            last_purchase_days_ago: 25,
            app_usage_time_min: 35.0,
            monthly_spend: 85.0,
            discount_usage_percentage: 0.2,
            customer_support_calls: 2,
            satisfaction_score: 3,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("customer_id").is_none());
    }

    #[test]
    fn test_customer_page_decodes_envelope() {
        let body = r#"{
            "results": [{
                "customer_id": "CUST-007",
                "is_churn": true,
                "churn_probability": 0.82,
                "risk_level": "High",
                "last_prediction_date": "2024-01-15T10:30:00Z",
                "total_predictions": 4
            }],
            "pagination": {
                "has_more": true,
                "total_records": 120,
                "churn_count": 45,
                "safe_count": 75
            }
        }"#;
        let page: CustomerPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].risk_level, RiskLevel::High);
        assert!(page.pagination.has_more);
        assert_eq!(page.pagination.total_records, 120);
    }

    #[test]
    fn test_dashboard_stats_defaults_empty_series() {
        let body = r#"{
            "total_predictions": 10,
            "churned": 4,
            "not_churned": 6,
            "churn_rate_pct": 40.0,
            "avg_churn_probability_pct": 37.5
        }"#;
        let stats: DashboardStats = serde_json::from_str(body).unwrap();
        assert!(stats.risk_breakdown.is_empty());
        assert!(stats.daily_trend.is_empty());
    }
}
