//! Input validation and payload normalization.
//!
//! One routine serves the single-prediction form and every batch row:
//! [`normalize_row`] parses each numeric field with a field-scoped error
//! instead of coercing silently, enforces the bounds the scoring service
//! accepts, and fills in a default customer id where the flow allows one.

use crate::error::{ClientResult, ValidationErrors};
use crate::model::{ContractType, PredictPayload};

/// An editable prediction row as a form holds it: numerics as text, the
/// contract type as a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    /// Customer id; blank lets the flow assign one.
    pub customer_id: String,
    /// Age in years.
    pub age: String,
    /// Months subscribed.
    pub subscription_duration_months: String,
    /// Billing cadence.
    pub contract_type: ContractType,
    /// Logins in the last month.
    pub monthly_logins: String,
    /// Days since the last purchase.
    pub last_purchase_days_ago: String,
    /// Daily app usage in minutes.
    pub app_usage_time_min: String,
    /// Monthly spend in dollars.
    pub monthly_spend: String,
    /// Fraction of purchases made with a discount.
    pub discount_usage_percentage: String,
    /// Support calls in the last month.
    pub customer_support_calls: String,
    /// Self-reported satisfaction.
    pub satisfaction_score: String,
}

impl RowDraft {
    /// Default values for a batch table row at `index` (0-based). The
    /// customer id is pre-filled from the row position and stays editable.
    #[must_use]
    pub fn batch_default(index: usize) -> Self {
        Self {
            customer_id: default_customer_id(index),
            age: "35".into(),
            subscription_duration_months: "12".into(),
            contract_type: ContractType::Monthly,
            monthly_logins: "10".into(),
            last_purchase_days_ago: "20".into(),
            app_usage_time_min: "30".into(),
            monthly_spend: "80".into(),
            discount_usage_percentage: "0.2".into(),
            customer_support_calls: "2".into(),
            satisfaction_score: "3".into(),
        }
    }

    /// Default values for the single-prediction form; the customer id is
    /// left blank so the gateway assigns one.
    #[must_use]
    pub fn single_default() -> Self {
        Self {
            customer_id: String::new(),
            age: "35".into(),
            subscription_duration_months: "18".into(),
            contract_type: ContractType::Monthly,
            monthly_logins: "10".into(),
            last_purchase_days_ago: "25".into(),
            app_usage_time_min: "35".into(),
            monthly_spend: "85".into(),
            discount_usage_percentage: "0.2".into(),
            customer_support_calls: "2".into(),
            satisfaction_score: "3".into(),
        }
    }
}

/// Positional default customer id: `CUST-001`, `CUST-002`, ... (1-based,
/// zero-padded to three digits).
#[must_use]
pub fn default_customer_id(index: usize) -> String {
    format!("CUST-{:03}", index + 1)
}

/// Normalizes one draft row into a gateway payload.
///
/// `assigned_id` is used when the draft's customer id is blank: the batch
/// path passes the positional default, the single path passes `None` so
/// the id is omitted and the gateway assigns one.
///
/// # Errors
///
/// Returns [`crate::error::ClientError::Validation`] naming every field
/// that failed to parse or fell outside its accepted range.
pub fn normalize_row(draft: &RowDraft, assigned_id: Option<String>) -> ClientResult<PredictPayload> {
    let mut errors = ValidationErrors::new();

    let age = parse_u32(&mut errors, "Age", &draft.age, 18, 80);
    let subscription_duration_months = parse_u32(
        &mut errors,
        "Subscription_Duration_Months",
        &draft.subscription_duration_months,
        0,
        72,
    );
    let monthly_logins = parse_u32(&mut errors, "Monthly_Logins", &draft.monthly_logins, 0, 30);
    let last_purchase_days_ago = parse_u32(
        &mut errors,
        "Last_Purchase_Days_Ago",
        &draft.last_purchase_days_ago,
        0,
        180,
    );
    let app_usage_time_min = parse_f64(
        &mut errors,
        "App_Usage_Time_Min",
        &draft.app_usage_time_min,
        0.0,
        120.0,
    );
    let monthly_spend = parse_f64(&mut errors, "Monthly_Spend", &draft.monthly_spend, 10.0, 400.0);
    let discount_usage_percentage = parse_f64(
        &mut errors,
        "Discount_Usage_Percentage",
        &draft.discount_usage_percentage,
        0.0,
        0.6,
    );
    let customer_support_calls = parse_u32(
        &mut errors,
        "Customer_Support_Calls",
        &draft.customer_support_calls,
        0,
        10,
    );
    let satisfaction_score =
        parse_u32(&mut errors, "Satisfaction_Score", &draft.satisfaction_score, 1, 5);

    let customer_id = match draft.customer_id.trim() {
        "" => assigned_id,
        id => Some(id.to_string()),
    };

    errors.into_result()?;

    // Every parse succeeded once into_result returns Ok.
    Ok(PredictPayload {
        customer_id,
        age: age.unwrap_or_default(),
        subscription_duration_months: subscription_duration_months.unwrap_or_default(),
        contract_type: draft.contract_type,
        monthly_logins: monthly_logins.unwrap_or_default(),
        last_purchase_days_ago: last_purchase_days_ago.unwrap_or_default(),
        app_usage_time_min: app_usage_time_min.unwrap_or_default(),
        monthly_spend: monthly_spend.unwrap_or_default(),
        discount_usage_percentage: discount_usage_percentage.unwrap_or_default(),
        customer_support_calls: customer_support_calls.unwrap_or_default(),
        satisfaction_score: satisfaction_score.unwrap_or_default(),
    })
}

fn parse_u32(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    min: u32,
    max: u32,
) -> Option<u32> {
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(value) if (min..=max).contains(&value) => Some(value),
        Ok(value) => {
            errors.push(field, format!("must be between {min} and {max} (got {value})"));
            None
        }
        Err(_) => {
            errors.push(
                field,
                format!("must be a whole number between {min} and {max} (got '{trimmed}')"),
            );
            None
        }
    }
}

fn parse_f64(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    min: f64,
    max: f64,
) -> Option<f64> {
    let trimmed = raw.trim();
    // str::parse accepts "NaN" and "inf"; those must fail, not pass through.
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= min && value <= max => Some(value),
        Ok(value) if value.is_finite() => {
            errors.push(field, format!("must be between {min} and {max} (got {value})"));
            None
        }
        _ => {
            errors.push(
                field,
                format!("must be a number between {min} and {max} (got '{trimmed}')"),
            );
            None
        }
    }
}
