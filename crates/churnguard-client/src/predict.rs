//! Single-prediction form flow.
//!
//! [`PredictForm`] holds one editable draft, submits it through the shared
//! normalization routine, and keeps either the returned prediction or the
//! failure for inline rendering. A local [`risk_hint`] estimates risk from
//! the draft before submission; it is advisory only and never sent to the
//! gateway.

use tracing::{debug, error, info};

use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::model::{ContractType, PredictionResult, RiskLevel};
use crate::validate::{normalize_row, RowDraft};

/// The single-prediction form state.
#[derive(Debug)]
pub struct PredictForm {
    draft: RowDraft,
    result: Option<PredictionResult>,
    last_error: Option<ClientError>,
}

impl PredictForm {
    /// Creates a form with the single-flow defaults; the customer id is
    /// blank so the gateway assigns one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            draft: RowDraft::single_default(),
            result: None,
            last_error: None,
        }
    }

    /// The editable draft.
    #[must_use]
    pub fn draft(&self) -> &RowDraft {
        &self.draft
    }

    /// Edits the draft in place. Any previous result or error is cleared:
    /// it described a submission the draft no longer matches.
    pub fn edit(&mut self, apply: impl FnOnce(&mut RowDraft)) {
        apply(&mut self.draft);
        self.result = None;
        self.last_error = None;
    }

    /// Resets the draft to the defaults and clears result and error.
    pub fn reset(&mut self) {
        self.draft = RowDraft::single_default();
        self.result = None;
        self.last_error = None;
    }

    /// The prediction from the last successful submission.
    #[must_use]
    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    /// The failure from the last submission; validation failures keep
    /// their field map for inline rendering.
    #[must_use]
    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Local advisory risk estimate for the current draft; `None` while a
    /// numeric field does not parse.
    #[must_use]
    pub fn live_hint(&self) -> Option<RiskLevel> {
        risk_hint(&self.draft)
    }

    /// Normalizes the draft and submits it to the gateway.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] when the draft fails normalization (no
    /// network call is made), otherwise the gateway error. The failure is
    /// also retained on the form.
    pub async fn submit<G: Gateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> ClientResult<&PredictionResult> {
        // Blank id stays omitted so the gateway assigns one.
        let payload = match normalize_row(&self.draft, None) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "prediction draft failed validation");
                self.result = None;
                self.last_error = Some(e.clone());
                return Err(e);
            }
        };
        match gateway.predict(&payload).await {
            Ok(result) => {
                info!(
                    customer = %result.customer_id,
                    churn = result.is_churn,
                    risk = %result.risk_level,
                    "prediction stored"
                );
                self.last_error = None;
                Ok(self.result.insert(result))
            }
            Err(e) => {
                error!(error = %e, "prediction failed");
                self.result = None;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl Default for PredictForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic risk estimate from a draft's current field values.
///
/// Sums fixed weights for known churn signals, caps the score at 100 and
/// maps it to a band. Returns `None` when a contributing field does not
/// parse, so the hint disappears instead of guessing on bad input.
#[must_use]
pub fn risk_hint(draft: &RowDraft) -> Option<RiskLevel> {
    let satisfaction: u32 = draft.satisfaction_score.trim().parse().ok()?;
    let support_calls: u32 = draft.customer_support_calls.trim().parse().ok()?;
    let last_purchase: u32 = draft.last_purchase_days_ago.trim().parse().ok()?;
    let logins: u32 = draft.monthly_logins.trim().parse().ok()?;
    let spend: f64 = draft.monthly_spend.trim().parse().ok()?;

    let mut score = 0u32;
    if satisfaction <= 2 {
        score += 30;
    }
    if support_calls >= 5 {
        score += 20;
    }
    if last_purchase >= 60 {
        score += 15;
    }
    if logins <= 3 {
        score += 15;
    }
    if draft.contract_type == ContractType::Monthly {
        score += 10;
    }
    if spend < 30.0 {
        score += 10;
    }
    let score = score.min(100);

    Some(if score < 25 {
        RiskLevel::Low
    } else if score < 50 {
        RiskLevel::Medium
    } else if score < 75 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    })
}
