//! Customer detail inspector.
//!
//! Loads one customer's latest prediction and probability timeline. A
//! missing customer is an explicit [`InspectorState::NotFound`], never a
//! blank screen.

use tracing::{debug, warn};

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::model::CustomerDetail;

/// What the inspector currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InspectorState {
    /// No customer requested yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The customer's detail is available.
    Loaded(CustomerDetail),
    /// The requested customer does not exist.
    NotFound {
        /// The id that was requested.
        customer_id: String,
    },
    /// The fetch failed for another reason.
    Error(String),
}

/// Inspector for one customer's detail view.
#[derive(Debug, Default)]
pub struct CustomerInspector {
    state: InspectorState,
}

impl CustomerInspector {
    /// Creates an idle inspector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &InspectorState {
        &self.state
    }

    /// The loaded detail, when in the loaded state.
    #[must_use]
    pub fn detail(&self) -> Option<&CustomerDetail> {
        match &self.state {
            InspectorState::Loaded(detail) => Some(detail),
            _ => None,
        }
    }

    /// Fetches `customer_id`'s detail and timeline.
    ///
    /// The resulting state is `Loaded`, `NotFound` (from the gateway's
    /// typed 404) or `Error`; the caller renders whichever lands.
    pub async fn load<G: Gateway + ?Sized>(&mut self, gateway: &G, customer_id: &str) {
        self.state = InspectorState::Loading;
        debug!(customer = customer_id, "loading customer detail");
        self.state = match gateway.customer_detail(customer_id).await {
            Ok(detail) => InspectorState::Loaded(detail),
            Err(ClientError::NotFound { .. }) => {
                warn!(customer = customer_id, "customer not found");
                InspectorState::NotFound {
                    customer_id: customer_id.to_string(),
                }
            }
            Err(e) => {
                warn!(customer = customer_id, error = %e, "customer detail fetch failed");
                InspectorState::Error(e.to_string())
            }
        };
    }

    /// Clears the inspector back to idle.
    pub fn clear(&mut self) {
        self.state = InspectorState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_detail, MockGateway};

    #[tokio::test]
    async fn test_load_success() {
        let gateway = MockGateway::new();
        gateway.queue_detail(Ok(mock_detail("CUST-007")));

        let mut inspector = CustomerInspector::new();
        inspector.load(&gateway, "CUST-007").await;

        let detail = inspector.detail().unwrap();
        assert_eq!(detail.customer_id, "CUST-007");
        // Timeline stays in server order.
        let probs: Vec<f64> = detail.progress.iter().map(|p| p.churn_probability).collect();
        assert_eq!(probs, vec![0.35, 0.52, 0.73]);
    }

    #[tokio::test]
    async fn test_load_missing_customer_is_explicit_not_found() {
        let gateway = MockGateway::new();
        gateway.queue_detail(Err(ClientError::NotFound {
            resource: "customer 'CUST-999'".into(),
        }));

        let mut inspector = CustomerInspector::new();
        inspector.load(&gateway, "CUST-999").await;

        assert_eq!(
            inspector.state(),
            &InspectorState::NotFound {
                customer_id: "CUST-999".into()
            }
        );
        assert!(inspector.detail().is_none());
    }

    #[tokio::test]
    async fn test_load_transport_failure_is_error_state() {
        let gateway = MockGateway::new();
        gateway.queue_detail(Err(ClientError::ConnectionFailed("refused".into())));

        let mut inspector = CustomerInspector::new();
        inspector.load(&gateway, "CUST-001").await;

        match inspector.state() {
            InspectorState::Error(message) => assert!(message.contains("refused")),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_returns_to_idle() {
        let gateway = MockGateway::new();
        gateway.queue_detail(Ok(mock_detail("CUST-001")));

        let mut inspector = CustomerInspector::new();
        inspector.load(&gateway, "CUST-001").await;
        inspector.clear();
        assert_eq!(inspector.state(), &InspectorState::Idle);
    }
}
