use async_trait::async_trait;

use crate::checkout::signature::SignatureError;
use crate::checkout::{CheckoutSession, GatewayEvent, SessionRequest, SessionStatus};

/// Failures talking to the payment provider
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("webhook signature rejected: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("payment provider request timed out")]
    Timeout,

    #[error("payment provider error: {0}")]
    Upstream(String),

    #[error("payment provider sent an unreadable payload: {0}")]
    Malformed(String),
}

/// Hosted-checkout payment provider
///
/// Implementations hold their own credentials and webhook secret.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session
    async fn create_session(&self, request: &SessionRequest) -> Result<CheckoutSession, GatewayError>;

    /// Authenticate a webhook body against its signature header and decode it
    ///
    /// `raw_body` must be the bytes exactly as received.
    fn verify_event(&self, raw_body: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError>;

    /// Provider's current view of a session
    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError>;
}
