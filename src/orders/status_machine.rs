use crate::orders::{FulfillmentStatus, PaymentStatus};

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a fulfillment transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Processing, Cancelled
    /// - Processing → Shipped, Cancelled
    /// - Shipped → Delivered
    /// - Delivered, Cancelled → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: FulfillmentStatus, to: FulfillmentStatus) -> bool {
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (FulfillmentStatus::Pending, FulfillmentStatus::Processing)
                | (FulfillmentStatus::Pending, FulfillmentStatus::Cancelled)
                | (FulfillmentStatus::Processing, FulfillmentStatus::Shipped)
                | (FulfillmentStatus::Processing, FulfillmentStatus::Cancelled)
                | (FulfillmentStatus::Shipped, FulfillmentStatus::Delivered)
        )
    }

    /// Attempt to transition from one fulfillment status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: FulfillmentStatus, to: FulfillmentStatus) -> Result<FulfillmentStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }

    /// Check if a payment transition is valid
    ///
    /// Pending settles to paid or failed, a failed payment may still be
    /// collected later, and paid never moves.
    pub fn is_valid_payment_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Failed, PaymentStatus::Paid)
        )
    }

    pub fn payment_transition(from: PaymentStatus, to: PaymentStatus) -> Result<PaymentStatus, String> {
        if Self::is_valid_payment_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid payment status transition from {} to {}", from, to))
        }
    }
}
