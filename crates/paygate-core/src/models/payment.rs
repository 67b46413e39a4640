//! Payment reference
//!
//! The `payments` table is owned by the gateway's payment processor, not by
//! the billing core. Fee recording only needs this projection of a payment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The slice of a payment transaction the billing core cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRef {
    /// Payment transaction id (foreign key into the external `payments` table)
    pub transaction_id: String,

    /// Merchant the payment belongs to
    pub merchant_id: String,

    /// Original payment amount
    pub amount: Decimal,

    /// ISO 4217 currency code
    pub currency: String,
}

impl PaymentRef {
    /// Convenience constructor
    pub fn new(
        transaction_id: impl Into<String>,
        merchant_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            merchant_id: merchant_id.into(),
            amount,
            currency: currency.into(),
        }
    }
}
