//! Fee transaction model
//!
//! One row per monetary fee charged to a merchant for one payment event.
//! Rows are immutable after insert except for the invoiced latch, which is
//! set exactly once when the fee is swept into an invoice.

use crate::models::billing_config::{calculate_fee, MerchantBillingConfig};
use crate::models::payment::PaymentRef;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    /// Per-payment processing fee (percentage + fixed, by card class)
    TransactionFee,
    /// Flat fee charged when a payment is charged back
    ChargebackFee,
    /// Flat fee charged when a payment is refunded
    RefundFee,
    /// Recurring account fee
    MonthlyFee,
    /// One-time onboarding fee
    SetupFee,
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeType::TransactionFee => write!(f, "transaction_fee"),
            FeeType::ChargebackFee => write!(f, "chargeback_fee"),
            FeeType::RefundFee => write!(f, "refund_fee"),
            FeeType::MonthlyFee => write!(f, "monthly_fee"),
            FeeType::SetupFee => write!(f, "setup_fee"),
        }
    }
}

impl FeeType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "transaction_fee" => Some(FeeType::TransactionFee),
            "chargeback_fee" => Some(FeeType::ChargebackFee),
            "refund_fee" => Some(FeeType::RefundFee),
            "monthly_fee" => Some(FeeType::MonthlyFee),
            "setup_fee" => Some(FeeType::SetupFee),
            _ => None,
        }
    }

    /// Invoice line description for a group of fees of this kind
    pub fn group_description(&self) -> &'static str {
        match self {
            FeeType::TransactionFee => "Transaction Fees",
            FeeType::ChargebackFee => "Chargeback Fees",
            FeeType::RefundFee => "Refund Fees",
            FeeType::MonthlyFee => "Monthly Fees",
            FeeType::SetupFee => "Setup Fees",
        }
    }
}

/// Fee transaction entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeTransaction {
    /// Unique identifier
    pub id: i64,

    /// Owning merchant billing configuration
    pub merchant_billing_id: i32,

    /// Originating payment transaction id (external `payments` table)
    pub payment_transaction_id: Option<String>,

    /// Fee kind
    pub fee_type: FeeType,

    /// Computed fee amount (2 decimal places)
    pub fee_amount: Decimal,

    /// Percentage component used, when applicable
    pub fee_percentage: Option<Decimal>,

    /// Fixed component used, when applicable
    pub fixed_fee: Option<Decimal>,

    /// Original payment amount
    pub original_amount: Option<Decimal>,

    /// ISO 4217 currency code
    pub currency: String,

    /// Card origin class for transaction fees
    pub is_domestic_card: bool,

    /// One-way latch: set when the row is swept into an invoice
    pub is_invoiced: bool,

    /// Owning invoice, once swept
    pub invoice_id: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl FeeTransaction {
    /// Build an unsaved per-payment transaction fee for a merchant
    ///
    /// The fee amount and the components recorded alongside it come from the
    /// merchant's configured schedule for the given card class.
    pub fn transaction_fee(
        config: &MerchantBillingConfig,
        payment: &PaymentRef,
        is_domestic_card: bool,
    ) -> Self {
        let schedule = config.fee_schedule(is_domestic_card);
        let fee_amount = calculate_fee(payment.amount, is_domestic_card, Some(config));

        Self {
            id: 0,
            merchant_billing_id: config.id,
            payment_transaction_id: Some(payment.transaction_id.clone()),
            fee_type: FeeType::TransactionFee,
            fee_amount,
            fee_percentage: Some(schedule.percentage),
            fixed_fee: Some(schedule.fixed_fee),
            original_amount: Some(payment.amount),
            currency: payment.currency.clone(),
            is_domestic_card,
            is_invoiced: false,
            invoice_id: None,
            created_at: Utc::now(),
        }
    }

    /// Build an unsaved flat chargeback fee
    pub fn chargeback_fee(config: &MerchantBillingConfig, payment: &PaymentRef) -> Self {
        Self::flat_fee(config, payment, FeeType::ChargebackFee, config.chargeback_fee)
    }

    /// Build an unsaved flat refund fee
    pub fn refund_fee(config: &MerchantBillingConfig, payment: &PaymentRef) -> Self {
        Self::flat_fee(config, payment, FeeType::RefundFee, config.refund_fee)
    }

    fn flat_fee(
        config: &MerchantBillingConfig,
        payment: &PaymentRef,
        fee_type: FeeType,
        fee_amount: Decimal,
    ) -> Self {
        Self {
            id: 0,
            merchant_billing_id: config.id,
            payment_transaction_id: Some(payment.transaction_id.clone()),
            fee_type,
            fee_amount,
            fee_percentage: None,
            fixed_fee: None,
            original_amount: Some(payment.amount),
            currency: payment.currency.clone(),
            is_domestic_card: true,
            is_invoiced: false,
            invoice_id: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> MerchantBillingConfig {
        let mut c = MerchantBillingConfig::new_default("MRC001");
        c.id = 7;
        c
    }

    fn payment() -> PaymentRef {
        PaymentRef::new("TXN-1", "MRC001", dec!(100.00), "EUR")
    }

    #[test]
    fn test_transaction_fee_captures_components() {
        let fee = FeeTransaction::transaction_fee(&config(), &payment(), true);
        assert_eq!(fee.merchant_billing_id, 7);
        assert_eq!(fee.fee_type, FeeType::TransactionFee);
        assert_eq!(fee.fee_amount, dec!(0.60));
        assert_eq!(fee.fee_percentage, Some(dec!(0.5)));
        assert_eq!(fee.fixed_fee, Some(dec!(0.10)));
        assert_eq!(fee.original_amount, Some(dec!(100.00)));
        assert!(fee.is_domestic_card);
        assert!(!fee.is_invoiced);
        assert!(fee.invoice_id.is_none());
    }

    #[test]
    fn test_foreign_transaction_fee() {
        let fee = FeeTransaction::transaction_fee(&config(), &payment(), false);
        assert_eq!(fee.fee_amount, dec!(2.60));
        assert_eq!(fee.fee_percentage, Some(dec!(2.4)));
        assert!(!fee.is_domestic_card);
    }

    #[test]
    fn test_flat_fees_use_configured_amounts() {
        let chargeback = FeeTransaction::chargeback_fee(&config(), &payment());
        assert_eq!(chargeback.fee_type, FeeType::ChargebackFee);
        assert_eq!(chargeback.fee_amount, dec!(9.00));
        assert!(chargeback.fee_percentage.is_none());

        let refund = FeeTransaction::refund_fee(&config(), &payment());
        assert_eq!(refund.fee_type, FeeType::RefundFee);
        assert_eq!(refund.fee_amount, dec!(0.05));
    }

    #[test]
    fn test_fee_type_roundtrip() {
        assert_eq!(FeeType::from_str("transaction_fee"), Some(FeeType::TransactionFee));
        assert_eq!(FeeType::from_str("CHARGEBACK_FEE"), Some(FeeType::ChargebackFee));
        assert_eq!(FeeType::from_str("unknown"), None);
        assert_eq!(FeeType::RefundFee.to_string(), "refund_fee");
    }
}
