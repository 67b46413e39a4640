//! Fee transaction DTOs

use chrono::{DateTime, Utc};
use paygate_core::models::FeeTransaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee transaction response
#[derive(Debug, Clone, Serialize)]
pub struct FeeTransactionResponse {
    pub id: i64,
    pub merchant_billing_id: i32,
    pub payment_transaction_id: Option<String>,
    pub fee_type: String,
    pub fee_amount: Decimal,
    pub fee_percentage: Option<Decimal>,
    pub fixed_fee: Option<Decimal>,
    pub original_amount: Option<Decimal>,
    pub currency: String,
    pub is_domestic_card: bool,
    pub is_invoiced: bool,
    pub invoice_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<FeeTransaction> for FeeTransactionResponse {
    fn from(fee: FeeTransaction) -> Self {
        Self {
            id: fee.id,
            merchant_billing_id: fee.merchant_billing_id,
            payment_transaction_id: fee.payment_transaction_id,
            fee_type: fee.fee_type.to_string(),
            fee_amount: fee.fee_amount,
            fee_percentage: fee.fee_percentage,
            fixed_fee: fee.fixed_fee,
            original_amount: fee.original_amount,
            currency: fee.currency,
            is_domestic_card: fee.is_domestic_card,
            is_invoiced: fee.is_invoiced,
            invoice_id: fee.invoice_id,
            created_at: fee.created_at,
        }
    }
}

/// Fee transaction list filter parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeFilterParams {
    pub merchant_id: Option<String>,
    pub fee_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
