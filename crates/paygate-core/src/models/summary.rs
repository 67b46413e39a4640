//! Revenue summary model
//!
//! Aggregation of fee transactions over a period, per-merchant or
//! system-wide. Summaries read every fee row in the period regardless of its
//! invoiced status; they bypass invoices entirely.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Revenue summary over a billing period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Sum of all fee amounts in the period
    pub total_revenue: Decimal,

    /// Revenue from per-payment transaction fees
    pub transaction_fees: Decimal,

    /// Revenue from chargeback fees
    pub chargeback_fees: Decimal,

    /// Revenue from refund fees
    pub refund_fees: Decimal,

    /// Number of transaction-fee records in the period
    pub transaction_count: i64,

    /// Transaction fees on domestic (European) cards
    pub domestic_transactions: i64,

    /// Transaction fees on foreign (non-European) cards
    pub foreign_transactions: i64,

    /// Distinct merchants with activity (all-merchants variant only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_merchants: Option<i64>,

    /// Period start
    pub period_start: DateTime<Utc>,

    /// Period end
    pub period_end: DateTime<Utc>,
}

impl RevenueSummary {
    /// An empty summary for a period with no activity
    pub fn empty(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            total_revenue: Decimal::ZERO,
            transaction_fees: Decimal::ZERO,
            chargeback_fees: Decimal::ZERO,
            refund_fees: Decimal::ZERO,
            transaction_count: 0,
            domestic_transactions: 0,
            foreign_transactions: 0,
            active_merchants: None,
            period_start,
            period_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let now = Utc::now();
        let summary = RevenueSummary::empty(now, now);
        assert_eq!(summary.total_revenue, Decimal::ZERO);
        assert_eq!(summary.transaction_count, 0);
        assert!(summary.active_merchants.is_none());
    }
}
