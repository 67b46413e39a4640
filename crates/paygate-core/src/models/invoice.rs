//! Invoice and invoice item models
//!
//! An invoice aggregates one merchant's un-invoiced fee transactions over a
//! billing period into grouped line items. Line items are immutable children
//! created atomically with the invoice.

use crate::models::fee::FeeType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Invoice status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Issued, awaiting payment
    #[default]
    Pending,
    /// Settled (terminal)
    Paid,
    /// Past its due date, still payable
    Overdue,
    /// Voided (terminal)
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl InvoiceStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transitions are allowed from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Whether a transition to `next` is allowed
    ///
    /// Pending moves to paid, overdue, or cancelled; overdue invoices can
    /// still be paid or cancelled. Paid and cancelled are terminal.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        match self {
            InvoiceStatus::Pending => matches!(
                next,
                InvoiceStatus::Paid | InvoiceStatus::Overdue | InvoiceStatus::Cancelled
            ),
            InvoiceStatus::Overdue => {
                matches!(next, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
            }
            InvoiceStatus::Paid | InvoiceStatus::Cancelled => false,
        }
    }
}

/// Invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: i64,

    /// Generated invoice number, format `INV-<YYYYMMDD>-<8 upper alnum>`
    pub invoice_number: String,

    /// Owning merchant billing configuration
    pub merchant_billing_id: i32,

    /// Billing period start
    pub billing_period_start: DateTime<Utc>,

    /// Billing period end
    pub billing_period_end: DateTime<Utc>,

    /// Sum of all line item totals
    pub subtotal: Decimal,

    /// Tax applied on the subtotal (currently always 0)
    pub tax_amount: Decimal,

    /// subtotal + tax_amount
    pub total_amount: Decimal,

    /// Lifecycle status
    pub status: InvoiceStatus,

    /// Issue date
    pub issued_date: DateTime<Utc>,

    /// Payment due date (issue date + payment terms)
    pub due_date: Option<DateTime<Utc>>,

    /// Settlement date, once paid
    pub paid_date: Option<DateTime<Utc>>,

    /// External payment reference, once paid
    pub payment_reference: Option<String>,

    /// Payment method used to settle
    pub payment_method: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Invoice line item entity
///
/// One aggregated line per (fee kind, card class) group of the swept fee
/// transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Unique identifier
    pub id: i64,

    /// Owning invoice
    pub invoice_id: i64,

    /// Human-readable description, e.g. "Domestic Card Transaction Fees (3 transactions)"
    pub description: String,

    /// Fee kind of the underlying group
    pub fee_type: FeeType,

    /// Number of fee transactions in the group
    pub quantity: i32,

    /// Group sum / quantity, rounded to 2 decimal places
    pub unit_price: Decimal,

    /// Group sum
    pub total_price: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Overdue));
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Cancelled));
        assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Paid));

        // Paid and cancelled are terminal
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Pending));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Overdue));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Paid));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(InvoiceStatus::Paid.is_terminal());
        assert!(InvoiceStatus::Cancelled.is_terminal());
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(!InvoiceStatus::Overdue.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(InvoiceStatus::from_str("pending"), Some(InvoiceStatus::Pending));
        assert_eq!(InvoiceStatus::from_str("PAID"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::from_str("refunded"), None);
    }
}
