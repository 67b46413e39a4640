//! Invoice DTOs

use chrono::{DateTime, Utc};
use paygate_core::models::{Invoice, InvoiceItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice list entry
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummaryResponse {
    pub id: i64,
    pub invoice_number: String,
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub issued_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
}

impl From<Invoice> for InvoiceSummaryResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            billing_period_start: invoice.billing_period_start,
            billing_period_end: invoice.billing_period_end,
            subtotal: invoice.subtotal,
            tax_amount: invoice.tax_amount,
            total_amount: invoice.total_amount,
            status: invoice.status.to_string(),
            issued_date: invoice.issued_date,
            due_date: invoice.due_date,
            paid_date: invoice.paid_date,
            payment_reference: invoice.payment_reference,
            payment_method: invoice.payment_method,
        }
    }
}

/// Invoice line item response
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceItemResponse {
    pub id: i64,
    pub description: String,
    pub fee_type: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<InvoiceItem> for InvoiceItemResponse {
    fn from(item: InvoiceItem) -> Self {
        Self {
            id: item.id,
            description: item.description,
            fee_type: item.fee_type.to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

/// Full invoice with line items
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetailResponse {
    pub id: i64,
    pub invoice_number: String,
    pub merchant_billing_id: i32,
    pub billing_period_start: DateTime<Utc>,
    pub billing_period_end: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub issued_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItemResponse>,
}

impl InvoiceDetailResponse {
    /// Build from an invoice and its items
    pub fn new(invoice: Invoice, items: Vec<InvoiceItem>) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            merchant_billing_id: invoice.merchant_billing_id,
            billing_period_start: invoice.billing_period_start,
            billing_period_end: invoice.billing_period_end,
            subtotal: invoice.subtotal,
            tax_amount: invoice.tax_amount,
            total_amount: invoice.total_amount,
            status: invoice.status.to_string(),
            issued_date: invoice.issued_date,
            due_date: invoice.due_date,
            paid_date: invoice.paid_date,
            payment_reference: invoice.payment_reference,
            payment_method: invoice.payment_method,
            notes: invoice.notes,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Invoice list filter parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilterParams {
    /// Optional status filter (pending, paid, overdue, cancelled)
    pub status: Option<String>,
}

/// Mark-paid request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayInvoiceRequest {
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
}

/// Manual invoice generation request
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateInvoiceRequest {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

/// Response for a freshly generated invoice
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedInvoiceResponse {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub total_amount: Decimal,
}

impl From<Invoice> for GeneratedInvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            total_amount: invoice.total_amount,
        }
    }
}

/// Automatic billing sweep result
#[derive(Debug, Clone, Serialize)]
pub struct AutoBillingResponse {
    pub invoices_generated: usize,
    pub invoices: Vec<GeneratedInvoiceResponse>,
}
