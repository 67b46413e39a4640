//! Common traits for repositories
//!
//! Defines abstractions for database access so the billing services can be
//! tested against mock storage.

use crate::error::AppError;
use crate::models::{
    FeeTransaction, FeeType, Invoice, InvoiceItem, InvoiceStatus, MerchantBillingConfig,
    PaymentRef, RevenueSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Merchant billing configuration store
#[async_trait]
pub trait BillingConfigRepository: Send + Sync {
    /// Find a merchant's configuration
    async fn find_by_merchant(
        &self,
        merchant_id: &str,
    ) -> Result<Option<MerchantBillingConfig>, AppError>;

    /// Find a configuration by its row id
    async fn find_by_id(&self, id: i32) -> Result<Option<MerchantBillingConfig>, AppError>;

    /// Look up by merchant id, inserting the default configuration if absent
    ///
    /// Idempotent: concurrent first callers race on the unique merchant_id
    /// constraint and the loser returns the winner's row.
    async fn get_or_create(&self, merchant_id: &str) -> Result<MerchantBillingConfig, AppError>;

    /// Persist an updated configuration
    async fn update(
        &self,
        config: &MerchantBillingConfig,
    ) -> Result<MerchantBillingConfig, AppError>;

    /// All configurations with auto-billing enabled, for the batch sweep
    async fn list_auto_billing(&self) -> Result<Vec<MerchantBillingConfig>, AppError>;
}

/// Fee transaction recorder and reader
#[async_trait]
pub trait FeeTransactionRepository: Send + Sync {
    /// Record a per-payment transaction fee
    ///
    /// Resolves or creates the merchant's billing configuration and inserts
    /// the fee row in one database transaction.
    async fn record_transaction_fee(
        &self,
        payment: &PaymentRef,
        is_domestic_card: bool,
    ) -> Result<FeeTransaction, AppError>;

    /// Record a flat chargeback fee
    async fn record_chargeback_fee(&self, payment: &PaymentRef)
        -> Result<FeeTransaction, AppError>;

    /// Record a flat refund fee
    async fn record_refund_fee(&self, payment: &PaymentRef) -> Result<FeeTransaction, AppError>;

    /// Un-invoiced fee transactions for a configuration within a period
    async fn list_uninvoiced(
        &self,
        merchant_billing_id: i32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Vec<FeeTransaction>, AppError>;

    /// Fee transactions with optional filters, newest first
    async fn list_filtered(
        &self,
        merchant_billing_id: Option<i32>,
        fee_type: Option<FeeType>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FeeTransaction>, i64), AppError>;

    /// Aggregate fee revenue over a period, irrespective of invoiced status
    ///
    /// `merchant_billing_id = None` aggregates across all merchants and
    /// fills in the distinct active-merchant count.
    async fn summarize(
        &self,
        merchant_billing_id: Option<i32>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<RevenueSummary, AppError>;
}

/// Invoice store
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find an invoice by its row id
    async fn find_by_id(&self, id: i64) -> Result<Option<Invoice>, AppError>;

    /// Find an invoice by its generated number
    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError>;

    /// Line items of an invoice
    async fn items(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>, AppError>;

    /// Invoices for a configuration, newest first, with optional status filter
    async fn list_for_config(
        &self,
        merchant_billing_id: i32,
        status: Option<InvoiceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Invoice>, i64), AppError>;

    /// Insert an invoice with its items and latch the swept fee transactions
    ///
    /// All-or-nothing: the invoice insert, item inserts, and the
    /// `is_invoiced` update run in one database transaction. The update only
    /// touches rows still un-invoiced; if any requested row was already
    /// swept the whole operation aborts with a conflict.
    async fn create_with_items(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
        fee_transaction_ids: &[i64],
    ) -> Result<Invoice, AppError>;

    /// Transition an invoice to paid, recording reference and method
    async fn mark_paid(
        &self,
        id: i64,
        payment_reference: Option<&str>,
        payment_method: Option<&str>,
    ) -> Result<Invoice, AppError>;
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(100, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }
}
