//! Invoice repository
//!
//! PostgreSQL-backed store for invoices and their line items. Invoice
//! creation is the "sweep": the invoice insert, the item inserts, and the
//! marking of the swept fee transactions commit as one database
//! transaction, so a failure at any step leaves no partial invoice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate_core::{
    models::{FeeType, Invoice, InvoiceItem, InvoiceStatus},
    traits::InvoiceRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, merchant_billing_id,
    billing_period_start, billing_period_end,
    subtotal, tax_amount, total_amount,
    status, issued_date, due_date, paid_date,
    payment_reference, payment_method, notes,
    created_at, updated_at
"#;

/// PostgreSQL implementation of `InvoiceRepository`
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Invoice>> {
        debug!("Finding invoice by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding invoice {}: {}", id, e);
            AppError::Database(format!("Failed to find invoice: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>> {
        let result = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE invoice_number = $1",
            INVOICE_COLUMNS
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding invoice {}: {}", invoice_number, e);
            AppError::Database(format!("Failed to find invoice: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn items(&self, invoice_id: i64) -> AppResult<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<sqlx::Postgres, InvoiceItemRow>(
            r#"
            SELECT id, invoice_id, description, fee_type,
                   quantity, unit_price, total_price, created_at
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing items for invoice {}: {}", invoice_id, e);
            AppError::Database(format!("Failed to list invoice items: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_for_config(
        &self,
        merchant_billing_id: i32,
        status: Option<InvoiceStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Invoice>, i64)> {
        debug!(
            "Listing invoices for config {} (status {:?})",
            merchant_billing_id, status
        );

        let status_str = status.map(|s| s.to_string());

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE merchant_billing_id = $1
                AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(merchant_billing_id)
        .bind(&status_str)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting invoices: {}", e);
            AppError::Database(format!("Failed to count invoices: {}", e))
        })?;

        let rows = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE merchant_billing_id = $1
                AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            INVOICE_COLUMNS
        ))
        .bind(merchant_billing_id)
        .bind(&status_str)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing invoices: {}", e);
            AppError::Database(format!("Failed to list invoices: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self, invoice, items, fee_transaction_ids))]
    async fn create_with_items(
        &self,
        invoice: &Invoice,
        items: &[InvoiceItem],
        fee_transaction_ids: &[i64],
    ) -> AppResult<Invoice> {
        debug!(
            "Creating invoice {} with {} items sweeping {} fee transactions",
            invoice.invoice_number,
            items.len(),
            fee_transaction_ids.len()
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let created = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_number, merchant_billing_id,
                billing_period_start, billing_period_end,
                subtotal, tax_amount, total_amount,
                status, issued_date, due_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(&invoice.invoice_number)
        .bind(invoice.merchant_billing_id)
        .bind(invoice.billing_period_start)
        .bind(invoice.billing_period_end)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total_amount)
        .bind(invoice.status.to_string())
        .bind(invoice.issued_date)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating invoice {}: {}", invoice.invoice_number, e);
            AppError::Database(format!("Failed to create invoice: {}", e))
        })?;

        let invoice_id = created.id;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    invoice_id, description, fee_type,
                    quantity, unit_price, total_price
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(invoice_id)
            .bind(&item.description)
            .bind(item.fee_type.to_string())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error creating invoice item: {}", e);
                AppError::Database(format!("Failed to create invoice item: {}", e))
            })?;
        }

        // One-way latch: only rows still un-invoiced are swept. If a racing
        // generator already claimed any of them, the count mismatch aborts
        // the whole transaction and nothing is double-invoiced.
        let marked = sqlx::query(
            r#"
            UPDATE fee_transactions
            SET is_invoiced = TRUE, invoice_id = $1
            WHERE id = ANY($2)
                AND is_invoiced = FALSE
            "#,
        )
        .bind(invoice_id)
        .bind(fee_transaction_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error marking fee transactions invoiced: {}", e);
            AppError::Database(format!("Failed to mark fee transactions: {}", e))
        })?;

        if marked.rows_affected() != fee_transaction_ids.len() as u64 {
            error!(
                "Sweep conflict for invoice {}: expected {} fee transactions, marked {}",
                invoice.invoice_number,
                fee_transaction_ids.len(),
                marked.rows_affected()
            );
            return Err(AppError::Conflict(format!(
                "{} fee transactions were already invoiced",
                fee_transaction_ids.len() as u64 - marked.rows_affected()
            )));
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Created invoice {} ({} items, total {})",
            created.invoice_number,
            items.len(),
            created.total_amount
        );

        Ok(created.into())
    }

    #[instrument(skip(self))]
    async fn mark_paid(
        &self,
        id: i64,
        payment_reference: Option<&str>,
        payment_method: Option<&str>,
    ) -> AppResult<Invoice> {
        let invoice = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(id.to_string()))?;

        if !invoice.status.can_transition_to(InvoiceStatus::Paid) {
            return Err(AppError::InvalidStatusTransition {
                from: invoice.status.to_string(),
                to: InvoiceStatus::Paid.to_string(),
            });
        }

        let row = sqlx::query_as::<sqlx::Postgres, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = 'paid',
                paid_date = NOW(),
                payment_reference = $2,
                payment_method = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(payment_reference)
        .bind(payment_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error marking invoice {} paid: {}", id, e);
            AppError::Database(format!("Failed to mark invoice paid: {}", e))
        })?;

        info!("Invoice {} marked as paid", row.invoice_number);
        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    invoice_number: String,
    merchant_billing_id: i32,
    billing_period_start: DateTime<Utc>,
    billing_period_end: DateTime<Utc>,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    status: String,
    issued_date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    paid_date: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    payment_method: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Self {
            id: row.id,
            invoice_number: row.invoice_number,
            merchant_billing_id: row.merchant_billing_id,
            billing_period_start: row.billing_period_start,
            billing_period_end: row.billing_period_end,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            // Schema CHECK constraint keeps the column in the known set
            status: InvoiceStatus::from_str(&row.status).unwrap_or_default(),
            issued_date: row.issued_date,
            due_date: row.due_date,
            paid_date: row.paid_date,
            payment_reference: row.payment_reference,
            payment_method: row.payment_method,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping invoice item rows
#[derive(Debug, sqlx::FromRow)]
struct InvoiceItemRow {
    id: i64,
    invoice_id: i64,
    description: String,
    fee_type: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<InvoiceItemRow> for InvoiceItem {
    fn from(row: InvoiceItemRow) -> Self {
        Self {
            id: row.id,
            invoice_id: row.invoice_id,
            description: row.description,
            fee_type: FeeType::from_str(&row.fee_type).unwrap_or(FeeType::TransactionFee),
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_core::{
        models::PaymentRef,
        traits::{BillingConfigRepository, FeeTransactionRepository},
    };
    use rust_decimal_macros::dec;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_swept_fees_cannot_be_invoiced_twice() {
        let pool = crate::create_pool(&crate::pool::test_database_config())
            .await
            .unwrap();

        let config_repo = super::super::PgBillingConfigRepository::new(pool.clone());
        let fee_repo = super::super::PgFeeTransactionRepository::new(pool.clone());
        let invoice_repo = PgInvoiceRepository::new(pool);

        let config = config_repo.get_or_create("MRC-SWEEP-ONCE").await.unwrap();
        let payment = PaymentRef::new("TXN-SWEEP-ONCE", "MRC-SWEEP-ONCE", dec!(100.00), "EUR");
        let fee = fee_repo.record_transaction_fee(&payment, true).await.unwrap();

        let now = Utc::now();
        let invoice = Invoice {
            id: 0,
            invoice_number: format!("INV-TEST-{}", now.timestamp_nanos_opt().unwrap_or(0)),
            merchant_billing_id: config.id,
            billing_period_start: now - chrono::Duration::days(1),
            billing_period_end: now,
            subtotal: fee.fee_amount,
            tax_amount: Decimal::ZERO,
            total_amount: fee.fee_amount,
            status: InvoiceStatus::Pending,
            issued_date: now,
            due_date: Some(now + chrono::Duration::days(30)),
            paid_date: None,
            payment_reference: None,
            payment_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let item = InvoiceItem {
            id: 0,
            invoice_id: 0,
            description: "Domestic Card Transaction Fees (1 transactions)".to_string(),
            fee_type: FeeType::TransactionFee,
            quantity: 1,
            unit_price: fee.fee_amount,
            total_price: fee.fee_amount,
            created_at: now,
        };

        let created = invoice_repo
            .create_with_items(&invoice, std::slice::from_ref(&item), &[fee.id])
            .await
            .unwrap();
        assert!(created.id > 0);

        // The same fee ids are already latched; a second sweep must refuse.
        let mut second = invoice.clone();
        second.invoice_number = format!("{}-B", invoice.invoice_number);
        let err = invoice_repo
            .create_with_items(&second, std::slice::from_ref(&item), &[fee.id])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
