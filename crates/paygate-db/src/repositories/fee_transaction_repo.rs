//! Fee transaction repository
//!
//! Records one fee row per billable payment event and reads them back for
//! invoicing and revenue reporting. Recording resolves (or lazily creates)
//! the merchant's billing configuration and inserts the fee row inside one
//! database transaction, so a persistence failure rolls back both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate_core::{
    models::{FeeTransaction, FeeType, MerchantBillingConfig, PaymentRef, RevenueSummary},
    traits::FeeTransactionRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::billing_config_repo::{BillingConfigRow, CONFIG_COLUMNS};
use tracing::{debug, error, instrument};

const FEE_COLUMNS: &str = r#"
    id, merchant_billing_id, payment_transaction_id,
    fee_type, fee_amount, fee_percentage, fixed_fee,
    original_amount, currency, is_domestic_card,
    is_invoiced, invoice_id, created_at
"#;

/// PostgreSQL implementation of `FeeTransactionRepository`
pub struct PgFeeTransactionRepository {
    pool: PgPool,
}

impl PgFeeTransactionRepository {
    /// Create a new fee transaction repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve or create the merchant's billing configuration inside `conn`
    ///
    /// Runs within the caller's transaction so that config creation and the
    /// subsequent fee insert commit or roll back as one unit.
    async fn config_in_tx(
        conn: &mut PgConnection,
        merchant_id: &str,
    ) -> AppResult<MerchantBillingConfig> {
        let existing = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(
            &format!(
                "SELECT {} FROM merchant_billing WHERE merchant_id = $1",
                CONFIG_COLUMNS
            ),
        )
        .bind(merchant_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            error!("Database error finding config for {}: {}", merchant_id, e);
            AppError::Database(format!("Failed to find billing config: {}", e))
        })?;

        if let Some(row) = existing {
            return Ok(row.into());
        }

        debug!("Creating default billing config for merchant {}", merchant_id);
        let defaults = MerchantBillingConfig::new_default(merchant_id);

        let inserted = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(
            &format!(
                r#"
                INSERT INTO merchant_billing (
                    merchant_id,
                    domestic_card_percentage, domestic_card_fixed_fee,
                    foreign_card_percentage, foreign_card_fixed_fee,
                    chargeback_fee, refund_fee,
                    billing_cycle, billing_day, auto_billing_enabled,
                    billing_email
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (merchant_id) DO NOTHING
                RETURNING {}
                "#,
                CONFIG_COLUMNS
            ),
        )
        .bind(merchant_id)
        .bind(defaults.domestic_card_percentage)
        .bind(defaults.domestic_card_fixed_fee)
        .bind(defaults.foreign_card_percentage)
        .bind(defaults.foreign_card_fixed_fee)
        .bind(defaults.chargeback_fee)
        .bind(defaults.refund_fee)
        .bind(defaults.billing_cycle.to_string())
        .bind(defaults.billing_day)
        .bind(defaults.auto_billing_enabled)
        .bind(&defaults.billing_email)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            error!("Database error creating config for {}: {}", merchant_id, e);
            AppError::Database(format!("Failed to create billing config: {}", e))
        })?;

        match inserted {
            Some(row) => Ok(row.into()),
            // A concurrent writer won the unique-constraint race; take its row.
            None => sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(
                &format!(
                    "SELECT {} FROM merchant_billing WHERE merchant_id = $1",
                    CONFIG_COLUMNS
                ),
            )
            .bind(merchant_id)
            .fetch_one(&mut *conn)
            .await
            .map(Into::into)
            .map_err(|e| {
                error!("Database error re-fetching config for {}: {}", merchant_id, e);
                AppError::Database(format!("Failed to fetch billing config: {}", e))
            }),
        }
    }

    /// Record a fee built from the merchant's configuration
    async fn record(
        &self,
        payment: &PaymentRef,
        build: impl FnOnce(&MerchantBillingConfig) -> FeeTransaction + Send,
    ) -> AppResult<FeeTransaction> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let config = Self::config_in_tx(&mut tx, &payment.merchant_id).await?;
        let fee = build(&config);

        let row = sqlx::query_as::<sqlx::Postgres, FeeTransactionRow>(&format!(
            r#"
            INSERT INTO fee_transactions (
                merchant_billing_id, payment_transaction_id,
                fee_type, fee_amount, fee_percentage, fixed_fee,
                original_amount, currency, is_domestic_card
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FEE_COLUMNS
        ))
        .bind(fee.merchant_billing_id)
        .bind(&fee.payment_transaction_id)
        .bind(fee.fee_type.to_string())
        .bind(fee.fee_amount)
        .bind(fee.fee_percentage)
        .bind(fee.fixed_fee)
        .bind(fee.original_amount)
        .bind(&fee.currency)
        .bind(fee.is_domestic_card)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!(
                "Database error recording {} for payment {}: {}",
                fee.fee_type, payment.transaction_id, e
            );
            AppError::Database(format!("Failed to record fee transaction: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl FeeTransactionRepository for PgFeeTransactionRepository {
    #[instrument(skip(self, payment), fields(payment_id = %payment.transaction_id))]
    async fn record_transaction_fee(
        &self,
        payment: &PaymentRef,
        is_domestic_card: bool,
    ) -> AppResult<FeeTransaction> {
        debug!(
            "Recording transaction fee for payment {} (domestic: {})",
            payment.transaction_id, is_domestic_card
        );
        self.record(payment, |config| {
            FeeTransaction::transaction_fee(config, payment, is_domestic_card)
        })
        .await
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.transaction_id))]
    async fn record_chargeback_fee(&self, payment: &PaymentRef) -> AppResult<FeeTransaction> {
        debug!("Recording chargeback fee for payment {}", payment.transaction_id);
        self.record(payment, |config| {
            FeeTransaction::chargeback_fee(config, payment)
        })
        .await
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.transaction_id))]
    async fn record_refund_fee(&self, payment: &PaymentRef) -> AppResult<FeeTransaction> {
        debug!("Recording refund fee for payment {}", payment.transaction_id);
        self.record(payment, |config| FeeTransaction::refund_fee(config, payment))
            .await
    }

    #[instrument(skip(self))]
    async fn list_uninvoiced(
        &self,
        merchant_billing_id: i32,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> AppResult<Vec<FeeTransaction>> {
        debug!(
            "Listing un-invoiced fees for config {} in [{}, {}]",
            merchant_billing_id, period_start, period_end
        );

        let rows = sqlx::query_as::<sqlx::Postgres, FeeTransactionRow>(&format!(
            r#"
            SELECT {}
            FROM fee_transactions
            WHERE merchant_billing_id = $1
                AND created_at >= $2
                AND created_at <= $3
                AND is_invoiced = FALSE
            ORDER BY created_at
            "#,
            FEE_COLUMNS
        ))
        .bind(merchant_billing_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing un-invoiced fees: {}", e);
            AppError::Database(format!("Failed to list fee transactions: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_filtered(
        &self,
        merchant_billing_id: Option<i32>,
        fee_type: Option<FeeType>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<FeeTransaction>, i64)> {
        let fee_type_str = fee_type.map(|t| t.to_string());

        let where_clause = r#"
            WHERE ($1::int4 IS NULL OR merchant_billing_id = $1)
                AND ($2::text IS NULL OR fee_type = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at <= $4)
        "#;

        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM fee_transactions {}",
            where_clause
        ))
        .bind(merchant_billing_id)
        .bind(&fee_type_str)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting fee transactions: {}", e);
            AppError::Database(format!("Failed to count fee transactions: {}", e))
        })?;

        let rows = sqlx::query_as::<sqlx::Postgres, FeeTransactionRow>(&format!(
            r#"
            SELECT {}
            FROM fee_transactions
            {}
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            FEE_COLUMNS, where_clause
        ))
        .bind(merchant_billing_id)
        .bind(&fee_type_str)
        .bind(start_date)
        .bind(end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing fee transactions: {}", e);
            AppError::Database(format!("Failed to list fee transactions: {}", e))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn summarize(
        &self,
        merchant_billing_id: Option<i32>,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> AppResult<RevenueSummary> {
        debug!(
            "Summarizing revenue for config {:?} in [{}, {}]",
            merchant_billing_id, period_start, period_end
        );

        let row: SummaryRow = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(fee_amount), 0) AS total_revenue,
                COALESCE(SUM(fee_amount) FILTER (WHERE fee_type = 'transaction_fee'), 0) AS transaction_fees,
                COALESCE(SUM(fee_amount) FILTER (WHERE fee_type = 'chargeback_fee'), 0) AS chargeback_fees,
                COALESCE(SUM(fee_amount) FILTER (WHERE fee_type = 'refund_fee'), 0) AS refund_fees,
                COUNT(*) FILTER (WHERE fee_type = 'transaction_fee') AS transaction_count,
                COUNT(*) FILTER (WHERE fee_type = 'transaction_fee' AND is_domestic_card) AS domestic_transactions,
                COUNT(*) FILTER (WHERE fee_type = 'transaction_fee' AND NOT is_domestic_card) AS foreign_transactions,
                COUNT(DISTINCT merchant_billing_id) AS active_merchants
            FROM fee_transactions
            WHERE created_at >= $1
                AND created_at <= $2
                AND ($3::int4 IS NULL OR merchant_billing_id = $3)
            "#,
        )
        .bind(period_start)
        .bind(period_end)
        .bind(merchant_billing_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error summarizing revenue: {}", e);
            AppError::Database(format!("Failed to summarize revenue: {}", e))
        })?;

        Ok(RevenueSummary {
            total_revenue: row.total_revenue,
            transaction_fees: row.transaction_fees,
            chargeback_fees: row.chargeback_fees,
            refund_fees: row.refund_fees,
            transaction_count: row.transaction_count,
            domestic_transactions: row.domestic_transactions,
            foreign_transactions: row.foreign_transactions,
            // Only meaningful for the all-merchants variant
            active_merchants: if merchant_billing_id.is_none() {
                Some(row.active_merchants)
            } else {
                None
            },
            period_start,
            period_end,
        })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct FeeTransactionRow {
    id: i64,
    merchant_billing_id: i32,
    payment_transaction_id: Option<String>,
    fee_type: String,
    fee_amount: Decimal,
    fee_percentage: Option<Decimal>,
    fixed_fee: Option<Decimal>,
    original_amount: Option<Decimal>,
    currency: String,
    is_domestic_card: bool,
    is_invoiced: bool,
    invoice_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<FeeTransactionRow> for FeeTransaction {
    fn from(row: FeeTransactionRow) -> Self {
        Self {
            id: row.id,
            merchant_billing_id: row.merchant_billing_id,
            payment_transaction_id: row.payment_transaction_id,
            // Schema CHECK constraint keeps the column in the known set
            fee_type: FeeType::from_str(&row.fee_type).unwrap_or(FeeType::TransactionFee),
            fee_amount: row.fee_amount,
            fee_percentage: row.fee_percentage,
            fixed_fee: row.fixed_fee,
            original_amount: row.original_amount,
            currency: row.currency,
            is_domestic_card: row.is_domestic_card,
            is_invoiced: row.is_invoiced,
            invoice_id: row.invoice_id,
            created_at: row.created_at,
        }
    }
}

/// Helper struct for mapping the aggregate summary row
#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    total_revenue: Decimal,
    transaction_fees: Decimal,
    chargeback_fees: Decimal,
    refund_fees: Decimal,
    transaction_count: i64,
    domestic_transactions: i64,
    foreign_transactions: i64,
    active_merchants: i64,
}
