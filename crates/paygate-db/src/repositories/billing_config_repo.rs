//! Merchant billing configuration repository
//!
//! PostgreSQL-backed store for the `merchant_billing` table. Configurations
//! are created lazily on a merchant's first fee-relevant event; the unique
//! constraint on `merchant_id` arbitrates concurrent first-writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate_core::{
    models::{BillingCycle, MerchantBillingConfig},
    traits::BillingConfigRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

pub(crate) const CONFIG_COLUMNS: &str = r#"
    id, merchant_id,
    domestic_card_percentage, domestic_card_fixed_fee,
    foreign_card_percentage, foreign_card_fixed_fee,
    chargeback_fee, refund_fee,
    billing_cycle, billing_day, auto_billing_enabled,
    billing_email, billing_address, payment_method,
    created_at, updated_at
"#;

/// PostgreSQL implementation of `BillingConfigRepository`
pub struct PgBillingConfigRepository {
    pool: PgPool,
}

impl PgBillingConfigRepository {
    /// Create a new configuration repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingConfigRepository for PgBillingConfigRepository {
    #[instrument(skip(self))]
    async fn find_by_merchant(&self, merchant_id: &str) -> AppResult<Option<MerchantBillingConfig>> {
        debug!("Finding billing config for merchant: {}", merchant_id);

        let result = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(&format!(
            "SELECT {} FROM merchant_billing WHERE merchant_id = $1",
            CONFIG_COLUMNS
        ))
        .bind(merchant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding config for {}: {}", merchant_id, e);
            AppError::Database(format!("Failed to find billing config: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<MerchantBillingConfig>> {
        let result = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(&format!(
            "SELECT {} FROM merchant_billing WHERE id = $1",
            CONFIG_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding config {}: {}", id, e);
            AppError::Database(format!("Failed to find billing config: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn get_or_create(&self, merchant_id: &str) -> AppResult<MerchantBillingConfig> {
        if let Some(existing) = self.find_by_merchant(merchant_id).await? {
            return Ok(existing);
        }

        debug!("No billing config for merchant {}, creating default", merchant_id);
        let defaults = MerchantBillingConfig::new_default(merchant_id);

        // ON CONFLICT DO NOTHING: a concurrent first-writer may have won the
        // race on the unique merchant_id constraint, in which case no row
        // comes back and we re-fetch the winner's row.
        let inserted = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(&format!(
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
        ))
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
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating config for {}: {}", merchant_id, e);
            AppError::Database(format!("Failed to create billing config: {}", e))
        })?;

        match inserted {
            Some(row) => {
                info!("Created default billing config for merchant {}", merchant_id);
                Ok(row.into())
            }
            None => self
                .find_by_merchant(merchant_id)
                .await?
                .ok_or_else(|| {
                    AppError::Database(format!(
                        "Billing config for {} vanished after conflicting insert",
                        merchant_id
                    ))
                }),
        }
    }

    #[instrument(skip(self, config))]
    async fn update(&self, config: &MerchantBillingConfig) -> AppResult<MerchantBillingConfig> {
        debug!("Updating billing config for merchant: {}", config.merchant_id);

        let row = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(&format!(
            r#"
            UPDATE merchant_billing
            SET domestic_card_percentage = $2,
                domestic_card_fixed_fee = $3,
                foreign_card_percentage = $4,
                foreign_card_fixed_fee = $5,
                chargeback_fee = $6,
                refund_fee = $7,
                billing_cycle = $8,
                billing_day = $9,
                auto_billing_enabled = $10,
                billing_email = $11,
                billing_address = $12,
                payment_method = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CONFIG_COLUMNS
        ))
        .bind(config.id)
        .bind(config.domestic_card_percentage)
        .bind(config.domestic_card_fixed_fee)
        .bind(config.foreign_card_percentage)
        .bind(config.foreign_card_fixed_fee)
        .bind(config.chargeback_fee)
        .bind(config.refund_fee)
        .bind(config.billing_cycle.to_string())
        .bind(config.billing_day)
        .bind(config.auto_billing_enabled)
        .bind(&config.billing_email)
        .bind(&config.billing_address)
        .bind(&config.payment_method)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error updating config for {}: {}",
                config.merchant_id, e
            );
            AppError::Database(format!("Failed to update billing config: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_auto_billing(&self) -> AppResult<Vec<MerchantBillingConfig>> {
        let rows = sqlx::query_as::<sqlx::Postgres, BillingConfigRow>(&format!(
            "SELECT {} FROM merchant_billing WHERE auto_billing_enabled = TRUE ORDER BY merchant_id",
            CONFIG_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing auto-billing configs: {}", e);
            AppError::Database(format!("Failed to list billing configs: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
///
/// Shared with the fee transaction repository, which resolves configs
/// inside its own transactions.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BillingConfigRow {
    id: i32,
    merchant_id: String,
    domestic_card_percentage: Decimal,
    domestic_card_fixed_fee: Decimal,
    foreign_card_percentage: Decimal,
    foreign_card_fixed_fee: Decimal,
    chargeback_fee: Decimal,
    refund_fee: Decimal,
    billing_cycle: String,
    billing_day: i32,
    auto_billing_enabled: bool,
    billing_email: Option<String>,
    billing_address: Option<String>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BillingConfigRow> for MerchantBillingConfig {
    fn from(row: BillingConfigRow) -> Self {
        Self {
            id: row.id,
            merchant_id: row.merchant_id,
            domestic_card_percentage: row.domestic_card_percentage,
            domestic_card_fixed_fee: row.domestic_card_fixed_fee,
            foreign_card_percentage: row.foreign_card_percentage,
            foreign_card_fixed_fee: row.foreign_card_fixed_fee,
            chargeback_fee: row.chargeback_fee,
            refund_fee: row.refund_fee,
            // Schema CHECK constraint keeps the column in the known set
            billing_cycle: BillingCycle::from_str(&row.billing_cycle).unwrap_or_default(),
            billing_day: row.billing_day,
            auto_billing_enabled: row.auto_billing_enabled,
            billing_email: row.billing_email,
            billing_address: row.billing_address,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_get_or_create_is_idempotent() {
        let pool = crate::create_pool(&crate::pool::test_database_config())
            .await
            .unwrap();
        let repo = PgBillingConfigRepository::new(pool);

        let first = repo.get_or_create("MRC-IDEMPOTENT").await.unwrap();
        let second = repo.get_or_create("MRC-IDEMPOTENT").await.unwrap();
        assert_eq!(first.id, second.id);
    }
}
