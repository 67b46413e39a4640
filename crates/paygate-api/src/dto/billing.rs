//! Billing configuration, revenue, and fee calculator DTOs

use chrono::{DateTime, Datelike, TimeZone, Utc};
use paygate_core::models::{BillingCycle, MerchantBillingConfig};
use paygate_core::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Merchant billing configuration response
#[derive(Debug, Clone, Serialize)]
pub struct BillingConfigResponse {
    pub id: i32,
    pub merchant_id: String,
    pub domestic_card_percentage: Decimal,
    pub domestic_card_fixed_fee: Decimal,
    pub foreign_card_percentage: Decimal,
    pub foreign_card_fixed_fee: Decimal,
    pub chargeback_fee: Decimal,
    pub refund_fee: Decimal,
    pub billing_cycle: String,
    pub billing_day: i32,
    pub auto_billing_enabled: bool,
    pub billing_email: Option<String>,
    pub billing_address: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MerchantBillingConfig> for BillingConfigResponse {
    fn from(config: MerchantBillingConfig) -> Self {
        Self {
            id: config.id,
            merchant_id: config.merchant_id,
            domestic_card_percentage: config.domestic_card_percentage,
            domestic_card_fixed_fee: config.domestic_card_fixed_fee,
            foreign_card_percentage: config.foreign_card_percentage,
            foreign_card_fixed_fee: config.foreign_card_fixed_fee,
            chargeback_fee: config.chargeback_fee,
            refund_fee: config.refund_fee,
            billing_cycle: config.billing_cycle.to_string(),
            billing_day: config.billing_day,
            auto_billing_enabled: config.auto_billing_enabled,
            billing_email: config.billing_email,
            billing_address: config.billing_address,
            payment_method: config.payment_method,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

/// Partial update of a merchant billing configuration
///
/// Only the fields present in the request body are changed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BillingConfigUpdateRequest {
    pub domestic_card_percentage: Option<Decimal>,
    pub domestic_card_fixed_fee: Option<Decimal>,
    pub foreign_card_percentage: Option<Decimal>,
    pub foreign_card_fixed_fee: Option<Decimal>,
    pub chargeback_fee: Option<Decimal>,
    pub refund_fee: Option<Decimal>,
    pub billing_cycle: Option<String>,
    #[validate(range(min = 0, max = 31))]
    pub billing_day: Option<i32>,
    pub auto_billing_enabled: Option<bool>,
    #[validate(email)]
    pub billing_email: Option<String>,
    pub billing_address: Option<String>,
    pub payment_method: Option<String>,
}

impl BillingConfigUpdateRequest {
    /// Apply the provided fields onto an existing configuration
    pub fn apply(&self, config: &mut MerchantBillingConfig) -> Result<(), AppError> {
        if let Some(v) = self.domestic_card_percentage {
            config.domestic_card_percentage = v;
        }
        if let Some(v) = self.domestic_card_fixed_fee {
            config.domestic_card_fixed_fee = v;
        }
        if let Some(v) = self.foreign_card_percentage {
            config.foreign_card_percentage = v;
        }
        if let Some(v) = self.foreign_card_fixed_fee {
            config.foreign_card_fixed_fee = v;
        }
        if let Some(v) = self.chargeback_fee {
            config.chargeback_fee = v;
        }
        if let Some(v) = self.refund_fee {
            config.refund_fee = v;
        }
        if let Some(cycle) = &self.billing_cycle {
            config.billing_cycle = BillingCycle::from_str(cycle)
                .ok_or_else(|| AppError::Validation(format!("Invalid billing cycle: {}", cycle)))?;
        }
        if let Some(v) = self.billing_day {
            config.billing_day = v;
        }
        if let Some(v) = self.auto_billing_enabled {
            config.auto_billing_enabled = v;
        }
        if let Some(v) = &self.billing_email {
            config.billing_email = Some(v.clone());
        }
        if let Some(v) = &self.billing_address {
            config.billing_address = Some(v.clone());
        }
        if let Some(v) = &self.payment_method {
            config.payment_method = Some(v.clone());
        }
        config.updated_at = Utc::now();
        Ok(())
    }
}

/// Revenue period query parameters
///
/// `period` selects a rolling window relative to now; `custom` requires
/// explicit start and end dates.
#[derive(Debug, Clone, Deserialize)]
pub struct RevenueQuery {
    #[serde(default = "default_period")]
    pub period: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn default_period() -> String {
    "month".to_string()
}

impl RevenueQuery {
    /// Resolve the query into concrete period bounds
    pub fn resolve(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let now = Utc::now();
        match self.period.as_str() {
            "custom" => {
                let start = self.start_date.ok_or_else(|| {
                    AppError::MissingField("start_date".to_string())
                })?;
                let end = self.end_date.ok_or_else(|| {
                    AppError::MissingField("end_date".to_string())
                })?;
                if start >= end {
                    return Err(AppError::Validation(
                        "start_date must be before end_date".to_string(),
                    ));
                }
                Ok((start, end))
            }
            "week" => Ok((now - chrono::Duration::days(7), now)),
            "day" => Ok((now - chrono::Duration::days(1), now)),
            "month" => {
                // First day of the current calendar month
                let start = Utc
                    .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                    .single()
                    .ok_or_else(|| AppError::Internal("Invalid period start".to_string()))?;
                Ok((start, now))
            }
            other => Err(AppError::Validation(format!(
                "Invalid period: {} (expected month, week, day, or custom)",
                other
            ))),
        }
    }
}

/// Fee calculation request
#[derive(Debug, Clone, Deserialize)]
pub struct FeeCalculatorRequest {
    pub amount: Decimal,
    #[serde(default = "default_domestic")]
    pub is_domestic_card: bool,
    pub merchant_id: Option<String>,
}

fn default_domestic() -> bool {
    true
}

/// Fee calculation response
#[derive(Debug, Clone, Serialize)]
pub struct FeeCalculatorResponse {
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub is_domestic_card: bool,
}
