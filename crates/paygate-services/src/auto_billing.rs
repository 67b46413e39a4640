//! Automatic billing sweep
//!
//! Walks every merchant with auto-billing enabled and, when the merchant's
//! cadence says today is its billing day, generates an invoice for the
//! previous full period. One failing merchant does not stop the sweep; the
//! error is logged and the remaining merchants are still processed.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use paygate_core::{
    models::{BillingCycle, Invoice, MerchantBillingConfig},
    traits::{BillingConfigRepository, FeeTransactionRepository, InvoiceRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::invoicing::InvoiceService;

/// Automatic billing service
pub struct AutoBillingService<C, F, I>
where
    C: BillingConfigRepository,
    F: FeeTransactionRepository,
    I: InvoiceRepository,
{
    config_repo: Arc<C>,
    invoice_service: Arc<InvoiceService<C, F, I>>,
}

impl<C, F, I> AutoBillingService<C, F, I>
where
    C: BillingConfigRepository,
    F: FeeTransactionRepository,
    I: InvoiceRepository,
{
    /// Create a new automatic billing service
    pub fn new(config_repo: Arc<C>, invoice_service: Arc<InvoiceService<C, F, I>>) -> Self {
        Self {
            config_repo,
            invoice_service,
        }
    }

    /// Run the sweep for the given date
    ///
    /// Returns the invoices that were generated. Merchants whose cadence is
    /// not due today, or that had no billable activity, produce nothing.
    #[instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> AppResult<Vec<Invoice>> {
        let configs = self.config_repo.list_auto_billing().await?;
        info!(
            "Automatic billing sweep for {}: {} merchants enabled",
            today,
            configs.len()
        );

        let mut generated = Vec::new();
        for config in &configs {
            if !is_billing_due(config, today) {
                debug!(
                    "Merchant {} not due today ({} cycle, day {})",
                    config.merchant_id, config.billing_cycle, config.billing_day
                );
                continue;
            }

            let (period_start, period_end) = billing_period(config.billing_cycle, today)?;
            match self
                .invoice_service
                .generate_invoice(&config.merchant_id, period_start, period_end)
                .await
            {
                Ok(Some(invoice)) => generated.push(invoice),
                Ok(None) => {
                    debug!("No billable activity for merchant {}", config.merchant_id)
                }
                Err(e) => {
                    error!(
                        "Failed to generate invoice for merchant {}: {}",
                        config.merchant_id, e
                    );
                }
            }
        }

        info!("Automatic billing sweep generated {} invoices", generated.len());
        Ok(generated)
    }
}

/// Whether a merchant's cadence falls due on `today`
///
/// Monthly bills on the configured day of month, weekly on the configured
/// Monday-based weekday index, daily always.
fn is_billing_due(config: &MerchantBillingConfig, today: NaiveDate) -> bool {
    match config.billing_cycle {
        BillingCycle::Monthly => today.day() as i32 == config.billing_day,
        BillingCycle::Weekly => today.weekday().num_days_from_monday() as i32 == config.billing_day,
        BillingCycle::Daily => true,
    }
}

/// The previous full billing period for a cycle, relative to `today`
///
/// Every period ends one second before today's midnight. Monthly covers the
/// previous calendar month, weekly the previous seven days, daily yesterday.
fn billing_period(
    cycle: BillingCycle,
    today: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = today.and_time(NaiveTime::MIN).and_utc();
    let period_end = midnight - Duration::seconds(1);

    let period_start = match cycle {
        BillingCycle::Monthly => {
            let (year, month) = if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| {
                    AppError::Internal(format!("Invalid period start {}-{}-01", year, month))
                })?
                .and_time(NaiveTime::MIN)
                .and_utc()
        }
        BillingCycle::Weekly => midnight - Duration::days(7),
        BillingCycle::Daily => midnight - Duration::days(1),
    };

    Ok((period_start, period_end))
}
