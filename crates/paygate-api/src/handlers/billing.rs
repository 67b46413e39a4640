//! Billing configuration, revenue, and fee calculator handlers

use crate::dto::billing::{
    BillingConfigResponse, BillingConfigUpdateRequest, FeeCalculatorRequest, FeeCalculatorResponse,
    RevenueQuery,
};
use crate::dto::invoice::AutoBillingResponse;
use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use paygate_core::models::calculate_fee;
use paygate_core::traits::{BillingConfigRepository, FeeTransactionRepository};
use paygate_core::{AppConfig, AppError};
use paygate_db::{PgBillingConfigRepository, PgFeeTransactionRepository, PgInvoiceRepository};
use paygate_services::{AutoBillingService, InvoiceService};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Get a merchant's billing configuration, creating it with defaults if absent
///
/// GET /api/v1/billing/merchants/{merchant_id}/config
#[instrument(skip(pool))]
pub async fn get_config(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let merchant_id = path.into_inner();
    debug!(merchant_id = %merchant_id, "Getting billing config");

    let repo = PgBillingConfigRepository::new(pool.get_ref().clone());
    let config = repo.get_or_create(&merchant_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(BillingConfigResponse::from(config))))
}

/// Partially update a merchant's billing configuration
///
/// PUT /api/v1/billing/merchants/{merchant_id}/config
#[instrument(skip(pool, req))]
pub async fn update_config(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    req: web::Json<BillingConfigUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Billing config validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let merchant_id = path.into_inner();
    debug!(merchant_id = %merchant_id, "Updating billing config");

    let repo = PgBillingConfigRepository::new(pool.get_ref().clone());
    let mut config = repo.get_or_create(&merchant_id).await?;
    req.apply(&mut config)?;

    let updated = repo.update(&config).await?;

    info!(merchant_id = %merchant_id, "Billing config updated");
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        BillingConfigResponse::from(updated),
        "Billing configuration updated successfully",
    )))
}

/// Revenue summary for one merchant
///
/// GET /api/v1/billing/merchants/{merchant_id}/revenue
#[instrument(skip(pool))]
pub async fn merchant_revenue(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<RevenueQuery>,
) -> Result<HttpResponse, AppError> {
    let merchant_id = path.into_inner();
    let (period_start, period_end) = query.resolve()?;
    debug!(
        merchant_id = %merchant_id,
        "Merchant revenue summary for [{}, {}]",
        period_start,
        period_end
    );

    let config_repo = PgBillingConfigRepository::new(pool.get_ref().clone());
    let config = config_repo.get_or_create(&merchant_id).await?;

    let fee_repo = PgFeeTransactionRepository::new(pool.get_ref().clone());
    let summary = fee_repo
        .summarize(Some(config.id), period_start, period_end)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

/// Revenue summary across all merchants
///
/// GET /api/v1/billing/revenue/total
#[instrument(skip(pool))]
pub async fn total_revenue(
    pool: web::Data<PgPool>,
    query: web::Query<RevenueQuery>,
) -> Result<HttpResponse, AppError> {
    let (period_start, period_end) = query.resolve()?;
    debug!(
        "Total revenue summary for [{}, {}]",
        period_start, period_end
    );

    let fee_repo = PgFeeTransactionRepository::new(pool.get_ref().clone());
    let summary = fee_repo.summarize(None, period_start, period_end).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

/// Calculate the fee for an amount and card class
///
/// POST /api/v1/billing/fee-calculator
///
/// With a merchant id the merchant's configured schedule applies (created
/// with defaults if absent); without one the hardcoded default schedule.
#[instrument(skip(pool, req))]
pub async fn fee_calculator(
    pool: web::Data<PgPool>,
    req: web::Json<FeeCalculatorRequest>,
) -> Result<HttpResponse, AppError> {
    if req.amount < Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "amount must not be negative".to_string(),
        ));
    }

    let config = match &req.merchant_id {
        Some(merchant_id) => {
            let repo = PgBillingConfigRepository::new(pool.get_ref().clone());
            Some(repo.get_or_create(merchant_id).await?)
        }
        None => None,
    };

    let fee = calculate_fee(req.amount, req.is_domestic_card, config.as_ref());

    Ok(HttpResponse::Ok().json(ApiResponse::success(FeeCalculatorResponse {
        amount: req.amount,
        fee,
        net_amount: req.amount - fee,
        is_domestic_card: req.is_domestic_card,
    })))
}

/// Run the automatic billing sweep for today
///
/// POST /api/v1/billing/run-auto-billing
///
/// Invoked by an external scheduler (cron or similar); the sweep is not a
/// resident process.
#[instrument(skip(pool, app_config))]
pub async fn run_auto_billing(
    pool: web::Data<PgPool>,
    app_config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let config_repo = Arc::new(PgBillingConfigRepository::new(pool.get_ref().clone()));
    let fee_repo = Arc::new(PgFeeTransactionRepository::new(pool.get_ref().clone()));
    let invoice_repo = Arc::new(PgInvoiceRepository::new(pool.get_ref().clone()));

    let tax_rate = Decimal::from_f64_retain(app_config.billing.tax_rate_percent)
        .unwrap_or(Decimal::ZERO);
    let invoice_service = Arc::new(
        InvoiceService::new(Arc::clone(&config_repo), fee_repo, invoice_repo)
            .with_billing_settings(tax_rate, app_config.billing.payment_terms_days),
    );
    let auto_billing = AutoBillingService::new(config_repo, invoice_service);

    let invoices = auto_billing.run(Utc::now().date_naive()).await?;

    info!("Automatic billing run generated {} invoices", invoices.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success(AutoBillingResponse {
        invoices_generated: invoices.len(),
        invoices: invoices.into_iter().map(Into::into).collect(),
    })))
}

/// Configure billing config, revenue, and calculator routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/merchants/{merchant_id}/config",
        web::get().to(get_config),
    )
    .route(
        "/merchants/{merchant_id}/config",
        web::put().to(update_config),
    )
    .route(
        "/merchants/{merchant_id}/revenue",
        web::get().to(merchant_revenue),
    )
    .route("/revenue/total", web::get().to(total_revenue))
    .route("/fee-calculator", web::post().to(fee_calculator))
    .route("/run-auto-billing", web::post().to(run_auto_billing));
}
