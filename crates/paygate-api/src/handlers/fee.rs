//! Fee transaction handlers

use crate::dto::fee::{FeeFilterParams, FeeTransactionResponse};
use crate::dto::PaginationParams;
use actix_web::{web, HttpResponse};
use paygate_core::models::FeeType;
use paygate_core::traits::{BillingConfigRepository, FeeTransactionRepository};
use paygate_core::AppError;
use paygate_db::{PgBillingConfigRepository, PgFeeTransactionRepository};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// List fee transactions with optional filters, newest first
///
/// GET /api/v1/billing/fee-transactions
#[instrument(skip(pool))]
pub async fn list_fee_transactions(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    filters: web::Query<FeeFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    debug!(
        page = query.page,
        per_page = query.per_page,
        "Listing fee transactions"
    );

    let fee_type = match filters.fee_type.as_deref() {
        Some(s) => Some(
            FeeType::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("Invalid fee type: {}", s)))?,
        ),
        None => None,
    };

    // A merchant filter resolves to its config row, creating it if absent
    let merchant_billing_id = match filters.merchant_id.as_deref() {
        Some(merchant_id) => {
            let config_repo = PgBillingConfigRepository::new(pool.get_ref().clone());
            Some(config_repo.get_or_create(merchant_id).await?.id)
        }
        None => None,
    };

    let repo = PgFeeTransactionRepository::new(pool.get_ref().clone());
    let (fees, total) = repo
        .list_filtered(
            merchant_billing_id,
            fee_type,
            filters.start_date,
            filters.end_date,
            query.limit(),
            query.offset(),
        )
        .await?;

    let data: Vec<FeeTransactionResponse> = fees.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Configure fee transaction routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/fee-transactions", web::get().to(list_fee_transactions));
}
