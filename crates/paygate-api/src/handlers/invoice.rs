//! Invoice handlers

use crate::dto::invoice::{
    GeneratedInvoiceResponse, GenerateInvoiceRequest, InvoiceDetailResponse, InvoiceFilterParams,
    InvoiceSummaryResponse, PayInvoiceRequest,
};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use paygate_core::models::InvoiceStatus;
use paygate_core::traits::{BillingConfigRepository, InvoiceRepository};
use paygate_core::{AppConfig, AppError};
use paygate_db::{PgBillingConfigRepository, PgFeeTransactionRepository, PgInvoiceRepository};
use paygate_services::InvoiceService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// List a merchant's invoices, newest first
///
/// GET /api/v1/billing/merchants/{merchant_id}/invoices
#[instrument(skip(pool))]
pub async fn list_merchant_invoices(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
    filters: web::Query<InvoiceFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let merchant_id = path.into_inner();
    debug!(
        merchant_id = %merchant_id,
        page = query.page,
        per_page = query.per_page,
        "Listing invoices"
    );

    let status = match filters.status.as_deref() {
        Some(s) => Some(
            InvoiceStatus::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("Invalid status: {}", s)))?,
        ),
        None => None,
    };

    let config_repo = PgBillingConfigRepository::new(pool.get_ref().clone());
    let config = config_repo.get_or_create(&merchant_id).await?;

    let repo = PgInvoiceRepository::new(pool.get_ref().clone());
    let (invoices, total) = repo
        .list_for_config(config.id, status, query.limit(), query.offset())
        .await?;

    let data: Vec<InvoiceSummaryResponse> = invoices.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Get a single invoice with its line items
///
/// GET /api/v1/billing/invoices/{id}
#[instrument(skip(pool))]
pub async fn get_invoice(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    debug!(id = invoice_id, "Getting invoice");

    let repo = PgInvoiceRepository::new(pool.get_ref().clone());
    let invoice = repo
        .find_by_id(invoice_id)
        .await?
        .ok_or_else(|| AppError::InvoiceNotFound(invoice_id.to_string()))?;
    let items = repo.items(invoice_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(InvoiceDetailResponse::new(
        invoice, items,
    ))))
}

/// Mark an invoice as paid
///
/// POST /api/v1/billing/invoices/{id}/pay
#[instrument(skip(pool, req))]
pub async fn pay_invoice(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    req: web::Json<PayInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    debug!(id = invoice_id, "Marking invoice paid");

    let repo = PgInvoiceRepository::new(pool.get_ref().clone());
    let invoice = repo
        .mark_paid(
            invoice_id,
            req.payment_reference.as_deref(),
            req.payment_method.as_deref(),
        )
        .await?;

    info!(
        id = invoice_id,
        invoice_number = %invoice.invoice_number,
        "Invoice marked as paid"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        InvoiceSummaryResponse::from(invoice),
        "Invoice marked as paid",
    )))
}

/// Generate an invoice for a merchant over an explicit period
///
/// POST /api/v1/billing/merchants/{merchant_id}/generate-invoice
#[instrument(skip(pool, app_config, req))]
pub async fn generate_invoice(
    pool: web::Data<PgPool>,
    app_config: web::Data<AppConfig>,
    path: web::Path<String>,
    req: web::Json<GenerateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    if req.period_start >= req.period_end {
        return Err(AppError::Validation(
            "period_start must be before period_end".to_string(),
        ));
    }

    let merchant_id = path.into_inner();
    debug!(
        merchant_id = %merchant_id,
        "Generating invoice for [{}, {}]",
        req.period_start,
        req.period_end
    );

    let config_repo = Arc::new(PgBillingConfigRepository::new(pool.get_ref().clone()));
    let fee_repo = Arc::new(PgFeeTransactionRepository::new(pool.get_ref().clone()));
    let invoice_repo = Arc::new(PgInvoiceRepository::new(pool.get_ref().clone()));

    let tax_rate = Decimal::from_f64_retain(app_config.billing.tax_rate_percent)
        .unwrap_or(Decimal::ZERO);
    let service = InvoiceService::new(config_repo, fee_repo, invoice_repo)
        .with_billing_settings(tax_rate, app_config.billing.payment_terms_days);

    let invoice = service
        .generate_invoice(&merchant_id, req.period_start, req.period_end)
        .await?
        .ok_or(AppError::NoBillableActivity {
            merchant_id: merchant_id.clone(),
        })?;

    info!(
        merchant_id = %merchant_id,
        invoice_number = %invoice.invoice_number,
        "Invoice generated"
    );
    Ok(HttpResponse::Created().json(ApiResponse::success(GeneratedInvoiceResponse::from(
        invoice,
    ))))
}

/// Configure invoice routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/merchants/{merchant_id}/invoices",
        web::get().to(list_merchant_invoices),
    )
    .route(
        "/merchants/{merchant_id}/generate-invoice",
        web::post().to(generate_invoice),
    )
    .route("/invoices/{id}", web::get().to(get_invoice))
    .route("/invoices/{id}/pay", web::post().to(pay_invoice));
}
