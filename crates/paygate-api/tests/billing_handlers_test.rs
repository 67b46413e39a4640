//! Integration tests for billing API DTOs
//!
//! These tests exercise the DTO conversions and query parameter parsing the
//! handlers rely on. For full integration testing against PostgreSQL, set
//! the DATABASE_URL environment variable and run the ignored repository
//! tests.

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, Utc};
    use paygate_api::dto::billing::{
        BillingConfigResponse, BillingConfigUpdateRequest, RevenueQuery,
    };
    use paygate_api::dto::fee::FeeTransactionResponse;
    use paygate_api::dto::invoice::{
        InvoiceDetailResponse, InvoiceFilterParams, InvoiceSummaryResponse,
    };
    use paygate_api::dto::PaginationParams;
    use paygate_core::models::{
        FeeTransaction, FeeType, Invoice, InvoiceItem, InvoiceStatus, MerchantBillingConfig,
        PaymentRef,
    };
    use rust_decimal_macros::dec;

    fn sample_invoice() -> Invoice {
        let now = Utc::now();
        Invoice {
            id: 42,
            invoice_number: "INV-20250301-A1B2C3D4".to_string(),
            merchant_billing_id: 7,
            billing_period_start: now - Duration::days(28),
            billing_period_end: now - Duration::seconds(1),
            subtotal: dec!(3.25),
            tax_amount: dec!(0.00),
            total_amount: dec!(3.25),
            status: InvoiceStatus::Pending,
            issued_date: now,
            due_date: Some(now + Duration::days(30)),
            paid_date: None,
            payment_reference: None,
            payment_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_config_response_conversion() {
        let mut config = MerchantBillingConfig::new_default("MRC001");
        config.id = 7;

        let response = BillingConfigResponse::from(config);

        assert_eq!(response.id, 7);
        assert_eq!(response.merchant_id, "MRC001");
        assert_eq!(response.domestic_card_percentage, dec!(0.5));
        assert_eq!(response.foreign_card_percentage, dec!(2.4));
        assert_eq!(response.billing_cycle, "monthly");
        assert_eq!(response.billing_day, 1);
        assert!(response.auto_billing_enabled);
        assert_eq!(response.billing_email.as_deref(), Some("MRC001@example.com"));
    }

    #[test]
    fn test_config_update_request_is_partial() {
        let json = r#"{"chargeback_fee": "15.00"}"#;
        let req: BillingConfigUpdateRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.chargeback_fee, Some(dec!(15.00)));
        assert!(req.domestic_card_percentage.is_none());
        assert!(req.billing_cycle.is_none());
        assert!(req.auto_billing_enabled.is_none());
    }

    #[test]
    fn test_invoice_summary_response_conversion() {
        let response = InvoiceSummaryResponse::from(sample_invoice());

        assert_eq!(response.id, 42);
        assert_eq!(response.invoice_number, "INV-20250301-A1B2C3D4");
        assert_eq!(response.status, "pending");
        assert_eq!(response.total_amount, dec!(3.25));
        assert!(response.paid_date.is_none());
    }

    #[test]
    fn test_invoice_detail_includes_items() {
        let items = vec![InvoiceItem {
            id: 1,
            invoice_id: 42,
            description: "Domestic Card Transaction Fees (2 transactions)".to_string(),
            fee_type: FeeType::TransactionFee,
            quantity: 2,
            unit_price: dec!(0.60),
            total_price: dec!(1.20),
            created_at: Utc::now(),
        }];

        let response = InvoiceDetailResponse::new(sample_invoice(), items);

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].fee_type, "transaction_fee");
        assert_eq!(response.items[0].quantity, 2);
        assert_eq!(response.items[0].total_price, dec!(1.20));
    }

    #[test]
    fn test_fee_transaction_response_conversion() {
        let mut config = MerchantBillingConfig::new_default("MRC001");
        config.id = 7;
        let payment = PaymentRef::new("TXN-1", "MRC001", dec!(100.00), "EUR");
        let fee = FeeTransaction::transaction_fee(&config, &payment, true);

        let response = FeeTransactionResponse::from(fee);

        assert_eq!(response.merchant_billing_id, 7);
        assert_eq!(response.fee_type, "transaction_fee");
        assert_eq!(response.fee_amount, dec!(0.60));
        assert_eq!(response.payment_transaction_id.as_deref(), Some("TXN-1"));
        assert!(!response.is_invoiced);
    }

    #[test]
    fn test_invoice_filter_status_parsing() {
        let filters = InvoiceFilterParams {
            status: Some("paid".to_string()),
        };
        assert_eq!(
            InvoiceStatus::from_str(filters.status.as_deref().unwrap()),
            Some(InvoiceStatus::Paid)
        );
        assert_eq!(InvoiceStatus::from_str("refunded"), None);
    }

    #[test]
    fn test_revenue_query_defaults_to_current_month() {
        let query: RevenueQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.period, "month");

        let (start, end) = query.resolve().unwrap();
        assert_eq!(start.day(), 1);
        assert!(start < end);
    }

    #[test]
    fn test_pagination_defaults() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 20);

        let response = params.paginate(vec![1, 2, 3], 45);
        assert_eq!(response.pagination.total, 45);
        assert_eq!(response.pagination.total_pages, 3);
    }
}
