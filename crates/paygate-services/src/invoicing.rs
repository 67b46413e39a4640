//! Invoice generation service
//!
//! Sweeps a merchant's un-invoiced fee transactions for a billing period
//! into an invoice with grouped line items. Transaction fees are grouped by
//! card origin class, all other fee kinds by kind. The repository persists
//! the invoice, its items, and the invoiced latch atomically, so a period
//! can never be billed twice.

use chrono::{DateTime, Duration, Utc};
use paygate_core::{
    models::{round_money, FeeTransaction, FeeType, Invoice, InvoiceItem, InvoiceStatus},
    traits::{BillingConfigRepository, FeeTransactionRepository, InvoiceRepository},
    AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Default payment terms applied to the due date
const DEFAULT_PAYMENT_TERMS_DAYS: i64 = 30;

/// Invoice generation service
///
/// Generic over the repository traits so the grouping and totaling logic is
/// testable against in-memory storage.
pub struct InvoiceService<C, F, I>
where
    C: BillingConfigRepository,
    F: FeeTransactionRepository,
    I: InvoiceRepository,
{
    config_repo: Arc<C>,
    fee_repo: Arc<F>,
    invoice_repo: Arc<I>,
    tax_rate_percent: Decimal,
    payment_terms_days: i64,
}

impl<C, F, I> InvoiceService<C, F, I>
where
    C: BillingConfigRepository,
    F: FeeTransactionRepository,
    I: InvoiceRepository,
{
    /// Create a new invoice service with zero tax and 30-day payment terms
    pub fn new(config_repo: Arc<C>, fee_repo: Arc<F>, invoice_repo: Arc<I>) -> Self {
        Self {
            config_repo,
            fee_repo,
            invoice_repo,
            tax_rate_percent: Decimal::ZERO,
            payment_terms_days: DEFAULT_PAYMENT_TERMS_DAYS,
        }
    }

    /// Override tax rate and payment terms (from application configuration)
    pub fn with_billing_settings(mut self, tax_rate_percent: Decimal, payment_terms_days: i64) -> Self {
        self.tax_rate_percent = tax_rate_percent;
        self.payment_terms_days = payment_terms_days;
        self
    }

    /// Generate an invoice for a merchant over a billing period
    ///
    /// Returns `Ok(None)` when the merchant has no un-invoiced fee
    /// transactions in the period. The merchant's billing configuration is
    /// created with defaults if it does not exist yet.
    #[instrument(skip(self))]
    pub async fn generate_invoice(
        &self,
        merchant_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> AppResult<Option<Invoice>> {
        let config = self.config_repo.get_or_create(merchant_id).await?;

        let fees = self
            .fee_repo
            .list_uninvoiced(config.id, period_start, period_end)
            .await?;

        if fees.is_empty() {
            debug!(
                "No billable activity for merchant {} in [{}, {}]",
                merchant_id, period_start, period_end
            );
            return Ok(None);
        }

        let items = group_fees(&fees);
        let subtotal: Decimal = items.iter().map(|i| i.total_price).sum();
        let tax_amount = round_money(subtotal * self.tax_rate_percent / Decimal::ONE_HUNDRED);
        let total_amount = subtotal + tax_amount;

        let issued_date = Utc::now();
        let invoice = Invoice {
            id: 0,
            invoice_number: generate_invoice_number(issued_date),
            merchant_billing_id: config.id,
            billing_period_start: period_start,
            billing_period_end: period_end,
            subtotal,
            tax_amount,
            total_amount,
            status: InvoiceStatus::Pending,
            issued_date,
            due_date: Some(issued_date + Duration::days(self.payment_terms_days)),
            paid_date: None,
            payment_reference: None,
            payment_method: None,
            notes: None,
            created_at: issued_date,
            updated_at: issued_date,
        };

        let fee_ids: Vec<i64> = fees.iter().map(|f| f.id).collect();
        let created = self
            .invoice_repo
            .create_with_items(&invoice, &items, &fee_ids)
            .await?;

        info!(
            "Generated invoice {} for merchant {}: {} items, total {}",
            created.invoice_number,
            merchant_id,
            items.len(),
            created.total_amount
        );

        Ok(Some(created))
    }
}

/// Group fee transactions into unsaved invoice line items
///
/// Transaction fees split into a domestic and a foreign group; every other
/// fee kind forms one group per kind. Group order follows first appearance
/// in the input.
fn group_fees(fees: &[FeeTransaction]) -> Vec<InvoiceItem> {
    // (fee kind, card class for transaction fees)
    type GroupKey = (FeeType, Option<bool>);

    let mut groups: Vec<(GroupKey, Vec<&FeeTransaction>)> = Vec::new();
    for fee in fees {
        let key: GroupKey = match fee.fee_type {
            FeeType::TransactionFee => (fee.fee_type, Some(fee.is_domestic_card)),
            _ => (fee.fee_type, None),
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(fee),
            None => groups.push((key, vec![fee])),
        }
    }

    groups
        .into_iter()
        .map(|((fee_type, card_class), members)| {
            let quantity = members.len() as i32;
            let total_price: Decimal = members.iter().map(|f| f.fee_amount).sum();
            let description = match card_class {
                Some(true) => format!("Domestic Card Transaction Fees ({} transactions)", quantity),
                Some(false) => format!("Foreign Card Transaction Fees ({} transactions)", quantity),
                None => format!("{} ({} transactions)", fee_type.group_description(), quantity),
            };

            InvoiceItem {
                id: 0,
                invoice_id: 0,
                description,
                fee_type,
                quantity,
                unit_price: round_money(total_price / Decimal::from(quantity)),
                total_price,
                created_at: Utc::now(),
            }
        })
        .collect()
}

/// Generate an invoice number: `INV-<YYYYMMDD>-<8 random upper hex chars>`
fn generate_invoice_number(issued: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("INV-{}-{}", issued.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paygate_core::{
        models::{MerchantBillingConfig, PaymentRef, RevenueSummary},
        AppError,
    };
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct MockConfigRepo {
        config: MerchantBillingConfig,
    }

    #[async_trait]
    impl BillingConfigRepository for MockConfigRepo {
        async fn find_by_merchant(
            &self,
            _merchant_id: &str,
        ) -> AppResult<Option<MerchantBillingConfig>> {
            Ok(Some(self.config.clone()))
        }

        async fn find_by_id(&self, _id: i32) -> AppResult<Option<MerchantBillingConfig>> {
            Ok(Some(self.config.clone()))
        }

        async fn get_or_create(&self, _merchant_id: &str) -> AppResult<MerchantBillingConfig> {
            Ok(self.config.clone())
        }

        async fn update(
            &self,
            config: &MerchantBillingConfig,
        ) -> AppResult<MerchantBillingConfig> {
            Ok(config.clone())
        }

        async fn list_auto_billing(&self) -> AppResult<Vec<MerchantBillingConfig>> {
            Ok(vec![self.config.clone()])
        }
    }

    struct MockFeeRepo {
        fees: Vec<FeeTransaction>,
    }

    #[async_trait]
    impl FeeTransactionRepository for MockFeeRepo {
        async fn record_transaction_fee(
            &self,
            _payment: &PaymentRef,
            _is_domestic_card: bool,
        ) -> AppResult<FeeTransaction> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn record_chargeback_fee(&self, _payment: &PaymentRef) -> AppResult<FeeTransaction> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn record_refund_fee(&self, _payment: &PaymentRef) -> AppResult<FeeTransaction> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn list_uninvoiced(
            &self,
            _merchant_billing_id: i32,
            _period_start: DateTime<Utc>,
            _period_end: DateTime<Utc>,
        ) -> AppResult<Vec<FeeTransaction>> {
            Ok(self.fees.clone())
        }

        async fn list_filtered(
            &self,
            _merchant_billing_id: Option<i32>,
            _fee_type: Option<FeeType>,
            _start_date: Option<DateTime<Utc>>,
            _end_date: Option<DateTime<Utc>>,
            _limit: i64,
            _offset: i64,
        ) -> AppResult<(Vec<FeeTransaction>, i64)> {
            Ok((vec![], 0))
        }

        async fn summarize(
            &self,
            _merchant_billing_id: Option<i32>,
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        ) -> AppResult<RevenueSummary> {
            Ok(RevenueSummary::empty(period_start, period_end))
        }
    }

    #[derive(Default)]
    struct MockInvoiceRepo {
        created: Mutex<Option<(Invoice, Vec<InvoiceItem>, Vec<i64>)>>,
    }

    #[async_trait]
    impl InvoiceRepository for MockInvoiceRepo {
        async fn find_by_id(&self, _id: i64) -> AppResult<Option<Invoice>> {
            Ok(None)
        }

        async fn find_by_number(&self, _invoice_number: &str) -> AppResult<Option<Invoice>> {
            Ok(None)
        }

        async fn items(&self, _invoice_id: i64) -> AppResult<Vec<InvoiceItem>> {
            Ok(vec![])
        }

        async fn list_for_config(
            &self,
            _merchant_billing_id: i32,
            _status: Option<InvoiceStatus>,
            _limit: i64,
            _offset: i64,
        ) -> AppResult<(Vec<Invoice>, i64)> {
            Ok((vec![], 0))
        }

        async fn create_with_items(
            &self,
            invoice: &Invoice,
            items: &[InvoiceItem],
            fee_transaction_ids: &[i64],
        ) -> AppResult<Invoice> {
            let mut created = invoice.clone();
            created.id = 42;
            *self.created.lock().unwrap() = Some((
                created.clone(),
                items.to_vec(),
                fee_transaction_ids.to_vec(),
            ));
            Ok(created)
        }

        async fn mark_paid(
            &self,
            _id: i64,
            _payment_reference: Option<&str>,
            _payment_method: Option<&str>,
        ) -> AppResult<Invoice> {
            Err(AppError::InvoiceNotFound("0".to_string()))
        }
    }

    fn fee(id: i64, fee_type: FeeType, amount: Decimal, domestic: bool) -> FeeTransaction {
        FeeTransaction {
            id,
            merchant_billing_id: 7,
            payment_transaction_id: Some(format!("TXN-{}", id)),
            fee_type,
            fee_amount: amount,
            fee_percentage: None,
            fixed_fee: None,
            original_amount: None,
            currency: "EUR".to_string(),
            is_domestic_card: domestic,
            is_invoiced: false,
            invoice_id: None,
            created_at: Utc::now(),
        }
    }

    fn config() -> MerchantBillingConfig {
        let mut c = MerchantBillingConfig::new_default("MRC001");
        c.id = 7;
        c
    }

    fn service(
        fees: Vec<FeeTransaction>,
    ) -> (
        InvoiceService<MockConfigRepo, MockFeeRepo, MockInvoiceRepo>,
        Arc<MockInvoiceRepo>,
    ) {
        let invoice_repo = Arc::new(MockInvoiceRepo::default());
        let svc = InvoiceService::new(
            Arc::new(MockConfigRepo { config: config() }),
            Arc::new(MockFeeRepo { fees }),
            Arc::clone(&invoice_repo),
        );
        (svc, invoice_repo)
    }

    #[tokio::test]
    async fn test_generate_invoice_groups_and_totals() {
        let fees = vec![
            fee(1, FeeType::TransactionFee, dec!(0.60), true),
            fee(2, FeeType::TransactionFee, dec!(0.55), true),
            fee(3, FeeType::TransactionFee, dec!(2.60), false),
            fee(4, FeeType::RefundFee, dec!(0.05), true),
        ];
        let (svc, repo) = service(fees);

        let start = Utc::now() - Duration::days(30);
        let end = Utc::now();
        let invoice = svc
            .generate_invoice("MRC001", start, end)
            .await
            .unwrap()
            .expect("invoice should be generated");

        assert_eq!(invoice.merchant_billing_id, 7);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.subtotal, dec!(3.80));
        assert_eq!(invoice.tax_amount, dec!(0.00));
        assert_eq!(invoice.total_amount, dec!(3.80));
        assert_eq!(
            invoice.due_date,
            Some(invoice.issued_date + Duration::days(30))
        );

        let (_, items, fee_ids) = repo.created.lock().unwrap().clone().unwrap();
        assert_eq!(fee_ids, vec![1, 2, 3, 4]);
        assert_eq!(items.len(), 3);

        assert_eq!(
            items[0].description,
            "Domestic Card Transaction Fees (2 transactions)"
        );
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].total_price, dec!(1.15));
        // 1.15 / 2 = 0.575, rounds half-up
        assert_eq!(items[0].unit_price, dec!(0.58));

        assert_eq!(
            items[1].description,
            "Foreign Card Transaction Fees (1 transactions)"
        );
        assert_eq!(items[1].total_price, dec!(2.60));

        assert_eq!(items[2].description, "Refund Fees (1 transactions)");
        assert_eq!(items[2].fee_type, FeeType::RefundFee);
    }

    #[tokio::test]
    async fn test_mixed_fee_kinds_split_into_three_items() {
        let fees = vec![
            fee(1, FeeType::TransactionFee, dec!(0.60), true),
            fee(2, FeeType::TransactionFee, dec!(2.60), false),
            fee(3, FeeType::RefundFee, dec!(0.05), true),
        ];
        let (svc, repo) = service(fees);

        let invoice = svc
            .generate_invoice("MRC001", Utc::now() - Duration::days(30), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(invoice.subtotal, dec!(3.25));
        assert_eq!(invoice.total_amount, dec!(3.25));

        let (_, items, _) = repo.created.lock().unwrap().clone().unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_generate_invoice_no_activity() {
        let (svc, repo) = service(vec![]);

        let result = svc
            .generate_invoice("MRC001", Utc::now() - Duration::days(30), Utc::now())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(repo.created.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_invoice_applies_tax() {
        let fees = vec![fee(1, FeeType::ChargebackFee, dec!(9.00), true)];
        let invoice_repo = Arc::new(MockInvoiceRepo::default());
        let svc = InvoiceService::new(
            Arc::new(MockConfigRepo { config: config() }),
            Arc::new(MockFeeRepo { fees }),
            Arc::clone(&invoice_repo),
        )
        .with_billing_settings(dec!(20.0), 14);

        let invoice = svc
            .generate_invoice("MRC001", Utc::now() - Duration::days(30), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(invoice.subtotal, dec!(9.00));
        assert_eq!(invoice.tax_amount, dec!(1.80));
        assert_eq!(invoice.total_amount, dec!(10.80));
        assert_eq!(
            invoice.due_date,
            Some(invoice.issued_date + Duration::days(14))
        );
    }

    #[test]
    fn test_invoice_number_format() {
        let issued = DateTime::parse_from_rfc3339("2025-03-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = generate_invoice_number(issued);

        assert!(number.starts_with("INV-20250315-"));
        assert_eq!(number.len(), "INV-20250315-".len() + 8);
        let suffix = &number["INV-20250315-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_invoice_numbers_are_unique() {
        let issued = Utc::now();
        let a = generate_invoice_number(issued);
        let b = generate_invoice_number(issued);
        assert_ne!(a, b);
    }

    #[test]
    fn test_group_fees_subtotal_matches_fee_sum() {
        let fees = vec![
            fee(1, FeeType::TransactionFee, dec!(0.60), true),
            fee(2, FeeType::TransactionFee, dec!(2.60), false),
            fee(3, FeeType::ChargebackFee, dec!(9.00), true),
            fee(4, FeeType::RefundFee, dec!(0.05), true),
            fee(5, FeeType::TransactionFee, dec!(0.31), true),
        ];

        let items = group_fees(&fees);
        let item_total: Decimal = items.iter().map(|i| i.total_price).sum();
        let fee_total: Decimal = fees.iter().map(|f| f.fee_amount).sum();
        assert_eq!(item_total, fee_total);
        assert_eq!(items.len(), 4);
    }
}
