//! Repository implementations for PostgreSQL

pub mod billing_config_repo;
pub mod fee_transaction_repo;
pub mod invoice_repo;

pub use billing_config_repo::PgBillingConfigRepository;
pub use fee_transaction_repo::PgFeeTransactionRepository;
pub use invoice_repo::PgInvoiceRepository;
