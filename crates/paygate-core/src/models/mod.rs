//! Domain models for PayGate billing
//!
//! This module contains all the core domain models used throughout the application.

pub mod billing_config;
pub mod fee;
pub mod invoice;
pub mod payment;
pub mod summary;

pub use billing_config::{
    calculate_fee, round_money, BillingCycle, FeeSchedule, MerchantBillingConfig,
};
pub use fee::{FeeTransaction, FeeType};
pub use invoice::{Invoice, InvoiceItem, InvoiceStatus};
pub use payment::PaymentRef;
pub use summary::RevenueSummary;
