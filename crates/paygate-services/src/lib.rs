//! Business logic services for the merchant billing system
//!
//! This crate contains the services that orchestrate billing operations on
//! top of the repository traits:
//!
//! - `InvoiceService` - sweeps un-invoiced fees into invoices with grouped
//!   line items
//! - `AutoBillingService` - walks auto-billing-enabled merchants and
//!   generates invoices on their cadence
//!
//! Services are generic over the repository traits and wrapped in Arc for
//! sharing across async tasks. All operations are instrumented with tracing
//! and report failures through AppError.

pub mod auto_billing;
pub mod invoicing;

pub use auto_billing::AutoBillingService;
pub use invoicing::InvoiceService;
