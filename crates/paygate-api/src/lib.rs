//! API layer for the merchant billing system
//!
//! HTTP handlers and DTOs for billing configuration, fee transactions,
//! invoices, revenue summaries, and the automatic billing trigger.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::{ApiResponse, PaginationParams};

// Re-export handler configuration functions
pub use handlers::{configure_billing, health};
