//! Paygate Billing Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the merchant billing system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for billing configs, fee transactions and invoices
//! - Transaction support for atomic fee recording and invoice sweeps

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use paygate_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
