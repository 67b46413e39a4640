//! Data transfer objects for the billing API

pub mod billing;
pub mod common;
pub mod fee;
pub mod invoice;

pub use common::{ApiResponse, PaginationParams};
