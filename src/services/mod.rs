//! Business logic services

pub mod customer_export;
pub mod customer_import;
pub mod rate_limiter;
pub mod slug;
