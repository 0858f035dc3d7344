//! `tillcredit-core`: shared domain primitives.
//!
//! Pure types only (no IO, no storage, no HTTP).

pub mod date_range;
pub mod error;
pub mod id;

pub use date_range::DateRange;
pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, CustomerGroupId, CustomerId};
