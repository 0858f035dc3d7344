//! Customer, limit and receivable read models behind the credit store ports.

pub mod fixture;
pub mod in_memory;
pub mod postgres;

pub use fixture::{CreditFixture, FixtureError};
pub use in_memory::InMemoryCreditStore;
pub use postgres::PostgresCreditStore;
