//! Infrastructure layer: record store adapters for credit evaluation.

pub mod read_model;

pub use read_model::{
    CreditFixture, FixtureError, InMemoryCreditStore, PostgresCreditStore,
};
