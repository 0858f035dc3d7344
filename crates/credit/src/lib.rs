//! Credit evaluation for point-of-sale customers.
//!
//! Resolves the effective credit limit for a (customer, company) pair through
//! the customer → customer group → company override hierarchy, and derives
//! utilization metrics from the customer's outstanding receivables. All
//! records are read through the ports in [`store`]; nothing here does IO
//! directly.

pub mod error;
pub mod evaluator;
pub mod history;
pub mod policy;
pub mod snapshot;
pub mod store;

pub use error::{CreditError, CreditResult, ErrorKind, StoreError};
pub use evaluator::{CreditEvaluator, CreditSettings, CreditSummary, LimitRemoval, SummaryOptions};
pub use history::{
    DocumentStatus, HistoryFilter, HistoryPage, HistoryReader, LedgerTransaction, Pagination,
    VoucherType,
};
pub use policy::{CreditPolicy, CustomerLimit, EffectiveLimit, LimitLevel, LimitLevels};
pub use snapshot::{AvailableCredit, CreditCheck, CreditSnapshot};
pub use store::{
    ConfiguredLimits, CreditRecordStore, CustomerRecord, HistoryProvider, OutstandingBreakdown, OutstandingQuery,
};
