//! Ports to the external record store and transaction history.
//!
//! Implementations live in `tillcredit-infra`; tests use fixed fixtures.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillcredit_core::{CompanyId, CustomerGroupId, CustomerId, DateRange};

use crate::error::StoreError;
use crate::history::{HistoryFilter, HistoryPage, Pagination};
use crate::policy::CustomerLimit;

/// Customer as seen by credit evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub customer_group: Option<CustomerGroupId>,
}

/// Scope of an outstanding-amount aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutstandingQuery {
    /// Posting/transaction date window the documents must fall in.
    pub range: DateRange,
}

/// Outstanding obligations split by origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingBreakdown {
    /// Unpaid and partly paid receivable documents.
    pub receivables: Decimal,
    /// Submitted sales orders not yet invoiced.
    pub unbilled: Decimal,
}

impl OutstandingBreakdown {
    pub fn total(&self, include_unbilled: bool) -> Decimal {
        if include_unbilled {
            self.receivables.saturating_add(self.unbilled)
        } else {
            self.receivables
        }
    }

    /// Rejects totals no correct aggregation can produce.
    pub fn validate(self) -> Result<Self, StoreError> {
        if self.receivables < Decimal::ZERO || self.unbilled < Decimal::ZERO {
            return Err(StoreError::Malformed(format!(
                "negative outstanding total (receivables={}, unbilled={})",
                self.receivables, self.unbilled
            )));
        }
        Ok(self)
    }
}

/// Limits configured at each level for one (customer, company) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfiguredLimits {
    pub customer: Option<CustomerLimit>,
    pub group: Option<Decimal>,
    pub company: Option<Decimal>,
}

/// Read-through accessor for customers, limits and receivable totals.
#[async_trait::async_trait]
pub trait CreditRecordStore: Send + Sync {
    async fn customer(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, StoreError>;

    async fn company_exists(&self, id: &CompanyId) -> Result<bool, StoreError>;

    /// All companies, ordered by name.
    async fn companies(&self) -> Result<Vec<CompanyId>, StoreError>;

    async fn customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<Option<CustomerLimit>, StoreError>;

    async fn put_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        limit: CustomerLimit,
    ) -> Result<(), StoreError>;

    /// Returns whether an override existed.
    async fn clear_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<bool, StoreError>;

    async fn group_limit(
        &self,
        group: &CustomerGroupId,
        company: &CompanyId,
    ) -> Result<Option<Decimal>, StoreError>;

    async fn company_limit(&self, company: &CompanyId) -> Result<Option<Decimal>, StoreError>;

    /// Reads all three levels. Stores that can do it in one round trip override this.
    async fn configured_limits(
        &self,
        customer: &CustomerRecord,
        company: &CompanyId,
    ) -> Result<ConfiguredLimits, StoreError> {
        let customer_limit = self.customer_limit(&customer.id, company).await?;
        let group = match &customer.customer_group {
            Some(group) => self.group_limit(group, company).await?,
            None => None,
        };
        Ok(ConfiguredLimits {
            customer: customer_limit,
            group,
            company: self.company_limit(company).await?,
        })
    }

    async fn outstanding(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        query: &OutstandingQuery,
    ) -> Result<OutstandingBreakdown, StoreError>;
}

/// Chronological invoice/payment history for reporting callers.
#[async_trait::async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn transactions(
        &self,
        customer: &CustomerId,
        company: Option<&CompanyId>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError>;
}

#[async_trait::async_trait]
impl<S> CreditRecordStore for Arc<S>
where
    S: CreditRecordStore + ?Sized,
{
    async fn customer(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, StoreError> {
        (**self).customer(id).await
    }

    async fn company_exists(&self, id: &CompanyId) -> Result<bool, StoreError> {
        (**self).company_exists(id).await
    }

    async fn companies(&self) -> Result<Vec<CompanyId>, StoreError> {
        (**self).companies().await
    }

    async fn customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<Option<CustomerLimit>, StoreError> {
        (**self).customer_limit(customer, company).await
    }

    async fn put_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        limit: CustomerLimit,
    ) -> Result<(), StoreError> {
        (**self).put_customer_limit(customer, company, limit).await
    }

    async fn clear_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<bool, StoreError> {
        (**self).clear_customer_limit(customer, company).await
    }

    async fn group_limit(
        &self,
        group: &CustomerGroupId,
        company: &CompanyId,
    ) -> Result<Option<Decimal>, StoreError> {
        (**self).group_limit(group, company).await
    }

    async fn company_limit(&self, company: &CompanyId) -> Result<Option<Decimal>, StoreError> {
        (**self).company_limit(company).await
    }

    async fn configured_limits(
        &self,
        customer: &CustomerRecord,
        company: &CompanyId,
    ) -> Result<ConfiguredLimits, StoreError> {
        (**self).configured_limits(customer, company).await
    }

    async fn outstanding(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        query: &OutstandingQuery,
    ) -> Result<OutstandingBreakdown, StoreError> {
        (**self).outstanding(customer, company, query).await
    }
}

#[async_trait::async_trait]
impl<H> HistoryProvider for Arc<H>
where
    H: HistoryProvider + ?Sized,
{
    async fn transactions(
        &self,
        customer: &CustomerId,
        company: Option<&CompanyId>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError> {
        (**self).transactions(customer, company, filter, pagination).await
    }
}
