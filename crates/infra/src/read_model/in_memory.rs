use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use tillcredit_core::{CompanyId, CustomerGroupId, CustomerId};
use tillcredit_credit::{
    CreditRecordStore, CustomerLimit, CustomerRecord, HistoryFilter, HistoryPage, HistoryProvider,
    OutstandingBreakdown, OutstandingQuery, Pagination, StoreError,
};

use super::fixture::{CreditFixture, FixtureError, InvoiceRecord, PaymentRecord, SalesOrderRecord};

#[derive(Debug, Default)]
struct State {
    customers: HashMap<CustomerId, CustomerRecord>,
    /// Ordered by name so `companies()` needs no sort.
    companies: BTreeMap<CompanyId, Option<Decimal>>,
    group_limits: HashMap<(CustomerGroupId, CompanyId), Decimal>,
    customer_limits: HashMap<(CustomerId, CompanyId), CustomerLimit>,
    invoices: Vec<InvoiceRecord>,
    payments: Vec<PaymentRecord>,
    sales_orders: Vec<SalesOrderRecord>,
}

/// In-memory record store for tests/dev, seeded from a [`CreditFixture`].
#[derive(Debug, Default)]
pub struct InMemoryCreditStore {
    inner: RwLock<State>,
}

impl InMemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: CreditFixture) -> Result<Self, FixtureError> {
        fixture.validate()?;

        let mut state = State::default();
        for company in fixture.companies {
            state.companies.insert(company.name, company.credit_limit);
        }
        for group in fixture.customer_groups {
            for limit in group.credit_limits {
                state
                    .group_limits
                    .insert((group.name.clone(), limit.company), limit.credit_limit);
            }
        }
        for customer in fixture.customers {
            for limit in customer.credit_limits {
                let value = CustomerLimit::new(limit.credit_limit, limit.bypass_check)
                    .map_err(|e| FixtureError::Invalid(e.to_string()))?;
                state
                    .customer_limits
                    .insert((customer.name.clone(), limit.company), value);
            }
            state.customers.insert(
                customer.name.clone(),
                CustomerRecord {
                    id: customer.name,
                    customer_group: customer.customer_group,
                },
            );
        }
        state.invoices = fixture.invoices;
        state.payments = fixture.payments;
        state.sales_orders = fixture.sales_orders;

        tracing::debug!(
            customers = state.customers.len(),
            companies = state.companies.len(),
            invoices = state.invoices.len(),
            "in-memory credit store seeded"
        );
        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl CreditRecordStore for InMemoryCreditStore {
    async fn customer(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, StoreError> {
        Ok(self.read()?.customers.get(id).cloned())
    }

    async fn company_exists(&self, id: &CompanyId) -> Result<bool, StoreError> {
        Ok(self.read()?.companies.contains_key(id))
    }

    async fn companies(&self) -> Result<Vec<CompanyId>, StoreError> {
        Ok(self.read()?.companies.keys().cloned().collect())
    }

    async fn customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<Option<CustomerLimit>, StoreError> {
        let state = self.read()?;
        Ok(state
            .customer_limits
            .get(&(customer.clone(), company.clone()))
            .copied())
    }

    async fn put_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        limit: CustomerLimit,
    ) -> Result<(), StoreError> {
        self.write()?
            .customer_limits
            .insert((customer.clone(), company.clone()), limit);
        Ok(())
    }

    async fn clear_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .write()?
            .customer_limits
            .remove(&(customer.clone(), company.clone()))
            .is_some())
    }

    async fn group_limit(
        &self,
        group: &CustomerGroupId,
        company: &CompanyId,
    ) -> Result<Option<Decimal>, StoreError> {
        let state = self.read()?;
        Ok(state.group_limits.get(&(group.clone(), company.clone())).copied())
    }

    async fn company_limit(&self, company: &CompanyId) -> Result<Option<Decimal>, StoreError> {
        Ok(self.read()?.companies.get(company).copied().flatten())
    }

    async fn outstanding(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        query: &OutstandingQuery,
    ) -> Result<OutstandingBreakdown, StoreError> {
        let state = self.read()?;
        let receivables = state
            .invoices
            .iter()
            .filter(|i| &i.customer == customer && &i.company == company)
            .filter(|i| query.range.contains(i.posting_date))
            .map(InvoiceRecord::open_amount)
            .sum();
        let unbilled = state
            .sales_orders
            .iter()
            .filter(|o| &o.customer == customer && &o.company == company)
            .filter(|o| query.range.contains(o.transaction_date))
            .map(SalesOrderRecord::unbilled_amount)
            .sum();
        Ok(OutstandingBreakdown {
            receivables,
            unbilled,
        })
    }
}

#[async_trait::async_trait]
impl HistoryProvider for InMemoryCreditStore {
    async fn transactions(
        &self,
        customer: &CustomerId,
        company: Option<&CompanyId>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError> {
        let state = self.read()?;
        let in_scope = |c: &CustomerId, co: &CompanyId| c == customer && company.is_none_or(|want| want == co);

        let scoped: Vec<_> = state
            .invoices
            .iter()
            .filter(|i| in_scope(&i.customer, &i.company))
            .map(InvoiceRecord::to_ledger)
            .chain(
                state
                    .payments
                    .iter()
                    .filter(|p| in_scope(&p.customer, &p.company))
                    .map(PaymentRecord::to_ledger),
            )
            .collect();

        Ok(HistoryPage::from_transactions(scoped, filter, pagination))
    }
}
