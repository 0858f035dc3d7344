//! Credit evaluator: resolves limits through the record store and evaluates them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillcredit_core::{CompanyId, CustomerId, DateRange, DomainError};

use crate::error::CreditResult;
use crate::policy::{CreditPolicy, CustomerLimit, EffectiveLimit};
use crate::snapshot::{CreditCheck, CreditSnapshot};
use crate::store::{CreditRecordStore, CustomerRecord, OutstandingBreakdown, OutstandingQuery};

/// Service-wide defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditSettings {
    /// Count submitted-but-unbilled sales orders towards the outstanding amount.
    pub include_unbilled: bool,
}

/// Per-request options for summaries and checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    pub company: Option<CompanyId>,
    /// Overrides [`CreditSettings::include_unbilled`] when set.
    pub include_unbilled: Option<bool>,
    pub range: DateRange,
}

/// Policy and evaluation for one company, as returned by `credit_summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub policy: CreditPolicy,
    pub snapshot: CreditSnapshot,
    pub outstanding: OutstandingBreakdown,
    pub includes_unbilled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRemoval {
    pub customer: CustomerId,
    pub company: CompanyId,
    /// False when there was no override to clear.
    pub removed: bool,
}

pub struct CreditEvaluator<S> {
    store: S,
    settings: CreditSettings,
}

impl<S> CreditEvaluator<S>
where
    S: CreditRecordStore,
{
    pub fn new(store: S, settings: CreditSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> CreditSettings {
        self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Customer override, then group limit, then company default.
    pub async fn resolve_effective_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> CreditResult<CreditPolicy> {
        let record = self.require_customer(customer).await?;
        self.require_company(company).await?;
        self.resolve_for(record, company).await
    }

    /// Evaluates a caller-supplied outstanding amount against the resolved limit.
    pub async fn evaluate(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        outstanding_amount: Decimal,
    ) -> CreditResult<CreditSnapshot> {
        let policy = self.resolve_effective_limit(customer, company).await?;
        let snapshot = CreditSnapshot::compute(&policy, outstanding_amount)?;
        tracing::debug!(
            customer = %customer,
            company = %company,
            outstanding = %outstanding_amount,
            over_limit = snapshot.is_over_limit,
            "credit evaluated"
        );
        Ok(snapshot)
    }

    /// One summary for the requested company, or one per known company.
    pub async fn credit_summary(
        &self,
        customer: &CustomerId,
        options: &SummaryOptions,
    ) -> CreditResult<Vec<CreditSummary>> {
        let record = self.require_customer(customer).await?;
        let companies = match &options.company {
            Some(company) => {
                self.require_company(company).await?;
                vec![company.clone()]
            }
            None => self.store.companies().await?,
        };

        let include_unbilled = options.include_unbilled.unwrap_or(self.settings.include_unbilled);
        let query = OutstandingQuery { range: options.range };

        let mut summaries = Vec::with_capacity(companies.len());
        for company in &companies {
            let policy = self.resolve_for(record.clone(), company).await?;
            let outstanding = self
                .store
                .outstanding(customer, company, &query)
                .await?
                .validate()?;
            let snapshot = CreditSnapshot::compute(&policy, outstanding.total(include_unbilled))?;
            summaries.push(CreditSummary {
                policy,
                snapshot,
                outstanding,
                includes_unbilled: include_unbilled,
            });
        }
        Ok(summaries)
    }

    /// Stores a customer-level override; a zero limit clears it.
    pub async fn set_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        limit: Decimal,
        bypass_check: bool,
    ) -> CreditResult<CreditPolicy> {
        let override_limit = CustomerLimit::new(limit, bypass_check)?;
        let record = self.require_customer(customer).await?;
        self.require_company(company).await?;

        if limit.is_zero() {
            let removed = self.store.clear_customer_limit(customer, company).await?;
            tracing::info!(customer = %customer, company = %company, removed, "customer credit limit cleared");
            return self.resolve_for(record, company).await;
        }

        if !bypass_check {
            let outstanding = self
                .store
                .outstanding(customer, company, &OutstandingQuery::default())
                .await?
                .validate()?
                .total(self.settings.include_unbilled);
            if limit < outstanding {
                return Err(DomainError::validation(format!(
                    "credit limit {limit} is below the current outstanding amount {outstanding}; \
                     set bypass_check to override"
                ))
                .into());
            }
        }

        self.store.put_customer_limit(customer, company, override_limit).await?;
        tracing::info!(
            customer = %customer,
            company = %company,
            limit = %limit,
            bypass_check,
            "customer credit limit set"
        );
        self.resolve_for(record, company).await
    }

    pub async fn remove_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> CreditResult<LimitRemoval> {
        self.require_customer(customer).await?;
        self.require_company(company).await?;

        let removed = self.store.clear_customer_limit(customer, company).await?;
        tracing::info!(customer = %customer, company = %company, removed, "customer credit limit removed");
        Ok(LimitRemoval {
            customer: customer.clone(),
            company: company.clone(),
            removed,
        })
    }

    /// Would a new credit sale of `amount` stay within the limit?
    pub async fn check_transaction(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        amount: Decimal,
        include_unbilled: Option<bool>,
    ) -> CreditResult<CreditCheck> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation(format!("amount must not be negative (got {amount})")).into());
        }

        let policy = self.resolve_effective_limit(customer, company).await?;
        let outstanding = self
            .store
            .outstanding(customer, company, &OutstandingQuery::default())
            .await?
            .validate()?
            .total(include_unbilled.unwrap_or(self.settings.include_unbilled));

        let check = CreditCheck::compute(policy.effective_limit, outstanding, amount)?;
        if !check.allowed {
            tracing::info!(
                customer = %customer,
                company = %company,
                amount = %amount,
                shortfall = %check.shortfall,
                "credit sale would exceed limit"
            );
        }
        Ok(check)
    }

    async fn require_customer(&self, customer: &CustomerId) -> CreditResult<CustomerRecord> {
        self.store
            .customer(customer)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("customer '{customer}'")).into())
    }

    async fn require_company(&self, company: &CompanyId) -> CreditResult<()> {
        if self.store.company_exists(company).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("company '{company}'")).into())
        }
    }

    async fn resolve_for(&self, record: CustomerRecord, company: &CompanyId) -> CreditResult<CreditPolicy> {
        let limits = self.store.configured_limits(&record, company).await?;

        let policy = CreditPolicy::resolve(
            record.id,
            company.clone(),
            record.customer_group,
            limits.customer,
            limits.group,
            limits.company,
        );
        if policy.effective_limit == EffectiveLimit::Unlimited {
            tracing::debug!(customer = %policy.customer, company = %company, "no credit limit configured");
        }
        Ok(policy)
    }
}
