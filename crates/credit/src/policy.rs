//! Credit limit hierarchy and its resolution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillcredit_core::{CompanyId, CustomerGroupId, CustomerId, DomainError, DomainResult};

/// Level of the override hierarchy a limit was configured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitLevel {
    Customer,
    Group,
    Company,
}

/// The limit actually applied after hierarchy resolution.
///
/// `Unlimited` is its own variant: a zero limit is never stored as the
/// effective value, so nothing downstream can mistake "no limit" for
/// "no credit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EffectiveLimit {
    Unlimited,
    Finite { amount: Decimal, source: LimitLevel },
}

impl EffectiveLimit {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            EffectiveLimit::Unlimited => None,
            EffectiveLimit::Finite { amount, .. } => Some(*amount),
        }
    }

    pub fn source(&self) -> Option<LimitLevel> {
        match self {
            EffectiveLimit::Unlimited => None,
            EffectiveLimit::Finite { source, .. } => Some(*source),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, EffectiveLimit::Unlimited)
    }
}

/// Raw limits as configured at each level (before precedence is applied).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitLevels {
    pub customer: Option<Decimal>,
    pub group: Option<Decimal>,
    pub company: Option<Decimal>,
}

impl LimitLevels {
    /// First level whose limit is present and strictly positive wins.
    pub fn resolve(&self) -> EffectiveLimit {
        [
            (LimitLevel::Customer, self.customer),
            (LimitLevel::Group, self.group),
            (LimitLevel::Company, self.company),
        ]
        .into_iter()
        .find_map(|(source, limit)| {
            limit
                .filter(|amount| *amount > Decimal::ZERO)
                .map(|amount| EffectiveLimit::Finite { amount, source })
        })
        .unwrap_or(EffectiveLimit::Unlimited)
    }
}

/// Customer-level override as persisted by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerLimit {
    pub amount: Decimal,
    /// Set when the override was accepted below the outstanding amount at the time.
    pub bypass_check: bool,
}

impl CustomerLimit {
    pub fn new(amount: Decimal, bypass_check: bool) -> DomainResult<Self> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "credit limit must not be negative (got {amount})"
            )));
        }
        Ok(Self { amount, bypass_check })
    }
}

/// Resolved credit configuration for a (customer, company) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPolicy {
    pub customer: CustomerId,
    pub company: CompanyId,
    pub customer_group: Option<CustomerGroupId>,
    pub customer_limit: Option<Decimal>,
    pub group_limit: Option<Decimal>,
    pub company_limit: Option<Decimal>,
    pub effective_limit: EffectiveLimit,
    pub bypass_check: bool,
}

impl CreditPolicy {
    pub fn resolve(
        customer: CustomerId,
        company: CompanyId,
        customer_group: Option<CustomerGroupId>,
        customer_override: Option<CustomerLimit>,
        group_limit: Option<Decimal>,
        company_limit: Option<Decimal>,
    ) -> Self {
        let levels = LimitLevels {
            customer: customer_override.map(|l| l.amount),
            group: group_limit,
            company: company_limit,
        };

        Self {
            customer,
            company,
            customer_group,
            customer_limit: levels.customer,
            group_limit: levels.group,
            company_limit: levels.company,
            effective_limit: levels.resolve(),
            bypass_check: customer_override.is_some_and(|l| l.bypass_check),
        }
    }

    pub fn levels(&self) -> LimitLevels {
        LimitLevels {
            customer: self.customer_limit,
            group: self.group_limit,
            company: self.company_limit,
        }
    }
}
