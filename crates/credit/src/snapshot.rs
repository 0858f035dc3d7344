//! Point-in-time credit evaluation (pure arithmetic over resolved inputs).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use tillcredit_core::{CompanyId, CustomerId, DomainError, DomainResult};

use crate::policy::{CreditPolicy, EffectiveLimit};

/// Decimal places kept on utilization percentages.
pub const UTILIZATION_DP: u32 = 2;

/// Remaining headroom under the effective limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum AvailableCredit {
    Unbounded,
    /// May be negative when the customer is over the limit.
    Amount(Decimal),
}

impl AvailableCredit {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            AvailableCredit::Unbounded => None,
            AvailableCredit::Amount(a) => Some(*a),
        }
    }
}

/// Evaluation result for one (customer, company) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSnapshot {
    pub customer: CustomerId,
    pub company: CompanyId,
    pub effective_limit: EffectiveLimit,
    pub outstanding_amount: Decimal,
    pub available_credit: AvailableCredit,
    pub utilization_percent: Decimal,
    pub is_over_limit: bool,
}

impl CreditSnapshot {
    /// Deterministic: same policy and outstanding amount, same snapshot.
    pub fn compute(policy: &CreditPolicy, outstanding_amount: Decimal) -> DomainResult<Self> {
        ensure_non_negative("outstanding_amount", outstanding_amount)?;

        let limit = policy.effective_limit;
        let available_credit = match limit.amount() {
            None => AvailableCredit::Unbounded,
            Some(amount) => AvailableCredit::Amount(
                amount
                    .checked_sub(outstanding_amount)
                    .ok_or_else(|| DomainError::validation("available credit out of range"))?,
            ),
        };

        Ok(Self {
            customer: policy.customer.clone(),
            company: policy.company.clone(),
            effective_limit: limit,
            outstanding_amount,
            available_credit,
            utilization_percent: utilization_percent(outstanding_amount, limit)?,
            is_over_limit: limit.amount().is_some_and(|amount| outstanding_amount > amount),
        })
    }
}

/// Would a new credit sale fit under the limit?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCheck {
    pub allowed: bool,
    pub amount: Decimal,
    pub effective_limit: EffectiveLimit,
    pub current_outstanding: Decimal,
    pub projected_outstanding: Decimal,
    pub projected_utilization_percent: Decimal,
    /// How far the sale would exceed the limit; zero when allowed.
    pub shortfall: Decimal,
}

impl CreditCheck {
    pub fn compute(
        limit: EffectiveLimit,
        current_outstanding: Decimal,
        amount: Decimal,
    ) -> DomainResult<Self> {
        ensure_non_negative("outstanding_amount", current_outstanding)?;
        ensure_non_negative("amount", amount)?;

        let projected = current_outstanding
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("projected outstanding out of range"))?;

        let shortfall = match limit.amount() {
            Some(cap) if projected > cap => projected - cap,
            _ => Decimal::ZERO,
        };

        Ok(Self {
            allowed: shortfall.is_zero(),
            amount,
            effective_limit: limit,
            current_outstanding,
            projected_outstanding: projected,
            projected_utilization_percent: utilization_percent(projected, limit)?,
            shortfall,
        })
    }
}

/// `outstanding / limit × 100`, rounded to [`UTILIZATION_DP`] places; zero when unlimited.
pub fn utilization_percent(outstanding: Decimal, limit: EffectiveLimit) -> DomainResult<Decimal> {
    let amount = match limit.amount() {
        Some(a) if a > Decimal::ZERO => a,
        _ => return Ok(Decimal::ZERO),
    };
    if outstanding.is_zero() {
        return Ok(Decimal::ZERO);
    }

    outstanding
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(amount))
        .map(|pct| pct.round_dp_with_strategy(UTILIZATION_DP, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| DomainError::validation("utilization out of range"))
}

fn ensure_non_negative(field: &str, value: Decimal) -> DomainResult<()> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CustomerLimit, LimitLevel};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn policy(customer_limit: Option<Decimal>, group: Option<Decimal>, company: Option<Decimal>) -> CreditPolicy {
        CreditPolicy::resolve(
            CustomerId::new("Walk-In").unwrap(),
            CompanyId::new("Acme Retail").unwrap(),
            None,
            customer_limit.map(|a| CustomerLimit::new(a, false).unwrap()),
            group,
            company,
        )
    }

    #[test]
    fn over_limit_customer() {
        let snap = CreditSnapshot::compute(&policy(Some(dec!(1000)), None, None), dec!(1200)).unwrap();
        assert!(snap.is_over_limit);
        assert_eq!(snap.utilization_percent, dec!(120.0));
        assert_eq!(snap.available_credit, AvailableCredit::Amount(dec!(-200)));
    }

    #[test]
    fn group_limit_scenario() {
        let snap = CreditSnapshot::compute(&policy(None, Some(dec!(5000)), Some(dec!(10000))), dec!(3000))
            .unwrap();
        assert_eq!(
            snap.effective_limit,
            EffectiveLimit::Finite { amount: dec!(5000), source: LimitLevel::Group }
        );
        assert_eq!(snap.available_credit, AvailableCredit::Amount(dec!(2000)));
        assert_eq!(snap.utilization_percent, dec!(60.0));
        assert!(!snap.is_over_limit);
    }

    #[test]
    fn exactly_at_limit_is_not_over() {
        let snap = CreditSnapshot::compute(&policy(Some(dec!(1000)), None, None), dec!(1000)).unwrap();
        assert!(!snap.is_over_limit);
        assert_eq!(snap.available_credit.amount(), Some(Decimal::ZERO));
        assert_eq!(snap.utilization_percent, dec!(100));
    }

    #[test]
    fn unlimited_reports_unbounded_credit() {
        let snap = CreditSnapshot::compute(&policy(None, None, None), dec!(999999)).unwrap();
        assert_eq!(snap.available_credit, AvailableCredit::Unbounded);
        assert_eq!(snap.utilization_percent, Decimal::ZERO);
        assert!(!snap.is_over_limit);
    }

    #[test]
    fn utilization_is_rounded_to_two_places() {
        let snap = CreditSnapshot::compute(&policy(Some(dec!(3)), None, None), dec!(1)).unwrap();
        assert_eq!(snap.utilization_percent, dec!(33.33));

        let snap = CreditSnapshot::compute(&policy(Some(dec!(3)), None, None), dec!(2)).unwrap();
        assert_eq!(snap.utilization_percent, dec!(66.67));
    }

    #[test]
    fn negative_outstanding_is_rejected() {
        let err = CreditSnapshot::compute(&policy(Some(dec!(100)), None, None), dec!(-1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("outstanding_amount")));
    }

    #[test]
    fn check_blocks_sale_that_would_exceed_limit() {
        let limit = EffectiveLimit::Finite { amount: dec!(1000), source: LimitLevel::Customer };
        let check = CreditCheck::compute(limit, dec!(800), dec!(250)).unwrap();
        assert!(!check.allowed);
        assert_eq!(check.projected_outstanding, dec!(1050));
        assert_eq!(check.shortfall, dec!(50));
        assert_eq!(check.projected_utilization_percent, dec!(105));
    }

    #[test]
    fn check_allows_sale_up_to_the_limit() {
        let limit = EffectiveLimit::Finite { amount: dec!(1000), source: LimitLevel::Company };
        let check = CreditCheck::compute(limit, dec!(800), dec!(200)).unwrap();
        assert!(check.allowed);
        assert_eq!(check.shortfall, Decimal::ZERO);
    }

    #[test]
    fn check_always_allows_unlimited() {
        let check = CreditCheck::compute(EffectiveLimit::Unlimited, dec!(1_000_000), dec!(1_000_000)).unwrap();
        assert!(check.allowed);
        assert_eq!(check.projected_utilization_percent, Decimal::ZERO);
    }

    #[test]
    fn check_rejects_negative_amount() {
        assert!(CreditCheck::compute(EffectiveLimit::Unlimited, Decimal::ZERO, dec!(-10)).is_err());
    }

    #[test]
    fn available_credit_serializes_tagged() {
        let json = serde_json::to_value(AvailableCredit::Amount(dec!(2000))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "amount", "amount": "2000"}));
        let json = serde_json::to_value(AvailableCredit::Unbounded).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "unbounded"}));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Zero outstanding never shows utilization or an over-limit state.
        #[test]
        fn zero_outstanding_is_never_over_limit(limit_cents in proptest::option::of(0i64..100_000_000i64)) {
            let p = policy(limit_cents.map(|c| Decimal::new(c, 2)), None, None);
            let snap = CreditSnapshot::compute(&p, Decimal::ZERO).unwrap();
            prop_assert_eq!(snap.utilization_percent, Decimal::ZERO);
            prop_assert!(!snap.is_over_limit);
        }

        /// Without any limit configured nothing is ever over limit.
        #[test]
        fn unlimited_is_never_over_limit(outstanding_cents in 0i64..i64::MAX / 4) {
            let snap = CreditSnapshot::compute(&policy(None, None, None), Decimal::new(outstanding_cents, 2)).unwrap();
            prop_assert!(!snap.is_over_limit);
            prop_assert_eq!(snap.available_credit, AvailableCredit::Unbounded);
        }

        /// available + outstanding always reconstructs the limit.
        #[test]
        fn available_plus_outstanding_is_the_limit(
            limit_cents in 1i64..100_000_000i64,
            outstanding_cents in 0i64..200_000_000i64,
        ) {
            let limit = Decimal::new(limit_cents, 2);
            let outstanding = Decimal::new(outstanding_cents, 2);
            let snap = CreditSnapshot::compute(&policy(Some(limit), None, None), outstanding).unwrap();
            prop_assert_eq!(snap.available_credit.amount().unwrap() + outstanding, limit);
            prop_assert_eq!(snap.is_over_limit, outstanding > limit);
        }
    }
}
