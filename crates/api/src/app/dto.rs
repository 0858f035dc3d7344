use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use tillcredit_core::{DateRange, DomainResult};
use tillcredit_credit::{
    CreditCheck, CreditPolicy, CreditSummary, DocumentStatus, EffectiveLimit, HistoryFilter,
    HistoryPage, LedgerTransaction, LimitRemoval, Pagination, VoucherType,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditSummaryQuery {
    pub company: Option<String>,
    pub include_unbilled: Option<bool>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetCreditLimitRequest {
    pub limit: Decimal,
    #[serde(default)]
    pub bypass_check: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditCheckRequest {
    pub amount: Decimal,
    pub include_unbilled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditHistoryQuery {
    pub company: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub voucher_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl CreditHistoryQuery {
    /// Validates the date range and parses the status and voucher type filters.
    pub fn filter(&self) -> DomainResult<HistoryFilter> {
        Ok(HistoryFilter {
            range: DateRange::new(self.from_date, self.to_date)?,
            status: self.status.as_deref().map(str::parse::<DocumentStatus>).transpose()?,
            voucher_type: self.voucher_type.as_deref().map(str::parse::<VoucherType>).transpose()?,
        })
    }

    pub fn pagination(&self) -> DomainResult<Pagination> {
        Pagination::new(self.limit, self.offset)
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

fn amount(value: Option<Decimal>) -> Value {
    value.map_or(Value::Null, |d| json!(d.to_string()))
}

fn limit_fields(limit: &EffectiveLimit) -> (Value, Value) {
    (
        amount(limit.amount()),
        limit.source().map_or(Value::Null, |s| json!(s)),
    )
}

pub fn policy_to_json(p: &CreditPolicy) -> Value {
    let (credit_limit, limit_source) = limit_fields(&p.effective_limit);
    json!({
        "customer": p.customer.as_str(),
        "company": p.company.as_str(),
        "customer_group": p.customer_group.as_ref().map(|g| g.as_str()),
        "credit_limit": credit_limit,
        "limit_source": limit_source,
        "unlimited": p.effective_limit.is_unlimited(),
        "customer_limit": amount(p.customer_limit),
        "group_limit": amount(p.group_limit),
        "company_limit": amount(p.company_limit),
        "bypass_check": p.bypass_check,
    })
}

pub fn summary_to_json(s: &CreditSummary) -> Value {
    let mut out = policy_to_json(&s.policy);
    let snap = &s.snapshot;
    if let Value::Object(map) = &mut out {
        map.insert("outstanding_amount".into(), json!(snap.outstanding_amount.to_string()));
        map.insert("receivables".into(), json!(s.outstanding.receivables.to_string()));
        map.insert("unbilled".into(), json!(s.outstanding.unbilled.to_string()));
        map.insert("includes_unbilled".into(), json!(s.includes_unbilled));
        map.insert("available_credit".into(), amount(snap.available_credit.amount()));
        map.insert("utilization_percent".into(), json!(snap.utilization_percent.to_string()));
        map.insert("is_over_limit".into(), json!(snap.is_over_limit));
    }
    out
}

pub fn removal_to_json(r: &LimitRemoval) -> Value {
    json!({
        "customer": r.customer.as_str(),
        "company": r.company.as_str(),
        "removed": r.removed,
    })
}

pub fn check_to_json(c: &CreditCheck) -> Value {
    let (credit_limit, limit_source) = limit_fields(&c.effective_limit);
    json!({
        "allowed": c.allowed,
        "amount": c.amount.to_string(),
        "credit_limit": credit_limit,
        "limit_source": limit_source,
        "current_outstanding": c.current_outstanding.to_string(),
        "projected_outstanding": c.projected_outstanding.to_string(),
        "projected_utilization_percent": c.projected_utilization_percent.to_string(),
        "shortfall": c.shortfall.to_string(),
    })
}

pub fn transaction_to_json(t: &LedgerTransaction) -> Value {
    json!({
        "posting_date": t.posting_date.to_string(),
        "voucher_type": t.voucher_type.as_str(),
        "voucher_no": t.voucher_no,
        "company": t.company.as_str(),
        "debit": t.debit.to_string(),
        "credit": t.credit.to_string(),
        "balance": t.balance.to_string(),
        "status": t.status.map(|s| s.as_str()),
        "remarks": t.remarks,
    })
}

pub fn history_to_json(page: &HistoryPage) -> Value {
    json!({
        "entries": page.entries.iter().map(transaction_to_json).collect::<Vec<_>>(),
        "total": page.total,
        "limit": page.pagination.limit,
        "offset": page.pagination.offset,
        "has_more": page.has_more,
        "opening_balance": page.opening_balance.to_string(),
        "closing_balance": page.closing_balance.to_string(),
    })
}
