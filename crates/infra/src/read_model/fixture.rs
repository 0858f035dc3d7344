//! JSON seed data for the in-memory store, and the document records both stores share.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tillcredit_core::{CompanyId, CustomerGroupId, CustomerId};
use tillcredit_credit::{DocumentStatus, LedgerTransaction, VoucherType};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fixture references unknown {0}")]
    UnknownReference(String),

    #[error("invalid fixture: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditFixture {
    #[serde(default)]
    pub companies: Vec<CompanySeed>,
    #[serde(default)]
    pub customer_groups: Vec<CustomerGroupSeed>,
    #[serde(default)]
    pub customers: Vec<CustomerSeed>,
    #[serde(default)]
    pub invoices: Vec<InvoiceRecord>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub sales_orders: Vec<SalesOrderRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanySeed {
    pub name: CompanyId,
    /// Company-wide default limit.
    #[serde(default)]
    pub credit_limit: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerGroupSeed {
    pub name: CustomerGroupId,
    #[serde(default)]
    pub credit_limits: Vec<LimitSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerSeed {
    pub name: CustomerId,
    #[serde(default)]
    pub customer_group: Option<CustomerGroupId>,
    #[serde(default)]
    pub credit_limits: Vec<LimitSeed>,
}

/// Per-company limit row for a group or customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitSeed {
    pub company: CompanyId,
    pub credit_limit: Decimal,
    #[serde(default)]
    pub bypass_check: bool,
}

/// Submitted sales invoice; `status == return` marks a credit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvoiceRecord {
    pub voucher_no: String,
    pub customer: CustomerId,
    pub company: CompanyId,
    pub posting_date: NaiveDate,
    pub grand_total: Decimal,
    pub outstanding_amount: Decimal,
    pub status: DocumentStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl InvoiceRecord {
    /// Contribution to the outstanding receivables; zero once settled or returned.
    pub fn open_amount(&self) -> Decimal {
        if self.status.is_open() {
            self.outstanding_amount.max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    pub fn to_ledger(&self) -> LedgerTransaction {
        let (voucher_type, debit, credit) = if self.status == DocumentStatus::Return {
            (VoucherType::CreditNote, Decimal::ZERO, self.grand_total.abs())
        } else {
            (VoucherType::SalesInvoice, self.grand_total, Decimal::ZERO)
        };
        LedgerTransaction {
            posting_date: self.posting_date,
            voucher_type,
            voucher_no: self.voucher_no.clone(),
            company: self.company.clone(),
            debit,
            credit,
            balance: Decimal::ZERO,
            status: Some(self.status),
            remarks: self.remarks.clone(),
        }
    }
}

/// Payment received from a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRecord {
    pub voucher_no: String,
    pub customer: CustomerId,
    pub company: CompanyId,
    pub posting_date: NaiveDate,
    pub paid_amount: Decimal,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl PaymentRecord {
    pub fn to_ledger(&self) -> LedgerTransaction {
        LedgerTransaction {
            posting_date: self.posting_date,
            voucher_type: VoucherType::PaymentEntry,
            voucher_no: self.voucher_no.clone(),
            company: self.company.clone(),
            debit: Decimal::ZERO,
            credit: self.paid_amount,
            balance: Decimal::ZERO,
            status: None,
            remarks: self.remarks.clone(),
        }
    }
}

/// Submitted sales order; the part not yet invoiced is an unbilled commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesOrderRecord {
    pub order_no: String,
    pub customer: CustomerId,
    pub company: CompanyId,
    pub transaction_date: NaiveDate,
    pub grand_total: Decimal,
    #[serde(default)]
    pub billed_amount: Decimal,
}

impl SalesOrderRecord {
    pub fn unbilled_amount(&self) -> Decimal {
        (self.grand_total - self.billed_amount).max(Decimal::ZERO)
    }
}

impl CreditFixture {
    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        let fixture: Self = serde_json::from_str(json)?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Every reference must resolve and every amount must be non-negative.
    pub fn validate(&self) -> Result<(), FixtureError> {
        let companies: HashSet<_> = self.companies.iter().map(|c| &c.name).collect();
        let groups: HashSet<_> = self.customer_groups.iter().map(|g| &g.name).collect();
        let customers: HashSet<_> = self.customers.iter().map(|c| &c.name).collect();

        let company = |c: &CompanyId| {
            companies
                .contains(c)
                .then_some(())
                .ok_or_else(|| FixtureError::UnknownReference(format!("company '{c}'")))
        };
        let customer = |c: &CustomerId| {
            customers
                .contains(c)
                .then_some(())
                .ok_or_else(|| FixtureError::UnknownReference(format!("customer '{c}'")))
        };

        for seed in &self.companies {
            non_negative(&format!("company '{}' credit_limit", seed.name), seed.credit_limit.unwrap_or_default())?;
        }
        for group in &self.customer_groups {
            for limit in &group.credit_limits {
                company(&limit.company)?;
                non_negative(&format!("group '{}' credit_limit", group.name), limit.credit_limit)?;
            }
        }
        for seed in &self.customers {
            if let Some(g) = &seed.customer_group {
                if !groups.contains(g) {
                    return Err(FixtureError::UnknownReference(format!("customer group '{g}'")));
                }
            }
            for limit in &seed.credit_limits {
                company(&limit.company)?;
                non_negative(&format!("customer '{}' credit_limit", seed.name), limit.credit_limit)?;
            }
        }
        for inv in &self.invoices {
            customer(&inv.customer)?;
            company(&inv.company)?;
        }
        for pay in &self.payments {
            customer(&pay.customer)?;
            company(&pay.company)?;
            non_negative(&format!("payment '{}' paid_amount", pay.voucher_no), pay.paid_amount)?;
        }
        for order in &self.sales_orders {
            customer(&order.customer)?;
            company(&order.company)?;
            non_negative(&format!("sales order '{}' grand_total", order.order_no), order.grand_total)?;
        }
        Ok(())
    }
}

fn non_negative(what: &str, value: Decimal) -> Result<(), FixtureError> {
    if value < Decimal::ZERO {
        return Err(FixtureError::Invalid(format!("{what} must not be negative (got {value})")));
    }
    Ok(())
}
