//! Customer credit history: chronological invoices, returns and payments.

use core::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillcredit_core::{CompanyId, CustomerId, DateRange, DomainError, DomainResult};

use crate::error::{CreditError, CreditResult, StoreError};
use crate::store::{CreditRecordStore, HistoryProvider};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Hard cap on page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    SalesInvoice,
    CreditNote,
    PaymentEntry,
}

impl VoucherType {
    pub const ALL: [VoucherType; 3] = [
        VoucherType::SalesInvoice,
        VoucherType::CreditNote,
        VoucherType::PaymentEntry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoucherType::SalesInvoice => "sales_invoice",
            VoucherType::CreditNote => "credit_note",
            VoucherType::PaymentEntry => "payment_entry",
        }
    }
}

impl FromStr for VoucherType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown voucher_type '{s}'; expected one of: sales_invoice, credit_note, payment_entry"
                ))
            })
    }
}

/// Settlement status of a receivable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Unpaid,
    PartlyPaid,
    Paid,
    Overdue,
    Return,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 5] = [
        DocumentStatus::Unpaid,
        DocumentStatus::PartlyPaid,
        DocumentStatus::Paid,
        DocumentStatus::Overdue,
        DocumentStatus::Return,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Unpaid => "unpaid",
            DocumentStatus::PartlyPaid => "partly_paid",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
            DocumentStatus::Return => "return",
        }
    }

    /// Documents in these states still count towards the outstanding amount.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            DocumentStatus::Unpaid | DocumentStatus::PartlyPaid | DocumentStatus::Overdue
        )
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown status '{s}'; expected one of: unpaid, partly_paid, paid, overdue, return"
                ))
            })
    }
}

/// One line of the customer's statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub posting_date: NaiveDate,
    pub voucher_type: VoucherType,
    pub voucher_no: String,
    pub company: CompanyId,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Cumulative debit − credit up to and including this line.
    pub balance: Decimal,
    /// Present for invoices and credit notes only.
    pub status: Option<DocumentStatus>,
    pub remarks: Option<String>,
}

impl LedgerTransaction {
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub range: DateRange,
    pub status: Option<DocumentStatus>,
    pub voucher_type: Option<VoucherType>,
}

impl HistoryFilter {
    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        self.range.contains(tx.posting_date) && self.matches_kind(tx)
    }

    /// Status and voucher type only; the date range is not consulted.
    pub fn matches_kind(&self, tx: &LedgerTransaction) -> bool {
        self.voucher_type.is_none_or(|v| v == tx.voucher_type)
            && self.status.is_none_or(|s| tx.status == Some(s))
    }

    /// Matching transactions dated before `from_date` carry into the opening balance.
    pub fn precedes(&self, tx: &LedgerTransaction) -> bool {
        self.range.from().is_some_and(|from| tx.posting_date < from) && self.matches_kind(tx)
    }
}

/// Offset/limit paging for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    /// `limit` is capped at [`MAX_PAGE_SIZE`]; zero is rejected.
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> DomainResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 {
            return Err(DomainError::validation("limit must be at least 1"));
        }
        Ok(Self {
            limit: limit.min(MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        })
    }
}

/// A page of history plus the totals needed to render the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub entries: Vec<LedgerTransaction>,
    /// Number of transactions matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
    /// Balance carried in from matching transactions before `from_date`.
    pub opening_balance: Decimal,
    /// Balance after the last matching transaction (not just this page).
    pub closing_balance: Decimal,
}

impl HistoryPage {
    /// Wraps an already cut page.
    pub fn new(
        entries: Vec<LedgerTransaction>,
        total: u64,
        pagination: Pagination,
        opening_balance: Decimal,
        closing_balance: Decimal,
    ) -> Self {
        let has_more = u64::from(pagination.offset) + (entries.len() as u64) < total;
        Self {
            entries,
            total,
            pagination,
            has_more,
            opening_balance,
            closing_balance,
        }
    }

    /// Builds a page from every transaction in the customer/company scope.
    ///
    /// Transactions before the range seed the opening balance; the matching set is
    /// ordered and accumulated from there, then cut. Incoming `balance` fields are
    /// ignored and recomputed.
    pub fn from_transactions(
        scoped: Vec<LedgerTransaction>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Self {
        let opening_balance: Decimal = scoped
            .iter()
            .filter(|tx| filter.precedes(tx))
            .map(LedgerTransaction::net)
            .sum();

        let mut matching: Vec<_> = scoped.into_iter().filter(|tx| filter.matches(tx)).collect();
        matching.sort_by(|a, b| {
            a.posting_date
                .cmp(&b.posting_date)
                .then_with(|| a.voucher_no.cmp(&b.voucher_no))
        });

        let mut running = opening_balance;
        for tx in matching.iter_mut() {
            running += tx.net();
            tx.balance = running;
        }

        let total = matching.len() as u64;
        let entries: Vec<_> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();

        Self::new(entries, total, pagination, opening_balance, running)
    }
}

/// Reporting entry point: validates the request, then reads from the history provider.
pub struct HistoryReader<S, H> {
    store: S,
    provider: H,
}

impl<S, H> HistoryReader<S, H>
where
    S: CreditRecordStore,
    H: HistoryProvider,
{
    pub fn new(store: S, provider: H) -> Self {
        Self { store, provider }
    }

    pub async fn credit_history(
        &self,
        customer: &CustomerId,
        company: Option<&CompanyId>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> CreditResult<HistoryPage> {
        if self.store.customer(customer).await?.is_none() {
            return Err(DomainError::not_found(format!("customer '{customer}'")).into());
        }
        if let Some(company) = company {
            if !self.store.company_exists(company).await? {
                return Err(DomainError::not_found(format!("company '{company}'")).into());
            }
        }

        let page = self
            .provider
            .transactions(customer, company, filter, pagination)
            .await?;

        if page.entries.len() > pagination.limit as usize {
            return Err(CreditError::from(StoreError::Malformed(format!(
                "history page holds {} entries for limit {}",
                page.entries.len(),
                pagination.limit
            ))));
        }

        tracing::debug!(
            customer = %customer,
            total = page.total,
            returned = page.entries.len(),
            "credit history read"
        );
        Ok(page)
    }
}
