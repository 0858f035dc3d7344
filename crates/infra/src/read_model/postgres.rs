//! Postgres-backed credit record store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError | Scenario |
//! |------------|------------|----------|
//! | PoolClosed / PoolTimedOut / Io / Tls | `Unavailable` | Database unreachable |
//! | Database | `Unavailable` | Query rejected by the server |
//! | ColumnDecode / Decode / ColumnNotFound | `Malformed` | Schema drift or bad rows |
//! | Other | `Unavailable` | Anything else |
//!
//! Names and statuses are re-validated on the way out; a row that fails is `Malformed`.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use tillcredit_core::{CompanyId, CustomerGroupId, CustomerId, DomainError};
use tillcredit_credit::{
    ConfiguredLimits, CreditRecordStore, CustomerLimit, CustomerRecord, DocumentStatus,
    HistoryFilter, HistoryPage, HistoryProvider, LedgerTransaction, OutstandingBreakdown,
    OutstandingQuery, Pagination, StoreError, VoucherType,
};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Ledger rows for `$1` customer and optional `$2` company, narrowed by
/// `$4` to_date, `$5` status and `$6` voucher type. `$3` from_date is applied
/// by the outer statements so earlier rows still feed the balance.
macro_rules! ledger_cte {
    () => {
        r#"
        WITH ledger AS (
            SELECT posting_date,
                   CASE WHEN status = 'return' THEN 'credit_note' ELSE 'sales_invoice' END AS voucher_type,
                   voucher_no,
                   company,
                   CASE WHEN status = 'return' THEN 0 ELSE grand_total END AS debit,
                   CASE WHEN status = 'return' THEN ABS(grand_total) ELSE 0 END AS credit,
                   status,
                   remarks
            FROM sales_invoices
            WHERE customer = $1 AND ($2::text IS NULL OR company = $2)
            UNION ALL
            SELECT posting_date, 'payment_entry', voucher_no, company,
                   0::numeric, paid_amount, NULL::text, remarks
            FROM payment_entries
            WHERE customer = $1 AND ($2::text IS NULL OR company = $2)
        ),
        scoped AS (
            SELECT *, debit - credit AS net
            FROM ledger
            WHERE ($4::date IS NULL OR posting_date <= $4)
              AND ($5::text IS NULL OR status = $5)
              AND ($6::text IS NULL OR voucher_type = $6)
        )
        "#
    };
}

const HISTORY_TOTALS_SQL: &str = concat!(
    ledger_cte!(),
    r#"
    SELECT
        COUNT(*) FILTER (WHERE $3::date IS NULL OR posting_date >= $3) AS total,
        COALESCE(SUM(net) FILTER (WHERE posting_date < $3::date), 0) AS opening_balance,
        COALESCE(SUM(net), 0) AS closing_balance
    FROM scoped
    "#
);

// Voucher numbers sort bytewise, matching the in-memory store.
const HISTORY_PAGE_SQL: &str = concat!(
    ledger_cte!(),
    r#"
    SELECT posting_date, voucher_type, voucher_no, company, debit, credit, status, remarks, balance
    FROM (
        SELECT *,
               SUM(net) OVER (
                   ORDER BY posting_date, voucher_no COLLATE "C"
                   ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
               ) AS balance
        FROM scoped
    ) running
    WHERE $3::date IS NULL OR posting_date >= $3
    ORDER BY posting_date, voucher_no COLLATE "C"
    LIMIT $7 OFFSET $8
    "#
);

/// Credit record store over the tables in `sql/schema.sql`.
///
/// `PgPool` is internally reference counted, so the store is cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresCreditStore {
    pool: PgPool,
}

impl PostgresCreditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Creates missing tables and indexes.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CreditRecordStore for PostgresCreditStore {
    #[instrument(skip(self), fields(customer = %id), err)]
    async fn customer(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, StoreError> {
        let row = sqlx::query("SELECT name, customer_group FROM customers WHERE name = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customer", e))?;

        row.map(|row| {
            let group: Option<String> = decode(&row, "customer_group")?;
            Ok(CustomerRecord {
                id: name(decode::<String>(&row, "name")?)?,
                customer_group: group.map(name::<CustomerGroupId>).transpose()?,
            })
        })
        .transpose()
    }

    async fn company_exists(&self, id: &CompanyId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM companies WHERE name = $1) AS present")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("company_exists", e))?;
        decode(&row, "present")
    }

    async fn companies(&self) -> Result<Vec<CompanyId>, StoreError> {
        let rows = sqlx::query("SELECT name FROM companies ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("companies", e))?;
        rows.iter().map(|row| name(decode::<String>(row, "name")?)).collect()
    }

    async fn customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<Option<CustomerLimit>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT credit_limit, bypass_check
            FROM customer_credit_limits
            WHERE customer = $1 AND company = $2
            "#,
        )
        .bind(customer.as_str())
        .bind(company.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("customer_limit", e))?;

        row.map(|row| {
            CustomerLimit::new(decode(&row, "credit_limit")?, decode(&row, "bypass_check")?)
                .map_err(|e| StoreError::Malformed(e.to_string()))
        })
        .transpose()
    }

    #[instrument(skip(self, limit), fields(customer = %customer, company = %company), err)]
    async fn put_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        limit: CustomerLimit,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customer_credit_limits (customer, company, credit_limit, bypass_check)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer, company)
            DO UPDATE SET
                credit_limit = EXCLUDED.credit_limit,
                bypass_check = EXCLUDED.bypass_check,
                updated_at = NOW()
            "#,
        )
        .bind(customer.as_str())
        .bind(company.as_str())
        .bind(limit.amount)
        .bind(limit.bypass_check)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_customer_limit", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(customer = %customer, company = %company), err)]
    async fn clear_customer_limit(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM customer_credit_limits WHERE customer = $1 AND company = $2")
            .bind(customer.as_str())
            .bind(company.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_customer_limit", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn group_limit(
        &self,
        group: &CustomerGroupId,
        company: &CompanyId,
    ) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT credit_limit
            FROM customer_group_credit_limits
            WHERE customer_group = $1 AND company = $2
            "#,
        )
        .bind(group.as_str())
        .bind(company.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("group_limit", e))?;
        row.map(|row| decode(&row, "credit_limit")).transpose()
    }

    async fn company_limit(&self, company: &CompanyId) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query("SELECT credit_limit FROM companies WHERE name = $1")
            .bind(company.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("company_limit", e))?;
        match row {
            Some(row) => decode(&row, "credit_limit"),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, customer), fields(customer = %customer.id, company = %company), err)]
    async fn configured_limits(
        &self,
        customer: &CustomerRecord,
        company: &CompanyId,
    ) -> Result<ConfiguredLimits, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                c.credit_limit AS customer_limit,
                c.bypass_check,
                (SELECT g.credit_limit
                 FROM customer_group_credit_limits g
                 WHERE g.customer_group = $3 AND g.company = $2) AS group_limit,
                (SELECT co.credit_limit FROM companies co WHERE co.name = $2) AS company_limit
            FROM (SELECT 1) AS one
            LEFT JOIN customer_credit_limits c ON c.customer = $1 AND c.company = $2
            "#,
        )
        .bind(customer.id.as_str())
        .bind(company.as_str())
        .bind(customer.customer_group.as_ref().map(CustomerGroupId::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("configured_limits", e))?;

        let customer_limit: Option<Decimal> = decode(&row, "customer_limit")?;
        let bypass_check: Option<bool> = decode(&row, "bypass_check")?;
        Ok(ConfiguredLimits {
            customer: customer_limit
                .map(|amount| {
                    CustomerLimit::new(amount, bypass_check.unwrap_or(false))
                        .map_err(|e| StoreError::Malformed(e.to_string()))
                })
                .transpose()?,
            group: decode(&row, "group_limit")?,
            company: decode(&row, "company_limit")?,
        })
    }

    #[instrument(skip(self, query), fields(customer = %customer, company = %company), err)]
    async fn outstanding(
        &self,
        customer: &CustomerId,
        company: &CompanyId,
        query: &OutstandingQuery,
    ) -> Result<OutstandingBreakdown, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COALESCE(SUM(GREATEST(outstanding_amount, 0)), 0)
                 FROM sales_invoices
                 WHERE customer = $1 AND company = $2
                   AND status IN ('unpaid', 'partly_paid', 'overdue')
                   AND ($3::date IS NULL OR posting_date >= $3)
                   AND ($4::date IS NULL OR posting_date <= $4)) AS receivables,
                (SELECT COALESCE(SUM(GREATEST(grand_total - billed_amount, 0)), 0)
                 FROM sales_orders
                 WHERE customer = $1 AND company = $2
                   AND ($3::date IS NULL OR transaction_date >= $3)
                   AND ($4::date IS NULL OR transaction_date <= $4)) AS unbilled
            "#,
        )
        .bind(customer.as_str())
        .bind(company.as_str())
        .bind(query.range.from())
        .bind(query.range.to())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("outstanding", e))?;

        Ok(OutstandingBreakdown {
            receivables: decode(&row, "receivables")?,
            unbilled: decode(&row, "unbilled")?,
        })
    }
}

#[async_trait::async_trait]
impl HistoryProvider for PostgresCreditStore {
    /// Counts, balances and pages in SQL; only the requested page is fetched.
    #[instrument(skip(self, filter), fields(customer = %customer), err)]
    async fn transactions(
        &self,
        customer: &CustomerId,
        company: Option<&CompanyId>,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError> {
        let totals = scoped_query(HISTORY_TOTALS_SQL, customer, company, filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("history_totals", e))?;
        let total: i64 = decode(&totals, "total")?;
        let total = u64::try_from(total)
            .map_err(|_| StoreError::Malformed(format!("negative history count {total}")))?;

        let rows = scoped_query(HISTORY_PAGE_SQL, customer, company, filter)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("history_page", e))?;
        let entries = rows.iter().map(ledger_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryPage::new(
            entries,
            total,
            pagination,
            decode(&totals, "opening_balance")?,
            decode(&totals, "closing_balance")?,
        ))
    }
}

/// Binds `$1..$6` shared by the history statements.
fn scoped_query<'q>(
    sql: &'q str,
    customer: &'q CustomerId,
    company: Option<&'q CompanyId>,
    filter: &HistoryFilter,
) -> Query<'q, Postgres, PgArguments> {
    sqlx::query(sql)
        .bind(customer.as_str())
        .bind(company.map(CompanyId::as_str))
        .bind(filter.range.from())
        .bind(filter.range.to())
        .bind(filter.status.map(DocumentStatus::as_str))
        .bind(filter.voucher_type.map(VoucherType::as_str))
}

fn ledger_from_row(row: &PgRow) -> Result<LedgerTransaction, StoreError> {
    let voucher_type: String = decode(row, "voucher_type")?;
    let status: Option<String> = decode(row, "status")?;
    Ok(LedgerTransaction {
        posting_date: decode(row, "posting_date")?,
        voucher_type: parse::<VoucherType>(&voucher_type)?,
        voucher_no: decode(row, "voucher_no")?,
        company: name(decode::<String>(row, "company")?)?,
        debit: decode(row, "debit")?,
        credit: decode(row, "credit")?,
        balance: decode(row, "balance")?,
        status: status.as_deref().map(parse::<DocumentStatus>).transpose()?,
        remarks: decode(row, "remarks")?,
    })
}

fn parse<T>(raw: &str) -> Result<T, StoreError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(|e: DomainError| StoreError::Malformed(e.to_string()))
}

fn decode<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Malformed(format!("column {column}: {e}")))
}

fn name<T>(raw: String) -> Result<T, StoreError>
where
    T: TryFrom<String, Error = DomainError>,
{
    T::try_from(raw).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Unavailable(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Malformed(format!("decode error in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}
