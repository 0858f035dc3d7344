use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;

use tillcredit_core::{CompanyId, CustomerId, DateRange};
use tillcredit_credit::{CreditResult, SummaryOptions};

use crate::app::routes::system::method_not_allowed;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/:customer/credit",
            get(get_credit_limit).fallback(method_not_allowed),
        )
        .route(
            "/:customer/credit/history",
            get(get_credit_history).fallback(method_not_allowed),
        )
        .route(
            "/:customer/credit/:company",
            put(set_credit_limit)
                .delete(remove_credit_limit)
                .fallback(method_not_allowed),
        )
        .route(
            "/:customer/credit/:company/check",
            post(check_credit).fallback(method_not_allowed),
        )
}

pub async fn get_credit_limit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<dto::CreditSummaryQuery>, QueryRejection>,
) -> Response {
    let customer = match path {
        Ok(Path(ids)) => ids,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    respond(credit_limit(&services, &customer, query).await, &ctx)
}

async fn credit_limit(
    services: &AppServices,
    customer: &str,
    query: dto::CreditSummaryQuery,
) -> CreditResult<Value> {
    let customer: CustomerId = customer.parse()?;
    let options = SummaryOptions {
        company: query.company.as_deref().map(str::parse::<CompanyId>).transpose()?,
        include_unbilled: query.include_unbilled,
        range: DateRange::new(query.from_date, query.to_date)?,
    };

    let summaries = services.credit.credit_summary(&customer, &options).await?;
    Ok(Value::Array(summaries.iter().map(dto::summary_to_json).collect()))
}

pub async fn set_credit_limit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<dto::SetCreditLimitRequest>, JsonRejection>,
) -> Response {
    let (customer, company) = match path {
        Ok(Path(ids)) => ids,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    respond(set_limit(&services, &customer, &company, body).await, &ctx)
}

async fn set_limit(
    services: &AppServices,
    customer: &str,
    company: &str,
    body: dto::SetCreditLimitRequest,
) -> CreditResult<Value> {
    let (customer, company) = ids(customer, company)?;
    let policy = services
        .credit
        .set_customer_limit(&customer, &company, body.limit, body.bypass_check)
        .await?;
    Ok(dto::policy_to_json(&policy))
}

pub async fn remove_credit_limit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Response {
    let (customer, company) = match path {
        Ok(Path(ids)) => ids,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    respond(remove_limit(&services, &customer, &company).await, &ctx)
}

async fn remove_limit(services: &AppServices, customer: &str, company: &str) -> CreditResult<Value> {
    let (customer, company) = ids(customer, company)?;
    let removal = services.credit.remove_customer_limit(&customer, &company).await?;
    Ok(dto::removal_to_json(&removal))
}

pub async fn check_credit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<dto::CreditCheckRequest>, JsonRejection>,
) -> Response {
    let (customer, company) = match path {
        Ok(Path(ids)) => ids,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    respond(check(&services, &customer, &company, body).await, &ctx)
}

async fn check(
    services: &AppServices,
    customer: &str,
    company: &str,
    body: dto::CreditCheckRequest,
) -> CreditResult<Value> {
    let (customer, company) = ids(customer, company)?;
    let check = services
        .credit
        .check_transaction(&customer, &company, body.amount, body.include_unbilled)
        .await?;
    Ok(dto::check_to_json(&check))
}

pub async fn get_credit_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<dto::CreditHistoryQuery>, QueryRejection>,
) -> Response {
    let customer = match path {
        Ok(Path(ids)) => ids,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::validation_error(e.body_text()),
    };
    respond(history(&services, &customer, query).await, &ctx)
}

async fn history(
    services: &AppServices,
    customer: &str,
    query: dto::CreditHistoryQuery,
) -> CreditResult<Value> {
    let customer: CustomerId = customer.parse()?;
    let company = query.company.as_deref().map(str::parse::<CompanyId>).transpose()?;
    let filter = query.filter()?;
    let pagination = query.pagination()?;

    let page = services
        .history
        .credit_history(&customer, company.as_ref(), &filter, pagination)
        .await?;
    Ok(dto::history_to_json(&page))
}

fn ids(customer: &str, company: &str) -> CreditResult<(CustomerId, CompanyId)> {
    Ok((customer.parse()?, company.parse()?))
}

fn respond(result: CreditResult<Value>, ctx: &RequestContext) -> Response {
    match result {
        Ok(data) => errors::json_ok(data),
        Err(e) => errors::credit_error_to_response(e, ctx),
    }
}
