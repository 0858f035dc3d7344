use std::sync::Arc;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use tillcredit_api::app::{build_app, services::AppServices};
use tillcredit_credit::CreditSettings;
use tillcredit_infra::{CreditFixture, InMemoryCreditStore};

const FIXTURE: &str = r#"{
    "companies": [
        {"name": "Beta Stores"},
        {"name": "Acme Retail", "credit_limit": "10000"}
    ],
    "customer_groups": [
        {"name": "Wholesale", "credit_limits": [{"company": "Acme Retail", "credit_limit": "5000"}]}
    ],
    "customers": [
        {"name": "Hardware Hub", "customer_group": "Wholesale"},
        {"name": "Walk-In", "credit_limits": [{"company": "Acme Retail", "credit_limit": "1000"}]}
    ],
    "invoices": [
        {"voucher_no": "SINV-0001", "customer": "Hardware Hub", "company": "Acme Retail",
         "posting_date": "2024-04-10", "grand_total": "2000", "outstanding_amount": "1500", "status": "partly_paid"},
        {"voucher_no": "SINV-0002", "customer": "Hardware Hub", "company": "Acme Retail",
         "posting_date": "2024-05-02", "grand_total": "1500", "outstanding_amount": "1500", "status": "overdue"},
        {"voucher_no": "SINV-0003", "customer": "Hardware Hub", "company": "Acme Retail",
         "posting_date": "2024-05-03", "grand_total": "800", "outstanding_amount": "0", "status": "paid"},
        {"voucher_no": "SINV-0100", "customer": "Walk-In", "company": "Acme Retail",
         "posting_date": "2024-05-01", "grand_total": "1200", "outstanding_amount": "1200", "status": "unpaid"}
    ],
    "payments": [
        {"voucher_no": "PAY-0001", "customer": "Hardware Hub", "company": "Acme Retail",
         "posting_date": "2024-04-20", "paid_amount": "500"},
        {"voucher_no": "PAY-0002", "customer": "Hardware Hub", "company": "Acme Retail",
         "posting_date": "2024-05-03", "paid_amount": "800"}
    ],
    "sales_orders": [
        {"order_no": "SO-0001", "customer": "Hardware Hub", "company": "Acme Retail",
         "transaction_date": "2024-05-06", "grand_total": "600", "billed_amount": "200"}
    ]
}"#;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let fixture = CreditFixture::from_json_str(FIXTURE).expect("fixture must parse");
        let store = InMemoryCreditStore::from_fixture(fixture).expect("fixture must load");
        let services = Arc::new(AppServices::in_memory(store, CreditSettings::default()));

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn decimal(v: &Value) -> Decimal {
    v.as_str()
        .unwrap_or_else(|| panic!("expected decimal string, got {v}"))
        .parse()
        .unwrap()
}

async fn json_body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_reports_store_backend() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["store"], "in_memory");
}

#[tokio::test]
async fn group_limit_applies_to_customer_without_override() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/customers/Hardware%20Hub/credit"))
        .query(&[("company", "Acme Retail")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    let summary = &body["data"][0];
    assert_eq!(decimal(&summary["credit_limit"]), dec!(5000));
    assert_eq!(summary["limit_source"], "group");
    assert_eq!(decimal(&summary["outstanding_amount"]), dec!(3000));
    assert_eq!(decimal(&summary["available_credit"]), dec!(2000));
    assert_eq!(decimal(&summary["utilization_percent"]), dec!(60));
    assert_eq!(summary["is_over_limit"], false);
    assert_eq!(summary["includes_unbilled"], false);
}

#[tokio::test]
async fn summary_without_company_covers_every_company() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/customers/Hardware%20Hub/credit"))
        .query(&[("include_unbilled", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["company"], "Acme Retail");
    assert_eq!(decimal(&data[0]["outstanding_amount"]), dec!(3400));
    assert_eq!(data[1]["company"], "Beta Stores");
    assert_eq!(data[1]["unlimited"], true);
    assert_eq!(data[1]["available_credit"], Value::Null);
    assert_eq!(decimal(&data[1]["utilization_percent"]), Decimal::ZERO);
}

#[tokio::test]
async fn over_limit_customer_is_flagged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/customers/Walk-In/credit"))
        .query(&[("company", "Acme Retail")])
        .send()
        .await
        .unwrap();
    let body = json_body(res).await;
    let summary = &body["data"][0];
    assert_eq!(summary["is_over_limit"], true);
    assert_eq!(decimal(&summary["utilization_percent"]), dec!(120));
    assert_eq!(decimal(&summary["available_credit"]), dec!(-200));
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/customers/Nobody/credit")).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
    assert!(body["message"].as_str().unwrap().contains("Nobody"));
}

#[tokio::test]
async fn set_and_remove_customer_limit() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let limit_url = srv.url("/customers/Hardware%20Hub/credit/Acme%20Retail");

    // Below the 3000 outstanding: rejected unless bypassed.
    let res = client.put(&limit_url).json(&json!({ "limit": "2500" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "validation_error");

    let res = client
        .put(&limit_url)
        .json(&json!({ "limit": "2500", "bypass_check": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["data"]["limit_source"], "customer");
    assert_eq!(body["data"]["bypass_check"], true);

    let res = client
        .get(srv.url("/customers/Hardware%20Hub/credit"))
        .query(&[("company", "Acme Retail")])
        .send()
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["data"][0]["is_over_limit"], true);
    assert_eq!(decimal(&body["data"][0]["available_credit"]), dec!(-500));

    let res = client.delete(&limit_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["data"]["removed"], true);

    let res = client.delete(&limit_url).send().await.unwrap();
    assert_eq!(json_body(res).await["data"]["removed"], false);

    let res = client
        .get(srv.url("/customers/Hardware%20Hub/credit"))
        .query(&[("company", "Acme Retail")])
        .send()
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["data"][0]["limit_source"], "group");
    assert_eq!(decimal(&body["data"][0]["credit_limit"]), dec!(5000));
}

#[tokio::test]
async fn invalid_limits_and_unknown_fields_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let limit_url = srv.url("/customers/Walk-In/credit/Acme%20Retail");

    let res = client.put(&limit_url).json(&json!({ "limit": "-10" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "validation_error");

    let res = client
        .put(&limit_url)
        .json(&json!({ "limit": "5000", "customer_group": "Wholesale" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");

    let res = client
        .get(srv.url("/customers/Walk-In/credit"))
        .query(&[("show_all", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "validation_error");
}

#[tokio::test]
async fn check_reports_whether_sale_fits() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let check_url = srv.url("/customers/Hardware%20Hub/credit/Acme%20Retail/check");

    let res = client.post(&check_url).json(&json!({ "amount": "2500" })).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["data"]["allowed"], false);
    assert_eq!(decimal(&body["data"]["shortfall"]), dec!(500));

    let res = client.post(&check_url).json(&json!({ "amount": 1999.99 })).send().await.unwrap();
    let body = json_body(res).await;
    assert_eq!(body["data"]["allowed"], true);
    assert_eq!(decimal(&body["data"]["shortfall"]), Decimal::ZERO);
}

#[tokio::test]
async fn history_pages_keep_running_balance() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let history_url = srv.url("/customers/Hardware%20Hub/credit/history");

    let res = client
        .get(&history_url)
        .query(&[("company", "Acme Retail"), ("limit", "2"), ("offset", "1")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    let data = &body["data"];
    assert_eq!(data["total"], 5);
    assert_eq!(data["has_more"], true);
    let entries = data["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["voucher_no"], "PAY-0001");
    assert_eq!(entries[0]["voucher_type"], "payment_entry");
    assert_eq!(decimal(&entries[0]["balance"]), dec!(1500));
    assert_eq!(entries[1]["voucher_no"], "SINV-0002");
    assert_eq!(decimal(&entries[1]["balance"]), dec!(3000));
    assert_eq!(decimal(&data["closing_balance"]), dec!(3000));
}

#[tokio::test]
async fn history_validates_filters() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let history_url = srv.url("/customers/Hardware%20Hub/credit/history");

    for query in [
        vec![("status", "draft")],
        vec![("from_date", "2024-06-01"), ("to_date", "2024-05-01")],
        vec![("limit", "0")],
    ] {
        let res = client.get(&history_url).query(&query).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {query:?}");
        assert_eq!(json_body(res).await["error"], "validation_error");
    }

    let res = client
        .get(&history_url)
        .query(&[("company", "Gamma Traders")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(&history_url)
        .query(&[("status", "paid")])
        .send()
        .await
        .unwrap();
    let body = json_body(res).await;
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["voucher_no"], "SINV-0003");
}

#[tokio::test]
async fn ranged_history_opens_with_prior_balance() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/customers/Hardware%20Hub/credit/history"))
        .query(&[("company", "Acme Retail"), ("from_date", "2024-05-01")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    let data = &body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(decimal(&data["opening_balance"]), dec!(1500));
    let balances: Vec<_> = data["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| decimal(&e["balance"]))
        .collect();
    assert_eq!(balances, [dec!(3000), dec!(2200), dec!(3000)]);
    assert_eq!(decimal(&data["closing_balance"]), dec!(3000));
}

#[tokio::test]
async fn unsupported_methods_get_json_envelope() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (method, path) in [
        (reqwest::Method::POST, "/customers/Hardware%20Hub/credit"),
        (reqwest::Method::PUT, "/customers/Hardware%20Hub/credit/history"),
        (reqwest::Method::GET, "/customers/Hardware%20Hub/credit/Acme%20Retail"),
        (reqwest::Method::GET, "/customers/Hardware%20Hub/credit/Acme%20Retail/check"),
        (reqwest::Method::DELETE, "/health"),
    ] {
        let res = client.request(method.clone(), srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
        let body = json_body(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn undecodable_path_segment_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/customers/%FF/credit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");

    let res = client
        .delete(srv.url("/customers/Walk-In/credit/%C3%28"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "validation_error");
}
