//! Black-box HTTP tests: the production router on an ephemeral port,
//! backed by the in-memory store.

use std::sync::Arc;

use ledger_engine::gateway::{create_router, state::AppState};
use ledger_engine::ledger::Account;
use ledger_engine::{
    AccountService, InMemoryLedgerStore, SnowflakeGenerator, TransferOrchestrator,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(seed: Vec<Account>) -> Self {
        let store = InMemoryLedgerStore::with_accounts(seed);
        let id_gen = Arc::new(SnowflakeGenerator::new(2));
        let state = Arc::new(AppState::new(
            Arc::new(TransferOrchestrator::new(
                Arc::new(store.clone()),
                id_gen.clone(),
            )),
            Arc::new(AccountService::new(Arc::new(store), id_gen)),
            None,
        ));
        let app = create_router(state);

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

fn usd(id: i64, balance: i64) -> Account {
    let mut account = Account::open(id, format!("user-{}", id), "USD");
    account.balance = balance;
    account
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_version() {
    let srv = TestServer::spawn(vec![]).await;
    let (status, body) = get(&reqwest::Client::new(), srv.url("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert!(body["data"]["timestamp_ms"].as_u64().unwrap() > 0);
    assert!(body["data"]["version"].is_string());
}

#[tokio::test]
async fn create_account_then_read_balance() {
    let srv = TestServer::spawn(vec![]).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        srv.url("/api/v1/accounts"),
        json!({"user_id": "alice", "currency": "usd"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["currency"], "USD");
    assert_eq!(body["data"]["balance"], 0);

    let id = body["data"]["account_id"].as_str().unwrap().to_string();
    let (status, body) = get(&client, srv.url(&format!("/api/v1/accounts/{}/balance", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account_id"], id.as_str());
    assert_eq!(body["data"]["version"], 1);
}

#[tokio::test]
async fn create_account_rejects_bad_currency() {
    let srv = TestServer::spawn(vec![]).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        srv.url("/api/v1/accounts"),
        json!({"user_id": "alice", "currency": "USDT"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);
    assert_eq!(body["category"], "VALIDATION_ERROR");

    let (status, _) = post(
        &client,
        srv.url("/api/v1/accounts"),
        json!({"user_id": "alice", "currency": "U$D"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_account_rejects_oversized_user_id() {
    let srv = TestServer::spawn(vec![]).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        srv.url("/api/v1/accounts"),
        json!({"user_id": "u".repeat(100), "currency": "USD"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);

    let (status, _) = post(
        &client,
        srv.url("/api/v1/accounts"),
        json!({"user_id": "u".repeat(64), "currency": "USD"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn transfer_then_replay() {
    let srv = TestServer::spawn(vec![usd(1, 100), usd(2, 0)]).await;
    let client = reqwest::Client::new();
    let request = json!({
        "idempotency_key": "k1",
        "from_account_id": "1",
        "to_account_id": 2,
        "amount": 60,
        "reference": "rent"
    });

    let (status, body) = post(&client, srv.url("/api/v1/transactions"), request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "POSTED");
    let transaction_id = body["data"]["transaction_id"].as_str().unwrap().to_string();

    let (status, body) = post(&client, srv.url("/api/v1/transactions"), request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4091);
    assert_eq!(body["category"], "DUPLICATE_REQUEST");
    assert_eq!(body["data"]["existing_transaction_id"], transaction_id.as_str());

    let (_, body) = get(&client, srv.url("/api/v1/accounts/1/balance")).await;
    assert_eq!(body["data"]["balance"], 40);
    assert_eq!(body["data"]["version"], 2);
}

#[tokio::test]
async fn transfer_error_statuses() {
    let srv = TestServer::spawn(vec![usd(1, 100), usd(2, 0)]).await;
    let client = reqwest::Client::new();
    let transfer = |key: &str, from: i64, to: i64, amount: i64| {
        json!({"idempotency_key": key, "from_account_id": from, "to_account_id": to, "amount": amount})
    };

    let cases = [
        (transfer("k1", 1, 2, 101), StatusCode::UNPROCESSABLE_ENTITY),
        (transfer("k2", 1, 2, 0), StatusCode::BAD_REQUEST),
        (transfer("k3", 1, 1, 5), StatusCode::BAD_REQUEST),
        (transfer("", 1, 2, 5), StatusCode::BAD_REQUEST),
        (transfer("k4", 1, 999, 5), StatusCode::NOT_FOUND),
    ];
    for (body, expected) in cases {
        let (status, resp) = post(&client, srv.url("/api/v1/transactions"), body.clone()).await;
        assert_eq!(status, expected, "request {} answered {}", body, resp);
        assert_ne!(resp["code"], 0);
        assert!(resp["category"].is_string(), "no category in {}", resp);
    }

    let (status, body) = post(
        &client,
        srv.url("/api/v1/transactions"),
        json!({"idempotency_key": "k5"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn history_and_lookups() {
    let srv = TestServer::spawn(vec![usd(1, 100), usd(2, 0)]).await;
    let client = reqwest::Client::new();

    for (key, amount) in [("a", 10), ("b", 20)] {
        let (status, _) = post(
            &client,
            srv.url("/api/v1/transactions"),
            json!({"idempotency_key": key, "from_account_id": 1, "to_account_id": 2, "amount": amount}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(&client, srv.url("/api/v1/transactions/2")).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["amount"], 20);
    assert_eq!(entries[0]["direction"], "CREDIT");

    let (_, body) = get(&client, srv.url("/api/v1/transactions/1?limit=1")).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["amount"], -20);

    let (status, body) = get(&client, srv.url("/api/v1/accounts/77/balance")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
    assert_eq!(body["category"], "VALIDATION_ERROR");

    let (status, _) = get(&client, srv.url("/api/v1/accounts/abc/balance")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reversal_is_not_implemented() {
    let srv = TestServer::spawn(vec![]).await;
    let (status, body) = post(
        &reqwest::Client::new(),
        srv.url("/api/v1/transactions/123/reverse"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], 5010);
    assert_eq!(body["category"], "NOT_IMPLEMENTED");
}

#[tokio::test]
async fn openapi_document_served() {
    let srv = TestServer::spawn(vec![]).await;
    let (status, body) = get(&reqwest::Client::new(), srv.url("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/transactions"].is_object());
}
