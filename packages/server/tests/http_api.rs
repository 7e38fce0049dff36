//! HTTP API integration tests.
//!
//! Tests for REST API endpoints (health check, hub stats, session actions).

mod fixtures;
use fixtures::{OTHER_WIDGET_KEY, TestServer, WIDGET_KEY};

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: /api/health エンドポイントが正常に動作する
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_hub_stats_without_connections() {
    // テスト項目: 接続がない場合の /api/hub/stats
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/hub/stats", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["total_connections"], 0);
    assert!(body["tenants"].as_array().unwrap().is_empty());
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn test_hub_stats_counts_per_tenant() {
    // テスト項目: /api/hub/stats がテナントごとの接続数を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _a = server.connect(WIDGET_KEY, "visitor-a").await;
    let _b = server.connect(WIDGET_KEY, "visitor-b").await;
    let _c = server.connect(OTHER_WIDGET_KEY, "visitor-c").await;

    // when (操作):
    let body = server.wait_for_connections(3).await;

    // then (期待する結果): テナントキー順に並ぶ
    let tenants = body["tenants"].as_array().unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0]["tenant_key"], "site-1");
    assert_eq!(tenants[0]["connections"], 2);
    assert_eq!(tenants[1]["tenant_key"], "site-2");
    assert_eq!(tenants[1]["connections"], 1);
}

#[tokio::test]
async fn test_push_message_to_unknown_session() {
    // テスト項目: 接続のないセッションへの送信は 404 を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/sessions/nobody/messages", server.base_url()))
        .json(&serde_json::json!({"content": "hello"}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_push_message_with_empty_content() {
    // テスト項目: 空のメッセージは 400 を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _a = server.connect(WIDGET_KEY, "visitor-a").await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .post(format!("{}/api/sessions/visitor-a/messages", server.base_url()))
        .json(&serde_json::json!({"content": "", "sender": "bot"}))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_close_unknown_session() {
    // テスト項目: 接続のないセッションの切断は 404 を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .delete(format!("{}/api/sessions/nobody", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 404);
}
