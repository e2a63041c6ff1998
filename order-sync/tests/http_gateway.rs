//! HttpOrderGateway against a local axum server speaking the platform's REST dialect

mod common;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use common::{customer, sqlite_store, test_options};
use order_sync::db::OrderStore;
use order_sync::remote::{GatewayError, HttpOrderGateway, ListOrdersQuery, OrderGateway};
use order_sync::sync::{RunOutcome, SyncEngine};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::order::{BillingAddress, CanonicalStatus, LineItem, NewRemoteOrder, OrderUpdatePatch};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// `ck_test:cs_test`
const EXPECTED_AUTH: &str = "Basic Y2tfdGVzdDpjc190ZXN0";
/// 2024-03-01T00:00:00Z
const MARCH_FIRST: i64 = 1_709_251_200_000;

#[derive(Default)]
struct MockState {
    queries: Mutex<Vec<HashMap<String, String>>>,
    updates: Mutex<Vec<(i64, Value)>>,
    creates: Mutex<Vec<Value>>,
}

fn order_json(id: i64, status: &str, total: Option<&str>) -> Value {
    let mut order = json!({
        "id": id,
        "number": id.to_string(),
        "status": status,
        "date_created": "2024-03-01T10:00:00",
        "date_created_gmt": "2024-03-01T09:00:00",
        "date_modified": "2024-03-01T11:00:00",
        "date_modified_gmt": "2024-03-01T10:00:00",
        "shipping_total": "10.00",
        "discount_total": "0.00",
        "total_tax": "0.00",
        "payment_method": "stripe",
        "payment_method_title": "Credit card",
        "billing": {
            "first_name": "Ana",
            "last_name": "Ruiz",
            "address_1": "Calle Mayor 1",
            "city": "Valencia",
            "postcode": "46001",
            "country": "ES",
            "email": "ana@example.com",
            "phone": "600000000"
        },
        "line_items": [
            {"product_id": 7, "name": "Mug", "quantity": 1, "price": 110, "subtotal": "110.00", "sku": "MUG"}
        ]
    });
    if let Some(total) = total {
        order["total"] = json!(total);
    }
    order
}

fn unauthorized(headers: &HeaderMap) -> Option<Response> {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth == Some(EXPECTED_AUTH) {
        return None;
    }
    Some(
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "code": "woocommerce_rest_cannot_view",
                "message": "Sorry, you cannot list resources."
            })),
        )
            .into_response(),
    )
}

async fn list_orders(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    state.queries.lock().push(params.clone());

    let status = params.get("status").map(String::as_str).unwrap_or_default();
    let page = params.get("page").map(String::as_str).unwrap_or("1");
    match (status, page) {
        ("failed", _) => (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response(),
        ("processing", "1") => (
            [("X-WP-TotalPages", "2")],
            Json(json!([
                order_json(1001, "processing", Some("120.00")),
                order_json(1002, "processing", None),
            ])),
        )
            .into_response(),
        ("processing", _) => (
            [("X-WP-TotalPages", "2")],
            Json(json!([order_json(1003, "wc-processing", Some("60.00"))])),
        )
            .into_response(),
        _ => ([("X-WP-TotalPages", "0")], Json(json!([]))).into_response(),
    }
}

async fn create_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    let status = body["status"].as_str().unwrap_or("pending").to_string();
    state.creates.lock().push(body);
    (StatusCode::CREATED, Json(order_json(5001, &status, Some("55.00")))).into_response()
}

async fn update_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = unauthorized(&headers) {
        return denied;
    }
    if id == 999 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "code": "rest_invalid_param",
                "message": "Invalid parameter(s): billing"
            })),
        )
            .into_response();
    }
    state.updates.lock().push((id, body));
    Json(order_json(id, "completed", Some("55.00"))).into_response()
}

async fn spawn_server() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/wp-json/wc/v3/orders", get(list_orders).post(create_order))
        .route("/wp-json/wc/v3/orders/{id}", put(update_order))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/wp-json/wc/v3/"), state)
}

fn gateway(base_url: &str, key: &str) -> HttpOrderGateway {
    HttpOrderGateway::new(base_url, key, "cs_test", Duration::from_secs(5)).unwrap()
}

fn query(status: &str, page: u32) -> ListOrdersQuery {
    ListOrdersQuery {
        status: status.into(),
        date_from: Some(MARCH_FIRST),
        date_to: None,
        page,
        per_page: 50,
    }
}

#[tokio::test]
async fn test_list_sends_filters_and_parses_page() {
    let (base_url, state) = spawn_server().await;
    let gateway = gateway(&base_url, "ck_test");
    assert!(!gateway.base_url().ends_with('/'));

    let page = gateway.list_orders(&query("processing", 1)).await.unwrap();
    assert_eq!(page.total_pages, Some(2));
    assert!(page.has_more);
    assert_eq!(page.orders.len(), 1);
    assert_eq!(page.rejected.len(), 1);
    assert_eq!(page.rejected[0].external_id, Some(1002));

    let order = &page.orders[0];
    assert_eq!(order.external_id, 1001);
    assert_eq!(order.number, "1001");
    assert!((order.total - 120.0).abs() < 0.01);
    assert!((order.shipping_total - 10.0).abs() < 0.01);
    assert_eq!(order.customer.email.as_deref(), Some("ana@example.com"));
    assert_eq!(order.payment_method, "Credit card");
    assert_eq!(order.date_modified, MARCH_FIRST + 10 * 3_600_000);
    assert_eq!(order.date_created, MARCH_FIRST + 9 * 3_600_000);

    let sent = state.queries.lock()[0].clone();
    assert_eq!(sent["status"], "processing");
    assert_eq!(sent["page"], "1");
    assert_eq!(sent["per_page"], "50");
    assert_eq!(sent["orderby"], "date");
    assert_eq!(sent["order"], "asc");
    assert_eq!(sent["after"], "2024-03-01T00:00:00Z");
    assert!(!sent.contains_key("before"));
}

#[tokio::test]
async fn test_last_page_reports_no_more() {
    let (base_url, _state) = spawn_server().await;
    let page = gateway(&base_url, "ck_test")
        .list_orders(&query("processing", 2))
        .await
        .unwrap();
    assert!(!page.has_more);
    assert_eq!(page.orders.len(), 1);
    assert_eq!(page.orders[0].status, "wc-processing");
}

#[tokio::test]
async fn test_rejected_credentials_map_to_auth() {
    let (base_url, _state) = spawn_server().await;
    let err = gateway(&base_url, "ck_wrong")
        .list_orders(&query("processing", 1))
        .await
        .unwrap_err();
    assert!(err.is_auth());
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_server_error_maps_to_transport() {
    let (base_url, _state) = spawn_server().await;
    let err = gateway(&base_url, "ck_test")
        .list_orders(&query("failed", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_unreachable_host_maps_to_transport() {
    let err = gateway("http://127.0.0.1:1/wp-json/wc/v3", "ck_test")
        .list_orders(&query("processing", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}

fn update_patch() -> OrderUpdatePatch {
    OrderUpdatePatch {
        status: CanonicalStatus::Completed,
        total: 55.0,
        customer: customer(Some("bob@example.com")),
        billing_address: BillingAddress {
            city: "Madrid".into(),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_push_update_sends_status_total_and_billing() {
    let (base_url, state) = spawn_server().await;
    gateway(&base_url, "ck_test")
        .push_order_update(1001, &update_patch())
        .await
        .unwrap();

    let updates = state.updates.lock().clone();
    assert_eq!(updates.len(), 1);
    let (id, body) = &updates[0];
    assert_eq!(*id, 1001);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["total"], "55.00");
    assert_eq!(body["billing"]["email"], "bob@example.com");
    assert_eq!(body["billing"]["city"], "Madrid");
}

#[tokio::test]
async fn test_rejected_update_maps_to_validation() {
    let (base_url, _state) = spawn_server().await;
    let err = gateway(&base_url, "ck_test")
        .push_order_update(999, &update_patch())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ref msg)
        if msg.contains("Invalid parameter(s): billing") && msg.contains("rest_invalid_param")));
}

#[tokio::test]
async fn test_create_order_returns_remote_id() {
    let (base_url, state) = spawn_server().await;
    let order = NewRemoteOrder {
        status: CanonicalStatus::Processing,
        customer: customer(Some("bob@example.com")),
        billing_address: BillingAddress::default(),
        line_items: vec![LineItem {
            product_id: 3,
            name: "Teapot".into(),
            quantity: 2,
            unit_price: 25.0,
            sku: "TEA".into(),
        }],
        shipping_total: 5.0,
        payment_method: "Cash".into(),
    };

    let created = gateway(&base_url, "ck_test").create_order(&order).await.unwrap();
    assert_eq!(created.external_id, 5001);
    assert_eq!(created.status, "processing");

    let body = state.creates.lock()[0].clone();
    assert_eq!(body["status"], "processing");
    assert_eq!(body["billing"]["email"], "bob@example.com");
    assert_eq!(body["line_items"][0]["product_id"], 3);
    assert_eq!(body["line_items"][0]["quantity"], 2);
    assert_eq!(body["shipping_lines"][0]["total"], "5.00");
}

#[tokio::test]
async fn test_full_run_over_http() {
    let (base_url, _state) = spawn_server().await;
    let gateway = Arc::new(gateway(&base_url, "ck_test"));
    let (_db, store) = sqlite_store().await;
    let mut options = test_options(&["processing", "completed"]);
    options.page_size = 50;
    let engine = SyncEngine::new(gateway, store.clone(), options).await;

    let result = engine.run_sync_now().await.unwrap();
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.counters.created, 2);
    assert_eq!(result.counters.errors, 1);

    let imported = store.find_by_external_id(1003).await.unwrap().unwrap();
    assert_eq!(imported.status, CanonicalStatus::Processing);
    assert!((imported.amounts.subtotal - 50.0).abs() < 0.01);
}
