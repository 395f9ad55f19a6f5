use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build the same router as prod, but bind to an ephemeral port.
        let app = stockpile_api::app::build_app().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn stock_body(sku: &str, quantity: i64, reorder_level: i64) -> serde_json::Value {
    json!({
        "sku": sku,
        "product_name": format!("Product {sku}"),
        "quantity": quantity,
        "reorder_level": reorder_level,
        "unit_price_cents": 1999,
        "location": "A-01",
    })
}

#[tokio::test]
async fn health_endpoint_responds() {
    let srv = TestServer::spawn().await;
    let base = srv.base_url.trim_end_matches("/api/v1").to_string();

    let res = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn inventory_lifecycle_create_adjust_damage_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Create
    let res = client
        .post(format!("{}/inventory", srv.base_url))
        .header("x-performed-by", "warehouse-clerk")
        .json(&stock_body("SKU-100", 10, 2))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "AVAILABLE");
    assert_eq!(created["damaged_quantity"], 0);

    // Lookup by id and by sku agree
    let by_id: serde_json::Value = client
        .get(format!("{}/inventory/{}", srv.base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let by_sku: serde_json::Value = client
        .get(format!("{}/inventory/sku/SKU-100", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id["id"], by_sku["id"]);

    // Stock out 8 of 10
    let res = client
        .post(format!("{}/inventory/{}/adjust", srv.base_url, id))
        .json(&json!({"transaction_type": "STOCK_OUT", "quantity": 8, "reason": "order #42"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tx: serde_json::Value = res.json().await.unwrap();
    assert_eq!(tx["quantity_before"], 10);
    assert_eq!(tx["quantity_after"], 2);

    // 2 left with reorder level 2: low stock now
    let low: serde_json::Value = client
        .get(format!("{}/inventory/low-stock", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(low.as_array().unwrap().iter().any(|r| r["id"] == id.as_str()));

    // Damage one unit
    let res = client
        .post(format!("{}/inventory/{}/damage", srv.base_url, id))
        .json(&json!({"damaged_quantity": 1, "reason": "crushed box"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let damage_tx: serde_json::Value = res.json().await.unwrap();
    assert_eq!(damage_tx["transaction_type"], "DAMAGE");
    assert_eq!(damage_tx["quantity_after"], 1);

    let damaged: serde_json::Value = client
        .get(format!("{}/inventory/damaged", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(damaged.as_array().unwrap().len(), 1);

    // Transaction history is most recent first
    let transactions: serde_json::Value = client
        .get(format!("{}/inventory/{}/transactions", srv.base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let transactions = transactions.as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["transaction_type"], "DAMAGE");
    assert_eq!(transactions[1]["transaction_type"], "STOCK_OUT");

    // Per-product audit trail covers create + adjust + damage
    let audit_logs: serde_json::Value = client
        .get(format!("{}/inventory/{}/audit-logs", srv.base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let audit_logs = audit_logs.as_array().unwrap();
    assert_eq!(audit_logs.len(), 3);
    assert_eq!(audit_logs[0]["action"], "CREATE");
    assert_eq!(audit_logs[0]["performed_by"], "warehouse-clerk");
    assert!(audit_logs.iter().all(|e| e["entity_type"] == "ProductStock"));

    // Delete, then reads 404 while the global audit trail keeps the history
    let res = client
        .delete(format!("{}/inventory/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/inventory/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/inventory/{}/transactions", srv.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let all_audits: serde_json::Value = client
        .get(format!("{}/audit", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let retained: Vec<_> = all_audits
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["entity_id"] == id.as_str())
        .collect();
    assert_eq!(retained.len(), 4);
    assert!(retained.iter().any(|e| e["action"] == "DELETE"));
}

#[tokio::test]
async fn failure_statuses_are_mapped() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/inventory", srv.base_url))
        .json(&stock_body("SKU-200", 3, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // Duplicate SKU
    let res = client
        .post(format!("{}/inventory", srv.base_url))
        .json(&stock_body("SKU-200", 1, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_key");

    // Non-positive adjustment quantity
    let res = client
        .post(format!("{}/inventory/{}/adjust", srv.base_url, id))
        .json(&json!({"transaction_type": "STOCK_IN", "quantity": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Stock out more than available
    let res = client
        .post(format!("{}/inventory/{}/adjust", srv.base_url, id))
        .json(&json!({"transaction_type": "STOCK_OUT", "quantity": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    // Unknown id vs malformed id
    let res = client
        .get(format!(
            "{}/inventory/00000000-0000-7000-8000-000000000000",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/inventory/not-a-uuid", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
