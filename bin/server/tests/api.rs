use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use switchboard_ai::{
    EmbeddingBackend, LlmBackend, LlmError, LlmResponse, ScriptedBackend, ScriptedEmbedder,
};
use switchboard_assistants::{LEADS, Roster, SALES, SqlDatabase};
use switchboard_knowledge::KnowledgeBase;
use switchboard_server::{AppState, Resources, ServerConfig, build_router};
use tower::ServiceExt;

const BOUNDARY: &str = "switchboard-test-boundary";

async fn app(backend: &Arc<ScriptedBackend>) -> Router {
    let resources = Resources {
        backend: Arc::clone(backend) as Arc<dyn LlmBackend>,
        embedder: Arc::new(ScriptedEmbedder::default()) as Arc<dyn EmbeddingBackend>,
        knowledge: Arc::new(KnowledgeBase::in_memory()),
        lead_database: SqlDatabase::connect("sqlite::memory:", &LEADS)
            .await
            .expect("lead database"),
        sales_database: SqlDatabase::connect("sqlite::memory:", &SALES)
            .await
            .expect("sales database"),
        roster: Roster::sample().expect("roster"),
    };
    let config = ServerConfig::from_toml("[llm]\napi_key = \"sk-test\"").expect("config");
    let state = AppState::new(resources, config.server.recursion_limit).expect("state");
    build_router(Arc::new(state), &config)
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_file(uri: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).expect("json body"))
}

#[tokio::test]
async fn health_check() {
    let app = app(&Arc::new(ScriptedBackend::new())).await;
    let request = Request::get("/").body(Body::empty()).expect("request");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn translate_returns_translated_text() {
    let backend = Arc::new(ScriptedBackend::new().with_response(LlmResponse::text(" Bonjour ")));
    let app = app(&backend).await;
    let (status, body) = send_json(
        &app,
        post_json("/translate", json!({"text": "Hello", "target_language": "French"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"translated_text": "Bonjour"}));
}

#[tokio::test]
async fn blank_fields_are_bad_requests() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = app(&backend).await;
    for (uri, body) in [
        ("/translate", json!({"text": "  ", "target_language": "Thai"})),
        ("/tourism/ask", json!({"question": ""})),
        ("/generate_report", json!({})),
        ("/run-simulation", json!({"policy_text": "\n"})),
        ("/hr/chat", json!({"prompt": " ", "chat_history": []})),
        ("/invoke", json!({"message": "", "thread_id": "t-1"})),
        ("/chat", json!({"query": ""})),
        ("/sales/query", json!({"query": " "})),
    ] {
        let (status, body) = send_json(&app, post_json(uri, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()), "{uri}");
    }
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn translation_backend_failure_is_unavailable() {
    let backend = Arc::new(ScriptedBackend::new().with_error(LlmError::RequestFailed {
        status: Some(503),
        reason: "overloaded".to_string(),
    }));
    let app = app(&backend).await;
    let (status, _) = send_json(
        &app,
        post_json("/translate", json!({"text": "Hello", "target_language": "Thai"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn model_failure_is_a_generic_internal_error() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = app(&backend).await;
    let (status, body) = send_json(
        &app,
        post_json("/run-simulation", json!({"policy_text": "Four-day week"})),
    )
    .await;
    // Per-employee failures are reported in the rows, not as an error.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
    assert!(
        body["data"]
            .as_array()
            .is_some_and(|rows| rows.iter().all(|r| r["sentiment"] == "error"))
    );

    let (status, body) = send_json(
        &app,
        post_json("/hr/chat", json!({"prompt": "How many leave days do I get?"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn invoke_records_thread_history() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(LlmResponse::text("True"))
            .with_response(LlmResponse::text("The Smart Collar costs $199.")),
    );
    let app = app(&backend).await;

    let (status, body) = send_json(
        &app,
        post_json(
            "/invoke",
            json!({"message": "How much is the collar?", "thread_id": "thread-7"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"response": "The Smart Collar costs $199."}));

    let request = Request::get("/history/thread-7").body(Body::empty()).expect("request");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"type": "human", "content": "How much is the collar?"},
            {"type": "ai", "content": "The Smart Collar costs $199."}
        ])
    );
}

#[tokio::test]
async fn sales_question_returns_sql_and_rows() {
    let backend = Arc::new(ScriptedBackend::new().with_response(LlmResponse::text(
        "```sql\nSELECT \"ProductName\", \"Price\" FROM products WHERE \"Price\" > 100 ORDER BY \"Price\" DESC;\n```",
    )));
    let app = app(&backend).await;
    let (status, body) = send_json(
        &app,
        post_json("/sales/query", json!({"query": "Which products cost more than 100?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["sql"],
        "SELECT \"ProductName\", \"Price\" FROM products WHERE \"Price\" > 100 ORDER BY \"Price\" DESC;"
    );
    assert_eq!(
        body["rows"],
        json!([
            {"ProductName": "Laptop", "Price": 1200},
            {"ProductName": "Monitor", "Price": 300}
        ])
    );
}

#[tokio::test]
async fn history_of_unknown_thread_is_empty() {
    let app = app(&Arc::new(ScriptedBackend::new())).await;
    let request = Request::get("/history/never-used").body(Body::empty()).expect("request");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn chat_streams_off_topic_rejection() {
    let backend = Arc::new(
        ScriptedBackend::new().with_response(LlmResponse::structured(json!({"decision": "off_topic"}))),
    );
    let app = app(&backend).await;
    let (status, body) = send(
        &app,
        post_json("/chat", json!({"query": "What's the weather tomorrow?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = String::from_utf8(body).expect("utf-8");
    let expected = switchboard_assistants::call_center::OFF_TOPIC_REPLY;
    assert!(
        body.lines().any(|line| line == format!("data: {expected}")),
        "{body}"
    );
}

#[tokio::test]
async fn knowledge_ingestion_feeds_tourism_answers() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(LlmResponse::structured(json!({"category": "Phuket"})))
            .with_response(LlmResponse::text("Visit Patong Beach.")),
    );
    let app = app(&backend).await;

    let (status, body) = send_json(
        &app,
        post_json(
            "/knowledge/phuket_tourism_places",
            json!({"text": "Patong Beach is the liveliest beach in Phuket.", "metadata": {"source": "guide"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"chunks": 1}));

    let (status, body) = send_json(
        &app,
        post_json("/tourism/ask", json!({"question": "Which beach in Phuket is lively?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"category": "Phuket", "answer": "Visit Patong Beach."}));

    let answer_request = &backend.requests()[1];
    assert!(answer_request.system().is_some_and(|s| s.contains("Phuket tourism")));
    let prompt = answer_request.last_user_text().expect("answer prompt");
    assert!(prompt.contains("Patong Beach is the liveliest beach in Phuket."));
}

#[tokio::test]
async fn invalid_collection_name_is_rejected() {
    let app = app(&Arc::new(ScriptedBackend::new())).await;
    let (status, _) = send_json(&app, post_json("/knowledge/bad.name", json!({"text": "hello"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_of_the_wrong_type_are_rejected() {
    let backend = Arc::new(ScriptedBackend::new());
    let app = app(&backend).await;

    let (status, body) = send_json(
        &app,
        post_file("/summarize", "notes.txt", "text/plain", b"just text"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|m| m.contains("Please upload a PDF"))
    );

    let (status, _) = send_json(
        &app,
        post_file("/generate-quotation", "order.pdf", "application/pdf", b"%PDF-1.4"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn quotation_is_priced_from_the_image() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(LlmResponse::structured(json!({
                "name": "Acme Ltd.",
                "address": "1 Main Road, Bangkok",
                "email": null,
                "telephone_number": "02-123-4567"
            })))
            .with_response(LlmResponse::structured(json!({
                "items": [
                    {"item_name": "Chair", "amount": 4, "unit": "pcs", "price": 250.0},
                    {"item_name": "Table", "amount": 1, "unit": "pcs", "price": 1000.0}
                ]
            }))),
    );
    let app = app(&backend).await;
    let (status, body) = send_json(
        &app,
        post_file("/generate-quotation", "order.jpg", "image/jpeg", b"\xff\xd8\xff"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["name"], "Acme Ltd.");
    assert_eq!(body["items"][0]["line"], 1);
    assert_eq!(body["items"][0]["total"], 1000.0);
    assert_eq!(body["subtotal"], 2000.0);
    assert_eq!(body["vat"], 120.0);
    assert_eq!(body["total"], 2120.0);
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let app = app(&Arc::new(ScriptedBackend::new())).await;
    let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{BOUNDARY}--\r\n");
    let request = Request::post("/summarize")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing 'file' field in form data.");
}
