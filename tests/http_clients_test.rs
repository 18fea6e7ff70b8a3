use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pondwatch::directory::{DirectoryError, HttpRecipientDirectory, RecipientDirectory};
use pondwatch::dispatcher::{DispatchConfig, Dispatcher};
use pondwatch::transport::{HttpPushTransport, PushTransport, TransportError};
use pondwatch::{AlertPayload, BatchStatus};

mod common;
use common::addresses;

/// One request as the fake gateway saw it.
#[derive(Debug, Clone)]
struct Captured {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Gateway {
    status: StatusCode,
    reply: Value,
    hits: Arc<Mutex<Vec<Captured>>>,
}

async fn gateway_send(
    State(gateway): State<Gateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    // ---
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    gateway.hits.lock().unwrap().push(Captured {
        authorization,
        body,
    });
    (gateway.status, Json(gateway.reply.clone()))
}

async fn serve(app: Router) -> Result<String> {
    // ---
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(base)
}

/// Start a push gateway answering every send with `status` and `reply`.
async fn start_gateway(
    status: StatusCode,
    reply: Value,
) -> Result<(String, Arc<Mutex<Vec<Captured>>>)> {
    // ---
    let hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/send", post(gateway_send))
        .with_state(Gateway {
            status,
            reply,
            hits: hits.clone(),
        });
    let base = serve(app).await?;
    Ok((format!("{}/send", base), hits))
}

async fn start_directory(status: StatusCode, users: Value) -> Result<String> {
    // ---
    let app = Router::new().route(
        "/users",
        get(move || {
            let users = users.clone();
            async move { (status, Json(users)) }
        }),
    );
    Ok(format!("{}/users", serve(app).await?))
}

fn payload() -> AlertPayload {
    // ---
    AlertPayload {
        title: "⚠️ Alert at pond-4".to_string(),
        body: "Oxygen out of range: 3 mg/L".to_string(),
        data: BTreeMap::from([
            ("siteId".to_string(), "pond-4".to_string()),
            ("riskScore".to_string(), "0.020".to_string()),
        ]),
    }
}

fn transport(url: &str, key: Option<&str>) -> HttpPushTransport {
    HttpPushTransport::new(url, key.map(String::from), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn transport_sends_tokens_notification_data_and_bearer() -> Result<()> {
    // ---
    let (url, hits) =
        start_gateway(StatusCode::OK, json!({ "successCount": 2, "failureCount": 0 })).await?;

    let report = transport(&url, Some("secret-key"))
        .send(&addresses(2), &payload())
        .await?;

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 0);

    let hits = hits.lock().unwrap().clone();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].authorization.as_deref(), Some("Bearer secret-key"));
    assert_eq!(
        hits[0].body,
        json!({
            "tokens": ["token-00", "token-01"],
            "notification": {
                "title": "⚠️ Alert at pond-4",
                "body": "Oxygen out of range: 3 mg/L"
            },
            "data": { "siteId": "pond-4", "riskScore": "0.020" }
        })
    );
    Ok(())
}

#[tokio::test]
async fn transport_without_key_sends_no_authorization() -> Result<()> {
    // ---
    let (url, hits) = start_gateway(StatusCode::OK, json!({ "successCount": 1 })).await?;

    transport(&url, None).send(&addresses(1), &payload()).await?;

    assert_eq!(hits.lock().unwrap()[0].authorization, None);
    Ok(())
}

#[tokio::test]
async fn transport_error_status_is_an_error() -> Result<()> {
    // ---
    let (url, _) = start_gateway(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await?;

    let err = transport(&url, None)
        .send(&addresses(2), &payload())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
    Ok(())
}

#[tokio::test]
async fn missing_failure_count_is_derived_from_batch() -> Result<()> {
    // ---
    let (url, _) = start_gateway(StatusCode::OK, json!({ "successCount": 1 })).await?;

    let report = transport(&url, None).send(&addresses(3), &payload()).await?;

    assert_eq!(report.success_count, 1);
    assert_eq!(report.failure_count, 2);
    Ok(())
}

#[tokio::test]
async fn accepted_reply_without_counts_is_delivered_once() -> Result<()> {
    // ---
    let (url, hits) = start_gateway(StatusCode::OK, json!({})).await?;
    let dispatcher = Dispatcher::new(Arc::new(transport(&url, None)), DispatchConfig::default());

    let outcome = dispatcher.dispatch(&addresses(2), &payload()).await;

    assert_eq!(hits.lock().unwrap().len(), 1);
    assert_eq!(outcome.batches[0].status, BatchStatus::Succeeded);
    assert_eq!(outcome.batches[0].attempts, 1);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 0);
    Ok(())
}

#[tokio::test]
async fn accepted_reply_with_unreadable_body_is_delivered_once() -> Result<()> {
    // ---
    let (url, hits) = start_gateway(StatusCode::OK, json!("queued")).await?;
    let dispatcher = Dispatcher::new(Arc::new(transport(&url, None)), DispatchConfig::default());

    let outcome = dispatcher.dispatch(&addresses(3), &payload()).await;

    assert_eq!(hits.lock().unwrap().len(), 1);
    assert_eq!(outcome.batches[0].status, BatchStatus::Succeeded);
    assert_eq!(outcome.succeeded, 3);
    Ok(())
}

#[tokio::test]
async fn directory_drops_users_without_usable_token() -> Result<()> {
    // ---
    let url = start_directory(
        StatusCode::OK,
        json!([
            { "pushToken": "tok-a" },
            {},
            { "pushToken": null },
            { "pushToken": "   " },
            { "pushToken": "tok-b", "name": "ignored" }
        ]),
    )
    .await?;

    let recipients = HttpRecipientDirectory::new(reqwest::Client::new(), url)
        .recipients()
        .await?;

    let tokens: Vec<&str> = recipients.iter().map(|r| r.as_str()).collect();
    assert_eq!(tokens, vec!["tok-a", "tok-b"]);
    Ok(())
}

#[tokio::test]
async fn directory_error_status_is_an_error() -> Result<()> {
    // ---
    let url = start_directory(StatusCode::SERVICE_UNAVAILABLE, json!([])).await?;

    let err = HttpRecipientDirectory::new(reqwest::Client::new(), url)
        .recipients()
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    Ok(())
}
