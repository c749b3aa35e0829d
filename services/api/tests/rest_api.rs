mod common;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use common::{envelope, quiz_json, summary_json, unavailable, ScriptedModel, TestApp};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(app: Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    let (status, body) = send(app.router(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn quiz_endpoint_returns_generated_questions() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope(&quiz_json(5).to_string()))));
    app.add_attachment(1, 10, "week1.txt", "text/plain", b"Supply and demand.");

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/1/ai/quiz",
        Some(json!({ "question_count": 5, "difficulty": "easy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let quiz = body["quiz"].as_array().unwrap();
    assert_eq!(quiz.len(), 5);
    assert_eq!(quiz[0]["options"].as_array().unwrap().len(), 4);
    assert_eq!(quiz[0]["correct_answer"], "Right 1");
}

#[tokio::test]
async fn summary_endpoint_returns_summary_with_source() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope(&summary_json().to_string()))));
    app.add_attachment(2, 20, "cells.pdf", "application/pdf", b"%PDF-1.4 cells");

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/2/ai/summary",
        Some(json!({ "summary_type": "concise", "max_words": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["word_count"], 42);
    assert_eq!(body["summary"]["summary_type"], "concise");
    assert_eq!(body["source"]["attachment_id"], 20);
    assert_eq!(body["source"]["file_name"], "cells.pdf");
    assert_eq!(body["source"]["size"], 14);
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn invalid_parameters_return_422_with_field() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    app.add_attachment(3, 30, "notes.txt", "text/plain", b"Notes");

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/3/ai/quiz",
        Some(json!({ "difficulty": "impossible" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "difficulty");
    assert!(body["error"].as_str().unwrap().contains("impossible"));
}

#[tokio::test]
async fn resource_without_attachments_returns_422() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    app.resources.insert(4, Vec::new());

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/4/ai/summary",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("no attachments"));
}

#[tokio::test]
async fn unknown_resource_or_attachment_returns_404() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    app.add_attachment(5, 50, "notes.txt", "text/plain", b"Notes");

    let (status, _) = send(
        app.router(),
        Method::POST,
        "/resources/999/ai/quiz",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/5/ai/quiz",
        Some(json!({ "attachment_id": 51 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Attachment 51"));
}

#[tokio::test]
async fn generation_failure_returns_500() {
    let app = TestApp::new(ScriptedModel::always(Err(unavailable())));
    app.add_attachment(6, 60, "notes.txt", "text/plain", b"Notes");

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/6/ai/quiz",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to generate content: "));
}

#[tokio::test]
async fn job_is_accepted_and_can_be_polled() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope(&quiz_json(2).to_string()))));
    app.add_attachment(7, 70, "notes.txt", "text/plain", b"Notes");

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/7/ai/jobs",
        Some(json!({ "type": "quiz", "question_count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

    app.wait_for_job(job_id).await;
    let (status, body) = send(
        app.router(),
        Method::GET,
        &format!("/ai/jobs/{job_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["type"], "quiz");
    assert_eq!(body["attachment_id"], 70);
    assert_eq!(body["result"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn job_with_invalid_parameters_is_rejected() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/8/ai/jobs",
        Some(json!({ "type": "quiz", "question_count": 21 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "question_count");
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    let (status, _) = send(
        app.router(),
        Method::GET,
        &format!("/ai/jobs/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quiz_without_a_body_uses_defaults() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope(&quiz_json(5).to_string()))));
    app.add_attachment(9, 90, "notes.txt", "text/plain", b"Defaults");

    let (status, body) = send_raw(app.router(), "/resources/9/ai/quiz", None, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quiz"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn malformed_bodies_return_422_json() {
    let app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    app.add_attachment(10, 100, "notes.txt", "text/plain", b"Notes");

    let cases = [
        ("/resources/10/ai/jobs", r#"{"type":"essay"}"#),
        ("/resources/10/ai/quiz", r#"{"question_count":"five"}"#),
        ("/resources/10/ai/summary", "not json"),
    ];
    for (uri, raw) in cases {
        let (status, body) = send_raw(app.router(), uri, Some("application/json"), raw).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri} {raw}");
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("Invalid request body")),
            "{uri} {raw}: {body}"
        );
    }
    assert_eq!(app.model.calls(), 0);
}

#[tokio::test]
async fn job_submitted_during_shutdown_returns_503() {
    let mut app = TestApp::new(ScriptedModel::always(Ok(envelope("[]"))));
    app.add_attachment(11, 110, "notes.txt", "text/plain", b"Notes");
    app.stop_workers().await;

    let (status, body) = send(
        app.router(),
        Method::POST,
        "/resources/11/ai/jobs",
        Some(json!({ "type": "summary" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("shutting down"));
}
