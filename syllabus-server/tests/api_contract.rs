use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use syllabus_rag::{CourseProfile, Generator, RagError};
use syllabus_server::{
    ServerConfig, app_router,
    knowledge::build_pipeline_with,
    protocol::{AskResponse, MessagesResponse, StatusResponse},
    server::AppState,
    session::Role,
};

const SYLLABUS: &str = "ITEC 3310 Data Management and Analytics\n\n\
Late assignments lose 10% per day, up to three days. After that they receive zero.\n\n\
The midterm exam is held in week 8 during the regular lecture slot.\n\n\
Final grade: assignments 40%, midterm 25%, final project 35%.";

struct FixedGenerator(&'static str);

#[async_trait]
impl Generator for FixedGenerator {
    async fn generate(&self, _prompt: &str) -> syllabus_rag::Result<String> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Fails its first call, then answers normally.
#[derive(Default)]
struct FlakyGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for FlakyGenerator {
    async fn generate(&self, _prompt: &str) -> syllabus_rag::Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(RagError::GenerationError {
                provider: "flaky".into(),
                message: "quota exceeded".into(),
            });
        }
        Ok("The midterm is in week 8.".to_string())
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

fn write_syllabus(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("syllabus-server-{}-{}", test_name, std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("itec3310_syllabus.txt");
    std::fs::write(&path, SYLLABUS).expect("write syllabus");
    path
}

async fn ready_state(test_name: &str, generator: Arc<dyn Generator>) -> AppState {
    let config = ServerConfig { syllabus_path: write_syllabus(test_name), ..ServerConfig::default() };
    let pipeline = build_pipeline_with(&config, generator).await.expect("pipeline builds");
    AppState::ready(Arc::new(pipeline))
}

async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

async fn create_session(client: &reqwest::Client, base: &str) -> String {
    let created: Value = client
        .post(format!("{}/api/session", base))
        .send()
        .await
        .expect("session create response")
        .json()
        .await
        .expect("session json");
    created.get("session_id").and_then(Value::as_str).expect("session_id field").to_string()
}

#[tokio::test]
async fn health_and_status_report_ready_course() {
    let state = ready_state("status", Arc::new(FixedGenerator("ok"))).await;
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();

    let health: Value =
        client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "syllabus-server");

    let status: StatusResponse =
        client.get(format!("{}/api/status", base)).send().await.unwrap().json().await.unwrap();
    assert!(status.ready);
    assert_eq!(status.course.code, "ITEC 3310");
    assert_eq!(status.course.suggestions.len(), 5);
    assert_eq!(status.model.as_deref(), Some("fixed"));
    assert!(status.chunk_count.unwrap_or_default() >= 1);
    assert!(status.error.is_none());

    handle.abort();
}

#[tokio::test]
async fn ask_appends_question_and_cited_answer() {
    let state =
        ready_state("ask", Arc::new(FixedGenerator("  Late work loses 10% per day.  "))).await;
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await;

    let response = client
        .post(format!("{}/api/session/{}/ask", base, session_id))
        .json(&serde_json::json!({ "question": "What is the late assignment policy?" }))
        .send()
        .await
        .expect("ask response");
    assert!(response.status().is_success());

    let body: AskResponse = response.json().await.expect("ask json");
    assert!(body.ok);
    let reply = body.message.expect("assistant message");
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "Late work loses 10% per day.");
    let source = reply.source.expect("citation");
    assert!(source.starts_with("ITEC 3310 Syllabus — "), "unexpected source: {source}");
    assert!(source.ends_with('…'));

    let log: MessagesResponse = client
        .get(format!("{}/api/session/{}/messages", base, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(log.messages.len(), 2);
    assert_eq!(log.messages[0].role, Role::User);
    assert_eq!(log.messages[0].content, "What is the late assignment policy?");
    assert_eq!(log.messages[1].content, "Late work loses 10% per day.");

    handle.abort();
}

#[tokio::test]
async fn blank_question_is_rejected_without_touching_log() {
    let state = ready_state("blank", Arc::new(FixedGenerator("unused"))).await;
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await;

    let response = client
        .post(format!("{}/api/session/{}/ask", base, session_id))
        .json(&serde_json::json!({ "question": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let log: MessagesResponse = client
        .get(format!("{}/api/session/{}/messages", base, session_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(log.messages.is_empty());

    handle.abort();
}

async fn ask(client: &reqwest::Client, base: &str, session_id: &str, question: &str) -> AskResponse {
    client
        .post(format!("{}/api/session/{}/ask", base, session_id))
        .json(&serde_json::json!({ "question": question }))
        .send()
        .await
        .expect("ask response")
        .json()
        .await
        .expect("ask json")
}

async fn messages(client: &reqwest::Client, base: &str, session_id: &str) -> MessagesResponse {
    client
        .get(format!("{}/api/session/{}/messages", base, session_id))
        .send()
        .await
        .expect("messages response")
        .json()
        .await
        .expect("messages json")
}

#[tokio::test]
async fn generation_failure_becomes_apology_without_source() {
    let state = ready_state("failing", Arc::new(FlakyGenerator::default())).await;
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await;

    let body = ask(&client, &base, &session_id, "When is the midterm exam?").await;
    let reply = body.message.expect("apology message");
    assert!(reply.content.starts_with("Sorry, something went wrong: "), "{}", reply.content);
    assert!(reply.content.contains("quota exceeded"));
    assert!(reply.source.is_none());

    let log = messages(&client, &base, &session_id).await.messages;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, Role::User);
    assert_eq!(log[0].content, "When is the midterm exam?");
    assert_eq!(log[1].role, Role::Assistant);
    assert_eq!(log[1], reply);

    // the index is untouched, so the next turn retrieves and cites normally
    let retry = ask(&client, &base, &session_id, "When is the midterm exam?").await;
    let answer = retry.message.expect("assistant message");
    assert_eq!(answer.content, "The midterm is in week 8.");
    assert!(answer.source.is_some_and(|s| s.starts_with("ITEC 3310 Syllabus — ")));
    assert_eq!(messages(&client, &base, &session_id).await.messages.len(), 4);

    handle.abort();
}

#[tokio::test]
async fn sessions_keep_separate_logs_and_can_be_ended() {
    let state = ready_state("sessions", Arc::new(FixedGenerator("Week 8."))).await;
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();
    let first = create_session(&client, &base).await;
    let second = create_session(&client, &base).await;

    client
        .post(format!("{}/api/session/{}/ask", base, first))
        .json(&serde_json::json!({ "question": "When is the midterm exam?" }))
        .send()
        .await
        .unwrap();

    let other: MessagesResponse = client
        .get(format!("{}/api/session/{}/messages", base, second))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(other.messages.is_empty());

    let ended = client.delete(format!("{}/api/session/{}", base, first)).send().await.unwrap();
    assert_eq!(ended.status(), StatusCode::NO_CONTENT);

    let gone = client
        .get(format!("{}/api/session/{}/messages", base, first))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn failed_setup_blocks_ui_and_api() {
    let state = AppState::failed(CourseProfile::default(), "GOOGLE_API_KEY is not set");
    let (base, handle) = spawn_server(state).await;
    let client = reqwest::Client::new();

    let page = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::SERVICE_UNAVAILABLE);
    let html = page.text().await.unwrap();
    assert!(html.contains("Could not build pipeline: GOOGLE_API_KEY is not set"));

    let status: StatusResponse =
        client.get(format!("{}/api/status", base)).send().await.unwrap().json().await.unwrap();
    assert!(!status.ready);
    assert!(status.hint.unwrap_or_default().contains("GOOGLE_API_KEY"));

    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let created = client.post(format!("{}/api/session", base)).send().await.unwrap();
    assert_eq!(created.status(), StatusCode::SERVICE_UNAVAILABLE);

    let session_url = format!("{}/api/session/any-id", base);
    let messages = client.get(format!("{}/messages", session_url)).send().await.unwrap();
    assert_eq!(messages.status(), StatusCode::SERVICE_UNAVAILABLE);
    let ended = client.delete(&session_url).send().await.unwrap();
    assert_eq!(ended.status(), StatusCode::SERVICE_UNAVAILABLE);

    let ask = client
        .post(format!("{}/ask", session_url))
        .json(&serde_json::json!({ "question": "When is the midterm exam?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(ask.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: AskResponse = ask.json().await.unwrap();
    assert!(!body.ok);
    assert_eq!(body.error.as_deref(), Some("pipeline_unavailable"));

    handle.abort();
}
