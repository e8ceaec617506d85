use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use syllabus_rag::{CourseProfile, PipelineCache, RagPipeline};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    config::ServerConfig,
    knowledge::build_pipeline,
    protocol::{AskRequest, AskResponse, MessagesResponse, SessionCreateResponse, StatusResponse},
    session::SessionManager,
};

pub const SETUP_HINT: &str = "Make sure `GOOGLE_API_KEY` is set in your environment or `.env` file and that the syllabus file exists.";

/// Whether the knowledge base could be built at startup.
#[derive(Clone)]
pub enum Readiness {
    Ready(Arc<RagPipeline>),
    Failed { error: String, hint: String },
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub profile: CourseProfile,
    pub readiness: Readiness,
}

impl AppState {
    pub fn ready(pipeline: Arc<RagPipeline>) -> Self {
        Self {
            sessions: SessionManager::default(),
            profile: pipeline.template().profile().clone(),
            readiness: Readiness::Ready(pipeline),
        }
    }

    pub fn failed(profile: CourseProfile, error: impl Into<String>) -> Self {
        Self {
            sessions: SessionManager::default(),
            profile,
            readiness: Readiness::Failed { error: error.into(), hint: SETUP_HINT.to_string() },
        }
    }

    /// The built pipeline, or 503 when setup failed.
    fn pipeline(&self) -> Result<&Arc<RagPipeline>, StatusCode> {
        match &self.readiness {
            Readiness::Ready(pipeline) => Ok(pipeline),
            Readiness::Failed { .. } => Err(StatusCode::SERVICE_UNAVAILABLE),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/session", post(create_session))
        .route("/api/session/{session_id}", delete(end_session))
        .route("/api/session/{session_id}/messages", get(list_messages))
        .route("/api/session/{session_id}/ask", post(ask))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the pipeline once, then serve the UI.
///
/// A build failure does not stop the server: the page and every session call
/// answer 503, and `/api/status` reports the error, until the process is
/// restarted with a working setup.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = match PipelineCache::global().get_or_try_init(|| build_pipeline(&config)).await {
        Ok(pipeline) => AppState::ready(pipeline),
        Err(e) => {
            error!(error = %e, "could not build pipeline");
            AppState::failed(config.course.clone(), e.to_string())
        }
    };

    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for syllabus-server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("syllabus-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Response {
    match &state.readiness {
        Readiness::Ready(_) => Html(include_str!("../ui/index.html")).into_response(),
        Readiness::Failed { error, hint } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(error_page(&state.profile, error, hint)),
        )
            .into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"syllabus-server"}))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let course = state.profile.clone();
    Json(match &state.readiness {
        Readiness::Ready(pipeline) => StatusResponse {
            ready: true,
            course,
            chunk_count: pipeline.index().map(|index| index.chunk_count()),
            model: Some(pipeline.generator_name().to_string()),
            error: None,
            hint: None,
        },
        Readiness::Failed { error, hint } => StatusResponse {
            ready: false,
            course,
            chunk_count: None,
            model: None,
            error: Some(error.clone()),
            hint: Some(hint.clone()),
        },
    })
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionCreateResponse>, StatusCode> {
    state.pipeline()?;
    let session_id = state.sessions.create_session().await;
    Ok(Json(SessionCreateResponse { session_id }))
}

async fn list_messages(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MessagesResponse>, StatusCode> {
    state.pipeline()?;
    let messages = state.sessions.messages(&session_id).await.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(MessagesResponse { session_id, messages }))
}

async fn end_session(Path(session_id): Path<String>, State(state): State<AppState>) -> StatusCode {
    if state.pipeline().is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if state.sessions.end_session(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn ask(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<AskResponse>)> {
    if request.question.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(AskResponse::rejected("empty_question"))));
    }
    let pipeline = state.pipeline().map_err(|_| {
        (StatusCode::SERVICE_UNAVAILABLE, Json(AskResponse::rejected("pipeline_unavailable")))
    })?;

    state.sessions.ensure_session(&session_id).await;
    let message = state
        .sessions
        .ask(&session_id, &request.question, pipeline)
        .await
        .ok_or_else(|| {
            (StatusCode::NOT_FOUND, Json(AskResponse::rejected("session_not_found")))
        })?;

    Ok(Json(AskResponse::answered(message)))
}

fn error_page(profile: &CourseProfile, error: &str, hint: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{code} Course Assistant</title>
<style>
body {{ background: #0f1117; color: #cdd5e8; font-family: 'DM Sans', sans-serif; max-width: 760px; margin: 4rem auto; padding: 0 1rem; }}
.error {{ background: #2a1418; border: 1px solid #6b2a33; border-radius: 8px; padding: 0.9rem 1.1rem; color: #f0b4bc; }}
.hint {{ background: #0d1420; border: 1px solid #1a2744; border-radius: 8px; padding: 0.9rem 1.1rem; margin-top: 0.75rem; color: #7a9fd4; }}
</style>
</head>
<body>
<div class="error">⚠️ Could not build pipeline: {error}</div>
<div class="hint">{hint}</div>
</body>
</html>
"#,
        code = escape_html(&profile.code),
        error = escape_html(error),
        hint = escape_html(hint),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
