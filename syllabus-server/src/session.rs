use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syllabus_rag::RagPipeline;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::protocol::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a session's conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Citation for assistant turns that were grounded in a retrieved chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), source: None, created_at: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>, source: Option<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), source, created_at: Utc::now() }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    messages: RwLock<Vec<ChatMessage>>,
    // Serialises turns so a user message is always followed by its answer.
    turn: Mutex<()>,
}

#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionState>>>>,
}

impl SessionManager {
    pub async fn create_session(&self) -> SessionId {
        let session_id = Uuid::new_v4().to_string();
        let state = Arc::new(SessionState::default());
        self.sessions.write().await.insert(session_id.clone(), state);
        info!(session_id = %session_id, "session created");
        session_id
    }

    pub async fn ensure_session(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            sessions.insert(session_id.to_string(), Arc::new(SessionState::default()));
        }
    }

    pub async fn messages(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        let state = self.state(session_id).await?;
        Some(state.messages.read().await.clone())
    }

    /// Drop a session and its log. Returns `false` if it did not exist.
    pub async fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id, "session ended");
        }
        removed
    }

    /// Run one conversational turn against `pipeline`.
    ///
    /// Appends the question, then the assistant reply. A pipeline failure is
    /// recorded as an apology without a source rather than returned as an
    /// error. Returns the assistant message, or `None` if the session is
    /// unknown or the question is blank; the log is untouched in both cases.
    /// A session ended while the answer was being generated gets no reply
    /// and also yields `None`.
    pub async fn ask(
        &self,
        session_id: &str,
        question: &str,
        pipeline: &RagPipeline,
    ) -> Option<ChatMessage> {
        if question.trim().is_empty() {
            return None;
        }
        let state = self.state(session_id).await?;
        let _turn = state.turn.lock().await;

        state.messages.write().await.push(ChatMessage::user(question));

        let reply = match pipeline.answer(question).await {
            Ok(answer) => ChatMessage::assistant(answer.text, answer.citation),
            Err(e) => {
                warn!(session_id, error = %e, "turn failed");
                ChatMessage::assistant(format!("Sorry, something went wrong: {e}"), None)
            }
        };

        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(current) if Arc::ptr_eq(current, &state) => {
                state.messages.write().await.push(reply.clone());
                Some(reply)
            }
            _ => {
                warn!(session_id, "session ended during turn, reply dropped");
                None
            }
        }
    }

    async fn state(&self, session_id: &str) -> Option<Arc<SessionState>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use syllabus_rag::Generator;
    use tokio::sync::Notify;

    use super::*;
    use crate::{config::ServerConfig, knowledge::build_pipeline_with};

    /// Signals when generation starts, then waits to be released.
    #[derive(Default)]
    struct GatedGenerator {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Generator for GatedGenerator {
        async fn generate(&self, _prompt: &str) -> syllabus_rag::Result<String> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("Week 8.".to_string())
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    async fn gated_pipeline(generator: Arc<GatedGenerator>) -> Arc<RagPipeline> {
        let dir = std::env::temp_dir().join(format!("syllabus-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("syllabus.txt");
        std::fs::write(&path, "The midterm exam is held in week 8.").unwrap();

        let config = ServerConfig { syllabus_path: path, ..ServerConfig::default() };
        Arc::new(build_pipeline_with(&config, generator).await.unwrap())
    }

    #[tokio::test]
    async fn new_session_has_empty_log() {
        let manager = SessionManager::default();
        let id = manager.create_session().await;

        assert_eq!(manager.messages(&id).await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_endable() {
        let manager = SessionManager::default();
        let a = manager.create_session().await;
        let b = manager.create_session().await;
        assert_ne!(a, b);

        assert!(manager.end_session(&a).await);
        assert!(!manager.end_session(&a).await);
        assert_eq!(manager.messages(&a).await, None);
        assert_eq!(manager.messages(&b).await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn ensure_session_keeps_existing_log() {
        let manager = SessionManager::default();
        manager.ensure_session("fixed").await;
        manager
            .state("fixed")
            .await
            .unwrap()
            .messages
            .write()
            .await
            .push(ChatMessage::user("hello"));

        manager.ensure_session("fixed").await;
        assert_eq!(manager.messages("fixed").await.unwrap().len(), 1);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi", None)).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("source").is_none());
    }

    #[tokio::test]
    async fn reply_is_dropped_when_session_ends_mid_turn() {
        let generator = Arc::new(GatedGenerator::default());
        let pipeline = gated_pipeline(Arc::clone(&generator)).await;
        let manager = SessionManager::default();
        let id = manager.create_session().await;

        let turn = tokio::spawn({
            let manager = manager.clone();
            let id = id.clone();
            async move { manager.ask(&id, "When is the midterm?", &pipeline).await }
        });

        generator.started.notified().await;
        assert!(manager.end_session(&id).await);
        // a fresh session under the same id must not inherit the old turn
        manager.ensure_session(&id).await;
        generator.release.notify_one();

        assert_eq!(turn.await.unwrap(), None);
        assert_eq!(manager.messages(&id).await, Some(Vec::new()));
    }
}
