//! `syllabus-server` is the conversational web front end for `syllabus-rag`.
//! It serves a single-page chat UI and a small JSON API over per-session
//! conversation logs.

pub mod config;
pub mod knowledge;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use server::{AppState, Readiness, app_router, run_server};
