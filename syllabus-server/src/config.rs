//! Server configuration read from the environment.

use std::path::PathBuf;

use syllabus_rag::CourseProfile;
use syllabus_rag::gemini::DEFAULT_GEMINI_MODEL;
use tracing::warn;

/// Default location of the syllabus, relative to the working directory.
pub const DEFAULT_SYLLABUS_PATH: &str = "itec3310_syllabus.txt";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub syllabus_path: PathBuf,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub course: CourseProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            syllabus_path: PathBuf::from(DEFAULT_SYLLABUS_PATH),
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            course: CourseProfile::default(),
        }
    }
}

impl ServerConfig {
    /// Build a config from `SYLLABUS_*`, `GOOGLE_API_KEY` and `GEMINI_MODEL`.
    ///
    /// Unset variables keep their defaults. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match non_empty("SYLLABUS_PORT") {
            Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
                warn!(value = %value, "ignoring invalid SYLLABUS_PORT");
                defaults.port
            }),
            None => defaults.port,
        };

        let mut course = defaults.course;
        if let Some(code) = non_empty("SYLLABUS_COURSE_CODE") {
            course.code = code;
        }
        if let Some(title) = non_empty("SYLLABUS_COURSE_TITLE") {
            course.title = title;
        }
        if let Some(term) = non_empty("SYLLABUS_TERM") {
            course.term = term;
        }
        if let Some(instructor) = non_empty("SYLLABUS_INSTRUCTOR") {
            course.instructor = instructor;
        }

        Self {
            host: non_empty("SYLLABUS_HOST").unwrap_or(defaults.host),
            port,
            syllabus_path: non_empty("SYLLABUS_PATH").map(PathBuf::from).unwrap_or(defaults.syllabus_path),
            google_api_key: non_empty("GOOGLE_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            course,
        }
    }
}
