//! Prompt assembly and the course profile that parameterises it.

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// Rendered in place of the context section when retrieval found nothing.
pub const EMPTY_CONTEXT_MARKER: &str = "(no syllabus content matched this question)";

/// Course details shown in the UI and baked into the instruction template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseProfile {
    /// Short course code, e.g. `ITEC 3310`.
    pub code: String,
    /// Course title.
    pub title: String,
    /// Term label shown under the title.
    pub term: String,
    /// Who students should contact when the syllabus is silent.
    pub instructor: String,
    /// Suggested questions offered before the first turn.
    pub suggestions: Vec<String>,
}

impl Default for CourseProfile {
    fn default() -> Self {
        Self {
            code: "ITEC 3310".to_string(),
            title: "Data Management and Analytics".to_string(),
            term: "Fall 2026".to_string(),
            instructor: "Dr. Nguyen".to_string(),
            suggestions: [
                "What's the late assignment policy?",
                "How is the final grade calculated?",
                "When is the midterm exam?",
                "Can I use AI tools for assignments?",
                "How do I contact the instructor?",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl CourseProfile {
    /// Label prefixed to citations, e.g. `ITEC 3310 Syllabus`.
    pub fn source_label(&self) -> String {
        format!("{} Syllabus", self.code)
    }

    /// What the assistant says when the answer is not in the syllabus.
    pub fn fallback_utterance(&self) -> String {
        format!("I can't find that in the syllabus — please check with {} directly.", self.instructor)
    }
}

/// The fixed instruction template sent to the generator.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplate {
    profile: CourseProfile,
}

impl PromptTemplate {
    /// Create a template for the given course.
    pub fn new(profile: CourseProfile) -> Self {
        Self { profile }
    }

    /// The course this template is written for.
    pub fn profile(&self) -> &CourseProfile {
        &self.profile
    }

    /// Render the prompt for `question` grounded in `retrieved`, in rank order.
    pub fn assemble(&self, retrieved: &[SearchResult], question: &str) -> String {
        let context = if retrieved.is_empty() {
            EMPTY_CONTEXT_MARKER.to_string()
        } else {
            retrieved.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
        };

        format!(
            "You are a helpful course assistant for {code} — {title}.\n\
             Answer the student's question using ONLY the course syllabus content provided below.\n\
             Be concise, friendly, and precise. If the answer is not in the syllabus, say clearly:\n\
             \"{fallback}\"\n\
             Do NOT make up policies or dates.\n\
             \n\
             Syllabus content:\n\
             {context}\n\
             \n\
             Student question: {question}\n\
             \n\
             Answer:",
            code = self.profile.code,
            title = self.profile.title,
            fallback = self.profile.fallback_utterance(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn result(text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                embedding: vec![1.0],
                metadata: HashMap::new(),
                document_id: "syllabus".to_string(),
            },
            score,
        }
    }

    #[test]
    fn context_keeps_rank_order_separated_by_blank_lines() {
        let template = PromptTemplate::default();
        let prompt = template.assemble(
            &[result("Midterm is October 14.", 0.9), result("Final is in December.", 0.5)],
            "When is the midterm?",
        );

        assert!(prompt.contains("Syllabus content:\nMidterm is October 14.\n\nFinal is in December.\n"));
        assert!(prompt.ends_with("Student question: When is the midterm?\n\nAnswer:"));
    }

    #[test]
    fn instructions_name_domain_fallback_and_restrictions() {
        let prompt = PromptTemplate::default().assemble(&[result("x", 1.0)], "q");

        assert!(prompt.starts_with(
            "You are a helpful course assistant for ITEC 3310 — Data Management and Analytics."
        ));
        assert!(prompt.contains("using ONLY the course syllabus content"));
        assert!(prompt.contains(
            "\"I can't find that in the syllabus — please check with Dr. Nguyen directly.\""
        ));
        assert!(prompt.contains("Do NOT make up policies or dates."));
    }

    #[test]
    fn empty_retrieval_renders_marker() {
        let prompt = PromptTemplate::default().assemble(&[], "Is there a lab fee?");

        assert!(prompt.contains(&format!("Syllabus content:\n{EMPTY_CONTEXT_MARKER}\n\n")));
        assert!(prompt.contains("Student question: Is there a lab fee?"));
    }

    #[test]
    fn custom_profile_changes_domain_and_contact() {
        let profile = CourseProfile {
            code: "CS 101".into(),
            title: "Intro".into(),
            instructor: "Prof. Ada".into(),
            ..CourseProfile::default()
        };
        let prompt = PromptTemplate::new(profile.clone()).assemble(&[], "q");

        assert!(prompt.contains("CS 101 — Intro"));
        assert!(prompt.contains("please check with Prof. Ada directly"));
        assert_eq!(profile.source_label(), "CS 101 Syllabus");
    }
}
