//! C12 — chat history: the append-only session log of every chat/tool
//! message exchanged during a healing session.
//!
//! This is the *sole* channel through which LLM-interpreted content
//! (`rebanker_interpreted` role) may enter the orchestrator's record — raw
//! model output is classified into a [`crate::packet::DiagnosticPacket`]
//! first; nothing downstream trusts free text directly. A fatal
//! [`crate::error::HealError`] is always recorded here as a `tool` message
//! before it propagates, so the session transcript always explains why it
//! ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The seed/system prompt that opens a session's transcript.
    System,
    User,
    Assistant,
    /// Tool-originated output: sandbox results, breaker transitions, fatal
    /// errors.
    Tool,
    /// Raw model output already run through the classifier — content here
    /// is advisory only, never re-parsed as ground truth.
    RebankerInterpreted,
}

/// Per-message metadata carried alongside role/content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageMetadata {
    /// Which phase of a healing session produced this message, e.g.
    /// `"attempt"` — `None` for messages that don't belong to a phase
    /// (the system seed, fatal-error records).
    pub phase: Option<String>,
}

/// One entry in the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
    pub metadata: MessageMetadata,
}

/// Append-only session transcript.
///
/// `audit_buffer` mirrors `messages` as JSON-line serialized strings, one
/// per recorded message, so a caller can flush the transcript to a log
/// sink without re-serializing the whole history on every write.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
    audit_buffer: Vec<String>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, role: Role, content: serde_json::Value, now: DateTime<Utc>) {
        self.record_with_phase(role, content, None, now);
    }

    /// Record a message tagged with the healing-session phase that
    /// produced it, e.g. `"attempt"` for the retry loop's per-iteration
    /// candidate payload.
    pub fn record_with_phase(
        &mut self,
        role: Role,
        content: serde_json::Value,
        phase: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let message = ChatMessage {
            role,
            content,
            recorded_at: now,
            metadata: MessageMetadata {
                phase: phase.map(str::to_string),
            },
        };
        if let Ok(line) = serde_json::to_string(&message) {
            self.audit_buffer.push(line);
        }
        self.messages.push(message);
    }

    /// Record a fatal error as a `tool` message, to be called immediately
    /// before the error propagates out of the orchestrator.
    pub fn record_fatal(&mut self, err: &crate::error::HealError, now: DateTime<Utc>) {
        self.record(
            Role::Tool,
            serde_json::json!({"fatal": true, "error": err.to_string()}),
            now,
        );
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// JSON-line audit records, one per message in recording order.
    pub fn audit_lines(&self) -> &[String] {
        &self.audit_buffer
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HealError;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut history = ChatHistory::new();
        history.record(Role::User, serde_json::json!("hi"), now());
        history.record(Role::Assistant, serde_json::json!("hello"), now());
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].role, Role::User);
    }

    #[test]
    fn test_record_fatal_logs_as_tool_message() {
        let mut history = ChatHistory::new();
        let err = HealError::RateLimited("too many attempts".to_string());
        history.record_fatal(&err, now());
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].role, Role::Tool);
        assert!(history.messages()[0].content["fatal"].as_bool().unwrap());
    }

    #[test]
    fn test_empty_history_reports_empty() {
        let history = ChatHistory::new();
        assert!(history.is_empty());
    }

    #[test]
    fn test_system_role_seeds_the_transcript() {
        let mut history = ChatHistory::new();
        history.record(Role::System, serde_json::json!("session seed"), now());
        assert_eq!(history.messages()[0].role, Role::System);
    }

    #[test]
    fn test_record_with_phase_sets_metadata() {
        let mut history = ChatHistory::new();
        history.record_with_phase(Role::User, serde_json::json!({"attempt": 0}), Some("attempt"), now());
        assert_eq!(history.messages()[0].metadata.phase, Some("attempt".to_string()));
    }

    #[test]
    fn test_record_without_phase_leaves_metadata_empty() {
        let mut history = ChatHistory::new();
        history.record(Role::User, serde_json::json!("hi"), now());
        assert_eq!(history.messages()[0].metadata.phase, None);
    }

    #[test]
    fn test_audit_buffer_mirrors_recorded_messages() {
        let mut history = ChatHistory::new();
        history.record(Role::User, serde_json::json!("hi"), now());
        history.record(Role::Assistant, serde_json::json!("hello"), now());
        assert_eq!(history.audit_lines().len(), 2);
        assert!(history.audit_lines()[0].contains("\"hi\""));
    }
}
