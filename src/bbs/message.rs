//! Posted message records and their fixed textual summary rendering.

use chrono::{DateTime, Utc};

/// Subject stored when a post arrives with an empty subject field.
pub const NO_SUBJECT: &str = "(no subject)";

/// One posted item. Immutable after creation; owned by the group it was
/// posted into and never deleted.
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique, monotonically increasing, process-lifetime scope.
    pub id: u64,
    /// Posting session's username at post time.
    pub sender: String,
    pub posted_at: DateTime<Utc>,
    pub subject: String,
    pub content: String,
}

impl Message {
    pub fn new(id: u64, sender: &str, subject: &str, content: &str) -> Self {
        let subject = subject.trim();
        Message {
            id,
            sender: sender.to_string(),
            posted_at: Utc::now(),
            subject: if subject.is_empty() {
                NO_SUBJECT.to_string()
            } else {
                subject.to_string()
            },
            content: content.to_string(),
        }
    }

    /// Fixed summary format: `id|sender|yyyy-MM-dd HH:mm:ss|subject`.
    pub fn summary(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.id,
            self.sender,
            self.posted_at.format("%Y-%m-%d %H:%M:%S"),
            self.subject
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summary_uses_fixed_format() {
        let msg = Message {
            id: 42,
            sender: "alice".to_string(),
            posted_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 30).unwrap(),
            subject: "Hello".to_string(),
            content: "World".to_string(),
        };
        assert_eq!(msg.summary(), "42|alice|2025-03-01 09:05:30|Hello");
    }

    #[test]
    fn empty_subject_gets_placeholder() {
        let msg = Message::new(1, "bob", "   ", "body");
        assert_eq!(msg.subject, NO_SUBJECT);
        assert_eq!(msg.content, "body");
    }

    #[test]
    fn subject_is_trimmed() {
        let msg = Message::new(2, "bob", "  status  ", "body");
        assert_eq!(msg.subject, "status");
    }
}
