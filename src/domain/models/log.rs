//! Shared per-round discussion log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// One contribution to the workday log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique per entry.
    pub id: Uuid,
    /// Author of the entry.
    pub role: Role,
    /// Message text; empty while provisional.
    pub content: String,
    /// When the entry was written or settled.
    pub timestamp: DateTime<Utc>,
    /// Placeholder written before the role's call completes.
    pub provisional: bool,
}

impl LogEntry {
    /// Create a final entry.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            provisional: false,
        }
    }

    /// Create a provisional "thinking" entry for a role.
    pub fn provisional(role: Role) -> Self {
        Self {
            provisional: true,
            ..Self::new(role, "...")
        }
    }
}

/// Ordered, append-only log of a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkdayLog {
    entries: Vec<LogEntry>,
}

impl WorkdayLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Append a final entry and return a copy of it.
    pub fn push(&mut self, entry: LogEntry) -> LogEntry {
        self.entries.push(entry.clone());
        entry
    }

    /// Append a provisional entry for `role` and return a copy of it.
    pub fn push_provisional(&mut self, role: Role) -> LogEntry {
        self.push(LogEntry::provisional(role))
    }

    /// Replace the role's trailing provisional entry with final content, or
    /// append when the last entry is not that placeholder.
    pub fn settle(&mut self, role: Role, content: impl Into<String>) -> LogEntry {
        let entry = LogEntry::new(role, content);
        match self.entries.last_mut() {
            Some(last) if last.provisional && last.role == role => {
                *last = entry.clone();
                entry
            }
            _ => self.push(entry),
        }
    }

    /// Remove the role's trailing provisional entry, if present.
    pub fn discard_provisional(&mut self, role: Role) -> Option<LogEntry> {
        match self.entries.last() {
            Some(last) if last.provisional && last.role == role => self.entries.pop(),
            _ => None,
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Final entries only, formatted as `[Role]: content` blocks.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .filter(|e| !e.provisional)
            .map(|e| format!("[{}]: {}", e.role, e.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
