//! Bounded in-memory log of notable events for the current session
//!
//! Failures that are only reported in passing (a refused request, a dropped
//! connection) are kept here so a later error banner can point the user at
//! them, and `--verbose` runs can replay them on exit.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

use crate::Level;

const SESSION_CAPACITY: usize = 200;

/// A single recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: Level,
  pub component: String,
  pub message: String,
}

/// Fixed-capacity event storage; the oldest entry is dropped when full
pub struct EventLog {
  entries: Mutex<VecDeque<LogEntry>>,
  max_entries: usize,
}

impl EventLog {
  pub fn new(max_entries: usize) -> Self {
    Self { entries: Mutex::new(VecDeque::with_capacity(max_entries)), max_entries }
  }

  pub fn push(&self, level: Level, component: &str, message: &str) {
    if self.max_entries == 0 {
      return;
    }

    let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if entries.len() >= self.max_entries {
      entries.pop_front();
    }

    entries.push_back(LogEntry {
      timestamp: Utc::now(),
      level,
      component: component.to_string(),
      message: message.to_string(),
    });
  }

  /// Most recent entries first, optionally filtered by level
  pub fn recent(&self, limit: Option<usize>, level: Option<Level>) -> Vec<LogEntry> {
    let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let matching = entries.iter().rev().filter(|entry| level.map_or(true, |l| entry.level == l));

    match limit {
      Some(limit) => matching.take(limit).cloned().collect(),
      None => matching.cloned().collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn max_capacity(&self) -> usize {
    self.max_entries
  }

  pub fn clear(&self) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }
}

/// Process-wide log used by [`crate::record`]
pub fn session() -> &'static EventLog {
  static SESSION: OnceLock<EventLog> = OnceLock::new();
  SESSION.get_or_init(|| EventLog::new(SESSION_CAPACITY))
}
