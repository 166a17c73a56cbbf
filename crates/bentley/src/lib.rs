//! ## Features
//!
//! - Leveled terminal output (verbose, info, warn, error, success)
//! - Multi-line message support with consistent prefixes
//! - Timestamped events for long-running operations
//! - Banner displays for failures the user must act on
//! - A bounded, in-memory event log that can be replayed at the end of a session
//! - All output to stderr so stdout stays clean for piping
//!
//! ## Usage
//!
//! Functions: `info()`, `warn()`, `error()`, `verbose()`, `success()`
//!
//! Timestamped: `event()` / `event_info()`, `event_warn()`
//!
//! Banner: `showstopper()`
//!
//! Recording: `record()` logs a message and keeps it in the session [`EventLog`].

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod event_log;

pub use event_log::{EventLog, LogEntry};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable verbose output
pub fn set_verbose(enabled: bool) {
  VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Severity of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
  Verbose,
  Info,
  Warn,
  Error,
  Success,
}

impl Level {
  /// Short tag shown inside the prefix brackets
  pub fn tag(&self) -> &'static str {
    match self {
      Level::Verbose => "verb",
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Error => "error",
      Level::Success => "sccs",
    }
  }

  fn color(&self) -> Color {
    match self {
      Level::Verbose => Color::Cyan,
      Level::Info => Color::Blue,
      Level::Warn => Color::Yellow,
      Level::Error => Color::Red,
      Level::Success => Color::Green,
    }
  }

  /// Verbose output is hidden unless [`set_verbose`] was called
  pub fn is_enabled(&self) -> bool {
    match self {
      Level::Verbose => is_verbose(),
      _ => true,
    }
  }
}

/// Write each line of a message to stderr
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored, padded prefix for log messages
pub fn format_prefix(level: Level) -> String {
  let tag = level.tag();
  let pad = 7usize.saturating_sub(tag.len() + 2);
  format!("[{}]{:<pad$}", tag.color(level.color()).bold(), "")
}

/// The lines [`emit`] writes for `message`; empty when `level` is hidden
pub fn format_lines(level: Level, message: &str) -> Vec<String> {
  if !level.is_enabled() {
    return Vec::new();
  }

  let prefix = format_prefix(level);
  message.lines().map(|line| format!("{prefix} {line}")).collect()
}

/// Prefix every line of `message` and write it out
pub fn emit(level: Level, message: &str) {
  for line in format_lines(level, message) {
    log(&line);
  }
}

/// Timestamped variant of [`emit`]
pub fn event(level: Level, message: &str) {
  if !level.is_enabled() {
    return;
  }

  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let prefix = format!("[{}] [{}]", "event".color(level.color()).bold(), timestamp.cyan());
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

pub fn verbose(message: &str) {
  emit(Level::Verbose, message);
}

pub fn info(message: &str) {
  emit(Level::Info, message);
}

pub fn warn(message: &str) {
  emit(Level::Warn, message);
}

pub fn error(message: &str) {
  emit(Level::Error, message);
}

pub fn success(message: &str) {
  emit(Level::Success, message);
}

pub fn event_info(message: &str) {
  event(Level::Info, message);
}

pub fn event_warn(message: &str) {
  event(Level::Warn, message);
}

/// Log a message and keep it in the session event log under `component`
pub fn record(level: Level, component: &str, message: &str) {
  emit(level, message);
  event_log::session().push(level, component, message);
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Display a message with a banner around it
pub fn as_banner<F>(log_fn: F, message: &str, width: Option<usize>, border_char: Option<char>)
where
  F: Fn(&str),
{
  let banner = banner_line(width.unwrap_or(50), border_char.unwrap_or('='));

  log_fn(&banner);
  for line in message.lines() {
    log_fn(line);
  }
  log_fn(&banner);
}

/// Loud banner for failures the user must act on
pub fn showstopper(message: &str) {
  as_banner(|msg| log(&msg.bright_red().bold().to_string()), message, Some(60), Some('*'));
}

// Macros accept `format!` arguments and expand with LCOV_EXCL_LINE at call sites

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event_info {
  ($($arg:tt)*) => {
    $crate::event_info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event_warn {
  ($($arg:tt)*) => {
    $crate::event_warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

/// Log an error and keep it in the session event log
#[macro_export]
macro_rules! record_error {
  ($component:expr, $($arg:tt)*) => {
    $crate::record($crate::Level::Error, $component, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}
