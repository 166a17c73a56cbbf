//! Inbound message classification
//!
//! The backend streams plain text. Two reserved prefixes carry out-of-band
//! signals; everything else is transcript text.

/// Prefix of a fatal error report; the remainder is a human-readable description
pub const ERROR_SENTINEL: &str = "__ERROR__";

/// Prefix announcing the report file has been written; the remainder is its path
pub const OUTPUT_FILE_SENTINEL: &str = "__OUTPUT_FILE__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
  /// Transcript text, kept verbatim
  Fragment(String),
  /// The job failed
  Error(String),
  /// The report exists; the record is worth re-reading
  OutputReady(String),
}

impl Inbound {
  pub fn classify(text: &str) -> Self {
    if let Some(rest) = text.strip_prefix(ERROR_SENTINEL) {
      let message = rest.trim();
      let message = if message.is_empty() { "unknown error" } else { message };
      return Inbound::Error(message.to_string());
    }

    if let Some(rest) = text.strip_prefix(OUTPUT_FILE_SENTINEL) {
      return Inbound::OutputReady(rest.trim().to_string());
    }

    Inbound::Fragment(text.to_string())
  }
}
