//! Terminal presentation of pages
//!
//! Transcript lines go to stdout; the "Thinking MM:SS" status line and
//! diagnostics go to stderr so reports can be piped.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::channel::state::ChannelState;
use crate::channel::ProgressSink;
use crate::form::FieldErrors;
use crate::pages::{Screen, STREAM_ERROR_BANNER};
use crate::render::MarkupRenderer;
use crate::types::{AnalysisRecord, AnalysisStatus};

pub struct TerminalScreen {
  renderer: MarkupRenderer,
  status: Option<ProgressBar>,
  interactive: bool,
}

impl Default for TerminalScreen {
  fn default() -> Self {
    Self::new()
  }
}

impl TerminalScreen {
  pub fn new() -> Self {
    Self {
      renderer: MarkupRenderer::for_terminal(),
      status: None,
      interactive: console::Term::stderr().is_term(),
    }
  }

  fn print_line(&self, line: &str) {
    match &self.status {
      Some(bar) => bar.println(line),
      None => println!("{line}"),
    }
  }

  fn show_status(&mut self, elapsed: &str) {
    if !self.interactive {
      return;
    }
    let bar = self.status.get_or_insert_with(|| {
      let bar = ProgressBar::new_spinner();
      bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
          .unwrap_or_else(|_| ProgressStyle::default_spinner()),
      );
      bar.enable_steady_tick(Duration::from_millis(120));
      bar
    });
    bar.set_message(format!("Thinking {elapsed}"));
  }

  fn clear_status(&mut self) {
    if let Some(bar) = self.status.take() {
      bar.finish_and_clear();
    }
  }
}

impl Drop for TerminalScreen {
  fn drop(&mut self) {
    self.clear_status();
  }
}

fn status_label(status: AnalysisStatus) -> ColoredString {
  match status {
    AnalysisStatus::Pending => status.as_str().yellow(),
    AnalysisStatus::InProgress => status.as_str().blue(),
    AnalysisStatus::Completed => status.as_str().green(),
    AnalysisStatus::Failed => status.as_str().red(),
  }
}

impl ProgressSink for TerminalScreen {
  fn state_changed(&mut self, state: &ChannelState, elapsed: &str) {
    match state {
      ChannelState::Connecting => bentley::verbose("Connecting to live progress"),
      ChannelState::Streaming => {
        bentley::event_info("Live progress connected");
        self.show_status(elapsed);
      }
      ChannelState::Done => {
        self.clear_status();
        bentley::event_info!("Live progress finished after {}", elapsed);
      }
      ChannelState::Errored(_) => {
        self.clear_status();
        bentley::event_warn!("Live progress stopped after {}", elapsed);
      }
      ChannelState::Idle => {}
    }
  }

  fn fragment(&mut self, text: &str) {
    for line in self.renderer.push(text) {
      self.print_line(&line);
    }
  }

  fn tick(&mut self, elapsed: &str) {
    if let Some(bar) = &self.status {
      bar.set_message(format!("Thinking {elapsed}"));
    }
  }
}

impl Screen for TerminalScreen {
  fn header(&mut self, record: &AnalysisRecord) {
    println!("{}", record.query.bold());
    let kind = record.analysis_type.label().cyan();
    let mut details = format!("{} · {}", kind, status_label(record.status));
    if let Some(created) = record.created_at_display() {
      details.push_str(&format!(" · {}", created.dimmed()));
    }
    println!("{details}");
    println!();
  }

  fn field_errors(&mut self, errors: &FieldErrors) {
    for message in errors.messages() {
      bentley::error(message);
    }
  }

  fn submit_failed(&mut self, message: &str) {
    bentley::error!("Failed to create analysis: {}", message);
  }

  fn analysis_failed(&mut self, record: &AnalysisRecord) {
    bentley::error!("Analysis {} failed on the server", record.id);
    bentley::info("Submit the topic again to retry");
  }

  fn status_only(&mut self, record: &AnalysisRecord) {
    bentley::info!(
      "Analysis is {}; check back with `marketscope show {}`",
      record.status,
      record.id
    );
  }

  fn stream_error(&mut self, message: &str) {
    self.clear_status();
    bentley::showstopper(&format!("{STREAM_ERROR_BANNER}\n{message}"));
  }

  fn transcript_finished(&mut self) {
    for line in self.renderer.finish() {
      self.print_line(&line);
    }
    self.clear_status();
  }

  fn opening_document(&mut self, url: &str) {
    bentley::info!("Downloading report from {}", url);
  }

  fn document_saved(&mut self, path: &Path) {
    bentley::success!("Report saved to {}", path.display());
  }
}
