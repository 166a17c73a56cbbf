//! Pages: the landing form, the analysis detail page and quick research
//!
//! A page owns whatever it mounts. Progress views and in-flight requests
//! live inside the page's future, so dropping that future (Ctrl-C, or the
//! caller moving on) releases the channel and the timer and discards any
//! response that arrives later.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::channel::{Initiation, ProgressOptions, ProgressSink, ProgressView, Signal};
use crate::client::AnalysisBackend;
use crate::error::ClientError;
use crate::form::{FieldErrors, QueryForm, SubmitOutcome, EXAMPLE_TOPICS};
use crate::types::{AnalysisRecord, AnalysisStatus, ResearchType};
use crate::viewer::DocumentViewer;

pub const STREAM_ERROR_BANNER: &str = "An error occurred: check the logs for details";

/// Where pages draw. Every method defaults to drawing nothing.
pub trait Screen: ProgressSink {
  fn header(&mut self, _record: &AnalysisRecord) {}
  fn field_errors(&mut self, _errors: &FieldErrors) {}
  fn submit_failed(&mut self, _message: &str) {}
  fn analysis_failed(&mut self, _record: &AnalysisRecord) {}
  fn status_only(&mut self, _record: &AnalysisRecord) {}
  fn stream_error(&mut self, _message: &str) {}
  /// The transcript will not grow any more
  fn transcript_finished(&mut self) {}
  fn opening_document(&mut self, _url: &str) {}
  fn document_saved(&mut self, _path: &Path) {}
}

/// How a page run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
  /// The report was downloaded (and opened, unless disabled)
  Report(PathBuf),
  /// The backend marked the analysis as failed
  AnalysisFailed,
  /// Nothing to show beyond the status
  StatusOnly(AnalysisStatus),
  /// The live channel ended in error
  StreamFailed(String),
}

/// Landing page: the query form and example topics
pub struct LandingPage<'a> {
  backend: &'a dyn AnalysisBackend,
  form: QueryForm,
}

impl<'a> LandingPage<'a> {
  pub fn new(backend: &'a dyn AnalysisBackend) -> Self {
    Self { backend, form: QueryForm::new() }
  }

  pub fn examples(&self) -> &'static [&'static str] {
    &EXAMPLE_TOPICS
  }

  pub fn form(&self) -> &QueryForm {
    &self.form
  }

  pub fn form_mut(&mut self) -> &mut QueryForm {
    &mut self.form
  }

  pub async fn submit<S: Screen>(&mut self, screen: &mut S) -> SubmitOutcome {
    let outcome = self.form.submit(self.backend).await;
    match &outcome {
      SubmitOutcome::Invalid(errors) => screen.field_errors(errors),
      SubmitOutcome::Failed(message) => screen.submit_failed(message),
      SubmitOutcome::Navigate(_) | SubmitOutcome::Busy => {}
    }
    outcome
  }
}

/// What the detail page shows for a freshly loaded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailView {
  Progress,
  Document { url: String },
  Failed,
  StatusOnly,
}

/// Analysis detail page: status header plus progress, report or failure
pub struct DetailPage<'a> {
  backend: &'a dyn AnalysisBackend,
  viewer: &'a dyn DocumentViewer,
}

impl<'a> DetailPage<'a> {
  pub fn new(backend: &'a dyn AnalysisBackend, viewer: &'a dyn DocumentViewer) -> Self {
    Self { backend, viewer }
  }

  pub fn view_for(backend: &dyn AnalysisBackend, record: &AnalysisRecord) -> DetailView {
    match (record.status, record.report_path()) {
      (AnalysisStatus::Pending, _) => DetailView::Progress,
      (AnalysisStatus::Completed, Some(path)) => {
        DetailView::Document { url: backend.report_url(path) }
      }
      (AnalysisStatus::Failed, _) => DetailView::Failed,
      _ => DetailView::StatusOnly,
    }
  }

  /// Fetch the record. Failures are logged; the page renders nothing else.
  pub async fn load(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
    self.backend.get_analysis(id).await.inspect_err(|e| {
      bentley::record_error!("detail", "Failed to load analysis {}: {}", id, e);
    })
  }

  pub async fn run<S: Screen>(&self, id: &str, screen: &mut S) -> Result<PageOutcome> {
    let record = self.load(id).await.with_context(|| format!("Could not load analysis {id}"))?;
    screen.header(&record);
    self.show(record, screen).await
  }

  async fn show<S: Screen>(&self, record: AnalysisRecord, screen: &mut S) -> Result<PageOutcome> {
    match Self::view_for(self.backend, &record) {
      DetailView::Document { url } => open_document(self.viewer, &url, screen).await,
      DetailView::Failed => {
        screen.analysis_failed(&record);
        Ok(PageOutcome::AnalysisFailed)
      }
      DetailView::StatusOnly => {
        screen.status_only(&record);
        Ok(PageOutcome::StatusOnly(record.status))
      }
      DetailView::Progress => self.follow(record, screen).await,
    }
  }

  /// Stream a pending analysis until it completes or the channel ends
  async fn follow<S: Screen>(&self, record: AnalysisRecord, screen: &mut S) -> Result<PageOutcome> {
    let initiation = Initiation::Existing(record.id.clone());
    let mut view =
      ProgressView::mount(self.backend, initiation, ProgressOptions::default(), &mut *screen).await;

    let mut completed = None;
    let failure = loop {
      match view.next_signal(&mut *screen).await {
        Signal::Refetch(_) => {
          if let Some(fresh) = self.refetch(&record.id).await {
            if fresh.report_path().is_some() {
              completed = Some(fresh);
              break None;
            }
          }
        }
        Signal::Finished => break None,
        Signal::Failed(message) => break Some(message),
      }
    };

    view.unmount().await;
    screen.transcript_finished();

    if let Some(message) = failure {
      screen.stream_error(&message);
      return Ok(PageOutcome::StreamFailed(message));
    }

    let latest = match completed {
      Some(record) => record,
      None => self.refetch(&record.id).await.unwrap_or(record),
    };

    match Self::view_for(self.backend, &latest) {
      DetailView::Document { url } => open_document(self.viewer, &url, screen).await,
      DetailView::Failed => {
        screen.analysis_failed(&latest);
        Ok(PageOutcome::AnalysisFailed)
      }
      DetailView::Progress | DetailView::StatusOnly => {
        screen.status_only(&latest);
        Ok(PageOutcome::StatusOnly(latest.status))
      }
    }
  }

  async fn refetch(&self, id: &str) -> Option<AnalysisRecord> {
    match self.backend.get_analysis(id).await {
      Ok(record) => {
        tracing::debug!(id = %id, status = %record.status, "analysis re-fetched");
        Some(record)
      }
      Err(e) => {
        bentley::record_error!("detail", "Failed to refresh analysis {}: {}", id, e);
        None
      }
    }
  }
}

/// Start a research run by prompt and stream it; the report is looked up by
/// request id and research type once the channel closes
pub struct QuickResearchPage<'a> {
  backend: &'a dyn AnalysisBackend,
  viewer: &'a dyn DocumentViewer,
}

impl<'a> QuickResearchPage<'a> {
  pub fn new(backend: &'a dyn AnalysisBackend, viewer: &'a dyn DocumentViewer) -> Self {
    Self { backend, viewer }
  }

  pub async fn run<S: Screen>(
    &self,
    prompt: &str,
    analysis_type: ResearchType,
    screen: &mut S,
  ) -> Result<PageOutcome> {
    let initiation = Initiation::Start { prompt: prompt.to_string() };
    let options = ProgressOptions { refetch_on_output_ready: false };
    let mut view = ProgressView::mount(self.backend, initiation, options, &mut *screen).await;

    let signal = loop {
      match view.next_signal(&mut *screen).await {
        Signal::Refetch(_) => continue,
        other => break other,
      }
    };
    let request_id = view.job_id().map(str::to_string);

    view.unmount().await;
    screen.transcript_finished();

    match (signal, request_id) {
      (Signal::Finished, Some(request_id)) => {
        let url = self.backend.request_report_url(&request_id, analysis_type);
        open_document(self.viewer, &url, screen).await
      }
      (Signal::Failed(message), _) => {
        screen.stream_error(&message);
        Ok(PageOutcome::StreamFailed(message))
      }
      (_, _) => {
        let message = "research run ended without a request id".to_string();
        screen.stream_error(&message);
        Ok(PageOutcome::StreamFailed(message))
      }
    }
  }
}

async fn open_document<S: Screen>(
  viewer: &dyn DocumentViewer,
  url: &str,
  screen: &mut S,
) -> Result<PageOutcome> {
  screen.opening_document(url);
  match viewer.show(url).await {
    Ok(path) => {
      screen.document_saved(&path);
      Ok(PageOutcome::Report(path))
    }
    Err(e) => {
      bentley::record_error!("viewer", "{:#}", e);
      Err(e)
    }
  }
}
