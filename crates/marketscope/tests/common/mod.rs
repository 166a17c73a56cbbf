#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use marketscope::channel::state::ChannelState;
use marketscope::channel::ProgressSink;
use marketscope::form::FieldErrors;
use marketscope::pages::Screen;
use marketscope::viewer::DocumentViewer;
use marketscope::{AnalysisBackend, AnalysisRecord, ClientError, ResearchType};

pub const REPORT_BASE: &str = "http://reports.test/reports";

pub fn record(id: &str, status: &str, report_path: Option<&str>) -> AnalysisRecord {
  let mut value = serde_json::json!({
    "_id": id,
    "query": "Electric vehicle market",
    "analysis_type": "Industry Report",
    "status": status,
    "created_at": "2026-10-05T14:03:09Z",
  });
  if let Some(path) = report_path {
    value["report_path"] = serde_json::json!(path);
  }
  serde_json::from_value(value).unwrap()
}

/// Backend double that counts calls. `get_analysis` hands out queued records
/// in order and keeps repeating the last one.
pub struct MockBackend {
  records: Mutex<VecDeque<AnalysisRecord>>,
  pub create_id: Option<String>,
  pub start_id: Option<String>,
  pub ws_base: String,
  pub get_calls: AtomicUsize,
  pub create_calls: AtomicUsize,
  pub start_calls: AtomicUsize,
  pub progress_ids: Mutex<Vec<String>>,
}

impl MockBackend {
  pub fn new(ws_base: &str) -> Self {
    Self {
      records: Mutex::new(VecDeque::new()),
      create_id: Some("job-1".to_string()),
      start_id: Some("req-1".to_string()),
      ws_base: ws_base.trim_end_matches('/').to_string(),
      get_calls: AtomicUsize::new(0),
      create_calls: AtomicUsize::new(0),
      start_calls: AtomicUsize::new(0),
      progress_ids: Mutex::new(Vec::new()),
    }
  }

  pub fn with_records(self, records: Vec<AnalysisRecord>) -> Self {
    *self.records.lock().unwrap() = records.into();
    self
  }

  pub fn network_calls(&self) -> usize {
    self.get_calls.load(Ordering::SeqCst)
      + self.create_calls.load(Ordering::SeqCst)
      + self.start_calls.load(Ordering::SeqCst)
      + self.progress_ids.lock().unwrap().len()
  }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
  async fn get_analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
    self.get_calls.fetch_add(1, Ordering::SeqCst);
    let mut records = self.records.lock().unwrap();
    let next = if records.len() > 1 { records.pop_front() } else { records.front().cloned() };
    next.ok_or_else(|| ClientError::status(format!("mock://analysis/{id}"), 404, "not found"))
  }

  async fn create_analysis(
    &self,
    _query: &str,
    _type: ResearchType,
  ) -> Result<String, ClientError> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    self
      .create_id
      .clone()
      .ok_or_else(|| ClientError::status("mock://analysis", 500, "database unavailable"))
  }

  async fn start_research(&self, _prompt: &str) -> Result<String, ClientError> {
    self.start_calls.fetch_add(1, Ordering::SeqCst);
    self.start_id.clone().ok_or_else(|| ClientError::status("mock://ws/start", 500, "busy"))
  }

  fn report_url(&self, report_path: &str) -> String {
    format!("{REPORT_BASE}/{report_path}")
  }

  fn request_report_url(&self, request_id: &str, analysis_type: ResearchType) -> String {
    format!("{REPORT_BASE}/{request_id}/{}", analysis_type.report_file_name())
  }

  fn progress_url(&self, id: &str) -> String {
    self.progress_ids.lock().unwrap().push(id.to_string());
    format!("{}/ws/research/{id}", self.ws_base)
  }
}

/// Viewer double that remembers what it was asked to show
#[derive(Default)]
pub struct RecordingViewer {
  pub shown: Mutex<Vec<String>>,
}

#[async_trait]
impl DocumentViewer for RecordingViewer {
  async fn show(&self, url: &str) -> Result<PathBuf> {
    self.shown.lock().unwrap().push(url.to_string());
    Ok(PathBuf::from("/tmp/marketscope-test").join(url.rsplit('/').next().unwrap_or("report.pdf")))
  }
}

/// Screen double that records what pages draw
#[derive(Default)]
pub struct RecordingScreen {
  pub states: Vec<ChannelState>,
  pub fragments: Vec<String>,
  pub ticks: usize,
  pub headers: usize,
  pub field_errors: Vec<&'static str>,
  pub submit_failures: Vec<String>,
  pub failed_views: usize,
  pub status_views: usize,
  pub stream_errors: Vec<String>,
  pub finished: usize,
  pub documents: Vec<PathBuf>,
}

impl RecordingScreen {
  pub fn transcript(&self) -> String {
    self.fragments.concat()
  }
}

impl ProgressSink for RecordingScreen {
  fn state_changed(&mut self, state: &ChannelState, _elapsed: &str) {
    self.states.push(state.clone());
  }

  fn fragment(&mut self, text: &str) {
    self.fragments.push(text.to_string());
  }

  fn tick(&mut self, _elapsed: &str) {
    self.ticks += 1;
  }
}

impl Screen for RecordingScreen {
  fn header(&mut self, _record: &AnalysisRecord) {
    self.headers += 1;
  }

  fn field_errors(&mut self, errors: &FieldErrors) {
    self.field_errors.extend(errors.messages());
  }

  fn submit_failed(&mut self, message: &str) {
    self.submit_failures.push(message.to_string());
  }

  fn analysis_failed(&mut self, _record: &AnalysisRecord) {
    self.failed_views += 1;
  }

  fn status_only(&mut self, _record: &AnalysisRecord) {
    self.status_views += 1;
  }

  fn stream_error(&mut self, message: &str) {
    self.stream_errors.push(message.to_string());
  }

  fn transcript_finished(&mut self) {
    self.finished += 1;
  }

  fn document_saved(&mut self, path: &Path) {
    self.documents.push(path.to_path_buf());
  }
}

/// One scripted action of the fake progress server
#[derive(Debug, Clone)]
pub enum Step {
  Send(String),
  Pause(u64),
  Close,
  PolicyClose(String),
  /// Keep the socket open until the client closes it
  HoldOpen,
}

pub fn send(text: &str) -> Step {
  Step::Send(text.to_string())
}

/// Local WebSocket server that accepts one connection and plays `steps`.
/// The handle resolves to true when the client closed the socket itself.
pub async fn progress_server(steps: Vec<Step>) -> (String, JoinHandle<bool>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  let handle = tokio::spawn(async move {
    let (stream, _) = listener.accept().await.unwrap();
    let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

    for step in steps {
      match step {
        Step::Send(text) => {
          if socket.send(Message::Text(text.into())).await.is_err() {
            return true;
          }
        }
        Step::Pause(millis) => tokio::time::sleep(Duration::from_millis(millis)).await,
        Step::Close => {
          let _ = socket.close(None).await;
          return false;
        }
        Step::PolicyClose(reason) => {
          let frame = CloseFrame { code: CloseCode::Policy, reason: reason.into() };
          let _ = socket.close(Some(frame)).await;
          return false;
        }
        Step::HoldOpen => {
          while let Some(message) = socket.next().await {
            match message {
              Ok(Message::Close(_)) | Err(_) => return true,
              Ok(_) => {}
            }
          }
          return true;
        }
      }
    }
    false
  });

  (format!("ws://{addr}"), handle)
}

/// An address nothing listens on
pub async fn dead_address() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("ws://{addr}")
}
