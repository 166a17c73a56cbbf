pub mod analyze;
pub mod research;
pub mod show;
pub mod status;
pub mod topics;
pub mod types;

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;

use crate::client::ResearchClient;
use crate::config::{FileConfig, Overrides, Settings};
use crate::pages::PageOutcome;
use crate::viewer::SystemViewer;

/// Exit code for input the form rejected
pub const EXIT_INVALID_INPUT: i32 = 2;
/// Exit code when the run was interrupted
pub const EXIT_INTERRUPTED: i32 = 130;

/// Merge command line overrides with the config file
pub fn settings(overrides: Overrides) -> Result<Settings> {
  let file = match FileConfig::default_path() {
    Some(path) => FileConfig::load(&path)?,
    None => FileConfig::default(),
  };
  Settings::resolve(overrides, file).context("Invalid client configuration")
}

/// HTTP client and report viewer for one run
pub struct Session {
  pub client: Arc<ResearchClient>,
  pub viewer: SystemViewer,
}

impl Session {
  pub fn open(settings: Settings) -> Result<Self> {
    let client = Arc::new(ResearchClient::new(settings.client)?);
    let viewer = SystemViewer::new(Arc::clone(&client), settings.viewer);
    Ok(Self { client, viewer })
  }
}

/// Run a page until it finishes or the user presses Ctrl-C. Interrupting
/// drops the page, which closes its live channel and stops its timer.
pub async fn until_interrupted<T>(work: impl Future<Output = Result<T>>) -> Result<Option<T>> {
  tokio::select! {
    result = work => result.map(Some),
    _ = tokio::signal::ctrl_c() => {
      eprintln!();
      bentley::warn("Interrupted; live progress closed");
      Ok(None)
    }
  }
}

pub fn exit_code(outcome: Option<&PageOutcome>) -> i32 {
  match outcome {
    Some(PageOutcome::Report(_)) | Some(PageOutcome::StatusOnly(_)) => 0,
    Some(PageOutcome::AnalysisFailed) | Some(PageOutcome::StreamFailed(_)) => 1,
    None => EXIT_INTERRUPTED,
  }
}
