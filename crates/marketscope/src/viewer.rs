//! Report viewer
//!
//! Reports are PDFs served by the backend. Viewing one means downloading it
//! next to the user's other downloads and handing it to the desktop's PDF
//! application.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::ResearchClient;
use crate::config::ViewerConfig;
use url::Url;

#[async_trait]
pub trait DocumentViewer: Send + Sync {
  /// Show the document at `url`; returns where it was saved
  async fn show(&self, url: &str) -> Result<PathBuf>;
}

pub struct SystemViewer {
  client: Arc<ResearchClient>,
  config: ViewerConfig,
}

impl SystemViewer {
  pub fn new(client: Arc<ResearchClient>, config: ViewerConfig) -> Self {
    Self { client, config }
  }
}

#[async_trait]
impl DocumentViewer for SystemViewer {
  async fn show(&self, url: &str) -> Result<PathBuf> {
    let bytes = self
      .client
      .fetch_document(url)
      .await
      .with_context(|| format!("Failed to download report from {url}"))?;

    std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
      format!("Failed to create output directory {}", self.config.output_dir.display())
    })?;

    let path = self.config.output_dir.join(report_file_name(url));
    std::fs::write(&path, &bytes)
      .with_context(|| format!("Failed to write report to {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "report saved");

    if self.config.open {
      if let Err(e) = open::that(&path) {
        bentley::warn!("Could not open {} automatically: {}", path.display(), e);
      }
    }

    Ok(path)
  }
}

/// Local file name for a report URL: `<parent>-<file>.pdf`, so reports of the
/// same type for different jobs do not overwrite each other
pub fn report_file_name(url: &str) -> String {
  let segments: Vec<String> = match Url::parse(url) {
    Ok(parsed) => parsed
      .path_segments()
      .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
      .unwrap_or_default(),
    Err(_) => url.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect(),
  };
  let mut segments = segments.iter().rev().map(String::as_str);

  let file = segments.next().map(decode_segment).unwrap_or_default();
  let parent = segments
    .next()
    .filter(|s| *s != "reports")
    .map(decode_segment);

  let stem = file.strip_suffix(".pdf").unwrap_or(&file);
  let name = match parent {
    Some(parent) if !parent.is_empty() => format!("{parent}-{stem}"),
    _ => stem.to_string(),
  };

  let name = sanitize(&name);
  if name.is_empty() {
    "report.pdf".to_string()
  } else {
    format!("{name}.pdf")
  }
}

fn decode_segment(segment: &str) -> String {
  urlencoding::decode(segment).map(|s| s.into_owned()).unwrap_or_else(|_| segment.to_string())
}

fn sanitize(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') { c } else { '_' })
    .collect::<String>()
    .trim_matches(['.', ' '])
    .to_string()
}
