//! HTTP client for the research backend
//!
//! Thin wrapper over reqwest that knows the backend's routes: reading
//! analysis records, creating analysis jobs, starting ad-hoc research runs,
//! and building the URLs for reports and the live progress channel.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::types::{
  AnalysisRecord, CreateAnalysisRequest, CreateAnalysisResponse, ResearchType,
  StartResearchRequest, StartResearchResponse,
};

/// Everything the pages need from the backend
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
  /// `GET /analysis/{id}`, validated. Never cached.
  async fn get_analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError>;

  /// `POST /analysis`, returns the new job id
  async fn create_analysis(
    &self,
    query: &str,
    analysis_type: ResearchType,
  ) -> Result<String, ClientError>;

  /// `POST /ws/start`, returns the request id to stream from
  async fn start_research(&self, user_prompt: &str) -> Result<String, ClientError>;

  /// `/reports/{report_path}`
  fn report_url(&self, report_path: &str) -> String;

  /// `/reports/{request_id}/{label}.pdf`
  fn request_report_url(&self, request_id: &str, analysis_type: ResearchType) -> String;

  /// `ws(s)://.../ws/research/{id}`
  fn progress_url(&self, id: &str) -> String;
}

pub struct ResearchClient {
  client: Client,
  base: Url,
  config: ClientConfig,
}

impl ResearchClient {
  pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
    let base = Url::parse(&config.base_url)
      .map_err(|e| ClientError::invalid_url(&config.base_url, e.to_string()))?;

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| ClientError::http(&config.base_url, e))?;

    Ok(Self { client, base, config })
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  /// Base URL with `segments` appended, each one percent-encoded
  fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn send(&self, url: &Url, request: RequestBuilder) -> Result<Response, ClientError> {
    let secs = self.config.timeout_secs;
    let response = timeout(Duration::from_secs(secs), request.send())
      .await
      .map_err(|_| ClientError::timeout(url.as_str(), secs))?
      .map_err(|e| {
        if e.is_timeout() {
          ClientError::timeout(url.as_str(), secs)
        } else {
          ClientError::http(url.as_str(), e)
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      tracing::debug!(url = %url, status = status.as_u16(), "backend refused request");
      return Err(ClientError::status(url.as_str(), status.as_u16(), body));
    }

    Ok(response)
  }

  async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(|e| ClientError::http(url.as_str(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(url.as_str(), e.to_string()))
  }

  /// Download a document as opaque bytes
  pub async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, ClientError> {
    let parsed = Url::parse(url).map_err(|e| ClientError::invalid_url(url, e.to_string()))?;
    let response = self.send(&parsed, self.client.get(parsed.clone())).await?;
    let bytes = response.bytes().await.map_err(|e| ClientError::http(url, e))?;
    Ok(bytes.to_vec())
  }

  /// Check the backend answers HTTP at all; returns the status of `GET /`
  pub async fn health_check(&self) -> Result<u16, ClientError> {
    let url = self.endpoint([]);
    let response = timeout(Duration::from_secs(5), self.client.get(url.clone()).send())
      .await
      .map_err(|_| ClientError::timeout(url.as_str(), 5))?
      .map_err(|e| ClientError::http(url.as_str(), e))?;

    Ok(response.status().as_u16())
  }
}

#[async_trait]
impl AnalysisBackend for ResearchClient {
  async fn get_analysis(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
    let url = self.endpoint(["analysis", id]);
    tracing::debug!(url = %url, "fetching analysis record");

    let response = self.send(&url, self.client.get(url.clone())).await?;
    let record: AnalysisRecord = Self::decode(&url, response).await?;
    record.validate()?;
    Ok(record)
  }

  async fn create_analysis(
    &self,
    query: &str,
    analysis_type: ResearchType,
  ) -> Result<String, ClientError> {
    let url = self.endpoint(["analysis"]);
    let request = CreateAnalysisRequest { query: query.to_string(), analysis_type };

    let response = self.send(&url, self.client.post(url.clone()).json(&request)).await?;
    let created: CreateAnalysisResponse = Self::decode(&url, response).await?;
    if created.id.is_empty() {
      return Err(ClientError::decode(url.as_str(), "empty analysis id"));
    }
    Ok(created.id)
  }

  async fn start_research(&self, user_prompt: &str) -> Result<String, ClientError> {
    let url = self.endpoint(["ws", "start"]);
    let request = StartResearchRequest { user_prompt: user_prompt.to_string() };

    let response = self.send(&url, self.client.post(url.clone()).json(&request)).await?;
    let started: StartResearchResponse = Self::decode(&url, response).await?;
    if started.request_id.is_empty() {
      return Err(ClientError::decode(url.as_str(), "empty request id"));
    }
    Ok(started.request_id)
  }

  fn report_url(&self, report_path: &str) -> String {
    let segments = report_path.split('/').filter(|s| !s.is_empty());
    self.endpoint(std::iter::once("reports").chain(segments)).to_string()
  }

  fn request_report_url(&self, request_id: &str, analysis_type: ResearchType) -> String {
    let file_name = analysis_type.report_file_name();
    self.endpoint(["reports", request_id, file_name.as_str()]).to_string()
  }

  fn progress_url(&self, id: &str) -> String {
    let mut url = self.endpoint(["ws", "research", id]);
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // http -> ws and https -> wss are both special-to-special changes, which url allows
    let _ = url.set_scheme(scheme);
    url.to_string()
  }
}
