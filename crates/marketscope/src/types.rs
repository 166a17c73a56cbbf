//! Analysis records and request/response bodies exchanged with the backend

use chrono::{DateTime, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ClientError;

/// Kinds of report the research backend can produce.
///
/// Serialized as the backend's label, which doubles as the stem of the
/// generated report file (`<label>.pdf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ResearchType {
  #[serde(rename = "Industry Report")]
  Industry,
  #[serde(rename = "Competitor Report")]
  Competitor,
  #[serde(rename = "Market Gap Report")]
  MarketGap,
  #[serde(rename = "Target Market Report")]
  TargetMarket,
  #[serde(rename = "Barrier Report")]
  Barrier,
  #[serde(rename = "Sales Forecast Report")]
  SalesForecast,
  #[serde(rename = "Market Research Report")]
  MarketResearch,
}

impl ResearchType {
  pub const ALL: [ResearchType; 7] = [
    ResearchType::Industry,
    ResearchType::Competitor,
    ResearchType::MarketGap,
    ResearchType::TargetMarket,
    ResearchType::Barrier,
    ResearchType::SalesForecast,
    ResearchType::MarketResearch,
  ];

  /// Wire value and report file stem
  pub fn label(&self) -> &'static str {
    match self {
      ResearchType::Industry => "Industry Report",
      ResearchType::Competitor => "Competitor Report",
      ResearchType::MarketGap => "Market Gap Report",
      ResearchType::TargetMarket => "Target Market Report",
      ResearchType::Barrier => "Barrier Report",
      ResearchType::SalesForecast => "Sales Forecast Report",
      ResearchType::MarketResearch => "Market Research Report",
    }
  }

  /// Name shown in the analysis type menu
  pub fn menu_label(&self) -> &'static str {
    match self {
      ResearchType::Industry => "Industry Analysis",
      ResearchType::Competitor => "Competitor Analysis",
      ResearchType::MarketGap => "Market Gap Analysis",
      ResearchType::TargetMarket => "Target Market Segmentation",
      ResearchType::Barrier => "Barrier Analysis",
      ResearchType::SalesForecast => "Sales Forecasting",
      ResearchType::MarketResearch => "Market Research",
    }
  }

  /// File name of the report generated for this type
  pub fn report_file_name(&self) -> String {
    format!("{}.pdf", self.label())
  }

  /// Command line key, e.g. `market-gap`
  pub fn key(&self) -> String {
    self.to_possible_value().map(|v| v.get_name().to_string()).unwrap_or_default()
  }
}

impl fmt::Display for ResearchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Lifecycle of an analysis job on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
}

impl AnalysisStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      AnalysisStatus::Pending => "pending",
      AnalysisStatus::InProgress => "in_progress",
      AnalysisStatus::Completed => "completed",
      AnalysisStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for AnalysisStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One analysis job as stored by the backend. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
  #[serde(rename = "_id", alias = "id")]
  pub id: String,
  pub query: String,
  pub analysis_type: ResearchType,
  pub status: AnalysisStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub report_path: Option<String>,
}

impl AnalysisRecord {
  /// The stored report, only ever reported for completed analyses
  pub fn report_path(&self) -> Option<&str> {
    match self.status {
      AnalysisStatus::Completed => self.report_path.as_deref().filter(|p| !p.is_empty()),
      _ => None,
    }
  }

  /// A completed record must name its report
  pub fn validate(&self) -> Result<(), ClientError> {
    if self.status == AnalysisStatus::Completed && self.report_path().is_none() {
      return Err(ClientError::inconsistent_record(&self.id, "completed without a report path"));
    }
    Ok(())
  }

  /// Creation time in a short human form, or the raw value when unparseable
  pub fn created_at_display(&self) -> Option<String> {
    self.created_at.as_deref().map(|raw| match parse_timestamp(raw) {
      Some(parsed) => parsed.format("%b %-d, %Y, %-I:%M %p").to_string(),
      None => raw.to_string(),
    })
  }
}

/// Accepts RFC 3339 and the `ctime` layout (`Mon Oct  5 14:03:09 2026`)
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
    return Some(parsed.naive_local());
  }
  if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(parsed);
  }

  let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
  NaiveDateTime::parse_from_str(&normalized, "%a %b %d %H:%M:%S %Y").ok()
}

/// Body of `POST /analysis`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAnalysisRequest {
  pub query: String,
  pub analysis_type: ResearchType,
}

/// Reply to `POST /analysis`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisResponse {
  pub id: String,
  #[serde(default)]
  pub status: Option<String>,
}

/// Body of `POST /ws/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResearchRequest {
  pub user_prompt: String,
}

/// Reply to `POST /ws/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResearchResponse {
  pub request_id: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(status: &str, report_path: Option<&str>) -> AnalysisRecord {
    let mut value = json!({
      "_id": "665f1c2e9b1e8a3d4c2b1a00",
      "query": "Electric vehicle market",
      "analysis_type": "Industry Report",
      "status": status,
      "created_at": "Mon Oct 19 14:03:09 2026",
    });
    if let Some(path) = report_path {
      value["report_path"] = json!(path);
    }
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_research_type_uses_backend_labels() {
    assert_eq!(serde_json::to_string(&ResearchType::MarketGap).unwrap(), "\"Market Gap Report\"");
    let parsed: ResearchType = serde_json::from_str("\"Sales Forecast Report\"").unwrap();
    assert_eq!(parsed, ResearchType::SalesForecast);
    assert_eq!(ResearchType::Barrier.report_file_name(), "Barrier Report.pdf");
  }

  #[test]
  fn test_research_type_keys() {
    let keys: Vec<String> = ResearchType::ALL.iter().map(|t| t.key()).collect();
    assert_eq!(
      keys,
      vec![
        "industry",
        "competitor",
        "market-gap",
        "target-market",
        "barrier",
        "sales-forecast",
        "market-research"
      ]
    );
    assert_eq!(ResearchType::from_str("target-market", true), Ok(ResearchType::TargetMarket));
  }

  #[test]
  fn test_record_accepts_either_id_spelling() {
    let parsed: AnalysisRecord = serde_json::from_value(json!({
      "id": "abc",
      "query": "AI in healthcare",
      "analysis_type": "Competitor Report",
      "status": "in_progress",
    }))
    .unwrap();

    assert_eq!(parsed.id, "abc");
    assert_eq!(parsed.status, AnalysisStatus::InProgress);
    assert!(parsed.created_at.is_none());
  }

  #[test]
  fn test_report_path_only_for_completed() {
    assert_eq!(record("completed", Some("x.pdf")).report_path(), Some("x.pdf"));
    assert_eq!(record("pending", Some("x.pdf")).report_path(), None);
    assert!(record("pending", None).validate().is_ok());
  }

  #[test]
  fn test_completed_without_report_is_inconsistent() {
    let err = record("completed", None).validate().unwrap_err();
    assert!(matches!(err, ClientError::InconsistentRecord { .. }));
    assert!(record("completed", Some("")).validate().is_err());
  }

  #[test]
  fn test_created_at_formats() {
    assert_eq!(
      record("pending", None).created_at_display().as_deref(),
      Some("Oct 19, 2026, 2:03 PM")
    );
    assert!(parse_timestamp("Mon Oct  5 09:01:02 2026").is_some());
    assert!(parse_timestamp("2026-10-19T14:03:09Z").is_some());
    assert!(parse_timestamp("2026-10-19T14:03:09.123456").is_some());
    assert!(parse_timestamp("yesterday").is_none());
  }
}
