//! Query submission form
//!
//! Collects a topic and a research type, validates both locally and creates
//! the analysis job. Validation failures never reach the network.

use crate::client::AnalysisBackend;
use crate::types::ResearchType;

pub const EXAMPLE_TOPICS: [&str; 5] = [
  "Electric vehicle market",
  "AI in healthcare",
  "Sustainable Fashion",
  "Remote work Software",
  "Plant based food industry",
];

pub const TOPIC_REQUIRED: &str = "Please enter a market topic to research";
pub const TYPE_REQUIRED: &str = "Please select an analysis type";

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
  pub query: Option<&'static str>,
  pub analysis_type: Option<&'static str>,
}

impl FieldErrors {
  pub fn is_empty(&self) -> bool {
    self.query.is_none() && self.analysis_type.is_none()
  }

  pub fn messages(&self) -> Vec<&'static str> {
    self.query.into_iter().chain(self.analysis_type).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Nothing was sent
  Invalid(FieldErrors),
  /// The job exists; go to its detail page
  Navigate(String),
  /// The backend refused or could not be reached. The form can be resubmitted.
  Failed(String),
  /// A submission is already in flight
  Busy,
}

#[derive(Debug, Clone, Default)]
pub struct QueryForm {
  query: String,
  analysis_type: Option<ResearchType>,
  busy: bool,
  errors: FieldErrors,
}

impl QueryForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn query(&self) -> &str {
    &self.query
  }

  pub fn analysis_type(&self) -> Option<ResearchType> {
    self.analysis_type
  }

  pub fn is_busy(&self) -> bool {
    self.busy
  }

  pub fn errors(&self) -> &FieldErrors {
    &self.errors
  }

  /// Editing a field clears its message
  pub fn set_query(&mut self, query: impl Into<String>) {
    self.query = query.into();
    self.errors.query = None;
  }

  pub fn select_type(&mut self, analysis_type: ResearchType) {
    self.analysis_type = Some(analysis_type);
    self.errors.analysis_type = None;
  }

  /// Fill the topic from the example list; the type is left alone.
  /// Returns false for an index outside the list.
  pub fn pick_example(&mut self, index: usize) -> bool {
    match EXAMPLE_TOPICS.get(index) {
      Some(topic) => {
        self.set_query(*topic);
        true
      }
      None => false,
    }
  }

  pub fn validate(&mut self) -> bool {
    self.errors = FieldErrors {
      query: self.query.trim().is_empty().then_some(TOPIC_REQUIRED),
      analysis_type: self.analysis_type.is_none().then_some(TYPE_REQUIRED),
    };
    self.errors.is_empty()
  }

  pub async fn submit(&mut self, backend: &dyn AnalysisBackend) -> SubmitOutcome {
    if self.busy {
      return SubmitOutcome::Busy;
    }
    if !self.validate() {
      return SubmitOutcome::Invalid(self.errors.clone());
    }
    let Some(analysis_type) = self.analysis_type else {
      return SubmitOutcome::Invalid(self.errors.clone());
    };

    self.busy = true;
    let result = backend.create_analysis(self.query.trim(), analysis_type).await;
    self.busy = false;

    match result {
      Ok(id) => {
        tracing::debug!(id = %id, analysis_type = %analysis_type, "analysis created");
        SubmitOutcome::Navigate(id)
      }
      Err(e) => {
        bentley::record_error!("form", "Failed to create analysis: {}", e);
        SubmitOutcome::Failed(e.to_string())
      }
    }
  }
}
