use anyhow::Result;

use super::{exit_code, until_interrupted, Session, EXIT_INVALID_INPUT};
use crate::config::Settings;
use crate::display::TerminalScreen;
use crate::form::{SubmitOutcome, EXAMPLE_TOPICS};
use crate::pages::{DetailPage, LandingPage};
use crate::types::ResearchType;

/// Submit a new analysis, then follow it on its detail page
pub async fn execute(
  settings: Settings,
  topic: Option<&str>,
  analysis_type: Option<ResearchType>,
  example: Option<usize>,
) -> Result<i32> {
  let session = Session::open(settings)?;
  let mut screen = TerminalScreen::new();
  let mut landing = LandingPage::new(session.client.as_ref());

  if let Some(number) = example {
    if number == 0 || !landing.form_mut().pick_example(number - 1) {
      bentley::error!("There is no example topic {}; pick 1 to {}", number, EXAMPLE_TOPICS.len());
      return Ok(EXIT_INVALID_INPUT);
    }
  }
  if let Some(topic) = topic {
    landing.form_mut().set_query(topic);
  }
  if let Some(analysis_type) = analysis_type {
    landing.form_mut().select_type(analysis_type);
  }

  let id = match landing.submit(&mut screen).await {
    SubmitOutcome::Navigate(id) => id,
    SubmitOutcome::Invalid(_) => {
      bentley::info(
        "Run `marketscope topics` for ideas and `marketscope types` for analysis types",
      );
      return Ok(EXIT_INVALID_INPUT);
    }
    SubmitOutcome::Failed(_) | SubmitOutcome::Busy => return Ok(1),
  };

  bentley::success!("Analysis {} created", id);
  let detail = DetailPage::new(session.client.as_ref(), &session.viewer);
  let outcome = until_interrupted(detail.run(&id, &mut screen)).await?;
  Ok(exit_code(outcome.as_ref()))
}
