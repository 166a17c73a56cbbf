use anyhow::Result;

use super::{exit_code, until_interrupted, Session, EXIT_INVALID_INPUT};
use crate::config::Settings;
use crate::display::TerminalScreen;
use crate::form::TOPIC_REQUIRED;
use crate::pages::QuickResearchPage;
use crate::types::ResearchType;

/// Start a research run straight from a prompt, without creating an analysis record
pub async fn execute(settings: Settings, prompt: &str, analysis_type: ResearchType) -> Result<i32> {
  if prompt.trim().is_empty() {
    bentley::error(TOPIC_REQUIRED);
    return Ok(EXIT_INVALID_INPUT);
  }

  let session = Session::open(settings)?;
  let mut screen = TerminalScreen::new();

  let page = QuickResearchPage::new(session.client.as_ref(), &session.viewer);
  let outcome = until_interrupted(page.run(prompt.trim(), analysis_type, &mut screen)).await?;
  Ok(exit_code(outcome.as_ref()))
}
