use anyhow::Result;

use super::{exit_code, until_interrupted, Session};
use crate::config::Settings;
use crate::display::TerminalScreen;
use crate::pages::DetailPage;

/// Open the detail page of an existing analysis
pub async fn execute(settings: Settings, id: &str) -> Result<i32> {
  let session = Session::open(settings)?;
  let mut screen = TerminalScreen::new();

  let detail = DetailPage::new(session.client.as_ref(), &session.viewer);
  let outcome = until_interrupted(detail.run(id, &mut screen)).await?;
  Ok(exit_code(outcome.as_ref()))
}
