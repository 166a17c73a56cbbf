use anyhow::Result;

use super::Session;
use crate::config::Settings;

/// Check the backend answers at the configured address
pub async fn execute(settings: Settings) -> Result<i32> {
  let base_url = settings.client.base_url.clone();
  let session = Session::open(settings)?;

  match session.client.health_check().await {
    Ok(status) => {
      bentley::success!("Backend at {} is reachable (HTTP {})", base_url, status);
      Ok(0)
    }
    Err(e) => {
      bentley::error!("Backend at {} is not reachable: {}", base_url, e);
      Ok(1)
    }
  }
}
