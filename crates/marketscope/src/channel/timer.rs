//! One-second elapsed counter for a streaming run

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// `MM:SS`; minutes keep counting past 59
pub fn format_elapsed(seconds: u64) -> String {
  format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Counts whole seconds on a background tick task. The task is tied to this
/// value: stopping or dropping the timer cancels it.
#[derive(Debug, Default)]
pub struct ElapsedTimer {
  seconds: Arc<AtomicU64>,
  ticker: Option<JoinHandle<()>>,
}

impl ElapsedTimer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset to zero and start counting. Must be called inside a tokio runtime.
  pub fn start(&mut self) {
    self.stop();
    self.seconds.store(0, Ordering::Relaxed);

    let seconds = Arc::clone(&self.seconds);
    self.ticker = Some(tokio::spawn(async move {
      let period = Duration::from_secs(1);
      let mut ticks = interval_at(Instant::now() + period, period);
      loop {
        ticks.tick().await;
        seconds.fetch_add(1, Ordering::Relaxed);
      }
    }));
  }

  /// Freeze the counter at its current value
  pub fn stop(&mut self) {
    if let Some(ticker) = self.ticker.take() {
      ticker.abort();
    }
  }

  pub fn is_running(&self) -> bool {
    self.ticker.is_some()
  }

  pub fn elapsed_secs(&self) -> u64 {
    self.seconds.load(Ordering::Relaxed)
  }

  pub fn display(&self) -> String {
    format_elapsed(self.elapsed_secs())
  }
}

impl Drop for ElapsedTimer {
  fn drop(&mut self) {
    self.stop();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::time::sleep;

  #[test]
  fn test_format_elapsed() {
    assert_eq!(format_elapsed(0), "00:00");
    assert_eq!(format_elapsed(9), "00:09");
    assert_eq!(format_elapsed(75), "01:15");
    assert_eq!(format_elapsed(3599), "59:59");
    assert_eq!(format_elapsed(3600), "60:00");
  }

  #[tokio::test(start_paused = true)]
  async fn test_counts_whole_seconds() {
    let mut timer = ElapsedTimer::new();
    timer.start();
    assert_eq!(timer.elapsed_secs(), 0);

    sleep(Duration::from_millis(3500)).await;
    assert_eq!(timer.elapsed_secs(), 3);
    assert_eq!(timer.display(), "00:03");
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_freezes_and_start_resets() {
    let mut timer = ElapsedTimer::new();
    timer.start();
    sleep(Duration::from_millis(2500)).await;
    timer.stop();
    assert!(!timer.is_running());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(timer.elapsed_secs(), 2);

    timer.start();
    assert_eq!(timer.elapsed_secs(), 0);
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(timer.elapsed_secs(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_drop_cancels_ticker() {
    let mut timer = ElapsedTimer::new();
    timer.start();
    let seconds = Arc::clone(&timer.seconds);
    drop(timer);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(seconds.load(Ordering::Relaxed), 0);
  }
}
