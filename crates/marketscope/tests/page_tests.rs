mod common;

use std::sync::atomic::Ordering;

use common::{progress_server, record, send, MockBackend, RecordingScreen, RecordingViewer, Step};
use marketscope::form::{SubmitOutcome, TOPIC_REQUIRED, TYPE_REQUIRED};
use marketscope::pages::{DetailPage, DetailView, LandingPage, PageOutcome, QuickResearchPage};
use marketscope::{AnalysisStatus, ResearchType};

#[tokio::test]
async fn test_completed_record_opens_report_without_channel() {
  let backend =
    MockBackend::new("ws://unused").with_records(vec![record("job-1", "completed", Some("x.pdf"))]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert!(matches!(outcome, PageOutcome::Report(_)));
  let shown = viewer.shown.lock().unwrap().clone();
  assert_eq!(shown.len(), 1);
  assert!(shown[0].contains("x.pdf"));
  assert!(backend.progress_ids.lock().unwrap().is_empty());
  assert!(screen.states.is_empty());
  assert_eq!(screen.headers, 1);
}

#[test]
fn test_view_for_each_status() {
  let backend = MockBackend::new("ws://unused");
  let cases = [
    (record("a", "pending", None), DetailView::Progress),
    (
      record("b", "completed", Some("output/b/Industry Report.pdf")),
      DetailView::Document { url: format!("{}/output/b/Industry Report.pdf", common::REPORT_BASE) },
    ),
    (record("c", "failed", None), DetailView::Failed),
    (record("d", "in_progress", None), DetailView::StatusOnly),
    // A stray report path on an unfinished record is not a report
    (record("e", "pending", Some("early.pdf")), DetailView::Progress),
  ];

  for (record, expected) in cases {
    assert_eq!(DetailPage::view_for(&backend, &record), expected, "status {}", record.status);
  }
}

#[tokio::test]
async fn test_failed_record_shows_failed_view() {
  let backend = MockBackend::new("ws://unused").with_records(vec![record("job-1", "failed", None)]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert_eq!(outcome, PageOutcome::AnalysisFailed);
  assert_eq!(screen.failed_views, 1);
  assert!(viewer.shown.lock().unwrap().is_empty());
  assert!(backend.progress_ids.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_in_progress_record_shows_status_only() {
  let backend =
    MockBackend::new("ws://unused").with_records(vec![record("job-1", "in_progress", None)]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert_eq!(outcome, PageOutcome::StatusOnly(AnalysisStatus::InProgress));
  assert_eq!(screen.status_views, 1);
  assert!(backend.progress_ids.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_record_fails_to_load() {
  let backend = MockBackend::new("ws://unused");
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let err = DetailPage::new(&backend, &viewer).run("nope", &mut screen).await.unwrap_err();

  assert!(err.to_string().contains("nope"));
  assert_eq!(screen.headers, 0);
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_record_streams_then_opens_report_on_hint() {
  let (url, server) = progress_server(vec![
    send("## Findings\n"),
    send("__OUTPUT_FILE__output/job-1/Industry Report.pdf"),
    Step::HoldOpen,
  ])
  .await;
  let backend = MockBackend::new(&url).with_records(vec![
    record("job-1", "pending", None),
    record("job-1", "completed", Some("output/job-1/Industry Report.pdf")),
  ]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert!(matches!(outcome, PageOutcome::Report(_)));
  // One load plus exactly one re-fetch for the hint
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 2);
  assert_eq!(*backend.progress_ids.lock().unwrap(), vec!["job-1".to_string()]);
  assert_eq!(screen.transcript(), "## Findings\n");
  assert_eq!(screen.finished, 1);
  assert!(viewer.shown.lock().unwrap()[0].ends_with("output/job-1/Industry Report.pdf"));

  // Opening the report unmounted the progress view
  assert!(server.await.unwrap());
}

#[tokio::test]
async fn test_hint_before_completion_keeps_streaming() {
  let (url, _server) = progress_server(vec![
    send("__OUTPUT_FILE__output/job-1/Industry Report.pdf"),
    send("still writing"),
    Step::Close,
  ])
  .await;
  let backend = MockBackend::new(&url).with_records(vec![
    record("job-1", "pending", None),
    record("job-1", "in_progress", None),
    record("job-1", "completed", Some("output/job-1/Industry Report.pdf")),
  ]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert!(matches!(outcome, PageOutcome::Report(_)));
  // Load, one re-fetch for the hint, one after the channel closed
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 3);
  assert_eq!(screen.transcript(), "still writing");
  assert_eq!(viewer.shown.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stream_error_shows_banner_and_no_report() {
  let (url, _server) =
    progress_server(vec![send("partial"), send("__ERROR__ upstream timeout"), Step::Close]).await;
  let backend = MockBackend::new(&url).with_records(vec![record("job-1", "pending", None)]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert_eq!(outcome, PageOutcome::StreamFailed("upstream timeout".to_string()));
  assert_eq!(screen.stream_errors, vec!["upstream timeout".to_string()]);
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 1);
  assert!(viewer.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_done_without_report_shows_status() {
  let (url, _server) = progress_server(vec![send("x"), Step::Close]).await;
  let backend = MockBackend::new(&url).with_records(vec![
    record("job-1", "pending", None),
    record("job-1", "in_progress", None),
  ]);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = DetailPage::new(&backend, &viewer).run("job-1", &mut screen).await.unwrap();

  assert_eq!(outcome, PageOutcome::StatusOnly(AnalysisStatus::InProgress));
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 2);
  assert!(viewer.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_quick_research_opens_report_by_request_id() {
  let (url, _server) = progress_server(vec![send("researching"), Step::Close]).await;
  let backend = MockBackend::new(&url);
  let viewer = RecordingViewer::default();
  let mut screen = RecordingScreen::default();

  let outcome = QuickResearchPage::new(&backend, &viewer)
    .run("plant based protein in Europe", ResearchType::MarketGap, &mut screen)
    .await
    .unwrap();

  assert!(matches!(outcome, PageOutcome::Report(_)));
  assert_eq!(
    viewer.shown.lock().unwrap().clone(),
    vec![format!("{}/req-1/Market Gap Report.pdf", common::REPORT_BASE)]
  );
  assert_eq!(backend.get_calls.load(Ordering::SeqCst), 0);
  assert_eq!(backend.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_landing_submit_with_missing_fields_stays_offline() {
  let backend = MockBackend::new("ws://unused");
  let mut screen = RecordingScreen::default();
  let mut landing = LandingPage::new(&backend);

  let outcome = landing.submit(&mut screen).await;

  assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
  assert_eq!(screen.field_errors, vec![TOPIC_REQUIRED, TYPE_REQUIRED]);
  assert_eq!(backend.network_calls(), 0);
}

#[tokio::test]
async fn test_landing_submit_navigates_to_new_job() {
  let backend = MockBackend::new("ws://unused");
  let mut screen = RecordingScreen::default();
  let mut landing = LandingPage::new(&backend);

  assert!(landing.form_mut().pick_example(0));
  landing.form_mut().select_type(ResearchType::Competitor);

  assert_eq!(landing.submit(&mut screen).await, SubmitOutcome::Navigate("job-1".to_string()));
  assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
  assert!(!landing.form().is_busy());
}

#[tokio::test]
async fn test_landing_submit_failure_can_be_retried() {
  let mut backend = MockBackend::new("ws://unused");
  backend.create_id = None;
  let mut screen = RecordingScreen::default();
  let mut landing = LandingPage::new(&backend);

  landing.form_mut().set_query("Vertical farming");
  landing.form_mut().select_type(ResearchType::Industry);

  assert!(matches!(landing.submit(&mut screen).await, SubmitOutcome::Failed(_)));
  assert!(!landing.form().is_busy());
  assert_eq!(screen.submit_failures.len(), 1);

  assert!(matches!(landing.submit(&mut screen).await, SubmitOutcome::Failed(_)));
  assert_eq!(backend.create_calls.load(Ordering::SeqCst), 2);
}
