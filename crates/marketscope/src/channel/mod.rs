//! Live progress channel
//!
//! Bridges a job identifier to a growing transcript. A [`ProgressChannel`]
//! owns the WebSocket reader task; a [`ProgressView`] owns the channel, the
//! state machine and the elapsed timer, and is the unit a page mounts and
//! drops. Dropping either one releases the transport and the timer.

pub mod protocol;
pub mod state;
pub mod timer;

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::{connect_async_tls_with_config, Connector};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

use crate::client::AnalysisBackend;
use crate::error::ClientError;
use protocol::Inbound;
use state::{ChannelEvent, ChannelState, Effect, ProgressSession, Transcript};
use timer::ElapsedTimer;

const CONNECT_TIMEOUT_SECS: u64 = 15;
const CLOSE_GRACE_MILLIS: u64 = 500;
const EVENT_BUFFER: usize = 256;

/// How a progress run obtains its job identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initiation {
  /// Stream an analysis that already exists (the detail page flow)
  Existing(String),
  /// `POST /ws/start` with the prompt, then stream the returned request id
  Start { prompt: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressOptions {
  /// Surface the output-file hint to the page so it can re-read the record
  pub refetch_on_output_ready: bool,
}

impl Default for ProgressOptions {
  fn default() -> Self {
    Self { refetch_on_output_ready: true }
  }
}

/// Receives what a progress view shows
pub trait ProgressSink {
  fn state_changed(&mut self, _state: &ChannelState, _elapsed: &str) {}
  fn fragment(&mut self, _text: &str) {}
  fn tick(&mut self, _elapsed: &str) {}
}

/// Open WebSocket with its reader task
pub struct ProgressChannel {
  events: mpsc::Receiver<ChannelEvent>,
  close_tx: Option<oneshot::Sender<()>>,
  reader: JoinHandle<()>,
}

impl ProgressChannel {
  pub async fn connect(url: &str) -> Result<Self, ClientError> {
    let connector = if url.starts_with("wss://") { Some(tls_connector()?) } else { None };
    let connect = connect_async_tls_with_config(url, None, false, connector);
    let (socket, _) = timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect)
      .await
      .map_err(|_| ClientError::channel(format!("timed out connecting to {url}")))?
      .map_err(|e| ClientError::channel(format!("could not connect to {url}: {e}")))?;
    tracing::debug!(url = %url, "live channel open");

    let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
    let (close_tx, close_rx) = oneshot::channel();
    let reader = tokio::spawn(read_socket(socket, events_tx, close_rx));

    Ok(Self { events, close_tx: Some(close_tx), reader })
  }

  /// Next event in arrival order; `None` once the reader has exited
  pub async fn next_event(&mut self) -> Option<ChannelEvent> {
    self.events.recv().await
  }

  /// Send a close frame and stop reading
  pub async fn close(mut self) {
    if let Some(close_tx) = self.close_tx.take() {
      let _ = close_tx.send(());
    }
    let _ = timeout(Duration::from_millis(CLOSE_GRACE_MILLIS), &mut self.reader).await;
  }
}

/// rustls client config for `wss://` channels, pinned to the ring provider
/// that reqwest already links
fn tls_connector() -> Result<Connector, ClientError> {
  let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
  let config =
    rustls::ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
      .with_safe_default_protocol_versions()
      .map_err(|e| ClientError::channel(format!("TLS setup failed: {e}")))?
      .with_root_certificates(roots)
      .with_no_client_auth();
  Ok(Connector::Rustls(Arc::new(config)))
}

impl Drop for ProgressChannel {
  fn drop(&mut self) {
    self.reader.abort();
  }
}

async fn read_socket<S>(
  socket: tokio_tungstenite::WebSocketStream<S>,
  events: mpsc::Sender<ChannelEvent>,
  mut close_rx: oneshot::Receiver<()>,
) where
  S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
  let (mut write, mut read) = socket.split();

  loop {
    let event = tokio::select! {
      _ = &mut close_rx => {
        let _ = write.send(Message::Close(None)).await;
        return;
      }
      message = read.next() => match message {
        Some(Ok(Message::Text(text))) => ChannelEvent::from(Inbound::classify(&text)),
        Some(Ok(Message::Binary(bytes))) => {
          ChannelEvent::from(Inbound::classify(&String::from_utf8_lossy(&bytes)))
        }
        Some(Ok(Message::Close(frame))) => {
          let refusal = frame.filter(|f| f.code == CloseCode::Policy).map(|f| {
            let reason = f.reason.as_str().trim().to_string();
            if reason.is_empty() { "connection refused by server".to_string() } else { reason }
          });
          ChannelEvent::Closed { refusal }
        }
        Some(Ok(_)) => continue,
        Some(Err(e)) => ChannelEvent::TransportFailed(e.to_string()),
        None => ChannelEvent::Closed { refusal: None },
      },
    };

    let last = matches!(event, ChannelEvent::Closed { .. } | ChannelEvent::TransportFailed(_));
    if events.send(event).await.is_err() || last {
      return;
    }
  }
}

/// What a page has to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
  /// The report file exists; re-read the record. The channel stays open.
  Refetch(String),
  Finished,
  Failed(String),
}

/// One mounted progress run: state machine, transcript, timer and transport
pub struct ProgressView {
  session: ProgressSession,
  timer: ElapsedTimer,
  channel: Option<ProgressChannel>,
  options: ProgressOptions,
  job_id: Option<String>,
}

impl ProgressView {
  /// Resolve the job id, open the channel and start the timer. Failures
  /// leave the view in the errored state rather than returning an error.
  pub async fn mount(
    backend: &dyn AnalysisBackend,
    initiation: Initiation,
    options: ProgressOptions,
    sink: &mut dyn ProgressSink,
  ) -> Self {
    let mut view = Self {
      session: ProgressSession::new(),
      timer: ElapsedTimer::new(),
      channel: None,
      options,
      job_id: None,
    };

    view.handle(ChannelEvent::Connect, sink).await;

    let id = match initiation {
      Initiation::Existing(id) => id,
      Initiation::Start { prompt } => match backend.start_research(&prompt).await {
        Ok(id) => id,
        Err(e) => {
          let message = format!("could not start research: {e}");
          view.handle(ChannelEvent::Error(message), sink).await;
          return view;
        }
      },
    };

    let url = backend.progress_url(&id);
    view.job_id = Some(id);

    match ProgressChannel::connect(&url).await {
      Ok(channel) => {
        view.channel = Some(channel);
        view.handle(ChannelEvent::Opened, sink).await;
      }
      Err(e) => {
        view.handle(ChannelEvent::TransportFailed(e.to_string()), sink).await;
      }
    }

    view
  }

  pub fn state(&self) -> &ChannelState {
    self.session.state()
  }

  pub fn transcript(&self) -> &Transcript {
    self.session.transcript()
  }

  pub fn job_id(&self) -> Option<&str> {
    self.job_id.as_deref()
  }

  pub fn elapsed(&self) -> String {
    self.timer.display()
  }

  pub fn timer_running(&self) -> bool {
    self.timer.is_running()
  }

  /// Pump channel events until something needs the page's attention.
  /// Once the view is done or errored this returns immediately.
  pub async fn next_signal(&mut self, sink: &mut dyn ProgressSink) -> Signal {
    let period = Duration::from_secs(1);
    let mut redraw = interval_at(Instant::now() + period, period);

    loop {
      if let Some(signal) = self.terminal_signal() {
        return signal;
      }

      let event = match self.channel.as_mut() {
        Some(channel) => tokio::select! {
          event = channel.next_event() => Some(event.unwrap_or_else(|| {
            ChannelEvent::TransportFailed("live channel ended unexpectedly".to_string())
          })),
          _ = redraw.tick() => None,
        },
        None => Some(ChannelEvent::TransportFailed("live channel is not open".to_string())),
      };

      match event {
        Some(event) => {
          if let Some(signal) = self.handle(event, sink).await {
            return signal;
          }
        }
        None => sink.tick(&self.timer.display()),
      }
    }
  }

  /// Release the transport and the timer. Dropping the view does the same
  /// without waiting for the close frame to be written.
  pub async fn unmount(mut self) {
    self.timer.stop();
    if let Some(channel) = self.channel.take() {
      channel.close().await;
    }
  }

  fn terminal_signal(&self) -> Option<Signal> {
    match self.session.state() {
      ChannelState::Done => Some(Signal::Finished),
      ChannelState::Errored(message) => Some(Signal::Failed(message.clone())),
      _ => None,
    }
  }

  async fn handle(&mut self, event: ChannelEvent, sink: &mut dyn ProgressSink) -> Option<Signal> {
    match self.session.apply(event) {
      Effect::Connecting => {
        sink.state_changed(self.session.state(), &self.timer.display());
        None
      }
      Effect::Started => {
        self.timer.start();
        sink.state_changed(self.session.state(), &self.timer.display());
        None
      }
      Effect::Appended => {
        if let Some(text) = self.session.transcript().fragments().last() {
          sink.fragment(text);
        }
        None
      }
      Effect::Refetch(path) => {
        tracing::debug!(job = ?self.job_id, path = %path, "report file ready");
        self.options.refetch_on_output_ready.then_some(Signal::Refetch(path))
      }
      Effect::Finished => {
        self.release().await;
        sink.state_changed(self.session.state(), &self.timer.display());
        Some(Signal::Finished)
      }
      Effect::Failed(message) => {
        self.release().await;
        tracing::warn!(job = ?self.job_id, error = %message, "live channel failed");
        bentley::event_log::session().push(bentley::Level::Error, "channel", &message);
        sink.state_changed(self.session.state(), &self.timer.display());
        Some(Signal::Failed(message))
      }
      Effect::Ignored => None,
    }
  }

  async fn release(&mut self) {
    self.timer.stop();
    if let Some(channel) = self.channel.take() {
      channel.close().await;
    }
  }
}
