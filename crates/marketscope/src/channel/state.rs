//! Progress channel state machine
//!
//! `Idle -> Connecting -> Streaming -> {Done, Errored}`. Every input goes
//! through [`ProgressSession::apply`]; terminal states absorb whatever
//! arrives afterwards.

use std::fmt;

use super::protocol::Inbound;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelState {
  #[default]
  Idle,
  Connecting,
  Streaming,
  Done,
  Errored(String),
}

impl ChannelState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, ChannelState::Done | ChannelState::Errored(_))
  }

  /// Connecting or streaming; the elapsed timer runs only while streaming
  pub fn is_running(&self) -> bool {
    matches!(self, ChannelState::Connecting | ChannelState::Streaming)
  }
}

impl fmt::Display for ChannelState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ChannelState::Idle => f.write_str("idle"),
      ChannelState::Connecting => f.write_str("connecting"),
      ChannelState::Streaming => f.write_str("streaming"),
      ChannelState::Done => f.write_str("done"),
      ChannelState::Errored(message) => write!(f, "errored: {message}"),
    }
  }
}

/// Everything that can happen to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
  Connect,
  Opened,
  Fragment(String),
  Error(String),
  OutputReady(String),
  /// The remote side closed. `refusal` carries the reason of a policy close,
  /// which the backend uses to turn away unknown or finished jobs.
  Closed { refusal: Option<String> },
  TransportFailed(String),
}

impl From<Inbound> for ChannelEvent {
  fn from(inbound: Inbound) -> Self {
    match inbound {
      Inbound::Fragment(text) => ChannelEvent::Fragment(text),
      Inbound::Error(message) => ChannelEvent::Error(message),
      Inbound::OutputReady(path) => ChannelEvent::OutputReady(path),
    }
  }
}

/// What the owning view has to do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  Connecting,
  Started,
  Appended,
  Refetch(String),
  Finished,
  Failed(String),
  Ignored,
}

/// Append-only text received for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
  fragments: Vec<String>,
}

impl Transcript {
  pub fn push(&mut self, fragment: String) {
    self.fragments.push(fragment);
  }

  pub fn fragments(&self) -> &[String] {
    &self.fragments
  }

  /// All fragments joined in arrival order
  pub fn text(&self) -> String {
    self.fragments.concat()
  }

  pub fn is_empty(&self) -> bool {
    self.fragments.iter().all(|f| f.is_empty())
  }

  pub fn len(&self) -> usize {
    self.fragments.len()
  }
}

/// State plus transcript for one progress run
#[derive(Debug, Clone, Default)]
pub struct ProgressSession {
  state: ChannelState,
  transcript: Transcript,
}

impl ProgressSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &ChannelState {
    &self.state
  }

  pub fn transcript(&self) -> &Transcript {
    &self.transcript
  }

  /// Forget the previous run; the next run starts from an empty transcript
  pub fn reset(&mut self) {
    self.state = ChannelState::Idle;
    self.transcript = Transcript::default();
  }

  pub fn apply(&mut self, event: ChannelEvent) -> Effect {
    use ChannelEvent as E;
    use ChannelState as S;

    let running = self.state.is_running();
    match event {
      E::Connect if self.state == S::Idle => {
        self.state = S::Connecting;
        Effect::Connecting
      }
      E::Opened if self.state == S::Connecting => {
        self.state = S::Streaming;
        Effect::Started
      }
      E::Fragment(text) if self.state == S::Streaming => {
        self.transcript.push(text);
        Effect::Appended
      }
      E::OutputReady(path) if self.state == S::Streaming => Effect::Refetch(path),
      E::Error(message) | E::TransportFailed(message) if running => self.fail(message),
      E::Closed { refusal: Some(reason) } if running => self.fail(reason),
      E::Closed { refusal: None } if running => {
        self.state = S::Done;
        Effect::Finished
      }
      _ => Effect::Ignored,
    }
  }

  fn fail(&mut self, message: String) -> Effect {
    self.state = ChannelState::Errored(message.clone());
    Effect::Failed(message)
  }
}
