//! Run events and notifiers for observability.
//!
//! Events are emitted while a run progresses so that an embedding application
//! can drive a status indicator, record history or test the state machine.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

/// States of the run orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  Idle,
  Resolving,
  Validating,
  BuildingContext,
  AwaitingRemote,
  Reconciling,
  /// Stopped before the remote call.
  Aborted,
  /// Stopped by the remote call or while applying its result.
  Failed,
}

impl fmt::Display for RunState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RunState::Idle => "idle",
      RunState::Resolving => "resolving",
      RunState::Validating => "validating",
      RunState::BuildingContext => "building_context",
      RunState::AwaitingRemote => "awaiting_remote",
      RunState::Reconciling => "reconciling",
      RunState::Aborted => "aborted",
      RunState::Failed => "failed",
    };
    f.write_str(name)
  }
}

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunEvent {
  /// A trigger arrived while a run was in flight and was dropped.
  RunSkipped,

  RunStarted { run_id: String },

  StateChanged { run_id: String, state: RunState },

  /// A non-blocking validation problem.
  Advisory { run_id: String, message: String },

  /// The chat request is about to be sent.
  RemoteCalled {
    run_id: String,
    session_id: Option<String>,
    document_id: Option<String>,
  },

  /// The run is over and the guard released. `state` is the last state
  /// before returning to idle.
  RunFinished { run_id: String, state: RunState },
}

/// Trait for receiving run events.
pub trait RunNotifier: Send + Sync {
  /// Called when a run event occurs.
  fn notify(&self, event: RunEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl RunNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// At most a dozen events are produced per run, so the channel stays small
/// even when the consumer lags.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl RunNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
