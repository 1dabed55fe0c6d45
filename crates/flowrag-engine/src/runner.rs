//! Run orchestration.
//!
//! A run walks the resolved path once, sends a single chat request and writes
//! the result back into every output node. Whoever owns the trigger holds an
//! `Arc<WorkflowRunner>` and calls [`WorkflowRunner::run`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flowrag_config::{ChatTurn, NodeKind};
use flowrag_host_http::{ChatReply, ChatRequest, ChatService};
use flowrag_host_kv::KvStore;
use flowrag_resolver::{resolve_path, validate};
use flowrag_workflow::{ExecutionPath, GraphSnapshot};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::error::RunError;
use crate::events::{NoopNotifier, RunEvent, RunNotifier, RunState};
use crate::executor::ExecutorRegistry;
use crate::handle::GraphHandle;

/// Durable store key holding the last session id.
pub const SESSION_KEY: &str = "workflow.sessionId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  /// Longest accepted prompt, counted in characters.
  pub max_prompt_chars: usize,
  /// Durable store key for the session id.
  pub session_key: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_prompt_chars: 4000,
      session_key: SESSION_KEY.to_string(),
    }
  }
}

/// How a run ended. Errors have already been written to the output nodes.
#[derive(Debug)]
pub enum RunOutcome {
  /// Another run was in flight.
  Skipped,
  /// Stopped before the remote call.
  Aborted(RunError),
  /// The remote call failed.
  Failed(RunError),
  Completed(RunSummary),
}

impl RunOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, RunOutcome::Completed(_))
  }

  /// The error written to the output nodes, if any.
  pub fn error(&self) -> Option<&RunError> {
    match self {
      RunOutcome::Aborted(e) | RunOutcome::Failed(e) => Some(e),
      _ => None,
    }
  }

  fn final_state(&self) -> RunState {
    match self {
      RunOutcome::Skipped => RunState::Idle,
      RunOutcome::Aborted(_) => RunState::Aborted,
      RunOutcome::Failed(_) => RunState::Failed,
      RunOutcome::Completed(_) => RunState::Reconciling,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
  pub run_id: String,
  pub path: ExecutionPath,
  pub session_id: String,
  pub retrieved_count: Option<u64>,
}

/// Releases the in-flight flag on every exit path.
struct RunGuard<'a> {
  running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
  fn acquire(running: &'a AtomicBool) -> Option<Self> {
    running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self { running })
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.running.store(false, Ordering::Release);
  }
}

/// Runs a workflow document against the chat service.
///
/// At most one run is in flight at a time; a trigger that arrives while a
/// run is in progress is dropped.
pub struct WorkflowRunner<N: RunNotifier = NoopNotifier> {
  graph: GraphHandle,
  chat: Arc<dyn ChatService>,
  store: Mutex<Box<dyn KvStore>>,
  registry: ExecutorRegistry,
  config: EngineConfig,
  notifier: N,
  running: AtomicBool,
}

impl WorkflowRunner<NoopNotifier> {
  pub fn new(graph: GraphHandle, chat: Arc<dyn ChatService>, store: Box<dyn KvStore>) -> Self {
    Self {
      graph,
      chat,
      store: Mutex::new(store),
      registry: ExecutorRegistry::default(),
      config: EngineConfig::default(),
      notifier: NoopNotifier,
      running: AtomicBool::new(false),
    }
  }
}

impl<N: RunNotifier> WorkflowRunner<N> {
  /// Replace the notifier that receives run events.
  pub fn with_notifier<M: RunNotifier>(self, notifier: M) -> WorkflowRunner<M> {
    WorkflowRunner {
      graph: self.graph,
      chat: self.chat,
      store: self.store,
      registry: self.registry,
      config: self.config,
      notifier,
      running: self.running,
    }
  }

  pub fn with_registry(mut self, registry: ExecutorRegistry) -> Self {
    self.registry = registry;
    self
  }

  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn graph(&self) -> &GraphHandle {
    &self.graph
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  /// Execute the workflow once.
  ///
  /// Never fails: problems are written into the output nodes and reported in
  /// the returned outcome.
  #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
  pub async fn run(&self) -> RunOutcome {
    let Some(guard) = RunGuard::acquire(&self.running) else {
      debug!("run already in flight, trigger dropped");
      self.notifier.notify(RunEvent::RunSkipped);
      return RunOutcome::Skipped;
    };

    let run_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());
    self.notifier.notify(RunEvent::RunStarted {
      run_id: run_id.clone(),
    });

    let outcome = self.execute(&run_id).await;
    let state = outcome.final_state();

    match &outcome {
      RunOutcome::Completed(summary) => info!(
        path = %summary.path,
        session_id = %summary.session_id,
        "run completed"
      ),
      RunOutcome::Aborted(e) => info!(error = %e, "run aborted"),
      RunOutcome::Failed(e) => error!(error = %e, "run failed"),
      RunOutcome::Skipped => {}
    }

    drop(guard);
    self.transition(&run_id, RunState::Idle);
    self.notifier.notify(RunEvent::RunFinished { run_id, state });
    outcome
  }

  async fn execute(&self, run_id: &str) -> RunOutcome {
    self.transition(run_id, RunState::Resolving);
    let snapshot = self.graph.snapshot().await;
    let path = resolve_path(&snapshot);
    debug!(path = %path, "resolved execution path");

    self.transition(run_id, RunState::Validating);
    let validation = validate(&snapshot, &path);
    for problem in validation.advisories() {
      warn!(advisory = problem.message, "workflow advisory");
      self.notifier.notify(RunEvent::Advisory {
        run_id: run_id.to_string(),
        message: problem.message.to_string(),
      });
    }
    if validation.is_blocked() {
      return self
        .abort(run_id, RunError::Structural(validation.joined()))
        .await;
    }

    self.transition(run_id, RunState::BuildingContext);
    let ctx = match self.build_context(&snapshot, &path).await {
      Ok(ctx) => ctx,
      Err(e) => return self.abort(run_id, e).await,
    };
    let prompt = match self.checked_prompt(&ctx) {
      Ok(prompt) => prompt,
      Err(e) => return self.abort(run_id, e).await,
    };

    let uses_augmentation = path
      .iter()
      .filter_map(|id| snapshot.node(id))
      .any(|node| node.kind() == NodeKind::Augmentation);
    let document_id = ctx
      .document_id()
      .filter(|id| uses_augmentation && !id.is_empty())
      .map(str::to_string);

    self.transition(run_id, RunState::AwaitingRemote);
    self
      .graph
      .patch_outputs(|data| {
        data.is_loading = true;
        data.error = None;
        data.response = None;
      })
      .await;

    let request = ChatRequest {
      prompt: prompt.to_string(),
      session_id: self.current_session().await,
      document_id,
    };
    self.notifier.notify(RunEvent::RemoteCalled {
      run_id: run_id.to_string(),
      session_id: request.session_id.clone(),
      document_id: request.document_id.clone(),
    });

    let reply = match self.chat.chat(&request).await {
      Ok(reply) => reply,
      Err(e) => {
        let err = RunError::from(e);
        let message = err.to_string();
        self.transition(run_id, RunState::Failed);
        self
          .graph
          .patch_outputs(|data| {
            data.error = Some(message.clone());
            data.is_loading = false;
          })
          .await;
        return RunOutcome::Failed(err);
      }
    };

    self.transition(run_id, RunState::Reconciling);
    self.reconcile(&request.prompt, &reply).await;

    RunOutcome::Completed(RunSummary {
      run_id: run_id.to_string(),
      path,
      session_id: reply.session_id,
      retrieved_count: reply.retrieved_count,
    })
  }

  /// Walk the path in order, handing each node to its executor.
  async fn build_context(
    &self,
    snapshot: &GraphSnapshot,
    path: &ExecutionPath,
  ) -> Result<ExecutionContext, RunError> {
    let mut ctx = ExecutionContext::new();

    for node_id in path.iter() {
      let Some(node) = snapshot.node(node_id) else {
        continue;
      };
      let node_type = node.kind();
      let Some(executor) = self.registry.get(node_type) else {
        debug!(node_id, %node_type, "no executor for node, skipping");
        continue;
      };

      executor
        .execute(node, &mut ctx)
        .await
        .map_err(|source| RunError::NodeExecution { node_type, source })?;
    }

    Ok(ctx)
  }

  fn checked_prompt<'c>(&self, ctx: &'c ExecutionContext) -> Result<&'c str, RunError> {
    let prompt = ctx.prompt().unwrap_or_default();
    if prompt.trim().is_empty() {
      return Err(RunError::EmptyPrompt);
    }

    let actual = prompt.chars().count();
    let max = self.config.max_prompt_chars;
    if actual > max {
      return Err(RunError::PromptTooLong { max, actual });
    }
    Ok(prompt)
  }

  /// The session to continue: the first output node's live value, then the
  /// durable store.
  async fn current_session(&self) -> Option<String> {
    let in_memory = self
      .graph
      .first_output()
      .await
      .and_then(|data| data.session_id)
      .filter(|id| !id.is_empty());
    if in_memory.is_some() {
      return in_memory;
    }

    self.stored_session().await
  }

  /// The session id held by the durable store. Read errors count as absent.
  pub async fn stored_session(&self) -> Option<String> {
    let store = self.store.lock().await;
    match store.get(&self.config.session_key).await {
      Ok(value) => value.filter(|id| !id.is_empty()),
      Err(e) => {
        warn!(error = %e, "failed to read stored session id");
        None
      }
    }
  }

  async fn reconcile(&self, prompt: &str, reply: &ChatReply) {
    {
      let mut store = self.store.lock().await;
      if let Err(e) = store
        .set(&self.config.session_key, reply.session_id.clone())
        .await
      {
        warn!(error = %e, "failed to persist session id");
      }
    }

    self
      .graph
      .patch_outputs(|data| {
        data.chat_history.push(ChatTurn::user(prompt));
        data.chat_history.push(ChatTurn::assistant(reply.answer.as_str()));
        data.response = Some(reply.answer.clone());
        data.session_id = Some(reply.session_id.clone());
        data.retrieved_count = reply.retrieved_count;
        data.is_loading = false;
        data.error = None;
      })
      .await;
  }

  async fn abort(&self, run_id: &str, err: RunError) -> RunOutcome {
    let message = err.to_string();
    self.transition(run_id, RunState::Aborted);
    self
      .graph
      .patch_outputs(|data| {
        data.error = Some(message.clone());
        data.is_loading = false;
        data.response = None;
      })
      .await;
    RunOutcome::Aborted(err)
  }

  /// Start a new conversation: clear session and history on every output node
  /// and forget the stored session id. Refused while a run is in flight.
  pub async fn reset_session(&self) -> bool {
    let Some(_guard) = RunGuard::acquire(&self.running) else {
      return false;
    };

    self
      .graph
      .patch_outputs(|data| {
        data.session_id = None;
        data.chat_history.clear();
      })
      .await;

    let mut store = self.store.lock().await;
    if let Err(e) = store.delete(&self.config.session_key).await {
      warn!(error = %e, "failed to delete stored session id");
    }
    info!("session reset");
    true
  }

  fn transition(&self, run_id: &str, state: RunState) {
    debug!(%state, "run state changed");
    self.notifier.notify(RunEvent::StateChanged {
      run_id: run_id.to_string(),
      state,
    });
  }
}
