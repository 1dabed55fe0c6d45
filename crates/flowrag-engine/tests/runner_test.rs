use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowrag_config::{
  AugmentationData, ChatTurn, Edge, InputData, NodeDef, NodeKind, NodeType, OutputData,
  WorkflowDef,
};
use flowrag_engine::{
  ChannelNotifier, ExecutionContext, ExecutorError, ExecutorRegistry, GraphHandle, NodeExecutor,
  EngineConfig, RunEvent, RunOutcome, RunState, SESSION_KEY, WorkflowRunner,
};
use flowrag_host_http::{ChatReply, ChatRequest, ChatService, ClientError, Operation};
use flowrag_host_kv::{InMemoryKvStore, KvFuture, KvError, KvStore};
use pretty_assertions::assert_eq;
use tokio::sync::{Notify, mpsc};

/// Chat service double that records every request.
#[derive(Default)]
struct FakeChat {
  requests: Mutex<Vec<ChatRequest>>,
  replies: Mutex<VecDeque<Result<ChatReply, ClientError>>>,
  gate: Option<Gate>,
}

/// Holds a call open until the test releases it.
struct Gate {
  started: Arc<Notify>,
  release: Arc<Notify>,
}

impl FakeChat {
  fn new() -> Self {
    Self::default()
  }

  fn replying(replies: Vec<Result<ChatReply, ClientError>>) -> Self {
    Self {
      replies: Mutex::new(replies.into()),
      ..Default::default()
    }
  }

  fn gated(started: Arc<Notify>, release: Arc<Notify>) -> Self {
    Self {
      gate: Some(Gate { started, release }),
      ..Default::default()
    }
  }

  fn requests(&self) -> Vec<ChatRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl ChatService for FakeChat {
  async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
    let call = {
      let mut requests = self.requests.lock().unwrap();
      requests.push(request.clone());
      requests.len()
    };

    if let Some(gate) = &self.gate {
      gate.started.notify_one();
      gate.release.notified().await;
    }

    let scripted = self.replies.lock().unwrap().pop_front();
    scripted.unwrap_or_else(|| Ok(reply(&format!("answer {call}"), "s-1")))
  }
}

/// Store whose writes always fail.
struct BrokenStore;

impl KvStore for BrokenStore {
  fn get(&self, _key: &str) -> KvFuture<'_, Option<String>> {
    Box::pin(async { Ok(None) })
  }

  fn set(&mut self, _key: &str, _value: String) -> KvFuture<'_, ()> {
    Box::pin(async {
      Err(KvError::Io {
        path: "session.json".into(),
        source: std::io::Error::other("disk full"),
      })
    })
  }

  fn delete(&mut self, _key: &str) -> KvFuture<'_, ()> {
    Box::pin(async { Ok(()) })
  }
}

fn reply(answer: &str, session_id: &str) -> ChatReply {
  ChatReply {
    answer: answer.to_string(),
    session_id: session_id.to_string(),
    retrieved_count: Some(2),
  }
}

fn input(id: &str, text: &str) -> NodeDef {
  NodeDef::input(
    id,
    InputData {
      label: Some(text.to_string()),
      ..Default::default()
    },
  )
}

fn rag(id: &str, document_id: Option<&str>) -> NodeDef {
  NodeDef::augmentation(
    id,
    AugmentationData {
      document_id: document_id.map(str::to_string),
      ..Default::default()
    },
  )
}

fn edge(source: &str, target: &str) -> Edge {
  Edge::new(format!("{source}-{target}"), source, target)
}

fn runner_for(workflow: WorkflowDef, chat: Arc<FakeChat>) -> WorkflowRunner {
  WorkflowRunner::new(
    GraphHandle::new(workflow),
    chat,
    Box::new(InMemoryKvStore::new()),
  )
}

async fn output_of(runner: &WorkflowRunner<impl flowrag_engine::RunNotifier>) -> OutputData {
  runner.graph().first_output().await.unwrap()
}

fn simple_workflow(text: &str) -> WorkflowDef {
  WorkflowDef::new(
    vec![input("in", text), NodeDef::output("out")],
    vec![edge("in", "out")],
  )
}

#[tokio::test]
async fn test_single_question_round_trip() {
  let chat = Arc::new(FakeChat::replying(vec![Ok(reply("X is 42", "s-1"))]));
  let runner = runner_for(simple_workflow("What is X?"), chat.clone());

  let outcome = runner.run().await;

  let RunOutcome::Completed(summary) = outcome else {
    panic!("expected completed run, got {outcome:?}");
  };
  assert_eq!(summary.path.ids(), ["in", "out"]);
  assert_eq!(summary.session_id, "s-1");
  assert_eq!(
    chat.requests(),
    vec![ChatRequest {
      prompt: "What is X?".to_string(),
      ..Default::default()
    }]
  );

  let output = output_of(&runner).await;
  assert_eq!(output.response.as_deref(), Some("X is 42"));
  assert_eq!(output.session_id.as_deref(), Some("s-1"));
  assert_eq!(output.retrieved_count, Some(2));
  assert_eq!(output.error, None);
  assert!(!output.is_loading);
  assert_eq!(
    output.chat_history,
    vec![ChatTurn::user("What is X?"), ChatTurn::assistant("X is 42")]
  );
  assert!(!runner.is_running());
  assert_eq!(runner.stored_session().await.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn test_output_only_workflow_is_rejected() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(
    WorkflowDef::new(vec![NodeDef::output("out")], vec![]),
    chat.clone(),
  );

  let outcome = runner.run().await;

  assert!(matches!(outcome, RunOutcome::Aborted(_)));
  let output = output_of(&runner).await;
  let error = output.error.unwrap();
  assert!(error.contains("Add an Input node."), "{error}");
  assert!(!output.is_loading);
  assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn test_disconnected_workflow_is_rejected() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(
    WorkflowDef::new(vec![input("in", "hi"), NodeDef::output("out")], vec![]),
    chat.clone(),
  );

  runner.run().await;

  let output = output_of(&runner).await;
  assert_eq!(
    output.error.as_deref(),
    Some("Connect an Input to an Output (intermediate nodes optional).")
  );
  assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn test_prompt_length_limit() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow(&"a".repeat(4001)), chat.clone());

  runner.run().await;

  assert_eq!(
    output_of(&runner).await.error.as_deref(),
    Some("Prompt too long (>4000 chars)")
  );
  assert!(chat.requests().is_empty());

  // Exactly at the limit is accepted.
  runner
    .graph()
    .set_prompt("in", &"a".repeat(4000))
    .await
    .unwrap();
  assert!(runner.run().await.is_completed());
  assert_eq!(chat.requests().len(), 1);
}

#[tokio::test]
async fn test_configured_limit_and_session_key() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow("eleven char"), chat.clone()).with_config(EngineConfig {
    max_prompt_chars: 10,
    session_key: "demo.session".to_string(),
  });

  let outcome = runner.run().await;

  assert!(matches!(outcome, RunOutcome::Aborted(_)));
  assert_eq!(
    output_of(&runner).await.error.as_deref(),
    Some("Prompt too long (>10 chars)")
  );
  assert!(chat.requests().is_empty());

  runner.graph().set_prompt("in", "ten chars!").await.unwrap();
  assert!(runner.run().await.is_completed());
  assert_eq!(runner.stored_session().await.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn test_blank_prompt_is_rejected() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow("   "), chat.clone());

  runner.run().await;

  assert_eq!(
    output_of(&runner).await.error.as_deref(),
    Some("Please enter a prompt in an Input node")
  );
  assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn test_first_prompt_on_path_wins() {
  let chat = Arc::new(FakeChat::new());
  let workflow = WorkflowDef::new(
    vec![
      input("in-1", "first"),
      input("in-2", "second"),
      NodeDef::output("out"),
    ],
    vec![edge("in-1", "in-2"), edge("in-2", "out")],
  );
  let runner = runner_for(workflow, chat.clone());

  runner.run().await;
  runner.graph().set_prompt("in-2", "edited").await.unwrap();
  runner.run().await;

  let prompts: Vec<String> = chat.requests().into_iter().map(|r| r.prompt).collect();
  assert_eq!(prompts, vec!["first", "first"]);
}

#[tokio::test]
async fn test_last_document_on_path_wins() {
  let chat = Arc::new(FakeChat::new());
  let (sender, mut receiver) = mpsc::unbounded_channel();
  let workflow = WorkflowDef::new(
    vec![
      input("in", "summarise"),
      rag("rag-1", Some("doc-a")),
      rag("rag-2", Some("doc-b")),
      NodeDef::output("out"),
    ],
    vec![
      edge("in", "rag-1"),
      edge("rag-1", "rag-2"),
      edge("rag-2", "out"),
    ],
  );
  let runner = runner_for(workflow, chat.clone()).with_notifier(ChannelNotifier::new(sender));

  assert!(runner.run().await.is_completed());

  assert_eq!(chat.requests()[0].document_id.as_deref(), Some("doc-b"));

  let mut advisories = Vec::new();
  while let Ok(event) = receiver.try_recv() {
    if let RunEvent::Advisory { message, .. } = event {
      advisories.push(message);
    }
  }
  assert_eq!(
    advisories,
    vec![flowrag_resolver::MULTIPLE_AUGMENTATION.to_string()]
  );
}

#[tokio::test]
async fn test_document_omitted_when_augmentation_is_off_path() {
  let chat = Arc::new(FakeChat::new());
  let workflow = WorkflowDef::new(
    vec![
      input("in", "hello"),
      rag("rag", Some("doc-a")),
      NodeDef::output("out"),
    ],
    vec![edge("in", "out")],
  );
  let runner = runner_for(workflow, chat.clone());

  runner.run().await;

  assert_eq!(chat.requests()[0].document_id, None);
}

#[tokio::test]
async fn test_session_is_reused_across_runs() {
  let chat = Arc::new(FakeChat::replying(vec![
    Ok(reply("one", "s-1")),
    Ok(reply("two", "s-1")),
  ]));
  let runner = runner_for(simple_workflow("hi"), chat.clone());

  runner.run().await;
  runner.run().await;

  let sessions: Vec<Option<String>> = chat
    .requests()
    .into_iter()
    .map(|r| r.session_id)
    .collect();
  assert_eq!(sessions, vec![None, Some("s-1".to_string())]);

  let history = output_of(&runner).await.chat_history;
  assert_eq!(
    history,
    vec![
      ChatTurn::user("hi"),
      ChatTurn::assistant("one"),
      ChatTurn::user("hi"),
      ChatTurn::assistant("two"),
    ]
  );
}

#[tokio::test]
async fn test_session_source_precedence() {
  let mut store = InMemoryKvStore::new();
  store
    .set(SESSION_KEY, "stored".to_string())
    .await
    .unwrap();

  let mut workflow = simple_workflow("hi");
  workflow
    .node_mut("out")
    .and_then(|n| n.output_data_mut())
    .unwrap()
    .session_id = Some("live".to_string());

  let chat = Arc::new(FakeChat::new());
  let runner = WorkflowRunner::new(GraphHandle::new(workflow), chat.clone(), Box::new(store));
  runner.run().await;
  assert_eq!(chat.requests()[0].session_id.as_deref(), Some("live"));

  // Without an in-memory value the stored one is used.
  let mut store = InMemoryKvStore::new();
  store
    .set(SESSION_KEY, "stored".to_string())
    .await
    .unwrap();
  let chat = Arc::new(FakeChat::new());
  let runner = WorkflowRunner::new(
    GraphHandle::new(simple_workflow("hi")),
    chat.clone(),
    Box::new(store),
  );
  runner.run().await;
  assert_eq!(chat.requests()[0].session_id.as_deref(), Some("stored"));
}

#[tokio::test]
async fn test_store_write_failure_does_not_fail_run() {
  let chat = Arc::new(FakeChat::new());
  let runner = WorkflowRunner::new(
    GraphHandle::new(simple_workflow("hi")),
    chat,
    Box::new(BrokenStore),
  );

  assert!(runner.run().await.is_completed());
  assert_eq!(output_of(&runner).await.session_id.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn test_concurrent_trigger_is_dropped() {
  let started = Arc::new(Notify::new());
  let release = Arc::new(Notify::new());
  let chat = Arc::new(FakeChat::gated(started.clone(), release.clone()));
  let runner = Arc::new(runner_for(simple_workflow("hi"), chat.clone()));

  let background = runner.clone();
  let first = tokio::spawn(async move { background.run().await });
  started.notified().await;

  assert!(runner.is_running());
  let output = output_of(&runner).await;
  assert!(output.is_loading);
  assert_eq!(output.error, None);

  assert!(matches!(runner.run().await, RunOutcome::Skipped));
  assert!(!runner.reset_session().await);

  release.notify_one();
  assert!(first.await.unwrap().is_completed());

  assert!(!runner.is_running());
  assert_eq!(chat.requests().len(), 1);
  assert_eq!(output_of(&runner).await.chat_history.len(), 2);
}

#[tokio::test]
async fn test_remote_failure_is_written_to_outputs() {
  let chat = Arc::new(FakeChat::replying(vec![Err(
    ClientError::MalformedResponse {
      operation: Operation::Chat,
      message: "missing answer".to_string(),
    },
  )]));
  let workflow = WorkflowDef::new(
    vec![
      input("in", "hi"),
      NodeDef::output("out-1"),
      NodeDef::output("out-2"),
    ],
    vec![edge("in", "out-1")],
  );
  let runner = runner_for(workflow, chat);

  let outcome = runner.run().await;

  assert!(matches!(outcome, RunOutcome::Failed(_)));
  let document = runner.graph().document().await;
  for node in document.nodes_of(NodeKind::Output) {
    let data = node.output_data().unwrap();
    assert_eq!(
      data.error.as_deref(),
      Some("Chat failed: malformed response (missing answer)")
    );
    assert!(!data.is_loading);
    assert!(data.chat_history.is_empty());
  }
  assert!(!runner.is_running());
}

#[tokio::test]
async fn test_executor_failure_names_node_type() {
  struct Exploding;

  #[async_trait]
  impl NodeExecutor for Exploding {
    async fn execute(
      &self,
      _node: &NodeDef,
      _ctx: &mut ExecutionContext,
    ) -> Result<(), ExecutorError> {
      Err(ExecutorError::failed("boom"))
    }
  }

  let mut registry = ExecutorRegistry::default();
  registry.register(NodeKind::Input, Exploding);

  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow("hi"), chat.clone()).with_registry(registry);

  runner.run().await;

  assert_eq!(
    output_of(&runner).await.error.as_deref(),
    Some("Node execution failed (input): boom")
  );
  assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn test_state_sequence_of_successful_run() {
  let (sender, mut receiver) = mpsc::unbounded_channel();
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow("hi"), chat).with_notifier(ChannelNotifier::new(sender));

  runner.run().await;

  let mut states = Vec::new();
  let mut finished = None;
  while let Ok(event) = receiver.try_recv() {
    match event {
      RunEvent::StateChanged { state, .. } => states.push(state),
      RunEvent::RunFinished { state, .. } => finished = Some(state),
      _ => {}
    }
  }
  assert_eq!(
    states,
    vec![
      RunState::Resolving,
      RunState::Validating,
      RunState::BuildingContext,
      RunState::AwaitingRemote,
      RunState::Reconciling,
      RunState::Idle,
    ]
  );
  assert_eq!(finished, Some(RunState::Reconciling));
}

#[tokio::test]
async fn test_aborted_run_emits_aborted_state() {
  let (sender, mut receiver) = mpsc::unbounded_channel();
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(WorkflowDef::default(), chat).with_notifier(ChannelNotifier::new(sender));

  runner.run().await;

  let events: Vec<RunEvent> = std::iter::from_fn(|| receiver.try_recv().ok()).collect();
  assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
  assert!(matches!(
    events.last(),
    Some(RunEvent::RunFinished {
      state: RunState::Aborted,
      ..
    })
  ));
  assert!(
    !events
      .iter()
      .any(|e| matches!(e, RunEvent::RemoteCalled { .. }))
  );
}

#[tokio::test]
async fn test_reset_session_starts_new_conversation() {
  let chat = Arc::new(FakeChat::new());
  let runner = runner_for(simple_workflow("hi"), chat.clone());

  runner.run().await;
  assert!(runner.reset_session().await);

  let output = output_of(&runner).await;
  assert_eq!(output.session_id, None);
  assert!(output.chat_history.is_empty());
  assert_eq!(runner.stored_session().await, None);

  runner.run().await;
  assert_eq!(chat.requests()[1].session_id, None);
}

#[tokio::test]
async fn test_unknown_nodes_are_passed_through() {
  let chat = Arc::new(FakeChat::new());
  let workflow: WorkflowDef = serde_json::from_value(serde_json::json!({
    "nodes": [
      { "id": "in", "type": "inputNode", "data": { "label": "hi" } },
      { "id": "note", "type": "sticky-note" },
      { "id": "out", "type": "outputNode" }
    ],
    "edges": [
      { "id": "e1", "source": "in", "target": "note" },
      { "id": "e2", "source": "note", "target": "out" }
    ]
  }))
  .unwrap();
  let runner = runner_for(workflow, chat.clone());

  let RunOutcome::Completed(summary) = runner.run().await else {
    panic!("expected completed run");
  };
  assert_eq!(summary.path.ids(), ["in", "note", "out"]);
  assert!(matches!(
    runner.graph().document().await.node("note").unwrap().node_type,
    NodeType::Unknown { .. }
  ));
  assert_eq!(chat.requests().len(), 1);
}
