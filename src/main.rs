use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowrag_config::{NodeKind, WorkflowDef};
use flowrag_engine::{GraphHandle, RunOutcome, WorkflowRunner};
use flowrag_host_http::{ClientConfig, DEFAULT_BASE_URL, HealthState, HttpClient};
use flowrag_host_kv::FileKvStore;
use flowrag_resolver::{Severity, resolve_path, validate};
use flowrag_workflow::{GraphSnapshot, check_document};

/// Flowrag - run input/retrieval/output workflows against a question-answering service
#[derive(Parser)]
#[command(name = "flowrag")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Base URL of the service API
  #[arg(long, global = true, env = "FLOWRAG_API_URL", default_value = DEFAULT_BASE_URL)]
  api_url: String,

  /// Path to the data directory (default: ~/.flowrag)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Request timeout in seconds
  #[arg(long, global = true, default_value_t = 60)]
  timeout_secs: u64,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow once and print its output nodes
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Save the updated document back to the file
    #[arg(long)]
    write: bool,
  },

  /// Set the prompt of an input node
  Prompt {
    workflow_file: PathBuf,

    /// The input node ID
    #[arg(long)]
    node: String,

    text: String,
  },

  /// Upload a PDF document for retrieval
  Upload {
    file: PathBuf,

    /// Workflow to attach the uploaded document to
    #[arg(long, requires = "node")]
    workflow: Option<PathBuf>,

    /// The augmentation node ID to attach the document to
    #[arg(long, requires = "workflow")]
    node: Option<String>,
  },

  /// Manage the conversation session
  Session {
    #[command(subcommand)]
    action: SessionAction,
  },

  /// Check whether the service is reachable
  Health,

  /// Print the execution path and validation problems without running
  Show { workflow_file: PathBuf },
}

#[derive(Subcommand)]
enum SessionAction {
  /// Forget the stored session and clear conversation history
  Reset {
    /// Workflow whose output nodes should be cleared as well
    workflow_file: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowrag=info,warn")),
    )
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let Some(command) = cli.command else {
    println!("flowrag - use --help to see available commands");
    return Ok(());
  };

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flowrag"),
  };
  let client_config = ClientConfig::new(&cli.api_url)
    .with_context(|| format!("invalid API URL: {}", cli.api_url))?
    .with_timeout(Duration::from_secs(cli.timeout_secs));
  let app = App {
    data_dir,
    client_config,
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Run {
        workflow_file,
        write,
      } => app.run(&workflow_file, write).await,
      Commands::Prompt {
        workflow_file,
        node,
        text,
      } => app.set_prompt(&workflow_file, &node, &text).await,
      Commands::Upload {
        file,
        workflow,
        node,
      } => app.upload(&file, workflow.as_deref().zip(node.as_deref())).await,
      Commands::Session {
        action: SessionAction::Reset { workflow_file },
      } => app.reset_session(workflow_file.as_deref()).await,
      Commands::Health => app.health().await,
      Commands::Show { workflow_file } => show(&workflow_file).await,
    }
  })
}

struct App {
  data_dir: PathBuf,
  client_config: ClientConfig,
}

impl App {
  fn client(&self) -> Result<HttpClient> {
    HttpClient::new(self.client_config.clone()).context("failed to create HTTP client")
  }

  fn runner(&self, graph: GraphHandle) -> Result<WorkflowRunner> {
    let store = FileKvStore::new(self.data_dir.join("session.json"));
    Ok(WorkflowRunner::new(
      graph,
      Arc::new(self.client()?),
      Box::new(store),
    ))
  }

  async fn run(&self, workflow_file: &Path, write: bool) -> Result<()> {
    let workflow = load_workflow(workflow_file).await?;
    if let Some(name) = &workflow.name {
      eprintln!("Loaded workflow: {name}");
    }

    let graph = GraphHandle::new(workflow);
    let runner = self.runner(graph.clone())?;
    let outcome = runner.run().await;

    match &outcome {
      RunOutcome::Completed(summary) => {
        eprintln!("Execution completed: {}", summary.run_id);
        eprintln!("Path: {}", summary.path);
      }
      RunOutcome::Aborted(e) => eprintln!("Run aborted: {e}"),
      RunOutcome::Failed(e) => eprintln!("Run failed: {e}"),
      RunOutcome::Skipped => eprintln!("Run skipped"),
    }

    let document = graph.document().await;
    let outputs: serde_json::Map<String, serde_json::Value> = document
      .nodes_of(NodeKind::Output)
      .filter_map(|node| Some((node.id.clone(), serde_json::to_value(node.output_data()?).ok()?)))
      .collect();
    println!("{}", serde_json::to_string_pretty(&outputs)?);

    if write {
      save_workflow(workflow_file, &document).await?;
    }

    if let Some(e) = outcome.error() {
      bail!("workflow run did not complete: {e}");
    }
    Ok(())
  }

  async fn set_prompt(&self, workflow_file: &Path, node_id: &str, text: &str) -> Result<()> {
    let graph = GraphHandle::new(load_workflow(workflow_file).await?);
    graph
      .set_prompt(node_id, text)
      .await
      .with_context(|| format!("failed to set prompt on node '{node_id}'"))?;
    save_workflow(workflow_file, &graph.document().await).await
  }

  async fn upload(&self, file: &Path, target: Option<(&Path, &str)>) -> Result<()> {
    let reply = self
      .client()?
      .upload_pdf(file)
      .await
      .with_context(|| format!("failed to upload {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    let Some((workflow_file, node_id)) = target else {
      return Ok(());
    };
    let graph = GraphHandle::new(load_workflow(workflow_file).await?);
    let file_name = file.file_name().map(|name| name.to_string_lossy());
    graph
      .attach_document(node_id, &reply.document_id, file_name.as_deref())
      .await
      .with_context(|| format!("failed to attach document to node '{node_id}'"))?;
    save_workflow(workflow_file, &graph.document().await).await
  }

  async fn reset_session(&self, workflow_file: Option<&Path>) -> Result<()> {
    let workflow = match workflow_file {
      Some(path) => load_workflow(path).await?,
      None => WorkflowDef::default(),
    };
    let graph = GraphHandle::new(workflow);
    let runner = self.runner(graph.clone())?;

    if !runner.reset_session().await {
      bail!("a run is in progress");
    }
    if let Some(path) = workflow_file {
      save_workflow(path, &graph.document().await).await?;
    }
    eprintln!("Session reset");
    Ok(())
  }

  async fn health(&self) -> Result<()> {
    let status = self.client()?.health().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if status.state == HealthState::Down {
      bail!("service at {} is down", self.client_config.base_url);
    }
    Ok(())
  }
}

async fn show(workflow_file: &Path) -> Result<()> {
  let workflow = load_workflow(workflow_file).await?;
  let snapshot = GraphSnapshot::capture(&workflow);
  let path = resolve_path(&snapshot);
  let validation = validate(&snapshot, &path);

  if path.is_empty() {
    println!("Path: (none)");
  } else {
    println!("Path: {path}");
  }
  for problem in validation.problems() {
    let label = match problem.severity {
      Severity::Blocking => "error",
      Severity::Advisory => "warning",
    };
    println!("{label}: {}", problem.message);
  }
  Ok(())
}

async fn load_workflow(path: &Path) -> Result<WorkflowDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;

  let workflow: WorkflowDef = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))?;
  check_document(&workflow)
    .with_context(|| format!("invalid workflow file: {}", path.display()))?;

  Ok(workflow)
}

async fn save_workflow(path: &Path, workflow: &WorkflowDef) -> Result<()> {
  let content = serde_json::to_string_pretty(workflow)?;
  tokio::fs::write(path, content)
    .await
    .with_context(|| format!("failed to write workflow file: {}", path.display()))
}
