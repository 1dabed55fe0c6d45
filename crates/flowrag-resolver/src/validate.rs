use flowrag_config::NodeKind;
use flowrag_workflow::{ExecutionPath, GraphSnapshot};

pub const ADD_INPUT: &str = "Add an Input node.";
pub const ADD_OUTPUT: &str = "Add an Output node.";
pub const CONNECT_PATH: &str = "Connect an Input to an Output (intermediate nodes optional).";
pub const MULTIPLE_AUGMENTATION: &str =
  "Warning: multiple augmentation nodes present; only the last one on the path is used.";

/// Whether a problem stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Blocking,
  Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
  pub severity: Severity,
  pub message: &'static str,
}

impl Problem {
  fn blocking(message: &'static str) -> Self {
    Self {
      severity: Severity::Blocking,
      message,
    }
  }

  fn advisory(message: &'static str) -> Self {
    Self {
      severity: Severity::Advisory,
      message,
    }
  }
}

/// The problems found in a snapshot, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
  problems: Vec<Problem>,
}

impl Validation {
  pub fn problems(&self) -> &[Problem] {
    &self.problems
  }

  pub fn is_blocked(&self) -> bool {
    self
      .problems
      .iter()
      .any(|p| p.severity == Severity::Blocking)
  }

  pub fn advisories(&self) -> impl Iterator<Item = &Problem> {
    self
      .problems
      .iter()
      .filter(|p| p.severity == Severity::Advisory)
  }

  /// All messages, blocking and advisory, joined with a space.
  pub fn joined(&self) -> String {
    self
      .problems
      .iter()
      .map(|p| p.message)
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Check the structural preconditions of a run.
pub fn validate(snapshot: &GraphSnapshot, path: &ExecutionPath) -> Validation {
  let mut problems = Vec::new();

  if snapshot.count(NodeKind::Input) == 0 {
    problems.push(Problem::blocking(ADD_INPUT));
  }
  if snapshot.count(NodeKind::Output) == 0 {
    problems.push(Problem::blocking(ADD_OUTPUT));
  }
  if path.len() < 2 {
    problems.push(Problem::blocking(CONNECT_PATH));
  }
  if snapshot.count(NodeKind::Augmentation) > 1 {
    problems.push(Problem::advisory(MULTIPLE_AUGMENTATION));
  }

  Validation { problems }
}
