use std::collections::{HashMap, HashSet, VecDeque};

use flowrag_config::NodeKind;
use flowrag_workflow::{ExecutionPath, Graph, GraphSnapshot};
use tracing::debug;

/// Resolve the execution path of a snapshot.
///
/// Runs a breadth-first search forward from each input node, in snapshot
/// order, and returns the route to the first output node discovered. At least
/// one edge is always traversed. Returns an empty path when no input node
/// reaches an output node.
pub fn resolve_path(snapshot: &GraphSnapshot) -> ExecutionPath {
  let graph = snapshot.graph();
  let outputs: HashSet<&str> = snapshot
    .nodes_of(NodeKind::Output)
    .map(|n| n.id.as_str())
    .collect();

  for start in snapshot.nodes_of(NodeKind::Input) {
    if let Some(path) = search_from(&graph, &start.id, &outputs) {
      debug!(start = %start.id, path = %path, "resolved execution path");
      return path;
    }
    debug!(start = %start.id, "input node reaches no output node");
  }

  ExecutionPath::empty()
}

fn search_from(graph: &Graph, start: &str, outputs: &HashSet<&str>) -> Option<ExecutionPath> {
  let mut queue: VecDeque<&str> = VecDeque::from([start]);
  let mut visited: HashSet<&str> = HashSet::from([start]);
  let mut parent: HashMap<&str, &str> = HashMap::new();

  while let Some(current) = queue.pop_front() {
    for next in graph.downstream(current) {
      let next = next.as_str();
      if !visited.insert(next) {
        continue;
      }
      parent.insert(next, current);

      if outputs.contains(next) {
        return Some(reconstruct(next, &parent));
      }
      queue.push_back(next);
    }
  }

  None
}

fn reconstruct(end: &str, parent: &HashMap<&str, &str>) -> ExecutionPath {
  let mut ids = vec![end.to_string()];
  let mut cursor = end;
  while let Some(prev) = parent.get(cursor) {
    ids.push(prev.to_string());
    cursor = prev;
  }
  ids.reverse();
  ExecutionPath::new(ids)
}
