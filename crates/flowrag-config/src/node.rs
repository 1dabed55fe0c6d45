use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::chat::ChatTurn;

/// A node of the workflow document.
///
/// Anything the engine does not read (canvas layout fields, unknown payload
/// keys, the original spelling of the `type` tag, unknown node types) is kept
/// so that a loaded document saves back unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct NodeDef {
  pub id: String,
  pub node_type: NodeType,
  /// Canvas position, owned by the editing surface and carried through untouched.
  pub position: Option<Value>,
  /// Other node fields (`measured`, `selected`, `width`, ...).
  pub extra: Map<String, Value>,
  /// Legacy tag spelling from the source document, e.g. `inputNode`.
  source_tag: Option<String>,
  /// The source document had no `data` key.
  data_absent: bool,
}

/// The typed payload of a node.
///
/// The `type` tag also accepts the names the canvas used historically
/// (`inputNode`, `ragNode`, `outputNode`). Any other tag becomes `Unknown`,
/// which the engine skips but keeps verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
  Input { data: InputData },
  Augmentation { data: AugmentationData },
  Output { data: OutputData },
  Unknown { tag: String, data: Option<Value> },
}

/// Payload of an input node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prompt: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl InputData {
  /// The prompt text, falling back to the label when the prompt is empty.
  pub fn text(&self) -> &str {
    match self.prompt.as_deref() {
      Some(prompt) if !prompt.is_empty() => prompt,
      _ => self.label.as_deref().unwrap_or_default(),
    }
  }
}

/// Payload of an augmentation (retrieval) node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentationData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub document_id: Option<String>,
  /// Display name of the uploaded file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uploaded_file: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Payload of an output node. Written by the engine only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputData {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub response: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub is_loading: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub chat_history: Vec<ChatTurn>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retrieved_count: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Discriminant of [`NodeType`], used for registry lookups and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
  Input,
  Augmentation,
  Output,
  Unknown,
}

impl NodeKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Input => "input",
      NodeKind::Augmentation => "augmentation",
      NodeKind::Output => "output",
      NodeKind::Unknown => "unknown",
    }
  }

  /// Kind named by a `type` tag, legacy spellings included.
  pub fn from_tag(tag: &str) -> Self {
    match tag {
      "input" | "inputNode" => NodeKind::Input,
      "augmentation" | "rag" | "ragNode" => NodeKind::Augmentation,
      "output" | "outputNode" => NodeKind::Output,
      _ => NodeKind::Unknown,
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl NodeType {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeType::Input { .. } => NodeKind::Input,
      NodeType::Augmentation { .. } => NodeKind::Augmentation,
      NodeType::Output { .. } => NodeKind::Output,
      NodeType::Unknown { .. } => NodeKind::Unknown,
    }
  }
}

impl NodeDef {
  pub fn input(id: impl Into<String>, data: InputData) -> Self {
    Self::with_type(id, NodeType::Input { data })
  }

  pub fn augmentation(id: impl Into<String>, data: AugmentationData) -> Self {
    Self::with_type(id, NodeType::Augmentation { data })
  }

  pub fn output(id: impl Into<String>) -> Self {
    Self::with_type(
      id,
      NodeType::Output {
        data: OutputData::default(),
      },
    )
  }

  fn with_type(id: impl Into<String>, node_type: NodeType) -> Self {
    Self {
      id: id.into(),
      node_type,
      position: None,
      extra: Map::new(),
      source_tag: None,
      data_absent: false,
    }
  }

  pub fn kind(&self) -> NodeKind {
    self.node_type.kind()
  }

  pub fn output_data(&self) -> Option<&OutputData> {
    match &self.node_type {
      NodeType::Output { data } => Some(data),
      _ => None,
    }
  }

  pub fn output_data_mut(&mut self) -> Option<&mut OutputData> {
    match &mut self.node_type {
      NodeType::Output { data } => Some(data),
      _ => None,
    }
  }

  /// The `type` tag to write: the source spelling while it still names the
  /// same kind, the canonical name otherwise.
  fn tag(&self) -> &str {
    if let NodeType::Unknown { tag, .. } = &self.node_type {
      return tag;
    }
    let kind = self.kind();
    match self.source_tag.as_deref() {
      Some(tag) if NodeKind::from_tag(tag) == kind => tag,
      _ => kind.as_str(),
    }
  }
}

/// Wire shape of a node.
#[derive(Deserialize)]
struct RawNode {
  id: String,
  #[serde(rename = "type")]
  tag: String,
  #[serde(default)]
  data: Option<Value>,
  #[serde(default)]
  position: Option<Value>,
  #[serde(flatten)]
  extra: Map<String, Value>,
}

impl TryFrom<RawNode> for NodeDef {
  type Error = serde_json::Error;

  fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
    let data_absent = raw.data.is_none();
    let kind = NodeKind::from_tag(&raw.tag);
    let node_type = match kind {
      NodeKind::Input => NodeType::Input {
        data: payload(raw.data)?,
      },
      NodeKind::Augmentation => NodeType::Augmentation {
        data: payload(raw.data)?,
      },
      NodeKind::Output => NodeType::Output {
        data: payload(raw.data)?,
      },
      NodeKind::Unknown => NodeType::Unknown {
        tag: raw.tag.clone(),
        data: raw.data,
      },
    };
    let source_tag = (kind != NodeKind::Unknown && raw.tag != kind.as_str()).then_some(raw.tag);

    Ok(Self {
      id: raw.id,
      node_type,
      position: raw.position,
      extra: raw.extra,
      source_tag,
      data_absent,
    })
  }
}

fn payload<T: Default + serde::de::DeserializeOwned>(data: Option<Value>) -> serde_json::Result<T> {
  match data {
    Some(value) => serde_json::from_value(value),
    None => Ok(T::default()),
  }
}

impl Serialize for NodeDef {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    #[serde(untagged)]
    enum Payload<'a> {
      Input(&'a InputData),
      Augmentation(&'a AugmentationData),
      Output(&'a OutputData),
      Raw(&'a Value),
    }

    #[derive(Serialize)]
    struct Shape<'a> {
      id: &'a str,
      #[serde(rename = "type")]
      tag: &'a str,
      #[serde(skip_serializing_if = "Option::is_none")]
      data: Option<Payload<'a>>,
      #[serde(skip_serializing_if = "Option::is_none")]
      position: Option<&'a Value>,
      #[serde(flatten)]
      extra: &'a Map<String, Value>,
    }

    // A payload the source left out stays out while it is still empty.
    let data = match &self.node_type {
      NodeType::Input { data } if !(self.data_absent && *data == InputData::default()) => {
        Some(Payload::Input(data))
      }
      NodeType::Augmentation { data }
        if !(self.data_absent && *data == AugmentationData::default()) =>
      {
        Some(Payload::Augmentation(data))
      }
      NodeType::Output { data } if !(self.data_absent && *data == OutputData::default()) => {
        Some(Payload::Output(data))
      }
      NodeType::Unknown { data, .. } => data.as_ref().map(Payload::Raw),
      _ => None,
    };

    Shape {
      id: &self.id,
      tag: self.tag(),
      data,
      position: self.position.as_ref(),
      extra: &self.extra,
    }
    .serialize(serializer)
  }
}
