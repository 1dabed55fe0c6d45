//! Lenient decoding of service responses.

use serde_json::{Map, Value};

use crate::error::{ClientError, Operation};
use crate::types::{ChatReply, UploadReply};

const ANSWER_KEYS: &[&str] = &["answer", "response", "text"];
const SESSION_KEYS: &[&str] = &["sessionId", "session_id", "session"];
const RETRIEVED_KEYS: &[&str] = &["retrievedCount", "retrieved_count", "k", "kCount"];
const DOCUMENT_KEYS: &[&str] = &["documentId", "id"];
const CHUNK_KEYS: &[&str] = &["chunkCount", "chunks", "count"];

pub(crate) fn parse_chat(body: &str) -> Result<ChatReply, ClientError> {
  let object = parse_object(Operation::Chat, body)?;

  let answer = first_string(&object, ANSWER_KEYS)
    .ok_or_else(|| ClientError::malformed(Operation::Chat, "missing answer"))?;
  let session_id = first_string(&object, SESSION_KEYS)
    .ok_or_else(|| ClientError::malformed(Operation::Chat, "missing session id"))?;

  Ok(ChatReply {
    answer,
    session_id,
    retrieved_count: first_count(&object, RETRIEVED_KEYS),
  })
}

pub(crate) fn parse_upload(body: &str) -> Result<UploadReply, ClientError> {
  let object = parse_object(Operation::Upload, body)?;

  let document_id = first_string(&object, DOCUMENT_KEYS)
    .ok_or_else(|| ClientError::malformed(Operation::Upload, "missing document id"))?;

  Ok(UploadReply {
    document_id,
    chunk_count: first_count(&object, CHUNK_KEYS),
  })
}

fn parse_object(operation: Operation, body: &str) -> Result<Map<String, Value>, ClientError> {
  match serde_json::from_str(body) {
    Ok(Value::Object(object)) => Ok(object),
    Ok(_) => Err(ClientError::malformed(operation, "expected a JSON object")),
    Err(e) => Err(ClientError::malformed(operation, e.to_string())),
  }
}

/// First key holding a string (or a number, rendered as text). Nulls are skipped.
fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  keys.iter().find_map(|key| match object.get(*key)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  })
}

fn first_count(object: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
  keys
    .iter()
    .find_map(|key| object.get(*key).and_then(Value::as_u64))
}
