//! Path resolution and validation.
//!
//! [`resolve_path`] picks the single input-to-output route a run follows.
//! [`validate`] checks the snapshot and that route before anything with side
//! effects happens, collecting every problem rather than stopping at the first.

mod path;
mod validate;

pub use path::resolve_path;
pub use validate::{
  ADD_INPUT, ADD_OUTPUT, CONNECT_PATH, MULTIPLE_AUGMENTATION, Problem, Severity, Validation,
  validate,
};
