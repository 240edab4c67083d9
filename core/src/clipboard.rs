use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error};

use crate::{models::PathSegment, serialize::serialize, value::Value};

/// Destination of copied text. The OS integration lives outside this crate.
pub trait Clipboard {
  fn write_text(&mut self, text: &str) -> Result<(), String>;
}

#[derive(Debug, Error)]
pub enum CopyError {
  #[error("error when copy {label}: {reason}")]
  Handler { label: String, reason: String },
  #[error("error when copy {label}: clipboard unavailable: {reason}")]
  Clipboard { label: String, reason: String },
}

/// Keeps the last written text. Useful for hosts without a system clipboard, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
  pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
  fn write_text(&mut self, text: &str) -> Result<(), String> {
    self.contents = Some(text.to_string());
    Ok(())
  }
}

/// Try `primary`; if it refuses, write to `fallback` instead.
pub struct FallbackClipboard<P, F> {
  pub primary: P,
  pub fallback: F,
}

impl<P: Clipboard, F: Clipboard> Clipboard for FallbackClipboard<P, F> {
  fn write_text(&mut self, text: &str) -> Result<(), String> {
    match self.primary.write_text(text) {
      Ok(()) => Ok(()),
      Err(e) => {
        debug!(error = %e, "primary clipboard failed, using fallback");
        self.fallback.write_text(text)
      }
    }
  }
}

pub type OnCopy = Box<dyn FnMut(&[PathSegment], &Value) -> Result<(), String> + Send>;

/// Copy action of a viewer: builds the payload and tracks the short-lived "copied" flag.
pub struct CopyHandler {
  timeout: Duration,
  on_copy: Option<OnCopy>,
  copied_until: Option<Instant>,
}

impl CopyHandler {
  pub fn new(timeout: Duration) -> Self {
    Self {
      timeout,
      on_copy: None,
      copied_until: None,
    }
  }

  /// Hand copies to `f` instead of writing to the clipboard.
  pub fn with_on_copy(
    mut self,
    f: impl FnMut(&[PathSegment], &Value) -> Result<(), String> + Send + 'static,
  ) -> Self {
    self.on_copy = Some(Box::new(f));
    self
  }

  /// Copy `value` (found at `path`). Returns the text written to `clipboard`, or `None` when a
  /// custom `on_copy` hook took over.
  pub fn copy(
    &mut self,
    path: &[PathSegment],
    value: &Value,
    clipboard: &mut dyn Clipboard,
    now: Instant,
  ) -> Result<Option<String>, CopyError> {
    if let Some(on_copy) = self.on_copy.as_mut() {
      if let Err(reason) = on_copy(path, value) {
        let label = copy_label(path);
        error!("error when copy {label}: {reason}");
        return Err(CopyError::Handler { label, reason });
      }
      self.mark_copied(now);
      return Ok(None);
    }

    let payload = copy_payload(value);
    if let Err(reason) = clipboard.write_text(&payload) {
      let label = copy_label(path);
      error!("error when copy {label}: {reason}");
      return Err(CopyError::Clipboard { label, reason });
    }
    self.mark_copied(now);
    Ok(Some(payload))
  }

  pub fn is_copied(&self, now: Instant) -> bool {
    self.copied_until.is_some_and(|until| now < until)
  }

  pub fn reset(&mut self) {
    self.copied_until = None;
  }

  fn mark_copied(&mut self, now: Instant) {
    self.copied_until = Some(now + self.timeout);
  }
}

/// Text placed on the clipboard for `value`. Functions copy as their source text.
pub fn copy_payload(value: &Value) -> String {
  match value {
    Value::Function(f) => serialize(&Value::String(f.source.clone())),
    other => serialize(other),
  }
}

/// `src` for the root, `src[a.0.b]` below it.
fn copy_label(path: &[PathSegment]) -> String {
  if path.is_empty() {
    return "src".to_string();
  }
  let joined: Vec<String> = path
    .iter()
    .map(|s| match s {
      PathSegment::Key(k) => k.clone(),
      PathSegment::Index(i) => i.to_string(),
    })
    .collect();
  format!("src[{}]", joined.join("."))
}
