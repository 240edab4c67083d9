use std::{
  cmp::Ordering,
  collections::HashMap,
  fmt,
  sync::Arc,
  time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  clipboard::{Clipboard, CopyError, CopyHandler},
  cursor::{decode_cursor, encode_cursor, ChildCursor},
  cycle::{detect_cycle, format_address},
  inspect::InspectState,
  models::{
    ChildItem, ChildrenPage, CycleResult, ItemRange, NodeSummary, PathSegment, SessionInfo,
    ValueKind,
  },
  mutate::apply_value,
  path_cache::PathCache,
  preview::preview,
  serialize::serialize,
  size::{segment_ranges, value_size},
  value::{NodeRef, Value},
};

#[derive(Debug, Error)]
pub enum ViewerError {
  #[error("root is not an object")]
  InvalidRoot,
  #[error("unreachable: target is not reachable from root")]
  Unreachable,
  #[error("invalid path: {0}")]
  InvalidPath(String),
  #[error("forbidden key in path: {0}")]
  ForbiddenKey(String),
  #[error("unknown session: {0}")]
  UnknownSession(String),
  #[error("bad cursor token: {0}")]
  BadCursor(String),
  #[error("invalid argument: {0}")]
  InvalidArg(String),
  #[error("bad options: {0}")]
  Options(#[from] serde_json::Error),
  #[error(transparent)]
  Copy(#[from] CopyError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
  /// Children per page when a caller asks for `limit == 0`.
  pub default_page_size: usize,
  /// Strings longer than this are cut with `…` in previews. 0 disables.
  pub collapse_strings_after_length: usize,
  /// Arrays longer than this are shown in groups of this many items.
  pub group_arrays_after_length: usize,
  /// Rows shallower than this start expanded.
  pub default_inspect_depth: usize,
  /// List object keys alphabetically instead of in insertion order.
  pub sort_object_keys: bool,
  pub copied_timeout_ms: u64,
}

impl Default for ViewerOptions {
  fn default() -> Self {
    Self {
      default_page_size: 50,
      collapse_strings_after_length: 50,
      group_arrays_after_length: 100,
      default_inspect_depth: 5,
      sort_object_keys: false,
      copied_timeout_ms: 2_000,
    }
  }
}

impl ViewerOptions {
  /// Parse options from JSON; missing fields keep their defaults.
  pub fn from_json_str(s: &str) -> Result<Self, ViewerError> {
    Ok(serde_json::from_str(s)?)
  }
}

#[derive(Debug)]
struct Session {
  info: SessionInfo,
  root: Value,
  paths: PathCache,
  inspect: InspectState,
}

/// Custom ordering of object keys in child listings.
pub type KeyOrder = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

#[derive(Clone)]
pub struct ViewerEngine {
  options: ViewerOptions,
  key_order: Option<KeyOrder>,
  sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl fmt::Debug for ViewerEngine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ViewerEngine")
      .field("options", &self.options)
      .field("key_order", &self.key_order.is_some())
      .finish_non_exhaustive()
  }
}

impl ViewerEngine {
  pub fn new(options: ViewerOptions) -> Self {
    Self {
      options,
      key_order: None,
      sessions: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Order object keys in [`ViewerEngine::list_children`] with `cmp`. Takes precedence over
  /// `sort_object_keys`.
  pub fn with_key_order(
    mut self,
    cmp: impl Fn(&str, &str) -> Ordering + Send + Sync + 'static,
  ) -> Self {
    self.key_order = Some(Arc::new(cmp));
    self
  }

  pub fn options(&self) -> &ViewerOptions {
    &self.options
  }

  /// Start viewing `root`. Every session owns its own path cache and inspect state.
  pub fn open_value(&self, root: Value) -> SessionInfo {
    let session_id = Uuid::new_v4().to_string();
    let info = SessionInfo {
      session_id: session_id.clone(),
      root_kind: root.kind(),
      created_at_ms: now_ms(),
    };
    let state = Session {
      info: info.clone(),
      root,
      paths: PathCache::new(),
      inspect: InspectState::new(self.options.default_inspect_depth),
    };
    self.sessions.lock().insert(session_id.clone(), state);
    info!(session_id = %session_id, kind = ?info.root_kind, "opened session");
    info
  }

  pub fn close(&self, session_id: &str) -> Result<(), ViewerError> {
    if self.sessions.lock().remove(session_id).is_none() {
      return Err(ViewerError::UnknownSession(session_id.to_string()));
    }
    debug!(session_id, "closed session");
    Ok(())
  }

  pub fn session_info(&self, session_id: &str) -> Result<SessionInfo, ViewerError> {
    self.with_session(session_id, |s| Ok(s.info.clone()))
  }

  pub fn root(&self, session_id: &str) -> Result<Value, ViewerError> {
    self.with_session(session_id, |s| Ok(s.root.clone()))
  }

  /// Swap in a new root. A root with a different identity starts from an empty path cache
  /// and fresh inspect state, even if it is structurally equal to the old one.
  pub fn replace_root(&self, session_id: &str, root: Value) -> Result<(), ViewerError> {
    self.with_session(session_id, |s| {
      replace_session_root(s, root);
      Ok(())
    })
  }

  /// Path from the session root to `target`, memoized per root instance.
  pub fn resolve_path(
    &self,
    session_id: &str,
    target: &NodeRef,
  ) -> Result<Vec<PathSegment>, ViewerError> {
    self.with_session(session_id, |s| s.paths.resolve(&s.root, target))
  }

  pub fn cache_generation(&self, session_id: &str) -> Result<u64, ViewerError> {
    self.with_session(session_id, |s| Ok(s.paths.generation()))
  }

  pub fn detect_cycle(
    &self,
    session_id: &str,
    path: &[PathSegment],
    candidate: &Value,
  ) -> Result<CycleResult, ViewerError> {
    self.with_session(session_id, |s| Ok(detect_cycle(&s.root, path, candidate)))
  }

  pub fn value_at(&self, session_id: &str, path: &[PathSegment]) -> Result<Value, ViewerError> {
    self.with_session(session_id, |s| lookup(&s.root, path))
  }

  pub fn node_summary(
    &self,
    session_id: &str,
    path: &[PathSegment],
  ) -> Result<NodeSummary, ViewerError> {
    let value = self.value_at(session_id, path)?;
    Ok(NodeSummary {
      kind: value.kind(),
      size: value_size(&value),
    })
  }

  /// List direct children of the node at `path`, one page at a time.
  ///
  /// Each child carries the address of the ancestor it points back to, if it is circular,
  /// so the caller can render a reference instead of expanding it.
  pub fn list_children(
    &self,
    session_id: &str,
    path: &[PathSegment],
    cursor: Option<&str>,
    limit: usize,
  ) -> Result<ChildrenPage, ViewerError> {
    let root = self.root(session_id)?;
    let value = lookup(&root, path)?;
    let Value::Node(node) = &value else {
      return Ok(ChildrenPage {
        items: vec![],
        next_cursor: None,
        reached_end: true,
      });
    };

    let c = decode_cursor(cursor)?;
    let limit = if limit == 0 {
      self.options.default_page_size
    } else {
      limit
    };

    let mut entries = node.entries();
    if node.kind() == ValueKind::Object {
      if let Some(order) = &self.key_order {
        sort_keys(&mut entries, |a, b| order(a, b));
      } else if self.options.sort_object_keys {
        sort_keys(&mut entries, |a, b| a.cmp(b));
      }
    }
    let total = entries.len();
    let start = usize::try_from(c.idx).unwrap_or(usize::MAX).min(total);

    let collapse = self.options.collapse_strings_after_length;
    let mut child_path = path.to_vec();
    let mut items = Vec::new();
    for (segment, child) in entries.into_iter().skip(start).take(limit) {
      child_path.push(segment.clone());
      let circular = detect_cycle(&root, &child_path, &child)
        .address()
        .map(str::to_string);
      child_path.pop();
      items.push(ChildItem {
        segment,
        kind: child.kind(),
        size: value_size(&child),
        preview: preview(&child, collapse),
        circular,
      });
    }

    let end = start + items.len();
    let reached_end = end >= total;
    let next_cursor = (!reached_end).then(|| encode_cursor(ChildCursor { idx: end as u64 }));
    Ok(ChildrenPage {
      items,
      next_cursor,
      reached_end,
    })
  }

  /// Display groups for the container at `path`; long arrays are split into fixed-size ranges.
  pub fn segments(
    &self,
    session_id: &str,
    path: &[PathSegment],
  ) -> Result<Vec<ItemRange>, ViewerError> {
    let value = self.value_at(session_id, path)?;
    if !value.kind().is_container() {
      return Err(ViewerError::InvalidArg(format!(
        "{:?} at `{}` has no children",
        value.kind(),
        format_address(path)
      )));
    }
    Ok(segment_ranges(
      value_size(&value),
      self.options.group_arrays_after_length,
    ))
  }

  /// Write `value` at `path`. On error the tree is left untouched.
  pub fn apply_edit(
    &self,
    session_id: &str,
    path: &[PathSegment],
    value: Value,
  ) -> Result<Value, ViewerError> {
    self.with_session(session_id, |s| {
      match apply_value(s.root.clone(), path, value) {
        Ok(updated) => {
          if path.is_empty() {
            replace_session_root(s, updated.clone());
          }
          debug!(path = %format_address(path), "applied edit");
          Ok(updated)
        }
        Err(e) => {
          warn!(path = %format_address(path), error = %e, "rejected edit");
          Err(e)
        }
      }
    })
  }

  pub fn serialize(&self, session_id: &str, path: &[PathSegment]) -> Result<String, ViewerError> {
    let value = self.value_at(session_id, path)?;
    Ok(serialize(&value))
  }

  /// A copy handler configured with this engine's timeout.
  pub fn copy_handler(&self) -> CopyHandler {
    CopyHandler::new(Duration::from_millis(self.options.copied_timeout_ms))
  }

  pub fn copy(
    &self,
    session_id: &str,
    path: &[PathSegment],
    handler: &mut CopyHandler,
    clipboard: &mut dyn Clipboard,
  ) -> Result<Option<String>, ViewerError> {
    let value = self.value_at(session_id, path)?;
    Ok(handler.copy(path, &value, clipboard, Instant::now())?)
  }

  pub fn is_expanded(&self, session_id: &str, path: &[PathSegment]) -> Result<bool, ViewerError> {
    self.with_session(session_id, |s| Ok(s.inspect.is_expanded(path)))
  }

  pub fn set_expanded(
    &self,
    session_id: &str,
    path: &[PathSegment],
    expanded: bool,
  ) -> Result<(), ViewerError> {
    self.with_session(session_id, |s| {
      s.inspect.set_expanded(path, expanded);
      Ok(())
    })
  }

  pub fn toggle_expanded(&self, session_id: &str, path: &[PathSegment]) -> Result<bool, ViewerError> {
    self.with_session(session_id, |s| Ok(s.inspect.toggle(path)))
  }

  fn with_session<R>(
    &self,
    session_id: &str,
    f: impl FnOnce(&mut Session) -> Result<R, ViewerError>,
  ) -> Result<R, ViewerError> {
    let mut sessions = self.sessions.lock();
    let s = sessions
      .get_mut(session_id)
      .ok_or_else(|| ViewerError::UnknownSession(session_id.to_string()))?;
    f(s)
  }
}

fn replace_session_root(s: &mut Session, root: Value) {
  if s.root.is(&root) {
    return;
  }
  s.info.root_kind = root.kind();
  s.root = root;
  s.paths.clear();
  s.inspect.clear();
  debug!(
    session_id = %s.info.session_id,
    generation = s.paths.generation(),
    "root replaced"
  );
}

fn sort_keys(entries: &mut [(PathSegment, Value)], cmp: impl Fn(&str, &str) -> Ordering) {
  entries.sort_by(|(a, _), (b, _)| match (a, b) {
    (PathSegment::Key(a), PathSegment::Key(b)) => cmp(a, b),
    _ => Ordering::Equal,
  });
}

fn lookup(root: &Value, path: &[PathSegment]) -> Result<Value, ViewerError> {
  root
    .lookup(path)
    .ok_or_else(|| ViewerError::InvalidPath(format!("nothing at `{}`", format_address(path))))
}

fn now_ms() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}
