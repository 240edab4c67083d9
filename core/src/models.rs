use serde::{Deserialize, Serialize};

/// One step of a structural path from the root to a nested value.
///
/// This is intentionally "untagged" so a path marshals as a plain array like
/// `["foo", 0, "bar"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PathSegment {
  Key(String),
  Index(u64),
}

impl From<&str> for PathSegment {
  fn from(k: &str) -> Self {
    PathSegment::Key(k.to_string())
  }
}

impl From<String> for PathSegment {
  fn from(k: String) -> Self {
    PathSegment::Key(k)
  }
}

impl From<u64> for PathSegment {
  fn from(i: u64) -> Self {
    PathSegment::Index(i)
  }
}

impl From<usize> for PathSegment {
  fn from(i: usize) -> Self {
    PathSegment::Index(i as u64)
  }
}

/// Closed classification of a value, computed once and matched exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
  Undefined,
  Null,
  Boolean,
  Number,
  BigInt,
  String,
  Date,
  Function,
  Array,
  Object,
  Map,
  Set,
}

impl ValueKind {
  pub fn is_container(self) -> bool {
    matches!(
      self,
      ValueKind::Array | ValueKind::Object | ValueKind::Map | ValueKind::Set
    )
  }
}

/// Outcome of checking whether a value shown at a path refers back to one of its ancestors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "address")]
pub enum CycleResult {
  /// No cycle: either side is not a container, the path is dead, or the value simply
  /// sits at its own location.
  NotApplicable,
  /// The value is the root itself, shown below the root.
  DirectSelfReference,
  /// The value already occurs at this (shallowest) ancestor address.
  ReachableAt(String),
}

impl CycleResult {
  pub fn is_cycle(&self) -> bool {
    !matches!(self, CycleResult::NotApplicable)
  }

  /// Address to display for a circular child: `""` for the root itself.
  pub fn address(&self) -> Option<&str> {
    match self {
      CycleResult::NotApplicable => None,
      CycleResult::DirectSelfReference => Some(""),
      CycleResult::ReachableAt(addr) => Some(addr),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
  pub session_id: String,
  pub root_kind: ValueKind,
  pub created_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSummary {
  pub kind: ValueKind,
  pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildItem {
  pub segment: PathSegment,
  pub kind: ValueKind,
  pub size: usize,
  pub preview: String,
  /// Address of the ancestor this child refers back to (`""` is the root).
  pub circular: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenPage {
  pub items: Vec<ChildItem>,
  pub next_cursor: Option<String>,
  pub reached_end: bool,
}

/// Half-open index range of one group when a long array is split for display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRange {
  pub start: usize,
  pub end: usize,
}
