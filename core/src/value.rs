use std::{
  fmt,
  sync::{Arc, Weak},
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{PathSegment, ValueKind};

/// A viewed value.
///
/// Scalars are stored inline. Containers live behind a [`NodeRef`], whose pointer is the
/// node's identity: two `Value::Node`s are the same node only if they share the allocation,
/// never because their contents compare equal.
#[derive(Debug, Clone)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  BigInt(i128),
  String(String),
  Date(DateTime<Utc>),
  Function(Arc<FunctionValue>),
  Node(NodeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionValue {
  pub name: Option<String>,
  /// Source text as the host would print it.
  pub source: String,
}

#[derive(Debug, Clone)]
pub enum Container {
  Array(Vec<Value>),
  /// Own enumerable keys in insertion order.
  Object(IndexMap<String, Value>),
  /// Entries in insertion order. Keys may be any value, including nodes.
  Map(Vec<(Value, Value)>),
  Set(Vec<Value>),
}

/// Opaque identity of a container node. Only meaningful while the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone)]
pub struct NodeRef(Arc<RwLock<Container>>);

#[derive(Clone, Default)]
pub struct WeakNodeRef(Weak<RwLock<Container>>);

impl Container {
  pub fn kind(&self) -> ValueKind {
    match self {
      Container::Array(_) => ValueKind::Array,
      Container::Object(_) => ValueKind::Object,
      Container::Map(_) => ValueKind::Map,
      Container::Set(_) => ValueKind::Set,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Container::Array(items) | Container::Set(items) => items.len(),
      Container::Object(fields) => fields.len(),
      Container::Map(entries) => entries.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Own enumerable children in natural enumeration order.
  ///
  /// Arrays, sets and maps are addressed by position (a map child is the entry's value);
  /// objects by key.
  pub fn entries(&self) -> Vec<(PathSegment, Value)> {
    match self {
      Container::Array(items) | Container::Set(items) => items
        .iter()
        .enumerate()
        .map(|(i, v)| (PathSegment::Index(i as u64), v.clone()))
        .collect(),
      Container::Object(fields) => fields
        .iter()
        .map(|(k, v)| (PathSegment::Key(k.clone()), v.clone()))
        .collect(),
      Container::Map(entries) => entries
        .iter()
        .enumerate()
        .map(|(i, (_, v))| (PathSegment::Index(i as u64), v.clone()))
        .collect(),
    }
  }

  /// Look up one child. `None` when the segment does not name an existing child.
  pub fn get(&self, segment: &PathSegment) -> Option<&Value> {
    match (self, segment) {
      (Container::Array(items) | Container::Set(items), PathSegment::Index(i)) => {
        items.get(usize::try_from(*i).ok()?)
      }
      (Container::Object(fields), PathSegment::Key(k)) => fields.get(k),
      (Container::Object(fields), PathSegment::Index(i)) => fields.get(&i.to_string()),
      (Container::Map(entries), PathSegment::Index(i)) => {
        entries.get(usize::try_from(*i).ok()?).map(|(_, v)| v)
      }
      (Container::Map(entries), PathSegment::Key(k)) => entries
        .iter()
        .find(|(key, _)| matches!(key, Value::String(s) if s == k))
        .map(|(_, v)| v),
      _ => None,
    }
  }
}

impl NodeRef {
  pub fn new(container: Container) -> Self {
    Self(Arc::new(RwLock::new(container)))
  }

  pub fn id(&self) -> NodeId {
    NodeId(Arc::as_ptr(&self.0) as *const () as usize)
  }

  pub fn ptr_eq(&self, other: &NodeRef) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  pub fn downgrade(&self) -> WeakNodeRef {
    WeakNodeRef(Arc::downgrade(&self.0))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, Container> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, Container> {
    self.0.write()
  }

  pub fn kind(&self) -> ValueKind {
    self.read().kind()
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  /// Snapshot of the children. The lock is released before returning, so callers may
  /// freely lock the children (including this node again, through a cycle).
  pub fn entries(&self) -> Vec<(PathSegment, Value)> {
    self.read().entries()
  }

  pub fn get(&self, segment: &PathSegment) -> Option<Value> {
    self.read().get(segment).cloned()
  }

  /// Insert or overwrite an object field. No-op on non-object containers.
  pub fn insert(&self, key: impl Into<String>, value: Value) {
    if let Container::Object(fields) = &mut *self.write() {
      fields.insert(key.into(), value);
    }
  }
}

impl fmt::Debug for NodeRef {
  // Shallow: the graph may be cyclic.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.try_read() {
      Some(c) => f
        .debug_struct("NodeRef")
        .field("id", &self.id())
        .field("kind", &c.kind())
        .field("len", &c.len())
        .finish(),
      None => f.debug_struct("NodeRef").field("id", &self.id()).finish_non_exhaustive(),
    }
  }
}

impl WeakNodeRef {
  pub fn upgrade(&self) -> Option<NodeRef> {
    self.0.upgrade().map(NodeRef)
  }

  pub fn is_alive(&self) -> bool {
    self.0.strong_count() > 0
  }
}

impl fmt::Debug for WeakNodeRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("WeakNodeRef")
  }
}

impl Value {
  pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
    Value::Node(NodeRef::new(Container::Array(items.into_iter().collect())))
  }

  pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
    Value::Node(NodeRef::new(Container::Object(
      fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    )))
  }

  pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
    Value::Node(NodeRef::new(Container::Map(entries.into_iter().collect())))
  }

  /// Build a set. Members are kept in insertion order and deduplicated with [`Value::is`].
  pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
    let mut members: Vec<Value> = Vec::new();
    for item in items {
      if !members.iter().any(|m| m.is(&item)) {
        members.push(item);
      }
    }
    Value::Node(NodeRef::new(Container::Set(members)))
  }

  pub fn function(name: Option<&str>, source: impl Into<String>) -> Self {
    Value::Function(Arc::new(FunctionValue {
      name: name.map(str::to_string),
      source: source.into(),
    }))
  }

  pub fn kind(&self) -> ValueKind {
    match self {
      Value::Undefined => ValueKind::Undefined,
      Value::Null => ValueKind::Null,
      Value::Bool(_) => ValueKind::Boolean,
      Value::Number(_) => ValueKind::Number,
      Value::BigInt(_) => ValueKind::BigInt,
      Value::String(_) => ValueKind::String,
      Value::Date(_) => ValueKind::Date,
      Value::Function(_) => ValueKind::Function,
      Value::Node(node) => node.kind(),
    }
  }

  pub fn as_node(&self) -> Option<&NodeRef> {
    match self {
      Value::Node(node) => Some(node),
      _ => None,
    }
  }

  /// Same-value comparison: nodes and functions by identity, scalars by value
  /// (`NaN` is `NaN`, `0` is not `-0`).
  pub fn is(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => {
        (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
      }
      (Value::BigInt(a), Value::BigInt(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Date(a), Value::Date(b)) => a == b,
      (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
      (Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
      _ => false,
    }
  }

  pub fn is_node_ref(&self, node: &NodeRef) -> bool {
    self.as_node().is_some_and(|n| n.ptr_eq(node))
  }

  /// Follow `path` down from this value. `None` if a segment does not resolve.
  pub fn lookup(&self, path: &[PathSegment]) -> Option<Value> {
    let mut current = self.clone();
    for segment in path {
      let next = current.as_node()?.get(segment)?;
      current = next;
    }
    Some(current)
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    self.is(other)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self {
    Value::Number(n)
  }
}

impl From<i32> for Value {
  fn from(n: i32) -> Self {
    Value::Number(f64::from(n))
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self {
    Value::Number(n as f64)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl From<DateTime<Utc>> for Value {
  fn from(d: DateTime<Utc>) -> Self {
    Value::Date(d)
  }
}

impl From<NodeRef> for Value {
  fn from(node: NodeRef) -> Self {
    Value::Node(node)
  }
}

impl From<serde_json::Value> for Value {
  fn from(v: serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
      serde_json::Value::String(s) => Value::String(s),
      serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
      serde_json::Value::Object(fields) => {
        Value::object(fields.into_iter().map(|(k, v)| (k, Value::from(v))))
      }
    }
  }
}
