use std::collections::HashSet;

use serde_json::{Number, Value as JsonValue};

use crate::value::{Container, NodeId, NodeRef, Value};

/// Stand-in for a property that refers back to one of its ancestors.
pub const CIRCULAR_MARKER: &str = "###_Circular_###";

/// Serialize any value to compact JSON text without looping or failing on cycles.
///
/// Functions are dropped. A node that already appears on the current ancestor chain is
/// replaced with [`CIRCULAR_MARKER`]; the same node reached through two siblings is written
/// out in full both times.
///
/// Every container keeps its natural JSON shape rather than being flattened to a keyed
/// object. Arrays and sets are written as arrays and maps as objects keyed by the text of each
/// key. Dates become ISO-8601 strings with milliseconds, and bigints become decimal strings.
///
/// The walk keeps its own frame stack and writes text as it goes, so nesting depth is bounded
/// only by memory.
pub fn serialize(value: &Value) -> String {
  let mut out = String::new();
  let mut on_chain = HashSet::new();
  write_value(value, &mut on_chain, &mut out);
  out
}

enum Children {
  Items(std::vec::IntoIter<Value>),
  Fields(std::vec::IntoIter<(String, Value)>),
}

/// A container whose opening bracket is written and whose children are still pending.
struct Frame {
  id: NodeId,
  children: Children,
  first: bool,
  close: char,
}

fn write_value(value: &Value, on_chain: &mut HashSet<NodeId>, out: &mut String) {
  let Value::Node(node) = value else {
    out.push_str(scalar_text(value).as_deref().unwrap_or("null"));
    return;
  };

  let mut stack = vec![open(node, on_chain, out)];
  while let Some(frame) = stack.last_mut() {
    let next = match &mut frame.children {
      Children::Items(items) => items.next().map(|v| (None, v)),
      Children::Fields(fields) => fields.next().map(|(k, v)| (Some(k), v)),
    };
    let Some((key, child)) = next else {
      out.push(frame.close);
      on_chain.remove(&frame.id);
      stack.pop();
      continue;
    };

    // Properties holding functions or `undefined` are omitted; array slots become `null`.
    let text = match &child {
      Value::Node(_) => None,
      other => scalar_text(other),
    };
    if key.is_some() && text.is_none() && !matches!(child, Value::Node(_)) {
      continue;
    }

    if !frame.first {
      out.push(',');
    }
    frame.first = false;
    if let Some(key) = key {
      push_json_str(&key, out);
      out.push(':');
    }

    match child {
      Value::Node(node) if on_chain.contains(&node.id()) => push_json_str(CIRCULAR_MARKER, out),
      Value::Node(node) => {
        let frame = open(&node, on_chain, out);
        stack.push(frame);
      }
      _ => out.push_str(text.as_deref().unwrap_or("null")),
    }
  }
}

/// Write the opening bracket of `node` and put it on the ancestor chain.
fn open(node: &NodeRef, on_chain: &mut HashSet<NodeId>, out: &mut String) -> Frame {
  // Snapshot so no lock is held while descending.
  let snapshot = node.read().clone();
  on_chain.insert(node.id());
  let (children, opening, close) = match snapshot {
    Container::Array(items) | Container::Set(items) => {
      (Children::Items(items.into_iter()), '[', ']')
    }
    Container::Object(fields) => {
      let fields: Vec<(String, Value)> = fields.into_iter().collect();
      (Children::Fields(fields.into_iter()), '{', '}')
    }
    Container::Map(entries) => {
      let fields: Vec<(String, Value)> = entries
        .into_iter()
        .map(|(k, v)| (map_key_text(&k, on_chain), v))
        .collect();
      (Children::Fields(fields.into_iter()), '{', '}')
    }
  };
  out.push(opening);
  Frame {
    id: node.id(),
    children,
    first: true,
    close,
  }
}

fn map_key_text(key: &Value, on_chain: &mut HashSet<NodeId>) -> String {
  match key {
    Value::String(s) => s.clone(),
    Value::Undefined => "undefined".to_string(),
    Value::Function(f) => f.source.clone(),
    Value::Node(node) if on_chain.contains(&node.id()) => CIRCULAR_MARKER.to_string(),
    Value::Node(_) => {
      let mut text = String::new();
      write_value(key, on_chain, &mut text);
      text
    }
    other => scalar_text(other).unwrap_or_else(|| "null".to_string()),
  }
}

/// JSON text of a non-container value. `None` for values JSON cannot hold.
fn scalar_text(value: &Value) -> Option<String> {
  let json = match value {
    Value::Undefined | Value::Function(_) | Value::Node(_) => return None,
    Value::Null => JsonValue::Null,
    Value::Bool(b) => JsonValue::Bool(*b),
    Value::Number(n) => number_to_json(*n),
    Value::BigInt(n) => JsonValue::String(n.to_string()),
    Value::String(s) => JsonValue::String(s.clone()),
    Value::Date(d) => JsonValue::String(d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
  };
  Some(json.to_string())
}

fn push_json_str(s: &str, out: &mut String) {
  out.push_str(&serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string()));
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Integral values print without a fraction; NaN and the infinities become `null`.
fn number_to_json(n: f64) -> JsonValue {
  if !n.is_finite() {
    return JsonValue::Null;
  }
  if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
    return JsonValue::Number(Number::from(n as i64));
  }
  Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}
