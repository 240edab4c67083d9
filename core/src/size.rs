use crate::{
  models::ItemRange,
  value::{Container, Value},
};

/// Display length of a value. Looks at the value itself only, never at nested children.
pub fn value_size(value: &Value) -> usize {
  match value {
    Value::Undefined | Value::Null => 0,
    Value::String(s) => s.chars().count(),
    Value::Node(node) => match &*node.read() {
      Container::Array(items) | Container::Set(items) => items.len(),
      Container::Map(entries) => entries.len(),
      Container::Object(fields) => fields.len(),
    },
    Value::Date(_) | Value::Bool(_) | Value::Number(_) | Value::BigInt(_) | Value::Function(_) => 1,
  }
}

/// Split `0..len` into consecutive groups of at most `size` items.
///
/// `size == 0` yields a single group covering everything; an empty array has no groups.
pub fn segment_ranges(len: usize, size: usize) -> Vec<ItemRange> {
  if len == 0 {
    return Vec::new();
  }
  if size == 0 || len <= size {
    return vec![ItemRange { start: 0, end: len }];
  }
  let mut out = Vec::with_capacity(len.div_ceil(size));
  let mut start = 0;
  while start < len {
    let end = (start + size).min(len);
    out.push(ItemRange { start, end });
    start = end;
  }
  out
}
