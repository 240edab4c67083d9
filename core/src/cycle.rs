use crate::{
  models::{CycleResult, PathSegment},
  value::Value,
};

/// Classify `candidate`, shown at `path` below `root`, as circular or not.
///
/// Walks `path` from `root` and stops at the first (shallowest) ancestor that is the very
/// same node as `candidate`. Reaching the end of the path is not a cycle: that is simply
/// where `candidate` lives.
pub fn detect_cycle(root: &Value, path: &[PathSegment], candidate: &Value) -> CycleResult {
  let (Some(root), Some(target)) = (root.as_node(), candidate.as_node()) else {
    return CycleResult::NotApplicable;
  };
  if root.ptr_eq(target) {
    if path.is_empty() {
      return CycleResult::NotApplicable;
    }
    return CycleResult::DirectSelfReference;
  }

  let mut current = root.clone();
  for (depth, segment) in path.iter().enumerate() {
    let next = match current.get(segment) {
      Some(Value::Node(node)) => node,
      // dead path
      _ => return CycleResult::NotApplicable,
    };
    if next.ptr_eq(target) {
      if depth + 1 == path.len() {
        return CycleResult::NotApplicable;
      }
      return CycleResult::ReachableAt(format_address(&path[..=depth]));
    }
    current = next;
  }
  CycleResult::NotApplicable
}

/// Render a path for display: `["a", 0, "b"]` becomes `a[0].b`.
pub fn format_address(path: &[PathSegment]) -> String {
  let mut out = String::new();
  for (i, segment) in path.iter().enumerate() {
    match segment {
      PathSegment::Index(n) => {
        out.push('[');
        out.push_str(&n.to_string());
        out.push(']');
      }
      PathSegment::Key(k) => {
        if i != 0 {
          out.push('.');
        }
        out.push_str(k);
      }
    }
  }
  out
}
