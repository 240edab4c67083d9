use crate::{
  cycle::format_address,
  engine::ViewerError,
  models::PathSegment,
  value::{Container, NodeRef, Value},
};

/// Key that would address the prototype slot in the host; never writable through an edit.
pub const FORBIDDEN_KEY: &str = "__proto__";

/// Array lengths stay below 2^32, as in the host.
const MAX_ARRAY_INDEX: usize = u32::MAX as usize;

/// Write `value` at `path` inside `root`.
///
/// An empty path replaces the whole value and returns `value`. Otherwise the containers along
/// `path` are mutated in place and the same `root` handle is returned.
pub fn apply_value(root: Value, path: &[PathSegment], value: Value) -> Result<Value, ViewerError> {
  if path.is_empty() {
    return Ok(value);
  }
  let Value::Node(node) = &root else {
    return Err(ViewerError::InvalidPath(format!(
      "cannot descend into {:?} at `{}`",
      root.kind(),
      format_address(path)
    )));
  };
  assign(node, path, 0, value)?;
  Ok(root)
}

fn assign(node: &NodeRef, path: &[PathSegment], depth: usize, value: Value) -> Result<(), ViewerError> {
  let segment = &path[depth];
  if matches!(segment, PathSegment::Key(k) if k == FORBIDDEN_KEY) {
    return Err(ViewerError::ForbiddenKey(FORBIDDEN_KEY.to_string()));
  }
  if depth + 1 == path.len() {
    return set_child(node, segment, value)
      .map_err(|why| ViewerError::InvalidPath(format!("{why} at `{}`", format_address(path))));
  }
  // The read lock is released before descending; the child may be `node` itself.
  let child = node.get(segment);
  match child {
    Some(Value::Node(child)) => assign(&child, path, depth + 1, value),
    _ => Err(ViewerError::InvalidPath(format!(
      "no container at `{}`",
      format_address(&path[..=depth])
    ))),
  }
}

fn set_child(node: &NodeRef, segment: &PathSegment, value: Value) -> Result<(), &'static str> {
  let mut guard = node.write();
  match (&mut *guard, segment) {
    (Container::Array(items), PathSegment::Index(i)) => {
      let i = usize::try_from(*i)
        .ok()
        .filter(|i| *i < MAX_ARRAY_INDEX)
        .ok_or("index out of range")?;
      // Writing past the end leaves `undefined` holes, like a sparse array.
      if i >= items.len() {
        items.resize(i + 1, Value::Undefined);
      }
      items[i] = value;
    }
    (Container::Object(fields), PathSegment::Key(k)) => {
      fields.insert(k.clone(), value);
    }
    (Container::Object(fields), PathSegment::Index(i)) => {
      fields.insert(i.to_string(), value);
    }
    (Container::Map(entries), PathSegment::Index(i)) => {
      let entry = usize::try_from(*i)
        .ok()
        .and_then(|i| entries.get_mut(i))
        .ok_or("no such map entry")?;
      entry.1 = value;
    }
    (Container::Map(entries), PathSegment::Key(k)) => {
      match entries
        .iter_mut()
        .find(|(key, _)| matches!(key, Value::String(s) if s == k))
      {
        Some(entry) => entry.1 = value,
        None => entries.push((Value::String(k.clone()), value)),
      }
    }
    (Container::Set(items), PathSegment::Index(i)) => {
      let slot = usize::try_from(*i)
        .ok()
        .and_then(|i| items.get_mut(i))
        .ok_or("no such set member")?;
      *slot = value;
    }
    (Container::Array(_), PathSegment::Key(_)) | (Container::Set(_), PathSegment::Key(_)) => {
      return Err("key segment on a positional container");
    }
  }
  Ok(())
}
