use std::collections::HashMap;

use crate::models::PathSegment;

/// Expand/collapse state of tree rows, keyed by path.
///
/// Rows the user never touched fall back to a depth rule: everything shallower than
/// `default_depth` starts expanded.
#[derive(Debug, Clone, Default)]
pub struct InspectState {
  default_depth: usize,
  explicit: HashMap<Vec<PathSegment>, bool>,
}

impl InspectState {
  pub fn new(default_depth: usize) -> Self {
    Self {
      default_depth,
      explicit: HashMap::new(),
    }
  }

  pub fn is_expanded(&self, path: &[PathSegment]) -> bool {
    self
      .explicit
      .get(path)
      .copied()
      .unwrap_or(path.len() < self.default_depth)
  }

  pub fn set_expanded(&mut self, path: &[PathSegment], expanded: bool) {
    self.explicit.insert(path.to_vec(), expanded);
  }

  /// Flip a row and return its new state.
  pub fn toggle(&mut self, path: &[PathSegment]) -> bool {
    let next = !self.is_expanded(path);
    self.set_expanded(path, next);
    next
  }

  pub fn clear(&mut self) {
    self.explicit.clear();
  }
}
