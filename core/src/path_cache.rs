use std::collections::{HashMap, HashSet};

use tracing::{debug, error, trace};

use crate::{
  engine::ViewerError,
  models::PathSegment,
  value::{NodeId, NodeRef, Value, WeakNodeRef},
};

/// One cached node: the edge that leads to it from its parent on the cached chain.
#[derive(Debug)]
struct CachedPath {
  node: WeakNodeRef,
  /// `None` for direct children of the root.
  parent: Option<WeakNodeRef>,
  segment: PathSegment,
}

/// Dead entries are swept once the table grows past this many entries.
const PRUNE_FLOOR: usize = 1024;

/// Memoized `node -> path` table for exactly one root instance.
///
/// Entries are keyed by node identity and hold only the last segment plus a link to the
/// parent entry, so caching a whole chain costs one entry per node. Resolving against a root
/// with a different identity drops every entry and bumps [`PathCache::generation`]; entries
/// are never shared between roots, even structurally identical ones.
#[derive(Debug)]
pub struct PathCache {
  root: Option<WeakNodeRef>,
  generation: u64,
  entries: HashMap<NodeId, CachedPath>,
  prune_at: usize,
}

impl Default for PathCache {
  fn default() -> Self {
    Self {
      root: None,
      generation: 0,
      entries: HashMap::new(),
      prune_at: PRUNE_FLOOR,
    }
  }
}

/// DFS frame: a node on the current chain and the children not yet visited.
struct Frame {
  node: NodeRef,
  children: std::vec::IntoIter<(PathSegment, Value)>,
}

impl PathCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Incremented every time the cache is reset for a new root.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.root = None;
    self.entries.clear();
    self.prune_at = PRUNE_FLOOR;
    self.generation += 1;
    debug!(generation = self.generation, "path cache reset");
  }

  /// Whether the cache currently belongs to `root`.
  pub fn is_bound_to(&self, root: &NodeRef) -> bool {
    self
      .root
      .as_ref()
      .and_then(WeakNodeRef::upgrade)
      .is_some_and(|r| r.ptr_eq(root))
  }

  fn bind(&mut self, root: &NodeRef) {
    if self.is_bound_to(root) {
      return;
    }
    if self.root.is_some() {
      self.clear();
    }
    self.root = Some(root.downgrade());
  }

  /// Cached path of `target`, if any. A chain broken by a dead node counts as a miss.
  pub fn get(&self, target: &NodeRef) -> Option<Vec<PathSegment>> {
    let mut path = Vec::new();
    let mut current = target.clone();
    // Links point at entries stored earlier; the bound only guards a corrupt table.
    for _ in 0..=self.entries.len() {
      let entry = self.entries.get(&current.id())?;
      if !entry.node.upgrade().is_some_and(|n| n.ptr_eq(&current)) {
        return None;
      }
      path.push(entry.segment.clone());
      match &entry.parent {
        None => {
          path.reverse();
          return Some(path);
        }
        Some(parent) => current = parent.upgrade()?,
      }
    }
    None
  }

  /// Drop entries whose node is gone. Returns how many were removed.
  pub fn prune(&mut self) -> usize {
    let before = self.entries.len();
    self.entries.retain(|_, e| e.node.is_alive());
    self.prune_at = (self.entries.len() * 2).max(PRUNE_FLOOR);
    let removed = before - self.entries.len();
    if removed > 0 {
      debug!(removed, remaining = self.entries.len(), "pruned path cache");
    }
    removed
  }

  /// Cache the edge `parent -> node`. Unless `replace` is set, a node that already has a live
  /// entry keeps it, so paths handed out earlier stay stable.
  fn store(
    &mut self,
    node: &NodeRef,
    parent: Option<&NodeRef>,
    segment: &PathSegment,
    replace: bool,
  ) {
    if self.entries.len() >= self.prune_at {
      self.prune();
    }
    let live = self
      .entries
      .get(&node.id())
      .is_some_and(|e| e.node.is_alive());
    if live && !replace {
      return;
    }
    self.entries.insert(
      node.id(),
      CachedPath {
        node: node.downgrade(),
        parent: parent.map(NodeRef::downgrade),
        segment: segment.clone(),
      },
    );
  }

  /// Structural path from `root` to `target`.
  ///
  /// Depth-first over own keys in enumeration order, skipping edges back into the current
  /// chain. The first path found wins; with shared references that is not necessarily the
  /// shortest one. Every node on the found chain is cached as well.
  ///
  /// `target` must be reachable from `root`; otherwise [`ViewerError::Unreachable`].
  pub fn resolve(&mut self, root: &Value, target: &NodeRef) -> Result<Vec<PathSegment>, ViewerError> {
    if root.is_node_ref(target) {
      return Ok(Vec::new());
    }
    let Some(root) = root.as_node() else {
      return Err(ViewerError::InvalidRoot);
    };
    self.bind(root);

    if let Some(path) = self.get(target) {
      trace!(depth = path.len(), "path cache hit");
      return Ok(path);
    }

    let mut stack = vec![Frame {
      node: root.clone(),
      children: root.entries().into_iter(),
    }];
    let mut on_chain: HashSet<NodeId> = HashSet::from([root.id()]);
    let mut path: Vec<PathSegment> = Vec::new();
    let mut visited: usize = 0;

    while let Some(frame) = stack.last_mut() {
      let Some((segment, child)) = frame.children.next() else {
        if let Some(done) = stack.pop() {
          on_chain.remove(&done.node.id());
        }
        path.pop();
        continue;
      };
      let Value::Node(child) = child else {
        continue;
      };
      visited += 1;

      if child.ptr_eq(target) {
        path.push(segment);
        // stack[i] sits at path[..i]; the root frame itself is not cached.
        for depth in 1..stack.len() {
          let parent = (depth > 1).then(|| &stack[depth - 1].node);
          self.store(&stack[depth].node, parent, &path[depth - 1], false);
        }
        let parent = (stack.len() > 1).then(|| &stack[stack.len() - 1].node);
        self.store(target, parent, &path[path.len() - 1], true);
        debug!(visited, depth = path.len(), "resolved path");
        // A chain that joins an older entry reports the cached route.
        return Ok(self.get(target).unwrap_or(path));
      }

      if !on_chain.insert(child.id()) {
        continue;
      }
      path.push(segment);
      let children = child.entries().into_iter();
      stack.push(Frame { node: child, children });
    }

    error!(visited, "target not reachable from root");
    Err(ViewerError::Unreachable)
  }
}
