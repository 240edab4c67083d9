mod clipboard;
mod cursor;
mod cycle;
mod engine;
mod inspect;
mod models;
mod mutate;
mod path_cache;
mod preview;
mod serialize;
mod size;
mod value;

pub use crate::clipboard::{
  copy_payload, Clipboard, CopyError, CopyHandler, FallbackClipboard, MemoryClipboard, OnCopy,
};
pub use crate::cycle::{detect_cycle, format_address};
pub use crate::engine::{KeyOrder, ViewerEngine, ViewerError, ViewerOptions};
pub use crate::inspect::InspectState;
pub use crate::models::{
  ChildItem, ChildrenPage, CycleResult, ItemRange, NodeSummary, PathSegment, SessionInfo,
  ValueKind,
};
pub use crate::mutate::{apply_value, FORBIDDEN_KEY};
pub use crate::path_cache::PathCache;
pub use crate::preview::{collapse_string, preview};
pub use crate::serialize::{serialize, CIRCULAR_MARKER};
pub use crate::size::{segment_ranges, value_size};
pub use crate::value::{Container, FunctionValue, NodeId, NodeRef, Value, WeakNodeRef};
