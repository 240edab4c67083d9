use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::engine::ViewerError;

/// Position of the next child to list under a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct ChildCursor {
  pub idx: u64,
}

pub(crate) fn encode_cursor(c: ChildCursor) -> String {
  // A struct holding one integer always serializes.
  let json = serde_json::to_vec(&c).unwrap_or_default();
  base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

pub(crate) fn decode_cursor(token: Option<&str>) -> Result<ChildCursor, ViewerError> {
  match token {
    None => Ok(ChildCursor { idx: 0 }),
    Some(t) if t.is_empty() => Ok(ChildCursor { idx: 0 }),
    Some(t) => {
      let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(t)
        .map_err(|e| ViewerError::BadCursor(e.to_string()))?;
      let c: ChildCursor =
        serde_json::from_slice(&bytes).map_err(|e| ViewerError::BadCursor(e.to_string()))?;
      Ok(c)
    }
  }
}
