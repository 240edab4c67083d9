use rd_core::{MemoryClipboard, PathSegment, Value, ViewerEngine, ViewerOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), String> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let path = std::env::args().nth(1).ok_or_else(|| {
    "usage: cargo run -p rd_core --example smoke_inspect -- <path-to-json> [options.json]".to_string()
  })?;
  let text = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
  let doc: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;

  let options = match std::env::args().nth(2) {
    Some(p) => {
      let s = std::fs::read_to_string(p).map_err(|e| e.to_string())?;
      ViewerOptions::from_json_str(&s).map_err(|e| e.to_string())?
    }
    None => ViewerOptions::default(),
  };

  // Hang the document under a root that also points back at itself.
  let root = Value::object([("document", Value::from(doc))]);
  if let Some(node) = root.as_node() {
    node.insert("self", root.clone());
  }

  let eng = ViewerEngine::new(options);
  let session = eng.open_value(root);
  let sid = session.session_id;

  let page = eng.list_children(&sid, &[], None, 0).map_err(|e| e.to_string())?;
  for item in &page.items {
    match &item.circular {
      Some(addr) => println!("{:?} -> circular ref to `{}`", item.segment, addr),
      None => println!("{:?} = {} ({:?}, size {})", item.segment, item.preview, item.kind, item.size),
    }
  }

  let document = eng
    .value_at(&sid, &[PathSegment::Key("document".into())])
    .map_err(|e| e.to_string())?;
  if let Some(node) = document.as_node() {
    let resolved = eng.resolve_path(&sid, node).map_err(|e| e.to_string())?;
    println!("document path = {resolved:?}");
  }

  let mut handler = eng.copy_handler();
  let mut clipboard = MemoryClipboard::default();
  eng
    .copy(&sid, &[], &mut handler, &mut clipboard)
    .map_err(|e| e.to_string())?;
  println!("copied = {}", clipboard.contents.unwrap_or_default());
  Ok(())
}
