use crate::{models::ValueKind, size::value_size, value::Value};

/// Short one-line rendering of a value for a tree row.
///
/// Strings are quoted and collapsed after `collapse_after` chars; containers render as their
/// kind and size (`Array(3)`), never their contents.
pub fn preview(value: &Value, collapse_after: usize) -> String {
  match value {
    Value::Undefined => "undefined".to_string(),
    Value::Null => "null".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => format_number(*n),
    Value::BigInt(n) => format!("{n}n"),
    Value::String(s) => format!("\"{}\"", collapse_string(s, collapse_after)),
    Value::Date(d) => d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    Value::Function(f) => match &f.name {
      Some(name) => format!("ƒ {name}()"),
      None => "ƒ ()".to_string(),
    },
    Value::Node(_) => {
      let label = match value.kind() {
        ValueKind::Array => "Array",
        ValueKind::Map => "Map",
        ValueKind::Set => "Set",
        _ => "Object",
      };
      format!("{label}({})", value_size(value))
    }
  }
}

/// Keep the first `max` chars and mark the cut with `…`. `max == 0` disables collapsing.
pub fn collapse_string(s: &str, max: usize) -> String {
  if max == 0 {
    return s.to_string();
  }
  let mut out = String::new();
  for (i, ch) in s.chars().enumerate() {
    if i >= max {
      out.push('…');
      break;
    }
    out.push(ch);
  }
  out
}

fn format_number(n: f64) -> String {
  if n.is_nan() {
    return "NaN".to_string();
  }
  if n.is_infinite() {
    return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
  }
  if n.fract() == 0.0 && n.abs() < 1e21 {
    return format!("{}", n as i128);
  }
  n.to_string()
}
