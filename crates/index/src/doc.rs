//! Small helpers for poking at JSON documents by dotted path.

use serde_json::{Map, Value};

/// Resolve `a.b.c` against nested objects.
pub(crate) fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, key| node.get(key))
}

/// Numbers, or strings that parse as finite numbers.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Non-blank string, or the first non-blank string of an array.
pub(crate) fn as_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(as_text),
        _ => None,
    }
}

/// Lowercased alphanumeric tokens, roughly what the standard analyzer produces.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Copy only the requested (possibly dotted) paths out of `doc`.
pub(crate) fn project(doc: &Value, includes: &[String]) -> Value {
    let mut out = Map::new();
    for path in includes {
        if let Some(value) = lookup(doc, path) {
            insert_path(&mut out, path, value.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(out: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            out.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}
