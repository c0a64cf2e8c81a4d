//! Extraction of product lists from workflow response envelopes.
//!
//! The workflow engine wraps its payload in a nested envelope whose exact
//! shape is not fixed. Extraction is expressed as an ordered list of named
//! strategies; each is a pure function from envelope to records and is
//! tried in sequence until one yields a list.

use serde_json::Value;
use tracing::debug;

use crate::agent::RawProduct;

/// One step of a JSON path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Key(&'static str),
    Index(usize),
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// `outputs[0].outputs[0]`: the component output inside a run envelope.
pub const COMPONENT_OUTPUT: &[Segment] = &[
    Segment::Key("outputs"),
    Segment::Index(0),
    Segment::Key("outputs"),
    Segment::Index(0),
];

/// `results.text.data.text`, relative to a component output.
pub const RESULTS_TEXT: &[Segment] = &[
    Segment::Key("results"),
    Segment::Key("text"),
    Segment::Key("data"),
    Segment::Key("text"),
];

/// `outputs[0].outputs[0].results.text.data.text`
pub const ENVELOPE_TEXT: &[Segment] = &[
    Segment::Key("outputs"),
    Segment::Index(0),
    Segment::Key("outputs"),
    Segment::Index(0),
    Segment::Key("results"),
    Segment::Key("text"),
    Segment::Key("data"),
    Segment::Key("text"),
];

/// Render a path for diagnostics, e.g. `outputs[0].results`.
pub fn render_path(path: &[Segment]) -> String {
    let rendered: String = path.iter().map(|s| s.to_string()).collect();
    rendered.trim_start_matches('.').to_string()
}

/// Where a path walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMiss {
    /// Path up to and including the missing segment
    pub path: String,
    pub message: String,
}

/// Follow `path` from `root`, reporting the first segment that is missing.
pub fn walk<'a>(root: &'a Value, path: &[Segment]) -> Result<&'a Value, PathMiss> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let next = match segment {
            Segment::Key(key) => current.as_object().and_then(|map| map.get(*key)),
            Segment::Index(index) => current.as_array().and_then(|items| items.get(*index)),
        };
        current = next.ok_or_else(|| PathMiss {
            path: render_path(&path[..=depth]),
            message: match segment {
                Segment::Key(key) => format!("key '{}' not found", key),
                Segment::Index(index) => format!("index {} not found", index),
            },
        })?;
    }
    Ok(current)
}

/// Why a leaf value could not be read as records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafError {
    /// A string leaf that is not valid JSON
    Parse(String),
    /// Valid JSON of the wrong shape
    Shape(String),
}

impl std::fmt::Display for LeafError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafError::Parse(msg) => write!(f, "invalid JSON: {}", msg),
            LeafError::Shape(msg) => write!(f, "{}", msg),
        }
    }
}

/// Short JSON type name.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read a list of mappings from an array value.
pub fn records_from_array(value: &Value) -> Result<Vec<RawProduct>, LeafError> {
    let items = value
        .as_array()
        .ok_or_else(|| LeafError::Shape(format!("expected a list, got {}", type_name(value))))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .cloned()
                .ok_or_else(|| LeafError::Shape(format!("item {} is {}, not a mapping", i, type_name(item))))
        })
        .collect()
}

/// Decode a JSON-encoded list of mappings.
pub fn decode_records(text: &str) -> Result<Vec<RawProduct>, LeafError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| LeafError::Parse(e.to_string()))?;
    records_from_array(&value)
}

/// Read records from a leaf that is either a list or a JSON string holding one.
pub fn records_from_leaf(leaf: &Value) -> Result<Vec<RawProduct>, LeafError> {
    match leaf {
        Value::String(text) => decode_records(text),
        other => records_from_array(other),
    }
}

/// A named extraction strategy.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<Vec<RawProduct>>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Strategies tried by the formatter, in order.
pub const FORMATTER_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "results_text_data_text",
        extract: results_text_data_text,
    },
    Strategy {
        name: "outputs_data_first",
        extract: outputs_data_first,
    },
    Strategy {
        name: "shallow_scan",
        extract: shallow_scan,
    },
];

/// Try `strategies` in order, returning the first hit and its name.
pub fn extract_with(strategies: &[Strategy], envelope: &Value) -> Option<(&'static str, Vec<RawProduct>)> {
    for strategy in strategies {
        match (strategy.extract)(envelope) {
            Some(records) => {
                debug!("Strategy '{}' extracted {} record(s)", strategy.name, records.len());
                return Some((strategy.name, records));
            }
            None => debug!("Strategy '{}' did not match", strategy.name),
        }
    }
    None
}

/// `outputs[0].outputs[0].results.text.data.text` holding a JSON-encoded list.
pub fn results_text_data_text(envelope: &Value) -> Option<Vec<RawProduct>> {
    let leaf = walk(envelope, ENVELOPE_TEXT).ok()?;
    records_from_leaf(leaf).ok()
}

/// `outputs[0].outputs[0].data[0]` holding a JSON string, a list, or a
/// mapping with a `data` or `products` list.
pub fn outputs_data_first(envelope: &Value) -> Option<Vec<RawProduct>> {
    let component = walk(envelope, COMPONENT_OUTPUT).ok()?;
    let first = walk(component, &[Segment::Key("data"), Segment::Index(0)]).ok()?;
    match first {
        Value::String(text) => {
            let decoded: Value = serde_json::from_str(text).ok()?;
            records_from_container(&decoded)
        }
        other => records_from_container(other),
    }
}

fn records_from_container(value: &Value) -> Option<Vec<RawProduct>> {
    match value {
        Value::Array(_) => records_from_array(value).ok(),
        Value::Object(map) => ["data", "products"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| records_from_array(inner).ok()),
        _ => None,
    }
}

/// First top-level value (or value one level down) that is a non-empty list of mappings.
pub fn shallow_scan(envelope: &Value) -> Option<Vec<RawProduct>> {
    let map = envelope.as_object()?;
    for (key, value) in map {
        if let Some(records) = non_empty_records(value) {
            debug!("Found product list under '{}'", key);
            return Some(records);
        }
        if let Value::Object(inner) = value {
            for (subkey, subvalue) in inner {
                if let Some(records) = non_empty_records(subvalue) {
                    debug!("Found product list under '{}.{}'", key, subkey);
                    return Some(records);
                }
            }
        }
    }
    None
}

fn non_empty_records(value: &Value) -> Option<Vec<RawProduct>> {
    match value {
        Value::Array(items) if !items.is_empty() => records_from_array(value).ok(),
        _ => None,
    }
}

/// Unwrap a record that is itself an undecoded component output.
///
/// Returns the `results.text.data.text` value when `record` carries it.
pub fn unwrap_component_text(record: &RawProduct) -> Option<Value> {
    let mut current = record.get("results")?;
    for segment in &RESULTS_TEXT[1..] {
        if let Segment::Key(key) = segment {
            current = current.as_object()?.get(*key)?;
        }
    }
    Some(current.clone())
}

/// First `limit` characters of `text`, for log lines.
pub fn preview(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_with_text(text: &str) -> Value {
        json!({"outputs": [{"outputs": [{"results": {"text": {"data": {"text": text}}}}]}]})
    }

    #[test]
    fn test_walk_reports_missing_key() {
        let value = json!({"outputs": [{"outputs": []}]});
        let miss = walk(&value, ENVELOPE_TEXT).unwrap_err();
        assert_eq!(miss.path, "outputs[0].outputs[0]");
        assert_eq!(miss.message, "index 0 not found");

        let miss = walk(&json!({"different_key": "value"}), ENVELOPE_TEXT).unwrap_err();
        assert_eq!(miss.path, "outputs");
    }

    #[test]
    fn test_results_text_strategy() {
        let envelope = envelope_with_text(r#"[{"titulo":"P1","preco":10.0}]"#);
        let records = results_text_data_text(&envelope).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["titulo"], "P1");

        assert_eq!(results_text_data_text(&envelope_with_text("[]")), Some(vec![]));
        assert_eq!(results_text_data_text(&envelope_with_text("not json")), None);
        assert_eq!(results_text_data_text(&envelope_with_text(r#"{"a":1}"#)), None);
    }

    #[test]
    fn test_outputs_data_first_variants() {
        let as_string = json!({"outputs": [{"outputs": [{"data": ["[{\"nome\":\"A\"}]"]}]}]});
        assert_eq!(outputs_data_first(&as_string).unwrap()[0]["nome"], "A");

        let as_list = json!({"outputs": [{"outputs": [{"data": [[{"nome": "B"}]]}]}]});
        assert_eq!(outputs_data_first(&as_list).unwrap()[0]["nome"], "B");

        let as_products = json!({"outputs": [{"outputs": [{"data": [{"products": [{"nome": "C"}]}]}]}]});
        assert_eq!(outputs_data_first(&as_products).unwrap()[0]["nome"], "C");

        let as_data_string = json!({"outputs": [{"outputs": [{"data": ["{\"data\":[{\"nome\":\"D\"}]}"]}]}]});
        assert_eq!(outputs_data_first(&as_data_string).unwrap()[0]["nome"], "D");

        let empty = json!({"outputs": [{"outputs": [{"data": []}]}]});
        assert_eq!(outputs_data_first(&empty), None);
    }

    #[test]
    fn test_shallow_scan() {
        let top = json!({"status": "ok", "items": [{"nome": "A"}]});
        assert_eq!(shallow_scan(&top).unwrap()[0]["nome"], "A");

        let nested = json!({"meta": {"count": 1, "rows": [{"nome": "B"}]}});
        assert_eq!(shallow_scan(&nested).unwrap()[0]["nome"], "B");

        let skips_empty = json!({"a": [], "b": [1, 2], "c": [{"nome": "C"}]});
        assert_eq!(shallow_scan(&skips_empty).unwrap()[0]["nome"], "C");

        assert_eq!(shallow_scan(&json!({"different_key": "value"})), None);
        assert_eq!(shallow_scan(&json!([{"nome": "top-level array"}])), None);
    }

    #[test]
    fn test_strategy_order() {
        // Both the first and third strategies would match; the first wins.
        let mut envelope = envelope_with_text(r#"[{"nome":"first"}]"#);
        envelope["extra"] = json!([{"nome": "third"}]);
        let (name, records) = extract_with(FORMATTER_STRATEGIES, &envelope).unwrap();
        assert_eq!(name, "results_text_data_text");
        assert_eq!(records[0]["nome"], "first");

        let (name, _) = extract_with(FORMATTER_STRATEGIES, &json!({"extra": [{"nome": "x"}]})).unwrap();
        assert_eq!(name, "shallow_scan");

        assert!(extract_with(FORMATTER_STRATEGIES, &json!({"different_key": "value"})).is_none());
    }

    #[test]
    fn test_records_from_leaf_rejects_non_mappings() {
        assert!(matches!(records_from_leaf(&json!([1, 2])), Err(LeafError::Shape(_))));
        assert!(matches!(records_from_leaf(&json!("[1")), Err(LeafError::Parse(_))));
        assert!(matches!(records_from_leaf(&json!(42)), Err(LeafError::Shape(_))));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("ação", 2), "aç");
        assert_eq!(preview("abc", 10), "abc");
    }

    #[test]
    fn test_unwrap_component_text() {
        let record = json!({"results": {"text": {"data": {"text": "[]"}}}});
        let record = record.as_object().unwrap();
        assert_eq!(unwrap_component_text(record), Some(json!("[]")));

        let plain = json!({"titulo": "P1"});
        assert_eq!(unwrap_component_text(plain.as_object().unwrap()), None);
    }
}
