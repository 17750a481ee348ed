//! Prompt graph access helpers
//!
//! A prompt graph is the executor's declarative workflow: a JSON object
//! mapping node id → node object. Nodes that matter here look like
//! `{"class_type": "KSampler", "inputs": {"width": 1024, ...}}`, but any
//! shape is tolerated; fields with the wrong type are simply skipped.
//!
//! Node order is the order the client wrote them (serde_json is built with
//! `preserve_order`), so "first node with X" is well defined.

use serde_json::{Map, Value};

/// Node id → node object
pub type PromptGraph = Map<String, Value>;

/// Per-request options passed alongside a graph (`extra_data`)
pub type ExtraData = Map<String, Value>;

/// Parameter mapping of a node, if it has one
pub fn node_inputs(node: &Value) -> Option<&Map<String, Value>> {
    node.get("inputs").and_then(Value::as_object)
}

/// Mutable parameter mapping of a node, if it has one
pub fn node_inputs_mut(node: &mut Value) -> Option<&mut Map<String, Value>> {
    node.get_mut("inputs").and_then(Value::as_object_mut)
}

/// Lower-cased `class_type` of a node; empty when absent
///
/// Non-string class types are rendered with their JSON text so a keyword
/// can still match them.
pub fn class_type_lower(node: &Value) -> String {
    match node.get("class_type") {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Integer-valued input (floats, strings and bools are rejected)
pub fn int_input(inputs: &Map<String, Value>, key: &str) -> Option<i64> {
    inputs.get(key).and_then(Value::as_i64)
}

/// Numeric input accepting both integers and floats
pub fn number_input(inputs: &Map<String, Value>, key: &str) -> Option<f64> {
    inputs.get(key).filter(|v| v.is_number()).and_then(Value::as_f64)
}

/// Whether any node's lower-cased class type contains one of `keywords`
pub fn contains_keyword_node(graph: &PromptGraph, keywords: &[&str]) -> bool {
    graph.values().any(|node| {
        let class_type = class_type_lower(node);
        keywords.iter().any(|keyword| class_type.contains(keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph(value: Value) -> PromptGraph {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_node_inputs_requires_object() {
        assert!(node_inputs(&json!({"inputs": {"a": 1}})).is_some());
        assert!(node_inputs(&json!({"inputs": [1, 2]})).is_none());
        assert!(node_inputs(&json!({})).is_none());
        assert!(node_inputs(&json!("not a node")).is_none());
    }

    #[test]
    fn test_int_input_rejects_non_integers() {
        let inputs = graph(json!({"a": 3, "b": 3.5, "c": "3", "d": true}));
        assert_eq!(int_input(&inputs, "a"), Some(3));
        assert_eq!(int_input(&inputs, "b"), None);
        assert_eq!(int_input(&inputs, "c"), None);
        assert_eq!(int_input(&inputs, "d"), None);
        assert_eq!(int_input(&inputs, "missing"), None);
    }

    #[test]
    fn test_number_input_accepts_floats() {
        let inputs = graph(json!({"a": 3, "b": 2.5, "c": "2.5"}));
        assert_eq!(number_input(&inputs, "a"), Some(3.0));
        assert_eq!(number_input(&inputs, "b"), Some(2.5));
        assert_eq!(number_input(&inputs, "c"), None);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let g = graph(json!({
            "1": {"class_type": "VHS_LoadVideo"},
            "2": {"class_type": "CheckpointLoader"}
        }));
        assert!(contains_keyword_node(&g, &["video", "frame"]));
        assert!(!contains_keyword_node(&g, &["audio"]));
    }

    #[test]
    fn test_class_type_missing_or_odd() {
        assert_eq!(class_type_lower(&json!({})), "");
        assert_eq!(class_type_lower(&json!({"class_type": null})), "");
        assert_eq!(class_type_lower(&json!({"class_type": 7})), "7");
    }

    #[test]
    fn test_graph_preserves_insertion_order() {
        let g: PromptGraph = serde_json::from_str(r#"{"9": {}, "1": {}, "5": {}}"#).unwrap();
        let keys: Vec<&str> = g.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["9", "1", "5"]);
    }
}
