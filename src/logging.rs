//! Tracing setup and log-safe payload summaries.

use serde_json::{Value, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HEAD_ITEMS: usize = 5;
const HEAD_KEYS: usize = 10;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "udfkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Compact form of a payload for logging.
///
/// Scalars pass through; arrays become their length plus the first few items;
/// objects become their first few keys, recursively summarized one level down.
pub fn summarize(value: &Value) -> Value {
    match value {
        Value::Array(items) => json!({
            "type": "list",
            "len": items.len(),
            "head": items.iter().take(HEAD_ITEMS).cloned().collect::<Vec<_>>(),
        }),
        Value::Object(map) => {
            let summary: serde_json::Map<String, Value> = map
                .iter()
                .take(HEAD_KEYS)
                .map(|(key, value)| (key.clone(), summarize_shallow(value)))
                .collect();
            Value::Object(summary)
        }
        scalar => scalar.clone(),
    }
}

fn summarize_shallow(value: &Value) -> Value {
    match value {
        Value::Array(items) => json!({
            "type": "list",
            "len": items.len(),
            "head": items.iter().take(HEAD_ITEMS).cloned().collect::<Vec<_>>(),
        }),
        Value::Object(map) => json!({
            "type": "dict",
            "keys": map.keys().take(HEAD_KEYS).cloned().collect::<Vec<_>>(),
        }),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_lists_are_truncated() {
        let summary = summarize(&json!({"cashflows": [1, 2, 3, 4, 5, 6, 7], "rate": 0.05}));
        assert_eq!(summary["rate"], 0.05);
        assert_eq!(summary["cashflows"]["len"], 7);
        assert_eq!(summary["cashflows"]["head"], json!([1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_nested_objects_only_show_keys() {
        let summary = summarize(&json!({"inner": {"a": 1, "b": {"deep": true}}}));
        assert_eq!(summary["inner"], json!({"type": "dict", "keys": ["a", "b"]}));
    }
}
