use serde_json::{Map, Value};

/// Priority list of key output fields
const PRIORITY_KEYS: [&str; 7] = [
    "tcea",
    "trea",
    "irr",
    "npv",
    "installment",
    "macaulay_duration",
    "effective_annual_rate",
];

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority, first
/// on the result itself and then one level down (summary, duration, ...),
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    // Try to extract the "result" envelope
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if let Some(val) = find_priority(map) {
            println!("{}", format_minimal(val));
            return;
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    // Not an object, just print directly
    println!("{}", format_minimal(result_obj));
}

fn find_priority(map: &Map<String, Value>) -> Option<&Value> {
    let nested: Vec<&Map<String, Value>> = map.values().filter_map(Value::as_object).collect();
    PRIORITY_KEYS.iter().find_map(|key| {
        std::iter::once(map)
            .chain(nested.iter().copied())
            .find_map(|m| m.get(*key).filter(|v| !v.is_null()))
    })
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pick(value: Value) -> Option<Value> {
        find_priority(value.as_object().unwrap()).cloned()
    }

    #[test]
    fn test_tcea_preferred_over_npv() {
        let summary = json!({ "npv": "12.5", "irr": "0.08", "tcea": "0.0816" });
        assert_eq!(pick(summary), Some(json!("0.0816")));
    }

    #[test]
    fn test_null_skipped() {
        let investor = json!({ "npv": "-3", "irr": null, "trea": null });
        assert_eq!(pick(investor), Some(json!("-3")));
    }

    #[test]
    fn test_analysis_reports_tcea_before_installment() {
        let analysis = json!({
            "schedule": { "installment": "25045.65", "periods": [] },
            "summary": { "npv": "0", "tcea": "0.08" },
        });
        assert_eq!(pick(analysis), Some(json!("0.08")));
    }

    #[test]
    fn test_nested_duration_found() {
        let curve = json!({ "duration": { "price": "1000", "macaulay_duration": "2.86" }, "points": [] });
        assert_eq!(pick(curve), Some(json!("2.86")));
    }
}
