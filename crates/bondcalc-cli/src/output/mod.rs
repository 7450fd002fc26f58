pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Keys that hold one record per row: schedule periods and curve samples.
const ROW_KEYS: [&str; 2] = ["periods", "points"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The row-shaped series carried directly by `result`, if any.
fn row_series(result: &Value) -> Option<(&'static str, &[Value])> {
    ROW_KEYS
        .iter()
        .find_map(|k| result.get(*k).and_then(Value::as_array).map(|a| (*k, a.as_slice())))
}
