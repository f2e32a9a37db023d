// dashboardtool/src/utils/rewrite.rs
use serde_json::{Map, Value};

/// Field holding a dataset's physical data-source reference.
pub const DATA_SOURCE_ARN: &str = "DataSourceArn";

/// Returns a copy of `doc` where every `field` found in a mapping, at any
/// mapping depth, carries `replacement`.
///
/// Only mappings are descended into. A field sitting inside an array (for
/// instance a list of table objects) is left as it is.
pub fn replace_field(doc: &Value, field: &str, replacement: &Value) -> Value {
    match doc {
        Value::Object(map) => Value::Object(replace_in_map(map, field, replacement)),
        other => other.clone(),
    }
}

fn replace_in_map(map: &Map<String, Value>, field: &str, replacement: &Value) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let rewritten = if key == field {
                replacement.clone()
            } else {
                match value {
                    Value::Object(inner) => Value::Object(replace_in_map(inner, field, replacement)),
                    other => other.clone(),
                }
            };
            (key.clone(), rewritten)
        })
        .collect()
}

/// Points every data-source reference in a dataset document at `arn`.
/// An empty `arn` blanks the references.
pub fn rebind_data_source(doc: &Value, arn: &str) -> Value {
    replace_field(doc, DATA_SOURCE_ARN, &Value::String(arn.to_string()))
}
