//! Type-safe schema generation for structured outputs.
//!
//! Schemas are generated from Rust types with `schemars` and rewritten into
//! the strict subset both providers accept:
//!
//! 1. `additionalProperties: false` on every object
//! 2. every property listed in `required`
//! 3. no `$ref`, everything inlined
//! 4. no `format` annotations (`double`, `uint32`, ...)
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     score: f64,
//!     reasons: Vec<String>,
//! }
//!
//! let spec = Verdict::schema_spec();
//! ```

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::SchemaSpec;

/// Types usable as a structured response.
///
/// Implemented for anything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict JSON schema for this type.
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        fix_object_schemas(&mut value);
        inline_refs(&mut value);
        strip_formats(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Schema name for this type.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }

    /// Name and schema bundled for a provider request.
    fn schema_spec() -> SchemaSpec {
        SchemaSpec::new(sanitize_name(&Self::type_name()), Self::strict_schema())
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Providers only accept `[a-zA-Z0-9_-]` in schema and tool names.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn fix_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all_keys));
                }
            }

            for (_, v) in map.iter_mut() {
                fix_object_schemas(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                fix_object_schemas(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

fn strip_formats(value: &mut Value) {
    match value {
        Value::Object(map) => {
            // Leave a property literally named "format" alone.
            if map.get("type").is_some() {
                map.remove("format");
            }
            for (_, v) in map.iter_mut() {
                strip_formats(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                strip_formats(item);
            }
        }
        _ => {}
    }
}
