use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types usable as structured LLM output.
///
/// Blanket-implemented for anything that is `JsonSchema + DeserializeOwned`.
/// `response_schema` emits the strict-mode dialect the chat APIs accept:
/// every object carries `additionalProperties: false`, every property is
/// listed under `required` (nullable ones included), and `$ref`s are inlined
/// so the schema is self-contained.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn response_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = value
            .as_object()
            .and_then(|m| m.get("definitions"))
            .cloned()
            .unwrap_or(Value::Null);

        strictify(&mut value, &definitions);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Recursively rewrite a schemars schema into strict mode.
fn strictify(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            // Resolve local $refs by substituting the definition body.
            if let Some(Value::String(path)) = map.get("$ref") {
                if let Some(name) = path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        strictify(value, definitions);
                        return;
                    }
                }
            }

            // schemars wraps referenced types in single-element allOf.
            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if all_of.len() == 1 {
                    *value = all_of[0].clone();
                    strictify(value, definitions);
                    return;
                }
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, child) in map.iter_mut() {
                strictify(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strictify(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Verdict {
        label: String,
        explanation: String,
        sources: Vec<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Nested {
        verdict: Verdict,
        confidence: Option<f32>,
    }

    #[test]
    fn objects_are_closed_and_fully_required() {
        let schema = Verdict::response_schema();
        let obj = schema.as_object().unwrap();

        assert_eq!(obj.get("additionalProperties"), Some(&Value::Bool(false)));

        let required: Vec<&str> = obj["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"label"));
        assert!(required.contains(&"explanation"));
        assert!(required.contains(&"sources"));
    }

    #[test]
    fn optional_fields_are_still_required_keys() {
        let schema = Nested::response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"confidence"));
    }

    #[test]
    fn refs_are_inlined() {
        let schema = Nested::response_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let verdict = &schema["properties"]["verdict"];
        assert!(verdict.get("$ref").is_none());
        assert_eq!(verdict["type"], Value::String("object".to_string()));
    }
}
