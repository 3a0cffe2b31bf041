//! Schema-guided scalar coercion.
//!
//! YAML authors write `port: "5432"` or `useSsl: "yes"`; before validation
//! scalars are converted to the type the schema declares at that position.
//! Values that cannot be converted are left alone for the validator to
//! report.

use serde_json::{Map, Number, Value};

/// Coerce `value` in place against `schema`. `root` resolves `$ref`s.
pub fn coerce(value: &mut Value, schema: &Value, root: &Value) {
    let Some(schema) = resolve(schema, root) else {
        return;
    };
    if value.is_null() {
        return;
    }

    for keyword in ["anyOf", "oneOf"] {
        if let Some(branches) = schema.get(keyword).and_then(Value::as_array) {
            let mut concrete = branches.iter().filter(|b| !is_null_schema(b, root));
            if let (Some(only), None) = (concrete.next(), concrete.next()) {
                coerce(value, only, root);
            }
            return;
        }
    }

    let types = declared_types(schema);
    match value {
        Value::Object(map) => coerce_object(map, schema, root),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    coerce(item, item_schema, root);
                }
            }
        }
        Value::String(s) => {
            if let Some(coerced) = from_string(s, &types) {
                *value = coerced;
            }
        }
        Value::Number(n) => {
            if types == ["string"] {
                *value = Value::String(n.to_string());
            }
        }
        Value::Bool(b) => {
            if types == ["string"] {
                *value = Value::String(b.to_string());
            }
        }
        Value::Null => {}
    }
}

fn coerce_object(map: &mut Map<String, Value>, schema: &Value, root: &Value) {
    let properties = schema.get("properties").and_then(Value::as_object);
    let additional = schema.get("additionalProperties").filter(|v| v.is_object());
    for (key, child) in map.iter_mut() {
        if let Some(child_schema) = properties.and_then(|p| p.get(key)).or(additional) {
            coerce(child, child_schema, root);
        }
    }
}

/// Follow a local `$ref` (`#/$defs/Name`).
fn resolve<'a>(schema: &'a Value, root: &'a Value) -> Option<&'a Value> {
    match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) => {
            let pointer = reference.strip_prefix('#')?;
            resolve(root.pointer(pointer)?, root)
        }
        None => Some(schema),
    }
}

fn is_null_schema(schema: &Value, root: &Value) -> bool {
    resolve(schema, root)
        .and_then(|s| s.get("type"))
        .is_some_and(|t| t == "null")
}

/// Non-null types a schema allows, in declaration order.
fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .filter(|t| *t != "null")
            .collect(),
        _ => vec![],
    }
}

fn from_string(s: &str, types: &[&str]) -> Option<Value> {
    if types.is_empty() || types.contains(&"string") {
        return None;
    }
    let trimmed = s.trim();
    for ty in types {
        let coerced = match *ty {
            "integer" => parse_integer(trimmed),
            "number" => parse_number(trimmed),
            "boolean" => parse_bool(trimmed).map(Value::Bool),
            _ => None,
        };
        if coerced.is_some() {
            return coerced;
        }
    }
    None
}

fn parse_integer(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<u64>().ok().map(|u| Value::Number(u.into()))
}

fn parse_number(s: &str) -> Option<Value> {
    if let Some(int) = parse_integer(s) {
        return Some(int);
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
