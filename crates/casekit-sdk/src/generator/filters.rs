//! Custom Tera filters for case conversion in artifact templates.

use std::collections::HashMap;

use tera::{Result, Value};

/// Convert a string value to snake_case.
pub(crate) fn snake_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    use heck::ToSnakeCase;
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("snake_case filter expects a string"))?;
    Ok(Value::String(s.to_snake_case()))
}

/// Convert a string value to PascalCase.
pub(crate) fn pascal_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    use heck::ToUpperCamelCase;
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("pascal_case filter expects a string"))?;
    Ok(Value::String(s.to_upper_camel_case()))
}
