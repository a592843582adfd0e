//! JavaScript `String(value)` coercion for untyped input.

use serde_json::{Number, Value};

/// `None` plays the part of `undefined`.
pub fn to_js_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(value) => value_to_string(value),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_to_string(number),
        Value::String(text) => text.clone(),
        // Array.prototype.join renders null holes as empty strings
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_to_string(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    if let Some(uint) = number.as_u64() {
        return uint.to_string();
    }
    match number.as_f64() {
        Some(float) => float_to_string(float),
        None => number.to_string(),
    }
}

fn float_to_string(float: f64) -> String {
    if float == 0.0 {
        return "0".to_string();
    }
    let magnitude = float.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", float);
    }

    // Exponent form: JS always signs the exponent.
    let formatted = format!("{:e}", float);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_coercion() {
        assert_eq!(to_js_string(None), "undefined");
        assert_eq!(to_js_string(Some(&json!(null))), "null");
        assert_eq!(to_js_string(Some(&json!(true))), "true");
        assert_eq!(to_js_string(Some(&json!(1))), "1");
        assert_eq!(to_js_string(Some(&json!("hello"))), "hello");
        assert_eq!(to_js_string(Some(&json!(""))), "");
    }

    #[test]
    fn test_object_and_array_coercion() {
        assert_eq!(to_js_string(Some(&json!({}))), "[object Object]");
        assert_eq!(to_js_string(Some(&json!({ "a": 1 }))), "[object Object]");
        assert_eq!(to_js_string(Some(&json!([]))), "");
        assert_eq!(to_js_string(Some(&json!([1, "b", null, [2, 3]]))), "1,b,,2,3");
        assert_eq!(to_js_string(Some(&json!([{}]))), "[object Object]");
    }

    #[test]
    fn test_float_formatting_matches_js() {
        assert_eq!(to_js_string(Some(&json!(1.5))), "1.5");
        assert_eq!(to_js_string(Some(&json!(-0.25))), "-0.25");
        assert_eq!(to_js_string(Some(&json!(2.0))), "2");
        assert_eq!(to_js_string(Some(&json!(-0.0))), "0");
        assert_eq!(to_js_string(Some(&json!(1e21))), "1e+21");
        assert_eq!(to_js_string(Some(&json!(1.5e-7))), "1.5e-7");
    }
}
