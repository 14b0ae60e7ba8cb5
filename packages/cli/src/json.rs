//! Rendering elements as JSON.

use base64::Engine;
use iondg_core::{Element, Value};
use serde_json::Value as JsonValue;

/// Convert an element to JSON. Annotations are dropped; symbols become
/// strings; clobs and blobs become base64 strings; lists and sexps become
/// arrays.
pub fn element_to_json(element: &Element) -> JsonValue {
    match &element.value {
        Value::Null(_) => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Symbol(s) | Value::String(s) => JsonValue::String(s.clone()),
        Value::Clob(b) | Value::Blob(b) => {
            JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::List(items) | Value::Sexp(items) => {
            JsonValue::Array(items.iter().map(element_to_json).collect())
        }
        Value::Struct(fields) => JsonValue::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), element_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iondg_core::IonType;
    use serde_json::json;

    #[test]
    fn scalars() {
        assert_eq!(element_to_json(&Element::null()), JsonValue::Null);
        assert_eq!(
            element_to_json(&Element::typed_null(IonType::Int)),
            JsonValue::Null
        );
        assert_eq!(element_to_json(&Element::from(true)), json!(true));
        assert_eq!(element_to_json(&Element::from(-3)), json!(-3));
        assert_eq!(element_to_json(&Element::from(0.5)), json!(0.5));
        assert_eq!(element_to_json(&Element::from(f64::NAN)), JsonValue::Null);
        assert_eq!(element_to_json(&Element::symbol("s")), json!("s"));
    }

    #[test]
    fn bytes_are_base64() {
        assert_eq!(
            element_to_json(&Element::from(b"hi".to_vec())),
            json!("aGk=")
        );
    }

    #[test]
    fn containers() {
        let element = Element::structure([
            ("list", Element::list([Element::from(1), Element::string("x")])),
            ("sexp", Element::sexp([Element::symbol("op")]).with_annotation("a")),
        ]);
        assert_eq!(
            element_to_json(&element),
            json!({"list": [1, "x"], "sexp": ["op"]})
        );
    }
}
