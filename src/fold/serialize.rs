//! Value serializer: converts a runtime value produced by folding back into
//! an equivalent literal expression.
//!
//! Only JSON-shaped values are representable. Callables, `undefined`, and
//! non-finite numbers never have a literal spelling, so meeting one here is
//! a hard error rather than a best-effort guess.

use crate::diagnostics::Diagnostic;
use crate::diagnostics::codes::UNSERIALIZABLE_VALUE;
use crate::diagnostics::position::Span;
use crate::runtime::value::Value;
use crate::syntax::expression::{Expression, Property};

pub fn serialize_value(
    value: &Value,
    span: Span,
    file: &str,
) -> Result<Expression, Box<Diagnostic>> {
    match value {
        Value::Null => Ok(Expression::Null { span }),
        Value::Boolean(boolean) => Ok(Expression::Boolean {
            value: *boolean,
            span,
        }),
        Value::Number(number) if number.is_finite() => Ok(Expression::Number {
            value: *number,
            span,
        }),
        Value::String(text) => Ok(Expression::String {
            value: text.clone(),
            span,
        }),
        Value::Array(elements) => {
            let elements = elements.borrow();
            let mut serialized = Vec::with_capacity(elements.len());
            for element in elements.iter() {
                serialized.push(serialize_value(element, span, file)?);
            }
            Ok(Expression::Array {
                elements: serialized,
                span,
            })
        }
        Value::Object(map) => {
            let map = map.borrow();
            let mut properties = Vec::with_capacity(map.len());
            for (key, value) in map.iter() {
                properties.push(Property {
                    key: key.to_string(),
                    value: serialize_value(value, span, file)?,
                    span,
                });
            }
            Ok(Expression::Object { properties, span })
        }
        other => Err(Box::new(Diagnostic::make_error(
            &UNSERIALIZABLE_VALUE,
            &[describe(other)],
            file,
            span,
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "non-finite number",
        other => other.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::ObjectMap;
    use crate::syntax::formatter::format_expression;

    fn serialize(value: &Value) -> String {
        format_expression(&serialize_value(value, Span::default(), "test.js").expect("serialize"))
    }

    #[test]
    fn test_primitives() {
        assert_eq!(serialize(&Value::Null), "null");
        assert_eq!(serialize(&Value::Boolean(true)), "true");
        assert_eq!(serialize(&Value::Number(2.5)), "2.5");
        assert_eq!(serialize(&Value::Number(-3.0)), "-3");
        assert_eq!(serialize(&Value::String("a\"b".to_string())), "\"a\\\"b\"");
    }

    #[test]
    fn test_nested_structures_in_enumeration_order() {
        let mut inner = ObjectMap::new();
        inner.insert("b".to_string(), Value::Number(2.0));
        inner.insert("a".to_string(), Value::Number(1.0));
        let value = Value::array(vec![
            Value::object(inner),
            Value::array(vec![Value::Null]),
        ]);
        assert_eq!(serialize(&value), "[{ b: 2, a: 1 }, [null]]");
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(serialize(&Value::object(ObjectMap::new())), "{}");
    }

    #[test]
    fn test_function_is_rejected() {
        let native = Value::Native(crate::runtime::value::NativeFunction::new("f", |_| {
            Ok(Value::Null)
        }));
        let err = serialize_value(&native, Span::default(), "test.js").unwrap_err();
        assert_eq!(err.code(), Some("E018"));
    }

    #[test]
    fn test_undefined_and_nan_are_rejected() {
        assert_eq!(
            serialize_value(&Value::Undefined, Span::default(), "test.js")
                .unwrap_err()
                .code(),
            Some("E018")
        );
        assert_eq!(
            serialize_value(&Value::Number(f64::NAN), Span::default(), "test.js")
                .unwrap_err()
                .code(),
            Some("E018")
        );
    }
}
