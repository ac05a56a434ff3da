//! One-level-deep, lossy encoding of runtime values.

use indexmap::IndexMap;

use crate::value::{ObjectRef, Properties, PropertyError, Value};
use crate::wire::{EncodedValue, Marker};

/// How many characters of a nested string survive encoding.
pub const STRING_PREVIEW_LEN: usize = 250;

/// Encode a runtime value into its bounded wire form.
///
/// Total and infallible: every input maps to some [`EncodedValue`], and a
/// property that cannot be read becomes an error marker for that property
/// alone. Object-like members are stubbed rather than recursed into, so
/// encoding depth never exceeds one level and cycles need no detection.
#[must_use]
pub fn encode(value: &Value) -> EncodedValue {
    match value {
        Value::Object(obj) => encode_composite(obj),
        other => encode_leaf(other),
    }
}

/// Encode a value appearing one level deep inside a composite.
fn encode_member(value: &Value) -> EncodedValue {
    match value {
        Value::String(s) => match truncate(s) {
            Some(intro) => EncodedValue::Marker(Marker::TruncatedString { intro }),
            None => EncodedValue::String(s.clone()),
        },
        Value::Object(obj) => EncodedValue::stub(obj.display_name()),
        other => encode_leaf(other),
    }
}

/// Encode the variants whose form is the same at any depth.
fn encode_leaf(value: &Value) -> EncodedValue {
    match value {
        Value::Undefined => EncodedValue::Marker(Marker::Undefined),
        Value::Null => EncodedValue::Null,
        Value::Bool(b) => EncodedValue::Bool(*b),
        Value::Number(n) => EncodedValue::Number(*n),
        // Top-level strings travel whole; nested ones go through
        // `encode_member` and never reach here oversized.
        Value::String(s) => EncodedValue::String(s.clone()),
        Value::Function { source } => EncodedValue::Marker(Marker::Function {
            name: source.clone(),
        }),
        Value::Error { message } => EncodedValue::error(message.clone()),
        Value::Object(obj) => EncodedValue::stub(obj.display_name()),
    }
}

fn encode_composite(obj: &ObjectRef) -> EncodedValue {
    match obj.properties() {
        Properties::Items(items) => {
            EncodedValue::Array(items.iter().map(encode_property).collect())
        }
        Properties::Fields(fields) => {
            let mut map = IndexMap::with_capacity(fields.len());
            for (key, property) in &fields {
                map.insert(key.clone(), encode_property(property));
            }
            EncodedValue::Object(map)
        }
    }
}

fn encode_property(property: &Result<Value, PropertyError>) -> EncodedValue {
    match property {
        Ok(value) => encode_member(value),
        Err(e) => EncodedValue::error(e.message.clone()),
    }
}

/// Returns the preview prefix if `s` exceeds the limit, counted in chars so
/// multi-byte text never splits mid-character.
fn truncate(s: &str) -> Option<String> {
    // nth() instead of count() so huge strings are not walked twice.
    s.char_indices().nth(STRING_PREVIEW_LEN)?;
    Some(s.chars().take(STRING_PREVIEW_LEN).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::value::{ArrayValue, ObjectValue, ObjectView};

    use super::*;

    #[test]
    fn primitives_round_trip_unchanged() {
        assert_eq!(encode(&Value::Number(42.0)), EncodedValue::Number(42.0));
        assert_eq!(
            encode(&Value::String("x".into())),
            EncodedValue::String("x".into())
        );
        assert_eq!(encode(&Value::Bool(true)), EncodedValue::Bool(true));
        assert_eq!(encode(&Value::Null), EncodedValue::Null);
        assert_eq!(
            encode(&Value::Undefined),
            EncodedValue::Marker(Marker::Undefined)
        );
    }

    #[test]
    fn functions_and_errors_become_markers() {
        assert_eq!(
            encode(&Value::Function {
                source: "function () {}".into()
            }),
            EncodedValue::Marker(Marker::Function {
                name: "function () {}".into()
            })
        );
        assert_eq!(encode(&Value::error("boom")), EncodedValue::error("boom"));
    }

    #[test]
    fn nested_objects_are_stubbed_one_level_deep() {
        let inner = ObjectValue::named("Inner").field("b", 1);
        let outer = ObjectValue::new().field("a", inner);

        let encoded = encode(&outer.into());
        let EncodedValue::Object(map) = encoded else {
            panic!("expected composite");
        };
        assert_eq!(map["a"], EncodedValue::stub("Inner"));
    }

    #[test]
    fn arrays_encode_as_sequences() {
        let arr = ArrayValue::new(vec![1.into(), "x".into(), ObjectValue::named("O").into()]);
        let encoded = encode(&arr.into());
        assert_eq!(
            encoded,
            EncodedValue::Array(vec![
                EncodedValue::Number(1.0),
                EncodedValue::String("x".into()),
                EncodedValue::stub("O"),
            ])
        );
    }

    #[test]
    fn long_strings_truncate_only_when_nested() {
        let long = "a".repeat(300);

        // Top level: passed through whole.
        assert_eq!(
            encode(&Value::String(long.clone())),
            EncodedValue::String(long.clone())
        );

        // Nested: cut to exactly the first 250 characters.
        let obj = ObjectValue::new().field("s", long);
        let EncodedValue::Object(map) = encode(&obj.into()) else {
            panic!("expected composite");
        };
        assert_eq!(
            map["s"],
            EncodedValue::Marker(Marker::TruncatedString {
                intro: "a".repeat(250)
            })
        );
    }

    #[test]
    fn boundary_string_is_not_truncated() {
        let exact = "b".repeat(250);
        let obj = ObjectValue::new().field("s", exact.clone());
        let EncodedValue::Object(map) = encode(&obj.into()) else {
            panic!("expected composite");
        };
        assert_eq!(map["s"], EncodedValue::String(exact));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let long: String = "é".repeat(251);
        let obj = ObjectValue::new().field("s", long);
        let EncodedValue::Object(map) = encode(&obj.into()) else {
            panic!("expected composite");
        };
        assert_eq!(
            map["s"],
            EncodedValue::Marker(Marker::TruncatedString {
                intro: "é".repeat(250)
            })
        );
    }

    #[test]
    fn unreadable_property_does_not_poison_siblings() {
        struct Flaky;

        impl ObjectView for Flaky {
            fn display_name(&self) -> String {
                "Flaky".to_owned()
            }

            fn properties(&self) -> Properties {
                Properties::Fields(vec![
                    ("good".to_owned(), Ok(Value::Number(1.0))),
                    (
                        "bad".to_owned(),
                        Err(PropertyError::new("permission denied")),
                    ),
                    ("after".to_owned(), Ok(Value::Number(2.0))),
                ])
            }
        }

        let EncodedValue::Object(map) = encode(&Value::Object(Arc::new(Flaky))) else {
            panic!("expected composite");
        };
        assert_eq!(map["good"], EncodedValue::Number(1.0));
        assert_eq!(map["bad"], EncodedValue::error("permission denied"));
        assert_eq!(map["after"], EncodedValue::Number(2.0));
    }

    #[test]
    fn cyclic_values_encode_without_recursing() {
        struct Cyclic {
            this: std::sync::Mutex<Option<ObjectRef>>,
        }

        impl ObjectView for Cyclic {
            fn display_name(&self) -> String {
                "Cyclic".to_owned()
            }

            fn properties(&self) -> Properties {
                let this = self.this.lock().unwrap().clone();
                Properties::Fields(vec![(
                    "me".to_owned(),
                    Ok(this.map_or(Value::Undefined, Value::Object)),
                )])
            }
        }

        let cyclic = Arc::new(Cyclic {
            this: std::sync::Mutex::new(None),
        });
        *cyclic.this.lock().unwrap() = Some(cyclic.clone());

        let EncodedValue::Object(map) = encode(&Value::Object(cyclic)) else {
            panic!("expected composite");
        };
        assert_eq!(map["me"], EncodedValue::stub("Cyclic"));
    }
}
