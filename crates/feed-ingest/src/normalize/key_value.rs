use std::collections::HashMap;

use feed_model::{Field, RecordSet, Value};
use serde_json::{Map, Value as Json};

use crate::error::NormalizeError;

const KEY_VALUE: &str = "key-value";

/// Normalize a JSON document of records.
///
/// Accepts an array of objects, a single object, or an object wrapping the
/// array under `container`. Nested objects are flattened with `.` separated
/// keys; arrays are kept as their JSON text.
pub fn normalize_key_value(
    text: &str,
    container: Option<&str>,
) -> Result<RecordSet, NormalizeError> {
    let document: Json = serde_json::from_str(text)
        .map_err(|error| NormalizeError::parse(KEY_VALUE, error.to_string()))?;
    let objects = record_objects(&document, container)?;

    let mut fields: Vec<Field> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut flattened = Vec::with_capacity(objects.len());
    for object in objects {
        let mut pairs = Vec::new();
        flatten(None, object, &mut pairs);
        let mut row = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                fields.push(Field::column(key));
                fields.len() - 1
            });
            row.push((position, value));
        }
        flattened.push(row);
    }

    let empty_result = || NormalizeError::EmptyResult {
        container: container.unwrap_or("record").to_string(),
    };
    if flattened.is_empty() || fields.is_empty() {
        return Err(empty_result());
    }
    let width = fields.len();
    let rows = flattened
        .into_iter()
        .map(|pairs| {
            let mut row = vec![None; width];
            for (position, value) in pairs {
                row[position] = value;
            }
            row
        })
        .collect();
    Ok(RecordSet::from_rows(fields, rows))
}

fn record_objects<'a>(
    document: &'a Json,
    container: Option<&str>,
) -> Result<Vec<&'a Map<String, Json>>, NormalizeError> {
    let items = match document {
        Json::Array(items) => items,
        Json::Object(object) => match container.and_then(|key| object.get(key)) {
            Some(Json::Array(items)) => items,
            Some(Json::Object(single)) => return Ok(vec![single]),
            Some(_) => {
                return Err(NormalizeError::parse(
                    KEY_VALUE,
                    "container key does not hold records",
                ));
            }
            None => return Ok(vec![object]),
        },
        _ => {
            return Err(NormalizeError::parse(
                KEY_VALUE,
                "document must be an object or an array of objects",
            ));
        }
    };
    items
        .iter()
        .map(|item| match item {
            Json::Object(object) => Ok(object),
            _ => Err(NormalizeError::parse(
                KEY_VALUE,
                "array entries must be objects",
            )),
        })
        .collect()
}

fn flatten(prefix: Option<&str>, object: &Map<String, Json>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Json::Object(nested) if !nested.is_empty() => flatten(Some(&name), nested, out),
            other => out.push((name, scalar(other))),
        }
    }
}

fn scalar(value: &Json) -> Value {
    match value {
        Json::Null => None,
        Json::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Json::Bool(flag) => Some(flag.to_string()),
        Json::Number(number) => Some(number.to_string()),
        Json::Object(object) if object.is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_of_objects_becomes_records() {
        let set = normalize_key_value(
            r#"[{"SKU": "A1", "price": 10.5}, {"SKU": "B2", "stock": 3}]"#,
            None,
        )
        .expect("normalize json");
        assert_eq!(set.field_names().collect::<Vec<_>>(), ["SKU", "price", "stock"]);
        assert_eq!(set.get(0, "price"), Some("10.5"));
        assert_eq!(set.get(0, "stock"), None);
        assert_eq!(set.get(1, "stock"), Some("3"));
    }

    #[test]
    fn wrapped_array_and_nested_objects() {
        let set = normalize_key_value(
            r#"{"offers": [{"id": 1, "vendor": {"name": "Acme", "country": null}, "tags": ["a", "b"]}]}"#,
            Some("offers"),
        )
        .expect("normalize json");
        assert_eq!(
            set.field_names().collect::<Vec<_>>(),
            ["id", "vendor.name", "vendor.country", "tags"]
        );
        assert_eq!(set.get(0, "vendor.name"), Some("Acme"));
        assert_eq!(set.get(0, "vendor.country"), None);
        assert_eq!(set.get(0, "tags"), Some(r#"["a","b"]"#));
    }

    #[test]
    fn single_object_is_one_record() {
        let set = normalize_key_value(r#"{"name": "Lamp", "available": true}"#, Some("offers"))
            .expect("normalize json");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0, "available"), Some("true"));
    }

    #[test]
    fn empty_array_is_empty_result() {
        assert_eq!(
            normalize_key_value("[]", None),
            Err(NormalizeError::EmptyResult {
                container: "record".into()
            })
        );
    }

    #[test]
    fn scalars_in_array_are_rejected() {
        assert!(matches!(
            normalize_key_value("[1, 2]", None),
            Err(NormalizeError::Parse { .. })
        ));
        assert!(matches!(
            normalize_key_value("{not json", None),
            Err(NormalizeError::Parse { .. })
        ));
    }
}
