//! Hierarchical (offer/param) documents.
//!
//! Every element named like the layout's container becomes one record,
//! wherever it sits in the document. Its attributes and direct children are
//! the record's fields; repeatable named parameters such as
//! `<param name="color">` are folded into synthesized field names. Children
//! nested deeper than one level are ignored.

use std::collections::{BTreeMap, HashMap};

use feed_model::{Field, RecordSet, Value};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::NormalizeError;
use crate::source::HierarchyLayout;

const HIERARCHICAL: &str = "hierarchical";

/// Field registry shared by all records of one document, in discovery order.
#[derive(Default)]
struct FieldUniverse {
    fields: Vec<Field>,
    positions: HashMap<String, usize>,
}

impl FieldUniverse {
    fn position(&mut self, field: Field) -> usize {
        if let Some(position) = self.positions.get(&field.name) {
            return *position;
        }
        let position = self.fields.len();
        self.positions.insert(field.name.clone(), position);
        self.fields.push(field);
        position
    }
}

/// Child element of the current record whose text is being collected.
struct OpenChild {
    position: usize,
    text: String,
    /// Depth of nested elements below the child; their text is ignored.
    nested: usize,
}

/// Values of the record being read, keyed by field position. Last write wins.
struct OpenRecord {
    values: BTreeMap<usize, Value>,
    child: Option<OpenChild>,
}

pub fn normalize_hierarchical(
    text: &str,
    layout: &HierarchyLayout,
) -> Result<RecordSet, NormalizeError> {
    let mut reader = Reader::from_str(text);
    let mut universe = FieldUniverse::default();
    let mut finished: Vec<BTreeMap<usize, Value>> = Vec::new();
    let mut current: Option<OpenRecord> = None;

    loop {
        let event = reader.read_event().map_err(|error| {
            NormalizeError::parse(
                HIERARCHICAL,
                format!("{error} at byte {}", reader.buffer_position()),
            )
        })?;
        match event {
            Event::Start(start) => match current.as_mut() {
                None => {
                    if element_name(&start) == layout.container {
                        current = Some(open_record(&start, &mut universe)?);
                    }
                }
                Some(record) => {
                    if let Some(child) = record.child.as_mut() {
                        child.nested += 1;
                    } else {
                        let position = universe.position(child_field(&start, layout)?);
                        record.child = Some(OpenChild {
                            position,
                            text: String::new(),
                            nested: 0,
                        });
                    }
                }
            },
            Event::Empty(start) => match current.as_mut() {
                None => {
                    if element_name(&start) == layout.container {
                        finished.push(open_record(&start, &mut universe)?.values);
                    }
                }
                Some(record) => {
                    if record.child.is_none() {
                        let position = universe.position(child_field(&start, layout)?);
                        record.values.insert(position, None);
                    }
                }
            },
            Event::End(_) => {
                let Some(record) = current.as_mut() else {
                    continue;
                };
                if let Some(child) = record.child.as_mut() {
                    if child.nested > 0 {
                        child.nested -= 1;
                    } else if let Some(child) = record.child.take() {
                        let value = child.text.trim();
                        let value = (!value.is_empty()).then(|| value.to_string());
                        record.values.insert(child.position, value);
                    }
                } else if let Some(record) = current.take() {
                    finished.push(record.values);
                }
            }
            Event::Text(text) => {
                if let Some(child) = open_child(&mut current) {
                    child.text.push_str(&String::from_utf8_lossy(&text));
                }
            }
            Event::CData(data) => {
                if let Some(child) = open_child(&mut current) {
                    child.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(child) = open_child(&mut current) {
                    push_reference(&mut child.text, &String::from_utf8_lossy(&reference));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(NormalizeError::parse(
            HIERARCHICAL,
            format!("document ended inside <{}>", layout.container),
        ));
    }
    if finished.is_empty() {
        return Err(NormalizeError::EmptyResult {
            container: layout.container.clone(),
        });
    }
    debug!(
        container = %layout.container,
        records = finished.len(),
        fields = universe.fields.len(),
        "collected hierarchical records"
    );

    // The union is complete only now, so every record is padded against it.
    let width = universe.fields.len();
    let rows = finished
        .into_iter()
        .map(|values| {
            let mut row = vec![None; width];
            for (position, value) in values {
                row[position] = value;
            }
            row
        })
        .collect();
    Ok(RecordSet::from_rows(universe.fields, rows))
}

fn open_child(current: &mut Option<OpenRecord>) -> Option<&mut OpenChild> {
    current
        .as_mut()
        .and_then(|record| record.child.as_mut())
        .filter(|child| child.nested == 0)
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, NormalizeError> {
    let mut pairs = Vec::new();
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|error| NormalizeError::parse(HIERARCHICAL, error.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|error| NormalizeError::parse(HIERARCHICAL, error.to_string()))?
            .trim()
            .to_string();
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn open_record(
    start: &BytesStart<'_>,
    universe: &mut FieldUniverse,
) -> Result<OpenRecord, NormalizeError> {
    let mut values = BTreeMap::new();
    for (key, value) in attributes(start)? {
        let position = universe.position(Field::attribute(key));
        values.insert(position, (!value.is_empty()).then_some(value));
    }
    Ok(OpenRecord {
        values,
        child: None,
    })
}

fn child_field(start: &BytesStart<'_>, layout: &HierarchyLayout) -> Result<Field, NormalizeError> {
    let tag = element_name(start);
    if tag == layout.parameter_tag {
        let key = attributes(start)?
            .into_iter()
            .find(|(name, _)| *name == layout.parameter_attribute)
            .map(|(_, value)| value);
        if let Some(key) = key {
            return Ok(Field::named_parameter(
                &tag,
                &layout.parameter_attribute,
                &key,
            ));
        }
    }
    Ok(Field::tag(tag))
}

/// Append the replacement text for an entity or character reference.
fn push_reference(text: &mut String, name: &str) {
    let resolved = match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => name.strip_prefix('#').and_then(|code| {
            let parsed = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            parsed.and_then(char::from_u32)
        }),
    };
    match resolved {
        Some(ch) => text.push(ch),
        None => {
            text.push('&');
            text.push_str(name);
            text.push(';');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> HierarchyLayout {
        HierarchyLayout::default()
    }

    #[test]
    fn attributes_tags_and_params_become_fields() {
        let xml = r#"<yml_catalog><shop><offers>
            <offer id="1" available="true">
                <name>Sneakers</name>
                <price>19.99</price>
                <param name="color">red</param>
                <param name="size">42</param>
            </offer>
        </offers></shop></yml_catalog>"#;
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(
            set.field_names().collect::<Vec<_>>(),
            [
                "id",
                "available",
                "name",
                "price",
                "param name=\"color\"",
                "param name=\"size\""
            ]
        );
        assert_eq!(set.get(0, "param name=\"size\""), Some("42"));
    }

    #[test]
    fn repeated_tags_keep_the_last_value() {
        let xml = "<offers><offer><picture>a.jpg</picture><picture>b.jpg</picture></offer></offers>";
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(set.get(0, "picture"), Some("b.jpg"));
    }

    #[test]
    fn nested_children_are_ignored() {
        let xml = "<offers><offer><delivery><option cost=\"5\">fast</option></delivery><name>x</name></offer></offers>";
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(set.field_names().collect::<Vec<_>>(), ["delivery", "name"]);
        assert_eq!(set.get(0, "delivery"), None);
        assert_eq!(set.get(0, "name"), Some("x"));
    }

    #[test]
    fn entities_and_cdata_are_resolved() {
        let xml = "<offers><offer><name>A &amp; B</name><description><![CDATA[<b>bold</b>]]></description><sign>&#8381;</sign></offer></offers>";
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(set.get(0, "name"), Some("A & B"));
        assert_eq!(set.get(0, "description"), Some("<b>bold</b>"));
        assert_eq!(set.get(0, "sign"), Some("\u{20bd}"));
    }

    #[test]
    fn empty_elements_are_null() {
        let xml = "<offers><offer id=\"\"><vendor/><model></model></offer></offers>";
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0, "id"), None);
        assert_eq!(set.get(0, "vendor"), None);
        assert_eq!(set.get(0, "model"), None);
    }

    #[test]
    fn param_without_name_uses_its_tag() {
        let xml = "<offers><offer><param>loose</param></offer></offers>";
        let set = normalize_hierarchical(xml, &layout()).expect("normalize");
        assert_eq!(set.get(0, "param"), Some("loose"));
    }

    #[test]
    fn wrong_container_is_empty_result() {
        let xml = "<items><item><name>x</name></item></items>";
        assert_eq!(
            normalize_hierarchical(xml, &layout()),
            Err(NormalizeError::EmptyResult {
                container: "offer".into()
            })
        );
        let set = normalize_hierarchical(xml, &HierarchyLayout::with_container("item"))
            .expect("custom container");
        assert_eq!(set.get(0, "name"), Some("x"));
    }

    #[test]
    fn malformed_markup_is_a_parse_error() {
        let xml = "<offers><offer><name>x</price></offer></offers>";
        assert!(matches!(
            normalize_hierarchical(xml, &layout()),
            Err(NormalizeError::Parse { .. })
        ));
    }
}
