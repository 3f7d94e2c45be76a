//! Normalized record sets.
//!
//! A [`RecordSet`] is the column-consistent table every source is turned
//! into. Every record carries a value slot for every field of the set, so a
//! field that a record never declared reads as null rather than failing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A single cell value; `None` is null.
pub type Value = Option<String>;

/// Where a field came from in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Attribute of the unit-of-record element (e.g. `<offer id="..">`).
    Attribute,
    /// Direct child element used by tag name.
    Tag,
    /// Repeatable child distinguished by an attribute, e.g. `<param name="color">`.
    NamedParameter {
        tag: String,
        attribute: String,
        key: String,
    },
    /// Column of a tabular or key-value source.
    Column,
}

impl FieldOrigin {
    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, FieldOrigin::Column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub origin: FieldOrigin,
}

impl Field {
    pub fn new(name: impl Into<String>, origin: FieldOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
        }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::new(name, FieldOrigin::Column)
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(name, FieldOrigin::Attribute)
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(name, FieldOrigin::Tag)
    }

    /// Field synthesized from a named parameter element.
    pub fn named_parameter(tag: &str, attribute: &str, key: &str) -> Self {
        Self::new(
            synthesized_field_name(tag, attribute, key),
            FieldOrigin::NamedParameter {
                tag: tag.to_string(),
                attribute: attribute.to_string(),
                key: key.to_string(),
            },
        )
    }
}

/// Name given to a field synthesized from `<tag attribute="key">`.
pub fn synthesized_field_name(tag: &str, attribute: &str, key: &str) -> String {
    format!("{tag} {attribute}=\"{key}\"")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable row index assigned at normalization time.
    pub index: usize,
    values: Vec<Value>,
}

impl Record {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a field position; null and out-of-range both read as `None`.
    pub fn value_at(&self, position: usize) -> Option<&str> {
        self.values.get(position).and_then(|value| value.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    fields: Vec<Field>,
    records: Vec<Record>,
    next_index: usize,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.records == other.records
            && self.next_index == other.next_index
    }
}

impl RecordSet {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut set = Self::default();
        for field in fields {
            set.push_field(field);
        }
        set
    }

    /// Build a set from rows aligned with `fields`; short rows are padded with null.
    pub fn from_rows(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        let mut set = Self::new(fields);
        for row in rows {
            set.push_record(row);
        }
        set
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_position(name).map(|position| &self.fields[position])
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        if self.positions.len() != self.fields.len() {
            // Deserialized sets have no lookup table yet.
            return self.fields.iter().position(|field| field.name == name);
        }
        self.positions.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_position(name).is_some()
    }

    /// Add a field to the universe, padding existing records with null.
    ///
    /// Returns the position of the field; an already-known name keeps its
    /// original position and origin.
    pub fn push_field(&mut self, field: Field) -> usize {
        if let Some(position) = self.field_position(&field.name) {
            return position;
        }
        let position = self.fields.len();
        self.positions.insert(field.name.clone(), position);
        self.fields.push(field);
        for record in &mut self.records {
            record.values.push(None);
        }
        position
    }

    /// Append a record and return its index.
    pub fn push_record(&mut self, mut values: Vec<Value>) -> usize {
        values.resize(self.fields.len(), None);
        let index = self.next_index;
        self.next_index += 1;
        self.records.push(Record { index, values });
        index
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records
            .binary_search_by_key(&index, |record| record.index)
            .ok()
            .map(|slot| &self.records[slot])
    }

    /// Value of `field` in record `index`; missing fields, records and nulls read as `None`.
    pub fn get(&self, index: usize, field: &str) -> Option<&str> {
        let position = self.field_position(field)?;
        self.record(index)?.value_at(position)
    }

    /// Mutable access to one cell; `None` when the field or record is unknown.
    pub fn get_mut(&mut self, index: usize, field: &str) -> Option<&mut Value> {
        let position = self.field_position(field)?;
        let slot = self
            .records
            .binary_search_by_key(&index, |record| record.index)
            .ok()?;
        self.records[slot].values.get_mut(position)
    }

    /// Overwrite a cell and return the previous value.
    pub fn set(&mut self, index: usize, field: &str, value: Value) -> Result<Value> {
        let position = self
            .field_position(field)
            .ok_or_else(|| ModelError::UnknownField {
                field: field.to_string(),
            })?;
        let slot = self
            .records
            .binary_search_by_key(&index, |record| record.index)
            .map_err(|_| ModelError::UnknownRecord { index })?;
        Ok(std::mem::replace(
            &mut self.records[slot].values[position],
            value,
        ))
    }

    /// Remove a record; its index is never handed out again.
    pub fn remove(&mut self, index: usize) -> Option<Record> {
        let slot = self
            .records
            .binary_search_by_key(&index, |record| record.index)
            .ok()?;
        Some(self.records.remove(slot))
    }

    /// Values of one column in record order, paired with the record index.
    pub fn column_values(&self, field: &str) -> Vec<(usize, Option<&str>)> {
        let position = self.field_position(field);
        self.records
            .iter()
            .map(|record| {
                let value = position.and_then(|position| record.value_at(position));
                (record.index, value)
            })
            .collect()
    }

    /// Copy of the set restricted to records whose `field` equals `value`.
    ///
    /// Record indices are preserved. An unknown field keeps every record.
    pub fn filter_eq(&self, field: &str, value: &str) -> RecordSet {
        let mut filtered = self.clone();
        if let Some(position) = self.field_position(field) {
            filtered
                .records
                .retain(|record| record.value_at(position) == Some(value));
        }
        filtered
    }

    /// Rebuild the name lookup table (needed after deserialization).
    pub fn reindex(&mut self) {
        self.positions = self
            .fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.name.clone(), position))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::from_rows(
            vec![Field::column("SKU"), Field::column("price")],
            vec![
                vec![Some("A1".into()), Some("10".into())],
                vec![Some("B2".into())],
            ],
        )
    }

    #[test]
    fn short_rows_are_padded() {
        let set = sample();
        assert_eq!(set.records()[1].values().len(), 2);
        assert_eq!(set.get(1, "price"), None);
        assert_eq!(set.get(0, "price"), Some("10"));
    }

    #[test]
    fn late_field_pads_earlier_records() {
        let mut set = sample();
        set.push_field(Field::column("category"));
        assert!(set.records().iter().all(|record| record.values().len() == 3));
        assert_eq!(set.get(0, "category"), None);
    }

    #[test]
    fn indices_are_not_reused_after_removal() {
        let mut set = sample();
        assert!(set.remove(1).is_some());
        let index = set.push_record(vec![Some("C3".into())]);
        assert_eq!(index, 2);
        assert!(set.record(1).is_none());
    }

    #[test]
    fn set_reports_unknown_targets() {
        let mut set = sample();
        assert_eq!(
            set.set(0, "missing", None),
            Err(ModelError::UnknownField {
                field: "missing".into()
            })
        );
        assert_eq!(
            set.set(9, "SKU", None),
            Err(ModelError::UnknownRecord { index: 9 })
        );
        let previous = set.set(0, "SKU", Some("Z".into())).expect("set value");
        assert_eq!(previous.as_deref(), Some("A1"));
    }

    #[test]
    fn filter_keeps_indices() {
        let set = sample();
        let filtered = set.filter_eq("SKU", "B2");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.records()[0].index, 1);
    }

    #[test]
    fn synthesized_names_quote_the_key() {
        let field = Field::named_parameter("param", "name", "color");
        assert_eq!(field.name, "param name=\"color\"");
    }
}
