use std::collections::HashSet;

use csv::ReaderBuilder;
use feed_model::{Field, RecordSet, Value};

use crate::error::NormalizeError;

const TABULAR: &str = "tabular";

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> Value {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Header names made unique: blanks become `Unnamed: N`, repeats get `.1`, `.2`, ...
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<Field> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for (idx, header) in raw.enumerate() {
        let base = match normalize_header(header) {
            name if name.is_empty() => format!("Unnamed: {idx}"),
            name => name,
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while !seen.insert(name.clone()) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        fields.push(Field::column(name));
    }
    fields
}

fn build(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Result<RecordSet, NormalizeError> {
    if rows.is_empty() {
        return Err(NormalizeError::EmptyResult {
            container: "row".to_string(),
        });
    }
    Ok(RecordSet::from_rows(fields, rows))
}

/// Normalize delimited text whose first row is the header.
///
/// Every row becomes one record, so record indices follow data row order;
/// rows of blank cells become all-null records. Rows shorter than the header
/// are padded with null; extra cells are dropped.
pub fn normalize_delimited(text: &str, delimiter: u8) -> Result<RecordSet, NormalizeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|error| NormalizeError::parse(TABULAR, error.to_string()))?
        .clone();
    let fields = unique_headers(headers.iter());
    let width = fields.len();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| NormalizeError::parse(TABULAR, error.to_string()))?;
        rows.push(record.iter().take(width).map(normalize_cell).collect());
    }
    build(fields, rows)
}

/// Normalize a spreadsheet cell grid whose first row is the header.
///
/// Trailing blank rows are dropped; blank rows between data rows are kept.
pub fn normalize_grid(grid: &[Vec<String>]) -> Result<RecordSet, NormalizeError> {
    let Some((header, body)) = grid.split_first() else {
        return Err(NormalizeError::EmptyResult {
            container: "row".to_string(),
        });
    };
    let fields = unique_headers(header.iter().map(String::as_str));
    let width = fields.len();
    let mut rows: Vec<Vec<Value>> = body
        .iter()
        .map(|row| {
            row.iter()
                .take(width)
                .map(|cell| normalize_cell(cell))
                .collect()
        })
        .collect();
    while rows
        .last()
        .is_some_and(|row| row.iter().all(Option::is_none))
    {
        rows.pop();
    }
    build(fields, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_with_nulls() {
        let set = normalize_delimited("SKU,price,category\nA1,10,\nB2,,shoes\n", b',')
            .expect("normalize csv");
        assert_eq!(set.field_names().collect::<Vec<_>>(), ["SKU", "price", "category"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0, "category"), None);
        assert_eq!(set.get(1, "price"), None);
        assert_eq!(set.get(1, "category"), Some("shoes"));
    }

    #[test]
    fn short_rows_are_padded_and_blank_rows_kept() {
        let set = normalize_delimited("a;b;c\n1;2\n;;\n4;5;6\n", b';').expect("normalize");
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0, "c"), None);
        assert_eq!(set.get(1, "a"), None);
        assert_eq!(set.records()[2].index, 2);
        assert_eq!(set.get(2, "c"), Some("6"));
    }

    #[test]
    fn duplicate_and_blank_headers_are_renamed() {
        let set = normalize_delimited("price,,price\n1,2,3\n", b',').expect("normalize");
        assert_eq!(
            set.field_names().collect::<Vec<_>>(),
            ["price", "Unnamed: 1", "price.1"]
        );
    }

    #[test]
    fn header_only_is_empty_result() {
        assert!(matches!(
            normalize_delimited("SKU,price\n", b','),
            Err(NormalizeError::EmptyResult { .. })
        ));
    }

    #[test]
    fn grid_uses_first_row_as_header() {
        let grid = vec![
            vec!["\u{feff}name".to_string(), "price".to_string()],
            vec!["Shoe".to_string(), " 12 ".to_string()],
        ];
        let set = normalize_grid(&grid).expect("normalize grid");
        assert_eq!(set.get(0, "name"), Some("Shoe"));
        assert_eq!(set.get(0, "price"), Some("12"));
    }

    #[test]
    fn grid_drops_only_trailing_blank_rows() {
        let row = |cells: &[&str]| cells.iter().map(|cell| cell.to_string()).collect::<Vec<_>>();
        let grid = vec![
            row(&["SKU", "price"]),
            row(&["A1", "1"]),
            row(&["", " "]),
            row(&["B2", "2"]),
            row(&["", ""]),
            row(&[]),
        ];
        let set = normalize_grid(&grid).expect("normalize grid");
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(1, "SKU"), None);
        assert_eq!(set.get(2, "SKU"), Some("B2"));
    }
}
