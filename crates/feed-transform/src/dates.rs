//! Lenient date parsing and canonical re-rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use feed_model::{Correction, CorrectionMethod, RecordSet};
use tracing::debug;

/// Parse a date written in any of the common feed layouts.
///
/// Date-times keep only their date part.
pub fn parse_lenient(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    try_parse_datetime(value)
        .map(|datetime| datetime.date())
        .or_else(|| try_parse_date(value))
}

fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

fn try_parse_date(value: &str) -> Option<NaiveDate> {
    let formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d/%m/%Y", // day first wins for ambiguous values
        "%m/%d/%Y",
        "%d-%m-%Y",
        "%d-%b-%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%B %d, %Y",
        "%Y%m%d",
    ];
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse `value` in `format` first, falling back to the lenient layouts.
pub fn parse_with_fallback(value: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, format)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, format)
                .ok()
                .map(|datetime| datetime.date())
        })
        .or_else(|| parse_lenient(trimmed))
}

/// Re-render every date in `field` with `format`.
///
/// Values that cannot be read as a date are cleared to null. Null and blank
/// cells are left alone, as are values already written in `format`.
pub fn normalize_dates(records: &mut RecordSet, field: &str, format: &str) -> Vec<Correction> {
    let Some(position) = records.field_position(field) else {
        debug!(field, "date field absent; nothing to normalize");
        return Vec::new();
    };
    let targets: Vec<(usize, String)> = records
        .records()
        .iter()
        .filter_map(|record| {
            let value = record.value_at(position)?;
            (!value.trim().is_empty()).then(|| (record.index, value.to_string()))
        })
        .collect();

    let mut corrections = Vec::new();
    for (index, before) in targets {
        let (after, method) = match parse_with_fallback(&before, format) {
            Some(date) => (Some(date.format(format).to_string()), CorrectionMethod::DateNormalized),
            None => (None, CorrectionMethod::DateCleared),
        };
        if after.as_deref() == Some(before.as_str()) {
            continue;
        }
        if let Some(cell) = records.get_mut(index, field) {
            cell.clone_from(&after);
            corrections.push(Correction {
                record_index: index,
                field: field.to_string(),
                before: Some(before),
                after,
                method,
            });
        }
    }
    debug!(field, corrections = corrections.len(), "dates normalized");
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::Field;

    #[test]
    fn common_layouts_parse() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        for value in [
            "2024-01-15",
            "15.01.2024",
            "15/01/2024",
            "01/15/2024",
            "20240115",
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00+03:00",
            "15 Jan 2024",
        ] {
            assert_eq!(parse_lenient(value), expected, "{value}");
        }
        assert_eq!(parse_lenient("soon"), None);
    }

    #[test]
    fn target_format_is_tried_first() {
        assert_eq!(
            parse_with_fallback("03/04/2024", "%m/%d/%Y"),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
        assert_eq!(
            parse_with_fallback("03/04/2024", "%Y-%m-%d"),
            NaiveDate::from_ymd_opt(2024, 4, 3)
        );
    }

    #[test]
    fn dates_are_rewritten_or_cleared() {
        let mut records = RecordSet::from_rows(
            vec![Field::column("updated")],
            vec![
                vec![Some("15.01.2024".into())],
                vec![Some("2024-02-01".into())],
                vec![Some("never".into())],
                vec![None],
            ],
        );
        let corrections = normalize_dates(&mut records, "updated", "%Y-%m-%d");
        assert_eq!(corrections.len(), 2);
        assert_eq!(records.get(0, "updated"), Some("2024-01-15"));
        assert_eq!(records.get(1, "updated"), Some("2024-02-01"));
        assert_eq!(records.get(2, "updated"), None);
        assert_eq!(corrections[1].method, CorrectionMethod::DateCleared);
        assert_eq!(corrections[1].before.as_deref(), Some("never"));
    }
}
