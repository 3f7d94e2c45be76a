use feed_model::{Correction, CorrectionMethod, RecordSet};
use tracing::debug;

/// Replace null and blank values of `field` with `replacement`.
///
/// A field absent from the set is left absent.
pub fn fill_blanks(records: &mut RecordSet, field: &str, replacement: &str) -> Vec<Correction> {
    if !records.has_field(field) {
        debug!(field, "fill field absent");
        return Vec::new();
    }
    let blanks: Vec<(usize, Option<String>)> = records
        .column_values(field)
        .into_iter()
        .filter(|(_, value)| value.is_none_or(|value| value.trim().is_empty()))
        .map(|(index, value)| (index, value.map(str::to_string)))
        .collect();

    let mut corrections = Vec::with_capacity(blanks.len());
    for (index, before) in blanks {
        let after = Some(replacement.to_string());
        if let Some(cell) = records.get_mut(index, field) {
            cell.clone_from(&after);
            corrections.push(Correction {
                record_index: index,
                field: field.to_string(),
                before,
                after,
                method: CorrectionMethod::BlankFilled,
            });
        }
    }
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_model::Field;

    #[test]
    fn blank_categories_become_unknown() {
        let mut records = RecordSet::from_rows(
            vec![Field::column("category")],
            vec![vec![None], vec![Some("hats".into())], vec![Some(" ".into())]],
        );
        let corrections = fill_blanks(&mut records, "category", "Unknown");
        assert_eq!(corrections.len(), 2);
        assert_eq!(records.get(0, "category"), Some("Unknown"));
        assert_eq!(records.get(1, "category"), Some("hats"));
        assert_eq!(records.get(2, "category"), Some("Unknown"));
        assert_eq!(corrections[1].before.as_deref(), Some(" "));
    }

    #[test]
    fn absent_field_is_not_created() {
        let mut records = RecordSet::from_rows(vec![Field::column("name")], vec![vec![None]]);
        assert!(fill_blanks(&mut records, "category", "Unknown").is_empty());
        assert!(!records.has_field("category"));
    }
}
