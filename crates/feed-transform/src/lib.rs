//! Correction of product feed records: rule-driven replacement, manual-review
//! markers, date normalization and blank filling.

pub mod corrector;
pub mod dates;
pub mod fill;

pub use corrector::{
    CorrectionMode, REVIEW_MARKER, correct, replacement, strip_review_markers, unwrap_review,
    wrap_for_review,
};
pub use dates::{normalize_dates, parse_lenient, parse_with_fallback};
pub use fill::fill_blanks;
