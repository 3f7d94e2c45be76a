//! Raw-value coercion shared by the validator and the corrector.

/// Parses an integer value, returning None for invalid or empty strings.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Parses a real value, accepting `,` as the decimal separator.
///
/// Non-finite results (`nan`, `inf`) are rejected.
pub fn parse_real(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Number of digits written after the decimal separator.
pub fn decimal_places(value: &str) -> usize {
    let normalized = value.trim().replace(',', ".");
    let mantissa = normalized
        .split(['e', 'E'])
        .next()
        .unwrap_or(normalized.as_str());
    match mantissa.rsplit_once('.') {
        Some((_, fraction)) => fraction.chars().filter(char::is_ascii_digit).count(),
        None => 0,
    }
}

/// Formats a real so it always reads as a real (`0` becomes `0.0`).
pub fn format_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Formats a real with at most `precision` digits after the separator.
///
/// Values that already fit are rendered like [`format_real`]; others are
/// rounded to `precision` places.
pub fn format_real_within(value: f64, precision: Option<u32>) -> String {
    let formatted = format_real(value);
    match precision {
        Some(places) if decimal_places(&formatted) > places as usize => {
            format!("{value:.prec$}", prec = places as usize)
        }
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(parse_integer(" 42 "), Some(42));
        assert_eq!(parse_integer("4.2"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn reals_accept_comma_separator() {
        assert_eq!(parse_real("19,99"), Some(19.99));
        assert_eq!(parse_real("-5"), Some(-5.0));
        assert_eq!(parse_real("nan"), None);
        assert_eq!(parse_real("abc"), None);
    }

    #[test]
    fn counts_decimal_places() {
        assert_eq!(decimal_places("19.999"), 3);
        assert_eq!(decimal_places("19,9"), 1);
        assert_eq!(decimal_places("20"), 0);
        assert_eq!(decimal_places("1.25e3"), 2);
    }

    #[test]
    fn reals_keep_a_fraction_digit() {
        assert_eq!(format_real(0.0), "0.0");
        assert_eq!(format_real(19.99), "19.99");
        assert_eq!(format_real(-3.0), "-3.0");
    }

    #[test]
    fn reals_are_rounded_to_the_precision() {
        assert_eq!(format_real_within(5.0, Some(0)), "5");
        assert_eq!(format_real_within(0.0, Some(0)), "0");
        assert_eq!(format_real_within(5.0, Some(2)), "5.0");
        assert_eq!(format_real_within(19.999, Some(2)), "20.00");
        assert_eq!(format_real_within(19.999, None), "19.999");
    }
}
