// Parsing and formatting helpers.
//
// Raw CSV fields arrive as optional strings; everything here turns them into
// typed values or `None`, so the loaders never have to think about blanks,
// stray whitespace or thousands separators.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Trim a raw field, treating blank as missing.
pub fn clean_field(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a coordinate-like number, forgiving thousands separators.
///
/// Values containing letters (`"n/a"`, `"NaN"`) are rejected rather than
/// parsed, so they can never sneak in as a non-finite coordinate.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = clean_field(s)?;
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Dates are expected strictly as `YYYY-MM-DD`.
    NaiveDate::parse_from_str(clean_field(s)?, "%Y-%m-%d").ok()
}

/// Percentage change from `prev` to `curr`, with an undefined or infinite
/// result (a zero base) normalised to 0.
pub fn pct_change(prev: usize, curr: usize) -> f64 {
    let change = (curr as f64 - prev as f64) / prev as f64 * 100.0;
    if change.is_finite() {
        change
    } else {
        0.0
    }
}

/// `count / total * 100`, or 0 for an empty total.
pub fn share_pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_padded_fields() {
        assert_eq!(clean_field(Some("  ")), None);
        assert_eq!(clean_field(Some(" ACT ")), Some("ACT"));
        assert_eq!(clean_field(None), None);
    }

    #[test]
    fn coordinates_reject_text() {
        assert_eq!(parse_f64_safe(Some("-35.2777")), Some(-35.2777));
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
    }

    #[test]
    fn numbers_accept_integers_and_fractions() {
        assert_eq!(parse_f64_safe(Some("4")), Some(4.0));
        assert_eq!(parse_f64_safe(Some("3.5")), Some(3.5));
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
    }

    #[test]
    fn dates_are_strict_iso() {
        assert!(parse_date_safe(Some("2024-02-29")).is_some());
        assert!(parse_date_safe(Some("2023-02-29")).is_none());
        assert!(parse_date_safe(Some("15/01/2024")).is_none());
    }

    #[test]
    fn pct_change_from_zero_is_zero() {
        assert_eq!(pct_change(10, 15), 50.0);
        assert_eq!(pct_change(10, 0), -100.0);
        assert_eq!(pct_change(0, 5), 0.0);
        assert_eq!(pct_change(0, 0), 0.0);
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-40.0, 1), "-40.0");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
