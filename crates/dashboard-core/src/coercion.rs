//! Raw-cell to typed-value conversions.
//!
//! Every function here is total: a cell that cannot be converted yields a
//! [`CoercionError`] (or `None`), never a panic and never a guessed value.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::CoercionError;

/// Date-only layouts accepted by [`parse_day_first`], day before month.
///
/// `%y` goes first: it only consumes two digits, so four-digit years fall
/// through to `%Y`, while `%Y` would happily read `"22"` as the year 22.
const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Date-time layouts; the time of day is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Parse a day-first date such as `"05/03/2023"` (5 March 2023).
///
/// ```
/// use chrono::NaiveDate;
/// use dashboard_core::coercion::parse_day_first;
///
/// assert_eq!(parse_day_first("05/03/2023"), NaiveDate::from_ymd_opt(2023, 3, 5));
/// assert_eq!(parse_day_first("31/02/2023"), None);
/// assert_eq!(parse_day_first("a definir"), None);
/// ```
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    try_parse_day_first(raw).ok()
}

/// Same as [`parse_day_first`] but reports why the cell was rejected.
pub fn try_parse_day_first(raw: &str) -> Result<NaiveDate, CoercionError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CoercionError::Blank);
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(CoercionError::NotADate(s.to_string()))
}

// ── Currency ──────────────────────────────────────────────────────────────────

/// Parse Brazilian-formatted money (`"R$ 1.234,56"`) into a number.
///
/// Cleaning sequence: drop the `R$` symbol, drop `.` thousands separators,
/// turn the `,` decimal separator into `.`, trim, parse.
///
/// ```
/// use dashboard_core::coercion::parse_brl;
///
/// assert_eq!(parse_brl("R$ 1.234,56"), Ok(1234.56));
/// assert_eq!(parse_brl("100,00"), Ok(100.0));
/// assert!(parse_brl("sem valor").is_err());
/// ```
pub fn parse_brl(raw: &str) -> Result<f64, CoercionError> {
    if raw.trim().is_empty() {
        return Err(CoercionError::Blank);
    }

    let cleaned = raw
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".")
        .trim()
        .to_string();

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CoercionError::NotANumber(cleaned)),
    }
}

/// Parse a plain number, accepting either `.` or `,` as decimal separator.
///
/// Used for explicit numeric columns such as `BANDA_MB`.
pub fn parse_number(raw: &str) -> Result<f64, CoercionError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CoercionError::Blank);
    }
    let candidate = if s.contains(',') && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    match candidate.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CoercionError::NotANumber(s.to_string())),
    }
}

// ── Bandwidth ─────────────────────────────────────────────────────────────────

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("regex is valid"))
}

/// First run of decimal digits in a quantity descriptor, as a number.
///
/// ```
/// use dashboard_core::coercion::extract_bandwidth;
///
/// assert_eq!(extract_bandwidth("100 MB"), Some(100.0));
/// assert_eq!(extract_bandwidth("LINK 20MBPS"), Some(20.0));
/// assert_eq!(extract_bandwidth("N/A"), None);
/// ```
pub fn extract_bandwidth(descriptor: &str) -> Option<f64> {
    digits_re()
        .find(descriptor)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_day_first ──────────────────────────────────────────────────────

    #[test]
    fn test_day_first_slash() {
        assert_eq!(parse_day_first("01/02/2023"), Some(ymd(2023, 2, 1)));
        assert_eq!(parse_day_first("1/2/2023"), Some(ymd(2023, 2, 1)));
    }

    #[test]
    fn test_day_first_other_separators() {
        assert_eq!(parse_day_first("15-08-2022"), Some(ymd(2022, 8, 15)));
        assert_eq!(parse_day_first("15.08.2022"), Some(ymd(2022, 8, 15)));
    }

    #[test]
    fn test_day_first_two_digit_year() {
        assert_eq!(parse_day_first("15/08/22"), Some(ymd(2022, 8, 15)));
    }

    #[test]
    fn test_day_first_iso() {
        assert_eq!(parse_day_first("2021-12-31"), Some(ymd(2021, 12, 31)));
    }

    #[test]
    fn test_day_first_with_time_discards_time() {
        assert_eq!(parse_day_first("05/03/2023 14:30:00"), Some(ymd(2023, 3, 5)));
        assert_eq!(parse_day_first("05/03/2023 14:30"), Some(ymd(2023, 3, 5)));
    }

    #[test]
    fn test_day_first_surrounding_whitespace() {
        assert_eq!(parse_day_first("  05/03/2023 "), Some(ymd(2023, 3, 5)));
    }

    #[test]
    fn test_day_first_rejects_impossible_dates() {
        assert_eq!(parse_day_first("31/02/2023"), None);
        assert_eq!(parse_day_first("13/13/2023"), None);
    }

    #[test]
    fn test_day_first_never_panics() {
        for raw in ["", " ", "nan", "//", "99999999999", "ção", "01/01/2023/01", "\u{0}"] {
            let _ = parse_day_first(raw);
        }
        assert_eq!(try_parse_day_first(""), Err(CoercionError::Blank));
        assert!(matches!(
            try_parse_day_first("amanhã"),
            Err(CoercionError::NotADate(_))
        ));
    }

    // ── parse_brl ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_brl_with_symbol_and_grouping() {
        assert_eq!(parse_brl("R$ 1.234,56"), Ok(1234.56));
        assert_eq!(parse_brl("R$1.000.000,00"), Ok(1_000_000.0));
    }

    #[test]
    fn test_parse_brl_without_symbol() {
        assert_eq!(parse_brl("100,00"), Ok(100.0));
        assert_eq!(parse_brl("  42 "), Ok(42.0));
    }

    #[test]
    fn test_parse_brl_blank() {
        assert_eq!(parse_brl(""), Err(CoercionError::Blank));
        assert_eq!(parse_brl("   "), Err(CoercionError::Blank));
    }

    #[test]
    fn test_parse_brl_garbage() {
        assert_eq!(
            parse_brl("R$ a combinar"),
            Err(CoercionError::NotANumber("a combinar".to_string()))
        );
        assert!(parse_brl("R$ -").is_err());
    }

    #[test]
    fn test_parse_brl_rejects_non_finite() {
        assert!(parse_brl("NaN").is_err());
        assert!(parse_brl("inf").is_err());
    }

    // ── parse_number ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_number_both_separators() {
        assert_eq!(parse_number("2.5"), Ok(2.5));
        assert_eq!(parse_number("2,5"), Ok(2.5));
        assert_eq!(parse_number("100"), Ok(100.0));
        assert!(parse_number("cem").is_err());
    }

    // ── extract_bandwidth ────────────────────────────────────────────────────

    #[test]
    fn test_extract_bandwidth_first_run() {
        assert_eq!(extract_bandwidth("100 MB"), Some(100.0));
        assert_eq!(extract_bandwidth("50MB/10MB"), Some(50.0));
        assert_eq!(extract_bandwidth("MPLS 4 MBPS"), Some(4.0));
    }

    #[test]
    fn test_extract_bandwidth_no_digits_is_none_not_zero() {
        assert_eq!(extract_bandwidth("N/A"), None);
        assert_eq!(extract_bandwidth(""), None);
    }

    #[test]
    fn test_extract_bandwidth_overlong_digit_run_is_none() {
        let descriptor = format!("{} MB", "9".repeat(400));
        assert_eq!(extract_bandwidth(&descriptor), None);
    }
}
