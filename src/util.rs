// Utility helpers for parsing and basic statistics.
//
// Cell-level CSV handling lives here so the loader can assume typed values.
use chrono::{DateTime, NaiveDateTime, Utc};
use num_format::{Locale, ToFormattedString};
use std::num::ParseFloatError;

/// Naive layouts accepted for `utc_timestamp` when it is not RFC 3339.
/// They are read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a numeric cell.
///
/// - `Ok(None)` for an empty cell (a missing value, not an error).
/// - `Err` for anything that is present but not a number.
pub fn parse_f64_cell(s: &str) -> Result<Option<f64>, ParseFloatError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Arithmetic mean of the present values, `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn max<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals with en-locale thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Formats an optional aggregate value; missing buckets render as `-`.
pub fn format_opt(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `140,256 rows loaded`.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn numeric_cells() {
        assert_eq!(parse_f64_cell("119.5"), Ok(Some(119.5)));
        assert_eq!(parse_f64_cell("  "), Ok(None));
        assert_eq!(parse_f64_cell(""), Ok(None));
        assert!(parse_f64_cell("12a").is_err());
    }

    #[test]
    fn timestamps_in_opsd_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2015, 1, 1, 0, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2015-01-01T00:15:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2015-01-01T01:15:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2015-01-01 00:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2015-01-01T00:15"), Some(expected));
        assert_eq!(parse_timestamp("01.01.2015 00:15"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn mean_and_max_of_nothing() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(max(Vec::<f64>::new()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(max([100.0, 150.0, 120.0]), Some(150.0));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(53000.4, 0), "53,000");
        assert_eq!(format_opt(None, 2), "-");
        assert_eq!(format_int(140256), "140,256");
    }
}
