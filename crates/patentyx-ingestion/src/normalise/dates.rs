//! Lenient date parsing and the term-expiration estimate.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Nominal patent term used for the estimate, in 365-day years.
pub const TERM_YEARS: i64 = 20;

/// Parse a provider date string.
///
/// Tries `YYYY-MM-DD`, then `YYYYMMDD`, then ISO-8601 date-times. Anything
/// else (including priority application numbers) yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|d| d.date())
        })
}

pub fn parse_optional(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

/// First priority entry that parses as a date, else the filing date.
pub fn resolve_priority(priority_numbers: &[String], filing: Option<NaiveDate>) -> Option<NaiveDate> {
    priority_numbers
        .iter()
        .find_map(|p| parse_date(p))
        .or(filing)
}

/// Anchor (priority, else filing) plus 20 × 365 days.
///
/// An estimate only: ignores term adjustments, extensions, terminal
/// disclaimers and leap days.
pub fn estimate_expiration(filing: Option<NaiveDate>, priority: Option<NaiveDate>) -> Option<NaiveDate> {
    let anchor = priority.or(filing)?;
    anchor.checked_add_signed(Duration::days(TERM_YEARS * 365))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_date("2019-06-01"), Some(ymd(2019, 6, 1)));
        assert_eq!(parse_date("20190601"), Some(ymd(2019, 6, 1)));
        assert_eq!(parse_date(" 2019-06-01T12:30:00Z "), Some(ymd(2019, 6, 1)));
        assert_eq!(parse_date("2019-06-01T12:30:00"), Some(ymd(2019, 6, 1)));
        assert_eq!(parse_date("US62000000"), None);
        assert_eq!(parse_date("2019-13-01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_priority_falls_back_to_filing() {
        let filing = Some(ymd(2018, 3, 1));
        let numbers = vec!["JP2017123".to_string(), "20170115".to_string(), "2016-01-01".to_string()];
        assert_eq!(resolve_priority(&numbers, filing), Some(ymd(2017, 1, 15)));
        assert_eq!(resolve_priority(&["US62000000".to_string()], filing), filing);
        assert_eq!(resolve_priority(&[], None), None);
    }

    #[test]
    fn test_expiration_estimate() {
        let anchor = ymd(2000, 1, 1);
        assert_eq!(estimate_expiration(Some(anchor), None), Some(anchor + Duration::days(7300)));
        assert_eq!(
            estimate_expiration(Some(ymd(2010, 1, 1)), Some(anchor)),
            Some(anchor + Duration::days(7300))
        );
        assert_eq!(estimate_expiration(None, None), None);
    }
}
