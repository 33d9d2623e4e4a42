//! Single-field parsers used by the transform passes.
//!
//! Every parser takes one raw cell and returns either a cleaned value or
//! `None`. Malformed input is never an error at this level.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::RECORDING_TAKEN_FORMAT;

// ---

/// `<weekday>, <day> <month> <year> <HH:MM:SS> <zone>`, e.g. `Tue, 29 Aug 2023 13:24:30 GMT`.
static RFC1123_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun), (\d{1,2} [A-Za-z]{3} \d{4} \d{2}:\d{2}:\d{2}) [A-Z]{2,5}$",
    )
    .expect("valid RFC-1123 regex")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*@[A-Za-z0-9-]+\.[A-Za-z]{2,}(?:\.[A-Za-z]{2,})?$",
    )
    .expect("valid email regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(?:\([0-9]+\))?[0-9.-]+(?:x[0-9.-]+)?$").expect("valid phone regex")
});

/// Remove every comma from `text`.
pub fn strip_comma(text: Option<&str>) -> Option<String> {
    // ---
    let text = text?;
    if text.contains(',') {
        Some(text.replace(',', ""))
    } else {
        Some(text.to_string())
    }
}

/// Undo a list-of-one-string serialization: `['Ficus']` becomes `Ficus`.
///
/// Any text containing `[` loses its first two and last two characters.
pub fn strip_list_formatting(text: &str) -> String {
    // ---
    if !text.contains('[') {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return String::new();
    }
    chars[2..chars.len() - 2].iter().collect()
}

/// Parse a `last_watered` value such as `Tue, 29 Aug 2023 13:24:30 GMT`.
///
/// The zone abbreviation is required but not applied; the result is the
/// wall-clock time as written. The weekday is not cross-checked against the
/// date.
pub fn parse_rfc1123_timestamp(text: Option<&str>) -> Option<NaiveDateTime> {
    // ---
    let captures = RFC1123_RE.captures(text?)?;
    NaiveDateTime::parse_from_str(&captures[1], "%d %b %Y %H:%M:%S").ok()
}

/// Carry-forward state for one timestamp reconciliation pass.
///
/// Holds the last `recording_taken` value that parsed successfully. Create a
/// fresh one per batch; it is never shared between passes.
#[derive(Debug, Default, Clone)]
pub struct TimestampCache {
    last_time: Option<NaiveDateTime>,
}

impl TimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.last_time
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` value, falling back to the cached one.
///
/// A successful parse updates `cache`. A missing or malformed value returns
/// the most recently cached timestamp, or `None` if nothing has parsed yet.
pub fn parse_canonical_timestamp(
    text: Option<&str>,
    cache: &mut TimestampCache,
) -> Option<NaiveDateTime> {
    // ---
    match text.and_then(parse_canonical) {
        Some(time) => {
            cache.last_time = Some(time);
            Some(time)
        }
        None => cache.last_time,
    }
}

pub(crate) fn parse_canonical(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, RECORDING_TAKEN_FORMAT).ok()
}

/// Return the address unchanged if the whole string is a valid email.
pub fn extract_email(text: Option<&str>) -> Option<String> {
    // ---
    let text = text?;
    EMAIL_RE.is_match(text).then(|| text.to_string())
}

/// Return the phone number with `.` separators normalized to `-`, if the
/// whole string is a valid phone number.
pub fn extract_phone_number(text: Option<&str>) -> Option<String> {
    // ---
    let text = text?;
    if !PHONE_RE.is_match(text) || !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(text.replace('.', "-"))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};

    #[test]
    fn test_strip_comma_removes_every_comma() {
        // ---
        assert_eq!(
            strip_comma(Some("Epipremnum, Aureum,")).as_deref(),
            Some("Epipremnum Aureum")
        );
        assert_eq!(strip_comma(Some(",,,")).as_deref(), Some(""));
    }

    #[test]
    fn test_strip_comma_identity_without_comma() {
        // ---
        assert_eq!(strip_comma(Some("Cactus")).as_deref(), Some("Cactus"));
        assert_eq!(strip_comma(Some("")).as_deref(), Some(""));
        assert_eq!(strip_comma(None), None);
    }

    #[test]
    fn test_strip_list_formatting() {
        // ---
        assert_eq!(strip_list_formatting("['Ficus']"), "Ficus");
        assert_eq!(
            strip_list_formatting("['Pinus wollemi']"),
            "Pinus wollemi"
        );
        assert_eq!(strip_list_formatting("Ficus"), "Ficus");
        assert_eq!(strip_list_formatting("[]"), "");
    }

    #[test]
    fn test_parse_rfc1123_timestamp() {
        // ---
        let parsed = parse_rfc1123_timestamp(Some("Tue, 29 Aug 2023 13:24:30 GMT")).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2023, 8, 29).unwrap());
        assert_eq!(parsed.hour(), 13);
        assert_eq!(parsed.minute(), 24);
        assert_eq!(parsed.second(), 30);
    }

    #[test]
    fn test_parse_rfc1123_timestamp_ignores_weekday_mismatch() {
        // ---
        // 29 Jan 2023 was a Sunday
        let parsed = parse_rfc1123_timestamp(Some("Tue, 29 Jan 2023 13:20:30 GMT")).unwrap();
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.day(), 29);
    }

    #[test]
    fn test_parse_rfc1123_timestamp_rejects_other_formats() {
        // ---
        assert_eq!(parse_rfc1123_timestamp(None), None);
        assert_eq!(parse_rfc1123_timestamp(Some("")), None);
        assert_eq!(parse_rfc1123_timestamp(Some("2023-08-29 13:24:30")), None);
        assert_eq!(parse_rfc1123_timestamp(Some("Tue, 29 Aug 2023 13:24:30")), None);
        assert_eq!(
            parse_rfc1123_timestamp(Some("Tue, 29 Aug 2023 13:24:30 GMT extra")),
            None
        );
        assert_eq!(parse_rfc1123_timestamp(Some("Tue, 31 Feb 2023 13:24:30 GMT")), None);
    }

    #[test]
    fn test_parse_canonical_timestamp_updates_cache() {
        // ---
        let mut cache = TimestampCache::new();
        let parsed = parse_canonical_timestamp(Some("2023-05-26 12:00:34"), &mut cache).unwrap();

        assert_eq!(parsed.minute(), 0);
        assert_eq!(cache.last_time(), Some(parsed));
    }

    #[test]
    fn test_parse_canonical_timestamp_carries_forward() {
        // ---
        let mut cache = TimestampCache::new();
        assert_eq!(parse_canonical_timestamp(None, &mut cache), None);
        assert_eq!(parse_canonical_timestamp(Some("garbage"), &mut cache), None);

        let first = parse_canonical_timestamp(Some("2023-05-26 12:01:34"), &mut cache);
        assert_eq!(parse_canonical_timestamp(None, &mut cache), first);
        assert_eq!(parse_canonical_timestamp(Some("26/05/2023"), &mut cache), first);

        let second = parse_canonical_timestamp(Some("2023-05-26 12:02:34"), &mut cache);
        assert_ne!(first, second);
        assert_eq!(parse_canonical_timestamp(None, &mut cache), second);
    }

    #[test]
    fn test_extract_email() {
        // ---
        assert_eq!(
            extract_email(Some("test.email@yahoo.com")).as_deref(),
            Some("test.email@yahoo.com")
        );
        assert_eq!(
            extract_email(Some("gertrude.jekyll@lnhm.co.uk")).as_deref(),
            Some("gertrude.jekyll@lnhm.co.uk")
        );
        assert_eq!(extract_email(Some("+++++@yahoo.com")), None);
        assert_eq!(extract_email(Some("123")), None);
        assert_eq!(extract_email(Some("contact me at a@b.com")), None);
        assert_eq!(extract_email(None), None);
    }

    #[test]
    fn test_extract_phone_number() {
        // ---
        assert_eq!(
            extract_phone_number(Some("001-630-832-2711x5822")).as_deref(),
            Some("001-630-832-2711x5822")
        );
        assert_eq!(
            extract_phone_number(Some("(146)994-1635x35992")).as_deref(),
            Some("(146)994-1635x35992")
        );
        assert_eq!(
            extract_phone_number(Some("+1.434.795.3400")).as_deref(),
            Some("+1-434-795-3400")
        );
        assert_eq!(extract_phone_number(Some("I am a fake phone number")), None);
        assert_eq!(extract_phone_number(Some("---")), None);
        assert_eq!(extract_phone_number(Some("1(146)994-1635")), None);
        assert_eq!(extract_phone_number(None), None);
    }
}
