//! Publication date normalization.
//!
//! Feeds publish dates in whatever format their generator happens to emit.
//! [`normalize`] tries the fixed, ordered list in [`LAYOUTS`] and returns the
//! first layout that accepts the input. The order is a priority among
//! ambiguous inputs, so results stay reproducible only while it is unchanged.
//!
//! Leading weekday names (`Mon, ...`) are checked for spelling but never for
//! consistency with the date: feeds routinely get the weekday wrong.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// No layout in [`LAYOUTS`] accepted the input
    #[error("unable to parse time: {0}")]
    Unparseable(String),
}

/// A date layout understood by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02T15:04:05.999999999Z07:00`
    Rfc3339Nano,
    /// `2006-01-02 15:04:05 -0700`
    SpacedOffset,
    /// `2006-01-02 15:04:05`, read as UTC
    Spaced,
    /// `2006-01-02`, midnight UTC
    DateOnly,
    /// `02 Jan 2006 15:04:05 MST`
    DayMonthYearZone,
    /// `02 Jan 2006 15:04:05 -0700`
    DayMonthYearOffset,
    /// `Mon, 2 Jan 2006 15:04:05 MST`
    ShortDayZone,
    /// `Mon, 2 Jan 2006 15:04:05 -0700`
    ShortDayOffset,
    /// `January 2, 2006 3:04 PM`, read as UTC. The month must be spelled out.
    LongMonthClock,
    /// `Jan 2, 2006 3:04 PM`, read as UTC. The month must be abbreviated.
    ShortMonthClock,
}

/// Layouts in the order [`normalize`] tries them.
pub const LAYOUTS: [Layout; 15] = [
    Layout::Rfc1123,
    Layout::Rfc1123Z,
    Layout::Rfc822,
    Layout::Rfc822Z,
    Layout::Rfc3339,
    Layout::Rfc3339Nano,
    Layout::SpacedOffset,
    Layout::Spaced,
    Layout::DateOnly,
    Layout::DayMonthYearZone,
    Layout::DayMonthYearOffset,
    Layout::ShortDayZone,
    Layout::ShortDayOffset,
    Layout::LongMonthClock,
    Layout::ShortMonthClock,
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Converts a free-form publication date into an absolute instant.
///
/// Surrounding whitespace is ignored. Zone abbreviations from RFC 822
/// (`GMT`, `EST`, `PDT`, ...) map to their fixed offsets; any other
/// abbreviation of three to five capital letters is read as UTC.
///
/// # Errors
///
/// Returns [`TimestampError::Unparseable`] naming the trimmed input when no
/// layout matches.
///
/// # Examples
///
/// ```
/// use gator::feed::normalize;
///
/// let published = normalize(" 2024-03-01T08:30:00Z ").unwrap();
/// assert_eq!(published.timestamp(), 1_709_281_800);
/// assert!(normalize("not a date").is_err());
/// ```
pub fn normalize(input: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = input.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(trimmed))
        .ok_or_else(|| TimestampError::Unparseable(trimmed.to_string()))
}

impl Layout {
    /// Parses `s` with this layout only. `s` must already be trimmed.
    pub fn parse(self, s: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            Layout::Rfc1123 | Layout::ShortDayZone => {
                with_zone_name(strip_weekday(s)?, "%d %b %Y %H:%M:%S")
            }
            Layout::Rfc1123Z | Layout::ShortDayOffset => {
                DateTime::parse_from_str(strip_weekday(s)?, "%d %b %Y %H:%M:%S %z").ok()
            }
            Layout::Rfc822 => with_zone_name(s, "%d %b %y %H:%M"),
            Layout::Rfc822Z => DateTime::parse_from_str(s, "%d %b %y %H:%M %z").ok(),
            Layout::Rfc3339 if s.contains('.') => None,
            Layout::Rfc3339 | Layout::Rfc3339Nano => DateTime::parse_from_rfc3339(s).ok(),
            Layout::SpacedOffset => DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z").ok(),
            Layout::Spaced => as_utc(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()?),
            Layout::DateOnly => {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                as_utc(date.and_hms_opt(0, 0, 0)?)
            }
            Layout::DayMonthYearZone => with_zone_name(s, "%d %b %Y %H:%M:%S"),
            Layout::DayMonthYearOffset => {
                DateTime::parse_from_str(s, "%d %b %Y %H:%M:%S %z").ok()
            }
            // chrono's %B and %b each accept both spellings
            Layout::LongMonthClock => {
                let month = s.split_whitespace().next()?;
                if !MONTHS.iter().any(|m| m.eq_ignore_ascii_case(month)) {
                    return None;
                }
                as_utc(NaiveDateTime::parse_from_str(s, "%B %d, %Y %I:%M %p").ok()?)
            }
            Layout::ShortMonthClock => {
                if s.split_whitespace().next()?.len() != 3 {
                    return None;
                }
                as_utc(NaiveDateTime::parse_from_str(s, "%b %d, %Y %I:%M %p").ok()?)
            }
        }
    }
}

/// Removes a leading `Mon,` style weekday, returning the rest.
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(',')?;
    if !WEEKDAYS.iter().any(|w| w.eq_ignore_ascii_case(day)) {
        return None;
    }
    let rest = rest.trim_start();
    (!rest.is_empty()).then_some(rest)
}

/// Parses `s` as `<naive datetime> <ZONE>`.
fn with_zone_name(s: &str, naive_format: &str) -> Option<DateTime<FixedOffset>> {
    let (clock, zone) = s.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(clock.trim_end(), naive_format).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// Offset for a zone abbreviation, per RFC 822 section 5.
fn zone_offset(abbr: &str) -> Option<FixedOffset> {
    let hours = match abbr {
        "UT" | "UTC" | "GMT" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        other if (3..=5).contains(&other.len())
            && other.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            0
        }
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

fn as_utc(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    FixedOffset::east_opt(0)?.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SecondsFormat, Timelike, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at(offset_hours: i32, rfc3339: &str) -> DateTime<FixedOffset> {
        let dt = DateTime::parse_from_rfc3339(rfc3339).unwrap();
        dt.with_timezone(&FixedOffset::east_opt(offset_hours * 3600).unwrap())
    }

    #[test]
    fn test_rfc1123_named_zone() {
        let parsed = normalize("Mon, 02 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!(parsed, at(-7, "2006-01-02T15:04:05-07:00"));
        assert_eq!(parsed.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(parsed.hour(), 15);
    }

    #[test]
    fn test_gmt_is_utc() {
        let parsed = normalize("Tue, 10 Jun 2003 04:00:00 GMT").unwrap();
        assert_eq!(parsed, at(0, "2003-06-10T04:00:00Z"));
    }

    #[test]
    fn test_unknown_abbreviation_reads_as_utc() {
        let parsed = normalize("Mon, 02 Jan 2006 15:04:05 CET").unwrap();
        assert_eq!(parsed.with_timezone(&Utc).to_rfc3339(), "2006-01-02T15:04:05+00:00");
    }

    #[test]
    fn test_rfc1123_numeric_offset() {
        let parsed = normalize("Mon, 02 Jan 2006 15:04:05 +0530").unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(parsed.with_timezone(&Utc).hour(), 9);
    }

    #[test]
    fn test_wrong_weekday_still_parses() {
        // 2 Jan 2006 was a Monday
        let parsed = normalize("Fri, 02 Jan 2006 15:04:05 GMT").unwrap();
        assert_eq!(parsed, at(0, "2006-01-02T15:04:05Z"));
    }

    #[test]
    fn test_misspelled_weekday_rejected() {
        assert!(normalize("Xyz, 02 Jan 2006 15:04:05 GMT").is_err());
    }

    #[test]
    fn test_single_digit_day() {
        let parsed = normalize("Wed, 4 Sep 2024 07:00:00 -0400").unwrap();
        assert_eq!(parsed, at(-4, "2024-09-04T07:00:00-04:00"));
    }

    #[test]
    fn test_rfc822_two_digit_year() {
        let parsed = normalize("02 Jan 06 15:04 PST").unwrap();
        assert_eq!(parsed, at(-8, "2006-01-02T15:04:00-08:00"));
        let parsed = normalize("02 Jan 06 15:04 +0100").unwrap();
        assert_eq!(parsed, at(1, "2006-01-02T15:04:00+01:00"));
    }

    #[test]
    fn test_rfc3339_with_and_without_fraction() {
        let parsed = normalize("2024-03-01T08:30:00Z").unwrap();
        assert_eq!(Layout::Rfc3339.parse("2024-03-01T08:30:00Z"), Some(parsed));

        let nano = normalize("2024-03-01T08:30:00.123456789+02:00").unwrap();
        assert_eq!(nano.nanosecond(), 123_456_789);
        assert_eq!(Layout::Rfc3339.parse("2024-03-01T08:30:00.123456789+02:00"), None);
    }

    #[test]
    fn test_spaced_layouts() {
        let with_offset = normalize("2024-03-01 08:30:00 -0700").unwrap();
        assert_eq!(with_offset, at(-7, "2024-03-01T08:30:00-07:00"));

        let naive = normalize("2024-03-01 08:30:00").unwrap();
        assert_eq!(naive, at(0, "2024-03-01T08:30:00Z"));
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let parsed = normalize("2024-03-01").unwrap();
        assert_eq!(parsed, at(0, "2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_day_month_year_without_weekday() {
        let named = normalize("02 Jan 2006 15:04:05 EST").unwrap();
        assert_eq!(named, at(-5, "2006-01-02T15:04:05-05:00"));
        let numeric = normalize("02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(numeric, at(-7, "2006-01-02T15:04:05-07:00"));
    }

    #[test]
    fn test_human_readable_clock() {
        let long = normalize("January 2, 2006 3:04 PM").unwrap();
        assert_eq!(long, at(0, "2006-01-02T15:04:00Z"));
        let short = normalize("Jan 2, 2006 11:30 am").unwrap();
        assert_eq!(short, at(0, "2006-01-02T11:30:00Z"));
    }

    #[test]
    fn test_clock_layouts_split_on_month_spelling() {
        let short = "Jan 2, 2006 3:04 PM";
        assert_eq!(Layout::LongMonthClock.parse(short), None);
        assert_eq!(
            Layout::ShortMonthClock.parse(short),
            Some(at(0, "2006-01-02T15:04:00Z"))
        );

        let long = "January 2, 2006 3:04 PM";
        assert_eq!(Layout::ShortMonthClock.parse(long), None);
        assert_eq!(
            Layout::LongMonthClock.parse(long),
            Some(at(0, "2006-01-02T15:04:00Z"))
        );
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let parsed = normalize("\n\t  2024-03-01T08:30:00Z \n").unwrap();
        assert_eq!(parsed, at(0, "2024-03-01T08:30:00Z"));
    }

    #[test]
    fn test_unparseable_names_input() {
        let err = normalize("  not a date ").unwrap_err();
        assert_eq!(err, TimestampError::Unparseable("not a date".to_string()));
        assert_eq!(err.to_string(), "unable to parse time: not a date");
    }

    #[test]
    fn test_empty_input_unparseable() {
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn test_out_of_range_fields_rejected() {
        assert!(normalize("2024-13-01").is_err());
        assert!(normalize("Mon, 32 Jan 2006 15:04:05 GMT").is_err());
    }

    /// Renders `dt` in `layout`, returning the text and the instant it denotes
    /// once the layout's precision and zone handling are applied.
    fn render(layout: Layout, dt: DateTime<FixedOffset>) -> (String, DateTime<FixedOffset>) {
        let utc = dt.with_timezone(&FixedOffset::east_opt(0).unwrap());
        let secs = |d: DateTime<FixedOffset>| d.with_nanosecond(0).unwrap();
        let mins = |d: DateTime<FixedOffset>| secs(d).with_second(0).unwrap();
        match layout {
            Layout::Rfc1123 => (utc.format("%a, %d %b %Y %H:%M:%S GMT").to_string(), secs(utc)),
            Layout::Rfc1123Z => (dt.format("%a, %d %b %Y %H:%M:%S %z").to_string(), secs(dt)),
            Layout::Rfc822 => (utc.format("%d %b %y %H:%M GMT").to_string(), mins(utc)),
            Layout::Rfc822Z => (dt.format("%d %b %y %H:%M %z").to_string(), mins(dt)),
            Layout::Rfc3339 => (dt.to_rfc3339_opts(SecondsFormat::Secs, false), secs(dt)),
            Layout::Rfc3339Nano => (dt.to_rfc3339_opts(SecondsFormat::Nanos, false), dt),
            Layout::SpacedOffset => (dt.format("%Y-%m-%d %H:%M:%S %z").to_string(), secs(dt)),
            Layout::Spaced => (utc.format("%Y-%m-%d %H:%M:%S").to_string(), secs(utc)),
            Layout::DateOnly => (
                utc.format("%Y-%m-%d").to_string(),
                mins(utc).with_minute(0).unwrap().with_hour(0).unwrap(),
            ),
            Layout::DayMonthYearZone => {
                (utc.format("%d %b %Y %H:%M:%S GMT").to_string(), secs(utc))
            }
            Layout::DayMonthYearOffset => {
                (dt.format("%d %b %Y %H:%M:%S %z").to_string(), secs(dt))
            }
            Layout::ShortDayZone => {
                (utc.format("%a, %-d %b %Y %H:%M:%S GMT").to_string(), secs(utc))
            }
            Layout::ShortDayOffset => {
                (dt.format("%a, %-d %b %Y %H:%M:%S %z").to_string(), secs(dt))
            }
            Layout::LongMonthClock => {
                (utc.format("%B %-d, %Y %-I:%M %p").to_string(), mins(utc))
            }
            Layout::ShortMonthClock => {
                (utc.format("%b %-d, %Y %-I:%M %p").to_string(), mins(utc))
            }
        }
    }

    proptest! {
        #[test]
        fn prop_every_layout_round_trips(
            layout_idx in 0..LAYOUTS.len(),
            // 1970-01-03 through 2059, inside every two-digit-year window
            secs in 172_800i64..2_840_000_000,
            nanos in 0u32..1_000_000_000,
            offset_minutes in -720i32..=840,
        ) {
            let layout = LAYOUTS[layout_idx];
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let dt = DateTime::from_timestamp(secs, nanos).unwrap().with_timezone(&offset);

            let (text, expected) = render(layout, dt);
            let parsed = normalize(&text);
            prop_assert_eq!(parsed, Ok(expected), "layout {:?} text {:?}", layout, text);
        }
    }
}
