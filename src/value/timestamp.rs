use std::fmt;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use smol_str::SmolStr;

/// A `!!timestamp` value. Date-times are naive and normalized to UTC; the
/// offset they were written with lives in [`TimestampFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timestamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// How a date-time was written, so it can be written back the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TimestampFormat {
    /// `T`, `t`, or the blanks between date and time.
    pub separator: SmolStr,
    pub fraction_digits: usize,
    /// Zone text as written, leading blanks included.
    pub zone: Option<SmolStr>,
    /// Seconds east of UTC.
    pub offset: i32,
}

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<year>[0-9]{4})-(?P<month>[0-9]{1,2})-(?P<day>[0-9]{1,2})",
            r"(?:(?P<sep>[Tt]|[ \t]+)(?P<hour>[0-9]{1,2}):(?P<minute>[0-9]{2}):(?P<second>[0-9]{2})",
            r"(?:\.(?P<fraction>[0-9]*))?",
            r"(?P<zone>[ \t]*(?:Z|(?P<tz_sign>[-+])(?P<tz_hour>[0-9]{1,2})(?::(?P<tz_minute>[0-9]{2}))?))?)?$",
        ))
        .expect("built-in timestamp pattern")
    })
}

impl Timestamp {
    /// Parses the scalar text of a timestamp node. `None` when the text does
    /// not name a real calendar date or time.
    pub fn parse(text: &str) -> Option<(Timestamp, TimestampFormat)> {
        let captures = timestamp_regex().captures(text)?;
        let number = |name: &str| -> Option<u32> { captures.name(name)?.as_str().parse().ok() };
        let year: i32 = captures.name("year")?.as_str().parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)?;
        let Some(separator) = captures.name("sep") else {
            return Some((Timestamp::Date(date), TimestampFormat::default()));
        };
        let fraction = captures.name("fraction").map(|m| m.as_str()).unwrap_or("");
        let mut nanos: u32 = 0;
        for (index, digit) in fraction.bytes().take(9).enumerate() {
            nanos += u32::from(digit - b'0') * 10u32.pow(8 - index as u32);
        }
        let time =
            NaiveTime::from_hms_nano_opt(number("hour")?, number("minute")?, number("second")?, nanos)?;
        let mut offset: i32 = 0;
        if let Some(sign) = captures.name("tz_sign") {
            let hours = number("tz_hour")? as i32;
            let minutes = number("tz_minute").unwrap_or(0) as i32;
            offset = hours * 3600 + minutes * 60;
            if sign.as_str() == "-" {
                offset = -offset;
            }
        }
        let utc = date.and_time(time) - Duration::seconds(i64::from(offset));
        let format = TimestampFormat {
            separator: SmolStr::new(separator.as_str()),
            fraction_digits: fraction.len(),
            zone: captures.name("zone").map(|m| SmolStr::new(m.as_str())),
            offset,
        };
        Some((Timestamp::DateTime(utc), format))
    }

    /// ISO text. Without a format, date-times use a space separator and the
    /// shortest of no, six or nine fraction digits.
    pub fn format(&self, format: Option<&TimestampFormat>) -> String {
        let datetime = match self {
            Timestamp::Date(date) => return format_date(*date),
            Timestamp::DateTime(datetime) => *datetime,
        };
        let (local, separator) = match format {
            Some(format) => (
                datetime + Duration::seconds(i64::from(format.offset)),
                format.separator.as_str(),
            ),
            None => (datetime, " "),
        };
        let mut out = format_date(local.date());
        out.push_str(if separator.is_empty() { " " } else { separator });
        out.push_str(&format!(
            "{:02}:{:02}:{:02}",
            local.hour(),
            local.minute(),
            local.second()
        ));
        let nanos = local.nanosecond();
        let digits = match format {
            Some(format) if format.fraction_digits > 0 => format.fraction_digits.min(9),
            _ if nanos == 0 => 0,
            _ if nanos % 1000 == 0 => 6,
            _ => 9,
        };
        if digits > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(&fraction[..digits]);
        }
        if let Some(zone) = format.and_then(|format| format.zone.as_deref()) {
            out.push_str(zone);
        }
        out
    }
}

impl Timestamp {
    /// ISO 8601 text in UTC with a `T` separator.
    pub fn to_iso8601(&self) -> String {
        match self {
            Timestamp::Date(date) => format_date(*date),
            Timestamp::DateTime(_) => {
                let format = TimestampFormat {
                    separator: SmolStr::new_static("T"),
                    ..TimestampFormat::default()
                };
                self.format(Some(&format))
            }
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(None))
    }
}
