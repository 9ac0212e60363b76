//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Timelike};
use chrono_tz::Tz;

/// Locales with translated month and weekday names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    En,
    #[default]
    PtBr,
}

impl Locale {
    /// Parse a language tag such as `pt-br`, `pt_BR` or `en-US`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.to_ascii_lowercase().replace('_', "-");
        match tag.as_str() {
            "pt-br" | "pt" => Some(Locale::PtBr),
            "en" | "en-us" | "en-gb" => Some(Locale::En),
            _ => None,
        }
    }

    fn months(self) -> &'static [&'static str; 12] {
        match self {
            Locale::En => &[
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ],
            Locale::PtBr => &[
                "janeiro",
                "fevereiro",
                "março",
                "abril",
                "maio",
                "junho",
                "julho",
                "agosto",
                "setembro",
                "outubro",
                "novembro",
                "dezembro",
            ],
        }
    }

    fn months_short(self) -> &'static [&'static str; 12] {
        match self {
            Locale::En => &[
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ],
            Locale::PtBr => &[
                "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
            ],
        }
    }

    /// Weekday names starting from Sunday
    fn weekdays(self) -> &'static [&'static str; 7] {
        match self {
            Locale::En => &[
                "Sunday",
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
            ],
            Locale::PtBr => &[
                "domingo",
                "segunda-feira",
                "terça-feira",
                "quarta-feira",
                "quinta-feira",
                "sexta-feira",
                "sábado",
            ],
        }
    }

    fn weekdays_short(self) -> &'static [&'static str; 7] {
        match self {
            Locale::En => &["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            Locale::PtBr => &["dom", "seg", "ter", "qua", "qui", "sex", "sáb"],
        }
    }
}

/// Moment.js tokens we understand, longest first so `MMMM` wins over `MM`
const TOKENS: [&str; 17] = [
    "YYYY", "MMMM", "dddd", "MMM", "ddd", "YY", "MM", "DD", "HH", "hh", "mm", "ss", "M", "D",
    "H", "h", "A",
];

/// Formats CMS timestamps with a Moment.js-compatible pattern in a fixed
/// locale and time zone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    pub fn new(pattern: &str, locale: Locale, timezone: Tz) -> Self {
        Self {
            pattern: pattern.to_string(),
            locale,
            timezone,
        }
    }

    /// Format a raw CMS timestamp; `None` when it cannot be parsed
    pub fn format(&self, raw: &str) -> Option<String> {
        let date = parse_timestamp(raw)?;
        Some(format_date(
            &date.with_timezone(&self.timezone),
            &self.pattern,
            self.locale,
        ))
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new("DD MMM YYYY", Locale::PtBr, Tz::UTC)
    }
}

/// Parse a Prismic timestamp
///
/// Prismic emits `2021-03-15T19:25:28+0000`, which is not RFC 3339 because of
/// the missing colon in the offset, so both shapes are accepted.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Format a date using a Moment.js-compatible format string
///
/// Text inside `[...]` is copied verbatim.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", Locale::PtBr) // -> "15 mar 2021"
/// ```
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str, locale: Locale) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            match rest.find(']') {
                Some(end) => {
                    out.push_str(&rest[1..end]);
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push_str(&rest[1..]);
                    rest = "";
                }
            }
            continue;
        }

        match TOKENS.iter().find(|token| rest.starts_with(**token)) {
            Some(token) => {
                out.push_str(&render_token(date, token, locale));
                rest = &rest[token.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out
}

fn render_token<Tz2: TimeZone>(date: &DateTime<Tz2>, token: &str, locale: Locale) -> String {
    let month = date.month0() as usize;
    let weekday = date.weekday().num_days_from_sunday() as usize;
    let hour12 = match date.hour() % 12 {
        0 => 12,
        h => h,
    };

    match token {
        "YYYY" => format!("{:04}", date.year()),
        "YY" => format!("{:02}", date.year().rem_euclid(100)),
        "MMMM" => locale.months()[month].to_string(),
        "MMM" => locale.months_short()[month].to_string(),
        "MM" => format!("{:02}", date.month()),
        "M" => date.month().to_string(),
        "DD" => format!("{:02}", date.day()),
        "D" => date.day().to_string(),
        "dddd" => locale.weekdays()[weekday].to_string(),
        "ddd" => locale.weekdays_short()[weekday].to_string(),
        "HH" => format!("{:02}", date.hour()),
        "H" => date.hour().to_string(),
        "hh" => format!("{:02}", hour12),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", date.minute()),
        "ss" => format!("{:02}", date.second()),
        "A" => (if date.hour() < 12 { "AM" } else { "PM" }).to_string(),
        _ => token.to_string(),
    }
}
