//! Free-text journal parsing: one candidate ski day per line.

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use crate::db::Resort;
use crate::gazetteer::{split_candidates, ResortMatch, ResortMatcher};
use crate::season::SeasonRange;

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("valid regex"));
static NUMERIC_YEAR_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})([./])(\d{1,2})[./](\d{4})\b").expect("valid regex"));
static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTHS}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});
static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\.?\s+{MONTHS}\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});
static SLASH_NO_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("valid regex"));
static DOT_NO_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(?:\s|$)").expect("valid regex"));

/// A date found in a line, with the byte span it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundDate {
    pub date: NaiveDate,
    pub span: Range<usize>,
}

/// Why a line could not become evidence with a full key.
#[derive(Debug, Clone, PartialEq)]
pub enum LineError {
    NoDate,
    NoResort,
    AmbiguousResort(Vec<String>),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::NoDate => f.write_str("no date found"),
            LineError::NoResort => f.write_str("no matching resort"),
            LineError::AmbiguousResort(names) => {
                write!(f, "ambiguous resort: {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// 1-based position in the raw text, counting blank lines.
    pub line_no: usize,
    pub text: String,
    pub date: Option<NaiveDate>,
    pub resort: Option<Resort>,
    pub error: Option<LineError>,
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

/// Month/day from two numbers in US order, flipped when the first cannot be
/// a month.
fn month_day(first: u32, second: u32) -> (u32, u32) {
    if first > 12 {
        (second, first)
    } else {
        (first, second)
    }
}

/// Place a year-less date inside `season`.
fn in_season(month: u32, day: u32, season: &SeasonRange) -> Option<NaiveDate> {
    [season.start.year(), season.end.year()]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .find(|date| season.contains(*date))
}

fn resolve(year: Option<i32>, month: u32, day: u32, season: &SeasonRange) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => in_season(month, day, season),
    }
}

type Extractor = fn(&Captures<'_>, &SeasonRange) -> Option<NaiveDate>;

fn patterns() -> [(&'static LazyLock<Regex>, Extractor); 6] {
    [
        (&ISO, |c, _| NaiveDate::from_ymd_opt(num(c, 1)?, num(c, 2)?, num(c, 3)?)),
        (&NUMERIC_YEAR_LAST, |c, _| {
            let (a, b, year): (u32, u32, i32) = (num(c, 1)?, num(c, 3)?, num(c, 4)?);
            let (month, day) = if c.get(2)?.as_str() == "." {
                (b, a)
            } else {
                month_day(a, b)
            };
            NaiveDate::from_ymd_opt(year, month, day)
        }),
        (&MONTH_FIRST, |c, season| {
            resolve(num(c, 3), month_number(c.get(1)?.as_str())?, num(c, 2)?, season)
        }),
        (&DAY_FIRST, |c, season| {
            resolve(num(c, 3), month_number(c.get(2)?.as_str())?, num(c, 1)?, season)
        }),
        (&SLASH_NO_YEAR, |c, season| {
            let (month, day) = month_day(num(c, 1)?, num(c, 2)?);
            in_season(month, day, season)
        }),
        (&DOT_NO_YEAR, |c, season| in_season(num(c, 2)?, num(c, 1)?, season)),
    ]
}

/// Find the first recognizable date in `line`. Formats are tried from most
/// to least specific; year-less dates are placed inside `season`.
pub fn find_date(line: &str, season: &SeasonRange) -> Option<FoundDate> {
    for (regex, extract) in patterns() {
        for caps in regex.captures_iter(line) {
            if let Some(date) = extract(&caps, season) {
                let whole = caps.get(0)?;
                return Some(FoundDate {
                    date,
                    span: whole.start()..whole.end(),
                });
            }
        }
    }
    None
}

/// Parse one non-blank line into a date and resort.
pub fn parse_line(line_no: usize, text: &str, season: &SeasonRange, matcher: &ResortMatcher) -> ParsedLine {
    let found = find_date(text, season);

    let remainder = match &found {
        Some(found) => format!("{} {}", &text[..found.span.start], &text[found.span.end..]),
        None => text.to_string(),
    };
    let (resort, resort_error) = match matcher.match_any(&split_candidates(&remainder)) {
        ResortMatch::Matched { resort, .. } => (Some(resort), None),
        ResortMatch::Ambiguous { resorts } => (
            None,
            Some(LineError::AmbiguousResort(resorts.into_iter().map(|r| r.name).collect())),
        ),
        ResortMatch::Unmatched => (None, Some(LineError::NoResort)),
    };

    let error = if found.is_none() {
        Some(LineError::NoDate)
    } else {
        resort_error
    };

    ParsedLine {
        line_no,
        text: text.trim().to_string(),
        date: found.map(|f| f.date),
        resort,
        error,
    }
}

/// Parse every non-blank line of `raw`.
pub fn parse_lines(raw: &str, season: &SeasonRange, matcher: &ResortMatcher) -> Vec<ParsedLine> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(index + 1, line, season, matcher))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::DEFAULT_MATCH_THRESHOLD;
    use crate::testutil::date;

    fn season() -> SeasonRange {
        SeasonRange {
            start: date(2023, 9, 1),
            end: date(2024, 8, 31),
        }
    }

    fn resort(id: i64, name: &str) -> Resort {
        Resort {
            id,
            name: name.to_string(),
            country: "US".to_string(),
            latitude: None,
            longitude: None,
            verified: true,
            suggested_by: None,
        }
    }

    fn matcher() -> ResortMatcher {
        ResortMatcher::new(
            vec![
                resort(1, "Aspen Mountain"),
                resort(2, "Aspen Highlands"),
                resort(3, "Zermatt"),
                resort(4, "Big Sky"),
                resort(5, "Big White"),
            ],
            DEFAULT_MATCH_THRESHOLD,
        )
    }

    fn found(line: &str) -> Option<NaiveDate> {
        find_date(line, &season()).map(|f| f.date)
    }

    #[test]
    fn test_find_date_formats() {
        assert_eq!(found("2024-01-15 Aspen"), Some(date(2024, 1, 15)));
        assert_eq!(found("2024/1/5 Aspen"), Some(date(2024, 1, 5)));
        assert_eq!(found("15.01.2024 Zermatt"), Some(date(2024, 1, 15)));
        assert_eq!(found("01/15/2024 Aspen"), Some(date(2024, 1, 15)));
        assert_eq!(found("15/01/2024 Aspen"), Some(date(2024, 1, 15)));
        assert_eq!(found("Jan 15, 2024 at Aspen"), Some(date(2024, 1, 15)));
        assert_eq!(found("15th January 2024 Zermatt"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_find_date_without_year_uses_season() {
        assert_eq!(found("Dec 20 Aspen"), Some(date(2023, 12, 20)));
        assert_eq!(found("January 15th Aspen"), Some(date(2024, 1, 15)));
        assert_eq!(found("02/03 Zermatt"), Some(date(2024, 2, 3)));
        assert_eq!(found("28.11. Zermatt"), Some(date(2023, 11, 28)));
    }

    #[test]
    fn test_find_date_rejects_impossible() {
        assert_eq!(found("2024-13-40 Aspen"), None);
        assert_eq!(found("Aspen was great"), None);
    }

    #[test]
    fn test_parse_line_basic() {
        let parsed = parse_line(1, "2024-01-15 Aspen Mountain", &season(), &matcher());
        assert_eq!(parsed.date, Some(date(2024, 1, 15)));
        assert_eq!(parsed.resort.map(|r| r.id), Some(1));
        assert_eq!(parsed.error, None);
    }

    #[test]
    fn test_parse_line_candidates() {
        let parsed = parse_line(3, "Jan 16 2024, 12 runs, Zermatt", &season(), &matcher());
        assert_eq!(parsed.resort.map(|r| r.id), Some(3));
        assert_eq!(parsed.line_no, 3);
    }

    #[test]
    fn test_parse_line_resort_among_other_words() {
        let parsed = parse_line(1, "2024-01-15 Aspen Highlands powder day", &season(), &matcher());
        assert_eq!(parsed.resort.map(|r| r.id), Some(2));
        assert_eq!(parsed.error, None);
    }

    #[test]
    fn test_parse_line_errors() {
        let no_date = parse_line(1, "Aspen Mountain", &season(), &matcher());
        assert_eq!(no_date.error, Some(LineError::NoDate));
        assert!(no_date.resort.is_some());

        let no_resort = parse_line(1, "2024-01-15 Mount Nowhere", &season(), &matcher());
        assert_eq!(no_resort.error, Some(LineError::NoResort));

        let ambiguous = parse_line(1, "2024-01-15 Big", &season(), &matcher());
        assert!(matches!(ambiguous.error, Some(LineError::AmbiguousResort(ref names)) if names.len() == 2));
    }

    #[test]
    fn test_parse_lines_skips_blanks() {
        let parsed = parse_lines(
            "2024-01-15 Aspen Mountain\n\n   \n2024-01-16 Zermatt\n",
            &season(),
            &matcher(),
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].line_no, 4);
    }
}
