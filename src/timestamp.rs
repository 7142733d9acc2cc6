use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%b %d %I:%M %p %Y",
    "%b %d %H:%M %Y",
    "%B %d %I:%M %p %Y",
    "%B %d %H:%M %Y",
    "%b %d %Y %I:%M %p",
    "%b %d %Y %H:%M",
    "%m/%d %I:%M %p %Y",
    "%m/%d %H:%M %Y",
    "%m/%d %H%M %Y",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d %Y", "%B %d %Y", "%m/%d %Y", "%m/%d/%Y"];

const ZONE_ABBREVIATIONS: &[&str] = &[
    "UTC", "GMT", "Z", "MST", "MDT", "PST", "PDT", "CST", "CDT", "EST", "EDT", "AKST", "AKDT",
    "HST",
];

/// Resolve a row's date (and optional separate time) text into a timestamp.
pub fn resolve_timestamp(
    date: &str,
    time: Option<&str>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    let time = time.map(str::trim).filter(|t| !t.is_empty());

    // Only the date part can carry the year: compact times such as `2015`
    // look like one.
    let current_year = now.year().to_string();
    let dated = date.contains(&current_year) || has_explicit_year(date);
    let with_year = |year: i32| -> String {
        let year = year.to_string();
        let mut text = if dated {
            date.replace(&current_year, &year)
        } else {
            date.to_string()
        };
        if let Some(time) = time {
            text.push(' ');
            text.push_str(time);
        }
        if !dated {
            text.push(' ');
            text.push_str(&year);
        }
        text
    };

    match parse_datetime(&with_year(now.year())) {
        Some(ts) if ts <= now => Some(ts),
        _ => parse_datetime(&with_year(now.year() - 1)),
    }
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = clean(text);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn clean(text: &str) -> String {
    let upper = text.replace(',', " ").to_ascii_uppercase();
    let mut tokens: Vec<String> = Vec::new();
    for token in upper.split_whitespace() {
        if ZONE_ABBREVIATIONS.contains(&token) {
            continue;
        }
        match split_meridiem(token) {
            Some((clock, meridiem)) => {
                tokens.push(clock.to_string());
                tokens.push(meridiem.to_string());
            }
            None => tokens.push(token.to_string()),
        }
    }
    tokens.join(" ")
}

fn split_meridiem(token: &str) -> Option<(&str, &str)> {
    for meridiem in ["AM", "PM"] {
        if let Some(clock) = token.strip_suffix(meridiem) {
            if clock.ends_with(|c: char| c.is_ascii_digit()) {
                return Some((clock, meridiem));
            }
        }
    }
    None
}

fn has_explicit_year(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .any(|year| (1900..=2100).contains(&year))
}
