//! Calendar helpers shared by the repositories, filters and CLI.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Column format used in the database. ISO ordering keeps `ORDER BY` chronological.
pub const DB_FORMAT: &str = "%Y-%m-%d";
/// Format shown to users and accepted on input.
pub const DISPLAY_FORMAT: &str = "%d.%m.%Y";
/// Format used when naming photos taken for a note.
pub const PHOTO_FORMAT: &str = "%d_%m_%Y";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn to_db(date: NaiveDate) -> String {
    date.format(DB_FORMAT).to_string()
}

pub fn from_db(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DB_FORMAT).ok()
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

pub fn to_photo_name(date: NaiveDate) -> String {
    date.format(PHOTO_FORMAT).to_string()
}

/// Parse a user supplied date in either `dd.MM.yyyy` or ISO form.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DISPLAY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, DB_FORMAT))
        .ok()
}

/// Inclusive sequence of days from `start` to `end`.
///
/// When `end` is not after `start` the sequence is just `start`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if end <= start {
        return vec![start];
    }
    start.iter_days().take_while(|day| *day <= end).collect()
}

pub fn is_same_day(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year()
        && date.month() == reference.month()
        && date.day() == reference.day()
}

pub fn is_today(date: NaiveDate) -> bool {
    is_same_day(date, today())
}

/// Zero padded `DD/MM` title for a day.
pub fn title_for_date(date: NaiveDate) -> String {
    format!("{:02}/{:02}", date.day(), date.month())
}

/// Last non-empty path segment of a link.
pub fn file_name_from_link(link: &str) -> String {
    link.split('/')
        .filter(|part| !part.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Monday through Saturday of the week containing `date`.
pub fn week_of(date: NaiveDate) -> Vec<NaiveDate> {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (0..6).map(|offset| monday + Duration::days(offset)).collect()
}
