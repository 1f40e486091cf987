//! Transient selection state for the schedule and notes views.

use chrono::{Datelike, Duration, NaiveDate};

use crate::dates;

/// Which group, teacher and week the schedule view is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub group: Option<String>,
    pub teacher: Option<String>,
    pub date: NaiveDate,
}

impl ScheduleFilter {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            group: None,
            teacher: None,
            date,
        }
    }

    pub fn next_week(&mut self) {
        self.date += Duration::weeks(1);
    }

    pub fn previous_week(&mut self) {
        self.date -= Duration::weeks(1);
    }

    /// Study days (Monday to Saturday) of the selected week.
    pub fn days(&self) -> Vec<NaiveDate> {
        dates::week_of(self.date)
    }

    pub fn year(&self) -> i32 {
        self.date.iso_week().year()
    }

    pub fn week(&self) -> u32 {
        self.date.iso_week().week()
    }
}

/// What the notes view should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesQuery {
    /// No group selected yet.
    None,
    Keyword { group: String, keyword: String },
    Dates { group: String, dates: Vec<NaiveDate> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesFilter {
    pub group: Option<String>,
    pub keyword: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl NotesFilter {
    pub fn new(group: Option<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            group,
            keyword: None,
            start,
            end,
        }
    }

    /// A keyword search replaces the date range until the keyword is cleared.
    pub fn query(&self) -> NotesQuery {
        let Some(group) = self.group.clone() else {
            return NotesQuery::None;
        };

        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => NotesQuery::Keyword {
                group,
                keyword: keyword.to_string(),
            },
            _ => NotesQuery::Dates {
                group,
                dates: dates::date_range(self.start, self.end),
            },
        }
    }
}
