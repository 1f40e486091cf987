//! Turning downloaded schedule files into lesson rows.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::dates;
use crate::db::Lesson;

/// Converts one downloaded schedule file into lessons.
pub trait LessonParser: Send + Sync {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Lesson>>;
}

/// Parser for comma separated schedule exports with a header row:
/// `date,number,room,times,group,subject,teacher`.
///
/// Dates may be `dd.MM.yyyy` or ISO. Rows whose date cannot be read are
/// skipped; a file without the required columns is an error.
#[derive(Debug, Clone, Default)]
pub struct CsvLessonParser;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    number: String,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    times: Option<String>,
    group: String,
    subject: String,
    #[serde(default)]
    teacher: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LessonParser for CsvLessonParser {
    fn parse(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Lesson>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .with_context(|| format!("{} has no header row", file_name))?
            .clone();
        for required in ["date", "number", "group", "subject"] {
            if !headers.iter().any(|h| h == required) {
                return Err(anyhow!("{} is missing the '{}' column", file_name, required));
            }
        }

        let mut lessons = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(file = file_name, line = line + 2, error = %e, "Skipping malformed row");
                    continue;
                }
            };
            let Some(date) = dates::parse_date(&row.date) else {
                tracing::warn!(file = file_name, line = line + 2, date = %row.date, "Skipping row with bad date");
                continue;
            };
            lessons.push(Lesson {
                date,
                lesson_number: row.number,
                room_number: non_empty(row.room),
                times: non_empty(row.times),
                group_name: row.group,
                subject_name: row.subject,
                teacher_name: non_empty(row.teacher),
            });
        }

        tracing::debug!(file = file_name, lessons = lessons.len(), "Parsed schedule file");
        Ok(lessons)
    }
}
