//! Note rows and their queries.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{date_column, Database};
use crate::dates;

/// A user note tied to a group and a day, optionally with photos.
///
/// Photo URIs only point at images owned elsewhere; removing a note leaves
/// them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Zero until the note has been stored.
    pub id: i64,
    pub date: NaiveDate,
    pub group: String,
    pub theme: Option<String>,
    pub text: String,
    pub photo_uris: Option<Vec<String>>,
}

impl Note {
    pub fn new(date: NaiveDate, group: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            date,
            group: group.into(),
            theme: None,
            text: text.into(),
            photo_uris: None,
        }
    }

    /// Case-insensitive substring match over theme and text.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.text.to_lowercase().contains(&needle)
            || self
                .theme
                .as_deref()
                .is_some_and(|theme| theme.to_lowercase().contains(&needle))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Date: {}", dates::to_display(self.date))?;
        writeln!(f, "Group: {}", self.group)?;
        writeln!(f, "Theme: {}", self.theme.as_deref().unwrap_or_default())?;
        writeln!(f, "Text: {}", self.text)
    }
}

/// Serialize photo URIs for storage. Empty or absent lists are stored as NULL.
pub fn photo_uris_to_json(uris: Option<&[String]>) -> Option<String> {
    match uris {
        Some(uris) if !uris.is_empty() => serde_json::to_string(uris).ok(),
        _ => None,
    }
}

/// Read stored photo URIs. Malformed JSON reads as `None`.
pub fn photo_uris_from_json(value: Option<&str>) -> Option<Vec<String>> {
    value.and_then(|json| serde_json::from_str(json).ok())
}

/// Days bound per `IN (...)` lookup; SQLite's default variable limit is 999.
const MAX_DAYS_PER_QUERY: usize = 500;

const NOTE_COLUMNS: &str = "id, noteDate, noteGroup, noteTheme, noteText, notePhotoIDs";

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let photos: Option<String> = row.get(5)?;
    Ok(Note {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        group: row.get(2)?,
        theme: row.get(3)?,
        text: row.get(4)?,
        photo_uris: photo_uris_from_json(photos.as_deref()),
    })
}

impl Database {
    /// Store a note and return its id. A note with a non-zero id replaces the
    /// stored row with that id.
    pub fn insert_note(&self, note: &Note) -> Result<i64> {
        let photos = photo_uris_to_json(note.photo_uris.as_deref());
        if note.id == 0 {
            self.conn.execute(
                r#"
                INSERT INTO tblNote (noteDate, noteGroup, noteTheme, noteText, notePhotoIDs)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![dates::to_db(note.date), note.group, note.theme, note.text, photos],
            )?;
        } else {
            self.conn.execute(
                &format!("INSERT OR REPLACE INTO tblNote ({}) VALUES (?, ?, ?, ?, ?, ?)", NOTE_COLUMNS),
                params![note.id, dates::to_db(note.date), note.group, note.theme, note.text, photos],
            )?;
        }
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_note(&self, note: &Note) -> Result<usize> {
        let changed = self.conn.execute(
            r#"
            UPDATE tblNote
            SET noteDate = ?, noteGroup = ?, noteTheme = ?, noteText = ?, notePhotoIDs = ?
            WHERE id = ?
            "#,
            params![
                dates::to_db(note.date),
                note.group,
                note.theme,
                note.text,
                photo_uris_to_json(note.photo_uris.as_deref()),
                note.id,
            ],
        )?;
        Ok(changed)
    }

    pub fn delete_note(&self, note: &Note) -> Result<usize> {
        let changed = self.conn.execute("DELETE FROM tblNote WHERE id = ?", [note.id])?;
        Ok(changed)
    }

    pub fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM tblNote WHERE id = ?", NOTE_COLUMNS),
            [id],
            note_from_row,
        );
        match result {
            Ok(note) => Ok(Some(note)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_notes(&self, date: NaiveDate, group: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tblNote WHERE noteDate = ? AND noteGroup = ? ORDER BY id",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map(params![dates::to_db(date), group], note_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(notes)
    }

    /// Notes of `group` on any of `days`, ordered by date then id.
    ///
    /// A run of consecutive days is queried as one `BETWEEN` range; scattered
    /// days are looked up in chunks that stay under SQLite's variable limit.
    pub fn get_notes_for_days(&self, days: &[NaiveDate], group: &str) -> Result<Vec<Note>> {
        let mut days = days.to_vec();
        days.sort_unstable();
        days.dedup();

        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            return Ok(Vec::new());
        };
        let contiguous = days.windows(2).all(|pair| pair[0].succ_opt() == Some(pair[1]));

        if contiguous {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM tblNote WHERE noteDate BETWEEN ? AND ? AND noteGroup = ? \
                 ORDER BY noteDate, id",
                NOTE_COLUMNS
            ))?;
            let notes = stmt
                .query_map(
                    params![dates::to_db(*first), dates::to_db(*last), group],
                    note_from_row,
                )?
                .filter_map(|r| r.ok())
                .collect();
            return Ok(notes);
        }

        let mut notes = Vec::new();
        for chunk in days.chunks(MAX_DAYS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM tblNote WHERE noteDate IN ({}) AND noteGroup = ?",
                NOTE_COLUMNS, placeholders
            ))?;

            let mut values: Vec<String> = chunk.iter().map(|d| dates::to_db(*d)).collect();
            values.push(group.to_string());

            notes.extend(
                stmt.query_map(params_from_iter(values), note_from_row)?
                    .filter_map(|r| r.ok()),
            );
        }
        notes.sort_by_key(|note| (note.date, note.id));
        Ok(notes)
    }

    /// Notes of a group whose theme or text contains `keyword`, newest first.
    ///
    /// SQLite's LIKE only folds ASCII case, so matching happens here instead.
    pub fn get_notes_by_keyword(&self, keyword: &str, group: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tblNote WHERE noteGroup = ? ORDER BY noteDate DESC, id DESC",
            NOTE_COLUMNS
        ))?;
        let notes = stmt
            .query_map([group], note_from_row)?
            .filter_map(|r| r.ok())
            .filter(|note| note.matches_keyword(keyword))
            .collect();
        Ok(notes)
    }
}
