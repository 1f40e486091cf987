//! Writing notes out for sharing: CSV, JSON, or the plain text used in share messages.

use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::dates;
use crate::db::Note;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }

    /// Pick a format from a file name, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("json") => ExportFormat::Json,
            Some("txt") => ExportFormat::Text,
            _ => ExportFormat::Csv,
        }
    }
}

/// Flat note row for export
#[derive(Debug, Serialize)]
struct ExportedNote<'a> {
    id: i64,
    date: String,
    group: &'a str,
    theme: &'a str,
    text: &'a str,
    photos: String,
}

impl<'a> From<&'a Note> for ExportedNote<'a> {
    fn from(note: &'a Note) -> Self {
        Self {
            id: note.id,
            date: dates::to_display(note.date),
            group: &note.group,
            theme: note.theme.as_deref().unwrap_or_default(),
            text: &note.text,
            photos: note.photo_uris.as_deref().unwrap_or_default().join(" "),
        }
    }
}

/// Write notes to a file and return how many were written.
pub fn export_notes(notes: &[Note], output_path: &Path, format: ExportFormat) -> Result<usize> {
    let file = File::create(output_path)?;
    match format {
        ExportFormat::Json => {
            let rows: Vec<ExportedNote<'_>> = notes.iter().map(ExportedNote::from).collect();
            serde_json::to_writer_pretty(file, &rows)?;
        }
        ExportFormat::Csv => notes_to_csv(notes, file)?,
        ExportFormat::Text => {
            let mut file = file;
            file.write_all(share_text(notes).as_bytes())?;
        }
    }
    Ok(notes.len())
}

/// CSV with columns `id,date,group,theme,text,photos`.
pub fn notes_to_csv<W: Write>(notes: &[Note], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for note in notes {
        writer.serialize(ExportedNote::from(note))?;
    }
    writer.flush()?;
    Ok(())
}

/// Plain text for sharing: each note's summary, separated by blank lines.
pub fn share_text(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|note| note.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn notes() -> Vec<Note> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut first = Note::new(date, "G1", "Read, then summarise");
        first.id = 1;
        first.theme = Some("History".to_string());
        first.photo_uris = Some(vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        let mut second = Note::new(date, "G1", "Bring ruler");
        second.id = 2;
        vec![first, second]
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        notes_to_csv(&notes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,date,group,theme,text,photos");
        assert_eq!(lines[1], "1,04.03.2024,G1,History,\"Read, then summarise\",a.jpg b.jpg");
        assert_eq!(lines[2], "2,04.03.2024,G1,,Bring ruler,");
    }

    #[test]
    fn test_share_text() {
        let text = share_text(&notes());
        assert!(text.starts_with("Date: 04.03.2024\nGroup: G1\nTheme: History\n"));
        assert!(text.contains("\n\nDate: 04.03.2024\nGroup: G1\nTheme: \nText: Bring ruler\n"));
    }

    #[test]
    fn test_export_to_file_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let format = ExportFormat::from_path(&path);
        assert_eq!(format, ExportFormat::Json);

        assert_eq!(export_notes(&notes(), &path, format).unwrap(), 2);
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[1]["text"], "Bring ruler");
    }
}
