//! Notes repository plus the editing and selection state used around it.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::dates;
use crate::db::{Database, Note};
use crate::filters::{NotesFilter, NotesQuery};

pub struct NotesRepository<'a> {
    db: &'a Database,
}

impl<'a> NotesRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new note and return its id.
    pub fn save_note(&self, note: &Note) -> Result<i64> {
        let id = self.db.insert_note(note)?;
        debug!(id, group = %note.group, "Note saved");
        Ok(id)
    }

    pub fn update_note(&self, note: &Note) -> Result<()> {
        if self.db.update_note(note)? == 0 {
            return Err(anyhow!("Note {} does not exist", note.id));
        }
        Ok(())
    }

    pub fn get_note(&self, id: i64) -> Result<Option<Note>> {
        self.db.get_note(id)
    }

    /// Notes of `group` on the given days, ordered by date.
    pub fn get_notes_for_dates(&self, group: &str, days: &[NaiveDate]) -> Result<Vec<Note>> {
        match days {
            [day] => self.db.get_notes(*day, group),
            _ => self.db.get_notes_for_days(days, group),
        }
    }

    pub fn get_notes_by_keyword(&self, group: &str, keyword: &str) -> Result<Vec<Note>> {
        self.db.get_notes_by_keyword(keyword, group)
    }

    /// Run whatever query the notes filter currently resolves to.
    pub fn find(&self, filter: &NotesFilter) -> Result<Vec<Note>> {
        match filter.query() {
            NotesQuery::None => Ok(Vec::new()),
            NotesQuery::Keyword { group, keyword } => self.get_notes_by_keyword(&group, &keyword),
            NotesQuery::Dates { group, dates } => self.get_notes_for_dates(&group, &dates),
        }
    }

    /// Delete each note on its own; a failure is logged and the rest still go.
    /// Returns how many notes were removed.
    pub fn delete_notes<'n>(&self, notes: impl IntoIterator<Item = &'n Note>) -> usize {
        let mut deleted = 0;
        for note in notes {
            match self.db.delete_note(note) {
                Ok(count) => deleted += count,
                Err(e) => warn!(id = note.id, error = %e, "Failed to delete note"),
            }
        }
        deleted
    }
}

/// Notes picked in a list, keyed by their position in it.
#[derive(Debug, Clone, Default)]
pub struct NoteSelection {
    selected: BTreeMap<usize, Note>,
}

impl NoteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the note at `position`, or unselect it if already selected.
    /// Returns whether it is selected afterwards.
    pub fn toggle(&mut self, position: usize, note: &Note) -> bool {
        if self.selected.remove(&position).is_some() {
            false
        } else {
            self.selected.insert(position, note.clone());
            true
        }
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.selected.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected notes in list order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.selected.values()
    }

    /// Take the selected notes, leaving the selection empty.
    pub fn take(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.selected).into_values().collect()
    }
}

/// A note being created or edited.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    id: Option<i64>,
    pub date: NaiveDate,
    pub group: Option<String>,
    pub theme: Option<String>,
    pub text: String,
    pub photo_uris: Vec<String>,
}

impl NoteDraft {
    /// A blank note for today, pre-filled with the remembered group.
    pub fn new(saved_group: Option<&str>) -> Self {
        Self {
            id: None,
            date: dates::today(),
            group: saved_group.map(str::to_string),
            theme: None,
            text: String::new(),
            photo_uris: Vec::new(),
        }
    }

    /// Load an existing note for editing.
    pub fn edit(repository: &NotesRepository<'_>, id: i64) -> Result<Self> {
        let note = repository
            .get_note(id)?
            .ok_or_else(|| anyhow!("Note {} does not exist", id))?;
        Ok(Self {
            id: Some(note.id),
            date: note.date,
            group: Some(note.group),
            theme: note.theme,
            text: note.text,
            photo_uris: note.photo_uris.unwrap_or_default(),
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_edited(&self) -> bool {
        self.id.is_some()
    }

    pub fn add_photo(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if !self.photo_uris.contains(&uri) {
            self.photo_uris.push(uri);
        }
    }

    pub fn remove_photo(&mut self, uri: &str) {
        self.photo_uris.retain(|u| u != uri);
    }

    /// Suggested themes: the subjects the selected group studies.
    pub fn theme_suggestions(&self, db: &Database) -> Result<Vec<String>> {
        match &self.group {
            Some(group) => db.get_subjects_for_group(group),
            None => Ok(Vec::new()),
        }
    }

    fn to_note(&self) -> Result<Note> {
        let group = self
            .group
            .clone()
            .filter(|g| !g.trim().is_empty())
            .ok_or_else(|| anyhow!("A note needs a group"))?;
        Ok(Note {
            id: self.id.unwrap_or(0),
            date: self.date,
            group,
            theme: self.theme.clone().filter(|t| !t.trim().is_empty()),
            text: self.text.clone(),
            photo_uris: (!self.photo_uris.is_empty()).then(|| self.photo_uris.clone()),
        })
    }

    /// Insert a new note or update the loaded one. Returns the note id.
    pub fn save(&mut self, repository: &NotesRepository<'_>) -> Result<i64> {
        let note = self.to_note()?;
        match self.id {
            Some(id) => {
                repository.update_note(&note)?;
                Ok(id)
            }
            None => {
                let id = repository.save_note(&note)?;
                self.id = Some(id);
                Ok(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lessons::tests::lesson;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
    }

    #[test]
    fn test_single_and_multi_day_lookup() {
        let db = db();
        let repo = NotesRepository::new(&db);
        repo.save_note(&Note::new(d(2), "G1", "b")).unwrap();
        repo.save_note(&Note::new(d(1), "G1", "a")).unwrap();

        assert_eq!(repo.get_notes_for_dates("G1", &[d(1)]).unwrap().len(), 1);
        let both = repo.get_notes_for_dates("G1", &[d(2), d(1)]).unwrap();
        assert_eq!(both.iter().map(|n| n.text.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_find_uses_filter() {
        let db = db();
        let repo = NotesRepository::new(&db);
        repo.save_note(&Note::new(d(1), "G1", "Exam on monday")).unwrap();
        repo.save_note(&Note::new(d(5), "G1", "homework")).unwrap();

        let mut filter = NotesFilter::new(Some("G1".to_string()), d(1), d(3));
        assert_eq!(repo.find(&filter).unwrap().len(), 1);

        filter.keyword = Some("EXAM".to_string());
        filter.start = d(5);
        filter.end = d(5);
        let found = repo.find(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "Exam on monday");

        filter.group = None;
        assert!(repo.find(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_find_over_two_centuries() {
        let db = db();
        let repo = NotesRepository::new(&db);
        repo.save_note(&Note::new(d(1), "G1", "kept")).unwrap();
        repo.save_note(&Note::new(d(1), "G2", "other group")).unwrap();

        let filter = NotesFilter::new(
            Some("G1".to_string()),
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
        );
        let found = repo.find(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "kept");
    }

    #[test]
    fn test_batch_delete_is_independent() {
        let db = db();
        let repo = NotesRepository::new(&db);
        let mut kept = Note::new(d(1), "G1", "kept");
        kept.id = repo.save_note(&kept).unwrap();
        let mut gone = Note::new(d(1), "G1", "gone");
        gone.id = repo.save_note(&gone).unwrap();
        let never_stored = Note {
            id: 999,
            ..Note::new(d(1), "G1", "ghost")
        };

        assert_eq!(repo.delete_notes([&gone, &never_stored]), 1);
        assert!(repo.get_note(gone.id).unwrap().is_none());
        assert!(repo.get_note(kept.id).unwrap().is_some());
    }

    #[test]
    fn test_update_missing_note_fails() {
        let db = db();
        let repo = NotesRepository::new(&db);
        let note = Note {
            id: 7,
            ..Note::new(d(1), "G1", "x")
        };
        assert!(repo.update_note(&note).is_err());
    }

    #[test]
    fn test_selection_by_position() {
        let first = Note::new(d(1), "G1", "first");
        let second = Note::new(d(2), "G1", "second");
        let mut selection = NoteSelection::new();

        assert!(selection.toggle(3, &second));
        assert!(selection.toggle(0, &first));
        assert!(selection.is_selected(3));
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.notes().next().unwrap().text, "first");

        assert!(!selection.toggle(3, &second));
        let taken = selection.take();
        assert_eq!(taken.len(), 1);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_draft_save_then_edit_keeps_id() {
        let db = db();
        let repo = NotesRepository::new(&db);

        let mut draft = NoteDraft::new(Some("G1"));
        draft.text = "Lab report".to_string();
        draft.add_photo("content://media/7");
        draft.add_photo("content://media/7");
        let id = draft.save(&repo).unwrap();
        assert!(draft.is_edited());

        let mut editing = NoteDraft::edit(&repo, id).unwrap();
        assert_eq!(editing.photo_uris, vec!["content://media/7"]);
        editing.theme = Some("Chemistry".to_string());
        editing.text = "Lab report, part 2".to_string();
        editing.date = d(20);
        editing.remove_photo("content://media/7");
        assert_eq!(editing.save(&repo).unwrap(), id);

        let stored = repo.get_note(id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.theme.as_deref(), Some("Chemistry"));
        assert_eq!(stored.text, "Lab report, part 2");
        assert_eq!(stored.date, d(20));
        assert_eq!(stored.photo_uris, None);
    }

    #[test]
    fn test_draft_requires_group() {
        let db = db();
        let repo = NotesRepository::new(&db);
        let mut draft = NoteDraft::new(None);
        draft.text = "orphan".to_string();
        assert!(draft.save(&repo).is_err());
    }

    #[test]
    fn test_theme_suggestions_from_subjects() {
        let db = db();
        db.insert_lessons(&[
            lesson(d(1), "1", "8:30-10:00", "G1", "Math", None),
            lesson(d(1), "2", "10:10-11:40", "G1", "Art", None),
        ])
        .unwrap();

        let draft = NoteDraft::new(Some("G1"));
        assert_eq!(draft.theme_suggestions(&db).unwrap(), vec!["Art", "Math"]);
        assert!(NoteDraft::new(None).theme_suggestions(&db).unwrap().is_empty());
    }
}
