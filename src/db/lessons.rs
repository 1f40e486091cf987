//! Lesson rows and their queries.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{date_column, Database};
use crate::dates;

/// One scheduled class session for a group on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub date: NaiveDate,
    pub lesson_number: String,
    pub room_number: Option<String>,
    pub times: Option<String>,
    pub group_name: String,
    pub subject_name: String,
    pub teacher_name: Option<String>,
}

impl Lesson {
    /// Minutes since midnight of the lesson start, read from `times`
    /// (`"8:30-10:00"` gives 510).
    pub fn start_minutes(&self) -> Option<u32> {
        let start = self.times.as_deref()?.split('-').next()?.trim();
        let (hours, minutes) = start.split_once(|c: char| c == ':' || c == '.')?;
        let hours: u32 = hours.trim().parse().ok()?;
        let minutes: u32 = minutes.trim().parse().ok()?;
        Some(hours * 60 + minutes)
    }

    fn order_key(&self) -> (u32, u32) {
        (
            self.start_minutes().unwrap_or(u32::MAX),
            self.lesson_number.trim().parse().unwrap_or(u32::MAX),
        )
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number: {}", self.lesson_number)?;
        writeln!(f, "Subject: {}", self.subject_name)?;
        if let Some(teacher) = self.teacher_name.as_deref().filter(|t| !t.is_empty()) {
            writeln!(f, "Teacher: {}", teacher)?;
        }
        if let Some(room) = self.room_number.as_deref().filter(|r| !r.is_empty()) {
            writeln!(f, "Room: {}", room)?;
        }
        Ok(())
    }
}

const LESSON_COLUMNS: &str = "lessonDate, lessonNumber, roomNumber, lessonTimes, \
                              groupName, subjectName, teacherName";

fn lesson_from_row(row: &Row<'_>) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        date: date_column(row, 0)?,
        lesson_number: row.get(1)?,
        room_number: row.get(2)?,
        times: row.get(3)?,
        group_name: row.get(4)?,
        subject_name: row.get(5)?,
        teacher_name: row.get(6)?,
    })
}

/// SQL orders by the raw times string, which misplaces "10:10" before "8:30",
/// so rows are re-sorted by parsed start time.
fn sort_by_time(mut lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons.sort_by_key(Lesson::order_key);
    lessons
}

impl Database {
    /// Insert a lesson, replacing any row for the same group, date and number.
    pub fn insert_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO tblSchedule ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                LESSON_COLUMNS
            ),
            params![
                dates::to_db(lesson.date),
                lesson.lesson_number,
                lesson.room_number,
                lesson.times,
                lesson.group_name,
                lesson.subject_name,
                lesson.teacher_name,
            ],
        )?;
        Ok(())
    }

    /// Insert a batch of lessons in one transaction and return how many rows
    /// of the batch are left in the table.
    ///
    /// Later rows for the same (group, date, number) slot replace earlier ones
    /// and subject-less rows are purged by the triggers, so the result can be
    /// smaller than `lessons.len()`.
    pub fn insert_lessons(&self, lessons: &[Lesson]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let stored = {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO tblSchedule ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                LESSON_COLUMNS
            ))?;
            for lesson in lessons {
                stmt.execute(params![
                    dates::to_db(lesson.date),
                    lesson.lesson_number,
                    lesson.room_number,
                    lesson.times,
                    lesson.group_name,
                    lesson.subject_name,
                    lesson.teacher_name,
                ])?;
            }

            let slots: BTreeSet<(String, &str, &str)> = lessons
                .iter()
                .map(|l| (dates::to_db(l.date), l.group_name.as_str(), l.lesson_number.as_str()))
                .collect();
            let mut count = tx.prepare(
                "SELECT COUNT(*) FROM tblSchedule \
                 WHERE lessonDate = ? AND groupName = ? AND lessonNumber = ?",
            )?;
            let mut total = 0usize;
            for (date, group, number) in &slots {
                let rows: i64 = count.query_row(params![date, group, number], |row| row.get(0))?;
                total += rows as usize;
            }
            total
        };
        tx.commit()?;

        Ok(stored)
    }

    /// Update room, times and teacher of an existing lesson, matched by its key.
    pub fn update_lesson(&self, lesson: &Lesson) -> Result<usize> {
        let changed = self.conn.execute(
            r#"
            UPDATE tblSchedule
            SET roomNumber = ?, lessonTimes = ?, teacherName = ?
            WHERE lessonDate = ? AND lessonNumber = ? AND groupName = ? AND subjectName = ?
            "#,
            params![
                lesson.room_number,
                lesson.times,
                lesson.teacher_name,
                dates::to_db(lesson.date),
                lesson.lesson_number,
                lesson.group_name,
                lesson.subject_name,
            ],
        )?;
        Ok(changed)
    }

    pub fn get_groups(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT groupName FROM tblSchedule ORDER BY groupName ASC")?;
        let groups = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(groups)
    }

    pub fn get_teachers(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT teacherName FROM tblSchedule
            WHERE teacherName IS NOT NULL AND teacherName != ''
            ORDER BY teacherName ASC
            "#,
        )?;
        let teachers = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(teachers)
    }

    pub fn get_subjects_for_group(&self, group: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT subjectName FROM tblSchedule WHERE groupName = ? ORDER BY subjectName ASC",
        )?;
        let subjects = stmt
            .query_map([group], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(subjects)
    }

    pub fn get_lessons_for_group_with_teacher(
        &self,
        date: NaiveDate,
        group: &str,
        teacher: &str,
    ) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM tblSchedule
            WHERE lessonDate = ? AND groupName = ? AND teacherName LIKE '%' || ? || '%'
            ORDER BY lessonTimes
            "#,
            LESSON_COLUMNS
        ))?;
        let lessons = stmt
            .query_map(params![dates::to_db(date), group, teacher], lesson_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sort_by_time(lessons))
    }

    pub fn get_lessons_for_group(&self, date: NaiveDate, group: &str) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM tblSchedule
            WHERE lessonDate = ? AND groupName = ?
            ORDER BY lessonTimes
            "#,
            LESSON_COLUMNS
        ))?;
        let lessons = stmt
            .query_map(params![dates::to_db(date), group], lesson_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sort_by_time(lessons))
    }

    pub fn get_lessons_for_teacher(&self, date: NaiveDate, teacher: &str) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM tblSchedule
            WHERE lessonDate = ? AND teacherName LIKE '%' || ? || '%'
            ORDER BY lessonTimes
            "#,
            LESSON_COLUMNS
        ))?;
        let lessons = stmt
            .query_map(params![dates::to_db(date), teacher], lesson_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(sort_by_time(lessons))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn lesson(
        date: NaiveDate,
        number: &str,
        times: &str,
        group: &str,
        subject: &str,
        teacher: Option<&str>,
    ) -> Lesson {
        Lesson {
            date,
            lesson_number: number.to_string(),
            room_number: Some("101".to_string()),
            times: Some(times.to_string()),
            group_name: group.to_string(),
            subject_name: subject.to_string(),
            teacher_name: teacher.map(str::to_string),
        }
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    #[test]
    fn test_same_slot_keeps_latest_insert() {
        let db = db();
        db.insert_lesson(&lesson(day(), "1", "8:30-10:00", "G1", "Math", Some("Ivanov")))
            .unwrap();
        db.insert_lesson(&lesson(day(), "1", "8:30-10:00", "G1", "Physics", Some("Petrov")))
            .unwrap();

        let lessons = db.get_lessons_for_group(day(), "G1").unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].subject_name, "Physics");
    }

    #[test]
    fn test_empty_subject_rows_are_purged() {
        let db = db();
        db.insert_lesson(&lesson(day(), "1", "8:30-10:00", "G1", "Math", None)).unwrap();
        db.insert_lesson(&lesson(day(), "2", "10:10-11:40", "G1", "", None)).unwrap();

        let lessons = db.get_lessons_for_group(day(), "G1").unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].lesson_number, "1");
    }

    #[test]
    fn test_empty_subject_replaces_and_removes_slot() {
        let db = db();
        db.insert_lesson(&lesson(day(), "1", "8:30-10:00", "G1", "Math", None)).unwrap();
        db.insert_lesson(&lesson(day(), "1", "8:30-10:00", "G1", "", None)).unwrap();

        assert!(db.get_lessons_for_group(day(), "G1").unwrap().is_empty());
    }

    #[test]
    fn test_batch_count_reflects_replaced_and_purged_rows() {
        let db = db();
        let stored = db
            .insert_lessons(&[
                lesson(day(), "1", "8:30-10:00", "G1", "Math", None),
                lesson(day(), "1", "8:30-10:00", "G1", "Physics", None),
                lesson(day(), "2", "10:10-11:40", "G1", "", None),
                lesson(day(), "3", "11:50-13:20", "G1", "Art", None),
            ])
            .unwrap();

        let rows = db.get_lessons_for_group(day(), "G1").unwrap();
        assert_eq!(stored, 2);
        assert_eq!(rows.len(), stored);
        assert_eq!(rows[0].subject_name, "Physics");
    }

    #[test]
    fn test_lessons_sorted_by_start_time() {
        let db = db();
        db.insert_lessons(&[
            lesson(day(), "3", "11:50-13:20", "G1", "History", None),
            lesson(day(), "1", "8:30-10:00", "G1", "Math", None),
            lesson(day(), "2", "10:10-11:40", "G1", "Physics", None),
            lesson(day(), "1", "8:30-10:00", "G2", "Art", None),
        ])
        .unwrap();

        let numbers: Vec<String> = db
            .get_lessons_for_group(day(), "G1")
            .unwrap()
            .into_iter()
            .map(|l| l.lesson_number)
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_teacher_substring_match() {
        let db = db();
        db.insert_lessons(&[
            lesson(day(), "1", "8:30-10:00", "G1", "Math", Some("Ivanov I.I.")),
            lesson(day(), "2", "10:10-11:40", "G1", "Physics", Some("Petrov P.P.")),
            lesson(day(), "1", "8:30-10:00", "G2", "Math", Some("Ivanov I.I.")),
        ])
        .unwrap();

        assert_eq!(db.get_lessons_for_teacher(day(), "Ivanov").unwrap().len(), 2);
        let both = db.get_lessons_for_group_with_teacher(day(), "G1", "Petrov").unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].subject_name, "Physics");
    }

    #[test]
    fn test_distinct_lists_are_sorted() {
        let db = db();
        db.insert_lessons(&[
            lesson(day(), "1", "8:30-10:00", "G2", "Math", Some("Sidorov")),
            lesson(day(), "2", "10:10-11:40", "G1", "Biology", Some("Abramov")),
            lesson(day(), "3", "11:50-13:20", "G1", "Art", None),
            lesson(day(), "1", "8:30-10:00", "G1", "Math", Some("Sidorov")),
        ])
        .unwrap();

        assert_eq!(db.get_groups().unwrap(), vec!["G1", "G2"]);
        assert_eq!(db.get_teachers().unwrap(), vec!["Abramov", "Sidorov"]);
        assert_eq!(db.get_subjects_for_group("G1").unwrap(), vec!["Art", "Biology", "Math"]);
    }

    #[test]
    fn test_update_lesson_changes_room() {
        let db = db();
        let mut l = lesson(day(), "1", "8:30-10:00", "G1", "Math", None);
        db.insert_lesson(&l).unwrap();

        l.room_number = Some("202".to_string());
        assert_eq!(db.update_lesson(&l).unwrap(), 1);
        let stored = db.get_lessons_for_group(day(), "G1").unwrap();
        assert_eq!(stored[0].room_number.as_deref(), Some("202"));
    }

    #[test]
    fn test_display_skips_empty_teacher_and_room() {
        let mut l = lesson(day(), "2", "10:10-11:40", "G1", "Physics", Some(""));
        l.room_number = None;
        assert_eq!(l.to_string(), "Number: 2\nSubject: Physics\n");
    }

    #[test]
    fn test_start_minutes() {
        let l = lesson(day(), "1", "8:30-10:00", "G1", "Math", None);
        assert_eq!(l.start_minutes(), Some(510));
        let mut unknown = l.clone();
        unknown.times = None;
        assert_eq!(unknown.start_minutes(), None);
    }
}
