pub const SCHEMA: &str = r#"
-- Lessons parsed from the published schedule files
CREATE TABLE IF NOT EXISTS tblSchedule (
    lessonDate TEXT NOT NULL,          -- ISO date (YYYY-MM-DD)
    lessonNumber TEXT NOT NULL,
    roomNumber TEXT,
    lessonTimes TEXT,                  -- e.g. '8:30-10:00'
    groupName TEXT NOT NULL,
    subjectName TEXT NOT NULL,
    teacherName TEXT,
    PRIMARY KEY (lessonDate, lessonNumber, groupName, subjectName)
);

CREATE INDEX IF NOT EXISTS idx_schedule_group_date ON tblSchedule(groupName, lessonDate);
CREATE INDEX IF NOT EXISTS idx_schedule_date ON tblSchedule(lessonDate);

-- User notes attached to a group and day
CREATE TABLE IF NOT EXISTS tblNote (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    noteDate TEXT NOT NULL,            -- ISO date (YYYY-MM-DD)
    noteGroup TEXT NOT NULL,
    noteTheme TEXT,
    noteText TEXT NOT NULL,
    notePhotoIDs TEXT                  -- JSON array of photo URIs
);

CREATE INDEX IF NOT EXISTS idx_note_group_date ON tblNote(noteGroup, noteDate);
"#;

/// Triggers that keep one row per (group, date, lesson number) and drop
/// placeholder rows without a subject.
pub const TRIGGERS: &[&str] = &[
    r#"
    CREATE TRIGGER IF NOT EXISTS update_day_stage1
    BEFORE INSERT ON tblSchedule
    BEGIN
        DELETE FROM tblSchedule WHERE groupName = NEW.groupName AND
                                      lessonDate = NEW.lessonDate AND
                                      lessonNumber = NEW.lessonNumber;
    END;
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS update_day_stage2
    AFTER INSERT ON tblSchedule
    BEGIN
        DELETE FROM tblSchedule WHERE subjectName = '';
    END;
    "#,
];
