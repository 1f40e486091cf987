//! Schedule repository: lesson queries and the download/parse sync pipeline.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::dates;
use crate::db::{Database, Lesson};
use crate::network::{FetchError, ScheduleApi};
use crate::parser::LessonParser;
use crate::settings::{Settings, SAVED_GROUP};
use crate::status::{Observable, SyncStatus};

const DEFAULT_WORKERS: usize = 3;

/// Outcome of one `update` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub links: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub lessons_stored: usize,
}

enum FileOutcome {
    Parsed(Vec<Lesson>),
    DownloadFailed(FetchError),
    ParseFailed(anyhow::Error),
}

pub struct ScheduleRepository<'a> {
    db: &'a Database,
    api: Arc<dyn ScheduleApi>,
    parser: Arc<dyn LessonParser>,
    settings: Settings,
    status: Observable<SyncStatus>,
    workers: usize,
    link_extensions: Vec<String>,
}

impl<'a> ScheduleRepository<'a> {
    pub fn new(
        db: &'a Database,
        api: Arc<dyn ScheduleApi>,
        parser: Arc<dyn LessonParser>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            api,
            parser,
            settings,
            status: Observable::new(),
            workers: DEFAULT_WORKERS,
            link_extensions: vec!["csv".to_string()],
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_link_extensions(mut self, extensions: Vec<String>) -> Self {
        self.link_extensions = extensions;
        self
    }

    /// Progress of the most recent `update`.
    pub fn status(&self) -> &Observable<SyncStatus> {
        &self.status
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get_groups(&self) -> Result<Vec<String>> {
        self.db.get_groups()
    }

    pub fn get_teachers(&self) -> Result<Vec<String>> {
        self.db.get_teachers()
    }

    pub fn get_subjects(&self, group: &str) -> Result<Vec<String>> {
        self.db.get_subjects_for_group(group)
    }

    /// Lessons on `date` for a group, a teacher, or a group taught by a
    /// teacher. Without either there is nothing to show.
    pub fn get_lessons(
        &self,
        group: Option<&str>,
        teacher: Option<&str>,
        date: NaiveDate,
    ) -> Result<Vec<Lesson>> {
        match (group, teacher) {
            (Some(group), Some(teacher)) => {
                self.db.get_lessons_for_group_with_teacher(date, group, teacher)
            }
            (None, Some(teacher)) => self.db.get_lessons_for_teacher(date, teacher),
            (Some(group), None) => self.db.get_lessons_for_group(date, group),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Remember the selected group across runs. `None` forgets it.
    pub fn save_group(&mut self, group: Option<&str>) -> Result<()> {
        match group {
            Some(group) => self.settings.set_string(SAVED_GROUP, group),
            None => self.settings.remove(SAVED_GROUP),
        }
        self.settings.save()
    }

    pub fn get_saved_group(&self) -> Option<&str> {
        self.settings.saved_group()
    }

    /// Download every schedule file linked from the listing page, parse it
    /// and store the lessons.
    ///
    /// Files are fetched and parsed on a pool of `workers` threads; rows are
    /// written on the calling thread. A failed file is reported through
    /// `status` and the remaining files still run. Nothing is retried.
    pub fn update(&self) -> Result<SyncReport> {
        self.status.post(SyncStatus::queued());

        let links = self.schedule_links();
        let mut report = SyncReport {
            links: links.len(),
            ..Default::default()
        };

        if links.is_empty() {
            warn!("No schedule links to download");
            self.status.post(SyncStatus::download_error(FetchError::NoLinks));
            return Ok(report);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("schedule-download-{}", i))
            .build()?;
        let (tx, rx) = mpsc::channel::<(String, FileOutcome)>();

        for link in links {
            let name = dates::file_name_from_link(&link);
            self.status.post(SyncStatus::downloading(&name));

            let api = Arc::clone(&self.api);
            let parser = Arc::clone(&self.parser);
            let status = self.status.clone();
            let tx = tx.clone();
            pool.spawn(move || {
                // A panic on a pool thread would abort the process.
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    match api.get_schedule_file(&link) {
                        Ok(bytes) => {
                            status.post(SyncStatus::parsing(&name));
                            match parser.parse(&name, &bytes) {
                                Ok(lessons) => FileOutcome::Parsed(lessons),
                                Err(e) => FileOutcome::ParseFailed(e),
                            }
                        }
                        Err(e) => FileOutcome::DownloadFailed(e),
                    }
                }))
                .unwrap_or_else(|_| FileOutcome::ParseFailed(anyhow!("worker panicked on {}", name)));
                let _ = tx.send((link, outcome));
            });
        }
        drop(tx);

        for (link, outcome) in rx {
            let name = dates::file_name_from_link(&link);
            match outcome {
                FileOutcome::Parsed(lessons) => match self.db.insert_lessons(&lessons) {
                    Ok(stored) => {
                        info!(url = %link, lessons = stored, "Schedule file stored");
                        report.succeeded += 1;
                        report.lessons_stored += stored;
                        self.status.post(SyncStatus::done(&name));
                    }
                    Err(e) => {
                        error!(url = %link, error = %e, "Failed to store lessons");
                        report.failed += 1;
                        self.status.post(SyncStatus::parse_error(&name));
                    }
                },
                FileOutcome::DownloadFailed(e) => {
                    error!(url = %link, error = %e, "Schedule download failed");
                    report.failed += 1;
                    self.status.post(SyncStatus::download_error(e));
                }
                FileOutcome::ParseFailed(e) => {
                    error!(url = %link, error = %e, "Schedule parsing failed");
                    report.failed += 1;
                    self.status.post(SyncStatus::parse_error(&name));
                }
            }
        }

        info!(
            links = report.links,
            succeeded = report.succeeded,
            failed = report.failed,
            lessons = report.lessons_stored,
            "Schedule update finished"
        );
        Ok(report)
    }

    /// Links to schedule files on the listing page. A page that cannot be
    /// fetched yields no links.
    fn schedule_links(&self) -> Vec<String> {
        match self.api.get_main_page() {
            Ok(page) => page.links_with_extensions(&self.link_extensions),
            Err(e) => {
                warn!(error = %e, "Could not fetch the schedule page");
                Vec::new()
            }
        }
    }
}
