use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use lessonbook::dates;
use lessonbook::export::{self, ExportFormat};
use lessonbook::filters::{NotesFilter, ScheduleFilter};
use lessonbook::logging;
use lessonbook::network::HttpScheduleApi;
use lessonbook::notes::NoteDraft;
use lessonbook::parser::CsvLessonParser;
use lessonbook::{Config, Database, NotesRepository, ScheduleRepository, Settings};

/// Options that take no value.
const SWITCHES: &[&str] = &["--week"];

struct Cli {
    config_path: Option<PathBuf>,
    command: String,
    positional: Vec<String>,
    options: HashMap<String, Vec<String>>,
    switches: Vec<String>,
}

impl Cli {
    fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    fn options(&self, name: &str) -> &[String] {
        self.options.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn date_option(&self, name: &str) -> Result<Option<NaiveDate>> {
        match self.option(name) {
            Some(value) => dates::parse_date(value)
                .map(Some)
                .ok_or_else(|| anyhow!("Invalid date for {}: {} (expected DD.MM.YYYY)", name, value)),
            None => Ok(None),
        }
    }
}

fn parse_args() -> Result<Cli> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = Cli {
        config_path: None,
        command: String::new(),
        positional: Vec::new(),
        options: HashMap::new(),
        switches: Vec::new(),
    };

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("lessonbook {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                let path = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("--config requires a path argument"))?;
                cli.config_path = Some(PathBuf::from(path));
                i += 1;
            }
            _ if SWITCHES.contains(&arg) => cli.switches.push(arg.to_string()),
            _ if arg.starts_with("--") => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("{} requires a value", arg))?;
                cli.options
                    .entry(arg.to_string())
                    .or_default()
                    .push(value.clone());
                i += 1;
            }
            _ if cli.command.is_empty() => cli.command = arg.to_string(),
            _ => cli.positional.push(arg.to_string()),
        }
        i += 1;
    }

    if cli.command.is_empty() {
        print_help();
        std::process::exit(1);
    }

    Ok(cli)
}

fn print_help() {
    println!(
        r#"lessonbook - class schedule and lesson notes

USAGE:
    lessonbook [OPTIONS] COMMAND [ARGS]

COMMANDS:
    sync                                  Download and store the published schedule
    groups                                List known groups
    teachers                              List known teachers
    subjects GROUP                        List subjects of a group
    lessons [--group G] [--teacher T] [--date D] [--week]
                                          Show lessons for a day or its week
    set-group GROUP                       Remember the default group
    notes [--group G] [--from D] [--to D] [--keyword K]
                                          List notes
    note-add --text T [--group G] [--theme X] [--date D] [--photo URI]...
    note-edit ID [--text T] [--theme X] [--date D] [--group G] [--photo URI]...
    note-delete ID...
    export-notes FILE [--group G] [--from D] [--to D] [--keyword K]
                                          Export notes as .csv, .json or .txt

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

Dates are DD.MM.YYYY or YYYY-MM-DD.

ENVIRONMENT:
    LESSONBOOK_CONFIG   Path to config file (overrides default location)
    LESSONBOOK_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/lessonbook/config.toml"#
    );
}

fn main() -> Result<()> {
    let cli = parse_args()?;

    let _ = logging::init(None);

    let config = match &cli.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    let settings = Settings::load(&config.settings_path)?;
    let api = Arc::new(HttpScheduleApi::from_config(&config, settings.caching_enabled()));
    let mut schedule = ScheduleRepository::new(&db, api, Arc::new(CsvLessonParser), settings)
        .with_workers(config.network.workers)
        .with_link_extensions(config.network.link_extensions.clone());
    let notes = NotesRepository::new(&db);

    match cli.command.as_str() {
        "sync" => sync(schedule),
        "groups" => print_list(schedule.get_groups()?),
        "teachers" => print_list(schedule.get_teachers()?),
        "subjects" => {
            let group = cli
                .positional
                .first()
                .ok_or_else(|| anyhow!("subjects requires a group"))?;
            print_list(schedule.get_subjects(group)?)
        }
        "lessons" => show_lessons(&cli, &schedule),
        "set-group" => {
            let group = cli
                .positional
                .first()
                .ok_or_else(|| anyhow!("set-group requires a group"))?;
            schedule.save_group(Some(group))?;
            println!("Default group set to {}", group);
            Ok(())
        }
        "notes" => {
            let filter = notes_filter(&cli, &schedule)?;
            for note in notes.find(&filter)? {
                println!("#{}\n{}", note.id, note);
            }
            Ok(())
        }
        "note-add" => {
            let mut draft = NoteDraft::new(schedule.get_saved_group());
            apply_draft_options(&cli, &mut draft)?;
            let id = draft.save(&notes)?;
            println!("Saved note #{}", id);
            Ok(())
        }
        "note-edit" => {
            let id = parse_id(cli.positional.first().map(String::as_str))?;
            let mut draft = NoteDraft::edit(&notes, id)?;
            apply_draft_options(&cli, &mut draft)?;
            draft.save(&notes)?;
            println!("Updated note #{}", id);
            Ok(())
        }
        "note-delete" => {
            if cli.positional.is_empty() {
                bail!("note-delete requires at least one id");
            }
            let mut selected = Vec::new();
            for raw in &cli.positional {
                let id = parse_id(Some(raw))?;
                match notes.get_note(id)? {
                    Some(note) => selected.push(note),
                    None => eprintln!("No note #{}", id),
                }
            }
            let deleted = notes.delete_notes(&selected);
            println!("Deleted {} note(s)", deleted);
            Ok(())
        }
        "export-notes" => {
            let path = cli
                .positional
                .first()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("export-notes requires an output file"))?;
            let filter = notes_filter(&cli, &schedule)?;
            export_notes(&notes.find(&filter)?, &path)
        }
        other => {
            print_help();
            bail!("Unknown command: {}", other)
        }
    }
}

fn sync(schedule: ScheduleRepository<'_>) -> Result<()> {
    let updates = schedule.status().subscribe();
    let printer = thread::spawn(move || {
        for status in updates {
            println!("[{:>3}%] {}", status.progress, status.text);
        }
    });

    let result = schedule.update();
    // The printer finishes once every status sender is gone.
    drop(schedule);
    let _ = printer.join();

    let report = result?;
    println!(
        "{} file(s): {} stored, {} failed, {} lesson(s)",
        report.links, report.succeeded, report.failed, report.lessons_stored
    );
    Ok(())
}

fn print_list(items: Vec<String>) -> Result<()> {
    for item in items {
        println!("{}", item);
    }
    Ok(())
}

fn show_lessons(cli: &Cli, schedule: &ScheduleRepository<'_>) -> Result<()> {
    let mut filter = ScheduleFilter::new(cli.date_option("--date")?.unwrap_or_else(dates::today));
    filter.group = cli
        .option("--group")
        .or(schedule.get_saved_group())
        .map(str::to_string);
    filter.teacher = cli.option("--teacher").map(str::to_string);

    if filter.group.is_none() && filter.teacher.is_none() {
        bail!("Pass --group or --teacher, or remember a group with set-group");
    }

    let days = if cli.switch("--week") {
        filter.days()
    } else {
        vec![filter.date]
    };

    for day in days {
        let marker = if dates::is_today(day) { " (today)" } else { "" };
        println!("== {}{}", dates::title_for_date(day), marker);
        let lessons =
            schedule.get_lessons(filter.group.as_deref(), filter.teacher.as_deref(), day)?;
        if lessons.is_empty() {
            println!("   no lessons");
        }
        for lesson in lessons {
            println!(
                "{:>3}  {:<12} {:<30} {:<20} {}",
                lesson.lesson_number,
                lesson.times.as_deref().unwrap_or("-"),
                lesson.subject_name,
                lesson.teacher_name.as_deref().unwrap_or(""),
                lesson.room_number.as_deref().unwrap_or(""),
            );
        }
    }
    Ok(())
}

fn notes_filter(cli: &Cli, schedule: &ScheduleRepository<'_>) -> Result<NotesFilter> {
    let today = dates::today();
    let start = cli.date_option("--from")?.unwrap_or(today);
    let end = cli.date_option("--to")?.unwrap_or(start);
    let group = cli
        .option("--group")
        .or(schedule.get_saved_group())
        .map(str::to_string);

    let mut filter = NotesFilter::new(group, start, end);
    filter.keyword = cli.option("--keyword").map(str::to_string);
    Ok(filter)
}

fn apply_draft_options(cli: &Cli, draft: &mut NoteDraft) -> Result<()> {
    if let Some(group) = cli.option("--group") {
        draft.group = Some(group.to_string());
    }
    if let Some(theme) = cli.option("--theme") {
        draft.theme = Some(theme.to_string());
    }
    if let Some(text) = cli.option("--text") {
        draft.text = text.to_string();
    }
    if let Some(date) = cli.date_option("--date")? {
        draft.date = date;
    }
    for photo in cli.options("--photo") {
        draft.add_photo(photo.as_str());
    }
    if draft.text.trim().is_empty() {
        bail!("A note needs --text");
    }
    Ok(())
}

fn parse_id(raw: Option<&str>) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow!("A note id is required"))?;
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| anyhow!("Invalid note id: {}", raw))
}

fn export_notes(notes: &[lessonbook::Note], path: &Path) -> Result<()> {
    let format = ExportFormat::from_path(path);
    let count = export::export_notes(notes, path, format)?;
    println!("Exported {} note(s) to {} ({})", count, path.display(), format.extension());
    Ok(())
}
