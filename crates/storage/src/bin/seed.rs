use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lms_core::model::schema::{DEFAULT_LOCALE, elements, models};
use lms_core::model::{Element, ElementValue, EntryId, ProjectId};
use storage::repository::{NewEntry, Storage};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    project: ProjectId,
    course_name: String,
    sections: u32,
    lessons: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidProject { raw: String },
    InvalidSections { raw: String },
    InvalidLessons { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidProject { raw } => write!(f, "invalid --project value: {raw}"),
            ArgsError::InvalidSections { raw } => write!(f, "invalid --sections value: {raw}"),
            ArgsError::InvalidLessons { raw } => write!(f, "invalid --lessons value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_count(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|n| *n > 0)
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:lms.sqlite3?mode=rwc".into());
        let mut project = std::env::var("LMS_PROJECT_ID")
            .ok()
            .and_then(|value| value.parse::<ProjectId>().ok())
            .unwrap_or_else(|| ProjectId::new("demo"));
        let mut course_name = "Getting started".to_owned();
        let mut sections = 2;
        let mut lessons = 3;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--project" => {
                    let value = require_value(&mut args, "--project")?;
                    project = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidProject { raw: value.clone() })?;
                }
                "--course-name" => {
                    course_name = require_value(&mut args, "--course-name")?;
                }
                "--sections" => {
                    let value = require_value(&mut args, "--sections")?;
                    sections = parse_count(&value)
                        .ok_or_else(|| ArgsError::InvalidSections { raw: value.clone() })?;
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    lessons = parse_count(&value)
                        .ok_or_else(|| ArgsError::InvalidLessons { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            project,
            course_name,
            sections,
            lessons,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:lms.sqlite3?mode=rwc)");
    eprintln!("  --project <id>            Project to seed (default: demo)");
    eprintln!("  --course-name <name>      Course name (default: Getting started)");
    eprintln!("  --sections <n>            Sections in the course (default: 2)");
    eprintln!("  --lessons <n>             Lessons per section (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_PROJECT_ID");
}

fn text(api_name: &str, value: impl Into<String>) -> Element {
    Element::new(api_name, ElementValue::text(DEFAULT_LOCALE, value))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let entries = &storage.entries;
    let project = &args.project;
    let now = args.now.unwrap_or_else(Utc::now);

    let question = entries
        .create_entry(
            project,
            NewEntry::new(models::QUESTIONS, "question_1", "Which keyword declares a binding?")
                .created_at(now)
                .element(text(elements::VARIANTS_OF_ANSWERS, r#"["let","var","def"]"#))
                .element(text(elements::CORRECT_ANSWERS, r#"["let"]"#)),
        )
        .await?;
    let quiz = entries
        .create_entry(
            project,
            NewEntry::new(models::QUIZZES, "quiz_1", "Warm-up quiz")
                .created_at(now)
                .element(Element::references(elements::QUESTIONS, [&question])),
        )
        .await?;
    let category = entries
        .create_entry(
            project,
            NewEntry::new(models::LESSON_CATEGORIES, "category_basics", "Basics").created_at(now),
        )
        .await?;

    let mut section_ids: Vec<EntryId> = Vec::new();
    for s in 0..args.sections {
        let mut lesson_ids: Vec<EntryId> = Vec::new();
        for l in 0..args.lessons {
            let label = format!("{}.{}", s + 1, l + 1);
            let page = entries
                .create_entry(
                    project,
                    NewEntry::new(models::PAGES, format!("page_{label}"), format!("Page {label}"))
                        .created_at(now)
                        .element(Element::references(elements::QUIZZES, [&quiz])),
                )
                .await?;
            let lesson = entries
                .create_entry(
                    project,
                    NewEntry::new(
                        models::LESSONS,
                        format!("lesson_{label}"),
                        format!("Lesson {label}"),
                    )
                    .created_at(now)
                    .element(text(elements::LESSON_ORDER, (l + 1).to_string()))
                    .element(text(elements::LESSON_DESCRIPTION, format!("About lesson {label}")))
                    .element(Element::references(elements::LESSON_PAGES, [&page]))
                    .element(Element::references(elements::LESSON_CATEGORIES, [&category])),
                )
                .await?;
            lesson_ids.push(lesson);
        }

        let section = entries
            .create_entry(
                project,
                NewEntry::new(
                    models::SECTIONS,
                    format!("section_{}", s + 1),
                    format!("Section {}", s + 1),
                )
                .created_at(now + Duration::seconds(i64::from(s)))
                .element(text(elements::SECTION_DESCRIPTION, ""))
                .element(Element::references(elements::LESSONS, &lesson_ids)),
            )
            .await?;
        section_ids.push(section);
    }

    let path_id = EntryId::new(uuid::Uuid::new_v4().to_string());
    let course_order = format!(r#"{{"{path_id}": 1}}"#);
    let course = entries
        .create_entry(
            project,
            NewEntry::new(models::COURSES, "course_1", args.course_name.clone())
                .created_at(now)
                .element(Element::new(
                    elements::COURSE_DURATION,
                    ElementValue::Number(f64::from(args.sections * args.lessons * 15)),
                ))
                .element(text(elements::COURSE_DESCRIPTION, "A seeded demo course"))
                .element(text(elements::COURSE_ORDER, course_order))
                .element(Element::references(elements::SECTIONS, &section_ids)),
        )
        .await?;
    entries
        .create_entry(
            project,
            NewEntry::new(models::LEARNING_PATHS, "path_1", "Foundations")
                .with_id(path_id.clone())
                .created_at(now)
                .element(text(elements::LP_DESCRIPTION, "Start here"))
                .element(Element::references(elements::COURSES, [&course])),
        )
        .await?;

    println!(
        "Seeded course {course} ({} sections x {} lessons) and learning path {path_id} into {} for project {}",
        args.sections, args.lessons, args.db_url, args.project
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
