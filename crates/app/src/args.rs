use std::collections::HashMap;
use std::fmt;

use lms_core::model::{Context, EntryId, Percent, ProjectId, UserId};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCommand,
    MissingOperand { command: &'static str, what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidProject { raw: String },
    InvalidUser { raw: String },
    InvalidEntryId { raw: String },
    InvalidPercent { raw: String },
    InvalidPageScore { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCommand => write!(f, "no command given"),
            ArgsError::MissingOperand { command, what } => {
                write!(f, "{command} requires {what}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidProject { raw } => write!(f, "invalid --project value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidEntryId { raw } => write!(f, "invalid entry id: {raw:?}"),
            ArgsError::InvalidPercent { raw } => {
                write!(f, "invalid percent (expected 0-100): {raw}")
            }
            ArgsError::InvalidPageScore { raw } => {
                write!(f, "invalid page score (expected <page_id>=<percent>): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Courses,
    Course(EntryId),
    Paths,
    Progress(Vec<EntryId>),
    CompleteLesson { lesson: EntryId, percent: Percent },
    ScorePages(HashMap<EntryId, Percent>),
    DeleteCourse(EntryId),
}

#[derive(Debug, Clone)]
pub struct Args {
    pub db_url: String,
    pub project: ProjectId,
    pub user: UserId,
    pub command: Command,
}

impl Args {
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new(self.project.clone(), self.user.clone())
    }

    /// Reads `LMS_DB_URL`, `LMS_PROJECT_ID` and `LMS_USER_ID`, then applies
    /// flags from `args` on top.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite:lms.sqlite3?mode=rwc".into());
        let mut project = std::env::var("LMS_PROJECT_ID")
            .ok()
            .and_then(|value| value.parse::<ProjectId>().ok())
            .unwrap_or_else(|| ProjectId::new("demo"));
        let mut user = std::env::var("LMS_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new("admin"));

        let mut args = args.into_iter();
        let mut positional = Vec::new();
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
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        Ok(Self {
            db_url,
            project,
            user,
            command: parse_command(positional)?,
        })
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn entry_id(raw: &str) -> Result<EntryId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidEntryId {
        raw: raw.to_owned(),
    })
}

fn percent(raw: &str) -> Result<Percent, ArgsError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| Percent::new(v).ok())
        .ok_or_else(|| ArgsError::InvalidPercent {
            raw: raw.to_owned(),
        })
}

fn parse_command(positional: Vec<String>) -> Result<Command, ArgsError> {
    let mut words = positional.into_iter();
    let name = words.next().ok_or(ArgsError::MissingCommand)?;
    let rest: Vec<String> = words.collect();

    let single_id = |command: &'static str| -> Result<EntryId, ArgsError> {
        match rest.as_slice() {
            [id] => entry_id(id),
            [] => Err(ArgsError::MissingOperand {
                command,
                what: "an entry id",
            }),
            [_, extra, ..] => Err(ArgsError::UnknownArg(extra.clone())),
        }
    };

    match name.as_str() {
        "courses" => Ok(Command::Courses),
        "paths" => Ok(Command::Paths),
        "course" => single_id("course").map(Command::Course),
        "delete-course" => single_id("delete-course").map(Command::DeleteCourse),
        "progress" => {
            if rest.is_empty() {
                return Err(ArgsError::MissingOperand {
                    command: "progress",
                    what: "at least one entry id",
                });
            }
            rest.iter()
                .map(|raw| entry_id(raw))
                .collect::<Result<_, _>>()
                .map(Command::Progress)
        }
        "complete-lesson" => match rest.as_slice() {
            [lesson, value] => Ok(Command::CompleteLesson {
                lesson: entry_id(lesson)?,
                percent: percent(value)?,
            }),
            [lesson] => Ok(Command::CompleteLesson {
                lesson: entry_id(lesson)?,
                percent: Percent::FULL,
            }),
            _ => Err(ArgsError::MissingOperand {
                command: "complete-lesson",
                what: "<lesson_id> [percent]",
            }),
        },
        "score-pages" => {
            if rest.is_empty() {
                return Err(ArgsError::MissingOperand {
                    command: "score-pages",
                    what: "at least one <page_id>=<percent>",
                });
            }
            rest.iter()
                .map(|raw| {
                    let (id, value) = raw
                        .split_once('=')
                        .ok_or_else(|| ArgsError::InvalidPageScore { raw: raw.clone() })?;
                    Ok((entry_id(id)?, percent(value)?))
                })
                .collect::<Result<HashMap<_, _>, ArgsError>>()
                .map(Command::ScorePages)
        }
        _ => Err(ArgsError::UnknownCommand(name)),
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lms [options] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  courses                          List courses with their learning paths");
    eprintln!("  course <id>                      Show a course and the user's progress in it");
    eprintln!("  paths                            List learning paths");
    eprintln!("  progress <id>...                 Stored percents of the given entries");
    eprintln!("  complete-lesson <id> [percent]   Store lesson progress and roll it up (default 100)");
    eprintln!("  score-pages <id>=<percent>...    Store page scores");
    eprintln!("  delete-course <id>               Delete a course with everything it owns");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:lms.sqlite3?mode=rwc)");
    eprintln!("  --project <id>            Project id (default: demo)");
    eprintln!("  --user <id>               User id (default: admin)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags, also read from .env):");
    eprintln!("  LMS_DB_URL, LMS_PROJECT_ID, LMS_USER_ID, RUST_LOG");
}
