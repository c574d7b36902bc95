//! Command-line front end for the student registry.
//!
//! # Responsibility
//! - Map one subcommand onto one `StudentService` operation.
//! - Print results as JSON on stdout and failures on stderr.
//!
//! # Exit codes
//! - `0` success, `1` configuration, storage or output failure, `2` student not found.

use clap::{Parser, Subcommand};
use log::error;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use student_core::db::open_with_config;
use student_core::{
    init_logging, CoreConfig, NewStudent, ScoreInput, SqliteStudentRepository, StudentId,
    StudentPatch, StudentService, StudentServiceError,
};

/// Database file used when neither `--db` nor `$STUDENT_DB_PATH` is set.
const DEFAULT_DB_FILE: &str = "student_registry.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "student_cli")]
#[command(about = "Manage student records and exam scores", version)]
struct Cli {
    /// SQLite database file; defaults to $STUDENT_DB_PATH, else ./student_registry.sqlite3
    #[arg(long)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; defaults to $STUDENT_LOG_DIR
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error; defaults to $STUDENT_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a student; prints `false` when the id is taken
    Add {
        id: StudentId,
        name: String,
        password: String,
    },
    /// Show one student
    Get { id: StudentId },
    /// Delete a student and show the removed record
    Remove { id: StudentId },
    /// Change name and/or password
    Update {
        id: StudentId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Record an exam score; prints `true` when the exam is new for the student
    Score {
        id: StudentId,
        exam: String,
        score: i32,
    },
    /// List students with the given name, ignoring case
    ByName { name: String },
    /// Count students whose name matches any of the given names, ignoring case
    CountNames {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List students scoring at least `min` on `exam`
    ByMinScore { exam: String, min: i32 },
    /// Print core linkage info
    Ping,
}

#[derive(Debug)]
enum CliError {
    Setup(String),
    Service(StudentServiceError),
    Output(serde_json::Error),
}

impl From<StudentServiceError> for CliError {
    fn from(value: StudentServiceError) -> Self {
        Self::Service(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Service(StudentServiceError::NotFound(id))) => {
            eprintln!("student not found: {id}");
            ExitCode::from(2)
        }
        Err(CliError::Service(err)) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
        Err(CliError::Setup(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
        Err(CliError::Output(err)) => {
            error!("event=cli_output module=cli status=error error={err}");
            eprintln!("error: failed to render output: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| CliError::Setup(err.to_string()))?;
    }

    let conn = open_with_config(&config).map_err(|err| CliError::Setup(err.to_string()))?;
    let repo =
        SqliteStudentRepository::try_new(&conn).map_err(|err| CliError::Setup(err.to_string()))?;
    let service = StudentService::new(repo);

    match cli.command {
        Command::Add { id, name, password } => {
            print_json(&service.add_student(&NewStudent { id, name, password })?)
        }
        Command::Get { id } => print_json(&service.find_student(id)?),
        Command::Remove { id } => print_json(&service.remove_student(id)?),
        Command::Update { id, name, password } => {
            print_json(&service.update_student(id, &StudentPatch { name, password })?)
        }
        Command::Score { id, exam, score } => print_json(&service.add_score(
            id,
            &ScoreInput {
                exam_name: exam,
                score,
            },
        )?),
        Command::ByName { name } => print_json(&service.find_students_by_name(&name)?),
        Command::CountNames { names } => {
            let names: BTreeSet<String> = names.into_iter().collect();
            print_json(&service.get_students_quantity_by_names(&names)?)
        }
        Command::ByMinScore { exam, min } => {
            print_json(&service.find_students_by_exam_min_score(&exam, min)?)
        }
        Command::Ping => {
            println!("student_core ping={}", student_core::ping());
            println!("student_core version={}", student_core::core_version());
            Ok(())
        }
    }
}

/// Environment first, then command-line flags on top.
fn resolve_config(cli: &Cli) -> Result<CoreConfig, CliError> {
    apply_flags(cli, CoreConfig::from_env())
}

fn apply_flags(cli: &Cli, mut config: CoreConfig) -> Result<CoreConfig, CliError> {
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    if config.db_path.is_none() {
        config.db_path = Some(PathBuf::from(DEFAULT_DB_FILE));
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config
        .validate()
        .map_err(|err| CliError::Setup(err.to_string()))?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        apply_flags, print_json, resolve_config, Cli, CliError, Command, DEFAULT_DB_FILE,
    };
    use clap::{CommandFactory, Parser};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use student_core::CoreConfig;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_flags_map_to_optional_fields() {
        let cli = Cli::try_parse_from(["student_cli", "update", "7", "--name", "Jane"]).unwrap();
        match cli.command {
            Command::Update { id, name, password } => {
                assert_eq!(id, 7);
                assert_eq!(name.as_deref(), Some("Jane"));
                assert!(password.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn count_names_requires_at_least_one_name() {
        assert!(Cli::try_parse_from(["student_cli", "count-names"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "student_cli",
            "--db",
            "/tmp/flag.sqlite3",
            "--log-level",
            "WARNING",
            "ping",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/flag.sqlite3")));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn database_defaults_to_file_without_flag_or_env() {
        let cli = Cli::try_parse_from(["student_cli", "ping"]).unwrap();
        let config = apply_flags(&cli, CoreConfig::default()).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from(DEFAULT_DB_FILE)));
    }

    #[test]
    fn env_database_path_survives_without_flag() {
        let cli = Cli::try_parse_from(["student_cli", "ping"]).unwrap();
        let base = CoreConfig {
            db_path: Some(PathBuf::from("/var/lib/students.sqlite3")),
            ..CoreConfig::default()
        };
        let config = apply_flags(&cli, base).unwrap();
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/students.sqlite3"))
        );
    }

    #[test]
    fn unrenderable_value_is_an_output_error() {
        let mut by_pair = BTreeMap::new();
        by_pair.insert((1, 2), 3);
        assert!(matches!(print_json(&by_pair), Err(CliError::Output(_))));
    }
}
