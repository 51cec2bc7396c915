//! bbextract - school-records extractor
//!
//! Pulls advanced lists, attendance and the academic calendar from the
//! vendor API and reconciles them into the SQLite warehouse. Every fatal
//! error exits non-zero; nothing is retried automatically.

use anyhow::{Context, Result};
use bbx_common::config::{resolve_config_path, TomlConfig};
use bbx_common::db::init_database;
use bbx_common::AcademicYear;
use bbx_extract::commands;
use bbx_extract::config::resolve_auth_path;
use bbx_extract::reconcile::{ENROLLMENT, TRANSCRIPT_COMMENTS};
use bbx_extract::services::SkyClient;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bbextract")]
#[command(about = "Extract school records into the reporting warehouse")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "BBX_CONFIG")]
    config: Option<PathBuf>,

    /// Vendor auth JSON file
    #[arg(long, env = "BBX_AUTH")]
    auth: Option<PathBuf>,

    /// Warehouse database file (overrides [database] path)
    #[arg(long, env = "BBX_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile transcripts for the current academic year
    Transcripts {
        /// Academic year start (requires --end-year)
        #[arg(long, requires = "end_year")]
        start_year: Option<i32>,
        /// Academic year end
        #[arg(long)]
        end_year: Option<i32>,
    },
    /// Upsert transcript comments
    Comments,
    /// Upsert parent emails with their students' grade levels
    Parents,
    /// Upsert enrollment records
    Enrollment,
    /// Append today's attendance
    Attendance,
    /// Recompute GPA from stored transcripts
    Gpa,
    /// Load course-code prefixes from a TOML file
    CourseCodes {
        file: PathBuf,
    },
}

impl Command {
    fn needs_vendor(&self) -> bool {
        !matches!(self, Command::Gpa | Command::CourseCodes { .. })
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(cli: &Cli) -> Result<TomlConfig> {
    match resolve_config_path(cli.config.as_deref()) {
        Ok(path) => Ok(TomlConfig::load(&path)?),
        Err(e) if !cli.command.needs_vendor() => {
            eprintln!("{}; using defaults", e);
            Ok(TomlConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fail on missing list ids before any network or database activity
fn check_config(command: &Command, config: &TomlConfig) -> Result<()> {
    match command {
        Command::Transcripts { .. } => {
            config.transcript_list_ids()?;
        }
        Command::Comments => {
            config.transcript_comments_id()?;
        }
        Command::Parents => {
            config.parents_list_id()?;
        }
        Command::Enrollment => {
            config.enrollment_list_id()?;
        }
        Command::Attendance => {
            config.attendance_level_ids()?;
        }
        Command::Gpa | Command::CourseCodes { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("Unable to load config")?;
    init_logging(&config.logging.level);
    info!("Starting bbextract v{}", env!("CARGO_PKG_VERSION"));

    check_config(&cli.command, &config)?;

    let client = if cli.command.needs_vendor() {
        let auth_path = resolve_auth_path(cli.auth.as_deref());
        info!("Auth file: {}", auth_path.display());
        let client = SkyClient::connect(auth_path)
            .await
            .context("Unable to access vendor API")?;
        Some(client)
    } else {
        None
    };

    let db_path = cli.database.clone().unwrap_or_else(|| config.database.path.clone());
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Unable to connect to DB")?;

    match (&cli.command, client) {
        (Command::Transcripts { start_year, end_year }, Some(client)) => {
            let year = match (start_year, end_year) {
                (Some(start), Some(end)) => AcademicYear::new(*start, *end),
                (None, Some(end)) => AcademicYear::ending(*end),
                _ => client
                    .academic_year()
                    .await
                    .context("Unable to get current academic year")?,
            };
            info!(school_year = %year, "Processing transcripts");
            let list_ids = config.transcript_list_ids()?.to_vec();
            match commands::run_transcripts(&pool, Arc::new(client), &list_ids, year).await? {
                Some(summary) => info!(
                    upserted = summary.upsert.written,
                    "Finished transcripts"
                ),
                None => warn!("No transcript rows fetched"),
            }
        }
        (Command::Comments, Some(client)) => {
            let list_id = config.transcript_comments_id()?;
            let outcome =
                commands::run_entity_list(&pool, &client, list_id, &TRANSCRIPT_COMMENTS).await?;
            info!(written = outcome.written, "Finished transcript comments");
        }
        (Command::Enrollment, Some(client)) => {
            let list_id = config.enrollment_list_id()?;
            let outcome = commands::run_entity_list(&pool, &client, list_id, &ENROLLMENT).await?;
            info!(written = outcome.written, "Finished enrollment");
        }
        (Command::Parents, Some(client)) => {
            let year = client
                .academic_year()
                .await
                .context("Unable to get current academic year")?;
            let list_id = config.parents_list_id()?;
            let outcome = commands::run_parents(&pool, &client, list_id, year).await?;
            info!(written = outcome.written, "Finished parents");
        }
        (Command::Attendance, Some(client)) => {
            let day = chrono::Local::now().date_naive();
            let records =
                commands::fetch_attendance(&client, config.attendance_level_ids()?, day).await;
            let outcome = commands::store_attendance(&pool, records).await?;
            info!(written = outcome.written, day = %day, "Finished attendance");
        }
        (Command::Gpa, _) => {
            let students = commands::run_gpa(&pool).await?;
            info!(students, "Finished GPA calculations");
        }
        (Command::CourseCodes { file }, _) => {
            let written = commands::run_course_codes(&pool, file)
                .await
                .with_context(|| format!("Unable to load course codes from {}", file.display()))?;
            info!(written, "Finished course codes");
        }
        (command, None) => {
            anyhow::bail!("{:?} requires a vendor connection", command);
        }
    }

    pool.close().await;
    Ok(())
}
