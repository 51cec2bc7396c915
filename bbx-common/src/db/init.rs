//! Database initialization
//!
//! Opens (or creates) the SQLite warehouse and creates every entity table.
//! Table creation is idempotent and runs on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open the warehouse at `db_path`, creating the file and schema if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all warehouse tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_transcripts_table(pool).await?;
    create_enrollment_table(pool).await?;
    create_parents_table(pool).await?;
    create_transcript_comments_table(pool).await?;
    create_attendance_table(pool).await?;
    create_gpa_table(pool).await?;
    create_course_codes_table(pool).await?;
    Ok(())
}

/// Transcript lines keyed on the compound natural key.
///
/// `grade_id` is part of the key and must never be NULL; ungraded rows carry
/// a sentinel instead.
async fn create_transcripts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcripts (
            student_user_id INTEGER NOT NULL,
            student_first TEXT,
            student_last TEXT,
            grad_year INTEGER,
            course_title TEXT,
            course_code TEXT,
            course_id INTEGER NOT NULL,
            group_description TEXT,
            group_id INTEGER NOT NULL,
            term_name TEXT,
            term_id INTEGER NOT NULL,
            grade_description TEXT,
            grade_mode TEXT,
            grade_id INTEGER NOT NULL,
            grade TEXT,
            score REAL,
            transcript_category TEXT,
            school_year TEXT,
            address_1 TEXT,
            address_2 TEXT,
            address_3 TEXT,
            address_city TEXT,
            address_state TEXT,
            address_zip TEXT,
            PRIMARY KEY (student_user_id, term_id, group_id, course_id, grade_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transcripts_school_year ON transcripts(school_year)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_enrollment_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollment (
            student_user_id INTEGER PRIMARY KEY NOT NULL,
            student_first TEXT,
            student_last TEXT,
            grad_year INTEGER,
            enroll_date TEXT,
            depart_date TEXT,
            graduated INTEGER,
            enroll_grade TEXT,
            enroll_year TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parents (
            email TEXT PRIMARY KEY NOT NULL,
            first_name TEXT,
            last_name TEXT,
            grades TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_transcript_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcript_comments (
            student_user_id INTEGER PRIMARY KEY NOT NULL,
            student_first TEXT,
            student_last TEXT,
            grad_year INTEGER,
            school_year TEXT,
            comment TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only attendance log; re-imports never overwrite an existing id
async fn create_attendance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id INTEGER PRIMARY KEY NOT NULL,
            student_user_id INTEGER,
            student_first TEXT,
            student_last TEXT,
            offering_id INTEGER,
            section_name TEXT,
            attendance_date TEXT,
            excuse_type TEXT,
            excuse_description TEXT,
            comment TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_gpa_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gpa (
            student_user_id INTEGER PRIMARY KEY NOT NULL,
            gpa REAL NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Hand-maintained course-code prefix → transcript category lookup
async fn create_course_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_codes (
            course_prefix TEXT PRIMARY KEY NOT NULL,
            transcript_category TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
