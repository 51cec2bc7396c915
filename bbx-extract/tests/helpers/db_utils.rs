//! Database test utilities

use anyhow::Result;
use bbx_common::db::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary warehouse with every table in place
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_warehouse.db");
    let pool = init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Row count of a table
pub async fn count_rows(pool: &SqlitePool, table_name: &str) -> Result<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table_name))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn seed_course_code(pool: &SqlitePool, prefix: &str, category: &str) -> Result<()> {
    sqlx::query("INSERT INTO course_codes (course_prefix, transcript_category) VALUES (?, ?)")
        .bind(prefix)
        .bind(category)
        .execute(pool)
        .await?;
    Ok(())
}

/// Abort any UPDATE that writes `grade_id` into a transcript row
pub async fn fail_updates_to_grade_id(pool: &SqlitePool, grade_id: i64) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TRIGGER fail_grade_id_{grade_id} BEFORE UPDATE ON transcripts \
         WHEN NEW.grade_id = {grade_id} \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END"
    ))
    .execute(pool)
    .await?;
    Ok(())
}
