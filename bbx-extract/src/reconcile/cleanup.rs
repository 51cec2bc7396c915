//! Pre-upsert cleanup of sentinel rows left by earlier runs
//!
//! Clears the keys the upcoming upsert needs and drops corrective tags so
//! they never outlive the run that produced them. Sentinel deletion is
//! bounded to the five academic years ending at the run's end year; older
//! rows are treated as final.

use super::sentinel::{
    labels, FALL_TERM_YL_GRADE_ID, NONSTANDARD_PAIRING_GRADE_ID, NO_YEARLONG_GRADE_ID,
    PROMOTED_FALL_GRADE_ID, SCHEDULED_GRADE_ID,
};
use bbx_common::AcademicYear;
use sqlx::SqliteConnection;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    /// Delete corrective tags and senior mid-term rows inside the window
    PurgeSentinels,
    /// Restore promoted fall rows from non-current years
    RevertPromotedFall,
    /// Delete every scheduled placeholder
    DeleteScheduled,
}

impl CleanupStep {
    pub const ALL: [CleanupStep; 3] = [
        CleanupStep::PurgeSentinels,
        CleanupStep::RevertPromotedFall,
        CleanupStep::DeleteScheduled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CleanupStep::PurgeSentinels => "purge_sentinels",
            CleanupStep::RevertPromotedFall => "revert_promoted_fall",
            CleanupStep::DeleteScheduled => "delete_scheduled",
        }
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub purged: u64,
    pub reverted: u64,
    pub scheduled_deleted: u64,
}

/// Run one cleanup step, returning the number of rows it touched
pub async fn run_step(
    step: CleanupStep,
    conn: &mut SqliteConnection,
    year: &AcademicYear,
) -> sqlx::Result<u64> {
    match step {
        CleanupStep::PurgeSentinels => purge_sentinels(conn, year).await,
        CleanupStep::RevertPromotedFall => revert_promoted_fall(conn, year).await,
        CleanupStep::DeleteScheduled => delete_scheduled(conn).await,
    }
}

async fn purge_sentinels(conn: &mut SqliteConnection, year: &AcademicYear) -> sqlx::Result<u64> {
    let mut purged = 0;
    for school_year in year.cleanup_window() {
        let result = sqlx::query(
            r#"
            DELETE FROM transcripts
            WHERE (grade_id IN (?, ?, ?) OR grade_description = ?)
              AND school_year = ?
            "#,
        )
        .bind(NO_YEARLONG_GRADE_ID)
        .bind(NONSTANDARD_PAIRING_GRADE_ID)
        .bind(PROMOTED_FALL_GRADE_ID)
        .bind(labels::SENIOR_MID_TERM)
        .bind(&school_year)
        .execute(&mut *conn)
        .await?;

        debug!(
            school_year = %school_year,
            deleted = result.rows_affected(),
            "Purged sentinel rows"
        );
        purged += result.rows_affected();
    }
    Ok(purged)
}

/// Promotion is only valid for the current year. A reverted row may land
/// on a key already held by its vendor twin, which it replaces.
async fn revert_promoted_fall(
    conn: &mut SqliteConnection,
    year: &AcademicYear,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE OR REPLACE transcripts
        SET grade_description = ?, grade_id = ?
        WHERE grade_id = ? AND school_year IS NOT ?
        "#,
    )
    .bind(labels::FALL_TERM_YL)
    .bind(FALL_TERM_YL_GRADE_ID)
    .bind(PROMOTED_FALL_GRADE_ID)
    .bind(year.school_year())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

async fn delete_scheduled(conn: &mut SqliteConnection) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM transcripts WHERE grade_id = ?")
        .bind(SCHEDULED_GRADE_ID)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
