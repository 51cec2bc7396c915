//! GPA recomputation
//!
//! Credit-weighted mean score per student over qualifying transcript rows,
//! upserted into `gpa`. Reads whatever the last reconciliation committed.

use crate::reconcile::sentinel::{labels, sql_literal_list, SCHEDULED_GRADE_ID};
use bbx_common::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Grades that count toward GPA
pub const VALID_GPA_GRADES: [&str; 14] = [
    "A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "D-", "F", "P",
];

pub const YEAR_LONG_CREDITS: f64 = 2.0;
pub const TERM_CREDITS: f64 = 1.0;

fn gpa_sql() -> String {
    format!(
        r#"
        INSERT INTO gpa (student_user_id, gpa, updated_at)
        SELECT student_user_id,
               ROUND(SUM(score * credits) / SUM(credits), 2),
               CURRENT_TIMESTAMP
        FROM (
            SELECT student_user_id,
                   score,
                   CASE WHEN grade_description = ? THEN ? ELSE ? END AS credits
            FROM transcripts
            WHERE (grade_description IS NULL OR grade_description NOT IN ({halves}))
              AND grade_id != ?
              AND score IS NOT NULL
              AND grade IN ({grades})
        )
        WHERE true
        GROUP BY student_user_id
        ON CONFLICT (student_user_id) DO UPDATE SET
            gpa = excluded.gpa,
            updated_at = excluded.updated_at
        "#,
        halves = sql_literal_list(&labels::YEAR_LONG_HALVES),
        grades = sql_literal_list(&VALID_GPA_GRADES),
    )
}

/// Recompute every student's GPA; returns the number of students written
pub async fn recalculate_gpa(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(&gpa_sql())
        .bind(labels::YEAR_LONG)
        .bind(YEAR_LONG_CREDITS)
        .bind(TERM_CREDITS)
        .bind(SCHEDULED_GRADE_ID)
        .execute(pool)
        .await?;

    info!(students = result.rows_affected(), "GPA recalculated");
    Ok(result.rows_affected())
}

/// Stored GPA for one student
pub async fn load_gpa(pool: &SqlitePool, student_user_id: i64) -> Result<Option<f64>> {
    let gpa = sqlx::query_scalar("SELECT gpa FROM gpa WHERE student_user_id = ?")
        .bind(student_user_id)
        .fetch_optional(pool)
        .await?;
    Ok(gpa)
}
