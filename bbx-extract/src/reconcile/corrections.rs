//! Corrective transform pipeline
//!
//! Four set-based statements run after the upsert, inside the same
//! transaction, in the fixed order of [`CorrectionStep::PIPELINE`]:
//!
//! 1. `FixNoYearlong` retags a year-long half that has no partner row.
//! 2. `FixNonstandardGrades` retags pairs mixing letter and non-letter grades.
//! 3. `FixFallYearlongs` promotes current-year fall halves.
//! 4. `BackfillTranscriptCategories` fills `NaN` categories by longest
//!    course-code prefix.
//!
//! Step 2 relies on step 1 having run against the same row set, and step 3
//! relies on both pairing fixes having resolved ambiguous groups. Each step
//! only matches rows in its input state, so re-running it is a no-op.

use super::sentinel::{
    labels, sql_literal_list, GradeId, MISSING_CATEGORY, NON_LETTER_GRADES, SCHEDULED_GRADE_ID,
};
use bbx_common::AcademicYear;
use sqlx::SqliteConnection;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStep {
    FixNoYearlong,
    FixNonstandardGrades,
    FixFallYearlongs,
    BackfillTranscriptCategories,
}

impl CorrectionStep {
    /// Execution order; do not reorder
    pub const PIPELINE: [CorrectionStep; 4] = [
        CorrectionStep::FixNoYearlong,
        CorrectionStep::FixNonstandardGrades,
        CorrectionStep::FixFallYearlongs,
        CorrectionStep::BackfillTranscriptCategories,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CorrectionStep::FixNoYearlong => "fix_no_yearlong",
            CorrectionStep::FixNonstandardGrades => "fix_nonstandard_grades",
            CorrectionStep::FixFallYearlongs => "fix_fall_yearlongs",
            CorrectionStep::BackfillTranscriptCategories => "backfill_transcript_categories",
        }
    }

    /// Execute the step, returning the number of rows it changed
    pub async fn run(self, conn: &mut SqliteConnection, year: &AcademicYear) -> sqlx::Result<u64> {
        let Some((target, predicate)) = self.retag() else {
            let result = sqlx::query(BACKFILL_CATEGORIES_SQL)
                .bind(MISSING_CATEGORY)
                .bind(MISSING_CATEGORY)
                .execute(&mut *conn)
                .await?;
            return Ok(result.rows_affected());
        };
        let school_year = year.school_year();
        let scoped = self.is_year_scoped();

        let clear_sql = clear_stale_sql(&predicate, target);
        let mut clear = sqlx::query(&clear_sql);
        if scoped {
            clear = clear.bind(school_year.as_str());
        }
        let cleared = clear.execute(&mut *conn).await?.rows_affected();
        if cleared > 0 {
            debug!(step = %self, cleared, "Removed stale sentinel rows ahead of retag");
        }

        // Plain UPDATE: two retagged rows landing on one key is a
        // constraint error, not a silent delete
        let retag_sql = retag_sql(&predicate);
        let mut retag = sqlx::query(&retag_sql)
            .bind(target.workflow_label())
            .bind(target.to_db());
        if scoped {
            retag = retag.bind(school_year.as_str());
        }
        Ok(retag.execute(&mut *conn).await?.rows_affected())
    }

    /// Sentinel a retag step writes and the `WHERE` clause selecting its
    /// rows; `None` for the backfill
    fn retag(self) -> Option<(GradeId, String)> {
        match self {
            CorrectionStep::FixNoYearlong => Some((GradeId::NoYearlong, no_yearlong_predicate())),
            CorrectionStep::FixNonstandardGrades => Some((
                GradeId::NonstandardPairing,
                nonstandard_grades_predicate(),
            )),
            CorrectionStep::FixFallYearlongs => {
                Some((GradeId::PromotedFall, fall_yearlongs_predicate()))
            }
            CorrectionStep::BackfillTranscriptCategories => None,
        }
    }

    /// The predicate takes the current school year as its only parameter
    fn is_year_scoped(self) -> bool {
        self == CorrectionStep::FixFallYearlongs
    }
}

impl fmt::Display for CorrectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lone year-long halves.
///
/// Groups count year-long family rows and scheduled placeholders; the
/// placeholder and a full-year grade are never selected.
fn no_yearlong_predicate() -> String {
    format!(
        r#"(student_user_id, school_year, course_id) IN (
            SELECT student_user_id, school_year, course_id
            FROM transcripts
            WHERE grade_description IN ({family}) OR grade_id = {scheduled}
            GROUP BY student_user_id, school_year, course_id
            HAVING COUNT(*) = 1
        )
        AND grade_id != {scheduled}
        AND grade_description IN ({halves})"#,
        family = sql_literal_list(&labels::YEAR_LONG_FAMILY),
        halves = sql_literal_list(&labels::YEAR_LONG_HALVES),
        scheduled = SCHEDULED_GRADE_ID,
    )
}

/// Two-row year-long groups with one letter and one non-letter grade
fn nonstandard_grades_predicate() -> String {
    let family = sql_literal_list(&labels::YEAR_LONG_FAMILY);
    format!(
        r#"grade_description IN ({family})
        AND (student_user_id, school_year, course_id) IN (
            SELECT student_user_id, school_year, course_id
            FROM transcripts
            WHERE grade_description IN ({family})
            GROUP BY student_user_id, school_year, course_id
            HAVING COUNT(*) = 2
               AND COUNT(DISTINCT CASE WHEN grade IN ({non_letter}) THEN 'non_letter'
                                       ELSE 'letter' END) = 2
        )"#,
        non_letter = sql_literal_list(&NON_LETTER_GRADES),
    )
}

fn fall_yearlongs_predicate() -> String {
    format!(
        "school_year = ? AND grade_description = {}",
        sql_literal_list(&[labels::FALL_TERM_YL])
    )
}

/// Delete rows left from an earlier run that already hold `target` on a
/// key the retag is about to write.
///
/// Only rows outside the year-long family qualify, so nothing the retag
/// itself selects is removed and the group counts in the predicate are
/// unaffected.
fn clear_stale_sql(predicate: &str, target: GradeId) -> String {
    format!(
        r#"
        DELETE FROM transcripts
        WHERE grade_id = {target}
          AND (grade_description IS NULL OR grade_description NOT IN ({family}))
          AND (student_user_id, term_id, group_id, course_id) IN (
            SELECT student_user_id, term_id, group_id, course_id
            FROM transcripts
            WHERE {predicate}
          )
        "#,
        target = target.to_db(),
        family = sql_literal_list(&labels::YEAR_LONG_FAMILY),
    )
}

fn retag_sql(predicate: &str) -> String {
    format!(
        r#"
        UPDATE transcripts
        SET grade_description = ?, grade_id = ?
        WHERE {predicate}
        "#
    )
}

/// Longest matching course-code prefix wins; ties break on prefix text
const BACKFILL_CATEGORIES_SQL: &str = r#"
    UPDATE transcripts
    SET transcript_category = ranked.transcript_category
    FROM (
        SELECT codes.course_code AS course_code,
               cc.transcript_category AS transcript_category,
               ROW_NUMBER() OVER (
                   PARTITION BY codes.course_code
                   ORDER BY LENGTH(cc.course_prefix) DESC, cc.course_prefix
               ) AS rn
        FROM (SELECT DISTINCT course_code FROM transcripts
              WHERE transcript_category = ? AND course_code IS NOT NULL) AS codes
        JOIN course_codes cc
          ON substr(codes.course_code, 1, length(cc.course_prefix)) = cc.course_prefix
    ) AS ranked
    WHERE transcripts.course_code = ranked.course_code
      AND transcripts.transcript_category = ?
      AND ranked.rn = 1
"#;
