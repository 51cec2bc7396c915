//! Transcript row builders and warehouse snapshots

use anyhow::Result;
use bbx_common::{AcademicYear, Cell, UnorderedTable};
use bbx_extract::reconcile::{reconcile_transcripts, ReconcileSummary};
use bbx_extract::services::normalize_transcripts;
use bbx_extract::ReconcileError;
use sqlx::SqlitePool;

pub const CURRENT: &str = "2025 - 2026";
pub const PRIOR: &str = "2024 - 2025";

pub fn current_year() -> AcademicYear {
    AcademicYear::new(2025, 2026)
}

/// Columns of a fetched transcript list used by the tests
pub const COLUMNS: [&str; 11] = [
    "student_user_id",
    "course_id",
    "term_id",
    "group_id",
    "grade_id",
    "grade_description",
    "grade",
    "score",
    "course_code",
    "transcript_category",
    "school_year",
];

/// One transcript line as the vendor would deliver it
#[derive(Debug, Clone)]
pub struct Line {
    pub student: i64,
    pub course_id: i64,
    pub term_id: i64,
    pub group_id: i64,
    pub grade_id: Option<i64>,
    pub description: String,
    pub grade: Option<String>,
    pub score: Option<f64>,
    pub course_code: String,
    pub category: Option<String>,
    pub school_year: String,
}

impl Line {
    pub fn new(
        student: i64,
        course_id: i64,
        term_id: i64,
        grade_id: Option<i64>,
        description: &str,
        school_year: &str,
    ) -> Self {
        Self {
            student,
            course_id,
            term_id,
            group_id: course_id * 100,
            grade_id,
            description: description.to_string(),
            grade: Some("A".to_string()),
            score: Some(95.0),
            course_code: "HIST100".to_string(),
            category: Some("History".to_string()),
            school_year: school_year.to_string(),
        }
    }

    pub fn grade(mut self, grade: &str) -> Self {
        self.grade = Some(grade.to_string());
        self
    }

    pub fn score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    pub fn code(mut self, course_code: &str, category: Option<&str>) -> Self {
        self.course_code = course_code.to_string();
        self.category = category.map(str::to_string);
        self
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Int(self.student),
            Cell::Int(self.course_id),
            Cell::Int(self.term_id),
            Cell::Int(self.group_id),
            Cell::from(self.grade_id),
            Cell::from(self.description.as_str()),
            Cell::from(self.grade.clone()),
            Cell::from(self.score),
            Cell::from(self.course_code.as_str()),
            Cell::from(self.category.clone()),
            Cell::from(self.school_year.as_str()),
        ]
    }
}

/// Raw fetched table (grade_id may be NULL)
pub fn raw_table(lines: &[Line]) -> UnorderedTable {
    let mut table = UnorderedTable::with_columns(COLUMNS);
    for line in lines {
        table.push_row(line.cells()).unwrap();
    }
    table
}

/// Normalize and reconcile lines as one run
pub async fn reconcile_lines(
    pool: &SqlitePool,
    lines: &[Line],
    year: AcademicYear,
) -> Result<ReconcileSummary, ReconcileError> {
    let table = normalize_transcripts(raw_table(lines));
    reconcile_transcripts(pool, &table, year).await
}

/// Insert a row directly, as left behind by an earlier run
pub async fn seed(pool: &SqlitePool, line: &Line) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transcripts (student_user_id, course_id, term_id, group_id, grade_id,
            grade_description, grade, score, course_code, transcript_category, school_year)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(line.student)
    .bind(line.course_id)
    .bind(line.term_id)
    .bind(line.group_id)
    .bind(line.grade_id.unwrap_or(999_999))
    .bind(&line.description)
    .bind(&line.grade)
    .bind(line.score)
    .bind(&line.course_code)
    .bind(&line.category)
    .bind(&line.school_year)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persisted transcript row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Stored {
    pub student_user_id: i64,
    pub term_id: i64,
    pub group_id: i64,
    pub course_id: i64,
    pub grade_id: i64,
    pub grade_description: Option<String>,
    pub grade: Option<String>,
    pub score: Option<f64>,
    pub transcript_category: Option<String>,
    pub school_year: Option<String>,
}

/// Every transcript row in key order
pub async fn snapshot(pool: &SqlitePool) -> Result<Vec<Stored>> {
    let rows = sqlx::query_as::<_, Stored>(
        r#"
        SELECT student_user_id, term_id, group_id, course_id, grade_id,
               grade_description, grade, score, transcript_category, school_year
        FROM transcripts
        ORDER BY student_user_id, course_id, term_id, group_id, grade_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Rows of one student's course, ordered by term
pub async fn course_rows(pool: &SqlitePool, student: i64, course_id: i64) -> Result<Vec<Stored>> {
    Ok(snapshot(pool)
        .await?
        .into_iter()
        .filter(|r| r.student_user_id == student && r.course_id == course_id)
        .collect())
}
