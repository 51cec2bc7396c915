//! Course-code prefix lookup maintenance
//!
//! The `course_codes` table maps a course-code prefix to a transcript
//! category. It is maintained by hand in a TOML file:
//!
//! ```toml
//! [[course_codes]]
//! prefix = "MATH"
//! category = "Mathematics"
//! ```

use bbx_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseCode {
    pub prefix: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct CourseCodeFile {
    #[serde(default)]
    course_codes: Vec<CourseCode>,
}

pub fn parse_course_codes(content: &str) -> Result<Vec<CourseCode>> {
    let file: CourseCodeFile = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Parse course codes failed: {}", e)))?;

    for code in &file.course_codes {
        if code.prefix.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "empty course prefix for category {}",
                code.category
            )));
        }
    }
    Ok(file.course_codes)
}

pub fn load_course_codes(path: &Path) -> Result<Vec<CourseCode>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read course codes {}: {}", path.display(), e))
    })?;
    parse_course_codes(&content)
}

/// Insert or update prefixes in one transaction
pub async fn upsert_course_codes(pool: &SqlitePool, codes: &[CourseCode]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut written = 0;

    for code in codes {
        let result = sqlx::query(
            r#"
            INSERT INTO course_codes (course_prefix, transcript_category)
            VALUES (?, ?)
            ON CONFLICT (course_prefix) DO UPDATE SET
                transcript_category = excluded.transcript_category
            "#,
        )
        .bind(code.prefix.trim())
        .bind(&code.category)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    info!(prefixes = written, "Course codes updated");
    Ok(written)
}
