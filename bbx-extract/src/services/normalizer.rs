//! Row normalizers
//!
//! Turn fetched vendor tables into the shapes the warehouse expects. Rows
//! that cannot be normalized are skipped with a warning; the rest of the
//! table goes through.

use crate::reconcile::sentinel::{GradeId, MISSING_CATEGORY};
use bbx_common::{Cell, UnorderedTable};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

pub const GRADE_ID_COLUMN: &str = "grade_id";
pub const TRANSCRIPT_CATEGORY_COLUMN: &str = "transcript_category";

/// Substitute sentinel grade ids and mark missing categories.
///
/// A NULL grade_id becomes the scheduled sentinel. A non-NULL value that is
/// not an integer makes the row unkeyable and the row is skipped.
pub fn normalize_transcripts(table: UnorderedTable) -> UnorderedTable {
    let grade_idx = table.column_index(GRADE_ID_COLUMN);
    let category_idx = table.column_index(TRANSCRIPT_CATEGORY_COLUMN);
    if grade_idx.is_none() {
        warn!("Transcript table has no grade_id column");
    }

    let UnorderedTable { columns, rows } = table;
    let mut out = UnorderedTable::with_columns(columns);
    let mut scheduled = 0usize;
    let mut skipped = 0usize;

    for mut row in rows {
        if let Some(idx) = grade_idx {
            let raw = match row.get(idx) {
                Some(Cell::Null) | None => None,
                Some(cell) => match cell.as_i64() {
                    Some(value) => Some(value),
                    None => {
                        warn!(grade_id = %cell, "Skipping transcript row with non-integer grade_id");
                        skipped += 1;
                        continue;
                    }
                },
            };
            if let Some(value) = raw {
                if GradeId::collides_with_sentinel(value) {
                    warn!(grade_id = value, "Vendor grade_id collides with a reserved sentinel");
                }
            }
            let grade_id = GradeId::from_raw(raw);
            if grade_id == GradeId::Scheduled {
                scheduled += 1;
            }
            if let Some(cell) = row.get_mut(idx) {
                *cell = Cell::Int(grade_id.to_db());
            }
        }

        if let Some(idx) = category_idx {
            if let Some(cell) = row.get_mut(idx) {
                let blank = match &*cell {
                    Cell::Null => true,
                    Cell::Text(s) => s.trim().is_empty(),
                    _ => false,
                };
                if blank {
                    *cell = Cell::from(MISSING_CATEGORY);
                }
            }
        }

        if let Err(mismatch) = out.push_row(row) {
            warn!(
                expected = mismatch.expected,
                actual = mismatch.actual,
                "Skipping malformed transcript row"
            );
            skipped += 1;
        }
    }

    info!(
        rows = out.len(),
        scheduled, skipped, "Normalized transcript rows"
    );
    out
}

/// Graduation year to grade level relative to the academic year's end
pub fn grad_year_to_grade(grad_year: i64, end_year: i64) -> i64 {
    12 - (grad_year - end_year)
}

/// Collapse the parents list to one row per email with the grade levels
/// of their students.
///
/// Columns starting with `Grad` hold graduation years. Only levels 0..=12
/// are kept; rows without an email or without any level are skipped.
pub fn normalize_parents(table: &UnorderedTable, end_year: i32) -> UnorderedTable {
    let email_idx = table.column_index("email");
    let first_idx = table.column_index("first_name");
    let last_idx = table.column_index("last_name");
    let grad_idxs: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with("Grad"))
        .map(|(idx, _)| idx)
        .collect();

    let mut out = UnorderedTable::with_columns(["email", "first_name", "last_name", "grades"]);
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in &table.rows {
        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .filter(|c| !c.is_null())
                .map(|c| c.to_string().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let Some(email) = text(email_idx) else {
            skipped += 1;
            continue;
        };

        let grades: BTreeSet<i64> = grad_idxs
            .iter()
            .filter_map(|&i| row.get(i).and_then(Cell::as_i64))
            .map(|grad_year| grad_year_to_grade(grad_year, i64::from(end_year)))
            .filter(|grade| (0..=12).contains(grade))
            .collect();
        if grades.is_empty() {
            skipped += 1;
            continue;
        }

        let grades = grades
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let normalized = vec![
            Cell::from(email.clone()),
            Cell::from(text(first_idx)),
            Cell::from(text(last_idx)),
            Cell::from(grades),
        ];

        // Later rows for the same email replace earlier ones
        match positions.get(&email) {
            Some(&pos) => out.rows[pos] = normalized,
            None => {
                positions.insert(email, out.rows.len());
                out.rows.push(normalized);
            }
        }
    }

    info!(parents = out.len(), skipped, "Normalized parent rows");
    out
}

/// Build a table from attendance records.
///
/// Columns are the sorted keys of the first record; later records align by
/// name and missing keys become NULL.
pub fn attendance_table(
    records: Vec<serde_json::Map<String, serde_json::Value>>,
) -> UnorderedTable {
    let Some(first) = records.first() else {
        return UnorderedTable::new();
    };

    let mut columns: Vec<String> = first.keys().cloned().collect();
    columns.sort();
    let mut table = UnorderedTable::with_columns(columns);

    for mut record in records {
        let row = table
            .columns
            .iter()
            .map(|name| record.remove(name).map(Cell::from).unwrap_or(Cell::Null))
            .collect();
        table.rows.push(row);
    }
    table
}
