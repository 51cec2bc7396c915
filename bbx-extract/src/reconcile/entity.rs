//! Per-entity descriptors and the generic upsert statement builder
//!
//! Every upserted table is described once: name, full column list, primary
//! key subset and conflict action. The builder derives the INSERT column
//! list, placeholders, conflict target and update assignments from the
//! fetched table's own columns, so one code path serves every entity.

use bbx_common::{Error, Result};
use tracing::warn;

/// What to do when an incoming row hits an existing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Overwrite every non-key column with the incoming value
    Update,
    /// Keep the existing row (append-only logs)
    Ignore,
}

/// Static description of one warehouse entity
#[derive(Debug)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub primary_key: &'static [&'static str],
    pub conflict: ConflictAction,
}

pub static TRANSCRIPTS: EntityDescriptor = EntityDescriptor {
    table: "transcripts",
    columns: &[
        "student_user_id",
        "student_first",
        "student_last",
        "grad_year",
        "course_title",
        "course_code",
        "course_id",
        "group_description",
        "group_id",
        "term_name",
        "term_id",
        "grade_description",
        "grade_mode",
        "grade_id",
        "grade",
        "score",
        "transcript_category",
        "school_year",
        "address_1",
        "address_2",
        "address_3",
        "address_city",
        "address_state",
        "address_zip",
    ],
    primary_key: &["student_user_id", "term_id", "group_id", "course_id", "grade_id"],
    conflict: ConflictAction::Update,
};

pub static ENROLLMENT: EntityDescriptor = EntityDescriptor {
    table: "enrollment",
    columns: &[
        "student_user_id",
        "student_first",
        "student_last",
        "grad_year",
        "enroll_date",
        "depart_date",
        "graduated",
        "enroll_grade",
        "enroll_year",
    ],
    primary_key: &["student_user_id"],
    conflict: ConflictAction::Update,
};

pub static PARENTS: EntityDescriptor = EntityDescriptor {
    table: "parents",
    columns: &["email", "first_name", "last_name", "grades"],
    primary_key: &["email"],
    conflict: ConflictAction::Update,
};

pub static TRANSCRIPT_COMMENTS: EntityDescriptor = EntityDescriptor {
    table: "transcript_comments",
    columns: &[
        "student_user_id",
        "student_first",
        "student_last",
        "grad_year",
        "school_year",
        "comment",
    ],
    primary_key: &["student_user_id"],
    conflict: ConflictAction::Update,
};

pub static ATTENDANCE: EntityDescriptor = EntityDescriptor {
    table: "attendance",
    columns: &[
        "id",
        "student_user_id",
        "student_first",
        "student_last",
        "offering_id",
        "section_name",
        "attendance_date",
        "excuse_type",
        "excuse_description",
        "comment",
    ],
    primary_key: &["id"],
    conflict: ConflictAction::Ignore,
};

/// Upsert statement derived from a descriptor and a table's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPlan {
    pub sql: String,
    /// Table column index bound to each placeholder, in order
    pub projection: Vec<usize>,
    /// Table column indexes of the primary key
    pub key_columns: Vec<usize>,
    /// Incoming columns unknown to the descriptor
    pub dropped_columns: Vec<String>,
}

impl EntityDescriptor {
    pub fn is_key(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }

    /// Build the upsert for a table with the given columns.
    ///
    /// Only descriptor columns reach the SQL text; every primary-key column
    /// must be present.
    pub fn plan(&self, columns: &[String]) -> Result<UpsertPlan> {
        let mut projection = Vec::new();
        let mut selected: Vec<&'static str> = Vec::new();
        let mut dropped_columns = Vec::new();

        for (idx, name) in columns.iter().enumerate() {
            match self.columns.iter().find(|c| **c == name.as_str()) {
                Some(known) if !selected.contains(known) => {
                    projection.push(idx);
                    selected.push(known);
                }
                Some(_) => dropped_columns.push(name.clone()),
                None => dropped_columns.push(name.clone()),
            }
        }

        if !dropped_columns.is_empty() {
            warn!(
                table = self.table,
                columns = ?dropped_columns,
                "Ignoring columns not present in the warehouse table"
            );
        }

        let mut key_columns = Vec::with_capacity(self.primary_key.len());
        for key in self.primary_key {
            let idx = selected
                .iter()
                .position(|c| c == key)
                .map(|pos| projection[pos])
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "table for {} is missing primary key column {}",
                        self.table, key
                    ))
                })?;
            key_columns.push(idx);
        }

        let placeholders = vec!["?"; selected.len()].join(", ");
        let assignments: Vec<String> = selected
            .iter()
            .filter(|c| !self.is_key(c))
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();

        let action = match self.conflict {
            ConflictAction::Update if !assignments.is_empty() => {
                format!("DO UPDATE SET {}", assignments.join(", "))
            }
            _ => "DO NOTHING".to_string(),
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
            self.table,
            selected.join(", "),
            placeholders,
            self.primary_key.join(", "),
            action
        );

        Ok(UpsertPlan {
            sql,
            projection,
            key_columns,
            dropped_columns,
        })
    }
}
