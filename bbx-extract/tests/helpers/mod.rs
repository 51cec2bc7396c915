//! Test Helper Utilities
//!
//! Shared utilities for the warehouse integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod transcripts;

pub use db_utils::{count_rows, create_test_db, fail_updates_to_grade_id, seed_course_code};
pub use transcripts::{
    course_rows, current_year, raw_table, reconcile_lines, seed, snapshot, Line, Stored, CURRENT,
    PRIOR,
};
