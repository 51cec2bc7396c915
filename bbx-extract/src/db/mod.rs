//! Warehouse operations outside the reconciliation transaction

pub mod course_codes;
pub mod gpa;

pub use course_codes::{load_course_codes, upsert_course_codes, CourseCode};
pub use gpa::{load_gpa, recalculate_gpa};
