//! Academic year boundaries and school-year labels
//!
//! The warehouse stores `school_year` as the literal string
//! `"<start> - <end>"`, e.g. `"2025 - 2026"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of academic years revisited by transcript cleanup
pub const CLEANUP_WINDOW_YEARS: i32 = 5;

/// Start/end calendar years of one academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    pub start: i32,
    pub end: i32,
}

impl AcademicYear {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Academic year that finishes in calendar year `end`
    pub fn ending(end: i32) -> Self {
        Self { start: end - 1, end }
    }

    /// `"<start> - <end>"`
    pub fn school_year(&self) -> String {
        school_year_label(self.start, self.end)
    }

    /// Labels of the academic years ending at `end, end-1, .., end-4`.
    ///
    /// The window is anchored on the year that ends at `end`: the oldest
    /// label is `"<end-5> - <end-4>"` and the following year
    /// `"<end> - <end+1>"` is never included.
    pub fn cleanup_window(&self) -> Vec<String> {
        (0..CLEANUP_WINDOW_YEARS)
            .map(|i| AcademicYear::ending(self.end - i).school_year())
            .collect()
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

pub fn school_year_label(start: i32, end: i32) -> String {
    format!("{} - {}", start, end)
}
