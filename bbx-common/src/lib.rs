//! # bbx-common
//!
//! Shared code for the school-records extractor:
//! - Error type and result alias
//! - TOML configuration loading
//! - `UnorderedTable` staging model for fetched vendor lists
//! - Academic year arithmetic and school-year labels
//! - Warehouse (SQLite) initialisation

pub mod academic_year;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod table;

pub use academic_year::AcademicYear;
pub use error::{Error, Result};
pub use table::{Cell, UnorderedTable};
