//! bbx-extract library interface
//!
//! Extracts school-administration lists and reconciles them into the
//! SQLite warehouse. The binary in `main.rs` is a thin CLI over
//! [`commands`].

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod services;

pub use crate::error::{FetchError, ReconcileError, ReconcilePhase};
pub use crate::reconcile::{reconcile_entity, reconcile_transcripts, ReconcileSummary};
