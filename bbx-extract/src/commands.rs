//! One function per CLI command
//!
//! Each command takes an open pool and, where it talks to the vendor, a
//! page source, so the whole flow can be driven without the network.

use crate::db::{course_codes, gpa};
use crate::reconcile::upsert::UpsertOutcome;
use crate::reconcile::{
    self, entity::EntityDescriptor, ReconcileSummary, ATTENDANCE, PARENTS,
};
use crate::services::{
    attendance_table, fetch_list, fetch_lists, normalize_parents, normalize_transcripts,
    ListPageSource, SkyClient,
};
use anyhow::{bail, Context, Result};
use bbx_common::AcademicYear;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Fetch every transcript list and reconcile the merged table.
///
/// Lists that fail are logged and left out. If nothing at all was
/// fetched the run stops before touching the warehouse.
pub async fn run_transcripts<S: ListPageSource>(
    pool: &SqlitePool,
    source: Arc<S>,
    list_ids: &[String],
    year: AcademicYear,
) -> Result<Option<ReconcileSummary>> {
    let report = fetch_lists(source, list_ids).await;
    for (list_id, e) in &report.failures {
        warn!(list_id = %list_id, error = %e, "Transcript list left out of this run");
    }

    if report.table.is_empty() {
        if report.is_complete() {
            warn!("Transcript lists returned no rows; warehouse left unchanged");
            return Ok(None);
        }
        bail!(
            "all {} transcript list(s) failed to fetch; warehouse left unchanged",
            report.failures.len()
        );
    }

    let table = normalize_transcripts(report.table);
    let summary = reconcile::reconcile_transcripts(pool, &table, year).await?;
    Ok(Some(summary))
}

/// Fetch one list and upsert it as-is (comments, enrollment)
pub async fn run_entity_list<S: ListPageSource>(
    pool: &SqlitePool,
    source: &S,
    list_id: &str,
    descriptor: &EntityDescriptor,
) -> Result<UpsertOutcome> {
    let table = fetch_list(source, list_id)
        .await
        .with_context(|| format!("Failed to fetch list {} for {}", list_id, descriptor.table))?;
    let outcome = reconcile::reconcile_entity(pool, descriptor, &table).await?;
    Ok(outcome)
}

pub async fn run_parents<S: ListPageSource>(
    pool: &SqlitePool,
    source: &S,
    list_id: &str,
    year: AcademicYear,
) -> Result<UpsertOutcome> {
    let raw = fetch_list(source, list_id)
        .await
        .with_context(|| format!("Failed to fetch parents list {}", list_id))?;
    let parents = normalize_parents(&raw, year.end);
    let outcome = reconcile::reconcile_entity(pool, &PARENTS, &parents).await?;
    Ok(outcome)
}

/// Fetch attendance for each level; failed levels are logged and skipped
pub async fn fetch_attendance(
    client: &SkyClient,
    level_ids: &[String],
    day: NaiveDate,
) -> Vec<serde_json::Map<String, serde_json::Value>> {
    let mut records = Vec::new();
    for level_id in level_ids {
        match client.attendance(level_id, day).await {
            Ok(batch) => {
                info!(level_id = %level_id, records = batch.len(), "Attendance fetched");
                records.extend(batch);
            }
            Err(e) => error!(level_id = %level_id, error = %e, "Unable to get attendance data"),
        }
    }
    records
}

pub async fn store_attendance(
    pool: &SqlitePool,
    records: Vec<serde_json::Map<String, serde_json::Value>>,
) -> Result<UpsertOutcome> {
    let table = attendance_table(records);
    let outcome = reconcile::reconcile_entity(pool, &ATTENDANCE, &table).await?;
    Ok(outcome)
}

pub async fn run_gpa(pool: &SqlitePool) -> Result<u64> {
    gpa::recalculate_gpa(pool)
        .await
        .context("Unable to do GPA calculations")
}

pub async fn run_course_codes(pool: &SqlitePool, path: &Path) -> Result<u64> {
    let codes = course_codes::load_course_codes(path)?;
    if codes.is_empty() {
        warn!(path = %path.display(), "No course codes in file");
        return Ok(0);
    }
    let written = course_codes::upsert_course_codes(pool, &codes).await?;
    Ok(written)
}
