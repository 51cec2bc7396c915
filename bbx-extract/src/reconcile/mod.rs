//! Transcript reconciliation engine
//!
//! One run is a single transaction:
//!
//! ```text
//! begin -> cleanup (3 steps) -> upsert -> corrections (4 steps) -> commit
//! ```
//!
//! Any failure rolls the whole run back, so readers only ever see the
//! pre-run state or the fully corrected one.

pub mod cleanup;
pub mod corrections;
pub mod entity;
pub mod sentinel;
pub mod upsert;

use crate::error::{ReconcileError, ReconcilePhase};
use bbx_common::{AcademicYear, UnorderedTable};
use cleanup::{CleanupOutcome, CleanupStep};
use corrections::CorrectionStep;
use entity::EntityDescriptor;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info};
use upsert::UpsertOutcome;

pub use entity::{ConflictAction, ATTENDANCE, ENROLLMENT, PARENTS, TRANSCRIPTS, TRANSCRIPT_COMMENTS};
pub use sentinel::GradeId;

/// Row counts for one transcript reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub cleanup: CleanupOutcome,
    pub upsert: UpsertOutcome,
    /// Rows changed by each corrective step, in pipeline order
    pub corrections: Vec<(CorrectionStep, u64)>,
}

impl ReconcileSummary {
    pub fn corrected(&self, step: CorrectionStep) -> u64 {
        self.corrections
            .iter()
            .find(|(s, _)| *s == step)
            .map_or(0, |(_, n)| *n)
    }
}

/// Reconcile a freshly fetched transcript table for the given academic year
pub async fn reconcile_transcripts(
    pool: &SqlitePool,
    table: &UnorderedTable,
    year: AcademicYear,
) -> Result<ReconcileSummary, ReconcileError> {
    info!(
        school_year = %year,
        rows = table.len(),
        "Starting transcript reconciliation"
    );

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ReconcileError::new(ReconcilePhase::Begin, e))?;

    match transcript_phases(&mut tx, table, &year).await {
        Ok(summary) => {
            tx.commit()
                .await
                .map_err(|e| ReconcileError::new(ReconcilePhase::Commit, e))?;
            info!(
                purged = summary.cleanup.purged,
                reverted = summary.cleanup.reverted,
                scheduled_deleted = summary.cleanup.scheduled_deleted,
                upserted = summary.upsert.written,
                dropped_null_key = summary.upsert.dropped_null_key,
                corrections = ?summary.corrections,
                "Transcript reconciliation committed"
            );
            Ok(summary)
        }
        Err(err) => {
            rollback(tx, &err).await;
            Err(err)
        }
    }
}

async fn transcript_phases(
    tx: &mut Transaction<'_, Sqlite>,
    table: &UnorderedTable,
    year: &AcademicYear,
) -> Result<ReconcileSummary, ReconcileError> {
    let mut summary = ReconcileSummary::default();

    for step in CleanupStep::ALL {
        let touched = cleanup::run_step(step, &mut **tx, year)
            .await
            .map_err(|e| ReconcileError::new(ReconcilePhase::Cleanup(step), e))?;
        match step {
            CleanupStep::PurgeSentinels => summary.cleanup.purged = touched,
            CleanupStep::RevertPromotedFall => summary.cleanup.reverted = touched,
            CleanupStep::DeleteScheduled => summary.cleanup.scheduled_deleted = touched,
        }
    }

    summary.upsert = upsert::upsert_table(&mut **tx, &TRANSCRIPTS, table)
        .await
        .map_err(|e| ReconcileError::new(ReconcilePhase::Upsert, e))?;

    for step in CorrectionStep::PIPELINE {
        let changed = step
            .run(&mut **tx, year)
            .await
            .map_err(|e| ReconcileError::new(ReconcilePhase::Correction(step), e))?;
        info!(step = %step, changed, "Corrective step applied");
        summary.corrections.push((step, changed));
    }

    Ok(summary)
}

/// Upsert one of the simpler entities in its own transaction
pub async fn reconcile_entity(
    pool: &SqlitePool,
    descriptor: &EntityDescriptor,
    table: &UnorderedTable,
) -> Result<UpsertOutcome, ReconcileError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ReconcileError::new(ReconcilePhase::Begin, e))?;

    match upsert::upsert_table(&mut *tx, descriptor, table).await {
        Ok(outcome) => {
            tx.commit()
                .await
                .map_err(|e| ReconcileError::new(ReconcilePhase::Commit, e))?;
            info!(
                table = descriptor.table,
                attempted = outcome.attempted,
                written = outcome.written,
                dropped_null_key = outcome.dropped_null_key,
                "Entity upsert committed"
            );
            Ok(outcome)
        }
        Err(e) => {
            let err = ReconcileError::new(ReconcilePhase::Upsert, e);
            rollback(tx, &err).await;
            Err(err)
        }
    }
}

async fn rollback(tx: Transaction<'_, Sqlite>, err: &ReconcileError) {
    error!(phase = %err.phase, error = %err.source, "Rolling back reconciliation");
    if let Err(e) = tx.rollback().await {
        error!(error = %e, "Rollback failed");
    }
}
