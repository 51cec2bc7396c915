//! Generic descriptor-driven upsert

use super::entity::EntityDescriptor;
use bbx_common::{Cell, Result, UnorderedTable};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqliteConnection;
use tracing::{debug, warn};

/// Counters for one upsert pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Rows sent to the database
    pub attempted: u64,
    /// Rows inserted or updated (conflicting ignored rows excluded)
    pub written: u64,
    /// Rows skipped because a key column was NULL
    pub dropped_null_key: u64,
    pub dropped_columns: Vec<String>,
}

/// Upsert every keyable row of `table` into the descriptor's table.
///
/// Runs on the caller's connection so it can share a transaction with
/// cleanup and corrections.
pub async fn upsert_table(
    conn: &mut SqliteConnection,
    descriptor: &EntityDescriptor,
    table: &UnorderedTable,
) -> Result<UpsertOutcome> {
    let mut outcome = UpsertOutcome::default();
    if table.is_empty() {
        debug!(table = descriptor.table, "Nothing to upsert");
        return Ok(outcome);
    }

    let plan = descriptor.plan(&table.columns)?;
    outcome.dropped_columns = plan.dropped_columns.clone();

    for row in &table.rows {
        if plan
            .key_columns
            .iter()
            .any(|&idx| row.get(idx).map_or(true, Cell::is_null))
        {
            outcome.dropped_null_key += 1;
            continue;
        }

        let mut query = sqlx::query(&plan.sql);
        for &idx in &plan.projection {
            query = bind_cell(query, row.get(idx).unwrap_or(&Cell::Null));
        }
        let result = query.execute(&mut *conn).await?;

        outcome.attempted += 1;
        outcome.written += result.rows_affected();
    }

    if outcome.dropped_null_key > 0 {
        warn!(
            table = descriptor.table,
            dropped = outcome.dropped_null_key,
            "Dropped rows with a NULL key column"
        );
    }

    Ok(outcome)
}

fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &Cell,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match cell {
        Cell::Null => query.bind(None::<String>),
        Cell::Bool(b) => query.bind(*b),
        Cell::Int(i) => query.bind(*i),
        Cell::Float(f) => query.bind(*f),
        Cell::Text(s) => query.bind(s.clone()),
    }
}
