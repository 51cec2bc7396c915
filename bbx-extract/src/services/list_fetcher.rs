//! Paginated advanced-list fetcher
//!
//! Each list is paged from 1 until an empty page comes back. Lists are
//! fetched by independent Tokio tasks, each returning an owned partial
//! table; the partials are then folded in list order by
//! [`UnorderedTable::reduce`], so no state is shared between tasks.

use crate::error::FetchError;
use async_trait::async_trait;
use bbx_common::{Cell, UnorderedTable};
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One cell of an advanced-list row
#[derive(Debug, Clone, Deserialize)]
pub struct ListColumn {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRow {
    #[serde(default)]
    pub columns: Vec<ListColumn>,
}

/// Source of advanced-list pages
#[async_trait]
pub trait ListPageSource: Send + Sync + 'static {
    /// Rows of one page; an empty vector marks the end of the list
    async fn list_page(&self, list_id: &str, page: u32) -> Result<Vec<ListRow>, FetchError>;
}

/// Merged table plus the lists that failed
#[derive(Debug, Default)]
pub struct FetchReport {
    pub table: UnorderedTable,
    pub failures: Vec<(String, FetchError)>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch every page of one list into a table.
///
/// The first non-empty page fixes the column list. Rows whose width
/// disagrees with it are skipped. A failed page abandons the list.
pub async fn fetch_list<S>(source: &S, list_id: &str) -> Result<UnorderedTable, FetchError>
where
    S: ListPageSource + ?Sized,
{
    let mut table = UnorderedTable::new();
    let mut skipped = 0usize;

    for page in 1u32.. {
        let rows = source.list_page(list_id, page).await?;
        if rows.is_empty() {
            break;
        }

        if table.columns.is_empty() {
            table.columns = rows[0].columns.iter().map(|c| c.name.clone()).collect();
        }

        info!(list_id, page, rows = rows.len(), "Collecting data from page");
        for row in rows {
            let cells: Vec<Cell> = row.columns.into_iter().map(|c| Cell::from(c.value)).collect();
            if let Err(mismatch) = table.push_row(cells) {
                warn!(
                    list_id,
                    page,
                    expected = mismatch.expected,
                    actual = mismatch.actual,
                    "Skipping malformed row"
                );
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(list_id, skipped, "Rows skipped while fetching list");
    }
    Ok(table)
}

/// Fetch several lists concurrently and reduce them into one table
pub async fn fetch_lists<S>(source: Arc<S>, list_ids: &[String]) -> FetchReport
where
    S: ListPageSource,
{
    let handles: Vec<_> = list_ids
        .iter()
        .cloned()
        .map(|list_id| {
            let source = Arc::clone(&source);
            tokio::spawn(async move {
                let result = fetch_list(source.as_ref(), &list_id).await;
                (list_id, result)
            })
        })
        .collect();

    let mut partials = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();

    for (list_id, joined) in list_ids.iter().zip(join_all(handles).await) {
        match joined {
            Ok((_, Ok(table))) => {
                info!(list_id = %list_id, rows = table.len(), "List fetched");
                partials.push(table);
            }
            Ok((_, Err(e))) => {
                error!(list_id = %list_id, error = %e, "List abandoned");
                failures.push((list_id.clone(), e));
            }
            Err(e) => {
                error!(list_id = %list_id, error = %e, "Fetch task failed");
                failures.push((list_id.clone(), FetchError::Task(e.to_string())));
            }
        }
    }

    FetchReport {
        table: UnorderedTable::reduce(partials),
        failures,
    }
}
