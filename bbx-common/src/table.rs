//! Unordered table staging model
//!
//! A fetched vendor list is held as an ordered column list plus row-major
//! cell values aligned by position. Tables live for one extraction run and
//! are discarded once the warehouse transaction commits.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Floats at or beyond 2^53 no longer hold every integer exactly
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// A single cell value as delivered by the vendor API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Integer view of the cell; numeric text and integral floats below
    /// 2^53 are accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_FLOAT_INT => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Cell {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s),
            // Nested payloads are kept verbatim as JSON text
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Row width did not match the table's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWidthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Ordered columns plus positionally aligned rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnorderedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl UnorderedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// True when no rows have been collected
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, enforcing `row.len() == columns.len()`
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), RowWidthMismatch> {
        if row.len() != self.columns.len() {
            return Err(RowWidthMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Fold another partial table into this one.
    ///
    /// The first non-empty table fixes the column list. Tables with a
    /// different column order are realigned by name; columns unknown to the
    /// accumulator are dropped and absent ones become NULL.
    pub fn merge(&mut self, other: UnorderedTable) {
        if other.columns.is_empty() || other.rows.is_empty() {
            return;
        }
        if self.columns.is_empty() {
            self.columns = other.columns;
            self.rows.extend(other.rows);
            return;
        }
        if self.columns == other.columns {
            self.rows.extend(other.rows);
            return;
        }

        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        let dropped: Vec<&String> = other
            .columns
            .iter()
            .filter(|c| !self.columns.contains(c))
            .collect();
        if !dropped.is_empty() {
            warn!(columns = ?dropped, "Dropping columns absent from the merged table");
        }

        for row in other.rows {
            let aligned = mapping
                .iter()
                .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or(Cell::Null))
                .collect();
            self.rows.push(aligned);
        }
    }

    /// Single-threaded reduction of partial tables, in order
    pub fn reduce<I>(parts: I) -> UnorderedTable
    where
        I: IntoIterator<Item = UnorderedTable>,
    {
        parts.into_iter().fold(UnorderedTable::new(), |mut acc, part| {
            acc.merge(part);
            acc
        })
    }
}
