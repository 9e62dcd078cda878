use std::fmt::Display;

use serde_json::{Map, Value};

pub const PERIOD_COLUMN: &str = "period";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Null,
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
            Value::String(s) => Cell::Text(s.clone()),
            Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Null => f.write_str("NaN"),
        }
    }
}

/// Rows returned by one data fetch. Columns are kept in a fixed order with
/// `period` first; every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ObservationTable {
    /// Builds a table from the API's row objects. Columns are the union of
    /// the keys seen, `period` first and the rest in first-seen order.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        if let Some(pos) = columns.iter().position(|c| c == PERIOD_COLUMN) {
            let period = columns.remove(pos);
            columns.insert(0, period);
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Cell::from).unwrap_or(Cell::Null))
                    .collect()
            })
            .collect();

        ObservationTable { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Period tokens of every row, in row order.
    pub fn periods(&self) -> Vec<String> {
        let Some(idx) = self.column_index(PERIOD_COLUMN) else {
            return Vec::new();
        };
        self.rows.iter().map(|r| r[idx].to_string()).collect()
    }

    /// Most recent period first. Stable, so rows sharing a period keep the
    /// order the API gave them.
    pub fn sort_by_period_desc(&mut self) {
        if let Some(idx) = self.column_index(PERIOD_COLUMN) {
            self.rows
                .sort_by(|a, b| b[idx].to_string().cmp(&a[idx].to_string()));
        }
    }

    /// The first `n` rows after sorting by period, most recent first.
    pub fn most_recent(&self, n: usize) -> ObservationTable {
        let mut sorted = self.clone();
        sorted.sort_by_period_desc();
        sorted.rows.truncate(n);
        sorted
    }
}
