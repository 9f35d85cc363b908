//! Row-layout rule for invoice blocks.
//!
//! Invoice-level metadata (date, sender) goes on the first row of a block only;
//! following rows leave those columns blank so a reader groups them with the
//! row above.

use serde::{Deserialize, Serialize};

use crate::invoice::InvoiceData;

/// Column titles written as row 1 of an empty table.
pub const HEADER: [&str; 4] = ["Date", "Sender", "Item", "Amount"];

/// Columns the table spans; reads cover the whole of them.
pub const TABLE_COLUMNS: &str = "A:D";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

pub type Row = Vec<CellValue>;

/// A contiguous run of rows and the 1-based row it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendBlock {
    pub start_row: usize,
    pub rows: Vec<Row>,
    pub includes_header: bool,
}

pub fn header_row() -> Row {
    HEADER.iter().map(|h| CellValue::text(*h)).collect()
}

/// One row per item, in submission order.
pub fn invoice_rows(data: &InvoiceData) -> Vec<Row> {
    let date = data.invoice_date.clone().unwrap_or_default();
    let sender = data.sender.clone().unwrap_or_default();

    data.items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let (date, sender) = if index == 0 {
                (date.clone(), sender.clone())
            } else {
                (String::new(), String::new())
            };
            vec![
                CellValue::Text(date),
                CellValue::Text(sender),
                CellValue::Text(item.item.clone()),
                CellValue::Number(item.amount.clone()),
            ]
        })
        .collect()
}

/// Places an invoice after `existing_rows` rows. An empty table gets the
/// header as row 1, folded into the same block as the data rows.
pub fn plan_append(existing_rows: usize, data: &InvoiceData) -> AppendBlock {
    let mut rows = invoice_rows(data);
    if existing_rows == 0 {
        rows.insert(0, header_row());
        AppendBlock {
            start_row: 1,
            rows,
            includes_header: true,
        }
    } else {
        AppendBlock {
            start_row: existing_rows + 1,
            rows,
            includes_header: false,
        }
    }
}

/// Prefixes an A1 range with a quoted sheet name when one is configured.
pub fn qualify_range(sheet_name: Option<&str>, a1: &str) -> String {
    match sheet_name {
        Some(name) => format!("'{}'!{}", name.replace('\'', "''"), a1),
        None => a1.to_string(),
    }
}

/// 1-based row of the top-left cell of `range`, if it names one.
/// `'Invoices'!A12:D14` → `Some(12)`; `A:D` → `None`.
pub fn start_row_of(range: &str) -> Option<usize> {
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    let first = cells.split(':').next()?;
    let digits: String = first
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '$')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|row| *row > 0)
}
