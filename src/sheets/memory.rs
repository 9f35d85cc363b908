use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::{InvoiceParserError, InvoiceParserResult};
use crate::sheets::layout::{start_row_of, CellValue, Row};
use crate::sheets::store::SheetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    Never,
    OnRead,
    OnWrite,
}

/// Single-grid store kept in process memory. Range sheet qualifiers are
/// ignored; every range addresses the same grid.
pub struct InMemorySheet {
    rows: Mutex<Vec<Row>>,
    fail: FailMode,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemorySheet {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail: FailMode::Never,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Makes the chosen operation fail with a Sheets error.
    pub fn failing(mut self, mode: FailMode) -> Self {
        self.fail = mode;
        self
    }

    pub async fn rows(&self) -> Vec<Row> {
        self.rows.lock().await.clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetStore for InMemorySheet {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn read(&self, _range: &str) -> InvoiceParserResult<Vec<Row>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail == FailMode::OnRead {
            return Err(InvoiceParserError::Sheets("simulated read failure".into()));
        }
        Ok(self.rows().await)
    }

    async fn update(&self, range: &str, rows: &[Row]) -> InvoiceParserResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail == FailMode::OnWrite {
            return Err(InvoiceParserError::Sheets("simulated write failure".into()));
        }
        let start = start_row_of(range).ok_or_else(|| {
            InvoiceParserError::Sheets(format!("range '{range}' has no start row"))
        })?;

        let mut grid = self.rows.lock().await;
        for (offset, row) in rows.iter().enumerate() {
            let index = start - 1 + offset;
            if grid.len() <= index {
                grid.resize(index + 1, Vec::new());
            }
            let target = &mut grid[index];
            if target.len() < row.len() {
                target.resize(row.len(), CellValue::text(""));
            }
            for (col, cell) in row.iter().enumerate() {
                target[col] = cell.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| CellValue::text(*c)).collect()
    }

    #[tokio::test]
    async fn update_overwrites_from_start_row() {
        let sheet = InMemorySheet::with_rows(vec![row(&["a", "b", "c"])]);
        sheet.update("A1", &[row(&["x"])]).await.unwrap();
        assert_eq!(sheet.rows().await, vec![row(&["x", "b", "c"])]);
    }

    #[tokio::test]
    async fn update_past_end_pads_with_empty_rows() {
        let sheet = InMemorySheet::new();
        sheet.update("'Invoices'!A3", &[row(&["x"])]).await.unwrap();
        let rows = sheet.rows().await;
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(rows[2], row(&["x"]));
    }

    #[tokio::test]
    async fn failure_modes_are_reported() {
        let sheet = InMemorySheet::new().failing(FailMode::OnRead);
        assert!(sheet.read("A:D").await.is_err());
        assert_eq!(sheet.read_count(), 1);

        let sheet = InMemorySheet::new().failing(FailMode::OnWrite);
        assert!(sheet.update("A1", &[row(&["x"])]).await.is_err());
        assert!(sheet.rows().await.is_empty());
    }
}
