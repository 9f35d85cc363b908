use std::sync::Arc;

use serde::Serialize;

use crate::errors::InvoiceParserResult;
use crate::invoice::InvoiceData;
use crate::sheets::layout::{plan_append, qualify_range, TABLE_COLUMNS};
use crate::sheets::store::SheetStore;

/// Where an append landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendReport {
    pub start_row: usize,
    pub rows_written: usize,
    pub header_written: bool,
}

/// Appends invoices below the existing table.
///
/// Each call reads the current row count and writes one block right after it.
/// Nothing guards the gap between that read and the write: two writers that
/// read the same count will overwrite each other's block.
pub struct SheetWriter {
    store: Arc<dyn SheetStore>,
    sheet_name: Option<String>,
}

impl SheetWriter {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: Option<String>) -> Self {
        Self { store, sheet_name }
    }

    pub async fn append(&self, data: &InvoiceData) -> InvoiceParserResult<AppendReport> {
        let read_range = qualify_range(self.sheet_name.as_deref(), TABLE_COLUMNS);
        let existing = self.store.read(&read_range).await?.len();

        let block = plan_append(existing, data);
        let start_cell = format!("A{}", block.start_row);
        let write_range = qualify_range(self.sheet_name.as_deref(), &start_cell);
        self.store.update(&write_range, &block.rows).await?;

        tracing::info!(
            store = %self.store.name(),
            range = %write_range,
            existing_rows = existing,
            rows = block.rows.len(),
            header = block.includes_header,
            "invoice appended"
        );
        Ok(AppendReport {
            start_row: block.start_row,
            rows_written: block.rows.len(),
            header_written: block.includes_header,
        })
    }
}
