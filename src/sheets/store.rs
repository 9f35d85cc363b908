use async_trait::async_trait;

use crate::errors::InvoiceParserResult;
use crate::sheets::layout::Row;

/// Remote tabular store the writer appends into.
/// Ranges are A1 notation, optionally sheet-qualified (`'Invoices'!A:D`).
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Returns every non-trailing row inside `range`.
    async fn read(&self, range: &str) -> InvoiceParserResult<Vec<Row>>;

    /// Writes `rows` starting at the top-left cell of `range`, overwriting
    /// whatever is there. Values are stored as given, without parsing.
    async fn update(&self, range: &str, rows: &[Row]) -> InvoiceParserResult<()>;
}
