use crate::errors::{InvoiceParserError, InvoiceParserResult};
use crate::mcp::types::McpTool;

pub const SAVE_TO_SHEET: &str = "save_to_sheet";

/// Loads the tool descriptors served by `tools/list`.
/// The JSON is embedded at compile time via include_str!.
pub fn load_tools() -> InvoiceParserResult<Vec<McpTool>> {
    let json = include_str!("../../tools/save_to_sheet.json");
    serde_json::from_str(json)
        .map_err(|e| InvoiceParserError::Config(format!("Failed to parse tool descriptors: {e}")))
}
