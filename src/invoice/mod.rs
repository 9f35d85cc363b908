pub mod types;
pub mod validate;

pub use types::{InvoiceData, InvoiceItem};
pub use validate::{parse_invoice_data, ValidationError};
