pub mod auth;
pub mod google;
pub mod layout;
pub mod memory;
pub mod store;
pub mod writer;

pub use layout::{CellValue, Row};
pub use store::SheetStore;
pub use writer::{AppendReport, SheetWriter};
