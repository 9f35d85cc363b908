use async_trait::async_trait;

use crate::errors::InvoiceParserResult;

/// Message channel the server reads requests from and writes responses to.
#[async_trait]
pub trait McpTransport: Send {
    /// Next raw message, or `None` once the peer has closed the stream.
    async fn recv(&mut self) -> InvoiceParserResult<Option<String>>;

    async fn send(&mut self, message: &serde_json::Value) -> InvoiceParserResult<()>;

    /// Flushes anything buffered. The transport is not used afterwards.
    async fn close(&mut self) -> InvoiceParserResult<()>;
}
