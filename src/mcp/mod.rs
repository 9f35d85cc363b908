pub mod server;
pub mod stdio_transport;
pub mod tools;
pub mod transport;
pub mod types;
