//! Carlot inventory tool server.
//!
//! Exposes the dealership inventory to the conversational agent over the
//! Model Context Protocol. Every tool returns a pretty-printed JSON document
//! whose shape is defined by the payload types in
//! [`carlot_core::inventory`].
//!
//! ## Architecture
//!
//! - `CarlotMcpServer`: rmcp handler wiring tool calls to the repository
//! - `tools`: transport-free tool bodies, testable against any
//!   [`carlot_db::InventoryRepository`]
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use carlot_db::InMemoryInventoryRepository;
//! use carlot_mcp::CarlotMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = CarlotMcpServer::new(Arc::new(InMemoryInventoryRepository::default()));
//!     server.run_stdio().await
//! }
//! ```

mod server;
pub mod tools;

pub use server::CarlotMcpServer;
pub use tools::{BrandParams, FilterParams, PriceParams};

use thiserror::Error;

/// Errors raised while serving a tool call
#[derive(Error, Debug)]
pub enum McpError {
    #[error("database error: {0}")]
    Database(#[from] carlot_db::RepositoryError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Validation(_) => -32602, // Invalid params
            McpError::Database(_) | McpError::Internal(_) => -32603, // Internal error
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
