/// Indexer Mock Server Library
///
/// This crate provides both a standalone binary and library components
/// for mocking the wallet indexer API with an in-memory ledger.

pub mod handlers;
pub mod ledger;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use ledger::{Ledger, RequestCounts};
pub use server::{create_router, run_server, spawn};
pub use types::*;
