//! Dev Ledger - a disposable single-node chain for local development.
//!
//! Hosts the identity registry contract behind an Ethereum-style JSON-RPC
//! endpoint, with a fixed set of unlocked, pre-funded accounts and one block
//! mined per accepted transaction. Rejected transactions leave no trace.

pub mod chain;
pub mod config;
pub mod server;

pub use chain::DevLedger;
pub use config::Config;
pub use server::{create_router, spawn, AppState};
