//! SQLite persistence for the reelforge job store.
//!
//! The crate owns the connection pool, embedded migrations, row models, and
//! the query layer consumed by the worker scheduler and the conversion
//! orchestrator.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
