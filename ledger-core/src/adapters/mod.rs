//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the LedgerStore port
//! - An in-process intent registry for per-account exclusion

pub mod duckdb;
pub mod locks;
