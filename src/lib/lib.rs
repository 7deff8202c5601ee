//! A small CRUD API for todo records.
//!
//! [`core::TodoRepository`] owns all todo policy (trimming, validation,
//! filtering, stats) on top of a [`storage::TodoStore`] backend, either the
//! in-memory [`storage::MemoryStore`] or, with the `storage` feature, the
//! SQLite-backed `storage::SqliteStore`. [`adapters::router`] exposes the
//! repository over HTTP.

pub mod adapters;
pub mod config;
pub mod core;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod tests;
