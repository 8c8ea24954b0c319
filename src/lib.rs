//! Concurrent map-reduce aggregator over a storage-service manifest stream:
//! fan out NDJSON lines across worker threads that each keep a private,
//! arena-backed owner index, then fold the per-worker results together with
//! a parallel tournament merge before writing a per-owner, per-namespace
//! usage report.

pub mod arena;
pub mod buffer_pool;
pub mod config;
pub mod driver;
pub mod error;
pub mod merge;
pub mod output;
pub mod owner;
pub mod record;
pub mod worker;
