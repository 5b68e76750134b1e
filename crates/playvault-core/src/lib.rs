//! PlayVault core library.
//!
//! Shared building blocks used by the server crate:
//! - `SQLite` pool helpers and the `define_database!` macro
//! - in-process TTL cache with prefix invalidation (response caching,
//!   one-shot OTP codes, fixed-window rate-limit counters)
//! - tracing/logging initialization

pub mod cache;
pub mod db;
pub mod tracing_init;
