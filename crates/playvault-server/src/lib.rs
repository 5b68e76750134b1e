//! PlayVault Server Library
//!
//! Core functionality for the PlayVault backend:
//! - SQLite storage for gamer/admin accounts, deals, transactions, and games
//! - JWT authentication and password hashing
//! - HTTP API under /api/v1 with response caching and rate limiting
//! - WebSocket device registry for realtime fan-out
//! - Transactional mail for password resets

pub mod auth;
pub mod error;
pub mod letters;
pub mod mailer;
pub mod rate_limit;
pub mod realtime;
pub mod routes;
pub mod storage;
pub mod wallet;
