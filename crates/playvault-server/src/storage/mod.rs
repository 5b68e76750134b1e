//! Storage layer for the PlayVault server.
//!
//! Persistence for gamer/admin accounts, deals, transactions, and game
//! sessions. Multi-write operations (deal creation, game creation,
//! transaction recording) run inside a single sqlx transaction; unique
//! indexes back the uniqueness invariants under concurrent creation.

mod db;
mod models;
mod queries_admins;
mod queries_deals;
mod queries_gamers;
mod queries_games;
mod queries_transactions;
pub mod status;


pub use db::Database;
pub use models::*;
pub use queries_deals::NewDeal;
pub use queries_gamers::{GamerUpdate, NewGamer};
pub use queries_games::{GameUpdate, NewGame, NewPlayer, PlayOutcome, PlayerUpdate};
pub use queries_transactions::NewTransaction;
