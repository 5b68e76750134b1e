//! Data models for PlayVault storage.

use serde::{Deserialize, Serialize};

use super::status::{
    AdminRole, Currency, GameCurrency, GameStatus, ProgressStatus, RequestStatus,
    TransactionStatus,
};

/// A gamer account; identity is a wallet pubkey, an email, or both.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Gamer {
    pub id: String,
    pub pubkey: Option<String>,
    pub email: Option<String>,
    /// Public-facing seller identifier, distinct from the internal id.
    pub secure_id: String,
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub auth_provider: Option<String>,
    pub profile_picture: Option<String>,
    pub coins: i64,
    pub total_games: i64,
    pub total_earning: i64,
    pub best_score: i64,
    pub escrow_balance: i64,
    pub is_blocked: bool,
    pub is_playing: bool,
    /// JSON blob describing the game currently being played, if any.
    pub current_game: Option<String>,
    pub last_activity: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: AdminRole,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cached, serializable projection of an admin (what `admin:<id>` holds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSnapshot {
    pub id: String,
    pub email: String,
    pub role: AdminRole,
}

impl From<&Admin> for AdminSnapshot {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            email: admin.email.clone(),
            role: admin.role,
        }
    }
}

/// An escrow agreement between a creator and a counterparty.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub creator_id: String,
    /// Counterparty (seller) secure id.
    pub secure_id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub price: f64,
    pub currency: Currency,
    pub request_status: RequestStatus,
    pub progress_status: ProgressStatus,
    /// Unix timestamp after which the request can no longer be answered.
    pub request_expiry: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A recorded fund movement against a deal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub deal_id: String,
    pub user_id: String,
    pub tx_hash: String,
    pub amount: f64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub sender_address: String,
    pub created_at: i64,
}

/// A hosted multiplayer round. `letters` and `wallet_secret` never leave the
/// storage layer; external responses go through [`GameView`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Game {
    pub id: String,
    pub host: String,
    pub game_code: String,
    pub game_type: String,
    pub title: Option<String>,
    pub duration: String,
    pub reward: Option<f64>,
    pub currency: GameCurrency,
    pub stake: Option<f64>,
    /// JSON array of letter tiles; the shared hidden puzzle payload.
    pub letters: String,
    pub game_status: GameStatus,
    pub host_payed: bool,
    pub wallet_pubkey: Option<String>,
    pub wallet_secret: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(skip_serializing, default)]
    pub id: i64,
    #[serde(skip_serializing, default)]
    pub game_id: String,
    pub pubkey: String,
    pub player_name: String,
    pub player_score: i64,
    pub profile_picture: Option<String>,
    pub is_played: bool,
    pub is_host: bool,
    pub is_payed: bool,
}

/// External-facing game document: letters stripped, wallet secret withheld.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    pub host: String,
    pub game_code: String,
    pub game_type: String,
    pub title: Option<String>,
    pub duration: String,
    pub reward: Option<f64>,
    pub currency: GameCurrency,
    pub stake: Option<f64>,
    pub game_status: GameStatus,
    pub host_payed: bool,
    pub wallet_pubkey: Option<String>,
    pub players: Vec<Player>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GameView {
    pub fn from_parts(game: Game, players: Vec<Player>) -> Self {
        Self {
            id: game.id,
            host: game.host,
            game_code: game.game_code,
            game_type: game.game_type,
            title: game.title,
            duration: game.duration,
            reward: game.reward,
            currency: game.currency,
            stake: game.stake,
            game_status: game.game_status,
            host_payed: game.host_payed,
            wallet_pubkey: game.wallet_pubkey,
            players,
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub limit: u32,
}

impl Pagination {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(limit))) as u32
        };
        Self {
            current_page: page,
            total_pages,
            total,
            limit,
        }
    }
}

/// Clamp raw pagination input the way the legacy API did: page >= 1,
/// 1 <= limit <= 100, defaulting to 1/10.
pub fn clamp_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = limit.filter(|l| (1..=100).contains(l)).unwrap_or(10);
    (page, limit)
}
