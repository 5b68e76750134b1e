//! Multiplayer game session queries.
//!
//! A game row carries the hidden letter payload and the escrow wallet
//! secret; both stay inside this module. Callers get [`Game`] (crate
//! internal) and expose [`super::models::GameView`] externally.

use playvault_core::db::unix_timestamp;
use rand::RngExt;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::letters::{generate_letter_tiles, LetterTile};
use crate::wallet::EscrowWallet;

use super::db::Database;
use super::models::{Game, Player};
use super::status::{GameCurrency, GameStatus};

/// Game type that plays without an escrow wallet.
const SOLO_PLAY: &str = "solo play";

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct NewGame {
    pub host: String,
    pub game_type: String,
    pub title: Option<String>,
    pub duration: String,
    pub reward: Option<f64>,
    pub currency: GameCurrency,
    pub stake: Option<f64>,
    pub host_name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub pubkey: String,
    pub player_name: String,
    pub profile_picture: Option<String>,
}

/// Partial update for a player row. Unknown fields are rejected so typos
/// fail loudly instead of silently changing nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub is_payed: Option<bool>,
    pub is_played: Option<bool>,
    pub player_score: Option<i64>,
}

impl PlayerUpdate {
    pub const fn is_empty(&self) -> bool {
        self.is_payed.is_none() && self.is_played.is_none() && self.player_score.is_none()
    }
}

/// Partial update for a game. Detail fields only apply while the game is
/// still pending; status changes follow the pending -> ongoing -> ended
/// transition table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GameUpdate {
    pub title: Option<String>,
    pub duration: Option<String>,
    pub reward: Option<f64>,
    pub currency: Option<GameCurrency>,
    pub stake: Option<f64>,
    pub game_status: Option<GameStatus>,
}

impl GameUpdate {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.duration.is_none()
            && self.reward.is_none()
            && self.currency.is_none()
            && self.stake.is_none()
            && self.game_status.is_none()
    }

    const fn has_detail_changes(&self) -> bool {
        self.title.is_some()
            || self.duration.is_some()
            || self.reward.is_some()
            || self.currency.is_some()
            || self.stake.is_some()
    }
}

/// What happened when a player asked to play.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// The host has not started the game yet.
    NotStarted,
    /// The game is already over.
    Ended,
    /// This player has already taken their turn.
    AlreadyPlayed,
    /// The hidden payload, released exactly once per player.
    Play {
        letters: Vec<LetterTile>,
        duration: String,
    },
}

impl Database {
    /// Create a game inside one transaction: verify the host account,
    /// enforce the one-pending-game-per-host rule, mint a unique join code,
    /// generate the letter bag, provision an escrow wallet (skipped for
    /// solo play), and seat the host as the first player.
    pub async fn create_game(&self, new: NewGame) -> ApiResult<(Game, Vec<Player>)> {
        if new.duration.trim().is_empty() {
            return Err(ApiError::Validation("Duration is required".into()));
        }
        if new.host_name.trim().is_empty() {
            return Err(ApiError::Validation("Player name is required".into()));
        }
        if new.reward.is_some_and(|r| r < 0.0) || new.stake.is_some_and(|s| s < 0.0) {
            return Err(ApiError::Validation("Reward and stake cannot be negative".into()));
        }

        let mut tx = self.pool().begin().await?;

        let host: Option<(String,)> = sqlx::query_as("SELECT id FROM gamers WHERE pubkey = ?")
            .bind(&new.host)
            .fetch_optional(&mut *tx)
            .await?;
        if host.is_none() {
            return Err(ApiError::NotFound("Host account not found".into()));
        }

        let pending: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM games WHERE host = ? AND game_status = 'pending'",
        )
        .bind(&new.host)
        .fetch_optional(&mut *tx)
        .await?;
        if pending.is_some() {
            return Err(ApiError::Conflict("You already have a pending game".into()));
        }

        let mut game_code = None;
        for _ in 0..CODE_ATTEMPTS {
            let candidate = random_code();
            let taken: Option<(String,)> =
                sqlx::query_as("SELECT id FROM games WHERE game_code = ?")
                    .bind(&candidate)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_none() {
                game_code = Some(candidate);
                break;
            }
        }
        let game_code = game_code
            .ok_or_else(|| ApiError::Internal("Could not allocate a unique game code".into()))?;

        let letters =
            serde_json::to_string(&generate_letter_tiles()).map_err(|e| ApiError::Internal(e.to_string()))?;
        let wallet = if new.game_type == SOLO_PLAY {
            None
        } else {
            Some(EscrowWallet::provision())
        };

        let now = unix_timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO games (id, host, game_code, game_type, title, duration, reward, currency, stake, letters, wallet_pubkey, wallet_secret, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.host)
        .bind(&game_code)
        .bind(new.game_type.trim())
        .bind(new.title.as_deref().map(str::trim))
        .bind(new.duration.trim())
        .bind(new.reward)
        .bind(new.currency)
        .bind(new.stake)
        .bind(&letters)
        .bind(wallet.as_ref().map(|w| w.pubkey.clone()))
        .bind(wallet.as_ref().map(|w| w.secret.clone()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_game_conflict(&e))?;

        sqlx::query(
            "INSERT INTO players (game_id, pubkey, player_name, profile_picture, is_host) \
             VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&id)
        .bind(&new.host)
        .bind(new.host_name.trim())
        .bind(new.profile_picture.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let game = self.get_game_by_code(&game_code).await?;
        let players = self.game_players(&game.id).await?;
        Ok((game, players))
    }

    pub async fn get_game_by_code(&self, game_code: &str) -> ApiResult<Game> {
        sqlx::query_as::<_, Game>("SELECT * FROM games WHERE game_code = ?")
            .bind(game_code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ApiError::NotFound("Game not found".into()))
    }

    pub async fn game_players(&self, game_id: &str) -> ApiResult<Vec<Player>> {
        let players =
            sqlx::query_as::<_, Player>("SELECT * FROM players WHERE game_id = ? ORDER BY id")
                .bind(game_id)
                .fetch_all(self.pool())
                .await?;
        Ok(players)
    }

    /// Seat a new player; only possible while the game is pending.
    pub async fn add_player(
        &self,
        game_code: &str,
        new: NewPlayer,
    ) -> ApiResult<(Game, Vec<Player>)> {
        if new.player_name.trim().is_empty() {
            return Err(ApiError::Validation("Player name is required".into()));
        }

        let game = self.get_game_by_code(game_code).await?;
        if !game.game_status.joinable() {
            return Err(ApiError::Validation(
                "Cannot join a game that has already started".into(),
            ));
        }

        sqlx::query(
            "INSERT INTO players (game_id, pubkey, player_name, profile_picture) VALUES (?, ?, ?, ?)",
        )
        .bind(&game.id)
        .bind(new.pubkey.trim())
        .bind(new.player_name.trim())
        .bind(new.profile_picture.as_deref())
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return ApiError::Conflict("You have already joined this game".into());
                }
            }
            ApiError::Internal(e.to_string())
        })?;

        let players = self.game_players(&game.id).await?;
        Ok((game, players))
    }

    /// Update one player's flags/score. Marking the host as payed also
    /// flips the game's `host_payed` flag.
    pub async fn update_player(
        &self,
        game_code: &str,
        pubkey: &str,
        update: PlayerUpdate,
    ) -> ApiResult<(Game, Vec<Player>)> {
        if update.is_empty() {
            return Err(ApiError::Validation("No valid fields provided for update".into()));
        }
        if update.player_score.is_some_and(|s| s < 0) {
            return Err(ApiError::Validation("Score cannot be negative".into()));
        }

        let game = self.get_game_by_code(game_code).await?;

        let player: Option<Player> =
            sqlx::query_as("SELECT * FROM players WHERE game_id = ? AND pubkey = ?")
                .bind(&game.id)
                .bind(pubkey)
                .fetch_optional(self.pool())
                .await?;
        let player =
            player.ok_or_else(|| ApiError::NotFound("Player not found in this game".into()))?;

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "UPDATE players SET \
               is_payed = COALESCE(?, is_payed), \
               is_played = COALESCE(?, is_played), \
               player_score = COALESCE(?, player_score) \
             WHERE id = ?",
        )
        .bind(update.is_payed)
        .bind(update.is_played)
        .bind(update.player_score)
        .bind(player.id)
        .execute(&mut *tx)
        .await?;

        if player.is_host && update.is_payed == Some(true) {
            sqlx::query("UPDATE games SET host_payed = 1, updated_at = ? WHERE id = ?")
                .bind(unix_timestamp())
                .bind(&game.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let game = self.get_game_by_code(game_code).await?;
        let players = self.game_players(&game.id).await?;
        Ok((game, players))
    }

    /// Host-only game update. Status changes follow the transition table
    /// regardless of other fields; detail edits require a pending game.
    pub async fn update_game(
        &self,
        game_code: &str,
        host: &str,
        update: GameUpdate,
    ) -> ApiResult<(Game, Vec<Player>)> {
        if update.is_empty() {
            return Err(ApiError::Validation("No valid fields provided for update".into()));
        }

        let game = self.get_game_by_code(game_code).await?;
        if game.host != host {
            return Err(ApiError::Forbidden("Only the host can update this game".into()));
        }

        if let Some(next) = update.game_status {
            if !game.game_status.can_transition_to(next) {
                return Err(ApiError::Validation(format!(
                    "Cannot move a {} game to {}",
                    status_label(game.game_status),
                    status_label(next)
                )));
            }
        }
        if update.has_detail_changes() && !game.game_status.editable() {
            return Err(ApiError::Validation(
                "Game details can only be changed before the game starts".into(),
            ));
        }

        sqlx::query(
            "UPDATE games SET \
               title = COALESCE(?, title), \
               duration = COALESCE(?, duration), \
               reward = COALESCE(?, reward), \
               currency = COALESCE(?, currency), \
               stake = COALESCE(?, stake), \
               game_status = COALESCE(?, game_status), \
               updated_at = ? \
             WHERE id = ?",
        )
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.duration.as_deref().map(str::trim))
        .bind(update.reward)
        .bind(update.currency)
        .bind(update.stake)
        .bind(update.game_status)
        .bind(unix_timestamp())
        .bind(&game.id)
        .execute(self.pool())
        .await?;

        let game = self.get_game_by_code(game_code).await?;
        let players = self.game_players(&game.id).await?;
        Ok((game, players))
    }

    /// Release the hidden payload to a seated player. The turn is not
    /// marked here; the client records its play through `update_player`,
    /// which flips `is_played` and closes the short-circuit below.
    pub async fn play_game(&self, game_code: &str, pubkey: &str) -> ApiResult<PlayOutcome> {
        let game = self.get_game_by_code(game_code).await?;

        match game.game_status {
            GameStatus::Pending => return Ok(PlayOutcome::NotStarted),
            GameStatus::Ended => return Ok(PlayOutcome::Ended),
            GameStatus::Ongoing => {}
        }

        let player: Option<Player> =
            sqlx::query_as("SELECT * FROM players WHERE game_id = ? AND pubkey = ?")
                .bind(&game.id)
                .bind(pubkey)
                .fetch_optional(self.pool())
                .await?;
        let player =
            player.ok_or_else(|| ApiError::NotFound("Player not found in this game".into()))?;

        if player.is_played {
            return Ok(PlayOutcome::AlreadyPlayed);
        }

        let letters: Vec<LetterTile> = serde_json::from_str(&game.letters)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(PlayOutcome::Play {
            letters,
            duration: game.duration,
        })
    }

    /// Remove a non-host player; only possible before the game starts.
    pub async fn remove_player(
        &self,
        game_code: &str,
        pubkey: &str,
    ) -> ApiResult<(Game, Vec<Player>)> {
        let game = self.get_game_by_code(game_code).await?;
        if !game.game_status.joinable() {
            return Err(ApiError::Validation(
                "Cannot remove players once the game has started".into(),
            ));
        }

        let player: Option<Player> =
            sqlx::query_as("SELECT * FROM players WHERE game_id = ? AND pubkey = ?")
                .bind(&game.id)
                .bind(pubkey)
                .fetch_optional(self.pool())
                .await?;
        let player =
            player.ok_or_else(|| ApiError::NotFound("Player not found in this game".into()))?;
        if player.is_host {
            return Err(ApiError::Validation("The host cannot leave their own game".into()));
        }

        sqlx::query("DELETE FROM players WHERE id = ?")
            .bind(player.id)
            .execute(self.pool())
            .await?;

        let players = self.game_players(&game.id).await?;
        Ok((game, players))
    }

    /// Host-only deletion; never allowed while the game is ongoing.
    /// Players cascade with the game row.
    pub async fn delete_game(&self, game_code: &str, host: &str) -> ApiResult<Game> {
        let game = self.get_game_by_code(game_code).await?;
        if game.host != host {
            return Err(ApiError::Forbidden("Only the host can delete this game".into()));
        }
        if !game.game_status.deletable() {
            return Err(ApiError::Validation("Cannot delete an ongoing game".into()));
        }

        sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(&game.id)
            .execute(self.pool())
            .await?;

        Ok(game)
    }

    /// The host's pending game, if any. At most one exists.
    pub async fn host_pending_game(&self, host: &str) -> ApiResult<Option<(Game, Vec<Player>)>> {
        let game: Option<Game> =
            sqlx::query_as("SELECT * FROM games WHERE host = ? AND game_status = 'pending'")
                .bind(host)
                .fetch_optional(self.pool())
                .await?;
        match game {
            Some(game) => {
                let players = self.game_players(&game.id).await?;
                Ok(Some((game, players)))
            }
            None => Ok(None),
        }
    }

    /// Games a host has created, newest first.
    pub async fn list_host_games(
        &self,
        host: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<(Vec<(Game, Vec<Player>)>, i64)> {
        let offset = (page - 1) * limit;
        let games = sqlx::query_as::<_, Game>(
            "SELECT * FROM games WHERE host = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(host)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games WHERE host = ?")
            .bind(host)
            .fetch_one(self.pool())
            .await?;

        Ok((self.with_players(games).await?, total.0))
    }

    /// Games a pubkey is seated in, newest first.
    pub async fn list_player_games(
        &self,
        pubkey: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<(Vec<(Game, Vec<Player>)>, i64)> {
        let offset = (page - 1) * limit;
        let games = sqlx::query_as::<_, Game>(
            "SELECT g.* FROM games g JOIN players p ON p.game_id = g.id \
             WHERE p.pubkey = ? ORDER BY g.created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(pubkey)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM games g JOIN players p ON p.game_id = g.id WHERE p.pubkey = ?",
        )
        .bind(pubkey)
        .fetch_one(self.pool())
        .await?;

        Ok((self.with_players(games).await?, total.0))
    }

    async fn with_players(&self, games: Vec<Game>) -> ApiResult<Vec<(Game, Vec<Player>)>> {
        let mut out = Vec::with_capacity(games.len());
        for game in games {
            let players = self.game_players(&game.id).await?;
            out.push((game, players));
        }
        Ok(out)
    }
}

fn random_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

const fn status_label(status: GameStatus) -> &'static str {
    match status {
        GameStatus::Pending => "pending",
        GameStatus::Ongoing => "ongoing",
        GameStatus::Ended => "ended",
    }
}

fn map_game_conflict(e: &sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("You already have a pending game".into());
        }
    }
    ApiError::Internal(e.to_string())
}
