//! Gamer account queries.

use serde::Deserialize;

use playvault_core::db::unix_timestamp;

use crate::error::{ApiError, ApiResult};

use super::db::Database;
use super::models::Gamer;

/// Fields accepted when creating a gamer account.
#[derive(Debug, Clone, Default)]
pub struct NewGamer {
    pub pubkey: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub auth_provider: Option<String>,
}

/// Allow-listed profile update. Unknown fields are rejected at the boundary;
/// credentials, identity keys, and moderation flags are not reachable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GamerUpdate {
    pub username: Option<String>,
    pub profile_picture: Option<String>,
    pub best_score: Option<i64>,
}

impl GamerUpdate {
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.profile_picture.is_none() && self.best_score.is_none()
    }
}

impl Database {
    /// Create a gamer account with a fresh internal id and secure id.
    pub async fn create_gamer(&self, new: NewGamer) -> ApiResult<Gamer> {
        let now = unix_timestamp();
        let id = uuid::Uuid::new_v4().to_string();
        let secure_id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO gamers (id, pubkey, email, secure_id, username, password_hash, auth_provider, last_activity, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.pubkey)
        .bind(&new.email)
        .bind(&secure_id)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.auth_provider)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| map_gamer_conflict(&e))?;

        self.get_gamer(&id).await
    }

    pub async fn get_gamer(&self, id: &str) -> ApiResult<Gamer> {
        sqlx::query_as::<_, Gamer>("SELECT * FROM gamers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    pub async fn get_gamer_by_pubkey(&self, pubkey: &str) -> ApiResult<Option<Gamer>> {
        Ok(sqlx::query_as::<_, Gamer>("SELECT * FROM gamers WHERE pubkey = ?")
            .bind(pubkey)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_gamer_by_email(&self, email: &str) -> ApiResult<Option<Gamer>> {
        Ok(sqlx::query_as::<_, Gamer>("SELECT * FROM gamers WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_gamer_by_secure_id(&self, secure_id: &str) -> ApiResult<Option<Gamer>> {
        Ok(
            sqlx::query_as::<_, Gamer>("SELECT * FROM gamers WHERE secure_id = ?")
                .bind(secure_id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Bump `last_activity` (initialize path, login).
    pub async fn touch_gamer(&self, id: &str) -> ApiResult<()> {
        let now = unix_timestamp();
        sqlx::query("UPDATE gamers SET last_activity = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Apply an allow-listed profile update.
    pub async fn update_gamer(&self, id: &str, update: &GamerUpdate) -> ApiResult<Gamer> {
        if update.is_empty() {
            return Err(ApiError::Validation("No update data provided".into()));
        }
        if let Some(score) = update.best_score {
            if score < 0 {
                return Err(ApiError::Validation("best_score cannot be negative".into()));
            }
        }

        let existing = self.get_gamer(id).await?;
        let now = unix_timestamp();

        sqlx::query(
            "UPDATE gamers SET username = ?, profile_picture = ?, best_score = ?, last_activity = ?, updated_at = ? WHERE id = ?",
        )
        .bind(update.username.as_ref().or(existing.username.as_ref()))
        .bind(update.profile_picture.as_ref().or(existing.profile_picture.as_ref()))
        .bind(update.best_score.unwrap_or(existing.best_score))
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_gamer(id).await
    }

    /// Mark the gamer as playing `current_game`. Fails if a game is already
    /// in flight.
    pub async fn start_game(&self, id: &str, current_game: &serde_json::Value) -> ApiResult<Gamer> {
        let existing = self.get_gamer(id).await?;
        if existing.is_playing {
            return Err(ApiError::Validation(
                "Cannot start game - user still has a pending game somewhere".into(),
            ));
        }

        let now = unix_timestamp();
        sqlx::query(
            "UPDATE gamers SET is_playing = 1, current_game = ?, last_activity = ?, updated_at = ? \
             WHERE id = ? AND is_playing = 0",
        )
        .bind(current_game.to_string())
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_gamer(id).await
    }

    /// Credit rewards and clear the playing flag. Idempotent: when the gamer
    /// is already idle the current state is returned and nothing is credited.
    /// Returns `(gamer, credited)`.
    pub async fn claim_rewards(&self, id: &str, reward_coins: i64) -> ApiResult<(Gamer, bool)> {
        if reward_coins < 0 {
            return Err(ApiError::Validation("Reward coins cannot be negative".into()));
        }

        let existing = self.get_gamer(id).await?;
        if !existing.is_playing {
            return Ok((existing, false));
        }

        let now = unix_timestamp();
        sqlx::query(
            "UPDATE gamers SET coins = coins + ?, total_earning = total_earning + ?, \
             total_games = total_games + 1, is_playing = 0, current_game = NULL, \
             last_activity = ?, updated_at = ? WHERE id = ? AND is_playing = 1",
        )
        .bind(reward_coins)
        .bind(reward_coins)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok((self.get_gamer(id).await?, true))
    }
}

fn map_gamer_conflict(e: &sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("An account with this identity already exists".into());
        }
    }
    ApiError::Internal(e.to_string())
}
