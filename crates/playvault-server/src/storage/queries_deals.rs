//! Deal lifecycle queries.
//!
//! The request/progress transition rules live in [`super::status`]; every
//! operation here checks them through the enum methods, not string guards.

use playvault_core::db::unix_timestamp;

use crate::error::{ApiError, ApiResult};

use super::db::Database;
use super::models::Deal;
use super::status::{Currency, ProgressStatus, RequestResponse};

/// Seven days, the approval window for a new deal request.
const REQUEST_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Validated input for deal creation.
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub creator_id: String,
    pub secure_id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub price: f64,
    pub currency: Currency,
}

impl Database {
    /// Create a deal inside one transaction: verify the counterparty exists,
    /// reject self-dealing, insert with a 7-day request expiry.
    ///
    /// `creator_secure_id` is the creator's own public id, used for the
    /// self-dealing check.
    pub async fn create_deal(&self, new: NewDeal, creator_secure_id: &str) -> ApiResult<Deal> {
        if new.price <= 0.0 {
            return Err(ApiError::Validation("Price must be greater than 0".into()));
        }
        if new.title.trim().len() < 10 {
            return Err(ApiError::Validation("Title must be at least 10 characters".into()));
        }
        if new.description.trim().len() < 10 {
            return Err(ApiError::Validation(
                "Description must be at least 10 characters".into(),
            ));
        }
        if new.secure_id == creator_secure_id {
            return Err(ApiError::Validation("You cannot create a deal with yourself".into()));
        }

        let mut tx = self.pool().begin().await?;

        let seller: Option<(String,)> =
            sqlx::query_as("SELECT id FROM gamers WHERE secure_id = ?")
                .bind(&new.secure_id)
                .fetch_optional(&mut *tx)
                .await?;
        if seller.is_none() {
            return Err(ApiError::NotFound("Invalid secureId - seller not found".into()));
        }

        let now = unix_timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO deals (id, creator_id, secure_id, title, description, duration, price, currency, request_expiry, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.creator_id)
        .bind(&new.secure_id)
        .bind(new.title.trim())
        .bind(new.description.trim())
        .bind(new.duration.trim())
        .bind(new.price)
        .bind(new.currency)
        .bind(now + REQUEST_TTL_SECS)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_deal_conflict(&e))?;

        tx.commit().await?;

        self.get_deal(&id).await
    }

    pub async fn get_deal(&self, id: &str) -> ApiResult<Deal> {
        sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ApiError::NotFound("Deal not found".into()))
    }

    /// Counterparty accepts or declines a deal request. Only valid before
    /// the request expiry; the secure id must match the deal's counterparty.
    pub async fn respond_to_deal(
        &self,
        secure_id: &str,
        deal_id: &str,
        response: RequestResponse,
    ) -> ApiResult<Deal> {
        let deal: Option<Deal> =
            sqlx::query_as("SELECT * FROM deals WHERE id = ? AND secure_id = ?")
                .bind(deal_id)
                .bind(secure_id)
                .fetch_optional(self.pool())
                .await?;
        let deal = deal.ok_or_else(|| {
            ApiError::NotFound("Deal not found or you don't have permission to update it".into())
        })?;

        if unix_timestamp() > deal.request_expiry {
            return Err(ApiError::Expired("Deal request has expired".into()));
        }

        let now = unix_timestamp();
        sqlx::query(
            "UPDATE deals SET request_status = ?, progress_status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(response.request_status())
        .bind(response.progress_status())
        .bind(now)
        .bind(deal_id)
        .execute(self.pool())
        .await?;

        self.get_deal(deal_id).await
    }

    /// Creator cancels a deal; only allowed before payment has been made.
    pub async fn cancel_deal(&self, user_id: &str, deal_id: &str) -> ApiResult<Deal> {
        let deal = self.get_deal(deal_id).await?;

        if deal.creator_id != user_id {
            return Err(ApiError::Forbidden(
                "You don't have permission to cancel this deal. Only the creator can cancel it."
                    .into(),
            ));
        }
        if !deal.progress_status.cancelable() {
            return Err(ApiError::Validation(
                "Cannot cancel a deal that is in progress, completed, or in dispute".into(),
            ));
        }

        let now = unix_timestamp();
        sqlx::query("UPDATE deals SET progress_status = ?, updated_at = ? WHERE id = ?")
            .bind(ProgressStatus::Canceled)
            .bind(now)
            .bind(deal_id)
            .execute(self.pool())
            .await?;

        self.get_deal(deal_id).await
    }

    /// Creator removes a deal entirely; never allowed once active.
    /// Returns the deleted deal (callers need its ids for cache
    /// invalidation).
    pub async fn delete_deal(&self, user_id: &str, deal_id: &str) -> ApiResult<Deal> {
        let deal: Option<Deal> =
            sqlx::query_as("SELECT * FROM deals WHERE id = ? AND creator_id = ?")
                .bind(deal_id)
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
        let deal = deal.ok_or_else(|| {
            ApiError::NotFound("Deal not found or you don't have permission to delete it".into())
        })?;

        if !deal.progress_status.deletable() {
            return Err(ApiError::Validation(
                "Cannot delete a deal that is in progress, completed, or in dispute".into(),
            ));
        }

        sqlx::query("DELETE FROM deals WHERE id = ?")
            .bind(deal_id)
            .execute(self.pool())
            .await?;

        Ok(deal)
    }

    /// Deals addressed to a seller, newest first.
    pub async fn list_seller_deals(
        &self,
        secure_id: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<(Vec<Deal>, i64)> {
        let offset = (page - 1) * limit;

        let deals = sqlx::query_as::<_, Deal>(
            "SELECT * FROM deals WHERE secure_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(secure_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM deals WHERE secure_id = ?")
            .bind(secure_id)
            .fetch_one(self.pool())
            .await?;

        Ok((deals, total.0))
    }

    /// Deals a user participates in, as creator and/or as seller.
    pub async fn list_user_deals(
        &self,
        user_id: Option<&str>,
        secure_id: Option<&str>,
        page: u32,
        limit: u32,
    ) -> ApiResult<(Vec<Deal>, i64)> {
        if user_id.is_none() && secure_id.is_none() {
            return Err(ApiError::Validation("Either userId or secureId is required".into()));
        }
        let offset = (page - 1) * limit;
        // NULL comparisons never match, so absent filters fall away.
        let deals = sqlx::query_as::<_, Deal>(
            "SELECT * FROM deals WHERE creator_id = ? OR secure_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(secure_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM deals WHERE creator_id = ? OR secure_id = ?")
                .bind(user_id)
                .bind(secure_id)
                .fetch_one(self.pool())
                .await?;

        Ok((deals, total.0))
    }
}

fn map_deal_conflict(e: &sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("A deal with this title already exists".into());
        }
    }
    ApiError::Internal(e.to_string())
}
