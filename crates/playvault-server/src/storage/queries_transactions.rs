//! Transaction recording.

use playvault_core::db::unix_timestamp;

use crate::error::{ApiError, ApiResult};

use super::db::Database;
use super::models::{Deal, TransactionRecord};
use super::status::{Currency, ProgressStatus};

/// Validated input for recording a fund movement.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub deal_id: String,
    pub user_id: String,
    pub tx_hash: String,
    pub amount: f64,
    pub currency: Currency,
    pub sender_address: String,
}

impl Database {
    /// Record a transaction as one atomic unit spanning three writes:
    /// insert the transaction, flip the referenced deal to "in progress",
    /// and decrement the payer's escrow balance. Any failure rolls the whole
    /// unit back.
    pub async fn create_transaction(
        &self,
        new: NewTransaction,
    ) -> ApiResult<(TransactionRecord, Deal)> {
        if new.amount <= 0.0 {
            return Err(ApiError::Validation("Amount must be greater than 0".into()));
        }
        if new.tx_hash.trim().is_empty() {
            return Err(ApiError::Validation("txHash is required".into()));
        }

        let mut tx = self.pool().begin().await?;

        let now = unix_timestamp();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO transactions (id, deal_id, user_id, tx_hash, amount, currency, sender_address, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.deal_id)
        .bind(&new.user_id)
        .bind(new.tx_hash.trim())
        .bind(new.amount)
        .bind(new.currency)
        .bind(new.sender_address.trim())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_transaction_conflict(&e))?;

        let updated = sqlx::query(
            "UPDATE deals SET progress_status = ?, updated_at = ? WHERE id = ? AND creator_id = ?",
        )
        .bind(ProgressStatus::InProgress)
        .bind(now)
        .bind(&new.deal_id)
        .bind(&new.user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Implicit rollback on drop.
            return Err(ApiError::NotFound(format!(
                "Deal with id {} not found",
                new.deal_id
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let amount_units = new.amount.round() as i64;
        sqlx::query(
            "UPDATE gamers SET escrow_balance = escrow_balance - ?, updated_at = ? WHERE id = ?",
        )
        .bind(amount_units)
        .bind(now)
        .bind(&new.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let record = self.get_transaction(&id).await?;
        let deal = self.get_deal(&new.deal_id).await?;
        Ok((record, deal))
    }

    pub async fn get_transaction(&self, id: &str) -> ApiResult<TransactionRecord> {
        sqlx::query_as::<_, TransactionRecord>("SELECT * FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ApiError::NotFound("Transaction not found".into()))
    }
}

fn map_transaction_conflict(e: &sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("A transaction with this ID already exists".into());
        }
    }
    ApiError::Internal(e.to_string())
}
