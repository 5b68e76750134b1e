//! Admin account queries.

use playvault_core::db::unix_timestamp;

use crate::error::{ApiError, ApiResult};

use super::db::Database;
use super::models::Admin;
use super::status::AdminRole;

impl Database {
    pub async fn create_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: AdminRole,
    ) -> ApiResult<Admin> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::Validation("A valid email is required".into()));
        }

        let now = unix_timestamp();
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO admins (id, email, password_hash, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| map_admin_conflict(&e))?;

        self.get_admin(&id).await
    }

    pub async fn get_admin(&self, id: &str) -> ApiResult<Admin> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| ApiError::NotFound("Admin not found".into()))
    }

    pub async fn get_admin_by_email(&self, email: &str) -> ApiResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        Ok(admin)
    }

    pub async fn list_admins(&self) -> ApiResult<Vec<Admin>> {
        let admins = sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY created_at")
            .fetch_all(self.pool())
            .await?;
        Ok(admins)
    }

    pub async fn update_admin_password(&self, id: &str, password_hash: &str) -> ApiResult<Admin> {
        let updated = sqlx::query("UPDATE admins SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::NotFound("Admin not found".into()));
        }
        self.get_admin(id).await
    }

    pub async fn delete_admin(&self, id: &str) -> ApiResult<()> {
        let deleted = sqlx::query("DELETE FROM admins WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::NotFound("Admin not found".into()));
        }
        Ok(())
    }
}

fn map_admin_conflict(e: &sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("An admin with this email already exists".into());
        }
    }
    ApiError::Internal(e.to_string())
}
