// src/db/admin_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::admin::{Admin, AdminChanges, NewAdmin},
};

#[async_trait]
pub trait AdminStore: Send + Sync {
    /// `None` lista os admins de todas as lojas.
    async fn list_admins(&self, shop_id: Option<Uuid>) -> Result<Vec<Admin>, AppError>;
    async fn find_admin(&self, id: Uuid) -> Result<Option<Admin>, AppError>;
    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError>;
    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError>;
    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> Result<Option<Admin>, AppError>;
    async fn delete_admin(&self, id: Uuid) -> Result<bool, AppError>;
    async fn count_admins(&self) -> Result<i64, AppError>;
}

// O repositório de admins, responsável pela tabela 'admins'
#[derive(Clone)]
pub struct PgAdminRepository {
    pool: PgPool,
}

impl PgAdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for PgAdminRepository {
    async fn list_admins(&self, shop_id: Option<Uuid>) -> Result<Vec<Admin>, AppError> {
        let admins = sqlx::query_as::<_, Admin>(
            r#"
            SELECT * FROM admins
            WHERE ($1::uuid IS NULL OR shop_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }

    async fn find_admin(&self, id: Uuid) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError> {
        sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (first_name, last_name, username, password_hash, level, shop_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(new.level)
        .bind(new.shop_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            map_unique_violation(e, "username", || {
                AppError::UsernameAlreadyExists(new.username.clone())
            })
        })
    }

    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> Result<Option<Admin>, AppError> {
        sqlx::query_as::<_, Admin>(
            r#"
            UPDATE admins SET
                first_name = $2,
                last_name = $3,
                username = $4,
                password_hash = COALESCE($5, password_hash),
                level = $6,
                shop_id = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.username)
        .bind(changes.password_hash.as_deref())
        .bind(changes.level)
        .bind(changes.shop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "username", || {
                AppError::UsernameAlreadyExists(changes.username.clone())
            })
        })
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_admins(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
