// src/db/store_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::store::{Branch, Store},
};

#[async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<Store>, AppError>;
    async fn find_store(&self, id: Uuid) -> Result<Option<Store>, AppError>;
    async fn create_store(&self, name: &str) -> Result<Store, AppError>;

    async fn list_branches(&self, shop_id: Uuid) -> Result<Vec<Branch>, AppError>;
    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError>;
    async fn create_branch(&self, shop_id: Uuid, name: &str) -> Result<Branch, AppError>;
}

#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreDirectory for PgStoreRepository {
    async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        let stores = sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(stores)
    }

    async fn find_store(&self, id: Uuid) -> Result<Option<Store>, AppError> {
        let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    async fn create_store(&self, name: &str) -> Result<Store, AppError> {
        let store = sqlx::query_as::<_, Store>("INSERT INTO stores (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(store)
    }

    async fn list_branches(&self, shop_id: Uuid) -> Result<Vec<Branch>, AppError> {
        let branches = sqlx::query_as::<_, Branch>(
            "SELECT * FROM branches WHERE shop_id = $1 ORDER BY name ASC",
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(branches)
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError> {
        let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(branch)
    }

    async fn create_branch(&self, shop_id: Uuid, name: &str) -> Result<Branch, AppError> {
        let branch = sqlx::query_as::<_, Branch>(
            "INSERT INTO branches (shop_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(shop_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(branch)
    }
}
