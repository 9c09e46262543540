// src/db/promotion_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::promotion::{
        NewPromotion, Promotion, PromotionChanges, PromotionHistory, RedemptionRecord,
    },
};

#[async_trait]
pub trait PromotionStore: Send + Sync {
    async fn list_promotions(&self, shop_id: Uuid) -> Result<Vec<Promotion>, AppError>;
    async fn find_promotion(&self, id: Uuid) -> Result<Option<Promotion>, AppError>;
    async fn create_promotion(&self, new: NewPromotion) -> Result<Promotion, AppError>;
    async fn update_promotion(&self, id: Uuid, changes: PromotionChanges) -> Result<Option<Promotion>, AppError>;
    async fn delete_promotion(&self, id: Uuid) -> Result<bool, AppError>;

    /// Desconta os pontos do cliente e grava o histórico numa única operação atômica.
    async fn redeem_promotion(&self, record: RedemptionRecord) -> Result<PromotionHistory, AppError>;
    async fn list_history(&self, shop_id: Uuid, customer_id: Option<Uuid>) -> Result<Vec<PromotionHistory>, AppError>;
}

#[derive(Clone)]
pub struct PgPromotionRepository {
    pool: PgPool,
}

impl PgPromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromotionStore for PgPromotionRepository {
    async fn list_promotions(&self, shop_id: Uuid) -> Result<Vec<Promotion>, AppError> {
        let promotions = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE shop_id = $1 ORDER BY created_at DESC",
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(promotions)
    }

    async fn find_promotion(&self, id: Uuid) -> Result<Option<Promotion>, AppError> {
        let promotion = sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promotion)
    }

    async fn create_promotion(&self, new: NewPromotion) -> Result<Promotion, AppError> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            INSERT INTO promotions (name, points, shop_id, branch_ids, status, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(new.points)
        .bind(new.shop_id)
        .bind(&new.branch_ids)
        .bind(new.status)
        .bind(new.image_url.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(promotion)
    }

    async fn update_promotion(&self, id: Uuid, changes: PromotionChanges) -> Result<Option<Promotion>, AppError> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            UPDATE promotions SET
                name = $2,
                points = $3,
                branch_ids = $4,
                status = $5,
                image_url = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.points)
        .bind(&changes.branch_ids)
        .bind(changes.status)
        .bind(changes.image_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(promotion)
    }

    async fn delete_promotion(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn redeem_promotion(&self, record: RedemptionRecord) -> Result<PromotionHistory, AppError> {
        // 1. Inicia a transação: desconto e histórico andam juntos
        let mut tx = self.pool.begin().await?;

        // 2. Desconta os pontos só se o saldo cobre o resgate
        let updated = sqlx::query(
            r#"
            UPDATE customers
            SET total_points = total_points - $2, updated_at = NOW()
            WHERE id = $1 AND total_points >= $2
            "#,
        )
        .bind(record.customer_id)
        .bind(record.points)
        .execute(&mut *tx)
        .await?;

        // Nada mudou: ou o cliente sumiu, ou o saldo não basta
        if updated.rows_affected() == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT total_points FROM customers WHERE id = $1")
                    .bind(record.customer_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match available {
                None => AppError::CustomerNotFound,
                Some(available) => AppError::InsufficientPoints { required: record.points, available },
            });
        }

        // 3. Grava o histórico
        let history = sqlx::query_as::<_, PromotionHistory>(
            r#"
            INSERT INTO promotion_history (promotion_id, customer_id, shop_id, branch_id, points_spent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(record.promotion_id)
        .bind(record.customer_id)
        .bind(record.shop_id)
        .bind(record.branch_id)
        .bind(record.points)
        .fetch_one(&mut *tx)
        .await?;

        // 4. Commit
        tx.commit().await?;
        Ok(history)
    }

    async fn list_history(&self, shop_id: Uuid, customer_id: Option<Uuid>) -> Result<Vec<PromotionHistory>, AppError> {
        let history = sqlx::query_as::<_, PromotionHistory>(
            r#"
            SELECT * FROM promotion_history
            WHERE shop_id = $1
            AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(shop_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }
}
