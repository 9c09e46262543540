// src/db/customer_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_unique_violation,
        error::{field_error, AppError},
    },
    models::customer::{Customer, CustomerChanges, NewCustomer},
};

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Clientes da loja; com `branch_id`, só os daquela filial.
    async fn list_customers(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<Vec<Customer>, AppError>;
    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError>;
    /// Busca exata por (loja, filial, telefone); filial `None` casa com clientes sem filial.
    async fn find_customer_by_phone(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        phone: &str,
    ) -> Result<Option<Customer>, AppError>;
    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError>;
    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> Result<Option<Customer>, AppError>;
    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Pontos ---
    async fn customer_points(&self, id: Uuid) -> Result<Option<i64>, AppError>;
    /// Soma `delta` ao saldo; nunca deixa o saldo negativo.
    async fn adjust_points(&self, id: Uuid, delta: i64) -> Result<Option<i64>, AppError>;
    async fn record_checkin(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Customer>, AppError>;
}

#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerRepository {
    async fn list_customers(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE shop_id = $1
            AND ($2::uuid IS NULL OR branch_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(shop_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    async fn find_customer_by_phone(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        phone: &str,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE shop_id = $1
            AND branch_id IS NOT DISTINCT FROM $2
            AND phone = $3
            "#,
        )
        .bind(shop_id)
        .bind(branch_id)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                name, phone, role, otp_verify, line_token, shop_id, branch_id, total_points
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.phone)
        .bind(new.role)
        .bind(new.otp_verify)
        .bind(new.line_token.as_deref())
        .bind(new.shop_id)
        .bind(new.branch_id)
        .bind(new.total_points)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "phone", || AppError::DuplicatePhone(new.phone.clone())))
    }

    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = $2,
                phone = $3,
                role = $4,
                otp_verify = $5,
                line_token = $6,
                branch_id = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(changes.role)
        .bind(changes.otp_verify)
        .bind(changes.line_token.as_deref())
        .bind(changes.branch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "phone", || AppError::DuplicatePhone(changes.phone.clone())))
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn customer_points(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        let points: Option<i64> = sqlx::query_scalar("SELECT total_points FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(points)
    }

    async fn adjust_points(&self, id: Uuid, delta: i64) -> Result<Option<i64>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava a linha para o saldo não mudar entre a leitura e o UPDATE
        let current: Option<i64> =
            sqlx::query_scalar("SELECT total_points FROM customers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let next = current
            .checked_add(delta)
            .ok_or_else(|| field_error("delta", "points_out_of_range"))?;
        if next < 0 {
            return Err(AppError::NegativeBalance);
        }

        let updated: i64 = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET total_points = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING total_points
            "#,
        )
        .bind(id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn record_checkin(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET last_checkin_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }
}
