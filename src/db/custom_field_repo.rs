// src/db/custom_field_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::custom_field::{CustomField, CustomerCustomValue, NewCustomField},
};

#[async_trait]
pub trait CustomFieldStore: Send + Sync {
    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================
    async fn list_fields(&self, shop_id: Uuid) -> Result<Vec<CustomField>, AppError>;
    async fn find_field(&self, id: Uuid) -> Result<Option<CustomField>, AppError>;
    async fn create_field(&self, new: NewCustomField) -> Result<CustomField, AppError>;
    async fn delete_field(&self, id: Uuid) -> Result<bool, AppError>;

    // =========================================================================
    //  VALORES (O Dado)
    // =========================================================================
    async fn list_values(&self, customer_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError>;
    async fn list_values_for_shop(&self, shop_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError>;
    async fn upsert_value(
        &self,
        customer_id: Uuid,
        field_id: Uuid,
        value: &str,
    ) -> Result<CustomerCustomValue, AppError>;
}

#[derive(Clone)]
pub struct PgCustomFieldRepository {
    pool: PgPool,
}

impl PgCustomFieldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomFieldStore for PgCustomFieldRepository {
    async fn list_fields(&self, shop_id: Uuid) -> Result<Vec<CustomField>, AppError> {
        let fields = sqlx::query_as::<_, CustomField>(
            r#"
            SELECT * FROM custom_fields
            WHERE shop_id = $1
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    async fn find_field(&self, id: Uuid) -> Result<Option<CustomField>, AppError> {
        let field = sqlx::query_as::<_, CustomField>("SELECT * FROM custom_fields WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(field)
    }

    async fn create_field(&self, new: NewCustomField) -> Result<CustomField, AppError> {
        sqlx::query_as::<_, CustomField>(
            r#"
            INSERT INTO custom_fields (
                shop_id, name, field_type, options, is_required, is_exportable, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.shop_id)
        .bind(&new.name)
        .bind(new.field_type)
        .bind(new.options.as_deref())
        .bind(new.is_required)
        .bind(new.is_exportable)
        .bind(new.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Tratamento de erro de nome duplicado na mesma loja
            map_unique_violation(e, "name", || {
                AppError::CustomFieldNameAlreadyExists(new.name.clone())
            })
        })
    }

    async fn delete_field(&self, id: Uuid) -> Result<bool, AppError> {
        // Os valores saem junto (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM custom_fields WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_values(&self, customer_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        let values = sqlx::query_as::<_, CustomerCustomValue>(
            "SELECT * FROM customer_custom_values WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn list_values_for_shop(&self, shop_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        let values = sqlx::query_as::<_, CustomerCustomValue>(
            r#"
            SELECT v.* FROM customer_custom_values v
            INNER JOIN customers c ON c.id = v.customer_id
            WHERE c.shop_id = $1
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn upsert_value(
        &self,
        customer_id: Uuid,
        field_id: Uuid,
        value: &str,
    ) -> Result<CustomerCustomValue, AppError> {
        // UPSERT (Insert or Update)
        let value = sqlx::query_as::<_, CustomerCustomValue>(
            r#"
            INSERT INTO customer_custom_values (customer_id, field_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (customer_id, field_id)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(field_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}
