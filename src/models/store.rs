// src/models/store.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Store (A "Loja")
// ---
// Unidade de isolamento: clientes, admins e promoções pertencem a uma loja
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Store {
    pub id: Uuid,
    #[schema(example = "Coffee Lab")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Branch (A "Filial")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Branch {
    pub id: Uuid,
    pub shop_id: Uuid,
    #[schema(example = "สาขาสยาม")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}
