// src/models/custom_field.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Mapeia o CREATE TYPE custom_field_type do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "custom_field_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Text,
    Number,
    Date,
    Boolean,
    Email,
    Phone,
    Select,
}

// --- DEFINIÇÃO (O Molde) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustomField {
    pub id: Uuid,
    pub shop_id: Uuid,

    // Também é o cabeçalho da coluna na planilha
    #[schema(example = "วันเกิด")]
    pub name: String,

    pub field_type: CustomFieldType,

    // Opções para Select (Ex: ["S", "M", "L"])
    pub options: Option<Vec<String>>,

    pub is_required: bool,
    pub is_exportable: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

// --- VALOR (O Dado) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustomerCustomValue {
    pub customer_id: Uuid,
    pub field_id: Uuid,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomField {
    pub shop_id: Uuid,
    pub name: String,
    pub field_type: CustomFieldType,
    pub options: Option<Vec<String>>,
    pub is_required: bool,
    pub is_exportable: bool,
    pub sort_order: i32,
}

/// Um valor enviado pelo painel: `{ "field_id": ..., "value": "..." }`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomValueInput {
    #[serde(alias = "fieldId")]
    pub field_id: Uuid,
    pub value: String,
}
