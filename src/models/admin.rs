// src/models/admin.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::listing::{Listable, SortKey};

// A ordem das variantes importa: Admin < Superadmin
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "admin_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    Admin,
    Superadmin,
}

impl AdminLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::Admin => "admin",
            AdminLevel::Superadmin => "superadmin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Admin {
    pub id: Uuid,

    #[schema(example = "Somchai")]
    pub first_name: String,

    #[schema(example = "Jaidee")]
    pub last_name: String,

    #[schema(example = "somchai")]
    pub username: String,

    #[serde(skip_serializing, default)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listable for Admin {
    fn search_columns(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.first_name.as_str()),
            Cow::Borrowed(self.last_name.as_str()),
            Cow::Borrowed(self.username.as_str()),
            Cow::Borrowed(self.level.as_str()),
        ]
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        let key = match column {
            "first_name" => SortKey::text(&self.first_name),
            "last_name" => SortKey::text(&self.last_name),
            "username" => SortKey::text(&self.username),
            "level" => SortKey::text(self.level.as_str()),
            "created_at" => SortKey::Time(self.created_at),
            _ => return None,
        };
        Some(key)
    }
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct AdminChanges {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    // None mantém a senha atual
    pub password_hash: Option<String>,
    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,
}
