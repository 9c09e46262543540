// src/models/promotion.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::listing::{Listable, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "promotion_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Open,
    Close,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::Open => "open",
            PromotionStatus::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Promotion {
    pub id: Uuid,

    #[schema(example = "แลกกาแฟฟรี 1 แก้ว")]
    pub name: String,

    // Custo do resgate em pontos
    #[schema(example = 50)]
    pub points: i64,

    pub shop_id: Uuid,

    // Vazio = válida em todas as filiais
    pub branch_ids: Vec<Uuid>,

    pub status: PromotionStatus,
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_valid_at(&self, branch_id: Option<Uuid>) -> bool {
        if self.branch_ids.is_empty() {
            return true;
        }
        branch_id.is_some_and(|id| self.branch_ids.contains(&id))
    }
}

impl Listable for Promotion {
    fn search_columns(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.status.as_str()),
        ]
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        let key = match column {
            "name" => SortKey::text(&self.name),
            "points" => SortKey::Number(self.points),
            "status" => SortKey::text(self.status.as_str()),
            "created_at" => SortKey::Time(self.created_at),
            _ => return None,
        };
        Some(key)
    }
}

/// Registro de resgate: liga um cliente à promoção resgatada.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PromotionHistory {
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub customer_id: Uuid,
    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub points_spent: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RedemptionReceipt {
    pub history: PromotionHistory,
    // Saldo relido do store depois do resgate
    pub remaining_points: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RedemptionEligibility {
    pub promotion_id: Uuid,
    pub customer_id: Uuid,
    pub current_points: i64,
    pub required_points: i64,
    pub can_redeem: bool,
    pub pending: bool,
}

#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub name: String,
    pub points: i64,
    pub shop_id: Uuid,
    pub branch_ids: Vec<Uuid>,
    pub status: PromotionStatus,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PromotionChanges {
    pub name: String,
    pub points: i64,
    pub branch_ids: Vec<Uuid>,
    pub status: PromotionStatus,
    pub image_url: Option<String>,
}

/// O que o store grava de uma vez: desconto dos pontos + histórico.
#[derive(Debug, Clone)]
pub struct RedemptionRecord {
    pub promotion_id: Uuid,
    pub customer_id: Uuid,
    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub points: i64,
}
