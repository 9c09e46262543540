// src/models/customer.rs

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::listing::{Listable, SortKey};
use crate::models::custom_field::CustomerCustomValue;

// Mapeia o CREATE TYPE customer_role do banco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CustomerRole {
    Adminshop,
    #[default]
    Customer,
}

impl CustomerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerRole::Adminshop => "adminshop",
            CustomerRole::Customer => "customer",
        }
    }
}

impl fmt::Display for CustomerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "adminshop" => Ok(CustomerRole::Adminshop),
            "customer" => Ok(CustomerRole::Customer),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: Uuid,

    #[schema(example = "สมชาย ใจดี")]
    pub name: String,

    #[schema(example = "0812345678")]
    pub phone: String,

    pub role: CustomerRole,
    pub otp_verify: bool,
    pub line_token: Option<String>,

    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,

    #[schema(example = 120)]
    pub total_points: i64,
    pub last_checkin_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listable for Customer {
    fn search_columns(&self) -> Vec<Cow<'_, str>> {
        let mut columns = vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.phone.as_str()),
            Cow::Borrowed(self.role.as_str()),
        ];
        if let Some(token) = &self.line_token {
            columns.push(Cow::Borrowed(token.as_str()));
        }
        columns
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        let key = match column {
            "name" => SortKey::text(&self.name),
            "phone" => SortKey::text(&self.phone),
            "role" => SortKey::text(self.role.as_str()),
            "otp_verify" => SortKey::Bool(self.otp_verify),
            "total_points" => SortKey::Number(self.total_points),
            "last_checkin_at" => SortKey::opt_time(self.last_checkin_at),
            "created_at" => SortKey::Time(self.created_at),
            _ => return None,
        };
        Some(key)
    }
}

/// Cliente com os valores dos campos personalizados da loja.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub custom_values: Vec<CustomerCustomValue>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PointsBalance {
    pub customer_id: Uuid,
    pub total_points: i64,
}

/// Resposta da checagem de telefone feita antes de salvar o formulário.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhoneCheck {
    pub phone: String,
    pub available: bool,
    pub customer_id: Option<Uuid>,
}

// --- Entradas dos stores ---

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub role: CustomerRole,
    pub otp_verify: bool,
    pub line_token: Option<String>,
    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub total_points: i64,
}

#[derive(Debug, Clone)]
pub struct CustomerChanges {
    pub name: String,
    pub phone: String,
    pub role: CustomerRole,
    pub otp_verify: bool,
    pub line_token: Option<String>,
    pub branch_id: Option<Uuid>,
}
