// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::admin::{Admin, AdminLevel};

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "somchai")]
    pub username: String,

    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,

    // Filial em que o painel vai operar (opcional)
    #[serde(default, alias = "branchId")]
    pub branch_id: Option<Uuid>,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub admin: Admin,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do admin)
    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}
