// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Contexto da loja não encontrado")]
    MissingShopContext,

    #[error("Cabeçalho inválido: {0}")]
    InvalidHeader(&'static str),

    #[error("Administrador não encontrado")]
    AdminNotFound,

    #[error("Cliente não encontrado")]
    CustomerNotFound,

    #[error("Promoção não encontrada")]
    PromotionNotFound,

    #[error("Loja não encontrada")]
    StoreNotFound,

    #[error("Filial não encontrada")]
    BranchNotFound,

    #[error("Campo personalizado não encontrado")]
    CustomFieldNotFound,

    #[error("Usuário '{0}' já existe")]
    UsernameAlreadyExists(String),

    #[error("Telefone '{0}' já cadastrado")]
    DuplicatePhone(String),

    #[error("Campo '{0}' já existe")]
    CustomFieldNameAlreadyExists(String),

    #[error("Pontos insuficientes (necessário {required}, disponível {available})")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("O saldo de pontos não pode ficar negativo")]
    NegativeBalance,

    #[error("Resgate já em andamento")]
    RedemptionInProgress,

    #[error("Promoção encerrada")]
    PromotionClosed,

    #[error("Filial não participa da promoção")]
    BranchNotEligible,

    #[error("Falha no resgate: {0}")]
    RedemptionFailed(String),

    #[error("Valores personalizados inválidos")]
    CustomValueValidationError(HashMap<String, String>),

    #[error("Planilha inválida: {0}")]
    InvalidWorkbook(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro ao gerar planilha: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),
}

/// O erro que efetivamente vai para o cliente, já traduzido.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Chave estável usada no catálogo de traduções.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::MissingShopContext => "missing_shop_context",
            AppError::InvalidHeader(_) => "invalid_header",
            AppError::AdminNotFound => "admin_not_found",
            AppError::CustomerNotFound => "customer_not_found",
            AppError::PromotionNotFound => "promotion_not_found",
            AppError::StoreNotFound => "store_not_found",
            AppError::BranchNotFound => "branch_not_found",
            AppError::CustomFieldNotFound => "custom_field_not_found",
            AppError::UsernameAlreadyExists(_) => "username_already_exists",
            AppError::DuplicatePhone(_) => "duplicate_phone",
            AppError::CustomFieldNameAlreadyExists(_) => "custom_field_name_already_exists",
            AppError::InsufficientPoints { .. } => "insufficient_points",
            AppError::NegativeBalance => "negative_balance",
            AppError::RedemptionInProgress => "redemption_in_progress",
            AppError::PromotionClosed => "promotion_closed",
            AppError::BranchNotEligible => "branch_not_eligible",
            AppError::RedemptionFailed(_) => "redemption_failed",
            AppError::CustomValueValidationError(_) => "custom_value_invalid",
            AppError::InvalidWorkbook(_) => "invalid_workbook",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::SpreadsheetWrite(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidHeader(_)
            | AppError::MissingShopContext
            | AppError::CustomValueValidationError(_)
            | AppError::InvalidWorkbook(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::BranchNotEligible => StatusCode::FORBIDDEN,
            AppError::AdminNotFound
            | AppError::CustomerNotFound
            | AppError::PromotionNotFound
            | AppError::StoreNotFound
            | AppError::BranchNotFound
            | AppError::CustomFieldNotFound => StatusCode::NOT_FOUND,
            AppError::UsernameAlreadyExists(_)
            | AppError::DuplicatePhone(_)
            | AppError::CustomFieldNameAlreadyExists(_)
            | AppError::RedemptionInProgress
            | AppError::PromotionClosed => StatusCode::CONFLICT,
            AppError::InsufficientPoints { .. } | AppError::NegativeBalance => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::RedemptionFailed(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::SpreadsheetWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Parâmetros interpolados na mensagem traduzida.
    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::UsernameAlreadyExists(username) => vec![("username", username.clone())],
            AppError::DuplicatePhone(phone) => vec![("phone", phone.clone())],
            AppError::CustomFieldNameAlreadyExists(name) => vec![("name", name.clone())],
            AppError::InsufficientPoints { required, available } => vec![
                ("required", required.to_string()),
                ("available", available.to_string()),
            ],
            AppError::InvalidHeader(header) => vec![("header", header.to_string())],
            AppError::InvalidWorkbook(reason) => vec![("reason", reason.clone())],
            _ => Vec::new(),
        }
    }

    /// Converte o erro interno na resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let message = i18n.translate(&locale.0, self.code(), &self.params());

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_deref().unwrap_or(&e.code);
                            i18n.translate(&locale.0, &format!("validation.{}", code), &[])
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::CustomValueValidationError(errors) => {
                let translated: HashMap<&String, String> = errors
                    .iter()
                    .map(|(field, code)| {
                        (field, i18n.translate(&locale.0, &format!("validation.{}", code), &[]))
                    })
                    .collect();
                Some(json!(translated))
            }
            _ => None,
        };

        ApiError {
            status,
            error: message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Helper para erros de validação montados à mão (fora do derive).
pub fn field_error(field: &'static str, code: &'static str) -> AppError {
    let mut errors = validator::ValidationErrors::new();
    let mut error = validator::ValidationError::new(code);
    error.message = Some(code.into());
    errors.add(field, error);
    AppError::ValidationError(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_points_is_localized_with_params() {
        let i18n = I18nStore::embedded().unwrap();
        let err = AppError::InsufficientPoints { required: 50, available: 20 };

        let api = err.to_api_error(&Locale("en".into()), &i18n);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.error.contains("50"));
        assert!(api.error.contains("20"));

        let api_th = err.to_api_error(&Locale("th".into()), &i18n);
        assert!(api_th.error.contains("คะแนน"));
    }

    #[test]
    fn field_error_reports_the_field_with_translated_details() {
        let i18n = I18nStore::embedded().unwrap();
        let err = field_error("phone", "invalid_phone");

        let api = err.to_api_error(&Locale("en".into()), &i18n);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert!(details["phone"][0].as_str().unwrap().to_lowercase().contains("phone"));
    }
}
