// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::admin::AdminLevel,
};

/// Sessão tipada do admin logado (substitui o `user` solto no localStorage do painel).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    pub admin_id: Uuid,
    pub username: String,
    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

impl Session {
    pub fn is_superadmin(&self) -> bool {
        self.level == AdminLevel::Superadmin
    }
}

// O middleware em si: valida o Bearer e injeta a Session nos extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .map_err(|_| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

    let session = app_state
        .auth_service
        .validate_token(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Extrator para obter a sessão diretamente nos handlers
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| ApiError {
            status: axum::http::StatusCode::UNAUTHORIZED,
            error: "Authentication token is invalid or missing.".into(),
            details: None,
        })
    }
}
