// src/handlers/admins.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        listing::{ListQuery, Page},
    },
    config::AppState,
    middleware::{
        auth::Session,
        i18n::Locale,
        rbac::{RequireLevel, Superadmin},
    },
    models::admin::{Admin, AdminLevel},
    services::admin_service::AdminInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAdminPayload {
    #[validate(length(min = 1, message = "required"))]
    #[serde(alias = "firstName")]
    #[schema(example = "Somchai")]
    pub first_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[serde(alias = "lastName")]
    #[schema(example = "Jaidee")]
    pub last_name: String,

    #[validate(length(min = 3, message = "invalid_length"))]
    #[schema(example = "somchai")]
    pub username: String,

    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,

    pub level: AdminLevel,

    #[serde(default, alias = "shopId", alias = "storeId")]
    pub shop_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAdminPayload {
    #[validate(length(min = 1, message = "required"))]
    #[serde(alias = "firstName")]
    pub first_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[serde(alias = "lastName")]
    pub last_name: String,

    #[validate(length(min = 3, message = "invalid_length"))]
    pub username: String,

    // Em branco ou ausente = manter a senha atual
    #[serde(default)]
    pub password: Option<String>,

    pub level: AdminLevel,

    #[serde(default, alias = "shopId", alias = "storeId")]
    pub shop_id: Option<Uuid>,
}

// GET /api/admins
#[utoipa::path(
    get,
    path = "/api/admins",
    tag = "Admins",
    params(ListQuery),
    responses(
        (status = 200, description = "Lista paginada de admins", body = Page<Admin>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_admins(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .admin_service
        .list_admins(&session, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/admins/{id}
#[utoipa::path(
    get,
    path = "/api/admins/{id}",
    tag = "Admins",
    params(("id" = Uuid, Path, description = "ID do admin")),
    responses(
        (status = 200, description = "Admin", body = Admin),
        (status = 404, description = "Admin não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = app_state
        .admin_service
        .get_admin(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(admin)))
}

// POST /api/admins
#[utoipa::path(
    post,
    path = "/api/admins",
    tag = "Admins",
    request_body = CreateAdminPayload,
    responses(
        (status = 201, description = "Admin criado", body = Admin),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas superadmin"),
        (status = 409, description = "Usuário já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireLevel<Superadmin>,
    Json(payload): Json<CreateAdminPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let admin = app_state
        .admin_service
        .create_admin(AdminInput {
            first_name: payload.first_name,
            last_name: payload.last_name,
            username: payload.username,
            password: Some(payload.password),
            level: payload.level,
            shop_id: payload.shop_id,
        })
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(admin)))
}

// PUT /api/admins/{id}
#[utoipa::path(
    put,
    path = "/api/admins/{id}",
    tag = "Admins",
    params(("id" = Uuid, Path, description = "ID do admin")),
    request_body = UpdateAdminPayload,
    responses(
        (status = 200, description = "Admin atualizado", body = Admin),
        (status = 403, description = "Apenas superadmin"),
        (status = 404, description = "Admin não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireLevel<Superadmin>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let admin = app_state
        .admin_service
        .update_admin(
            id,
            AdminInput {
                first_name: payload.first_name,
                last_name: payload.last_name,
                username: payload.username,
                password: payload.password,
                level: payload.level,
                shop_id: payload.shop_id,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(admin)))
}

// DELETE /api/admins/{id}
#[utoipa::path(
    delete,
    path = "/api/admins/{id}",
    tag = "Admins",
    params(("id" = Uuid, Path, description = "ID do admin")),
    responses(
        (status = 204, description = "Admin removido"),
        (status = 403, description = "Apenas superadmin / não pode remover a si mesmo"),
        (status = 404, description = "Admin não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_admin(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireLevel<Superadmin>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .admin_service
        .delete_admin(&session, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
