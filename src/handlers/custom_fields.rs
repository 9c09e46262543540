// src/handlers/custom_fields.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::ShopScope},
    models::custom_field::{CustomField, CustomFieldType, NewCustomField},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFieldPayload {
    // Vira o cabeçalho da coluna na planilha
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "วันเกิด")]
    pub name: String,

    #[serde(alias = "fieldType")]
    pub field_type: CustomFieldType,

    #[serde(default)]
    pub options: Option<Vec<String>>,

    #[serde(default, alias = "isRequired")]
    pub is_required: bool,

    // Ausente = exportável
    #[serde(default, alias = "isExportable")]
    pub is_exportable: Option<bool>,

    #[serde(default, alias = "sortOrder")]
    pub sort_order: i32,
}

// GET /api/custom-fields
#[utoipa::path(
    get,
    path = "/api/custom-fields",
    tag = "Custom Fields",
    params(("x-shop-id" = Option<Uuid>, Header, description = "Loja (obrigatório para superadmin)")),
    responses(
        (status = 200, description = "Campos personalizados da loja", body = Vec<CustomField>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .custom_field_service
        .list_fields(scope.shop_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(fields)))
}

// POST /api/custom-fields
#[utoipa::path(
    post,
    path = "/api/custom-fields",
    tag = "Custom Fields",
    request_body = CreateFieldPayload,
    responses(
        (status = 201, description = "Campo criado", body = CustomField),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Já existe um campo com esse nome")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_field(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let field = app_state
        .custom_field_service
        .create_field(NewCustomField {
            shop_id: scope.shop_id,
            name: payload.name,
            field_type: payload.field_type,
            options: payload.options,
            is_required: payload.is_required,
            is_exportable: payload.is_exportable.unwrap_or(true),
            sort_order: payload.sort_order,
        })
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(field)))
}

// DELETE /api/custom-fields/{id}
#[utoipa::path(
    delete,
    path = "/api/custom-fields/{id}",
    tag = "Custom Fields",
    params(("id" = Uuid, Path, description = "ID do campo")),
    responses(
        (status = 204, description = "Campo removido (com os valores)"),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_field(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .custom_field_service
        .delete_field(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
