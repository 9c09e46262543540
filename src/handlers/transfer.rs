// src/handlers/transfer.rs

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::ShopScope},
    services::transfer_service::{ImportReport, XLSX_CONTENT_TYPE},
};

// Só para a documentação do multipart
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ImportUpload {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

const EXPORT_DISPOSITION: &str = "attachment; filename=\"customers.xlsx\"";
const TEMPLATE_DISPOSITION: &str = "attachment; filename=\"customers-template.xlsx\"";

// Lê o campo "file" do multipart
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidWorkbook(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidWorkbook(e.to_string()))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::InvalidWorkbook("campo 'file' ausente".into()))
}

// POST /api/customers/import
#[utoipa::path(
    post,
    path = "/api/customers/import",
    tag = "Transfer",
    request_body(content = ImportUpload, content_type = "multipart/form-data", description = "Planilha .xlsx no campo 'file'"),
    responses(
        (status = 200, description = "Resumo da importação, com os erros por linha", body = ImportReport),
        (status = 400, description = "Arquivo ausente ou planilha ilegível")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_upload(&mut multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut report = app_state
        .transfer_service
        .import_customers(&scope, &bytes)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    report.localize(&locale.0, &app_state.i18n_store);

    tracing::info!(
        "📥 Importação na loja {}: {} ok, {} com erro",
        scope.shop_id,
        report.success_count,
        report.error_count
    );

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/customers/export
#[utoipa::path(
    get,
    path = "/api/customers/export",
    tag = "Transfer",
    responses(
        (status = 200, description = "Clientes da loja em .xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = app_state
        .transfer_service
        .export_customers(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, EXPORT_DISPOSITION),
        ],
        bytes,
    ))
}

// GET /api/customers/import-template
#[utoipa::path(
    get,
    path = "/api/customers/import-template",
    tag = "Transfer",
    responses(
        (status = 200, description = "Planilha vazia com o cabeçalho da importação", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_template(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = app_state
        .transfer_service
        .import_template(&scope)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, TEMPLATE_DISPOSITION),
        ],
        bytes,
    ))
}
