// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        listing::{ListQuery, Page},
    },
    config::AppState,
    middleware::{i18n::Locale, tenancy::ShopScope},
    models::{
        custom_field::{CustomValueInput, CustomerCustomValue},
        customer::{Customer, CustomerDetail, CustomerRole, PhoneCheck, PointsBalance},
    },
    services::customer_service::CustomerInput,
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CustomerPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "สมชาย ใจดี")]
    pub name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "081-234-5678")]
    pub phone: String,

    #[serde(default)]
    pub role: CustomerRole,

    #[serde(default, alias = "otpVerify")]
    pub otp_verify: bool,

    #[serde(default, alias = "lineToken")]
    pub line_token: Option<String>,

    // Se vier, precisa ser a loja do escopo
    #[serde(default, alias = "shopId", alias = "storeId")]
    pub shop_id: Option<Uuid>,

    #[serde(default, alias = "branchId")]
    pub branch_id: Option<Uuid>,

    // Só na criação
    #[validate(range(min = 0, message = "invalid_points"))]
    #[serde(default, alias = "totalPoints")]
    pub total_points: i64,

    #[serde(default, alias = "customValues")]
    pub custom_values: Vec<CustomValueInput>,
}

impl CustomerPayload {
    fn into_input(self, scope: &ShopScope) -> Result<CustomerInput, AppError> {
        if self.shop_id.is_some_and(|shop| shop != scope.shop_id) {
            return Err(AppError::Forbidden);
        }

        Ok(CustomerInput {
            name: self.name,
            phone: self.phone,
            role: self.role,
            otp_verify: self.otp_verify,
            line_token: self.line_token,
            branch_id: self.branch_id.or(scope.branch_id),
            total_points: self.total_points,
            custom_values: self.custom_values,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckPhoneQuery {
    pub phone: String,
    #[serde(default, alias = "branchId")]
    pub branch_id: Option<Uuid>,
    // Ignora o próprio cliente ao editar
    #[serde(default, alias = "excludeId")]
    pub exclude_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustPointsPayload {
    // Positivo credita, negativo debita
    #[schema(example = 25)]
    pub delta: i64,
}

// =============================================================================
//  CRUD
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(
        ListQuery,
        ("x-shop-id" = Option<Uuid>, Header, description = "Loja (obrigatório para superadmin)"),
        ("x-branch-id" = Option<Uuid>, Header, description = "Filtra pela filial")
    ),
    responses(
        (status = 200, description = "Lista paginada de clientes", body = Page<Customer>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .customer_service
        .list_customers(scope.shop_id, scope.branch_id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente com valores personalizados", body = CustomerDetail),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .get_customer(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Cliente criado", body = CustomerDetail),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Telefone já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = payload
        .into_input(&scope)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .create_customer(scope.shop_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = CustomerPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = CustomerDetail),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Telefone já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let input = payload
        .into_input(&scope)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .update_customer(scope.shop_id, id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Cliente removido"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_customer(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/customers/check-phone
#[utoipa::path(
    get,
    path = "/api/customers/check-phone",
    tag = "Customers",
    params(CheckPhoneQuery),
    responses(
        (status = 200, description = "Disponibilidade do telefone", body = PhoneCheck),
        (status = 400, description = "Telefone inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_phone(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Query(query): Query<CheckPhoneQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let check = app_state
        .customer_service
        .check_phone(
            scope.shop_id,
            query.branch_id.or(scope.branch_id),
            &query.phone,
            query.exclude_id,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(check)))
}

// =============================================================================
//  PONTOS E CHECK-IN
// =============================================================================

// GET /api/customers/{id}/points
#[utoipa::path(
    get,
    path = "/api/customers/{id}/points",
    tag = "Points",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Saldo atual", body = PointsBalance),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_points(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = app_state
        .customer_service
        .points(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(balance)))
}

// POST /api/customers/{id}/points
#[utoipa::path(
    post,
    path = "/api/customers/{id}/points",
    tag = "Points",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = AdjustPointsPayload,
    responses(
        (status = 200, description = "Saldo após o ajuste", body = PointsBalance),
        (status = 422, description = "O saldo ficaria negativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn adjust_points(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustPointsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = app_state
        .customer_service
        .adjust_points(scope.shop_id, id, payload.delta)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(balance)))
}

// POST /api/customers/{id}/checkin
#[utoipa::path(
    post,
    path = "/api/customers/{id}/checkin",
    tag = "Points",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Check-in registrado", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn checkin(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .checkin(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// =============================================================================
//  VALORES PERSONALIZADOS
// =============================================================================

// GET /api/customers/{id}/custom-values
#[utoipa::path(
    get,
    path = "/api/customers/{id}/custom-values",
    tag = "Custom Fields",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Valores do cliente", body = Vec<CustomerCustomValue>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_custom_values(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let values = app_state
        .customer_service
        .custom_values(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(values)))
}

// PUT /api/customers/{id}/custom-values
#[utoipa::path(
    put,
    path = "/api/customers/{id}/custom-values",
    tag = "Custom Fields",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = Vec<CustomValueInput>,
    responses(
        (status = 200, description = "Valores gravados", body = Vec<CustomerCustomValue>),
        (status = 400, description = "Valores inválidos para o tipo do campo")
    ),
    security(("api_jwt" = []))
)]
pub async fn put_custom_values(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Json(values): Json<Vec<CustomValueInput>>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = app_state
        .customer_service
        .put_custom_values(scope.shop_id, id, &values)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(saved)))
}
