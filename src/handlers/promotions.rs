// src/handlers/promotions.rs

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
    models::promotion::{
        Promotion, PromotionHistory, PromotionStatus, RedemptionEligibility, RedemptionReceipt,
    },
    services::promotion_service::PromotionInput,
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PromotionPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "แลกกาแฟฟรี 1 แก้ว")]
    pub name: String,

    #[validate(range(min = 0, message = "invalid_points"))]
    #[schema(example = 50)]
    pub points: i64,

    // Vazio = todas as filiais
    #[serde(default, alias = "branchIds")]
    pub branch_ids: Vec<Uuid>,

    // Ausente = aberta
    #[serde(default)]
    pub status: Option<PromotionStatus>,

    #[validate(url(message = "invalid_url"))]
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<PromotionPayload> for PromotionInput {
    fn from(payload: PromotionPayload) -> Self {
        Self {
            name: payload.name,
            points: payload.points,
            branch_ids: payload.branch_ids,
            status: payload.status.unwrap_or(PromotionStatus::Open),
            image_url: payload.image_url,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemPayload {
    #[serde(alias = "customerId")]
    pub customer_id: Uuid,

    // Ausente = filial do escopo
    #[serde(default, alias = "branchId")]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EligibilityQuery {
    #[serde(alias = "customerId")]
    pub customer_id: Uuid,
    #[serde(default, alias = "branchId")]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    #[serde(default, alias = "customerId")]
    pub customer_id: Option<Uuid>,
}

// =============================================================================
//  CRUD
// =============================================================================

// GET /api/promotions
#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "Promotions",
    params(
        ListQuery,
        ("x-shop-id" = Option<Uuid>, Header, description = "Loja (obrigatório para superadmin)")
    ),
    responses(
        (status = 200, description = "Lista paginada de promoções", body = Page<Promotion>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_promotions(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = app_state
        .promotion_service
        .list_promotions(scope.shop_id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/promotions/{id}
#[utoipa::path(
    get,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    params(("id" = Uuid, Path, description = "ID da promoção")),
    responses(
        (status = 200, description = "Promoção", body = Promotion),
        (status = 404, description = "Promoção não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let promotion = app_state
        .promotion_service
        .get_promotion(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(promotion)))
}

// POST /api/promotions
#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "Promotions",
    request_body = PromotionPayload,
    responses(
        (status = 201, description = "Promoção criada", body = Promotion),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Filial fora da loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Json(payload): Json<PromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .create_promotion(scope.shop_id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

// PUT /api/promotions/{id}
#[utoipa::path(
    put,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    params(("id" = Uuid, Path, description = "ID da promoção")),
    request_body = PromotionPayload,
    responses(
        (status = 200, description = "Promoção atualizada", body = Promotion),
        (status = 404, description = "Promoção não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .update_promotion(scope.shop_id, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(promotion)))
}

// DELETE /api/promotions/{id}
#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    params(("id" = Uuid, Path, description = "ID da promoção")),
    responses(
        (status = 204, description = "Promoção removida"),
        (status = 404, description = "Promoção não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .promotion_service
        .delete_promotion(scope.shop_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  RESGATE
// =============================================================================

// POST /api/promotions/{id}/redeem
#[utoipa::path(
    post,
    path = "/api/promotions/{id}/redeem",
    tag = "Redemption",
    params(("id" = Uuid, Path, description = "ID da promoção")),
    request_body = RedeemPayload,
    responses(
        (status = 201, description = "Resgate registrado, com o saldo restante", body = RedemptionReceipt),
        (status = 403, description = "Filial fora da promoção"),
        (status = 409, description = "Promoção encerrada ou resgate em andamento"),
        (status = 422, description = "Pontos insuficientes")
    ),
    security(("api_jwt" = []))
)]
pub async fn redeem_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<RedeemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .redemption_service
        .redeem(
            scope.shop_id,
            id,
            payload.customer_id,
            payload.branch_id.or(scope.branch_id),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/promotions/{id}/eligibility
#[utoipa::path(
    get,
    path = "/api/promotions/{id}/eligibility",
    tag = "Redemption",
    params(("id" = Uuid, Path, description = "ID da promoção"), EligibilityQuery),
    responses(
        (status = 200, description = "Saldo atual x custo da promoção", body = RedemptionEligibility)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_eligibility(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Path(id): Path<Uuid>,
    Query(query): Query<EligibilityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let eligibility = app_state
        .redemption_service
        .eligibility(
            scope.shop_id,
            id,
            query.customer_id,
            query.branch_id.or(scope.branch_id),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(eligibility)))
}

// GET /api/promotion-history
#[utoipa::path(
    get,
    path = "/api/promotion-history",
    tag = "Redemption",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Resgates da loja, mais recentes primeiro", body = Vec<PromotionHistory>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_history(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: ShopScope,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let history = app_state
        .redemption_service
        .list_history(scope.shop_id, query.customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(history)))
}
