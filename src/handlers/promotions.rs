// src/handlers/promotions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermProductsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::promotions::{ComboDetail, ComboPayload, Promotion, PromotionPayload},
};

#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "Promotions",
    request_body = PromotionPayload,
    responses((status = 201, description = "Promoção criada", body = Promotion)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductsWrite>,
    Json(payload): Json<PromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .create_promotion(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

#[utoipa::path(
    put,
    path = "/api/promotions/{promotion_id}",
    tag = "Promotions",
    request_body = PromotionPayload,
    responses(
        (status = 200, description = "Promoção atualizada", body = Promotion),
        (status = 404, description = "Promoção não encontrada")
    ),
    params(
        ("promotion_id" = Uuid, Path, description = "ID da Promoção"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductsWrite>,
    Path(promotion_id): Path<Uuid>,
    Json(payload): Json<PromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .update_promotion(&mut *rls_conn, tenant.tenant_id, promotion_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(promotion))
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "Promotions",
    responses((status = 200, description = "Promoções cadastradas", body = Vec<Promotion>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_promotions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let promotions = app_state
        .promotion_service
        .list_promotions(&mut *rls_conn, tenant.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(promotions))
}

// ---
// Combos
// ---

#[utoipa::path(
    post,
    path = "/api/combos",
    tag = "Promotions",
    request_body = ComboPayload,
    responses((status = 201, description = "Combo criado", body = ComboDetail)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_combo(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductsWrite>,
    Json(payload): Json<ComboPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let combo = app_state
        .promotion_service
        .create_combo(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(combo)))
}

#[utoipa::path(
    get,
    path = "/api/combos",
    tag = "Promotions",
    responses((status = 200, description = "Combos com componentes", body = Vec<ComboDetail>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_combos(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let combos = app_state
        .promotion_service
        .list_combos(&mut *rls_conn, tenant.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(combos))
}
