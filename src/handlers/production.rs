// src/handlers/production.rs

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
        rbac::{PermProductionRead, PermProductionWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::production::{BoardColumn, CreateProductionOrderPayload, MoveOrderPayload, ProductionOrder, StageHistoryEntry},
};

#[utoipa::path(
    post,
    path = "/api/production/orders",
    tag = "Production",
    request_body = CreateProductionOrderPayload,
    responses((status = 201, description = "Ordem criada em BACKLOG", body = ProductionOrder)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductionWrite>,
    Json(payload): Json<CreateProductionOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .production_service
        .create_order(&mut *rls_conn, tenant.tenant_id, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// O front consulta o quadro periodicamente e substitui o estado inteiro
#[utoipa::path(
    get,
    path = "/api/production/board",
    tag = "Production",
    responses((status = 200, description = "Quadro Kanban agrupado por etapa", body = Vec<BoardColumn>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductionRead>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let board = app_state
        .production_service
        .board(&mut *rls_conn, tenant.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(board))
}

#[utoipa::path(
    post,
    path = "/api/production/orders/{order_id}/move",
    tag = "Production",
    request_body = MoveOrderPayload,
    responses(
        (status = 200, description = "Ordem movida", body = ProductionOrder),
        (status = 409, description = "Transição de etapa inválida"),
        (status = 422, description = "Sem ficha técnica ou estoque insuficiente")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID da Ordem"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductionWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<MoveOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .production_service
        .move_order(&mut *rls_conn, tenant.tenant_id, order_id, user.0.id, payload.to_stage)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

#[utoipa::path(
    get,
    path = "/api/production/orders/{order_id}/history",
    tag = "Production",
    responses((status = 200, description = "Histórico de etapas da ordem", body = Vec<StageHistoryEntry>)),
    params(
        ("order_id" = Uuid, Path, description = "ID da Ordem"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_history(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermProductionRead>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let history = app_state
        .production_service
        .history(&mut *rls_conn, tenant.tenant_id, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(history))
}
