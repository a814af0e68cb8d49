// src/handlers/purchasing.rs

use axum::{
    extract::{Path, Query, State},
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
        rbac::{PermPurchasingWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::purchasing::{
        ChangeStatusPayload, CreatePurchaseOrderPayload, FromSuggestionsPayload, PurchaseOrder,
        PurchaseOrderDetail, PurchaseOrderQuery, ReceivePayload, SuggestionRequest, SupplierSuggestionGroup,
    },
};

#[utoipa::path(
    post,
    path = "/api/purchasing/suggestions",
    tag = "Purchasing",
    request_body = SuggestionRequest,
    responses((status = 200, description = "Sugestões de compra agrupadas por fornecedor", body = Vec<SupplierSuggestionGroup>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn get_suggestions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Json(payload): Json<SuggestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let groups = app_state
        .purchasing_service
        .suggestions(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(groups))
}

// ---
// Pedidos de compra
// ---

#[utoipa::path(
    post,
    path = "/api/pedidos",
    tag = "Purchasing",
    request_body = CreatePurchaseOrderPayload,
    responses((status = 201, description = "Pedido criado em rascunho", body = PurchaseOrderDetail)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Json(payload): Json<CreatePurchaseOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .purchasing_service
        .create_order(&mut *rls_conn, tenant.tenant_id, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    post,
    path = "/api/pedidos/from-suggestions",
    tag = "Purchasing",
    request_body = FromSuggestionsPayload,
    responses(
        (status = 201, description = "Pedido criado com as sugestões do fornecedor", body = PurchaseOrderDetail),
        (status = 404, description = "Nenhuma sugestão para o fornecedor")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_from_suggestions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Json(payload): Json<FromSuggestionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .purchasing_service
        .create_from_suggestions(&mut *rls_conn, tenant.tenant_id, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/pedidos",
    tag = "Purchasing",
    responses((status = 200, description = "Pedidos de compra", body = Vec<PurchaseOrder>)),
    params(
        PurchaseOrderQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Query(query): Query<PurchaseOrderQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let orders = app_state
        .purchasing_service
        .list_orders(&mut *rls_conn, tenant.tenant_id, query.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/pedidos/{order_id}",
    tag = "Purchasing",
    responses(
        (status = 200, description = "Pedido com itens", body = PurchaseOrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .purchasing_service
        .get_order(&mut *rls_conn, tenant.tenant_id, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/pedidos/{order_id}/status",
    tag = "Purchasing",
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = PurchaseOrder),
        (status = 409, description = "Transição de status inválida")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .purchasing_service
        .change_status(&mut *rls_conn, tenant.tenant_id, order_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/pedidos/{order_id}/receive",
    tag = "Purchasing",
    request_body = ReceivePayload,
    responses(
        (status = 200, description = "Pedido recebido e estoque atualizado", body = PurchaseOrderDetail),
        (status = 409, description = "Pedido não está enviado")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn receive_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermPurchasingWrite>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ReceivePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .purchasing_service
        .receive(&mut *rls_conn, tenant.tenant_id, order_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}
