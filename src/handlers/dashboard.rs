// src/handlers/dashboard.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::dashboard::{DashboardLayout, DashboardSummary, LayoutQuery, SaveLayoutPayload, WidgetInfo},
};

#[utoipa::path(
    get,
    path = "/api/dashboard/widgets",
    tag = "Dashboard",
    responses((status = 200, description = "Widgets visíveis para o cargo do usuário", body = Vec<WidgetInfo>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_widgets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let widgets = app_state
        .dashboard_service
        .widgets(&mut *rls_conn, tenant.role_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(widgets))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/layout",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Layout do cargo (ou o padrão)", body = DashboardLayout),
        (status = 403, description = "Sem permissão para ver o layout de outro cargo")
    ),
    params(
        LayoutQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_layout(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<LayoutQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let layout = app_state
        .dashboard_service
        .get_layout(&mut *rls_conn, tenant.tenant_id, tenant.role_id, query.role_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(layout))
}

// Salvar o próprio layout é livre; o de outro cargo exige dashboard:manage (checado no serviço)
#[utoipa::path(
    put,
    path = "/api/dashboard/layout",
    tag = "Dashboard",
    request_body = SaveLayoutPayload,
    responses(
        (status = 200, description = "Layout salvo", body = DashboardLayout),
        (status = 400, description = "Widget desconhecido, repetido ou tamanho inválido")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn save_layout(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<SaveLayoutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let layout = app_state
        .dashboard_service
        .save_layout(&mut *rls_conn, tenant.tenant_id, tenant.role_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(layout))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/widgets/{key}",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dados do widget no formato { key, data }"),
        (status = 403, description = "Cargo sem a permissão do widget"),
        (status = 404, description = "Widget desconhecido")
    ),
    params(
        ("key" = String, Path, description = "Chave do widget (ex: sales_today)"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_widget_data(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let data = app_state
        .dashboard_service
        .widget_data(&mut *rls_conn, tenant.tenant_id, tenant.role_id, &key)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses((status = 200, description = "Indicadores do dia", body = DashboardSummary)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .dashboard_service
        .summary(&mut *rls_conn, tenant.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}
