// src/handlers/finance.rs

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
        rbac::{PermFinanceRead, PermFinanceWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::finance::{
        DreQuery, DreReport, ExpenseCategory, ExpenseCategoryPayload, PayPayload, Payable, PayablePayload,
        PayableQuery, PayableView, SalesTarget, TargetPayload, TargetPeriodQuery, TargetProgress, TargetQuery,
    },
};

// ---
// Categorias de despesa
// ---

#[utoipa::path(
    post,
    path = "/api/finance/expense-categories",
    tag = "Finance",
    request_body = ExpenseCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = ExpenseCategory),
        (status = 409, description = "Categoria já existe")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceWrite>,
    Json(payload): Json<ExpenseCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .finance_service
        .create_category(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/finance/expense-categories",
    tag = "Finance",
    responses((status = 200, description = "Categorias de despesa", body = Vec<ExpenseCategory>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceRead>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let categories = app_state
        .finance_service
        .list_categories(&mut *rls_conn, tenant.tenant_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(categories))
}

// ---
// Contas a pagar
// ---

#[utoipa::path(
    post,
    path = "/api/finance/payables",
    tag = "Finance",
    request_body = PayablePayload,
    responses((status = 201, description = "Conta a pagar lançada", body = Payable)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_payable(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceWrite>,
    Json(payload): Json<PayablePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payable = app_state
        .finance_service
        .create_payable(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(payable)))
}

#[utoipa::path(
    get,
    path = "/api/finance/payables",
    tag = "Finance",
    responses((status = 200, description = "Contas a pagar com status de atraso", body = Vec<PayableView>)),
    params(
        PayableQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payables(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceRead>,
    Query(query): Query<PayableQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payables = app_state
        .finance_service
        .list_payables(&mut *rls_conn, tenant.tenant_id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payables))
}

#[utoipa::path(
    post,
    path = "/api/finance/payables/{payable_id}/pay",
    tag = "Finance",
    request_body = PayPayload,
    responses(
        (status = 200, description = "Pagamento registrado", body = Payable),
        (status = 400, description = "Valor maior que o saldo"),
        (status = 409, description = "Conta já quitada ou cancelada")
    ),
    params(
        ("payable_id" = Uuid, Path, description = "ID da Conta"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_payable(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceWrite>,
    Path(payable_id): Path<Uuid>,
    Json(payload): Json<PayPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payable = app_state
        .finance_service
        .pay(&mut *rls_conn, tenant.tenant_id, payable_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payable))
}

#[utoipa::path(
    post,
    path = "/api/finance/payables/{payable_id}/cancel",
    tag = "Finance",
    responses(
        (status = 200, description = "Conta cancelada", body = Payable),
        (status = 409, description = "Conta já quitada ou cancelada")
    ),
    params(
        ("payable_id" = Uuid, Path, description = "ID da Conta"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_payable(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceWrite>,
    Path(payable_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payable = app_state
        .finance_service
        .cancel_payable(&mut *rls_conn, tenant.tenant_id, payable_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(payable))
}

// ---
// DRE
// ---

#[utoipa::path(
    get,
    path = "/api/finance/dre",
    tag = "Finance",
    responses((status = 200, description = "Demonstração de resultado do período", body = DreReport)),
    params(
        DreQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dre(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceRead>,
    Query(query): Query<DreQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .finance_service
        .dre(&mut *rls_conn, tenant.tenant_id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}

// ---
// Metas de venda
// ---

#[utoipa::path(
    post,
    path = "/api/finance/targets",
    tag = "Finance",
    request_body = TargetPayload,
    responses(
        (status = 201, description = "Meta cadastrada", body = SalesTarget),
        (status = 409, description = "Já existe meta para o período")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_target(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceWrite>,
    Json(payload): Json<TargetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let target = app_state
        .finance_service
        .create_target(&mut *rls_conn, tenant.tenant_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(target)))
}

#[utoipa::path(
    get,
    path = "/api/finance/targets",
    tag = "Finance",
    responses((status = 200, description = "Metas cadastradas", body = Vec<SalesTarget>)),
    params(
        TargetQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_targets(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceRead>,
    Query(query): Query<TargetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let targets = app_state
        .finance_service
        .list_targets(&mut *rls_conn, tenant.tenant_id, query.year, query.month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(targets))
}

#[utoipa::path(
    get,
    path = "/api/finance/targets/progress",
    tag = "Finance",
    responses((status = 200, description = "Realizado, percentual e projeção do mês", body = Vec<TargetProgress>)),
    params(
        TargetPeriodQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_targets_progress(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermFinanceRead>,
    Query(query): Query<TargetPeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let progress = app_state
        .finance_service
        .targets_progress(&mut *rls_conn, tenant.tenant_id, query.year, query.month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(progress))
}
