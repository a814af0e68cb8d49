// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermPurchasingWrite, PermSalesRead, RequirePermission},
        tenancy::TenantContext,
    },
};

fn pdf_response(bytes: Vec<u8>, filename: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{filename}\"")),
        ],
        bytes,
    )
}

#[utoipa::path(
    get,
    path = "/api/pdf/pedido-compra/{order_id}",
    tag = "Documents",
    responses(
        (status = 200, description = "PDF do pedido de compra", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(
        ("order_id" = Uuid, Path, description = "ID do Pedido"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn purchase_order_pdf(
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

    let bytes = app_state
        .document_service
        .purchase_order_pdf(&mut *rls_conn, tenant.tenant_id, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(pdf_response(bytes, format!("pedido-compra-{order_id}.pdf")))
}

#[utoipa::path(
    get,
    path = "/api/pdf/venda/{sale_id}",
    tag = "Documents",
    responses(
        (status = 200, description = "Cupom da venda (com QR PIX se configurado)", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("sale_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn sale_receipt_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesRead>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bytes = app_state
        .document_service
        .sale_receipt_pdf(&mut *rls_conn, tenant.tenant_id, sale_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(pdf_response(bytes, format!("venda-{sale_id}.pdf")))
}
