// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::Utc;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::{parse_tenant_header, TenantContext},
    models::auth::User,
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Copia o token do cabeçalho: a requisição não pode ficar emprestada durante o `await`.
fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|bearer| bearer.token().to_string())
        .ok_or(AppError::InvalidToken)
}

/// Rotas do usuário: exige apenas um token válido.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let user = app_state.auth_service.validate_token(&token).await?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Rotas da loja: token válido + X-Tenant-ID de uma loja da qual o usuário é membro ativo.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    let tenant_id = parse_tenant_header(request.headers())?;
    let user = app_state.auth_service.validate_token(&token).await?;

    let member = app_state
        .tenant_repo
        .find_membership(user.id, tenant_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or(AppError::TenantAccessDenied)?;

    if let Some(expires_at) = member.license_expires_at {
        if expires_at < Utc::now() {
            tracing::warn!(user_id = %user.id, %tenant_id, "Licença expirada");
            return Err(AppError::LicenseExpired);
        }
    }

    request.extensions_mut().insert(TenantContext {
        tenant_id,
        role_id: member.role_id,
    });
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[test]
    fn bearer_token_is_copied_from_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));

        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_or_wrong_scheme_is_an_invalid_token() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AppError::InvalidToken)));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpzZW5oYQ=="));
        assert!(matches!(bearer_token(&headers), Err(AppError::InvalidToken)));
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn guards_are_send_futures() {
        // Só monta os futures; nada é executado.
        let _ = |state: AppState, request: Request<Body>, next: Next| {
            let fut = auth_guard(State(state), request, next);
            assert_send(&fut);
        };
        let _ = |state: AppState, request: Request<Body>, next: Next| {
            let fut = tenant_guard(State(state), request, next);
            assert_send(&fut);
        };
    }
}
