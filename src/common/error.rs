// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso à loja negado")]
    TenantAccessDenied,

    #[error("Licença expirada")]
    LicenseExpired,

    #[error("Permissão '{0}' necessária")]
    PermissionDenied(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Já existe uma loja com o nome {0}")]
    TenantNameAlreadyExists(String),

    #[error("SKU já existe: {0}")]
    SkuAlreadyExists(String),

    #[error("Estoque insuficiente de {name}: disponível {available}, necessário {requested}")]
    InsufficientStock {
        name: String,
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    #[error("Ficha técnica não encontrada para o produto {0}")]
    RecipeNotFound(String),

    #[error("Ficha técnica inválida: {0}")]
    InvalidRecipe(String),

    #[error("Transição de etapa inválida: {from} -> {to}")]
    InvalidStageTransition { from: String, to: String },

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Layout inválido: {0}")]
    InvalidLayout(String),

    #[error("Resgate de pontos recusado: {0}")]
    LoyaltyRedeemRejected(String),

    #[error("Não é possível desativar o próprio acesso")]
    CannotDeactivateSelf,

    #[error("A loja precisa de ao menos um dono ativo")]
    LastActiveOwner,

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Erro já pronto para a resposta HTTP (mensagem traduzida).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Status HTTP + chave de tradução + parâmetros da mensagem.
    fn parts(&self) -> (StatusCode, &'static str, Vec<(&'static str, String)>) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error", vec![]),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_already_exists", vec![]),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials", vec![]),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", vec![]),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", vec![]),
            AppError::TenantAccessDenied => (StatusCode::FORBIDDEN, "tenant_access_denied", vec![]),
            AppError::LicenseExpired => (StatusCode::PAYMENT_REQUIRED, "license_expired", vec![]),
            AppError::PermissionDenied(slug) => {
                (StatusCode::FORBIDDEN, "permission_denied", vec![("permission", slug.clone())])
            }
            AppError::ResourceNotFound(what) => {
                (StatusCode::NOT_FOUND, "resource_not_found", vec![("resource", what.clone())])
            }
            AppError::UniqueConstraintViolation(msg) => {
                (StatusCode::CONFLICT, "unique_violation", vec![("detail", msg.clone())])
            }
            AppError::TenantNameAlreadyExists(name) => {
                (StatusCode::CONFLICT, "tenant_name_exists", vec![("name", name.clone())])
            }
            AppError::SkuAlreadyExists(sku) => {
                (StatusCode::CONFLICT, "sku_already_exists", vec![("sku", sku.clone())])
            }
            AppError::InsufficientStock { name, available, requested } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_stock",
                vec![
                    ("name", name.clone()),
                    ("available", available.normalize().to_string()),
                    ("requested", requested.normalize().to_string()),
                ],
            ),
            AppError::RecipeNotFound(product) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "recipe_not_found", vec![("product", product.clone())])
            }
            AppError::InvalidRecipe(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_recipe", vec![("reason", reason.clone())])
            }
            AppError::InvalidStageTransition { from, to } => (
                StatusCode::CONFLICT,
                "invalid_stage_transition",
                vec![("from", from.clone()), ("to", to.clone())],
            ),
            AppError::InvalidStatusTransition { from, to } => (
                StatusCode::CONFLICT,
                "invalid_status_transition",
                vec![("from", from.clone()), ("to", to.clone())],
            ),
            AppError::InvalidLayout(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_layout", vec![("reason", reason.clone())])
            }
            AppError::LoyaltyRedeemRejected(reason) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "loyalty_redeem_rejected", vec![("reason", reason.clone())])
            }
            AppError::CannotDeactivateSelf => (StatusCode::CONFLICT, "cannot_deactivate_self", vec![]),
            AppError::LastActiveOwner => (StatusCode::CONFLICT, "last_active_owner", vec![]),
            // Todos os outros erros viram 500.
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", vec![]),
        }
    }

    /// Converte o erro de domínio em uma resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key, params) = self.parts();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(&locale.0, key, &params),
            details,
        }
    }
}

// Retorna todos os detalhes da validação, campo a campo.
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details = serde_json::Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(field.to_string(), json!(messages));
    }
    Value::Object(details)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Para rotas sem o extrator de idioma (ex: middlewares), usamos o idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let store = I18nStore::default();
        self.to_api_error(&Locale::default(), &store).into_response()
    }
}

/// Erro de validação de um único campo, para regras que só o serviço conhece.
pub fn field_error(field: &'static str, code: &'static str, message: &str) -> AppError {
    let mut err = validator::ValidationError::new(code);
    err.message = Some(message.to_string().into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, err);
    AppError::ValidationError(errors)
}

/// Converte violação de unicidade em um erro de domínio; o resto vira DatabaseError.
pub fn map_unique_violation(e: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return on_conflict();
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn insufficient_stock_is_unprocessable_and_translated() {
        let store = I18nStore::default();
        let err = AppError::InsufficientStock {
            name: "Farinha".into(),
            available: Decimal::new(150, 2),
            requested: Decimal::new(3, 0),
        };
        let api = err.to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.error.contains("Farinha"));
        assert!(api.error.contains("1.5"));
    }

    #[test]
    fn unknown_locale_falls_back_to_portuguese() {
        let store = I18nStore::default();
        let api = AppError::InvalidCredentials.to_api_error(&Locale("fr".into()), &store);
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api.error, "E-mail ou senha inválidos.");
    }

    #[test]
    fn english_messages_are_used_when_requested() {
        let store = I18nStore::default();
        let api = AppError::LicenseExpired.to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.status, StatusCode::PAYMENT_REQUIRED);
        assert!(api.error.starts_with("Your license"));
    }
}
