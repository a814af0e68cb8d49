// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "theme_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

/// Dados da loja + tema visual carregado pelo front na abertura da sessão.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "Doceria Central Ltda")]
    pub company_name: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,

    #[schema(example = "Rua das Flores, 123 - Centro")]
    pub address: Option<String>,

    #[schema(example = "(11) 99999-8888")]
    pub phone: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub pix_key: Option<String>,

    #[schema(example = "https://cdn.doceria.com/logo.png")]
    pub logo_url: Option<String>,

    #[schema(example = "#D94F70")]
    pub primary_color: Option<String>,

    pub theme_mode: ThemeMode,

    pub updated_at: Option<DateTime<Utc>>,
}

impl TenantSettings {
    pub fn empty(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            company_name: None,
            document_number: None,
            address: None,
            phone: None,
            pix_key: None,
            logo_url: None,
            primary_color: None,
            theme_mode: ThemeMode::Light,
            updated_at: None,
        }
    }
}

pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    if (hex.len() == 6 || hex.len() == 3) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("hex_color");
    err.message = Some("A cor deve estar no formato #RRGGBB.".into());
    Err(err)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub company_name: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub pix_key: Option<String>,
    #[validate(url(message = "A URL do logo é inválida."))]
    pub logo_url: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub primary_color: Option<String>,
    pub theme_mode: Option<ThemeMode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_and_long_hex_colors() {
        assert!(validate_hex_color("#D94F70").is_ok());
        assert!(validate_hex_color("#fff").is_ok());
    }

    #[test]
    fn rejects_colors_without_hash_or_with_bad_digits() {
        assert!(validate_hex_color("D94F70").is_err());
        assert!(validate_hex_color("#GGGGGG").is_err());
        assert!(validate_hex_color("#12345").is_err());
    }
}
