// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Tenant (A "Organização": a doceria)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "Doceria Central")]
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. TenantMember (Colaborador: usuário + loja + cargo + licença)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantMember {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub is_active: bool,
    #[schema(example = "BASIC")]
    pub license_plan: String,
    pub license_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da tela de colaboradores (membro + dados do usuário + cargo).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role_id: Uuid,
    pub role_name: String,
    pub is_active: bool,
    pub license_plan: String,
    pub license_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "location_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Store,   // Loja (PDV)
    Factory, // Fábrica / cozinha de produção
}

// ---
// 3. Location (O "Local")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Loja Centro")]
    pub name: String,
    pub kind: LocationKind,
    pub created_at: DateTime<Utc>,
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "O nome da loja é obrigatório."))]
    #[schema(example = "Doceria Central")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationPayload {
    #[validate(length(min = 1, message = "O nome do local é obrigatório."))]
    #[schema(example = "Cozinha Industrial")]
    pub name: String,
    pub kind: LocationKind,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollaboratorPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: String,
    /// Usada só quando o e-mail ainda não tem conta
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    pub role_id: Uuid,
    #[serde(default = "default_plan")]
    #[schema(example = "BASIC")]
    pub license_plan: String,
    pub license_expires_at: Option<DateTime<Utc>>,
}

fn default_plan() -> String {
    "BASIC".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollaboratorPayload {
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
    #[validate(length(min = 1))]
    pub license_plan: Option<String>,
    pub license_expires_at: Option<DateTime<Utc>>,
}
