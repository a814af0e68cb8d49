// src/db/tenancy_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::tenancy::{CollaboratorRow, Location, LocationKind, Tenant, TenantMember},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Associação do usuário com a loja (usada pelo tenant_guard em toda requisição).
    pub async fn find_membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<TenantMember>, AppError> {
        let member = sqlx::query_as::<_, TenantMember>(
            "SELECT * FROM tenant_members WHERE user_id = $1 AND tenant_id = $2",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    pub async fn user_has_tenant_with_name(&self, owner_id: Uuid, name: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tenants WHERE owner_id = $1 AND lower(name) = lower($2))",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::TenantNameAlreadyExists(name.to_string())))
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.* FROM tenants t
            JOIN tenant_members tm ON tm.tenant_id = t.id
            WHERE tm.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    /// Adiciona (ou reativa) um colaborador na loja.
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
        license_plan: &str,
        license_expires_at: Option<DateTime<Utc>>,
    ) -> Result<TenantMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, TenantMember>(
            r#"
            INSERT INTO tenant_members (tenant_id, user_id, role_id, license_plan, license_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, user_id)
            DO UPDATE SET
                role_id = EXCLUDED.role_id,
                is_active = TRUE,
                license_plan = EXCLUDED.license_plan,
                license_expires_at = EXCLUDED.license_expires_at,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role_id)
        .bind(license_plan)
        .bind(license_expires_at)
        .fetch_one(executor)
        .await?;
        Ok(member)
    }

    /// Atualização parcial: campos `None` mantêm o valor atual.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Option<Uuid>,
        is_active: Option<bool>,
        license_plan: Option<&str>,
        license_expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<TenantMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, TenantMember>(
            r#"
            UPDATE tenant_members SET
                role_id = COALESCE($3, role_id),
                is_active = COALESCE($4, is_active),
                license_plan = COALESCE($5, license_plan),
                license_expires_at = COALESCE($6, license_expires_at),
                updated_at = NOW()
            WHERE tenant_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(role_id)
        .bind(is_active)
        .bind(license_plan)
        .bind(license_expires_at)
        .fetch_optional(executor)
        .await?;
        Ok(member)
    }

    /// Donos com acesso válido (ativos e com licença em dia), travados até o fim da transação.
    pub async fn lock_active_owners<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        owner_role_name: &str,
    ) -> Result<Vec<TenantMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owners = sqlx::query_as::<_, TenantMember>(
            r#"
            SELECT m.* FROM tenant_members m
            JOIN roles r ON r.id = m.role_id
            WHERE m.tenant_id = $1 AND r.name = $2 AND m.is_active
              AND (m.license_expires_at IS NULL OR m.license_expires_at > NOW())
            ORDER BY m.user_id
            FOR UPDATE OF m
            "#,
        )
        .bind(tenant_id)
        .bind(owner_role_name)
        .fetch_all(executor)
        .await?;
        Ok(owners)
    }

    pub async fn list_collaborators<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<CollaboratorRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, CollaboratorRow>(
            r#"
            SELECT
                u.id AS user_id, u.email, u.full_name,
                r.id AS role_id, r.name AS role_name,
                tm.is_active, tm.license_plan, tm.license_expires_at, tm.created_at
            FROM tenant_members tm
            JOIN users u ON u.id = tm.user_id
            JOIN roles r ON r.id = tm.role_id
            WHERE tm.tenant_id = $1
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    //  LOCAIS (lojas e fábricas)
    // =========================================================================

    pub async fn create_location<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        kind: LocationKind,
    ) -> Result<Location, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Location>(
            "INSERT INTO locations (tenant_id, name, kind) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(kind)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::UniqueConstraintViolation(format!("Local '{}' já existe.", name))
            })
        })
    }

    pub async fn list_locations<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(locations)
    }

    pub async fn location_exists<'e, E>(&self, executor: E, tenant_id: Uuid, location_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM locations WHERE tenant_id = $1 AND id = $2)",
        )
        .bind(tenant_id)
        .bind(location_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }
}
