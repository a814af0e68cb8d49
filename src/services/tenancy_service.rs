// src/services/tenancy_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Connection, Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::set_local_tenant, error::AppError},
    db::{RbacRepository, SettingsRepository, TenantRepository, UserRepository},
    models::tenancy::{
        CollaboratorRow, CreateCollaboratorPayload, CreateLocationPayload, Location, Tenant, TenantMember,
        UpdateCollaboratorPayload,
    },
    services::{auth::hash_password, dashboard_service::DashboardService},
};

pub const OWNER_ROLE_NAME: &str = "Dono";
pub const OWNER_LICENSE_PLAN: &str = "OWNER";

/// Desativar o próprio acesso trancaria o usuário fora da loja.
pub fn ensure_not_self_deactivation(
    caller_id: Uuid,
    target_user_id: Uuid,
    payload: &UpdateCollaboratorPayload,
) -> Result<(), AppError> {
    if caller_id == target_user_id && payload.is_active == Some(false) {
        return Err(AppError::CannotDeactivateSelf);
    }
    Ok(())
}

/// A loja não pode ficar sem dono com acesso. `active_owners` são os donos ativos
/// com licença válida; `keeps_owner_role` diz se o cargo continua sendo o de dono.
pub fn ensure_owner_remains(
    active_owners: &[TenantMember],
    target_user_id: Uuid,
    payload: &UpdateCollaboratorPayload,
    keeps_owner_role: bool,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !active_owners.iter().any(|m| m.user_id == target_user_id) {
        return Ok(());
    }

    let stays_active = payload.is_active.unwrap_or(true);
    let license_valid = payload.license_expires_at.map_or(true, |at| at > now);
    if stays_active && keeps_owner_role && license_valid {
        return Ok(());
    }

    if active_owners.len() <= 1 {
        return Err(AppError::LastActiveOwner);
    }
    Ok(())
}

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    rbac_repo: RbacRepository,
    settings_repo: SettingsRepository,
    user_repo: UserRepository,
    dashboard_service: DashboardService,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        rbac_repo: RbacRepository,
        settings_repo: SettingsRepository,
        user_repo: UserRepository,
        dashboard_service: DashboardService,
        pool: PgPool,
    ) -> Self {
        Self { tenant_repo, rbac_repo, settings_repo, user_repo, dashboard_service, pool }
    }

    /// Cria a loja e, na mesma transação, o cargo "Dono" com todas as permissões,
    /// a associação do criador, o tema padrão e o layout padrão do dashboard.
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        if self.tenant_repo.user_has_tenant_with_name(owner_id, name).await? {
            return Err(AppError::TenantNameAlreadyExists(name.to_string()));
        }

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria a loja
        let tenant = self.tenant_repo.create_tenant(&mut *tx, name, description, owner_id).await?;
        set_local_tenant(&mut tx, tenant.id).await?;

        // 3. Cargo "Dono" com todas as permissões do sistema
        let owner_role = self
            .rbac_repo
            .create_role(&mut *tx, tenant.id, OWNER_ROLE_NAME, Some("Acesso total (gerado automaticamente)"))
            .await?;
        let all_permissions = self.rbac_repo.list_all_permissions(&mut *tx).await?;
        let all_perm_ids: Vec<Uuid> = all_permissions.iter().map(|p| p.id).collect();
        if !all_perm_ids.is_empty() {
            self.rbac_repo.assign_permissions(&mut *tx, owner_role.id, &all_perm_ids).await?;
        }

        // 4. Associa o criador com o cargo
        self.tenant_repo
            .add_member(&mut *tx, tenant.id, owner_id, owner_role.id, OWNER_LICENSE_PLAN, None)
            .await?;

        // 5. Tema e layout padrão
        self.settings_repo.create_default(&mut *tx, tenant.id, name).await?;
        self.dashboard_service.seed_default_layout(&mut *tx, tenant.id, owner_role.id).await?;

        // 6. Commit
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant.id, %owner_id, "Nova loja criada");
        Ok(tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.list_user_tenants(user_id).await
    }

    // ---
    // Locais (lojas e fábricas)
    // ---

    pub async fn create_location<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateLocationPayload,
    ) -> Result<Location, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.tenant_repo.create_location(executor, tenant_id, &payload.name, payload.kind).await
    }

    pub async fn list_locations<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Location>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.tenant_repo.list_locations(executor, tenant_id).await
    }

    // ---
    // Colaboradores (/api/admin/users)
    // ---

    pub async fn list_collaborators<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<CollaboratorRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.tenant_repo.list_collaborators(executor, tenant_id).await
    }

    /// Cria a conta quando o e-mail é novo; se já existe, só vincula (a senha é ignorada).
    pub async fn create_collaborator(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateCollaboratorPayload,
    ) -> Result<TenantMember, AppError> {
        let existing = self.user_repo.find_by_email(&payload.email).await?;
        let password_hash = match existing {
            Some(_) => None,
            None => Some(hash_password(&payload.password).await?),
        };

        let mut tx = conn.begin().await?;

        self.rbac_repo
            .find_role(&mut *tx, tenant_id, payload.role_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cargo".into()))?;

        let user_id = match (existing, password_hash) {
            (Some(user), _) => user.id,
            (None, Some(hash)) => {
                self.user_repo
                    .create_user(&mut *tx, &payload.email, &payload.full_name, &hash)
                    .await?
                    .id
            }
            (None, None) => return Err(AppError::UserNotFound),
        };

        let member = self
            .tenant_repo
            .add_member(
                &mut *tx,
                tenant_id,
                user_id,
                payload.role_id,
                &payload.license_plan,
                payload.license_expires_at,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, %user_id, "Colaborador vinculado");
        Ok(member)
    }

    pub async fn update_collaborator(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        caller_id: Uuid,
        user_id: Uuid,
        payload: &UpdateCollaboratorPayload,
    ) -> Result<TenantMember, AppError> {
        ensure_not_self_deactivation(caller_id, user_id, payload)?;

        let mut tx = conn.begin().await?;

        let keeps_owner_role = match payload.role_id {
            Some(role_id) => {
                let role = self
                    .rbac_repo
                    .find_role(&mut *tx, tenant_id, role_id)
                    .await?
                    .ok_or_else(|| AppError::ResourceNotFound("Cargo".into()))?;
                role.name == OWNER_ROLE_NAME
            }
            None => true,
        };

        let owners = self.tenant_repo.lock_active_owners(&mut *tx, tenant_id, OWNER_ROLE_NAME).await?;
        ensure_owner_remains(&owners, user_id, payload, keeps_owner_role, Utc::now())?;

        let member = self
            .tenant_repo
            .update_member(
                &mut *tx,
                tenant_id,
                user_id,
                payload.role_id,
                payload.is_active,
                payload.license_plan.as_deref(),
                payload.license_expires_at,
            )
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Colaborador".into()))?;
        tx.commit().await?;

        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(is_active: Option<bool>) -> UpdateCollaboratorPayload {
        UpdateCollaboratorPayload { role_id: None, is_active, license_plan: None, license_expires_at: None }
    }

    fn owner(user_id: Uuid) -> TenantMember {
        TenantMember {
            tenant_id: Uuid::nil(),
            user_id,
            role_id: Uuid::from_u128(1),
            is_active: true,
            license_plan: OWNER_LICENSE_PLAN.into(),
            license_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn user_cannot_deactivate_own_access() {
        let me = Uuid::new_v4();
        assert!(matches!(
            ensure_not_self_deactivation(me, me, &update(Some(false))),
            Err(AppError::CannotDeactivateSelf)
        ));
    }

    #[test]
    fn other_updates_are_allowed() {
        let me = Uuid::new_v4();
        assert!(ensure_not_self_deactivation(me, me, &update(Some(true))).is_ok());
        assert!(ensure_not_self_deactivation(me, me, &update(None)).is_ok());
        assert!(ensure_not_self_deactivation(me, Uuid::new_v4(), &update(Some(false))).is_ok());
    }

    #[test]
    fn last_owner_cannot_be_deactivated_by_anyone() {
        let only = Uuid::new_v4();
        let owners = vec![owner(only)];
        assert!(matches!(
            ensure_owner_remains(&owners, only, &update(Some(false)), true, Utc::now()),
            Err(AppError::LastActiveOwner)
        ));
    }

    #[test]
    fn last_owner_cannot_lose_the_owner_role() {
        let only = Uuid::new_v4();
        let owners = vec![owner(only)];
        let demote = UpdateCollaboratorPayload { role_id: Some(Uuid::new_v4()), ..update(None) };
        assert!(matches!(
            ensure_owner_remains(&owners, only, &demote, false, Utc::now()),
            Err(AppError::LastActiveOwner)
        ));
        // Trocar para o próprio cargo de dono não muda nada
        assert!(ensure_owner_remains(&owners, only, &demote, true, Utc::now()).is_ok());
    }

    #[test]
    fn last_owner_cannot_get_an_expired_license() {
        let only = Uuid::new_v4();
        let owners = vec![owner(only)];
        let now = Utc::now();

        let expired = UpdateCollaboratorPayload {
            license_expires_at: Some(now - chrono::Duration::days(1)),
            ..update(None)
        };
        assert!(matches!(
            ensure_owner_remains(&owners, only, &expired, true, now),
            Err(AppError::LastActiveOwner)
        ));

        let renewed = UpdateCollaboratorPayload {
            license_expires_at: Some(now + chrono::Duration::days(30)),
            ..update(None)
        };
        assert!(ensure_owner_remains(&owners, only, &renewed, true, now).is_ok());
    }

    #[test]
    fn owner_can_leave_while_another_owner_remains() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let owners = vec![owner(first), owner(second)];
        assert!(ensure_owner_remains(&owners, first, &update(Some(false)), true, Utc::now()).is_ok());
    }

    #[test]
    fn members_who_are_not_owners_are_unaffected() {
        let owners = vec![owner(Uuid::new_v4())];
        assert!(ensure_owner_remains(&owners, Uuid::new_v4(), &update(Some(false)), false, Utc::now()).is_ok());
    }
}
