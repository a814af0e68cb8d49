// src/services/rbac_service.rs

use sqlx::{Connection, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::RbacRepository,
    models::rbac::{CreateRolePayload, Permission, RoleResponse},
};

/// Slugs pedidos que não existem no catálogo de permissões.
pub fn unknown_slugs<'a>(requested: &'a [String], known: &[Permission]) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|slug| !known.iter().any(|p| &p.slug == *slug))
        .map(String::as_str)
        .collect()
}

#[derive(Clone)]
pub struct RbacService {
    repo: RbacRepository,
}

impl RbacService {
    pub fn new(repo: RbacRepository) -> Self {
        Self { repo }
    }

    pub async fn create_role_with_permissions(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        payload: &CreateRolePayload,
    ) -> Result<RoleResponse, AppError> {
        // 1. Inicia Transação
        let mut tx = conn.begin().await?;

        // 2. Resolve Slugs ("sales:write") para IDs
        let permissions = self.repo.find_permissions_by_slugs(&mut *tx, &payload.permissions).await?;
        let unknown = unknown_slugs(&payload.permissions, &permissions);
        if !unknown.is_empty() {
            return Err(field_error(
                "permissions",
                "unknown_permission",
                &format!("Permissões desconhecidas: {}", unknown.join(", ")),
            ));
        }

        // 3. Cria o Cargo
        let role = self
            .repo
            .create_role(&mut *tx, tenant_id, &payload.name, payload.description.as_deref())
            .await?;

        // 4. Salva o Vínculo
        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        if !permission_ids.is_empty() {
            self.repo.assign_permissions(&mut *tx, role.id, &permission_ids).await?;
        }

        // 5. Commit
        tx.commit().await?;

        let mut slugs: Vec<String> = permissions.into_iter().map(|p| p.slug).collect();
        slugs.sort();
        Ok(RoleResponse { role, permissions: slugs })
    }

    /// Cargos da loja com as permissões de cada um.
    pub async fn list_roles(&self, conn: &mut PgConnection, tenant_id: Uuid) -> Result<Vec<RoleResponse>, AppError> {
        let roles = self.repo.list_roles(&mut *conn, tenant_id).await?;

        let mut response = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.repo.role_permission_slugs(&mut *conn, role.id).await?;
            response.push(RoleResponse { role, permissions });
        }
        Ok(response)
    }

    pub async fn list_system_permissions<'e, E>(&self, executor: E) -> Result<Vec<Permission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_all_permissions(executor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(slug: &str) -> Permission {
        Permission { id: Uuid::new_v4(), slug: slug.into(), description: String::new(), module: "SALES".into() }
    }

    #[test]
    fn reports_only_slugs_missing_from_catalog() {
        let requested = vec!["sales:write".to_string(), "crm:read".to_string()];
        let known = vec![perm("sales:write")];
        assert_eq!(unknown_slugs(&requested, &known), vec!["crm:read"]);
    }
}
