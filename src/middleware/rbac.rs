// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // O tenant_guard já validou a associação e anotou o cargo
        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::TenantAccessDenied)?;

        let required_perm = T::slug();

        let has_permission = app_state
            .rbac_repo
            .role_has_permission(tenant.role_id, required_perm)
            .await?;

        if !has_permission {
            return Err(AppError::PermissionDenied(required_perm.to_string()));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $slug:literal) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn slug() -> &'static str { $slug }
        }
    };
}

permission!(PermInventoryRead, "inventory:read");
permission!(PermInventoryWrite, "inventory:write");
permission!(PermProductsWrite, "products:write");
permission!(PermProductionRead, "production:read");
permission!(PermProductionWrite, "production:write");
permission!(PermPurchasingWrite, "purchasing:write");
permission!(PermSalesRead, "sales:read");
permission!(PermSalesWrite, "sales:write");
permission!(PermCustomersWrite, "customers:write");
permission!(PermFinanceRead, "finance:read");
permission!(PermFinanceWrite, "finance:write");
permission!(PermAdminUsers, "admin:users");
permission!(PermDashboardManage, "dashboard:manage");
permission!(PermSettingsWrite, "settings:write");
