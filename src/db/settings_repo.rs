use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::settings::{TenantSettings, UpdateSettingsRequest},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<TenantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Loja sem linha de configuração ainda: devolve tudo vazio com tema claro
        let settings = sqlx::query_as::<_, TenantSettings>(
            "SELECT * FROM tenant_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings.unwrap_or_else(|| TenantSettings::empty(tenant_id)))
    }

    /// Cria a linha padrão na abertura da loja.
    pub async fn create_default<'e, E>(&self, executor: E, tenant_id: Uuid, company_name: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO tenant_settings (tenant_id, company_name) VALUES ($1, $2) ON CONFLICT (tenant_id) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(company_name)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &UpdateSettingsRequest,
    ) -> Result<TenantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT: campos ausentes no payload mantêm o valor gravado
        let settings = sqlx::query_as::<_, TenantSettings>(
            r#"
            INSERT INTO tenant_settings (
                tenant_id, company_name, document_number, address, phone,
                pix_key, logo_url, primary_color, theme_mode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'LIGHT'::theme_mode))
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                company_name = COALESCE(EXCLUDED.company_name, tenant_settings.company_name),
                document_number = COALESCE(EXCLUDED.document_number, tenant_settings.document_number),
                address = COALESCE(EXCLUDED.address, tenant_settings.address),
                phone = COALESCE(EXCLUDED.phone, tenant_settings.phone),
                pix_key = COALESCE(EXCLUDED.pix_key, tenant_settings.pix_key),
                logo_url = COALESCE(EXCLUDED.logo_url, tenant_settings.logo_url),
                primary_color = COALESCE(EXCLUDED.primary_color, tenant_settings.primary_color),
                theme_mode = COALESCE($9, tenant_settings.theme_mode),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&input.company_name)
        .bind(&input.document_number)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.pix_key)
        .bind(&input.logo_url)
        .bind(&input.primary_color)
        .bind(input.theme_mode)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
