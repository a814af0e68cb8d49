//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let server_addr = config.server_addr.clone();
    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    let listener = TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {server_addr}"))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas do usuário: só o token
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/me/companies", get(handlers::auth::get_my_companies))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let tenancy_routes = Router::new()
        .route("/", post(handlers::tenancy::create_tenant).get(handlers::tenancy::list_my_tenants))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Daqui pra baixo tudo exige X-Tenant-ID
    let tenant_setup_routes = Router::new()
        .route(
            "/locations",
            post(handlers::tenancy::create_location).get(handlers::tenancy::list_locations),
        );

    let role_routes = Router::new()
        .route("/", post(handlers::rbac::create_role).get(handlers::rbac::list_roles));

    let admin_routes = Router::new()
        .route("/users", post(handlers::rbac::create_user).get(handlers::rbac::list_users))
        .route("/users/{user_id}", put(handlers::rbac::update_user));

    let settings_routes = Router::new()
        .route("/", get(handlers::settings::get_settings).put(handlers::settings::update_settings));

    let inventory_routes = Router::new()
        .route(
            "/categories",
            post(handlers::inventory::create_category).get(handlers::inventory::list_categories),
        )
        .route(
            "/suppliers",
            post(handlers::inventory::create_supplier).get(handlers::inventory::list_suppliers),
        )
        .route("/suppliers/{supplier_id}", put(handlers::inventory::update_supplier))
        .route(
            "/ingredients",
            post(handlers::inventory::create_ingredient).get(handlers::inventory::list_ingredients),
        )
        .route("/ingredients/{ingredient_id}", put(handlers::inventory::update_ingredient))
        .route("/stock-entry", post(handlers::inventory::stock_entry))
        .route("/adjustments", post(handlers::inventory::adjust_stock))
        .route("/lots", get(handlers::inventory::list_lots))
        .route("/alerts", get(handlers::inventory::get_alerts))
        .route("/movements", get(handlers::inventory::list_movements));

    let product_routes = Router::new()
        .route("/", post(handlers::products::create_product).get(handlers::products::list_products))
        .route("/yield", post(handlers::products::simulate_yield))
        .route("/{product_id}", put(handlers::products::update_product))
        .route(
            "/{product_id}/recipe",
            put(handlers::products::replace_recipe).get(handlers::products::get_recipe),
        )
        .route("/{product_id}/costing", get(handlers::products::get_costing));

    let production_routes = Router::new()
        .route("/orders", post(handlers::production::create_order))
        .route("/board", get(handlers::production::get_board))
        .route("/orders/{order_id}/move", post(handlers::production::move_order))
        .route("/orders/{order_id}/history", get(handlers::production::get_history));

    let purchasing_routes = Router::new()
        .route("/suggestions", post(handlers::purchasing::get_suggestions));

    let purchase_order_routes = Router::new()
        .route("/", post(handlers::purchasing::create_order).get(handlers::purchasing::list_orders))
        .route("/from-suggestions", post(handlers::purchasing::create_from_suggestions))
        .route("/{order_id}", get(handlers::purchasing::get_order))
        .route("/{order_id}/status", post(handlers::purchasing::change_status))
        .route("/{order_id}/receive", post(handlers::purchasing::receive_order));

    let pdf_routes = Router::new()
        .route("/pedido-compra/{order_id}", get(handlers::documents::purchase_order_pdf))
        .route("/venda/{sale_id}", get(handlers::documents::sale_receipt_pdf));

    let promotion_routes = Router::new()
        .route(
            "/",
            post(handlers::promotions::create_promotion).get(handlers::promotions::list_promotions),
        )
        .route("/{promotion_id}", put(handlers::promotions::update_promotion));

    let combo_routes = Router::new()
        .route("/", post(handlers::promotions::create_combo).get(handlers::promotions::list_combos));

    let sales_routes = Router::new()
        .route("/", post(handlers::sales::create_sale).get(handlers::sales::list_sales))
        .route("/{sale_id}", get(handlers::sales::get_sale))
        .route("/{sale_id}/cancel", post(handlers::sales::cancel_sale));

    let customer_routes = Router::new()
        .route(
            "/",
            post(handlers::customers::create_customer).get(handlers::customers::list_customers),
        )
        .route("/{customer_id}", get(handlers::customers::get_customer))
        .route("/{customer_id}/points", get(handlers::customers::get_points));

    let loyalty_routes = Router::new().route(
        "/config",
        get(handlers::customers::get_loyalty_config).put(handlers::customers::update_loyalty_config),
    );

    let finance_routes = Router::new()
        .route(
            "/expense-categories",
            post(handlers::finance::create_category).get(handlers::finance::list_categories),
        )
        .route(
            "/payables",
            post(handlers::finance::create_payable).get(handlers::finance::list_payables),
        )
        .route("/payables/{payable_id}/pay", post(handlers::finance::pay_payable))
        .route("/payables/{payable_id}/cancel", post(handlers::finance::cancel_payable))
        .route("/dre", get(handlers::finance::get_dre))
        .route(
            "/targets",
            post(handlers::finance::create_target).get(handlers::finance::list_targets),
        )
        .route("/targets/progress", get(handlers::finance::get_targets_progress));

    let dashboard_routes = Router::new()
        .route("/widgets", get(handlers::dashboard::list_widgets))
        .route("/widgets/{key}", get(handlers::dashboard::get_widget_data))
        .route(
            "/layout",
            get(handlers::dashboard::get_layout).put(handlers::dashboard::save_layout),
        )
        .route("/summary", get(handlers::dashboard::get_summary));

    // Um único guard de loja para todos os módulos com X-Tenant-ID
    let tenant_scoped = Router::new()
        .nest("/api/tenants/setup", tenant_setup_routes)
        .nest("/api/tenants/roles", role_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/settings", settings_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/products", product_routes)
        .nest("/api/production", production_routes)
        .nest("/api/purchasing", purchasing_routes)
        .nest("/api/pedidos", purchase_order_routes)
        .nest("/api/pdf", pdf_routes)
        .nest("/api/promotions", promotion_routes)
        .nest("/api/combos", combo_routes)
        .nest("/api/sales", sales_routes)
        .nest("/api/customers", customer_routes)
        .nest("/api/loyalty", loyalty_routes)
        .nest("/api/finance", finance_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/tenants", tenancy_routes)
        .merge(tenant_scoped)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
