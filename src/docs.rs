// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_companies,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,
        handlers::tenancy::create_location,
        handlers::tenancy::list_locations,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,

        // --- RBAC ---
        handlers::rbac::list_permissions,
        handlers::rbac::create_role,
        handlers::rbac::list_roles,
        handlers::rbac::list_users,
        handlers::rbac::create_user,
        handlers::rbac::update_user,

        // --- Inventory ---
        handlers::inventory::create_category,
        handlers::inventory::list_categories,
        handlers::inventory::create_supplier,
        handlers::inventory::update_supplier,
        handlers::inventory::list_suppliers,
        handlers::inventory::create_ingredient,
        handlers::inventory::update_ingredient,
        handlers::inventory::list_ingredients,
        handlers::inventory::stock_entry,
        handlers::inventory::adjust_stock,
        handlers::inventory::list_lots,
        handlers::inventory::get_alerts,
        handlers::inventory::list_movements,

        // --- Products ---
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::list_products,
        handlers::products::replace_recipe,
        handlers::products::get_recipe,
        handlers::products::get_costing,
        handlers::products::simulate_yield,

        // --- Production ---
        handlers::production::create_order,
        handlers::production::get_board,
        handlers::production::move_order,
        handlers::production::get_history,

        // --- Purchasing ---
        handlers::purchasing::get_suggestions,
        handlers::purchasing::create_order,
        handlers::purchasing::create_from_suggestions,
        handlers::purchasing::list_orders,
        handlers::purchasing::get_order,
        handlers::purchasing::change_status,
        handlers::purchasing::receive_order,

        // --- Promotions ---
        handlers::promotions::create_promotion,
        handlers::promotions::update_promotion,
        handlers::promotions::list_promotions,
        handlers::promotions::create_combo,
        handlers::promotions::list_combos,

        // --- Sales ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::cancel_sale,

        // --- Customers ---
        handlers::customers::create_customer,
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::get_points,
        handlers::customers::get_loyalty_config,
        handlers::customers::update_loyalty_config,

        // --- Finance ---
        handlers::finance::create_category,
        handlers::finance::list_categories,
        handlers::finance::create_payable,
        handlers::finance::list_payables,
        handlers::finance::pay_payable,
        handlers::finance::cancel_payable,
        handlers::finance::get_dre,
        handlers::finance::create_target,
        handlers::finance::list_targets,
        handlers::finance::get_targets_progress,

        // --- Dashboard ---
        handlers::dashboard::list_widgets,
        handlers::dashboard::get_layout,
        handlers::dashboard::save_layout,
        handlers::dashboard::get_widget_data,
        handlers::dashboard::get_summary,

        // --- Documents ---
        handlers::documents::purchase_order_pdf,
        handlers::documents::sale_receipt_pdf,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::UserCompany,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::TenantMember,
            models::tenancy::CollaboratorRow,
            models::tenancy::LocationKind,
            models::tenancy::Location,
            models::tenancy::CreateTenantPayload,
            models::tenancy::CreateLocationPayload,
            models::tenancy::CreateCollaboratorPayload,
            models::tenancy::UpdateCollaboratorPayload,

            // --- Settings ---
            models::settings::ThemeMode,
            models::settings::TenantSettings,
            models::settings::UpdateSettingsRequest,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::CreateRolePayload,
            models::rbac::RoleResponse,

            // --- Inventory ---
            models::inventory::Category,
            models::inventory::Supplier,
            models::inventory::MeasureUnit,
            models::inventory::Ingredient,
            models::inventory::IngredientLot,
            models::inventory::StockMovementReason,
            models::inventory::StockMovement,
            models::inventory::InventoryAlerts,
            models::inventory::ExpiringLot,
            models::inventory::CreateCategoryPayload,
            models::inventory::SupplierPayload,
            models::inventory::IngredientPayload,
            models::inventory::StockEntryPayload,
            models::inventory::AdjustmentReason,
            models::inventory::StockAdjustmentPayload,

            // --- Products ---
            models::products::Product,
            models::products::Recipe,
            models::products::RecipeLine,
            models::products::RecipeLineCost,
            models::products::RecipeDetail,
            models::products::ProductCosting,
            models::products::IngredientRequirement,
            models::products::YieldSimulation,
            models::products::ProductPayload,
            models::products::RecipeItemPayload,
            models::products::RecipePayload,
            models::products::YieldPayload,

            // --- Production ---
            models::production::ProductionStage,
            models::production::ProductionOrder,
            models::production::BoardCard,
            models::production::BoardColumn,
            models::production::StageHistoryEntry,
            models::production::CreateProductionOrderPayload,
            models::production::MoveOrderPayload,

            // --- Purchasing ---
            models::purchasing::PurchaseOrderStatus,
            models::purchasing::PurchaseOrder,
            models::purchasing::PurchaseOrderItem,
            models::purchasing::PurchaseOrderDetail,
            models::purchasing::PurchaseSuggestion,
            models::purchasing::SupplierSuggestionGroup,
            models::purchasing::PlannedProduction,
            models::purchasing::SuggestionRequest,
            models::purchasing::PurchaseOrderItemPayload,
            models::purchasing::CreatePurchaseOrderPayload,
            models::purchasing::ChangeStatusPayload,
            models::purchasing::ReceiveItemPayload,
            models::purchasing::ReceivePayload,
            models::purchasing::FromSuggestionsPayload,

            // --- Promotions ---
            models::promotions::PromotionKind,
            models::promotions::Promotion,
            models::promotions::Combo,
            models::promotions::ComboItem,
            models::promotions::ComboDetail,
            models::promotions::PromotionPayload,
            models::promotions::ComboItemPayload,
            models::promotions::ComboPayload,

            // --- Sales ---
            models::sales::PaymentMethod,
            models::sales::SaleStatus,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleDetail,
            models::sales::SaleItemPayload,
            models::sales::CreateSalePayload,

            // --- Customers ---
            models::customers::Customer,
            models::customers::LoyaltyConfig,
            models::customers::LoyaltyReason,
            models::customers::LoyaltyEntry,
            models::customers::CustomerPayload,
            models::customers::LoyaltyConfigPayload,

            // --- Finance ---
            models::finance::ExpenseGroup,
            models::finance::PayableStatus,
            models::finance::ExpenseCategory,
            models::finance::Payable,
            models::finance::PayableView,
            models::finance::DreLine,
            models::finance::DreExpenseLine,
            models::finance::DreReport,
            models::finance::SalesTarget,
            models::finance::TargetProgress,
            models::finance::ExpenseCategoryPayload,
            models::finance::PayablePayload,
            models::finance::PayPayload,
            models::finance::TargetPayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
            models::dashboard::SalesChartEntry,
            models::dashboard::TopProductEntry,
            models::dashboard::LoyaltyOverview,
            models::dashboard::WidgetPlacement,
            models::dashboard::DashboardLayout,
            models::dashboard::WidgetInfo,
            models::dashboard::SaveLayoutPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Tenancy", description = "Gestão de Lojas e Acesso"),
        (name = "Admin", description = "Colaboradores da Loja"),
        (name = "Settings", description = "Configurações e Tema da Loja"),
        (name = "RBAC", description = "Controle de Acesso (Cargos, Permissões e Colaboradores)"),
        (name = "Inventory", description = "Insumos, Lotes e Fornecedores"),
        (name = "Products", description = "Produtos Acabados e Fichas Técnicas"),
        (name = "Production", description = "Ordens de Produção e Kanban"),
        (name = "Purchasing", description = "Sugestões de Compra e Pedidos"),
        (name = "Promotions", description = "Promoções e Combos"),
        (name = "Sales", description = "Ponto de Venda"),
        (name = "Customers", description = "Clientes e Fidelidade"),
        (name = "Finance", description = "Contas a Pagar, DRE e Metas"),
        (name = "Dashboard", description = "Indicadores e Layout por Cargo"),
        (name = "Documents", description = "PDFs de Pedido de Compra e Venda")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_tenant_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/sales"));
        assert!(paths.contains_key("/api/pedidos/{order_id}/receive"));
        assert!(paths.contains_key("/api/pdf/pedido-compra/{order_id}"));
        assert!(paths.contains_key("/api/dashboard/layout"));
    }
}
