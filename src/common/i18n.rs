// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// Catálogo: (chave, português, inglês)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("email_already_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("tenant_access_denied", "Você não tem acesso a esta loja.", "You do not have access to this store."),
    ("license_expired", "Sua licença para esta loja expirou.", "Your license for this store has expired."),
    ("permission_denied", "Você precisa da permissão '{permission}' para realizar esta ação.", "You need the '{permission}' permission to perform this action."),
    ("resource_not_found", "Não encontrado: {resource}.", "Not found: {resource}."),
    ("unique_violation", "Registro duplicado: {detail}", "Duplicate record: {detail}"),
    ("tenant_name_exists", "Você já possui uma loja chamada '{name}'.", "You already own a store named '{name}'."),
    ("sku_already_exists", "O SKU '{sku}' já está cadastrado.", "SKU '{sku}' is already registered."),
    ("insufficient_stock", "Estoque insuficiente de {name}: disponível {available}, necessário {requested}.", "Insufficient stock of {name}: available {available}, required {requested}."),
    ("recipe_not_found", "O produto '{product}' não possui ficha técnica.", "Product '{product}' has no recipe."),
    ("invalid_recipe", "Ficha técnica inválida: {reason}", "Invalid recipe: {reason}"),
    ("invalid_stage_transition", "Não é possível mover a ordem de {from} para {to}.", "Cannot move the order from {from} to {to}."),
    ("invalid_status_transition", "Não é possível alterar o status de {from} para {to}.", "Cannot change status from {from} to {to}."),
    ("invalid_layout", "Layout do dashboard inválido: {reason}", "Invalid dashboard layout: {reason}"),
    ("loyalty_redeem_rejected", "Resgate de pontos recusado: {reason}", "Points redemption rejected: {reason}"),
    ("cannot_deactivate_self", "Você não pode desativar o seu próprio acesso.", "You cannot deactivate your own access."),
    ("last_active_owner", "A loja precisa de ao menos um dono ativo.", "The company needs at least one active owner."),
    ("internal_error", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Mensagens de erro por idioma ("pt", "en").
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let mut pt = HashMap::new();
        let mut en = HashMap::new();
        for (key, pt_msg, en_msg) in MESSAGES {
            pt.insert(*key, *pt_msg);
            en.insert(*key, *en_msg);
        }

        let mut catalogs = HashMap::new();
        catalogs.insert("pt", pt);
        catalogs.insert("en", en);
        Self { catalogs }
    }
}

impl I18nStore {
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, String)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .or_else(|| self.catalogs.get(DEFAULT_LANG))
            .and_then(|catalog| catalog.get(key))
            .copied()
            .unwrap_or(key);

        params.iter().fold(template.to_string(), |msg, (name, value)| {
            msg.replace(&format!("{{{}}}", name), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_named_placeholders() {
        let store = I18nStore::default();
        let msg = store.translate("en", "sku_already_exists", &[("sku", "BOLO-01".into())]);
        assert_eq!(msg, "SKU 'BOLO-01' is already registered.");
    }

    #[test]
    fn unknown_key_returns_the_key() {
        let store = I18nStore::default();
        assert_eq!(store.translate("pt", "nao_existe", &[]), "nao_existe");
    }
}
