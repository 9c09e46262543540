// src/services/custom_field_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::{
    common::{
        db_utils::{is_valid_phone, normalize_phone},
        error::{field_error, AppError},
    },
    db::CustomFieldStore,
    models::custom_field::{
        CustomField, CustomFieldType, CustomValueInput, CustomerCustomValue, NewCustomField,
    },
};

/// Interpreta os valores booleanos aceitos no painel e na planilha.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "ใช่" => Some(true),
        "false" | "0" | "no" | "n" | "ไม่ใช่" => Some(false),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CustomFieldService {
    store: Arc<dyn CustomFieldStore>,
}

impl CustomFieldService {
    pub fn new(store: Arc<dyn CustomFieldStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  1. DEFINIÇÕES (O Molde)
    // =========================================================================

    pub async fn list_fields(&self, shop_id: Uuid) -> Result<Vec<CustomField>, AppError> {
        self.store.list_fields(shop_id).await
    }

    /// Campos que viram coluna na exportação, na ordem de exibição.
    pub async fn exportable_fields(&self, shop_id: Uuid) -> Result<Vec<CustomField>, AppError> {
        let mut fields: Vec<CustomField> = self
            .store
            .list_fields(shop_id)
            .await?
            .into_iter()
            .filter(|f| f.is_exportable)
            .collect();
        fields.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(fields)
    }

    pub async fn create_field(&self, mut new: NewCustomField) -> Result<CustomField, AppError> {
        new.name = new.name.trim().to_string();
        if new.name.is_empty() {
            return Err(field_error("name", "required"));
        }

        // Limpa opções vazias; Select precisa de pelo menos uma
        new.options = new.options.map(|options| {
            options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect::<Vec<_>>()
        });
        match new.field_type {
            CustomFieldType::Select => {
                if new.options.as_ref().is_none_or(|o| o.is_empty()) {
                    return Err(field_error("options", "options_required"));
                }
            }
            _ => new.options = None,
        }

        let field = self.store.create_field(new).await?;
        tracing::info!(field = %field.id, shop = %field.shop_id, "Campo personalizado criado: {}", field.name);
        Ok(field)
    }

    pub async fn delete_field(&self, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.find_in_shop(shop_id, id).await?;
        self.store.delete_field(id).await?;
        Ok(())
    }

    async fn find_in_shop(&self, shop_id: Uuid, id: Uuid) -> Result<CustomField, AppError> {
        self.store
            .find_field(id)
            .await?
            .filter(|f| f.shop_id == shop_id)
            .ok_or(AppError::CustomFieldNotFound)
    }

    // =========================================================================
    //  2. VALORES (O Dado)
    // =========================================================================

    pub async fn list_values(&self, customer_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        self.store.list_values(customer_id).await
    }

    pub async fn list_values_for_shop(&self, shop_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        self.store.list_values_for_shop(shop_id).await
    }

    /// Valida tudo antes de gravar: ou todos os valores entram, ou nenhum.
    pub async fn put_values(
        &self,
        shop_id: Uuid,
        customer_id: Uuid,
        inputs: &[CustomValueInput],
    ) -> Result<Vec<CustomerCustomValue>, AppError> {
        let normalized = self.prepare_values(shop_id, Some(customer_id), inputs).await?;
        self.write_values(customer_id, normalized).await
    }

    /// Só a validação; `customer_id = None` para um cliente que ainda não existe.
    pub async fn prepare_values(
        &self,
        shop_id: Uuid,
        customer_id: Option<Uuid>,
        inputs: &[CustomValueInput],
    ) -> Result<Vec<(Uuid, String)>, AppError> {
        let definitions = self.store.list_fields(shop_id).await?;
        let existing = match customer_id {
            Some(id) => self.store.list_values(id).await?,
            None => Vec::new(),
        };

        validate_values(&definitions, &existing, inputs)
    }

    pub async fn write_values(
        &self,
        customer_id: Uuid,
        normalized: Vec<(Uuid, String)>,
    ) -> Result<Vec<CustomerCustomValue>, AppError> {
        let mut saved = Vec::with_capacity(normalized.len());
        for (field_id, value) in normalized {
            saved.push(self.store.upsert_value(customer_id, field_id, &value).await?);
        }
        Ok(saved)
    }
}

// --- MOTOR DE VALIDAÇÃO ---
// Mapa de erros: ID do campo -> código do erro
fn validate_values(
    definitions: &[CustomField],
    existing: &[CustomerCustomValue],
    inputs: &[CustomValueInput],
) -> Result<Vec<(Uuid, String)>, AppError> {
    let by_id: HashMap<Uuid, &CustomField> = definitions.iter().map(|d| (d.id, d)).collect();
    let mut errors: HashMap<String, String> = HashMap::new();
    let mut normalized = Vec::with_capacity(inputs.len());

    for input in inputs {
        let key = input.field_id.to_string();
        let Some(def) = by_id.get(&input.field_id) else {
            errors.insert(key, "unknown_field".to_string());
            continue;
        };

        let value = input.value.trim();
        if value.is_empty() {
            if def.is_required {
                errors.insert(key, "required".to_string());
            } else {
                normalized.push((def.id, String::new()));
            }
            continue;
        }

        match check_value(def, value) {
            Ok(value) => normalized.push((def.id, value)),
            Err(code) => {
                errors.insert(key, code.to_string());
            }
        }
    }

    // Obrigatórios que não vieram agora nem existem gravados
    for def in definitions.iter().filter(|d| d.is_required) {
        let sent = inputs.iter().any(|i| i.field_id == def.id);
        let stored = existing.iter().any(|v| v.field_id == def.id && !v.value.trim().is_empty());
        if !sent && !stored {
            errors.entry(def.id.to_string()).or_insert_with(|| "required".to_string());
        }
    }

    if !errors.is_empty() {
        return Err(AppError::CustomValueValidationError(errors));
    }

    Ok(normalized)
}

/// Confere o valor contra o tipo do campo e devolve a forma canônica.
fn check_value(def: &CustomField, value: &str) -> Result<String, &'static str> {
    match def.field_type {
        CustomFieldType::Text => Ok(value.to_string()),
        CustomFieldType::Number => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|_| value.to_string())
            .ok_or("invalid_number"),
        CustomFieldType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .map_err(|_| "invalid_date"),
        CustomFieldType::Boolean => parse_flag(value).map(|b| b.to_string()).ok_or("invalid_boolean"),
        CustomFieldType::Email => {
            if value.to_string().validate_email() {
                Ok(value.to_string())
            } else {
                Err("invalid_email")
            }
        }
        CustomFieldType::Phone => {
            let phone = normalize_phone(value);
            if is_valid_phone(&phone) { Ok(phone) } else { Err("invalid_phone") }
        }
        CustomFieldType::Select => {
            let allowed = def.options.as_deref().unwrap_or_default();
            if allowed.iter().any(|o| o == value) {
                Ok(value.to_string())
            } else {
                Err("invalid_option")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn new_field(shop_id: Uuid, name: &str, field_type: CustomFieldType) -> NewCustomField {
        NewCustomField {
            shop_id,
            name: name.into(),
            field_type,
            options: None,
            is_required: false,
            is_exportable: true,
            sort_order: 0,
        }
    }

    fn value(field: &CustomField, value: &str) -> CustomValueInput {
        CustomValueInput { field_id: field.id, value: value.into() }
    }

    #[test]
    fn flags_accept_thai_and_english() {
        assert_eq!(parse_flag("ใช่"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("ไม่ใช่"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[tokio::test]
    async fn select_needs_options() {
        let service = CustomFieldService::new(Arc::new(MemoryStore::new()));
        let err = service.create_field(new_field(Uuid::new_v4(), "Size", CustomFieldType::Select)).await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn values_are_checked_against_the_field_type() {
        let service = CustomFieldService::new(Arc::new(MemoryStore::new()));
        let shop = Uuid::new_v4();
        let customer = Uuid::new_v4();

        let birthday = service.create_field(new_field(shop, "วันเกิด", CustomFieldType::Date)).await.unwrap();
        let email = service.create_field(new_field(shop, "Email", CustomFieldType::Email)).await.unwrap();
        let mut size = new_field(shop, "Size", CustomFieldType::Select);
        size.options = Some(vec!["S".into(), "M".into()]);
        let size = service.create_field(size).await.unwrap();

        let err = service
            .put_values(
                shop,
                customer,
                &[value(&birthday, "31/12/2024"), value(&email, "nope"), value(&size, "XL")],
            )
            .await;
        match err {
            Err(AppError::CustomValueValidationError(errors)) => {
                assert_eq!(errors[&birthday.id.to_string()], "invalid_date");
                assert_eq!(errors[&email.id.to_string()], "invalid_email");
                assert_eq!(errors[&size.id.to_string()], "invalid_option");
            }
            other => panic!("esperava erro de validação, veio {:?}", other.map(|v| v.len())),
        }
        // Nada foi gravado
        assert!(service.list_values(customer).await.unwrap().is_empty());

        let saved = service
            .put_values(
                shop,
                customer,
                &[value(&birthday, "2024-12-31"), value(&email, "a@b.co"), value(&size, "M")],
            )
            .await
            .unwrap();
        assert_eq!(saved.len(), 3);
    }

    #[tokio::test]
    async fn required_fields_must_be_filled() {
        let service = CustomFieldService::new(Arc::new(MemoryStore::new()));
        let shop = Uuid::new_v4();
        let mut member_no = new_field(shop, "Member No", CustomFieldType::Number);
        member_no.is_required = true;
        let member_no = service.create_field(member_no).await.unwrap();

        let err = service.put_values(shop, Uuid::new_v4(), &[]).await;
        assert!(matches!(err, Err(AppError::CustomValueValidationError(_))));

        let err = service.put_values(shop, Uuid::new_v4(), &[value(&member_no, "  ")]).await;
        assert!(matches!(err, Err(AppError::CustomValueValidationError(_))));

        service.put_values(shop, Uuid::new_v4(), &[value(&member_no, "42")]).await.unwrap();
    }

    #[tokio::test]
    async fn exportable_fields_follow_sort_order() {
        let service = CustomFieldService::new(Arc::new(MemoryStore::new()));
        let shop = Uuid::new_v4();

        let mut late = new_field(shop, "A-late", CustomFieldType::Text);
        late.sort_order = 2;
        service.create_field(late).await.unwrap();
        let mut early = new_field(shop, "Z-early", CustomFieldType::Text);
        early.sort_order = 1;
        service.create_field(early).await.unwrap();
        let mut hidden = new_field(shop, "Hidden", CustomFieldType::Text);
        hidden.is_exportable = false;
        service.create_field(hidden).await.unwrap();

        let names: Vec<_> = service.exportable_fields(shop).await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Z-early", "A-late"]);
    }
}
