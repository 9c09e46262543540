// src/services/customer_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_valid_phone, normalize_phone},
        error::{field_error, AppError},
        listing::{ListQuery, Page},
    },
    db::{CustomerStore, StoreDirectory},
    models::{
        custom_field::{CustomValueInput, CustomerCustomValue},
        customer::{
            Customer, CustomerChanges, CustomerDetail, CustomerRole, NewCustomer, PhoneCheck,
            PointsBalance,
        },
    },
    services::custom_field_service::CustomFieldService,
};

/// Dados do formulário (ou de uma linha da planilha) já tipados.
#[derive(Debug, Clone, Default)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub role: CustomerRole,
    pub otp_verify: bool,
    pub line_token: Option<String>,
    pub branch_id: Option<Uuid>,
    // Só usado na criação; depois o saldo muda por ajuste ou resgate
    pub total_points: i64,
    pub custom_values: Vec<CustomValueInput>,
}

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerStore>,
    directory: Arc<dyn StoreDirectory>,
    custom_fields: CustomFieldService,
}

impl CustomerService {
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        directory: Arc<dyn StoreDirectory>,
        custom_fields: CustomFieldService,
    ) -> Self {
        Self { customers, directory, custom_fields }
    }

    // =========================================================================
    //  1. LEITURA
    // =========================================================================

    pub async fn list_customers(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        query: &ListQuery,
    ) -> Result<Page<Customer>, AppError> {
        let customers = self.customers.list_customers(shop_id, branch_id).await?;
        Ok(query.apply(customers))
    }

    pub async fn list_all(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<Vec<Customer>, AppError> {
        self.customers.list_customers(shop_id, branch_id).await
    }

    pub async fn get_customer(&self, shop_id: Uuid, id: Uuid) -> Result<CustomerDetail, AppError> {
        // As duas leituras são independentes
        let (customer, custom_values) = tokio::try_join!(
            self.find_in_shop(shop_id, id),
            self.custom_fields.list_values(id),
        )?;

        Ok(CustomerDetail { customer, custom_values })
    }

    /// Cliente de outra loja conta como inexistente.
    pub async fn find_in_shop(&self, shop_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
        self.customers
            .find_customer(id)
            .await?
            .filter(|c| c.shop_id == shop_id)
            .ok_or(AppError::CustomerNotFound)
    }

    pub async fn check_phone(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        raw_phone: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<PhoneCheck, AppError> {
        let phone = normalize_phone(raw_phone);
        if !is_valid_phone(&phone) {
            return Err(field_error("phone", "invalid_phone"));
        }

        let existing = self
            .customers
            .find_customer_by_phone(shop_id, branch_id, &phone)
            .await?
            .filter(|c| Some(c.id) != exclude_id);

        Ok(PhoneCheck {
            phone,
            available: existing.is_none(),
            customer_id: existing.map(|c| c.id),
        })
    }

    // =========================================================================
    //  2. ESCRITA
    // =========================================================================

    pub async fn create_customer(&self, shop_id: Uuid, input: CustomerInput) -> Result<CustomerDetail, AppError> {
        let (name, phone) = validate_identity(&input)?;
        self.check_branch(shop_id, input.branch_id).await?;
        if input.total_points < 0 {
            return Err(field_error("total_points", "invalid_points"));
        }

        // 1. Telefone duplicado: nem chega a chamar o store
        self.ensure_phone_free(shop_id, input.branch_id, &phone, None).await?;

        // 2. Valores personalizados validados antes de criar
        let custom_values = self
            .custom_fields
            .prepare_values(shop_id, None, &input.custom_values)
            .await?;

        // 3. Salva
        self.insert_customer(shop_id, name, phone, input, custom_values).await
    }

    /// Criação vinda da planilha: os valores personalizados ficam para a
    /// segunda passada da importação, então os obrigatórios não barram a linha.
    pub async fn create_from_import(&self, shop_id: Uuid, input: CustomerInput) -> Result<CustomerDetail, AppError> {
        let (name, phone) = validate_identity(&input)?;
        self.check_branch(shop_id, input.branch_id).await?;
        self.ensure_phone_free(shop_id, input.branch_id, &phone, None).await?;

        self.insert_customer(shop_id, name, phone, input, Vec::new()).await
    }

    async fn insert_customer(
        &self,
        shop_id: Uuid,
        name: String,
        phone: String,
        input: CustomerInput,
        custom_values: Vec<(Uuid, String)>,
    ) -> Result<CustomerDetail, AppError> {
        let customer = self
            .customers
            .create_customer(NewCustomer {
                name,
                phone,
                role: input.role,
                otp_verify: input.otp_verify,
                line_token: clean_token(input.line_token),
                shop_id,
                branch_id: input.branch_id,
                total_points: input.total_points,
            })
            .await?;

        let custom_values = self.custom_fields.write_values(customer.id, custom_values).await?;

        tracing::info!(customer = %customer.id, shop = %shop_id, "Cliente criado");
        Ok(CustomerDetail { customer, custom_values })
    }

    pub async fn update_customer(
        &self,
        shop_id: Uuid,
        id: Uuid,
        input: CustomerInput,
    ) -> Result<CustomerDetail, AppError> {
        let (name, phone) = validate_identity(&input)?;
        self.find_in_shop(shop_id, id).await?;
        self.check_branch(shop_id, input.branch_id).await?;
        self.ensure_phone_free(shop_id, input.branch_id, &phone, Some(id)).await?;

        let pending_values = if input.custom_values.is_empty() {
            Vec::new()
        } else {
            self.custom_fields
                .prepare_values(shop_id, Some(id), &input.custom_values)
                .await?
        };

        let customer = self
            .customers
            .update_customer(
                id,
                CustomerChanges {
                    name,
                    phone,
                    role: input.role,
                    otp_verify: input.otp_verify,
                    line_token: clean_token(input.line_token),
                    branch_id: input.branch_id,
                },
            )
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        self.custom_fields.write_values(id, pending_values).await?;
        let custom_values = self.custom_fields.list_values(id).await?;

        Ok(CustomerDetail { customer, custom_values })
    }

    pub async fn delete_customer(&self, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.find_in_shop(shop_id, id).await?;
        if !self.customers.delete_customer(id).await? {
            return Err(AppError::CustomerNotFound);
        }
        tracing::info!(customer = %id, shop = %shop_id, "Cliente removido");
        Ok(())
    }

    // =========================================================================
    //  3. PONTOS E CHECK-IN
    // =========================================================================

    pub async fn points(&self, shop_id: Uuid, id: Uuid) -> Result<PointsBalance, AppError> {
        self.find_in_shop(shop_id, id).await?;
        let total_points = self
            .customers
            .customer_points(id)
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        Ok(PointsBalance { customer_id: id, total_points })
    }

    pub async fn adjust_points(&self, shop_id: Uuid, id: Uuid, delta: i64) -> Result<PointsBalance, AppError> {
        if delta == 0 {
            return Err(field_error("delta", "zero_delta"));
        }
        self.find_in_shop(shop_id, id).await?;

        let total_points = self
            .customers
            .adjust_points(id, delta)
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        tracing::info!(customer = %id, delta, total_points, "Saldo de pontos ajustado");
        Ok(PointsBalance { customer_id: id, total_points })
    }

    pub async fn checkin(&self, shop_id: Uuid, id: Uuid) -> Result<Customer, AppError> {
        self.find_in_shop(shop_id, id).await?;
        self.customers
            .record_checkin(id, Utc::now())
            .await?
            .ok_or(AppError::CustomerNotFound)
    }

    // =========================================================================
    //  4. VALORES PERSONALIZADOS
    // =========================================================================

    pub async fn custom_values(&self, shop_id: Uuid, id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        self.find_in_shop(shop_id, id).await?;
        self.custom_fields.list_values(id).await
    }

    pub async fn put_custom_values(
        &self,
        shop_id: Uuid,
        id: Uuid,
        inputs: &[CustomValueInput],
    ) -> Result<Vec<CustomerCustomValue>, AppError> {
        self.find_in_shop(shop_id, id).await?;
        self.custom_fields.put_values(shop_id, id, inputs).await?;
        self.custom_fields.list_values(id).await
    }

    // --- Helpers ---

    async fn check_branch(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<(), AppError> {
        let Some(branch_id) = branch_id else {
            return Ok(());
        };

        self.directory
            .find_branch(branch_id)
            .await?
            .filter(|b| b.shop_id == shop_id)
            .ok_or(AppError::BranchNotFound)?;
        Ok(())
    }

    async fn ensure_phone_free(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        phone: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let taken = self
            .customers
            .find_customer_by_phone(shop_id, branch_id, phone)
            .await?
            .is_some_and(|c| Some(c.id) != exclude_id);

        if taken {
            return Err(AppError::DuplicatePhone(phone.to_string()));
        }
        Ok(())
    }
}

/// Nome e telefone são os únicos campos obrigatórios do cliente.
fn validate_identity(input: &CustomerInput) -> Result<(String, String), AppError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(field_error("name", "required"));
    }

    if input.phone.trim().is_empty() {
        return Err(field_error("phone", "required"));
    }
    let phone = normalize_phone(&input.phone);
    if !is_valid_phone(&phone) {
        return Err(field_error("phone", "invalid_phone"));
    }

    Ok((name.to_string(), phone))
}

fn clean_token(token: Option<String>) -> Option<String> {
    token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::custom_field::{CustomFieldType, NewCustomField},
    };

    struct Fixture {
        service: CustomerService,
        fields: CustomFieldService,
        shop: Uuid,
        branch: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let shop = store.create_store("Coffee Lab").await.unwrap();
        let branch = store.create_branch(shop.id, "Siam").await.unwrap();
        let fields = CustomFieldService::new(store.clone());
        Fixture {
            service: CustomerService::new(store.clone(), store, fields.clone()),
            fields,
            shop: shop.id,
            branch: branch.id,
        }
    }

    fn input(name: &str, phone: &str) -> CustomerInput {
        CustomerInput {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_normalizes_phone_and_rejects_duplicates() {
        let f = fixture().await;
        let created = f.service.create_customer(f.shop, input("Somchai", "081-234-5678")).await.unwrap();
        assert_eq!(created.customer.phone, "0812345678");

        let err = f.service.create_customer(f.shop, input("Other", "0812345678")).await;
        assert!(matches!(err, Err(AppError::DuplicatePhone(_))));

        let check = f.service.check_phone(f.shop, None, "081 234 5678", None).await.unwrap();
        assert!(!check.available);
        assert_eq!(check.customer_id, Some(created.customer.id));

        let check = f.service.check_phone(f.shop, None, "0812345678", Some(created.customer.id)).await.unwrap();
        assert!(check.available);
    }

    #[tokio::test]
    async fn name_and_phone_are_required() {
        let f = fixture().await;
        assert!(matches!(
            f.service.create_customer(f.shop, input("  ", "0812345678")).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.create_customer(f.shop, input("Somchai", "")).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.create_customer(f.shop, input("Somchai", "12")).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn branch_must_belong_to_the_shop() {
        let f = fixture().await;
        let mut foreign = input("Somchai", "0812345678");
        foreign.branch_id = Some(Uuid::new_v4());
        assert!(matches!(
            f.service.create_customer(f.shop, foreign).await,
            Err(AppError::BranchNotFound)
        ));

        let mut local = input("Somchai", "0812345678");
        local.branch_id = Some(f.branch);
        let created = f.service.create_customer(f.shop, local).await.unwrap();
        assert_eq!(created.customer.branch_id, Some(f.branch));
    }

    #[tokio::test]
    async fn customers_of_other_shops_are_invisible() {
        let f = fixture().await;
        let created = f.service.create_customer(f.shop, input("Somchai", "0812345678")).await.unwrap();

        let err = f.service.get_customer(Uuid::new_v4(), created.customer.id).await;
        assert!(matches!(err, Err(AppError::CustomerNotFound)));

        let err = f.service.delete_customer(Uuid::new_v4(), created.customer.id).await;
        assert!(matches!(err, Err(AppError::CustomerNotFound)));
    }

    #[tokio::test]
    async fn points_adjustments_never_go_negative() {
        let f = fixture().await;
        let mut new = input("Somchai", "0812345678");
        new.total_points = 10;
        let id = f.service.create_customer(f.shop, new).await.unwrap().customer.id;

        let balance = f.service.adjust_points(f.shop, id, 15).await.unwrap();
        assert_eq!(balance.total_points, 25);

        let err = f.service.adjust_points(f.shop, id, -30).await;
        assert!(matches!(err, Err(AppError::NegativeBalance)));
        assert_eq!(f.service.points(f.shop, id).await.unwrap().total_points, 25);

        let err = f.service.adjust_points(f.shop, id, 0).await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn checkin_stamps_the_customer() {
        let f = fixture().await;
        let id = f.service.create_customer(f.shop, input("Somchai", "0812345678")).await.unwrap().customer.id;

        let customer = f.service.checkin(f.shop, id).await.unwrap();
        assert!(customer.last_checkin_at.is_some());
    }

    #[tokio::test]
    async fn invalid_custom_values_block_the_create() {
        let f = fixture().await;
        let field = f
            .fields
            .create_field(NewCustomField {
                shop_id: f.shop,
                name: "Member No".into(),
                field_type: CustomFieldType::Number,
                options: None,
                is_required: false,
                is_exportable: true,
                sort_order: 0,
            })
            .await
            .unwrap();

        let mut bad = input("Somchai", "0812345678");
        bad.custom_values = vec![CustomValueInput { field_id: field.id, value: "abc".into() }];
        let err = f.service.create_customer(f.shop, bad).await;
        assert!(matches!(err, Err(AppError::CustomValueValidationError(_))));
        assert_eq!(f.service.list_all(f.shop, None).await.unwrap().len(), 0);

        let mut good = input("Somchai", "0812345678");
        good.custom_values = vec![CustomValueInput { field_id: field.id, value: "42".into() }];
        let created = f.service.create_customer(f.shop, good).await.unwrap();
        assert_eq!(created.custom_values.len(), 1);
        assert_eq!(created.custom_values[0].value, "42");
    }

    #[tokio::test]
    async fn listing_searches_and_filters_by_branch() {
        let f = fixture().await;
        let mut at_branch = input("Somchai", "0812345678");
        at_branch.branch_id = Some(f.branch);
        f.service.create_customer(f.shop, at_branch).await.unwrap();
        f.service.create_customer(f.shop, input("Anna", "0899999999")).await.unwrap();

        let all = f.service.list_customers(f.shop, None, &ListQuery::default()).await.unwrap();
        assert_eq!(all.total, 2);

        let branch_only = f.service.list_customers(f.shop, Some(f.branch), &ListQuery::default()).await.unwrap();
        assert_eq!(branch_only.total, 1);

        let query = ListQuery { q: Some("ANNA".into()), ..Default::default() };
        let found = f.service.list_customers(f.shop, None, &query).await.unwrap();
        assert_eq!(found.items[0].name, "Anna");
    }
}
