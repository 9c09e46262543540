// src/db/memory.rs

//! Store em memória: usado no modo demonstração (sem DATABASE_URL) e nos testes.
//! Reproduz as mesmas regras que o Postgres garante via constraints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::{AdminStore, CustomFieldStore, CustomerStore, PromotionStore, StoreDirectory},
    models::{
        admin::{Admin, AdminChanges, NewAdmin},
        custom_field::{CustomField, CustomerCustomValue, NewCustomField},
        customer::{Customer, CustomerChanges, NewCustomer},
        promotion::{NewPromotion, Promotion, PromotionChanges, PromotionHistory, RedemptionRecord},
        store::{Branch, Store},
    },
};

#[derive(Default)]
struct MemoryData {
    admins: Vec<Admin>,
    customers: Vec<Customer>,
    promotions: Vec<Promotion>,
    history: Vec<PromotionHistory>,
    stores: Vec<Store>,
    branches: Vec<Branch>,
    fields: Vec<CustomField>,
    values: Vec<CustomerCustomValue>,
}

impl MemoryData {
    fn phone_taken(&self, shop_id: Uuid, branch_id: Option<Uuid>, phone: &str, except: Option<Uuid>) -> bool {
        self.customers.iter().any(|c| {
            c.shop_id == shop_id
                && c.branch_id == branch_id
                && c.phone == phone
                && Some(c.id) != except
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn list_admins(&self, shop_id: Option<Uuid>) -> Result<Vec<Admin>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .admins
            .iter()
            .filter(|a| shop_id.is_none() || a.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn find_admin(&self, id: Uuid) -> Result<Option<Admin>, AppError> {
        let data = self.data.read().await;
        Ok(data.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>, AppError> {
        let data = self.data.read().await;
        Ok(data.admins.iter().find(|a| a.username == username).cloned())
    }

    async fn create_admin(&self, new: NewAdmin) -> Result<Admin, AppError> {
        let mut data = self.data.write().await;
        if data.admins.iter().any(|a| a.username == new.username) {
            return Err(AppError::UsernameAlreadyExists(new.username));
        }

        let now = Utc::now();
        let admin = Admin {
            id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            username: new.username,
            password_hash: new.password_hash,
            level: new.level,
            shop_id: new.shop_id,
            created_at: now,
            updated_at: now,
        };
        data.admins.push(admin.clone());
        Ok(admin)
    }

    async fn update_admin(&self, id: Uuid, changes: AdminChanges) -> Result<Option<Admin>, AppError> {
        let mut data = self.data.write().await;
        if data.admins.iter().any(|a| a.username == changes.username && a.id != id) {
            return Err(AppError::UsernameAlreadyExists(changes.username));
        }

        let Some(admin) = data.admins.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        admin.first_name = changes.first_name;
        admin.last_name = changes.last_name;
        admin.username = changes.username;
        if let Some(hash) = changes.password_hash {
            admin.password_hash = hash;
        }
        admin.level = changes.level;
        admin.shop_id = changes.shop_id;
        admin.updated_at = Utc::now();
        Ok(Some(admin.clone()))
    }

    async fn delete_admin(&self, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let before = data.admins.len();
        data.admins.retain(|a| a.id != id);
        Ok(data.admins.len() != before)
    }

    async fn count_admins(&self) -> Result<i64, AppError> {
        Ok(self.data.read().await.admins.len() as i64)
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn list_customers(&self, shop_id: Uuid, branch_id: Option<Uuid>) -> Result<Vec<Customer>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .customers
            .iter()
            .filter(|c| c.shop_id == shop_id)
            .filter(|c| branch_id.is_none() || c.branch_id == branch_id)
            .cloned()
            .collect())
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let data = self.data.read().await;
        Ok(data.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_customer_by_phone(
        &self,
        shop_id: Uuid,
        branch_id: Option<Uuid>,
        phone: &str,
    ) -> Result<Option<Customer>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .customers
            .iter()
            .find(|c| c.shop_id == shop_id && c.branch_id == branch_id && c.phone == phone)
            .cloned())
    }

    async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError> {
        let mut data = self.data.write().await;
        if data.phone_taken(new.shop_id, new.branch_id, &new.phone, None) {
            return Err(AppError::DuplicatePhone(new.phone));
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: new.name,
            phone: new.phone,
            role: new.role,
            otp_verify: new.otp_verify,
            line_token: new.line_token,
            shop_id: new.shop_id,
            branch_id: new.branch_id,
            total_points: new.total_points,
            last_checkin_at: None,
            created_at: now,
            updated_at: now,
        };
        data.customers.push(customer.clone());
        Ok(customer)
    }

    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> Result<Option<Customer>, AppError> {
        let mut data = self.data.write().await;
        let Some(shop_id) = data.customers.iter().find(|c| c.id == id).map(|c| c.shop_id) else {
            return Ok(None);
        };
        if data.phone_taken(shop_id, changes.branch_id, &changes.phone, Some(id)) {
            return Err(AppError::DuplicatePhone(changes.phone));
        }

        let Some(customer) = data.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        customer.name = changes.name;
        customer.phone = changes.phone;
        customer.role = changes.role;
        customer.otp_verify = changes.otp_verify;
        customer.line_token = changes.line_token;
        customer.branch_id = changes.branch_id;
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }

    async fn delete_customer(&self, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let before = data.customers.len();
        data.customers.retain(|c| c.id != id);
        data.values.retain(|v| v.customer_id != id);
        Ok(data.customers.len() != before)
    }

    async fn customer_points(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        let data = self.data.read().await;
        Ok(data.customers.iter().find(|c| c.id == id).map(|c| c.total_points))
    }

    async fn adjust_points(&self, id: Uuid, delta: i64) -> Result<Option<i64>, AppError> {
        let mut data = self.data.write().await;
        let Some(customer) = data.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let next = customer
            .total_points
            .checked_add(delta)
            .ok_or_else(|| field_error("delta", "points_out_of_range"))?;
        if next < 0 {
            return Err(AppError::NegativeBalance);
        }
        customer.total_points = next;
        customer.updated_at = Utc::now();
        Ok(Some(customer.total_points))
    }

    async fn record_checkin(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Customer>, AppError> {
        let mut data = self.data.write().await;
        let Some(customer) = data.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        customer.last_checkin_at = Some(at);
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }
}

#[async_trait]
impl PromotionStore for MemoryStore {
    async fn list_promotions(&self, shop_id: Uuid) -> Result<Vec<Promotion>, AppError> {
        let data = self.data.read().await;
        Ok(data.promotions.iter().filter(|p| p.shop_id == shop_id).cloned().collect())
    }

    async fn find_promotion(&self, id: Uuid) -> Result<Option<Promotion>, AppError> {
        let data = self.data.read().await;
        Ok(data.promotions.iter().find(|p| p.id == id).cloned())
    }

    async fn create_promotion(&self, new: NewPromotion) -> Result<Promotion, AppError> {
        let now = Utc::now();
        let promotion = Promotion {
            id: Uuid::new_v4(),
            name: new.name,
            points: new.points,
            shop_id: new.shop_id,
            branch_ids: new.branch_ids,
            status: new.status,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        };
        self.data.write().await.promotions.push(promotion.clone());
        Ok(promotion)
    }

    async fn update_promotion(&self, id: Uuid, changes: PromotionChanges) -> Result<Option<Promotion>, AppError> {
        let mut data = self.data.write().await;
        let Some(promotion) = data.promotions.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        promotion.name = changes.name;
        promotion.points = changes.points;
        promotion.branch_ids = changes.branch_ids;
        promotion.status = changes.status;
        promotion.image_url = changes.image_url;
        promotion.updated_at = Utc::now();
        Ok(Some(promotion.clone()))
    }

    async fn delete_promotion(&self, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let before = data.promotions.len();
        data.promotions.retain(|p| p.id != id);
        Ok(data.promotions.len() != before)
    }

    async fn redeem_promotion(&self, record: RedemptionRecord) -> Result<PromotionHistory, AppError> {
        // O write lock faz o papel da transação
        let mut data = self.data.write().await;
        let Some(customer) = data.customers.iter_mut().find(|c| c.id == record.customer_id) else {
            return Err(AppError::CustomerNotFound);
        };
        if customer.total_points < record.points {
            return Err(AppError::InsufficientPoints {
                required: record.points,
                available: customer.total_points,
            });
        }
        customer.total_points -= record.points;
        customer.updated_at = Utc::now();

        let history = PromotionHistory {
            id: Uuid::new_v4(),
            promotion_id: record.promotion_id,
            customer_id: record.customer_id,
            shop_id: record.shop_id,
            branch_id: record.branch_id,
            points_spent: record.points,
            created_at: Utc::now(),
        };
        data.history.push(history.clone());
        Ok(history)
    }

    async fn list_history(&self, shop_id: Uuid, customer_id: Option<Uuid>) -> Result<Vec<PromotionHistory>, AppError> {
        let data = self.data.read().await;
        let mut history: Vec<PromotionHistory> = data
            .history
            .iter()
            .filter(|h| h.shop_id == shop_id)
            .filter(|h| customer_id.is_none() || Some(h.customer_id) == customer_id)
            .cloned()
            .collect();
        history.reverse();
        Ok(history)
    }
}

#[async_trait]
impl CustomFieldStore for MemoryStore {
    async fn list_fields(&self, shop_id: Uuid) -> Result<Vec<CustomField>, AppError> {
        let data = self.data.read().await;
        let mut fields: Vec<CustomField> = data.fields.iter().filter(|f| f.shop_id == shop_id).cloned().collect();
        fields.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(fields)
    }

    async fn find_field(&self, id: Uuid) -> Result<Option<CustomField>, AppError> {
        let data = self.data.read().await;
        Ok(data.fields.iter().find(|f| f.id == id).cloned())
    }

    async fn create_field(&self, new: NewCustomField) -> Result<CustomField, AppError> {
        let mut data = self.data.write().await;
        if data.fields.iter().any(|f| f.shop_id == new.shop_id && f.name == new.name) {
            return Err(AppError::CustomFieldNameAlreadyExists(new.name));
        }

        let field = CustomField {
            id: Uuid::new_v4(),
            shop_id: new.shop_id,
            name: new.name,
            field_type: new.field_type,
            options: new.options,
            is_required: new.is_required,
            is_exportable: new.is_exportable,
            sort_order: new.sort_order,
            created_at: Utc::now(),
        };
        data.fields.push(field.clone());
        Ok(field)
    }

    async fn delete_field(&self, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let before = data.fields.len();
        data.fields.retain(|f| f.id != id);
        data.values.retain(|v| v.field_id != id);
        Ok(data.fields.len() != before)
    }

    async fn list_values(&self, customer_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        let data = self.data.read().await;
        Ok(data.values.iter().filter(|v| v.customer_id == customer_id).cloned().collect())
    }

    async fn list_values_for_shop(&self, shop_id: Uuid) -> Result<Vec<CustomerCustomValue>, AppError> {
        let data = self.data.read().await;
        Ok(data
            .values
            .iter()
            .filter(|v| {
                data.customers
                    .iter()
                    .any(|c| c.id == v.customer_id && c.shop_id == shop_id)
            })
            .cloned()
            .collect())
    }

    async fn upsert_value(
        &self,
        customer_id: Uuid,
        field_id: Uuid,
        value: &str,
    ) -> Result<CustomerCustomValue, AppError> {
        let mut data = self.data.write().await;
        let now = Utc::now();

        if let Some(existing) = data
            .values
            .iter_mut()
            .find(|v| v.customer_id == customer_id && v.field_id == field_id)
        {
            existing.value = value.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = CustomerCustomValue {
            customer_id,
            field_id,
            value: value.to_string(),
            updated_at: now,
        };
        data.values.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl StoreDirectory for MemoryStore {
    async fn list_stores(&self) -> Result<Vec<Store>, AppError> {
        let data = self.data.read().await;
        let mut stores = data.stores.clone();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }

    async fn find_store(&self, id: Uuid) -> Result<Option<Store>, AppError> {
        let data = self.data.read().await;
        Ok(data.stores.iter().find(|s| s.id == id).cloned())
    }

    async fn create_store(&self, name: &str) -> Result<Store, AppError> {
        let store = Store {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.data.write().await.stores.push(store.clone());
        Ok(store)
    }

    async fn list_branches(&self, shop_id: Uuid) -> Result<Vec<Branch>, AppError> {
        let data = self.data.read().await;
        let mut branches: Vec<Branch> = data.branches.iter().filter(|b| b.shop_id == shop_id).cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn find_branch(&self, id: Uuid) -> Result<Option<Branch>, AppError> {
        let data = self.data.read().await;
        Ok(data.branches.iter().find(|b| b.id == id).cloned())
    }

    async fn create_branch(&self, shop_id: Uuid, name: &str) -> Result<Branch, AppError> {
        let branch = Branch {
            id: Uuid::new_v4(),
            shop_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.data.write().await.branches.push(branch.clone());
        Ok(branch)
    }
}
