// src/services/admin_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{
        error::{field_error, AppError},
        listing::{ListQuery, Page},
    },
    db::{AdminStore, StoreDirectory},
    middleware::auth::Session,
    models::admin::{Admin, AdminChanges, AdminLevel, NewAdmin},
    services::auth::hash_password,
};

/// Dados de cadastro/edição vindos do painel (senha ainda em texto puro).
#[derive(Debug, Clone)]
pub struct AdminInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    // Obrigatória na criação; na edição, `None` mantém a atual
    pub password: Option<String>,
    pub level: AdminLevel,
    pub shop_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AdminService {
    admins: Arc<dyn AdminStore>,
    directory: Arc<dyn StoreDirectory>,
    bcrypt_cost: u32,
}

impl AdminService {
    pub fn new(admins: Arc<dyn AdminStore>, directory: Arc<dyn StoreDirectory>, bcrypt_cost: u32) -> Self {
        Self { admins, directory, bcrypt_cost }
    }

    pub async fn list_admins(&self, session: &Session, query: &ListQuery) -> Result<Page<Admin>, AppError> {
        // Admin comum só enxerga a equipe da própria loja
        let shop_filter = if session.is_superadmin() { None } else { session.shop_id };
        if !session.is_superadmin() && shop_filter.is_none() {
            return Ok(query.apply(Vec::new()));
        }

        let admins = self.admins.list_admins(shop_filter).await?;
        Ok(query.apply(admins))
    }

    pub async fn get_admin(&self, session: &Session, id: Uuid) -> Result<Admin, AppError> {
        let admin = self.admins.find_admin(id).await?.ok_or(AppError::AdminNotFound)?;

        let visible = session.is_superadmin()
            || admin.id == session.admin_id
            || (admin.shop_id.is_some() && admin.shop_id == session.shop_id);
        if !visible {
            return Err(AppError::AdminNotFound);
        }

        Ok(admin)
    }

    pub async fn create_admin(&self, input: AdminInput) -> Result<Admin, AppError> {
        let password = input.password.as_deref().unwrap_or_default();
        if password.len() < 6 {
            return Err(field_error("password", "password_too_short"));
        }
        self.check_shop(input.level, input.shop_id).await?;

        let password_hash = hash_password(password, self.bcrypt_cost).await?;

        let admin = self
            .admins
            .create_admin(NewAdmin {
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                username: input.username.trim().to_string(),
                password_hash,
                level: input.level,
                shop_id: input.shop_id,
            })
            .await?;

        tracing::info!(admin = %admin.id, level = admin.level.as_str(), "Admin criado: {}", admin.username);
        Ok(admin)
    }

    pub async fn update_admin(&self, id: Uuid, input: AdminInput) -> Result<Admin, AppError> {
        self.check_shop(input.level, input.shop_id).await?;

        // Senha em branco = manter a atual
        let password_hash = match input.password.as_deref().map(str::trim) {
            Some(password) if !password.is_empty() => {
                if password.len() < 6 {
                    return Err(field_error("password", "password_too_short"));
                }
                Some(hash_password(password, self.bcrypt_cost).await?)
            }
            _ => None,
        };

        self.admins
            .update_admin(
                id,
                AdminChanges {
                    first_name: input.first_name.trim().to_string(),
                    last_name: input.last_name.trim().to_string(),
                    username: input.username.trim().to_string(),
                    password_hash,
                    level: input.level,
                    shop_id: input.shop_id,
                },
            )
            .await?
            .ok_or(AppError::AdminNotFound)
    }

    pub async fn delete_admin(&self, session: &Session, id: Uuid) -> Result<(), AppError> {
        if session.admin_id == id {
            return Err(AppError::Forbidden);
        }

        if !self.admins.delete_admin(id).await? {
            return Err(AppError::AdminNotFound);
        }

        tracing::info!(admin = %id, by = %session.admin_id, "Admin removido");
        Ok(())
    }

    /// Cria o primeiro superadmin quando a base ainda não tem nenhum admin.
    pub async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> Result<Option<Admin>, AppError> {
        if self.admins.count_admins().await? > 0 {
            return Ok(None);
        }

        let admin = self
            .create_admin(AdminInput {
                first_name: "Super".into(),
                last_name: "Admin".into(),
                username: username.to_string(),
                password: Some(password.to_string()),
                level: AdminLevel::Superadmin,
                shop_id: None,
            })
            .await?;

        Ok(Some(admin))
    }

    async fn check_shop(&self, level: AdminLevel, shop_id: Option<Uuid>) -> Result<(), AppError> {
        match (level, shop_id) {
            (AdminLevel::Admin, None) => Err(field_error("shop_id", "shop_required")),
            (_, Some(shop_id)) => {
                self.directory
                    .find_store(shop_id)
                    .await?
                    .ok_or(AppError::StoreNotFound)?;
                Ok(())
            }
            (AdminLevel::Superadmin, None) => Ok(()),
        }
    }
}
