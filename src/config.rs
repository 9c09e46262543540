// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::Stores,
    services::{
        admin_service::AdminService, auth::AuthService, custom_field_service::CustomFieldService,
        customer_service::CustomerService, promotion_service::{PromotionService, RedemptionService},
        store_service::StoreService, transfer_service::TransferService,
    },
};

/// Configuração lida do ambiente (.env via dotenvy).
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Sem DATABASE_URL o servidor sobe com o store em memória (modo demonstração)
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<(String, String)>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME").ok(),
            env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", 24 * 7)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            bootstrap_admin,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ('{}'): {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub admin_service: AdminService,
    pub store_service: StoreService,
    pub customer_service: CustomerService,
    pub custom_field_service: CustomFieldService,
    pub promotion_service: PromotionService,
    pub redemption_service: RedemptionService,
    pub transfer_service: TransferService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let (db_pool, stores) = match &config.database_url {
            Some(database_url) => {
                // Conecta ao banco de dados, usando '?' para propagar erros
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                (Some(pool.clone()), Stores::postgres(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL ausente: usando store em memória (dados não persistem)");
                (None, Stores::memory())
            }
        };

        let mut state = Self::from_stores(config, stores)?;
        state.db_pool = db_pool;
        Ok(state)
    }

    /// Monta o gráfico de dependências sobre um conjunto de stores.
    pub fn from_stores(config: AppConfig, stores: Stores) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::embedded()?);

        let auth_service = AuthService::new(
            stores.admins.clone(),
            config.jwt_secret.clone(),
            config.token_ttl_hours,
        );
        let admin_service = AdminService::new(
            stores.admins.clone(),
            stores.directory.clone(),
            config.bcrypt_cost,
        );
        let store_service = StoreService::new(stores.directory.clone());
        let custom_field_service = CustomFieldService::new(stores.custom_fields.clone());
        let customer_service = CustomerService::new(
            stores.customers.clone(),
            stores.directory.clone(),
            custom_field_service.clone(),
        );
        let promotion_service = PromotionService::new(stores.promotions.clone(), stores.directory.clone());
        let redemption_service = RedemptionService::new(stores.promotions.clone(), stores.customers.clone());
        let transfer_service = TransferService::new(
            customer_service.clone(),
            custom_field_service.clone(),
            stores.directory.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            db_pool: None,
            i18n_store,
            auth_service,
            admin_service,
            store_service,
            customer_service,
            custom_field_service,
            promotion_service,
            redemption_service,
            transfer_service,
        })
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt_secret: "test-secret".into(),
            bind_addr: "127.0.0.1:0".into(),
            db_max_connections: 1,
            token_ttl_hours: 1,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }
}
