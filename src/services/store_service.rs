// src/services/store_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{field_error, AppError},
    db::StoreDirectory,
    middleware::auth::Session,
    models::store::{Branch, Store},
};

#[derive(Clone)]
pub struct StoreService {
    directory: Arc<dyn StoreDirectory>,
}

impl StoreService {
    pub fn new(directory: Arc<dyn StoreDirectory>) -> Self {
        Self { directory }
    }

    /// Superadmin vê todas as lojas; admin só a própria.
    pub async fn list_stores(&self, session: &Session) -> Result<Vec<Store>, AppError> {
        if session.is_superadmin() {
            return self.directory.list_stores().await;
        }

        match session.shop_id {
            Some(shop_id) => Ok(self.directory.find_store(shop_id).await?.into_iter().collect()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn create_store(&self, name: &str) -> Result<Store, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(field_error("name", "required"));
        }

        let store = self.directory.create_store(name).await?;
        tracing::info!(store = %store.id, "🏪 Loja criada: {}", store.name);
        Ok(store)
    }

    pub async fn list_branches(&self, shop_id: Uuid) -> Result<Vec<Branch>, AppError> {
        self.directory.list_branches(shop_id).await
    }

    pub async fn create_branch(&self, shop_id: Uuid, name: &str) -> Result<Branch, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(field_error("name", "required"));
        }

        self.directory
            .find_store(shop_id)
            .await?
            .ok_or(AppError::StoreNotFound)?;

        self.directory.create_branch(shop_id, name).await
    }

    /// A filial precisa existir e pertencer à loja.
    pub async fn branch_in_shop(&self, shop_id: Uuid, branch_id: Uuid) -> Result<Branch, AppError> {
        self.directory
            .find_branch(branch_id)
            .await?
            .filter(|branch| branch.shop_id == shop_id)
            .ok_or(AppError::BranchNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, models::admin::AdminLevel};

    fn session(level: AdminLevel, shop_id: Option<Uuid>) -> Session {
        Session {
            admin_id: Uuid::new_v4(),
            username: "tester".into(),
            level,
            shop_id,
            branch_id: None,
        }
    }

    #[tokio::test]
    async fn admins_only_see_their_own_store() {
        let service = StoreService::new(Arc::new(MemoryStore::new()));
        let own = service.create_store("Coffee Lab").await.unwrap();
        service.create_store("Tea House").await.unwrap();

        let all = service.list_stores(&session(AdminLevel::Superadmin, None)).await.unwrap();
        assert_eq!(all.len(), 2);

        let mine = service.list_stores(&session(AdminLevel::Admin, Some(own.id))).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, own.id);
    }

    #[tokio::test]
    async fn branch_requires_existing_store_and_name() {
        let service = StoreService::new(Arc::new(MemoryStore::new()));

        let err = service.create_branch(Uuid::new_v4(), "Siam").await;
        assert!(matches!(err, Err(AppError::StoreNotFound)));

        let store = service.create_store("Coffee Lab").await.unwrap();
        let err = service.create_branch(store.id, "   ").await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));

        let branch = service.create_branch(store.id, "Siam").await.unwrap();
        assert_eq!(branch.shop_id, store.id);
        assert_eq!(service.list_branches(store.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn branch_must_belong_to_the_shop() {
        let service = StoreService::new(Arc::new(MemoryStore::new()));
        let coffee = service.create_store("Coffee Lab").await.unwrap();
        let tea = service.create_store("Tea House").await.unwrap();
        let siam = service.create_branch(coffee.id, "Siam").await.unwrap();

        assert_eq!(service.branch_in_shop(coffee.id, siam.id).await.unwrap().id, siam.id);

        let err = service.branch_in_shop(tea.id, siam.id).await;
        assert!(matches!(err, Err(AppError::BranchNotFound)));

        let err = service.branch_in_shop(coffee.id, Uuid::new_v4()).await;
        assert!(matches!(err, Err(AppError::BranchNotFound)));
    }
}
