// src/services/promotion_service.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::{
    common::{
        error::{field_error, AppError},
        listing::{ListQuery, Page},
    },
    db::{CustomerStore, PromotionStore, StoreDirectory},
    models::promotion::{
        NewPromotion, Promotion, PromotionChanges, PromotionHistory, PromotionStatus,
        RedemptionEligibility, RedemptionReceipt, RedemptionRecord,
    },
};

#[derive(Debug, Clone)]
pub struct PromotionInput {
    pub name: String,
    pub points: i64,
    // Vazio = todas as filiais
    pub branch_ids: Vec<Uuid>,
    pub status: PromotionStatus,
    pub image_url: Option<String>,
}

// =============================================================================
//  1. CADASTRO DE PROMOÇÕES
// =============================================================================

#[derive(Clone)]
pub struct PromotionService {
    promotions: Arc<dyn PromotionStore>,
    directory: Arc<dyn StoreDirectory>,
}

impl PromotionService {
    pub fn new(promotions: Arc<dyn PromotionStore>, directory: Arc<dyn StoreDirectory>) -> Self {
        Self { promotions, directory }
    }

    pub async fn list_promotions(&self, shop_id: Uuid, query: &ListQuery) -> Result<Page<Promotion>, AppError> {
        let promotions = self.promotions.list_promotions(shop_id).await?;
        Ok(query.apply(promotions))
    }

    pub async fn get_promotion(&self, shop_id: Uuid, id: Uuid) -> Result<Promotion, AppError> {
        find_in_shop(self.promotions.as_ref(), shop_id, id).await
    }

    pub async fn create_promotion(&self, shop_id: Uuid, input: PromotionInput) -> Result<Promotion, AppError> {
        let input = self.check_input(shop_id, input).await?;

        let promotion = self
            .promotions
            .create_promotion(NewPromotion {
                name: input.name,
                points: input.points,
                shop_id,
                branch_ids: input.branch_ids,
                status: input.status,
                image_url: input.image_url,
            })
            .await?;

        tracing::info!(promotion = %promotion.id, shop = %shop_id, points = promotion.points, "🎁 Promoção criada");
        Ok(promotion)
    }

    pub async fn update_promotion(
        &self,
        shop_id: Uuid,
        id: Uuid,
        input: PromotionInput,
    ) -> Result<Promotion, AppError> {
        find_in_shop(self.promotions.as_ref(), shop_id, id).await?;
        let input = self.check_input(shop_id, input).await?;

        self.promotions
            .update_promotion(
                id,
                PromotionChanges {
                    name: input.name,
                    points: input.points,
                    branch_ids: input.branch_ids,
                    status: input.status,
                    image_url: input.image_url,
                },
            )
            .await?
            .ok_or(AppError::PromotionNotFound)
    }

    pub async fn delete_promotion(&self, shop_id: Uuid, id: Uuid) -> Result<(), AppError> {
        find_in_shop(self.promotions.as_ref(), shop_id, id).await?;
        if !self.promotions.delete_promotion(id).await? {
            return Err(AppError::PromotionNotFound);
        }
        Ok(())
    }

    async fn check_input(&self, shop_id: Uuid, mut input: PromotionInput) -> Result<PromotionInput, AppError> {
        input.name = input.name.trim().to_string();
        if input.name.is_empty() {
            return Err(field_error("name", "required"));
        }
        if input.points < 0 {
            return Err(field_error("points", "invalid_points"));
        }

        // Todas as filiais citadas precisam ser da loja
        input.branch_ids.sort();
        input.branch_ids.dedup();
        let branches = self.directory.list_branches(shop_id).await?;
        if input.branch_ids.iter().any(|id| !branches.iter().any(|b| b.id == *id)) {
            return Err(AppError::BranchNotFound);
        }

        input.image_url = input.image_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        Ok(input)
    }
}

async fn find_in_shop(store: &dyn PromotionStore, shop_id: Uuid, id: Uuid) -> Result<Promotion, AppError> {
    store
        .find_promotion(id)
        .await?
        .filter(|p| p.shop_id == shop_id)
        .ok_or(AppError::PromotionNotFound)
}

// =============================================================================
//  2. RESGATE
// =============================================================================

type RedemptionKey = (Uuid, Uuid);

/// Marca um resgate (cliente, promoção) em andamento; libera ao sair de escopo.
struct PendingRedemption {
    pending: Arc<Mutex<HashSet<RedemptionKey>>>,
    key: RedemptionKey,
}

impl PendingRedemption {
    fn acquire(pending: &Arc<Mutex<HashSet<RedemptionKey>>>, key: RedemptionKey) -> Option<Self> {
        let inserted = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);

        inserted.then(|| Self { pending: pending.clone(), key })
    }
}

impl Drop for PendingRedemption {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Clone)]
pub struct RedemptionService {
    promotions: Arc<dyn PromotionStore>,
    customers: Arc<dyn CustomerStore>,
    pending: Arc<Mutex<HashSet<RedemptionKey>>>,
}

impl RedemptionService {
    pub fn new(promotions: Arc<dyn PromotionStore>, customers: Arc<dyn CustomerStore>) -> Self {
        Self {
            promotions,
            customers,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_pending(&self, customer_id: Uuid, promotion_id: Uuid) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(customer_id, promotion_id))
    }

    pub async fn redeem(
        &self,
        shop_id: Uuid,
        promotion_id: Uuid,
        customer_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<RedemptionReceipt, AppError> {
        // 1. Um resgate por vez para o mesmo par; o segundo volta sem efeito
        let Some(_guard) = PendingRedemption::acquire(&self.pending, (customer_id, promotion_id)) else {
            tracing::warn!(customer = %customer_id, promotion = %promotion_id, "Resgate duplicado ignorado");
            return Err(AppError::RedemptionInProgress);
        };

        // 2. Promoção da loja, aberta e válida na filial
        let promotion = find_in_shop(self.promotions.as_ref(), shop_id, promotion_id).await?;
        if promotion.status == PromotionStatus::Close {
            return Err(AppError::PromotionClosed);
        }
        if !promotion.is_valid_at(branch_id) {
            return Err(AppError::BranchNotEligible);
        }

        // 3. Saldo atual
        let current = self.current_points(shop_id, customer_id).await?;
        if current < promotion.points {
            return Err(AppError::InsufficientPoints {
                required: promotion.points,
                available: current,
            });
        }

        // 4. Histórico + desconto numa operação só do store
        let history = self
            .promotions
            .redeem_promotion(RedemptionRecord {
                promotion_id,
                customer_id,
                shop_id,
                branch_id,
                points: promotion.points,
            })
            .await
            .map_err(|e| classify_failure(e, promotion.points, current))?;

        // 5. Saldo relido do store, nada de conta local
        let remaining_points = self
            .customers
            .customer_points(customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound)?;

        tracing::info!(
            customer = %customer_id,
            promotion = %promotion_id,
            spent = history.points_spent,
            remaining_points,
            "✅ Promoção resgatada"
        );

        Ok(RedemptionReceipt { history, remaining_points })
    }

    /// O "botão de resgatar" do lado do servidor.
    pub async fn eligibility(
        &self,
        shop_id: Uuid,
        promotion_id: Uuid,
        customer_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> Result<RedemptionEligibility, AppError> {
        let (promotion, current_points) = tokio::try_join!(
            find_in_shop(self.promotions.as_ref(), shop_id, promotion_id),
            self.current_points(shop_id, customer_id),
        )?;

        let pending = self.is_pending(customer_id, promotion_id);
        let can_redeem = promotion.status == PromotionStatus::Open
            && promotion.is_valid_at(branch_id)
            && current_points >= promotion.points
            && !pending;

        Ok(RedemptionEligibility {
            promotion_id,
            customer_id,
            current_points,
            required_points: promotion.points,
            can_redeem,
            pending,
        })
    }

    pub async fn list_history(
        &self,
        shop_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<PromotionHistory>, AppError> {
        self.promotions.list_history(shop_id, customer_id).await
    }

    async fn current_points(&self, shop_id: Uuid, customer_id: Uuid) -> Result<i64, AppError> {
        self.customers
            .find_customer(customer_id)
            .await?
            .filter(|c| c.shop_id == shop_id)
            .map(|c| c.total_points)
            .ok_or(AppError::CustomerNotFound)
    }
}

/// Falhas do store: saldo insuficiente (tipado ou pela mensagem) vira erro de pontos;
/// o resto sobe como falha genérica de resgate.
fn classify_failure(err: AppError, required: i64, available: i64) -> AppError {
    match err {
        AppError::InsufficientPoints { .. } | AppError::CustomerNotFound => err,
        AppError::NegativeBalance => AppError::InsufficientPoints { required, available },
        other => {
            let message = other.to_string();
            let lowered = message.to_lowercase();
            let about_points = ["คะแนน", "points", "insufficient"]
                .iter()
                .any(|needle| lowered.contains(needle));

            if about_points {
                AppError::InsufficientPoints { required, available }
            } else {
                tracing::error!("Falha no resgate: {}", message);
                AppError::RedemptionFailed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::customer::{CustomerRole, NewCustomer},
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct Fixture {
        store: Arc<MemoryStore>,
        promotions: PromotionService,
        shop: Uuid,
        branch: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let shop = store.create_store("Coffee Lab").await.unwrap();
        let branch = store.create_branch(shop.id, "Siam").await.unwrap();
        Fixture {
            promotions: PromotionService::new(store.clone(), store.clone()),
            store,
            shop: shop.id,
            branch: branch.id,
        }
    }

    async fn customer_with(store: &MemoryStore, shop_id: Uuid, points: i64) -> Uuid {
        store
            .create_customer(NewCustomer {
                name: "Somchai".into(),
                phone: format!("08{:08}", points),
                role: CustomerRole::Customer,
                otp_verify: true,
                line_token: None,
                shop_id,
                branch_id: None,
                total_points: points,
            })
            .await
            .unwrap()
            .id
    }

    fn promo(points: i64) -> PromotionInput {
        PromotionInput {
            name: "Free coffee".into(),
            points,
            branch_ids: Vec::new(),
            status: PromotionStatus::Open,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn redeem_deducts_and_rereads_balance() {
        let f = fixture().await;
        let redemption = RedemptionService::new(f.store.clone(), f.store.clone());
        let customer = customer_with(&f.store, f.shop, 80).await;
        let promotion = f.promotions.create_promotion(f.shop, promo(50)).await.unwrap();

        let receipt = redemption.redeem(f.shop, promotion.id, customer, None).await.unwrap();
        assert_eq!(receipt.remaining_points, 30);
        assert_eq!(receipt.history.points_spent, 50);
        assert!(!redemption.is_pending(customer, promotion.id));

        let history = redemption.list_history(f.shop, Some(customer)).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn insufficient_points_refuse_without_side_effects() {
        let f = fixture().await;
        let redemption = RedemptionService::new(f.store.clone(), f.store.clone());
        let customer = customer_with(&f.store, f.shop, 20).await;
        let promotion = f.promotions.create_promotion(f.shop, promo(50)).await.unwrap();

        let eligibility = redemption.eligibility(f.shop, promotion.id, customer, None).await.unwrap();
        assert!(!eligibility.can_redeem);
        assert_eq!(eligibility.current_points, 20);
        assert_eq!(eligibility.required_points, 50);

        let err = redemption.redeem(f.shop, promotion.id, customer, None).await;
        assert!(matches!(err, Err(AppError::InsufficientPoints { required: 50, available: 20 })));
        assert_eq!(f.store.customer_points(customer).await.unwrap(), Some(20));
        assert!(redemption.list_history(f.shop, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_and_branch_restricted_promotions() {
        let f = fixture().await;
        let redemption = RedemptionService::new(f.store.clone(), f.store.clone());
        let customer = customer_with(&f.store, f.shop, 100).await;

        let mut closed = promo(10);
        closed.status = PromotionStatus::Close;
        let closed = f.promotions.create_promotion(f.shop, closed).await.unwrap();
        let err = redemption.redeem(f.shop, closed.id, customer, None).await;
        assert!(matches!(err, Err(AppError::PromotionClosed)));

        let mut restricted = promo(10);
        restricted.branch_ids = vec![f.branch];
        let restricted = f.promotions.create_promotion(f.shop, restricted).await.unwrap();
        let err = redemption.redeem(f.shop, restricted.id, customer, Some(Uuid::new_v4())).await;
        assert!(matches!(err, Err(AppError::BranchNotEligible)));

        redemption.redeem(f.shop, restricted.id, customer, Some(f.branch)).await.unwrap();
    }

    #[tokio::test]
    async fn promotion_branches_must_belong_to_the_shop() {
        let f = fixture().await;
        let mut input = promo(10);
        input.branch_ids = vec![Uuid::new_v4()];
        let err = f.promotions.create_promotion(f.shop, input).await;
        assert!(matches!(err, Err(AppError::BranchNotFound)));

        let err = f.promotions.create_promotion(f.shop, promo(-1)).await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn store_messages_about_points_are_classified() {
        let err = classify_failure(
            AppError::InternalServerError(anyhow::anyhow!("คะแนนไม่พอ")),
            50,
            10,
        );
        assert!(matches!(err, AppError::InsufficientPoints { required: 50, available: 10 }));

        let err = classify_failure(
            AppError::InternalServerError(anyhow::anyhow!("violates check constraint customers_total_points_check")),
            50,
            10,
        );
        assert!(matches!(err, AppError::InsufficientPoints { .. }));

        let err = classify_failure(AppError::InternalServerError(anyhow::anyhow!("connection reset")), 50, 10);
        assert!(matches!(err, AppError::RedemptionFailed(_)));
    }

    /// Store que segura o resgate até ser liberado, para simular um pedido em voo.
    struct SlowPromotions {
        inner: Arc<MemoryStore>,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PromotionStore for SlowPromotions {
        async fn list_promotions(&self, shop_id: Uuid) -> Result<Vec<Promotion>, AppError> {
            self.inner.list_promotions(shop_id).await
        }
        async fn find_promotion(&self, id: Uuid) -> Result<Option<Promotion>, AppError> {
            self.inner.find_promotion(id).await
        }
        async fn create_promotion(&self, new: NewPromotion) -> Result<Promotion, AppError> {
            self.inner.create_promotion(new).await
        }
        async fn update_promotion(&self, id: Uuid, changes: PromotionChanges) -> Result<Option<Promotion>, AppError> {
            self.inner.update_promotion(id, changes).await
        }
        async fn delete_promotion(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.delete_promotion(id).await
        }
        async fn redeem_promotion(&self, record: RedemptionRecord) -> Result<PromotionHistory, AppError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.redeem_promotion(record).await
        }
        async fn list_history(&self, shop_id: Uuid, customer_id: Option<Uuid>) -> Result<Vec<PromotionHistory>, AppError> {
            self.inner.list_history(shop_id, customer_id).await
        }
    }

    #[tokio::test]
    async fn second_redeem_while_pending_is_refused() {
        let f = fixture().await;
        let customer = customer_with(&f.store, f.shop, 100).await;
        let promotion = f.promotions.create_promotion(f.shop, promo(30)).await.unwrap();

        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let slow = Arc::new(SlowPromotions {
            inner: f.store.clone(),
            entered: entered.clone(),
            release: release.clone(),
        });
        let redemption = RedemptionService::new(slow, f.store.clone());

        let first = tokio::spawn({
            let redemption = redemption.clone();
            let shop = f.shop;
            let promotion_id = promotion.id;
            async move { redemption.redeem(shop, promotion_id, customer, None).await }
        });
        entered.notified().await;

        // Em voo: o segundo pedido volta sem tocar no saldo
        assert!(redemption.is_pending(customer, promotion.id));
        let err = redemption.redeem(f.shop, promotion.id, customer, None).await;
        assert!(matches!(err, Err(AppError::RedemptionInProgress)));
        let eligibility = redemption.eligibility(f.shop, promotion.id, customer, None).await.unwrap();
        assert!(eligibility.pending);
        assert!(!eligibility.can_redeem);
        assert_eq!(f.store.customer_points(customer).await.unwrap(), Some(100));

        release.notify_one();
        let receipt = first.await.unwrap().unwrap();
        assert_eq!(receipt.remaining_points, 70);
        assert!(!redemption.is_pending(customer, promotion.id));
    }
}
