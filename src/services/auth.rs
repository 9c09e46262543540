// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AdminStore,
    middleware::auth::Session,
    models::{
        admin::Admin,
        auth::{AuthResponse, Claims},
    },
};

/// Gera o hash da senha fora do runtime assíncrono.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

#[derive(Clone)]
pub struct AuthService {
    admins: Arc<dyn AdminStore>,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(admins: Arc<dyn AdminStore>, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self { admins, jwt_secret, token_ttl_hours }
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        branch_id: Option<Uuid>,
    ) -> Result<AuthResponse, AppError> {
        let admin = self
            .admins
            .find_admin_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = admin.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!(username = %admin.username, "Tentativa de login com senha inválida");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&admin, branch_id)?;
        tracing::info!(admin = %admin.id, level = admin.level.as_str(), "🔑 Login efetuado");

        Ok(AuthResponse { token, admin })
    }

    /// Decodifica o JWT e recarrega o admin: quem foi removido perde o acesso na hora.
    pub async fn validate_token(&self, token: &str) -> Result<Session, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let claims = token_data.claims;
        let admin = self
            .admins
            .find_admin(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        // A filial do token só vale enquanto o admin continua na mesma loja
        let branch_id = if admin.shop_id == claims.shop_id { claims.branch_id } else { None };

        Ok(Session {
            admin_id: admin.id,
            username: admin.username,
            level: admin.level,
            shop_id: admin.shop_id,
            branch_id,
        })
    }

    pub fn create_token(&self, admin: &Admin, branch_id: Option<Uuid>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.token_ttl_hours);

        let claims = Claims {
            sub: admin.id,
            level: admin.level,
            shop_id: admin.shop_id,
            branch_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        models::admin::{AdminLevel, NewAdmin},
    };

    async fn service_with_admin() -> (AuthService, Admin) {
        let store = Arc::new(MemoryStore::new());
        let admin = store
            .create_admin(NewAdmin {
                first_name: "Somchai".into(),
                last_name: "Jaidee".into(),
                username: "somchai".into(),
                password_hash: hash_password("secret123", 4).await.unwrap(),
                level: AdminLevel::Admin,
                shop_id: Some(Uuid::new_v4()),
            })
            .await
            .unwrap();
        (AuthService::new(store, "test-secret".into(), 1), admin)
    }

    #[tokio::test]
    async fn login_issues_token_that_validates_to_session() {
        let (service, admin) = service_with_admin().await;
        let branch = Uuid::new_v4();

        let response = service.login("somchai", "secret123", Some(branch)).await.unwrap();
        assert_eq!(response.admin.id, admin.id);

        let session = service.validate_token(&response.token).await.unwrap();
        assert_eq!(session.admin_id, admin.id);
        assert_eq!(session.shop_id, admin.shop_id);
        assert_eq!(session.branch_id, Some(branch));
    }

    #[tokio::test]
    async fn wrong_password_and_garbage_tokens_are_rejected() {
        let (service, _) = service_with_admin().await;

        let err = service.login("somchai", "wrong-password", None).await;
        assert!(matches!(err, Err(AppError::InvalidCredentials)));

        let err = service.login("nobody", "secret123", None).await;
        assert!(matches!(err, Err(AppError::InvalidCredentials)));

        let err = service.validate_token("not-a-jwt").await;
        assert!(matches!(err, Err(AppError::InvalidToken)));
    }
}
