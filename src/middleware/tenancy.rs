// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::Session, i18n::Locale},
};

// Os nomes dos nossos cabeçalhos HTTP customizados
const SHOP_ID_HEADER: &str = "x-shop-id";
const BRANCH_ID_HEADER: &str = "x-branch-id";

/// Loja (e filial, se houver) em que a requisição opera.
#[derive(Debug, Clone)]
pub struct ShopScope {
    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub session: Session,
}

impl ShopScope {
    pub fn is_superadmin(&self) -> bool {
        self.session.is_superadmin()
    }

    /// Resolve o escopo a partir da sessão e dos cabeçalhos opcionais.
    /// Admin comum fica preso à própria loja; superadmin escolhe via `x-shop-id`.
    pub fn resolve(
        session: Session,
        shop_header: Option<&str>,
        branch_header: Option<&str>,
    ) -> Result<Self, AppError> {
        let requested_shop = shop_header
            .map(|value| Uuid::parse_str(value.trim()).map_err(|_| AppError::InvalidHeader(SHOP_ID_HEADER)))
            .transpose()?;

        let shop_id = match (session.is_superadmin(), requested_shop, session.shop_id) {
            (true, Some(requested), _) => requested,
            (_, None, Some(own)) => own,
            (false, Some(requested), Some(own)) if requested == own => own,
            (false, Some(_), Some(_)) => return Err(AppError::Forbidden),
            (_, _, None) => return Err(AppError::MissingShopContext),
        };

        let branch_id = match branch_header {
            Some(value) => Some(
                Uuid::parse_str(value.trim()).map_err(|_| AppError::InvalidHeader(BRANCH_ID_HEADER))?,
            ),
            // A filial do token só vale se o escopo continua na loja do token
            None if session.shop_id == Some(shop_id) => session.branch_id,
            None => None,
        };

        Ok(Self { shop_id, branch_id, session })
    }
}

impl<S> FromRequestParts<S> for ShopScope
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        // A. Sessão (colocada pelo auth_guard)
        let session = Session::from_request_parts(parts, state).await?;

        // B. Cabeçalhos opcionais + resolução
        let branch_header = header_value(parts, BRANCH_ID_HEADER)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
        let scope = header_value(parts, SHOP_ID_HEADER)
            .and_then(|shop_header| ShopScope::resolve(session, shop_header, branch_header))
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        // C. Filial pedida no cabeçalho precisa ser da loja resolvida
        if let (Some(_), Some(branch_id)) = (branch_header, scope.branch_id) {
            app_state
                .store_service
                .branch_in_shop(scope.shop_id, branch_id)
                .await
                .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
        }

        Ok(scope)
    }
}

fn header_value<'a>(parts: &'a Parts, name: &'static str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| value.to_str().map_err(|_| AppError::InvalidHeader(name)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::admin::AdminLevel;

    fn session(level: AdminLevel, shop_id: Option<Uuid>, branch_id: Option<Uuid>) -> Session {
        Session {
            admin_id: Uuid::new_v4(),
            username: "tester".into(),
            level,
            shop_id,
            branch_id,
        }
    }

    #[test]
    fn admin_is_pinned_to_own_shop() {
        let own = Uuid::new_v4();
        let scope = ShopScope::resolve(session(AdminLevel::Admin, Some(own), None), None, None).unwrap();
        assert_eq!(scope.shop_id, own);

        let other = Uuid::new_v4().to_string();
        let err = ShopScope::resolve(session(AdminLevel::Admin, Some(own), None), Some(&other), None);
        assert!(matches!(err, Err(AppError::Forbidden)));
    }

    #[test]
    fn superadmin_selects_shop_by_header() {
        let target = Uuid::new_v4();
        let target_str = target.to_string();
        let scope =
            ShopScope::resolve(session(AdminLevel::Superadmin, None, None), Some(&target_str), None).unwrap();
        assert_eq!(scope.shop_id, target);

        let err = ShopScope::resolve(session(AdminLevel::Superadmin, None, None), None, None);
        assert!(matches!(err, Err(AppError::MissingShopContext)));
    }

    #[test]
    fn branch_comes_from_header_or_token() {
        let shop = Uuid::new_v4();
        let token_branch = Uuid::new_v4();
        let scope =
            ShopScope::resolve(session(AdminLevel::Admin, Some(shop), Some(token_branch)), None, None).unwrap();
        assert_eq!(scope.branch_id, Some(token_branch));

        let header_branch = Uuid::new_v4();
        let header_str = header_branch.to_string();
        let scope = ShopScope::resolve(
            session(AdminLevel::Admin, Some(shop), Some(token_branch)),
            None,
            Some(&header_str),
        )
        .unwrap();
        assert_eq!(scope.branch_id, Some(header_branch));

        let err = ShopScope::resolve(session(AdminLevel::Admin, Some(shop), None), None, Some("nope"));
        assert!(matches!(err, Err(AppError::InvalidHeader(_))));
    }
}
