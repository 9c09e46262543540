// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::Session, i18n::Locale},
    models::admin::AdminLevel,
};

/// 1. O Trait que define o nível mínimo exigido
pub trait LevelDef: Send + Sync + 'static {
    fn level() -> AdminLevel;
}

/// 2. O Extractor (Guardião)
pub struct RequireLevel<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireLevel<T>
where
    T: LevelDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = Session::from_request_parts(parts, state).await?;

        if session.level < T::level() {
            let locale = Locale::from_headers(&parts.headers);
            tracing::warn!(
                admin = %session.admin_id,
                required = T::level().as_str(),
                "Acesso negado por nível"
            );
            return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireLevel(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS NÍVEIS (TIPOS)
// ---

pub struct Superadmin;
impl LevelDef for Superadmin {
    fn level() -> AdminLevel { AdminLevel::Superadmin }
}
