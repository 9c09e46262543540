// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// Planilhas de importação podem passar do limite padrão de 2MB
const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let admin_routes = Router::new()
        .route(
            "/",
            post(handlers::admins::create_admin).get(handlers::admins::list_admins),
        )
        .route(
            "/{id}",
            get(handlers::admins::get_admin)
                .put(handlers::admins::update_admin)
                .delete(handlers::admins::delete_admin),
        );

    let customer_routes = Router::new()
        .route(
            "/",
            post(handlers::customers::create_customer).get(handlers::customers::list_customers),
        )
        .route("/check-phone", get(handlers::customers::check_phone))
        .route(
            "/import",
            post(handlers::transfer::import_customers).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/export", get(handlers::transfer::export_customers))
        .route("/import-template", get(handlers::transfer::import_template))
        .route(
            "/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/{id}/points",
            get(handlers::customers::get_points).post(handlers::customers::adjust_points),
        )
        .route("/{id}/checkin", post(handlers::customers::checkin))
        .route(
            "/{id}/custom-values",
            get(handlers::customers::get_custom_values).put(handlers::customers::put_custom_values),
        );

    let promotion_routes = Router::new()
        .route(
            "/",
            post(handlers::promotions::create_promotion).get(handlers::promotions::list_promotions),
        )
        .route(
            "/{id}",
            get(handlers::promotions::get_promotion)
                .put(handlers::promotions::update_promotion)
                .delete(handlers::promotions::delete_promotion),
        )
        .route("/{id}/redeem", post(handlers::promotions::redeem_promotion))
        .route("/{id}/eligibility", get(handlers::promotions::get_eligibility));

    // Tudo aqui passa pelo auth_guard
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route(
            "/stores",
            post(handlers::stores::create_store).get(handlers::stores::list_stores),
        )
        .route(
            "/branches",
            post(handlers::stores::create_branch).get(handlers::stores::list_branches),
        )
        .route(
            "/custom-fields",
            post(handlers::custom_fields::create_field).get(handlers::custom_fields::list_fields),
        )
        .route("/custom-fields/{id}", delete(handlers::custom_fields::delete_field))
        .route("/promotion-history", get(handlers::promotions::list_history))
        .nest("/admins", admin_routes)
        .nest("/customers", customer_routes)
        .nest("/promotions", promotion_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{config::AppConfig, db::Stores};

    struct TestApp {
        router: Router,
        token: String,
        shop_id: String,
    }

    async fn setup() -> TestApp {
        let state = AppState::from_stores(AppConfig::for_tests(), Stores::memory()).unwrap();
        state
            .admin_service
            .ensure_bootstrap_admin("root", "secret123")
            .await
            .unwrap();
        let store = state.store_service.create_store("Coffee Lab").await.unwrap();
        let router = build_router(state);

        let (status, body) = send(
            &router,
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "username": "root", "password": "secret123" }).to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        TestApp {
            router,
            token: body["token"].as_str().unwrap().to_string(),
            shop_id: store.id.to_string(),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    impl TestApp {
        fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
                .header("x-shop-id", &self.shop_id);
            match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            }
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = setup().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let app = setup().await;
        let (status, _) = send(
            &app.router,
            Request::get("/api/customers").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app.router, app.request("GET", "/api/auth/me", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"]["username"], "root");
    }

    #[tokio::test]
    async fn duplicate_phone_is_a_conflict() {
        let app = setup().await;
        let customer = json!({ "name": "Somchai", "phone": "081-234-5678" });

        let (status, body) = send(&app.router, app.request("POST", "/api/customers", Some(customer.clone()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["phone"], "0812345678");

        let (status, _) = send(&app.router, app.request("POST", "/api/customers", Some(customer))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app.router,
            app.request("GET", "/api/customers/check-phone?phone=0812345678", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], false);
    }

    #[tokio::test]
    async fn redemption_with_too_few_points_is_rejected_in_thai() {
        let app = setup().await;

        let (_, customer) = send(
            &app.router,
            app.request(
                "POST",
                "/api/customers",
                Some(json!({ "name": "Malee", "phone": "0899999999", "total_points": 10 })),
            ),
        )
        .await;
        let (status, promotion) = send(
            &app.router,
            app.request("POST", "/api/promotions", Some(json!({ "name": "Free latte", "points": 50 }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut request = app.request(
            "POST",
            &format!("/api/promotions/{}/redeem", promotion["id"].as_str().unwrap()),
            Some(json!({ "customerId": customer["id"] })),
        );
        request
            .headers_mut()
            .insert(header::ACCEPT_LANGUAGE, "th-TH".parse().unwrap());

        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("คะแนนไม่เพียงพอ"));

        let (_, points) = send(
            &app.router,
            app.request("GET", &format!("/api/customers/{}/points", customer["id"].as_str().unwrap()), None),
        )
        .await;
        assert_eq!(points["total_points"], 10);
    }

    #[tokio::test]
    async fn branch_header_must_belong_to_the_selected_shop() {
        let app = setup().await;
        let (status, branch) = send(
            &app.router,
            app.request("POST", "/api/branches", Some(json!({ "name": "Siam" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let mut request = app.request("GET", "/api/customers", None);
        request
            .headers_mut()
            .insert("x-branch-id", branch["id"].as_str().unwrap().parse().unwrap());
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);

        let mut request = app.request("GET", "/api/customers", None);
        request
            .headers_mut()
            .insert("x-branch-id", uuid::Uuid::new_v4().to_string().parse().unwrap());
        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_returns_an_xlsx_attachment() {
        let app = setup().await;
        let response = app
            .router
            .clone()
            .oneshot(app.request("GET", "/api/customers/export", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::services::transfer_service::XLSX_CONTENT_TYPE
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        // Arquivos .xlsx são zip: começam com "PK"
        assert!(bytes.starts_with(b"PK"));
    }
}
