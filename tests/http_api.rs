//! HTTP-level tests for the JSON API: bearer-token identity, first-request
//! provisioning, the category lifecycle and the error contract.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use expense_tracker::backend::{build_router, AppState};
use expense_tracker::database::db::{connection, migrate};
use expense_tracker::IdentityVerifier;

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

struct TestApp {
    router: Router,
    verifier: IdentityVerifier,
}

impl TestApp {
    async fn new() -> Self {
        let pool = connection::memory_pool().await.expect("open in-memory database");
        migrate::run_migrations(&pool).await.expect("apply migrations");
        let verifier = IdentityVerifier::new(TEST_JWT_SECRET);
        Self {
            router: build_router(AppState::new(pool, verifier.clone())),
            verifier,
        }
    }

    fn token(&self) -> String {
        self.verifier
            .issue(Uuid::new_v4(), Duration::hours(1))
            .expect("issue token")
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn categories(&self, token: &str) -> Vec<Value> {
        let (status, body) = self.call(Method::GET, "/api/categories", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().cloned().unwrap()
    }
}

fn find<'a>(categories: &'a [Value], name: &str) -> &'a Value {
    categories.iter().find(|c| c["name"] == name).unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_forged_token_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let forged = IdentityVerifier::new(b"some-other-secret")
        .issue(Uuid::new_v4(), Duration::hours(1))
        .unwrap();
    let (status, _) = app.call(Method::GET, "/api/profile", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_request_provisions_profile_and_categories() {
    let app = TestApp::new().await;
    let token = app.token();

    let (status, profile) = app.call(Method::GET, "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["currency"], "USD");
    assert_eq!(profile["currency_symbol"], "$");

    let categories = app.categories(&token).await;
    let defaults: Vec<_> = categories.iter().filter(|c| c["is_default"] == true).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["name"], "General");
    assert_eq!(categories[0]["is_default"], true);
}

#[tokio::test]
async fn deleting_a_category_moves_its_expenses_to_the_default() {
    let app = TestApp::new().await;
    let token = app.token();
    let categories = app.categories(&token).await;
    let food = find(&categories, "Food & Dining")["id"].as_i64().unwrap();
    let general = find(&categories, "General")["id"].as_i64().unwrap();

    let (status, expense) = app
        .call(
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({ "category_id": food, "amount": "12.50", "description": "lunch", "date": "2025-06-02" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["amount"], "12.50");

    let (status, outcome) = app
        .call(Method::DELETE, &format!("/api/categories/{food}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["reassigned_to"], general);
    assert_eq!(outcome["reassigned_expenses"], 1);

    let uri = format!("/api/expenses/{}", expense["id"]);
    let (status, moved) = app.call(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["category_id"], general);
}

#[tokio::test]
async fn default_category_cannot_be_deleted() {
    let app = TestApp::new().await;
    let token = app.token();
    let categories = app.categories(&token).await;
    let general = find(&categories, "General")["id"].as_i64().unwrap();

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/categories/{general}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "default_category_protected");
    assert_eq!(app.categories(&token).await.len(), categories.len());
}

#[tokio::test]
async fn other_users_rows_are_off_limits() {
    let app = TestApp::new().await;
    let alice = app.token();
    let bob = app.token();

    let food = find(&app.categories(&alice).await, "Food & Dining")["id"].as_i64().unwrap();
    let (_, expense) = app
        .call(
            Method::POST,
            "/api/expenses",
            Some(&alice),
            Some(json!({ "category_id": food, "amount": "3", "date": "2025-06-02" })),
        )
        .await;
    let uri = format!("/api/expenses/{}", expense["id"]);

    let (status, body) = app.call(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "authorization_denied");

    let (status, _) = app.call(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, bobs) = app.call(Method::GET, "/api/expenses", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bobs, json!([]));

    let (status, _) = app.call(Method::GET, "/api/expenses/999999", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_positive_amounts_are_unprocessable() {
    let app = TestApp::new().await;
    let token = app.token();
    let general = find(&app.categories(&token).await, "General")["id"].as_i64().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({ "category_id": general, "amount": "0", "date": "2025-06-02" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/expenses",
            Some(&token),
            Some(json!({ "category_id": general, "amount": "79228162514264337593543950335", "date": "2025-06-02" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, summary) = app.call(Method::GET, "/api/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["expense_count"], 0);
}

#[tokio::test]
async fn currency_update_and_summary() {
    let app = TestApp::new().await;
    let token = app.token();

    let (status, profile) = app
        .call(Method::PUT, "/api/profile", Some(&token), Some(json!({ "currency": "EUR" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["currency_symbol"], "€");

    let (status, _) = app
        .call(Method::PUT, "/api/profile", Some(&token), Some(json!({ "currency": "XYZ" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, summary) = app.call(Method::GET, "/api/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["expense_count"], 0);
    assert_eq!(summary["trend"].as_array().unwrap().len(), 6);
}
