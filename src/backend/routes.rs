use axum::{
    routing::{get, put},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/api/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/api/expenses/:id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        .route("/api/summary", get(handlers::summary))
}
