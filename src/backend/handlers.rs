use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::{
    Category, CategoryDeletion, Expense, ExpenseFilter, NewCategory, NewExpense, Profile,
    UpdateCategory, UpdateExpense, UpdateProfile,
};
use crate::error::AppResult;
use crate::identity::Owner;
use crate::stats::{self, Summary};

// ============= Profile =============

pub async fn get_profile(State(state): State<AppState>, owner: Owner) -> AppResult<Json<Profile>> {
    Ok(Json(queries::load_profile(&state.db, &owner).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    owner: Owner,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<Profile>> {
    Ok(Json(queries::update_currency(&state.db, &owner, &payload.currency).await?))
}

// ============= Categories =============

pub async fn list_categories(State(state): State<AppState>, owner: Owner) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(queries::list_categories(&state.db, &owner).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    owner: Owner,
    Json(payload): Json<NewCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = queries::create_category(&state.db, &owner, &payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategory>,
) -> AppResult<Json<Category>> {
    payload.validate()?;
    Ok(Json(queries::update_category(&state.db, &owner, id, &payload).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> AppResult<Json<CategoryDeletion>> {
    Ok(Json(queries::delete_category(&state.db, &owner, id).await?))
}

// ============= Expenses =============

pub async fn list_expenses(
    State(state): State<AppState>,
    owner: Owner,
    Query(filter): Query<ExpenseFilter>,
) -> AppResult<Json<Vec<Expense>>> {
    Ok(Json(queries::list_expenses(&state.db, &owner, &filter).await?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> AppResult<Json<Expense>> {
    Ok(Json(queries::get_expense(&state.db, &owner, id).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    owner: Owner,
    Json(payload): Json<NewExpense>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let expense = queries::create_expense(&state.db, &owner, &payload).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExpense>,
) -> AppResult<Json<Expense>> {
    Ok(Json(queries::update_expense(&state.db, &owner, id, &payload).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    queries::delete_expense(&state.db, &owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============= Summary =============

pub async fn summary(State(state): State<AppState>, owner: Owner) -> AppResult<Json<Summary>> {
    let categories = queries::list_categories(&state.db, &owner).await?;
    let expenses = queries::list_expenses(&state.db, &owner, &ExpenseFilter::default()).await?;
    let today = chrono::Utc::now().date_naive();
    Ok(Json(stats::summarize(&expenses, &categories, today)))
}
