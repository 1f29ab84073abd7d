//! Data-access layer for the terminal UI. Each method is one storage round
//! trip for one user intent; `App` refreshes its view state from the results.

use sqlx::{Pool, Sqlite};

use crate::database::db::queries;
use crate::database::models::{
    Category, CategoryDeletion, Expense, ExpenseFilter, NewCategory, NewExpense, Profile,
    UpdateCategory, UpdateExpense,
};
use crate::error::AppResult;
use crate::identity::Owner;

#[derive(Clone)]
pub struct Client {
    pool: Pool<Sqlite>,
    owner: Owner,
}

impl Client {
    pub fn new(pool: Pool<Sqlite>, owner: Owner) -> Self {
        Self { pool, owner }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    // ============= Profile =============

    pub async fn profile(&self) -> AppResult<Profile> {
        queries::load_profile(&self.pool, &self.owner).await
    }

    pub async fn set_currency(&self, code: &str) -> AppResult<Profile> {
        queries::update_currency(&self.pool, &self.owner, code).await
    }

    // ============= Categories =============

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        queries::list_categories(&self.pool, &self.owner).await
    }

    pub async fn create_category(&self, new: &NewCategory) -> AppResult<Category> {
        new.validate()?;
        queries::create_category(&self.pool, &self.owner, new).await
    }

    pub async fn update_category(&self, id: i64, changes: &UpdateCategory) -> AppResult<Category> {
        changes.validate()?;
        queries::update_category(&self.pool, &self.owner, id, changes).await
    }

    pub async fn delete_category(&self, id: i64) -> AppResult<CategoryDeletion> {
        queries::delete_category(&self.pool, &self.owner, id).await
    }

    // ============= Expenses =============

    pub async fn expenses(&self) -> AppResult<Vec<Expense>> {
        queries::list_expenses(&self.pool, &self.owner, &ExpenseFilter::default()).await
    }

    pub async fn create_expense(&self, new: &NewExpense) -> AppResult<Expense> {
        queries::create_expense(&self.pool, &self.owner, new).await
    }

    pub async fn update_expense(&self, id: i64, changes: &UpdateExpense) -> AppResult<Expense> {
        queries::update_expense(&self.pool, &self.owner, id, changes).await
    }

    pub async fn delete_expense(&self, id: i64) -> AppResult<()> {
        queries::delete_expense(&self.pool, &self.owner, id).await
    }
}
