use sqlx::{Pool, QueryBuilder, Sqlite, SqliteExecutor};

use crate::database::db::provision;
use crate::database::models::{
    Category, CategoryDeletion, Currency, Expense, ExpenseFilter, NewCategory, NewExpense, Profile,
    UpdateCategory, UpdateExpense,
};
use crate::error::{AppError, AppResult};
use crate::identity::Owner;

/*
Owner-scoped CRUD for profiles, categories and expenses.

Every statement binds the caller's verified identity into its `user_id`
predicate; nothing here accepts an owner from request data. When an
id-addressed statement matches no row, `missing_row` tells "someone else's"
apart from "does not exist".
 */

const PROFILE_COLUMNS: &str = "id, user_id, currency, currency_symbol, created_at";
const CATEGORY_COLUMNS: &str = "id, user_id, name, color, icon, is_default, created_at";
const EXPENSE_COLUMNS: &str = "id, user_id, category_id, amount, description, date, created_at";

/// Read-then-write transactions must hold the write lock from the start: a
/// deferred one cannot upgrade while another connection writes, and SQLite
/// fails that upgrade with SQLITE_BUSY instead of waiting.
pub(crate) const WRITE_TRANSACTION: &str = "BEGIN IMMEDIATE";

#[derive(Debug, Clone, Copy)]
enum OwnedTable {
    Categories,
    Expenses,
}

impl OwnedTable {
    fn name(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Expenses => "expenses",
        }
    }
}

async fn missing_row<'e, E>(executor: E, table: OwnedTable, id: i64) -> AppError
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table.name());
    match sqlx::query_scalar::<_, i64>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
    {
        Ok(Some(_)) => AppError::AuthorizationDenied,
        Ok(None) => AppError::NotFound,
        Err(err) => err.into(),
    }
}

/// A category id may only be referenced by its owner. Absent ids are left
/// to the foreign key.
async fn check_category_access(pool: &Pool<Sqlite>, owner: &Owner, category_id: i64) -> AppResult<()> {
    let category_owner: Option<String> =
        sqlx::query_scalar("SELECT user_id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(pool)
            .await?;
    match category_owner {
        Some(user_id) if user_id != owner.as_str() => Err(AppError::AuthorizationDenied),
        _ => Ok(()),
    }
}

/*==========Profile Queries=========== */

pub async fn get_profile(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?");
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(owner.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(profile)
}

/// Profile read that provisions on a miss.
pub async fn load_profile(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<Profile> {
    if let Some(profile) = get_profile(pool, owner).await? {
        return Ok(profile);
    }

    tracing::info!(user = %owner.as_str(), "profile missing, provisioning");
    provision::ensure_provisioned(pool, owner).await?;
    get_profile(pool, owner).await?.ok_or(AppError::NotFound)
}

pub async fn update_currency(pool: &Pool<Sqlite>, owner: &Owner, code: &str) -> AppResult<Profile> {
    let currency = Currency::find(code)
        .ok_or_else(|| AppError::InvalidInput(format!("unsupported currency: {code}")))?;

    load_profile(pool, owner).await?;

    let sql = format!(
        "UPDATE profiles SET currency = ?, currency_symbol = ? WHERE user_id = ? RETURNING {PROFILE_COLUMNS}"
    );
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(currency.code)
        .bind(currency.symbol)
        .bind(owner.as_str())
        .fetch_one(pool)
        .await?;

    tracing::debug!(user = %owner.as_str(), currency = currency.code, "currency changed");
    Ok(profile)
}

/*==========Category Queries=========== */

/// Default first, then by name.
pub async fn list_categories(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<Vec<Category>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = ? ORDER BY is_default DESC, name COLLATE NOCASE ASC"
    );
    let categories = sqlx::query_as::<_, Category>(&sql)
        .bind(owner.as_str())
        .fetch_all(pool)
        .await?;
    Ok(categories)
}

pub async fn get_category(pool: &Pool<Sqlite>, owner: &Owner, category_id: i64) -> AppResult<Category> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ? AND user_id = ?");
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(category_id)
        .bind(owner.as_str())
        .fetch_optional(pool)
        .await?;

    match category {
        Some(category) => Ok(category),
        None => Err(missing_row(pool, OwnedTable::Categories, category_id).await),
    }
}

/// Creating the first category of an owner with none also restores the
/// default, so the owner never holds categories without one.
pub async fn create_category(pool: &Pool<Sqlite>, owner: &Owner, new: &NewCategory) -> AppResult<Category> {
    let mut tx = pool.begin_with(WRITE_TRANSACTION).await?;

    if !new.is_default {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE user_id = ?")
            .bind(owner.as_str())
            .fetch_one(&mut *tx)
            .await?;
        if existing == 0 {
            provision::ensure_default_category(&mut tx, owner, None).await?;
        }
    }

    let sql = format!(
        r#"
        INSERT INTO categories (user_id, name, color, icon, is_default)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(owner.as_str())
        .bind(new.name.trim())
        .bind(&new.color)
        .bind(&new.icon)
        .bind(new.is_default)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(user = %owner.as_str(), id = category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn update_category(
    pool: &Pool<Sqlite>,
    owner: &Owner,
    category_id: i64,
    changes: &UpdateCategory,
) -> AppResult<Category> {
    let sql = format!(
        r#"
        UPDATE categories
        SET name = COALESCE(?, name),
            color = COALESCE(?, color),
            icon = COALESCE(?, icon)
        WHERE id = ? AND user_id = ?
        RETURNING {CATEGORY_COLUMNS}
        "#
    );
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.color.as_deref())
        .bind(changes.icon.as_deref())
        .bind(category_id)
        .bind(owner.as_str())
        .fetch_optional(pool)
        .await?;

    match category {
        Some(category) => Ok(category),
        None => Err(missing_row(pool, OwnedTable::Categories, category_id).await),
    }
}

/* Deleting a category.
The default category is refused. Otherwise, in one transaction: find (or
repair) the owner's default, then delete; the BEFORE DELETE trigger re-points
the category's expenses at the default inside the same statement. The write
lock is taken up front so concurrent deletes queue on the busy timeout. */
pub async fn delete_category(
    pool: &Pool<Sqlite>,
    owner: &Owner,
    category_id: i64,
) -> AppResult<CategoryDeletion> {
    let mut tx = pool.begin_with(WRITE_TRANSACTION).await?;

    let target: Option<bool> =
        sqlx::query_scalar("SELECT is_default FROM categories WHERE id = ? AND user_id = ?")
            .bind(category_id)
            .bind(owner.as_str())
            .fetch_optional(&mut *tx)
            .await?;

    match target {
        None => return Err(missing_row(&mut *tx, OwnedTable::Categories, category_id).await),
        Some(true) => return Err(AppError::DefaultCategoryProtected),
        Some(false) => {}
    }

    let default_id = provision::ensure_default_category(&mut tx, owner, Some(category_id)).await?;

    let reassigned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE category_id = ? AND user_id = ?")
            .bind(category_id)
            .bind(owner.as_str())
            .fetch_one(&mut *tx)
            .await?;

    let deleted = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ? AND is_default = 0")
        .bind(category_id)
        .bind(owner.as_str())
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    tx.commit().await?;

    tracing::info!(
        user = %owner.as_str(),
        category_id,
        default_id,
        reassigned,
        "category deleted"
    );
    Ok(CategoryDeletion {
        deleted_id: category_id,
        reassigned_to: default_id,
        reassigned_expenses: reassigned as u64,
    })
}

/*==========Expense Queries=========== */

/// Newest first. Filters are optional and combine with AND.
pub async fn list_expenses(
    pool: &Pool<Sqlite>,
    owner: &Owner,
    filter: &ExpenseFilter,
) -> AppResult<Vec<Expense>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE user_id = "));
    builder.push_bind(owner.as_str());

    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND date <= ").push_bind(to);
    }
    builder.push(" ORDER BY date DESC, created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ").push_bind(limit.max(0));
    }

    let expenses = builder.build_query_as::<Expense>().fetch_all(pool).await?;
    Ok(expenses)
}

pub async fn get_expense(pool: &Pool<Sqlite>, owner: &Owner, expense_id: i64) -> AppResult<Expense> {
    let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ? AND user_id = ?");
    let expense = sqlx::query_as::<_, Expense>(&sql)
        .bind(expense_id)
        .bind(owner.as_str())
        .fetch_optional(pool)
        .await?;

    match expense {
        Some(expense) => Ok(expense),
        None => Err(missing_row(pool, OwnedTable::Expenses, expense_id).await),
    }
}

pub async fn create_expense(pool: &Pool<Sqlite>, owner: &Owner, new: &NewExpense) -> AppResult<Expense> {
    new.validate()?;
    check_category_access(pool, owner, new.category_id).await?;

    let sql = format!(
        r#"
        INSERT INTO expenses (user_id, category_id, amount, description, date)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {EXPENSE_COLUMNS}
        "#
    );
    let expense = sqlx::query_as::<_, Expense>(&sql)
        .bind(owner.as_str())
        .bind(new.category_id)
        .bind(new.amount.to_string())
        .bind(new.description.trim())
        .bind(new.date)
        .fetch_one(pool)
        .await?;

    tracing::debug!(user = %owner.as_str(), id = expense.id, amount = %expense.amount, "expense created");
    Ok(expense)
}

pub async fn update_expense(
    pool: &Pool<Sqlite>,
    owner: &Owner,
    expense_id: i64,
    changes: &UpdateExpense,
) -> AppResult<Expense> {
    changes.validate()?;
    if let Some(category_id) = changes.category_id {
        check_category_access(pool, owner, category_id).await?;
    }

    let sql = format!(
        r#"
        UPDATE expenses
        SET category_id = COALESCE(?, category_id),
            amount = COALESCE(?, amount),
            description = COALESCE(?, description),
            date = COALESCE(?, date)
        WHERE id = ? AND user_id = ?
        RETURNING {EXPENSE_COLUMNS}
        "#
    );
    let expense = sqlx::query_as::<_, Expense>(&sql)
        .bind(changes.category_id)
        .bind(changes.amount.map(|a| a.to_string()))
        .bind(changes.description.as_deref().map(str::trim))
        .bind(changes.date)
        .bind(expense_id)
        .bind(owner.as_str())
        .fetch_optional(pool)
        .await?;

    match expense {
        Some(expense) => Ok(expense),
        None => Err(missing_row(pool, OwnedTable::Expenses, expense_id).await),
    }
}

pub async fn delete_expense(pool: &Pool<Sqlite>, owner: &Owner, expense_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND user_id = ?")
        .bind(expense_id)
        .bind(owner.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(missing_row(pool, OwnedTable::Expenses, expense_id).await);
    }
    tracing::debug!(user = %owner.as_str(), id = expense_id, "expense deleted");
    Ok(())
}
