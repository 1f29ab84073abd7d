//! New-identity provisioning: one profile and the starter category set.
//!
//! Everything here is idempotent. Running it twice, or concurrently, leaves
//! exactly one profile and one default category per user: the transaction
//! holds SQLite's write lock from its first statement, so the empty-set check
//! and the starter insert cannot interleave with another session.

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::database::db::queries::WRITE_TRANSACTION;
use crate::error::AppResult;
use crate::identity::Owner;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";
pub const DEFAULT_CATEGORY_NAME: &str = "General";

pub struct StarterCategory {
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub is_default: bool,
}

pub const STARTER_CATEGORIES: &[StarterCategory] = &[
    StarterCategory { name: DEFAULT_CATEGORY_NAME, color: "#64748b", icon: "tag", is_default: true },
    StarterCategory { name: "Food & Dining", color: "#f97316", icon: "utensils", is_default: false },
    StarterCategory { name: "Transportation", color: "#3b82f6", icon: "car", is_default: false },
    StarterCategory { name: "Shopping", color: "#ec4899", icon: "shopping-bag", is_default: false },
    StarterCategory { name: "Entertainment", color: "#a855f7", icon: "film", is_default: false },
    StarterCategory { name: "Bills & Utilities", color: "#eab308", icon: "receipt", is_default: false },
    StarterCategory { name: "Health", color: "#22c55e", icon: "heart-pulse", is_default: false },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
    pub profile_created: bool,
    pub categories_created: u64,
}

pub async fn ensure_provisioned(pool: &Pool<Sqlite>, owner: &Owner) -> AppResult<Provisioned> {
    let mut tx = pool.begin_with(WRITE_TRANSACTION).await?;

    sqlx::query("INSERT OR IGNORE INTO identities (id) VALUES (?)")
        .bind(owner.as_str())
        .execute(&mut *tx)
        .await?;

    let profile = sqlx::query(
        r#"
        INSERT INTO profiles (user_id, currency, currency_symbol)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(owner.as_str())
    .bind(DEFAULT_CURRENCY)
    .bind(DEFAULT_CURRENCY_SYMBOL)
    .execute(&mut *tx)
    .await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE user_id = ?")
        .bind(owner.as_str())
        .fetch_one(&mut *tx)
        .await?;

    let categories_created = if existing == 0 {
        insert_starter_categories(&mut tx, owner).await?
    } else {
        ensure_default_category(&mut tx, owner, None).await?;
        0
    };

    tx.commit().await?;

    let outcome = Provisioned {
        profile_created: profile.rows_affected() > 0,
        categories_created,
    };
    tracing::debug!(user = %owner.as_str(), ?outcome, "provisioning finished");
    Ok(outcome)
}

async fn insert_starter_categories(conn: &mut SqliteConnection, owner: &Owner) -> AppResult<u64> {
    let mut builder =
        QueryBuilder::<Sqlite>::new("INSERT INTO categories (user_id, name, color, icon, is_default) ");
    builder.push_values(STARTER_CATEGORIES, |mut row, starter| {
        row.push_bind(owner.as_str())
            .push_bind(starter.name)
            .push_bind(starter.color)
            .push_bind(starter.icon)
            .push_bind(starter.is_default);
    });

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// Returns the owner's default category id, repairing a missing default
/// first: a category named "General" (other than `except`) is promoted,
/// otherwise a new default "General" is inserted.
pub(crate) async fn ensure_default_category(
    conn: &mut SqliteConnection,
    owner: &Owner,
    except: Option<i64>,
) -> AppResult<i64> {
    let current: Option<i64> =
        sqlx::query_scalar("SELECT id FROM categories WHERE user_id = ? AND is_default = 1")
            .bind(owner.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    if let Some(id) = current {
        return Ok(id);
    }

    tracing::warn!(user = %owner.as_str(), "no default category, repairing");

    let promotable: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM categories
        WHERE user_id = ? AND name = ? COLLATE NOCASE AND id IS NOT ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(owner.as_str())
    .bind(DEFAULT_CATEGORY_NAME)
    .bind(except)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = promotable {
        sqlx::query("UPDATE categories SET is_default = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner.as_str())
            .execute(&mut *conn)
            .await?;
        return Ok(id);
    }

    let starter = &STARTER_CATEGORIES[0];
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO categories (user_id, name, color, icon, is_default)
        VALUES (?, ?, ?, ?, 1)
        RETURNING id
        "#,
    )
    .bind(owner.as_str())
    .bind(starter.name)
    .bind(starter.color)
    .bind(starter.icon)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{queries, test_pool};
    use crate::identity::test_owner;

    #[tokio::test]
    async fn provisioning_creates_profile_and_one_default() {
        let pool = test_pool().await;
        let owner = test_owner();

        let first = ensure_provisioned(&pool, &owner).await.unwrap();
        assert!(first.profile_created);
        assert_eq!(first.categories_created, STARTER_CATEGORIES.len() as u64);

        let profile = queries::get_profile(&pool, &owner).await.unwrap().unwrap();
        assert_eq!(profile.currency, "USD");
        assert_eq!(profile.currency_symbol, "$");

        let categories = queries::list_categories(&pool, &owner).await.unwrap();
        let defaults: Vec<_> = categories.iter().filter(|c| c.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "General");
    }

    #[tokio::test]
    async fn provisioning_twice_is_a_no_op() {
        let pool = test_pool().await;
        let owner = test_owner();

        ensure_provisioned(&pool, &owner).await.unwrap();
        let second = ensure_provisioned(&pool, &owner).await.unwrap();
        assert_eq!(second, Provisioned::default());

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = ?")
            .bind(owner.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(profiles, 1);
        let categories = queries::list_categories(&pool, &owner).await.unwrap();
        assert_eq!(categories.len(), STARTER_CATEGORIES.len());
    }

    #[test]
    fn starter_set_has_one_default() {
        assert_eq!(STARTER_CATEGORIES.iter().filter(|c| c.is_default).count(), 1);
        assert_eq!(STARTER_CATEGORIES[0].name, DEFAULT_CATEGORY_NAME);
    }

    #[tokio::test]
    async fn missing_default_is_repaired_by_promoting_general() {
        let pool = test_pool().await;
        let owner = test_owner();
        ensure_provisioned(&pool, &owner).await.unwrap();

        // Out-of-band damage: drop the flag underneath the trigger.
        sqlx::query("DROP TRIGGER categories_keep_default_flag")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE categories SET is_default = 0 WHERE user_id = ?")
            .bind(owner.as_str())
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let id = ensure_default_category(&mut conn, &owner, None).await.unwrap();
        drop(conn);

        let general = queries::get_category(&pool, &owner, id).await.unwrap();
        assert_eq!(general.name, "General");
        assert!(general.is_default);
    }
}
