use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::error::{AppError, AppResult};

/// Largest accepted amount. Keeps every per-user sum far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: String,
    pub category_id: i64,
    pub amount: Decimal, // always > 0
    pub description: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// Amounts are stored as decimal text.
impl<'r> FromRow<'r, SqliteRow> for Expense {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let amount_text: String = row.try_get("amount")?;
        let amount = Decimal::from_str(&amount_text).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".into(),
            source: format!("Invalid Decimal format for amount: {e}").into(),
        })?;

        Ok(Expense {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            category_id: row.try_get("category_id")?,
            amount,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewExpense {
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateExpense {
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("amount must be greater than zero".into()));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::InvalidInput(format!("amount must not exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

impl NewExpense {
    pub fn validate(&self) -> AppResult<()> {
        check_amount(self.amount)
    }
}

impl UpdateExpense {
    pub fn validate(&self) -> AppResult<()> {
        self.amount.map_or(Ok(()), check_amount)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    pub category_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_are_bounded() {
        let new = |amount| NewExpense {
            category_id: 1,
            amount,
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        assert!(new(dec!(0.01)).validate().is_ok());
        assert!(new(MAX_AMOUNT).validate().is_ok());
        assert!(matches!(new(MAX_AMOUNT + dec!(0.01)).validate(), Err(AppError::InvalidInput(_))));
        assert!(matches!(new(Decimal::MAX).validate(), Err(AppError::InvalidInput(_))));
        assert!(UpdateExpense::default().validate().is_ok());
        let huge = UpdateExpense { amount: Some(Decimal::MAX), ..Default::default() };
        assert!(matches!(huge.validate(), Err(AppError::InvalidInput(_))));
    }
}
