//! Aggregations behind the dashboard: monthly totals, category shares and
//! recent activity. Pure functions over already-loaded rows.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::database::models::{Category, Expense};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    /// "Jan", "Feb", ... for chart labels.
    pub fn short_name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        NAMES.get(self.month.saturating_sub(1) as usize).copied().unwrap_or("?")
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: YearMonth,
    pub label: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub total: Decimal,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: Decimal,
    pub this_month: Decimal,
    pub last_month: Decimal,
    pub expense_count: usize,
    pub trend: Vec<MonthTotal>,
    pub by_category: Vec<CategoryShare>,
    pub recent: Vec<Expense>,
}

pub const TREND_MONTHS: usize = 6;
pub const RECENT_COUNT: usize = 5;

/// Saturates at `Decimal::MAX` instead of panicking on overflow.
fn sum<'a>(amounts: impl Iterator<Item = &'a Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, |acc, a| acc.saturating_add(*a))
}

pub fn total(expenses: &[Expense]) -> Decimal {
    sum(expenses.iter().map(|e| &e.amount))
}

pub fn month_total(expenses: &[Expense], month: YearMonth) -> Decimal {
    sum(expenses.iter().filter(|e| month.contains(e.date)).map(|e| &e.amount))
}

pub fn category_total(expenses: &[Expense], category_id: i64) -> Decimal {
    sum(expenses.iter().filter(|e| e.category_id == category_id).map(|e| &e.amount))
}

pub fn monthly_totals(expenses: &[Expense]) -> BTreeMap<YearMonth, Decimal> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        let entry = totals.entry(YearMonth::of(expense.date)).or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(expense.amount);
    }
    totals
}

/// The `months` months ending with `today`'s, oldest first, empty months
/// included as zero.
pub fn monthly_trend(expenses: &[Expense], months: usize, today: NaiveDate) -> Vec<MonthTotal> {
    let totals = monthly_totals(expenses);

    let mut window = Vec::with_capacity(months);
    let mut month = YearMonth::of(today);
    for _ in 0..months {
        window.push(month);
        month = month.previous();
    }
    window.reverse();

    window
        .into_iter()
        .map(|month| MonthTotal {
            month,
            label: month.short_name().to_string(),
            total: totals.get(&month).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}

/// Per-category totals, largest first. Percentages are of the grand total
/// and sum to 100 for a non-empty input.
pub fn category_breakdown(expenses: &[Expense], categories: &[Category]) -> Vec<CategoryShare> {
    let grand_total = total(expenses);
    if grand_total.is_zero() {
        return Vec::new();
    }

    let mut grouped: HashMap<i64, (Decimal, usize)> = HashMap::new();
    for expense in expenses {
        let entry = grouped.entry(expense.category_id).or_insert((Decimal::ZERO, 0));
        entry.0 = entry.0.saturating_add(expense.amount);
        entry.1 += 1;
    }

    let grand = grand_total.to_f64().unwrap_or(0.0);
    let mut shares: Vec<CategoryShare> = grouped
        .into_iter()
        .map(|(category_id, (sum, count))| {
            let category = categories.iter().find(|c| c.id == category_id);
            CategoryShare {
                category_id,
                name: category.map_or_else(|| "Uncategorized".to_string(), |c| c.name.clone()),
                color: category.map_or_else(|| "#9ca3af".to_string(), |c| c.color.clone()),
                icon: category.map_or_else(|| "tag".to_string(), |c| c.icon.clone()),
                total: sum,
                count,
                percent: sum.to_f64().unwrap_or(0.0) / grand * 100.0,
            }
        })
        .collect();

    shares.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    shares
}

/// Newest first by date, then by creation time.
pub fn recent(expenses: &[Expense], n: usize) -> Vec<Expense> {
    let mut sorted = expenses.to_vec();
    sorted.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
    sorted.truncate(n);
    sorted
}

pub fn summarize(expenses: &[Expense], categories: &[Category], today: NaiveDate) -> Summary {
    let current = YearMonth::of(today);
    Summary {
        total: total(expenses),
        this_month: month_total(expenses, current),
        last_month: month_total(expenses, current.previous()),
        expense_count: expenses.len(),
        trend: monthly_trend(expenses, TREND_MONTHS, today),
        by_category: category_breakdown(expenses, categories),
        recent: recent(expenses, RECENT_COUNT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(id: i64, category_id: i64, amount: Decimal, on: NaiveDate) -> Expense {
        Expense {
            id,
            user_id: "u".into(),
            category_id,
            amount,
            description: String::new(),
            date: on,
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            user_id: "u".into(),
            name: name.into(),
            color: "#000000".into(),
            icon: "tag".into(),
            is_default: id == 1,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn monthly_totals_group_by_calendar_month() {
        let expenses = vec![
            expense(1, 1, dec!(10), date(2025, 1, 14)),
            expense(2, 1, dec!(20), date(2025, 2, 1)),
            expense(3, 2, dec!(30), date(2025, 2, 28)),
        ];

        let totals = monthly_totals(&expenses);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&YearMonth::new(2025, 1)], dec!(10));
        assert_eq!(totals[&YearMonth::new(2025, 2)], dec!(50));
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let categories = vec![category(1, "General"), category(2, "Food"), category(3, "Rent")];
        let expenses = vec![
            expense(1, 1, dec!(10), date(2025, 1, 1)),
            expense(2, 2, dec!(20.33), date(2025, 1, 2)),
            expense(3, 3, dec!(33.10), date(2025, 1, 3)),
            expense(4, 2, dec!(0.01), date(2025, 1, 4)),
        ];

        let shares = category_breakdown(&expenses, &categories);
        let sum: f64 = shares.iter().map(|s| s.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9, "{sum}");
        assert_eq!(shares[0].name, "Rent");
        assert_eq!(shares[1].total, dec!(20.34));
        assert_eq!(shares[1].count, 2);
    }

    #[test]
    fn empty_input_has_no_shares() {
        assert!(category_breakdown(&[], &[category(1, "General")]).is_empty());
        assert_eq!(total(&[]), Decimal::ZERO);
    }

    #[test]
    fn trend_fills_empty_months_and_crosses_years() {
        let expenses = vec![
            expense(1, 1, dec!(5), date(2024, 11, 3)),
            expense(2, 1, dec!(7), date(2025, 1, 9)),
        ];

        let trend = monthly_trend(&expenses, 3, date(2025, 1, 20));
        let months: Vec<_> = trend.iter().map(|t| t.month.to_string()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12", "2025-01"]);
        let totals: Vec<_> = trend.iter().map(|t| t.total).collect();
        assert_eq!(totals, vec![dec!(5), dec!(0), dec!(7)]);
        assert_eq!(trend[2].label, "Jan");
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let categories = vec![category(1, "General")];
        let expenses = vec![
            expense(1, 1, Decimal::MAX, date(2025, 6, 1)),
            expense(2, 1, Decimal::MAX, date(2025, 6, 2)),
        ];

        let summary = summarize(&expenses, &categories, date(2025, 6, 30));
        assert_eq!(summary.total, Decimal::MAX);
        assert_eq!(summary.this_month, Decimal::MAX);
        assert_eq!(summary.by_category[0].total, Decimal::MAX);
        assert_eq!(monthly_totals(&expenses)[&YearMonth::new(2025, 6)], Decimal::MAX);
    }

    #[test]
    fn recent_is_newest_first() {
        let expenses = vec![
            expense(1, 1, dec!(1), date(2025, 3, 1)),
            expense(2, 1, dec!(2), date(2025, 3, 5)),
            expense(3, 1, dec!(3), date(2025, 3, 5)),
            expense(4, 1, dec!(4), date(2025, 2, 27)),
        ];

        let ids: Vec<_> = recent(&expenses, 3).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn summary_splits_this_and_last_month() {
        let categories = vec![category(1, "General")];
        let expenses = vec![
            expense(1, 1, dec!(12.50), date(2025, 6, 2)),
            expense(2, 1, dec!(7.50), date(2025, 6, 30)),
            expense(3, 1, dec!(100), date(2025, 5, 31)),
        ];

        let summary = summarize(&expenses, &categories, date(2025, 6, 30));
        assert_eq!(summary.total, dec!(120));
        assert_eq!(summary.this_month, dec!(20));
        assert_eq!(summary.last_month, dec!(100));
        assert_eq!(summary.trend.len(), TREND_MONTHS);
        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.recent.len(), 3);
    }
}
