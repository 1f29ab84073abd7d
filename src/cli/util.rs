use chrono::NaiveDate;
use ratatui::style::Color;
use rust_decimal::Decimal;

use crate::database::models::Category;
use crate::error::AppError;

/// Colors offered by the category form.
pub const PALETTE: &[&str] = &[
    "#64748b", "#f97316", "#3b82f6", "#ec4899", "#a855f7", "#eab308", "#22c55e", "#ef4444",
    "#14b8a6", "#06b6d4", "#84cc16", "#f43f5e",
];

/// Icon identifiers and the glyph drawn for each.
pub const ICONS: &[(&str, &str)] = &[
    ("tag", "#"),
    ("utensils", "🍴"),
    ("car", "🚗"),
    ("shopping-bag", "🛍"),
    ("film", "🎬"),
    ("receipt", "🧾"),
    ("heart-pulse", "💊"),
    ("home", "🏠"),
    ("plane", "✈"),
    ("book", "📚"),
    ("gift", "🎁"),
    ("coffee", "☕"),
];

pub fn icon_glyph(id: &str) -> &'static str {
    ICONS
        .iter()
        .find(|(name, _)| *name == id)
        .map_or("•", |(_, glyph)| *glyph)
}

pub fn fmt_money(symbol: &str, d: &Decimal) -> String {
    format!("{symbol}{:.2}", d.round_dp(2))
}

pub fn parse_money(s: &str) -> Option<Decimal> {
    Decimal::from_str_exact(s.trim()).ok()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn iso(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Whether another category of this user already uses `color`.
pub fn color_in_use(categories: &[Category], color: &str, except: Option<i64>) -> bool {
    categories
        .iter()
        .filter(|c| Some(c.id) != except)
        .any(|c| c.color.eq_ignore_ascii_case(color))
}

pub fn to_color(hex: &str) -> Color {
    hex.parse().unwrap_or(Color::Gray)
}

/// Message shown in the status bar for a failed action.
pub fn describe(err: &AppError) -> String {
    match err {
        AppError::DefaultCategoryProtected => "The default category can't be deleted.".into(),
        AppError::AuthorizationDenied => "That record belongs to someone else.".into(),
        AppError::NotFound => "That record no longer exists. Press r to refresh.".into(),
        AppError::ConstraintViolation(msg) => format!("Rejected by the database: {msg}"),
        AppError::InvalidInput(msg) => msg.clone(),
        AppError::Unauthenticated => "Your session token is invalid or expired.".into(),
        AppError::Storage(_) => "Storage is unavailable, try again.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn category(id: i64, color: &str) -> Category {
        Category {
            id,
            user_id: "u".into(),
            name: format!("c{id}"),
            color: color.into(),
            icon: "tag".into(),
            is_default: id == 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn color_check_ignores_the_category_being_edited() {
        let categories = vec![category(1, "#64748B"), category(2, "#f97316")];
        assert!(color_in_use(&categories, "#64748b", None));
        assert!(color_in_use(&categories, "#64748b", Some(2)));
        assert!(!color_in_use(&categories, "#64748b", Some(1)));
        assert!(!color_in_use(&categories, "#22c55e", None));
    }

    #[test]
    fn money_and_dates() {
        assert_eq!(fmt_money("$", &dec!(12.5)), "$12.50");
        assert_eq!(parse_money(" 3.10 "), Some(dec!(3.10)));
        assert_eq!(parse_money("abc"), None);
        assert_eq!(parse_date("2025/06/01"), NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(parse_date("06-01-2025"), None);
    }

    #[test]
    fn palette_colors_parse() {
        for hex in PALETTE {
            assert!(matches!(to_color(hex), Color::Rgb(..)), "{hex}");
        }
        assert_eq!(icon_glyph("nope"), "•");
    }
}
