use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: String,
    pub currency: String,        // ISO 4217 code
    pub currency_symbol: String, // display only, no conversion
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateProfile {
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_CURRENCIES: &[Currency] = &[
    Currency { code: "USD", symbol: "$", name: "US Dollar" },
    Currency { code: "EUR", symbol: "€", name: "Euro" },
    Currency { code: "GBP", symbol: "£", name: "British Pound" },
    Currency { code: "JPY", symbol: "¥", name: "Japanese Yen" },
    Currency { code: "CAD", symbol: "C$", name: "Canadian Dollar" },
    Currency { code: "AUD", symbol: "A$", name: "Australian Dollar" },
    Currency { code: "INR", symbol: "₹", name: "Indian Rupee" },
    Currency { code: "CNY", symbol: "¥", name: "Chinese Yuan" },
];

impl Currency {
    pub fn find(code: &str) -> Option<&'static Currency> {
        SUPPORTED_CURRENCIES
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
    }
}
