use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

#[derive(FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub color: String, // "#rrggbb"
    pub icon: String,
    pub is_default: bool, // exactly one per user
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Name, color and icon are editable. The default flag is not.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Outcome of deleting a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDeletion {
    pub deleted_id: i64,
    pub reassigned_to: i64,
    pub reassigned_expenses: u64,
}

/// `#rrggbb`, the form the front-end palette produces.
pub fn is_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn check_color(color: &str) -> AppResult<()> {
    if is_hex_color(color) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("color must look like #rrggbb, got {color:?}")))
    }
}

fn check_icon(icon: &str) -> AppResult<()> {
    if icon.trim().is_empty() {
        return Err(AppError::InvalidInput("icon is required".into()));
    }
    Ok(())
}

impl NewCategory {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput("name is required".into()));
        }
        check_color(&self.color)?;
        check_icon(&self.icon)
    }
}

impl UpdateCategory {
    pub fn validate(&self) -> AppResult<()> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::InvalidInput("name cannot be blank".into()));
        }
        if let Some(color) = &self.color {
            check_color(color)?;
        }
        if let Some(icon) = &self.icon {
            check_icon(icon)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#A855f7"));
        assert!(!is_hex_color("a855f7"));
        assert!(!is_hex_color("#a855f"));
        assert!(!is_hex_color("#gggggg"));
    }

    #[test]
    fn blank_names_and_bad_colors_are_invalid() {
        let mut new = NewCategory {
            name: "Pets".into(),
            color: "#22c55e".into(),
            icon: "paw".into(),
            is_default: false,
        };
        assert!(new.validate().is_ok());
        new.color = "green".into();
        assert!(matches!(new.validate(), Err(AppError::InvalidInput(_))));

        let rename = UpdateCategory { name: Some(" ".into()), ..Default::default() };
        assert!(rename.validate().is_err());
        assert!(UpdateCategory::default().validate().is_ok());
    }
}
