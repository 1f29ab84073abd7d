pub mod category;
pub mod expense;
pub mod profile;

pub use category::{Category, CategoryDeletion, NewCategory, UpdateCategory};
pub use expense::{Expense, ExpenseFilter, NewExpense, UpdateExpense, MAX_AMOUNT};
pub use profile::{Currency, Profile, UpdateProfile, SUPPORTED_CURRENCIES};
