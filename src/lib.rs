pub mod backend;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod identity;
pub mod stats;

pub use error::{AppError, AppResult};
pub use identity::{IdentityVerifier, Owner};
