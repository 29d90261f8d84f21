//! Utilities Module

pub mod error;
pub mod text;

pub use error::{AppError, AppResult};
