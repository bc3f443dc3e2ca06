pub mod config;
pub mod error;
pub mod export;
pub mod host;
pub mod models;
pub mod session;
pub mod timecard;
pub mod timezone;

pub use error::{AppError, Result};
