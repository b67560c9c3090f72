pub mod config;
pub mod database;
pub mod enforcement;
pub mod error;
pub mod github;
pub mod webhooks;

pub use error::ClaBotError;
