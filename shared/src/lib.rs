pub mod database;
pub mod config;

pub use database::{get_pool, get_memory_pool, DbPool};
pub use config::Config;
