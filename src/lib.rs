pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod queries;
pub mod render;
pub mod runner;
pub mod seed;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use db::{BookStore, Database};
pub use errors::CatalogError;
pub use runner::{QueryRunner, RunReport};
