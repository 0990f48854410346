use std::env;

use crate::errors::CatalogError;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub collection_name: String,
    pub page: u64,
    pub page_size: u64,
    pub fail_fast: bool,
    pub seed: bool,
    pub server_selection_timeout_secs: Option<u64>,
}

/// Values given on the command line. Anything left as `None` keeps the
/// value that came from the environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub mongodb_uri: Option<String>,
    pub database_name: Option<String>,
    pub collection_name: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub fail_fast: bool,
    pub seed: bool,
    pub server_selection_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mongodb_uri: "mongodb://localhost:27017/".to_string(),
            database_name: "library".to_string(),
            collection_name: "books".to_string(),
            page: 1,
            page_size: 5,
            fail_fast: false,
            seed: false,
            server_selection_timeout_secs: None,
        }
    }
}

impl Config {
    /// Read the environment (and `.env`, if present). Values are checked by
    /// `validate`, which `with_overrides` runs once command line values are in.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        Config {
            mongodb_uri: env::var("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            database_name: env::var("SHELFQUERY_DATABASE").unwrap_or(defaults.database_name),
            collection_name: env::var("SHELFQUERY_COLLECTION")
                .unwrap_or(defaults.collection_name),
            page: env::var("SHELFQUERY_PAGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.page),
            page_size: env::var("SHELFQUERY_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.page_size),
            fail_fast: env::var("SHELFQUERY_FAIL_FAST")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.fail_fast),
            seed: env::var("SHELFQUERY_SEED")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.seed),
            server_selection_timeout_secs: env::var("SHELFQUERY_SERVER_SELECTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Layer command line values over this configuration and re-validate.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, CatalogError> {
        if let Some(uri) = overrides.mongodb_uri {
            self.mongodb_uri = uri;
        }
        if let Some(database) = overrides.database_name {
            self.database_name = database;
        }
        if let Some(collection) = overrides.collection_name {
            self.collection_name = collection;
        }
        if let Some(page) = overrides.page {
            self.page = page;
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
        if let Some(timeout) = overrides.server_selection_timeout_secs {
            self.server_selection_timeout_secs = Some(timeout);
        }
        // Flags can only switch behaviour on.
        self.fail_fast |= overrides.fail_fast;
        self.seed |= overrides.seed;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.mongodb_uri.trim().is_empty() {
            return Err(CatalogError::invalid_config("MongoDB URI must not be empty"));
        }
        if self.database_name.trim().is_empty() {
            return Err(CatalogError::invalid_config("database name must not be empty"));
        }
        if self.collection_name.trim().is_empty() {
            return Err(CatalogError::invalid_config("collection name must not be empty"));
        }
        if self.page < 1 {
            return Err(CatalogError::invalid_config("page numbers start at 1"));
        }
        if self.page_size < 1 {
            return Err(CatalogError::invalid_config("page size must be at least 1"));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
