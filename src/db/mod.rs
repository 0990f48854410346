use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{redact_uri, CatalogError};

pub mod books;

pub use books::MongoBookStore;

const APP_NAME: &str = "shelfquery";

/// A `find` request: a filter plus the optional cursor modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindQuery {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn all() -> Self {
        Self::new(doc! {})
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The calls the query runner makes against one collection.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find(&self, query: FindQuery) -> Result<Vec<Document>>;

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>>;

    /// Updates the first matching document and returns how many were modified.
    async fn update_one(&self, filter: Document, update: Document) -> Result<u64>;

    /// Deletes the first matching document and returns how many were deleted.
    async fn delete_one(&self, filter: Document) -> Result<u64>;

    /// Creates an index on `keys` and returns its name. Repeating the call with
    /// the same keys is a no-op on the server.
    async fn create_index(&self, keys: Document) -> Result<String>;

    async fn list_index_names(&self) -> Result<Vec<String>>;

    /// Runs `explain` with execution statistics for a find on `filter`.
    async fn explain(&self, filter: Document) -> Result<Document>;

    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64>;

    /// Removes every document in the collection.
    async fn clear(&self) -> Result<u64>;
}

/// Owns the client connection for the duration of a run.
pub struct Database {
    client: Client,
    database_name: String,
    collection_name: String,
}

impl Database {
    /// Connects and pings the server, so an unreachable host or rejected
    /// credentials surface here rather than on the first query.
    pub async fn connect(config: &Config) -> Result<Self, CatalogError> {
        let uri = &config.mongodb_uri;
        info!("Connecting to MongoDB at {}", redact_uri(uri));

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| CatalogError::connection(uri, e))?;
        options.app_name = Some(APP_NAME.to_string());
        if let Some(secs) = config.server_selection_timeout_secs {
            options.server_selection_timeout = Some(Duration::from_secs(secs));
        }

        let client = Client::with_options(options).map_err(|e| CatalogError::connection(uri, e))?;

        let ping = client.database("admin").run_command(doc! { "ping": 1 }).await;
        if let Err(e) = ping {
            warn!("Ping failed, shutting the client down");
            client.shutdown().await;
            return Err(CatalogError::connection(uri, e));
        }

        info!("✅ Connected to MongoDB");
        Ok(Self {
            client,
            database_name: config.database_name.clone(),
            collection_name: config.collection_name.clone(),
        })
    }

    pub fn books(&self) -> MongoBookStore {
        let database = self.client.database(&self.database_name);
        let collection = database.collection::<Document>(&self.collection_name);
        MongoBookStore::new(database, collection)
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Shuts the client down. Takes `self` so the handle cannot be used afterwards.
    pub async fn close(self) {
        debug!("Shutting down MongoDB client");
        self.client.shutdown().await;
        info!("MongoDB connection closed");
    }
}
