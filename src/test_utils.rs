//! Test utilities: an in-memory scripted store and a MongoDB container context.
//!
//! `ScriptedStore` lets runner tests observe which calls were made and force
//! failures without a server. `MongoTestContext` starts a real MongoDB through
//! testcontainers for the integration suite.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::mongo::Mongo;

use crate::config::Config;
use crate::db::{BookStore, Database, FindQuery, MongoBookStore};
use crate::models::Book;

/// In-memory `BookStore` that records every call by method name.
///
/// `find` and `aggregate` return the configured results (empty by default),
/// and writes report a single affected document.
#[derive(Default)]
pub struct ScriptedStore {
    calls: Mutex<Vec<String>>,
    finds: Mutex<Vec<FindQuery>>,
    failing: HashSet<&'static str>,
    find_results: Vec<Document>,
    aggregate_results: Vec<Document>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `method` fail.
    pub fn fail_on(mut self, method: &'static str) -> Self {
        self.failing.insert(method);
        self
    }

    pub fn with_find_results(mut self, docs: Vec<Document>) -> Self {
        self.find_results = docs;
        self
    }

    pub fn with_aggregate_results(mut self, docs: Vec<Document>) -> Self {
        self.aggregate_results = docs;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_find(&self) -> Option<FindQuery> {
        self.finds.lock().unwrap().last().cloned()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.contains(&method) {
            return Err(anyhow!("scripted failure in {}", method));
        }
        Ok(())
    }
}

#[async_trait]
impl BookStore for ScriptedStore {
    async fn find(&self, query: FindQuery) -> Result<Vec<Document>> {
        self.record("find")?;
        self.finds.lock().unwrap().push(query);
        Ok(self.find_results.clone())
    }

    async fn aggregate(&self, _pipeline: Vec<Document>) -> Result<Vec<Document>> {
        self.record("aggregate")?;
        Ok(self.aggregate_results.clone())
    }

    async fn update_one(&self, _filter: Document, _update: Document) -> Result<u64> {
        self.record("update_one")?;
        Ok(1)
    }

    async fn delete_one(&self, _filter: Document) -> Result<u64> {
        self.record("delete_one")?;
        Ok(1)
    }

    async fn create_index(&self, keys: Document) -> Result<String> {
        self.record("create_index")?;
        let name = keys
            .iter()
            .map(|(field, direction)| format!("{}_{}", field, direction))
            .collect::<Vec<_>>()
            .join("_");
        Ok(name)
    }

    async fn list_index_names(&self) -> Result<Vec<String>> {
        self.record("list_index_names")?;
        Ok(vec!["_id_".to_string()])
    }

    async fn explain(&self, _filter: Document) -> Result<Document> {
        self.record("explain")?;
        Ok(Document::new())
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64> {
        self.record("insert_many")?;
        Ok(docs.len() as u64)
    }

    async fn clear(&self) -> Result<u64> {
        self.record("clear")?;
        Ok(0)
    }
}

/// A MongoDB container plus a connected `Database` pointed at a collection
/// unique to this context.
pub struct MongoTestContext {
    pub config: Config,
    database: Database,
    _container: ContainerAsync<Mongo>,
}

impl MongoTestContext {
    pub async fn new() -> Self {
        Self::try_new()
            .await
            .unwrap_or_else(|e| panic!("Failed to start MongoDB test context: {}", e))
    }

    async fn try_new() -> Result<Self> {
        let container = Mongo::default()
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start mongo container: {}", e))?;
        let host = container
            .get_host()
            .await
            .map_err(|e| anyhow!("Failed to get mongo host: {}", e))?;
        let port = container
            .get_host_port_ipv4(27017)
            .await
            .map_err(|e| anyhow!("Failed to get mongo port: {}", e))?;

        let test_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_nanos()
            .to_string();
        let unique_suffix = &test_id[test_id.len().saturating_sub(8)..];

        let config = Config {
            mongodb_uri: format!("mongodb://{}:{}/", host, port),
            database_name: "shelfquery_test".to_string(),
            collection_name: format!("books_{}", unique_suffix),
            server_selection_timeout_secs: Some(5),
            ..Config::default()
        };

        // Wait for the server to accept connections
        let mut retries = 0;
        const MAX_RETRIES: u32 = 30;
        let database = loop {
            match Database::connect(&config).await {
                Ok(database) => break database,
                Err(e) if retries < MAX_RETRIES - 1 => {
                    eprintln!("MongoDB not ready yet: {}, retrying...", e);
                    retries += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
                Err(e) => {
                    return Err(anyhow!(
                        "Failed to connect to test database after {} retries: {}",
                        MAX_RETRIES,
                        e
                    ))
                }
            }
        };

        Ok(Self {
            config,
            database,
            _container: container,
        })
    }

    pub fn store(&self) -> MongoBookStore {
        self.database.books()
    }

    pub async fn insert_books(&self, books: &[Book]) -> Result<u64> {
        let docs = books
            .iter()
            .map(Book::to_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.store().insert_many(docs).await
    }

    pub async fn close(self) {
        self.database.close().await;
    }
}
