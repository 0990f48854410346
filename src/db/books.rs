use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database, IndexModel};
use tracing::debug;

use super::{BookStore, FindQuery};

/// `BookStore` backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoBookStore {
    database: Database,
    collection: Collection<Document>,
}

impl MongoBookStore {
    pub fn new(database: Database, collection: Collection<Document>) -> Self {
        Self {
            database,
            collection,
        }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn find(&self, query: FindQuery) -> Result<Vec<Document>> {
        debug!("find {} on {}", query.filter, self.collection_name());

        let mut action = self.collection.find(query.filter);
        if let Some(projection) = query.projection {
            action = action.projection(projection);
        }
        if let Some(sort) = query.sort {
            action = action.sort(sort);
        }
        if let Some(skip) = query.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = query.limit {
            action = action.limit(limit);
        }

        let cursor = action.await.context("Failed to run find")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read find results")
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        debug!("aggregate with {} stages on {}", pipeline.len(), self.collection_name());

        let cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .context("Failed to run aggregation pipeline")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read aggregation results")
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
        let result = self
            .collection
            .update_one(filter, update)
            .await
            .context("Failed to update document")?;
        debug!(
            "update matched {} and modified {}",
            result.matched_count, result.modified_count
        );
        Ok(result.modified_count)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64> {
        let result = self
            .collection
            .delete_one(filter)
            .await
            .context("Failed to delete document")?;
        Ok(result.deleted_count)
    }

    async fn create_index(&self, keys: Document) -> Result<String> {
        let model = IndexModel::builder().keys(keys.clone()).build();
        let result = self
            .collection
            .create_index(model)
            .await
            .with_context(|| format!("Failed to create index on {}", keys))?;
        Ok(result.index_name)
    }

    async fn list_index_names(&self) -> Result<Vec<String>> {
        self.collection
            .list_index_names()
            .await
            .context("Failed to list indexes")
    }

    async fn explain(&self, filter: Document) -> Result<Document> {
        let command = doc! {
            "explain": {
                "find": self.collection_name(),
                "filter": filter,
            },
            "verbosity": "executionStats",
        };
        self.database
            .run_command(command)
            .await
            .context("Failed to explain query")
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<u64> {
        if docs.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .insert_many(docs)
            .await
            .context("Failed to insert documents")?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! {})
            .await
            .context("Failed to clear collection")?;
        Ok(result.deleted_count)
    }
}
