use std::time::Instant;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{BookStore, FindQuery};
use crate::errors::CatalogError;
use crate::models::{
    decode, decode_all, AuthorBookCount, Book, BookSummary, DecadeGroup, ExplainSummary,
    GenreAveragePrice,
};
use crate::queries::{self, Page, SortOrder};
use crate::render;

/// One entry of the catalog, in the order the runner issues them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindByGenre,
    FindByAuthor,
    FindPublishedAfter,
    UpdatePrice,
    DeleteByTitle,
    CompoundFilter,
    Projection,
    SortByPriceAscending,
    SortByPriceDescending,
    Paginate,
    AveragePriceByGenre,
    TopAuthor,
    BooksByDecade,
    CreateTitleIndex,
    CreateAuthorYearIndex,
    ExplainQuery,
}

impl Operation {
    pub const CATALOG: [Operation; 16] = [
        Operation::FindByGenre,
        Operation::FindByAuthor,
        Operation::FindPublishedAfter,
        Operation::UpdatePrice,
        Operation::DeleteByTitle,
        Operation::CompoundFilter,
        Operation::Projection,
        Operation::SortByPriceAscending,
        Operation::SortByPriceDescending,
        Operation::Paginate,
        Operation::AveragePriceByGenre,
        Operation::TopAuthor,
        Operation::BooksByDecade,
        Operation::CreateTitleIndex,
        Operation::CreateAuthorYearIndex,
        Operation::ExplainQuery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::FindByGenre => "Find by genre",
            Operation::FindByAuthor => "Find by author",
            Operation::FindPublishedAfter => "Find by year range",
            Operation::UpdatePrice => "Update price",
            Operation::DeleteByTitle => "Delete by title",
            Operation::CompoundFilter => "Compound filter",
            Operation::Projection => "Projection",
            Operation::SortByPriceAscending => "Sort by price ascending",
            Operation::SortByPriceDescending => "Sort by price descending",
            Operation::Paginate => "Pagination",
            Operation::AveragePriceByGenre => "Average price by genre",
            Operation::TopAuthor => "Author with most books",
            Operation::BooksByDecade => "Group by decade",
            Operation::CreateTitleIndex => "Create index (single field)",
            Operation::CreateAuthorYearIndex => "Create index (compound)",
            Operation::ExplainQuery => "Explain query plan",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Books(Vec<Book>),
    Summaries(Vec<BookSummary>),
    Modified(u64),
    Deleted(u64),
    AveragePrice(Option<GenreAveragePrice>),
    TopAuthor(Option<AuthorBookCount>),
    Decades(Vec<DecadeGroup>),
    IndexCreated(String),
    Plan(ExplainSummary),
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<Operation>,
    pub failed: Vec<(Operation, String)>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} operations succeeded",
            self.succeeded.len(),
            self.succeeded.len() + self.failed.len()
        );
        if !self.failed.is_empty() {
            let names: Vec<&str> = self.failed.iter().map(|(op, _)| op.name()).collect();
            line.push_str(&format!("; failed: {}", names.join(", ")));
        }
        line
    }
}

/// Issues the catalog against a store, one operation at a time.
#[derive(Debug, Clone)]
pub struct QueryRunner {
    page: Page,
    fail_fast: bool,
}

impl QueryRunner {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            fail_fast: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, CatalogError> {
        let page = Page::new(config.page, config.page_size)?;
        Ok(Self::new(page).fail_fast(config.fail_fast))
    }

    /// Stop at the first failing operation instead of reporting it and moving on.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub async fn run(&self, store: &dyn BookStore) -> Result<RunReport, CatalogError> {
        let mut report = RunReport::default();

        for operation in Operation::CATALOG {
            info!("Running '{}'", operation.name());
            let started = Instant::now();

            match self.execute(store, operation).await {
                Ok(outcome) => {
                    println!("{}", render::format_outcome(operation, &outcome));
                    info!(
                        "'{}' finished in {}ms",
                        operation.name(),
                        started.elapsed().as_millis()
                    );
                    report.succeeded.push(operation);
                }
                Err(e) => {
                    error!("❌ [{}] {}", e.error_code(), e);
                    if self.fail_fast {
                        return Err(e);
                    }
                    report.failed.push((operation, e.to_string()));
                }
            }
        }

        if report.is_clean() {
            info!("✅ {}", report.summary());
        } else {
            warn!("{}", report.summary());
        }
        Ok(report)
    }

    pub async fn execute(
        &self,
        store: &dyn BookStore,
        operation: Operation,
    ) -> Result<Outcome, CatalogError> {
        self.dispatch(store, operation)
            .await
            .map_err(|e| CatalogError::operation(operation.name(), e))
    }

    async fn dispatch(&self, store: &dyn BookStore, operation: Operation) -> Result<Outcome> {
        let outcome = match operation {
            Operation::FindByGenre => {
                find_books(store, FindQuery::new(queries::by_genre(queries::FANTASY_GENRE))).await?
            }
            Operation::FindByAuthor => {
                find_books(store, FindQuery::new(queries::by_author(queries::ORWELL))).await?
            }
            Operation::FindPublishedAfter => {
                let docs = store
                    .aggregate(queries::published_after_pipeline(queries::POST_WAR_YEAR))
                    .await?;
                Outcome::Books(decode_all(docs)?)
            }
            Operation::UpdatePrice => {
                let modified = store
                    .update_one(
                        queries::by_title(queries::REPRICED_TITLE),
                        queries::set_price(queries::REPRICED_PRICE),
                    )
                    .await?;
                Outcome::Modified(modified)
            }
            Operation::DeleteByTitle => {
                let deleted = store
                    .delete_one(queries::by_title(queries::REMOVED_TITLE))
                    .await?;
                Outcome::Deleted(deleted)
            }
            Operation::CompoundFilter => {
                let filter = queries::in_stock_published_after(queries::RECENT_YEAR);
                find_books(store, FindQuery::new(filter)).await?
            }
            Operation::Projection => {
                let docs = store
                    .find(FindQuery::all().projection(queries::summary_projection()))
                    .await?;
                Outcome::Summaries(decode_all(docs)?)
            }
            Operation::SortByPriceAscending => {
                let query = FindQuery::all().sort(queries::sort_by_price(SortOrder::Ascending));
                find_books(store, query).await?
            }
            Operation::SortByPriceDescending => {
                let query = FindQuery::all().sort(queries::sort_by_price(SortOrder::Descending));
                find_books(store, query).await?
            }
            Operation::Paginate => {
                info!(
                    "Fetching page {} with {} books per page",
                    self.page.number(),
                    self.page.size()
                );
                let query = FindQuery::all()
                    .sort(queries::sort_by_title())
                    .skip(self.page.skip())
                    .limit(self.page.limit());
                find_books(store, query).await?
            }
            Operation::AveragePriceByGenre => {
                let docs = store
                    .aggregate(queries::average_price_by_genre_pipeline(queries::FICTION_GENRE))
                    .await?;
                Outcome::AveragePrice(first_record(docs)?)
            }
            Operation::TopAuthor => {
                let docs = store.aggregate(queries::top_author_pipeline()).await?;
                Outcome::TopAuthor(first_record(docs)?)
            }
            Operation::BooksByDecade => {
                let docs = store.aggregate(queries::books_by_decade_pipeline()).await?;
                Outcome::Decades(decode_all(docs)?)
            }
            Operation::CreateTitleIndex => {
                Outcome::IndexCreated(store.create_index(queries::title_index_keys()).await?)
            }
            Operation::CreateAuthorYearIndex => {
                Outcome::IndexCreated(store.create_index(queries::author_year_index_keys()).await?)
            }
            Operation::ExplainQuery => {
                let reply = store
                    .explain(queries::by_title(queries::REPRICED_TITLE))
                    .await?;
                Outcome::Plan(ExplainSummary::from_explain(&reply))
            }
        };
        Ok(outcome)
    }
}

async fn find_books(store: &dyn BookStore, query: FindQuery) -> Result<Outcome> {
    let docs = store.find(query).await?;
    Ok(Outcome::Books(decode_all(docs)?))
}

fn first_record<T: serde::de::DeserializeOwned>(
    docs: Vec<mongodb::bson::Document>,
) -> Result<Option<T>> {
    match docs.into_iter().next() {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
