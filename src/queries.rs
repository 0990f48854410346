//! Filters, sorts, updates and aggregation pipelines used by the catalog.
//!
//! Everything here only builds documents. Nothing talks to the server, which
//! keeps the exact shape of each query testable on its own.

use mongodb::bson::{doc, Document};

use crate::errors::CatalogError;

pub const FANTASY_GENRE: &str = "Fantasy";
pub const FICTION_GENRE: &str = "Fiction";
pub const ORWELL: &str = "George Orwell";
pub const POST_WAR_YEAR: i32 = 1945;
pub const RECENT_YEAR: i32 = 2010;
pub const REPRICED_TITLE: &str = "The Hobbit";
pub const REPRICED_PRICE: f64 = 17.99;
pub const REMOVED_TITLE: &str = "The Alchemist";

pub fn by_genre(genre: &str) -> Document {
    doc! { "genre": genre }
}

pub fn by_author(author: &str) -> Document {
    doc! { "author": author }
}

pub fn by_title(title: &str) -> Document {
    doc! { "title": title }
}

pub fn published_after(year: i32) -> Document {
    doc! { "published_year": { "$gt": year } }
}

/// Books in stock that were published after `year`.
pub fn in_stock_published_after(year: i32) -> Document {
    doc! {
        "$and": [
            { "in_stock": true },
            { "published_year": { "$gt": year } },
        ]
    }
}

pub fn set_price(price: f64) -> Document {
    doc! { "$set": { "price": price } }
}

/// Projection onto title, author and price. The identity field is dropped too.
pub fn summary_projection() -> Document {
    doc! { "_id": 0, "title": 1, "author": 1, "price": 1 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn direction(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

pub fn sort_by_price(order: SortOrder) -> Document {
    doc! { "price": order.direction() }
}

/// Title order with `_id` breaking ties, so separate skip/limit queries agree
/// on where books with the same title fall.
pub fn sort_by_title() -> Document {
    doc! { "title": 1, "_id": 1 }
}

/// A one-based page of a sorted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u64,
    size: u64,
}

impl Page {
    pub fn new(number: u64, size: u64) -> Result<Self, CatalogError> {
        if number == 0 {
            return Err(CatalogError::invalid_config("page numbers start at 1"));
        }
        if size == 0 {
            return Err(CatalogError::invalid_config("page size must be at least 1"));
        }
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn skip(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }

    /// The driver takes limits as signed integers.
    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }
}

/// The year range query written as a pipeline with a single `$match` stage.
pub fn published_after_pipeline(year: i32) -> Vec<Document> {
    vec![doc! { "$match": published_after(year) }]
}

pub fn average_price_by_genre_pipeline(genre: &str) -> Vec<Document> {
    vec![
        doc! { "$match": by_genre(genre) },
        doc! { "$group": { "_id": "$genre", "averagePrice": { "$avg": "$price" } } },
        doc! { "$project": { "_id": 0, "genre": "$_id", "averagePrice": 1 } },
    ]
}

/// Author with the most books. Equal counts go to the author whose name sorts first.
pub fn top_author_pipeline() -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$author", "totalBooks": { "$sum": 1 } } },
        doc! { "$sort": { "totalBooks": -1, "_id": 1 } },
        doc! { "$limit": 1 },
        doc! { "$project": { "_id": 0, "author": "$_id", "totalBooks": 1 } },
    ]
}

/// `year - year % 10`, so 1949 lands in 1940 and 1950 in 1950.
///
/// The year is cast with `$toInt` first. A year stored as a double (1949.0)
/// would otherwise produce a double decade.
pub fn decade_expression() -> Document {
    let year = doc! { "$toInt": "$published_year" };
    doc! {
        "$subtract": [
            year.clone(),
            { "$mod": [year, 10] },
        ]
    }
}

pub fn books_by_decade_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "published_year": { "$type": "number" } } },
        doc! {
            "$group": {
                "_id": decade_expression(),
                "count": { "$sum": 1 },
                "titles": { "$push": "$title" },
            }
        },
        doc! { "$sort": { "_id": 1 } },
        doc! { "$project": { "_id": 0, "decade": "$_id", "count": 1, "titles": 1 } },
    ]
}

pub fn title_index_keys() -> Document {
    doc! { "title": 1 }
}

pub fn author_year_index_keys() -> Document {
    doc! { "author": 1, "published_year": 1 }
}
