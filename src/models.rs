use mongodb::bson::{self, oid::ObjectId, Bson, Document};
use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Deserializer, Serialize,
};

use crate::errors::CatalogError;

/// A document of the books collection.
///
/// `published_year` and `price` take part in comparisons and arithmetic on the
/// server, so a document carrying either of them as text is rejected when it
/// is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(deserialize_with = "whole_number")]
    pub published_year: i32,
    pub price: f64,
    pub in_stock: bool,
    #[serde(
        default,
        deserialize_with = "optional_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pages: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl Book {
    pub fn new(
        title: &str,
        author: &str,
        genre: &str,
        published_year: i32,
        price: f64,
        in_stock: bool,
    ) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            published_year,
            price,
            in_stock,
            pages: None,
            publisher: None,
        }
    }

    pub fn with_pages(mut self, pages: i32) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_publisher(mut self, publisher: &str) -> Self {
        self.publisher = Some(publisher.to_string());
        self
    }

    pub fn to_document(&self) -> Result<Document, CatalogError> {
        bson::to_document(self).map_err(|e| {
            CatalogError::invalid_document(format!("cannot encode '{}': {}", self.title, e))
        })
    }
}

/// The `{title, author, price}` projection of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookSummary {
    pub title: String,
    pub author: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreAveragePrice {
    pub genre: String,
    #[serde(rename = "averagePrice")]
    pub average_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorBookCount {
    pub author: String,
    #[serde(rename = "totalBooks")]
    pub total_books: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecadeGroup {
    #[serde(deserialize_with = "whole_number")]
    pub decade: i32,
    pub count: i64,
    pub titles: Vec<String>,
}

/// The parts of an `explain` reply worth printing. The server decides the
/// shape of the reply, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplainSummary {
    pub winning_stage: Option<String>,
    pub index_name: Option<String>,
    pub documents_returned: Option<i64>,
    pub documents_examined: Option<i64>,
    pub keys_examined: Option<i64>,
    pub execution_time_ms: Option<i64>,
}

impl ExplainSummary {
    pub fn from_explain(reply: &Document) -> Self {
        let winning_plan = reply
            .get_document("queryPlanner")
            .ok()
            .and_then(|planner| planner.get_document("winningPlan").ok())
            // Servers running the slot based engine nest the classic plan one level down.
            .map(|plan| plan.get_document("queryPlan").unwrap_or(plan));

        let stats = reply.get_document("executionStats").ok();

        Self {
            winning_stage: winning_plan
                .and_then(|plan| plan.get_str("stage").ok())
                .map(str::to_string),
            index_name: winning_plan.and_then(find_index_name),
            documents_returned: stats.and_then(|s| get_count(s, "nReturned")),
            documents_examined: stats.and_then(|s| get_count(s, "totalDocsExamined")),
            keys_examined: stats.and_then(|s| get_count(s, "totalKeysExamined")),
            execution_time_ms: stats.and_then(|s| get_count(s, "executionTimeMillis")),
        }
    }

    pub fn used_index(&self) -> bool {
        self.index_name.is_some()
    }
}

fn find_index_name(stage: &Document) -> Option<String> {
    if let Ok(name) = stage.get_str("indexName") {
        return Some(name.to_string());
    }
    if let Ok(input) = stage.get_document("inputStage") {
        if let Some(name) = find_index_name(input) {
            return Some(name);
        }
    }
    stage
        .get_array("inputStages")
        .ok()?
        .iter()
        .filter_map(Bson::as_document)
        .find_map(find_index_name)
}

fn get_count(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => Some(*v as i64),
        _ => None,
    }
}

/// Accepts any BSON number without a fractional part. Shell and JavaScript
/// seeders store integers as doubles, so 1949.0 is a valid year.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = Bson::deserialize(deserializer)?;
    as_whole_i32(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a whole number, found {}", value)))
}

fn optional_whole_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i32>, D::Error> {
    match Bson::deserialize(deserializer)? {
        Bson::Null => Ok(None),
        value => as_whole_i32(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a whole number, found {}", value))),
    }
}

fn as_whole_i32(value: &Bson) -> Option<i32> {
    match value {
        Bson::Int32(v) => Some(*v),
        Bson::Int64(v) => i32::try_from(*v).ok(),
        Bson::Double(v)
            if v.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(v) =>
        {
            Some(*v as i32)
        }
        _ => None,
    }
}

/// Decode a raw document at the read boundary.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T, CatalogError> {
    let id = doc.get("_id").map(|id| id.to_string());
    bson::from_document(doc).map_err(|e| match id {
        Some(id) => CatalogError::invalid_document(format!("document {}: {}", id, e)),
        None => CatalogError::invalid_document(e.to_string()),
    })
}

pub fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, CatalogError> {
    docs.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_decode_book_with_optional_fields_missing() {
        let book: Book = decode(doc! {
            "title": "1984",
            "author": "George Orwell",
            "genre": "Dystopian",
            "published_year": 1949,
            "price": 9.99,
            "in_stock": true,
        })
        .unwrap();

        assert_eq!(book.title, "1984");
        assert_eq!(book.published_year, 1949);
        assert!(book.pages.is_none());
        assert!(book.publisher.is_none());
        assert!(book.id.is_none());
    }

    #[test]
    fn test_decode_accepts_integer_price() {
        let book: Book = decode(doc! {
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "published_year": 1965_i64,
            "price": 12,
            "in_stock": false,
            "pages": 412,
        })
        .unwrap();

        assert_eq!(book.price, 12.0);
        assert_eq!(book.published_year, 1965);
        assert_eq!(book.pages, Some(412));
    }

    #[test]
    fn test_decode_rejects_textual_price() {
        let err = decode::<Book>(doc! {
            "_id": 7,
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "published_year": 1965,
            "price": "12.50",
            "in_stock": false,
        })
        .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_DOCUMENT");
        assert!(err.to_string().contains("document 7"));
    }

    #[test]
    fn test_decode_accepts_whole_double_year() {
        let book: Book = decode(doc! {
            "title": "1984",
            "author": "George Orwell",
            "genre": "Dystopian",
            "published_year": 1949.0,
            "price": 9.99,
            "in_stock": true,
            "pages": 328.0,
        })
        .unwrap();

        assert_eq!(book.published_year, 1949);
        assert_eq!(book.pages, Some(328));
    }

    #[test]
    fn test_decode_rejects_fractional_year() {
        let result = decode::<Book>(doc! {
            "title": "1984",
            "author": "George Orwell",
            "genre": "Dystopian",
            "published_year": 1949.5,
            "price": 9.99,
            "in_stock": true,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_null_pages_decode_as_absent() {
        let book: Book = decode(doc! {
            "title": "Emma",
            "author": "Jane Austen",
            "genre": "Romance",
            "published_year": 1815,
            "price": 7.5,
            "in_stock": true,
            "pages": null,
        })
        .unwrap();
        assert!(book.pages.is_none());
    }

    #[test]
    fn test_decode_double_decade() {
        let group: DecadeGroup =
            decode(doc! { "decade": 1940.0, "count": 1, "titles": ["1984"] }).unwrap();
        assert_eq!(group.decade, 1940);
        assert_eq!(group.count, 1);
    }

    #[test]
    fn test_summary_rejects_extra_fields() {
        let result = decode::<BookSummary>(doc! {
            "_id": 1,
            "title": "Dune",
            "author": "Frank Herbert",
            "price": 12.5,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_book_document_skips_absent_optionals() {
        let doc = Book::new("Emma", "Jane Austen", "Romance", 1815, 7.5, true)
            .with_publisher("John Murray")
            .to_document()
            .unwrap();

        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("pages"));
        assert_eq!(doc.get_str("publisher").unwrap(), "John Murray");
        assert_eq!(doc.get_i32("published_year").unwrap(), 1815);
        assert_eq!(doc.get_f64("price").unwrap(), 7.5);
    }

    #[test]
    fn test_decode_aggregate_records() {
        let avg: GenreAveragePrice = decode(doc! { "genre": "Fiction", "averagePrice": 20.0 }).unwrap();
        assert_eq!(avg.average_price, 20.0);

        let top: AuthorBookCount = decode(doc! { "author": "A", "totalBooks": 3 }).unwrap();
        assert_eq!(top.total_books, 3);

        let decade: DecadeGroup =
            decode(doc! { "decade": 1940, "count": 2, "titles": ["1984", "Animal Farm"] }).unwrap();
        assert_eq!(decade.decade, 1940);
        assert_eq!(decade.titles.len(), 2);
    }

    #[test]
    fn test_explain_summary_with_index_scan() {
        let reply = doc! {
            "queryPlanner": {
                "winningPlan": {
                    "stage": "FETCH",
                    "inputStage": { "stage": "IXSCAN", "indexName": "title_1" }
                }
            },
            "executionStats": {
                "nReturned": 1,
                "executionTimeMillis": 0,
                "totalKeysExamined": 1,
                "totalDocsExamined": 1_i64,
            }
        };

        let summary = ExplainSummary::from_explain(&reply);
        assert_eq!(summary.winning_stage.as_deref(), Some("FETCH"));
        assert_eq!(summary.index_name.as_deref(), Some("title_1"));
        assert!(summary.used_index());
        assert_eq!(summary.documents_returned, Some(1));
        assert_eq!(summary.documents_examined, Some(1));
    }

    #[test]
    fn test_explain_summary_with_nested_query_plan() {
        let reply = doc! {
            "queryPlanner": {
                "winningPlan": {
                    "queryPlan": {
                        "stage": "OR",
                        "inputStages": [
                            { "stage": "COLLSCAN" },
                            { "stage": "IXSCAN", "indexName": "author_1_published_year_1" }
                        ]
                    },
                    "slotBasedPlan": { "slots": "" }
                }
            }
        };

        let summary = ExplainSummary::from_explain(&reply);
        assert_eq!(summary.winning_stage.as_deref(), Some("OR"));
        assert_eq!(summary.index_name.as_deref(), Some("author_1_published_year_1"));
        assert_eq!(summary.keys_examined, None);
    }

    #[test]
    fn test_explain_summary_collection_scan() {
        let reply = doc! {
            "queryPlanner": { "winningPlan": { "stage": "COLLSCAN" } },
            "executionStats": { "nReturned": 0, "totalDocsExamined": 12 }
        };

        let summary = ExplainSummary::from_explain(&reply);
        assert!(!summary.used_index());
        assert_eq!(summary.documents_examined, Some(12));
    }
}
