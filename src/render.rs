//! Console rendering of catalog results.

use std::fmt::Write;

use crate::models::{Book, BookSummary, ExplainSummary};
use crate::runner::{Operation, Outcome};

pub fn format_outcome(operation: Operation, outcome: &Outcome) -> String {
    let mut out = format!("== {} ==\n", operation.name());

    match outcome {
        Outcome::Books(books) => {
            let _ = writeln!(out, "{} book(s)", books.len());
            for book in books {
                let _ = writeln!(out, "  - {}", format_book(book));
            }
        }
        Outcome::Summaries(summaries) => {
            let _ = writeln!(out, "{} book(s)", summaries.len());
            for summary in summaries {
                let _ = writeln!(out, "  - {}", format_summary(summary));
            }
        }
        Outcome::Modified(count) => {
            let _ = writeln!(out, "modified {} document(s)", count);
        }
        Outcome::Deleted(count) => {
            let _ = writeln!(out, "deleted {} document(s)", count);
        }
        Outcome::AveragePrice(Some(average)) => {
            let _ = writeln!(
                out,
                "{}: average price ${:.2}",
                average.genre, average.average_price
            );
        }
        Outcome::TopAuthor(Some(top)) => {
            let _ = writeln!(out, "{} with {} book(s)", top.author, top.total_books);
        }
        Outcome::AveragePrice(None) | Outcome::TopAuthor(None) => {
            out.push_str("no matching books\n");
        }
        Outcome::Decades(groups) => {
            if groups.is_empty() {
                out.push_str("no matching books\n");
            }
            for group in groups {
                let _ = writeln!(
                    out,
                    "  {}s: {} book(s) - {}",
                    group.decade,
                    group.count,
                    group.titles.join(", ")
                );
            }
        }
        Outcome::IndexCreated(name) => {
            let _ = writeln!(out, "index ready: {}", name);
        }
        Outcome::Plan(summary) => {
            out.push_str(&format_plan(summary));
        }
    }

    out
}

fn format_book(book: &Book) -> String {
    let mut line = format!(
        "{} by {} ({}, {}) ${:.2} [{}]",
        book.title,
        book.author,
        book.genre,
        book.published_year,
        book.price,
        if book.in_stock { "in stock" } else { "out of stock" }
    );
    if let Some(pages) = book.pages {
        let _ = write!(line, ", {} pages", pages);
    }
    if let Some(publisher) = &book.publisher {
        let _ = write!(line, ", {}", publisher);
    }
    line
}

fn format_summary(summary: &BookSummary) -> String {
    format!("{} by {}: ${:.2}", summary.title, summary.author, summary.price)
}

fn format_plan(summary: &ExplainSummary) -> String {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => format!("{}\n", json),
        Err(_) => format!("{:?}\n", summary),
    }
}
