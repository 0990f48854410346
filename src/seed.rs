use anyhow::Result;
use tracing::info;

use crate::db::BookStore;
use crate::models::Book;

/// A small library that gives every catalog query something to find.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new("The Hobbit", "J.R.R. Tolkien", "Fantasy", 1937, 14.99, true)
            .with_pages(310)
            .with_publisher("George Allen & Unwin"),
        Book::new("The Fellowship of the Ring", "J.R.R. Tolkien", "Fantasy", 1954, 18.50, true)
            .with_pages(423),
        Book::new("A Game of Thrones", "George R.R. Martin", "Fantasy", 1996, 22.00, false)
            .with_publisher("Bantam Spectra"),
        Book::new("1984", "George Orwell", "Dystopian", 1949, 9.99, true)
            .with_pages(328)
            .with_publisher("Secker & Warburg"),
        Book::new("Animal Farm", "George Orwell", "Political Satire", 1945, 7.49, true).with_pages(112),
        Book::new("The Alchemist", "Paulo Coelho", "Fiction", 1988, 11.25, true),
        Book::new("To Kill a Mockingbird", "Harper Lee", "Fiction", 1960, 10.99, false).with_pages(281),
        Book::new("The Great Gatsby", "F. Scott Fitzgerald", "Fiction", 1925, 8.75, true),
        Book::new("The Night Circus", "Erin Morgenstern", "Fantasy", 2011, 13.40, true),
        Book::new("The Martian", "Andy Weir", "Science Fiction", 2011, 15.20, true)
            .with_publisher("Crown"),
        Book::new("Where the Crawdads Sing", "Delia Owens", "Fiction", 2018, 16.00, true),
        Book::new("Project Hail Mary", "Andy Weir", "Science Fiction", 2021, 19.99, false),
    ]
}

/// Inserts the sample library and returns how many books were written.
pub async fn seed_books(store: &dyn BookStore) -> Result<u64> {
    let docs = sample_books()
        .iter()
        .map(Book::to_document)
        .collect::<Result<Vec<_>, _>>()?;

    let inserted = store.insert_many(docs).await?;
    info!("🌱 Seeded {} books", inserted);
    Ok(inserted)
}
