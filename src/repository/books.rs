//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{stale_write, BookStore};
use crate::{
    error::AppResult,
    models::book::{Book, BookFilter, BookInput, BookListing},
};

const BOOK_COLUMNS: &str = "id, title, isbn, published_on, total_copies, available_copies, \
                            cover_image_path, author_id, version";

const LISTING_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, b.published_on, b.total_copies, b.available_copies,
           b.cover_image_path, b.author_id,
           a.first_name || ' ' || a.last_name AS author_name,
           b.version
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

/// Escape LIKE wildcards so the search term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<BookListing>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(LISTING_SELECT);
        builder.push(" WHERE 1=1");

        if let Some(ref term) = filter.search {
            let pattern = like_pattern(term);
            builder
                .push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.isbn ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(author_id) = filter.author_id {
            builder.push(" AND b.author_id = ").push_bind(author_id);
        }

        if filter.available_only {
            builder.push(" AND b.available_copies > 0");
        }

        builder.push(" ORDER BY b.title, b.id");

        let books = builder
            .build_query_as::<BookListing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn get_listing(&self, id: i32) -> AppResult<Option<BookListing>> {
        let book = sqlx::query_as::<_, BookListing>(&format!("{} WHERE b.id = $1", LISTING_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn insert(&self, data: &BookInput, cover_image_path: Option<String>) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, isbn, published_on, total_copies, available_copies,
                               cover_image_path, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(&data.isbn)
        .bind(data.published_on)
        .bind(data.total_copies)
        .bind(data.available_copies)
        .bind(cover_image_path)
        .bind(data.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    async fn update(
        &self,
        id: i32,
        version: i32,
        data: &BookInput,
        cover_image_path: Option<String>,
    ) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = $1, isbn = $2, published_on = $3, total_copies = $4,
                available_copies = $5, cover_image_path = $6, author_id = $7,
                version = version + 1
            WHERE id = $8 AND version = $9
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(&data.isbn)
        .bind(data.published_on)
        .bind(data.total_copies)
        .bind(data.available_copies)
        .bind(cover_image_path)
        .bind(data.author_id)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| stale_write("Book", id))
    }

    async fn delete(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("DELETE FROM books WHERE id = $1 RETURNING {}", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn sum_available_copies(&self) -> AppResult<i64> {
        let sum: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(available_copies), 0)::bigint FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(sum)
    }
}
