//! Catalog store: persistence contracts and their implementations
//!
//! Services only talk to the traits below. `Repository::new` wires the
//! PostgreSQL implementations, `Repository::in_memory` a process-local store.
//!
//! Versioned writes (`update`, and the book row touched by loan commits) are
//! conditional on the `version` that was read. When no row matches both id and
//! version the store answers `AppError::ConcurrencyConflict`; telling a stale
//! write apart from a vanished row is left to the caller.

pub mod authors;
pub mod books;
pub mod loans;
pub mod members;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        Author, AuthorInput, Book, BookFilter, BookInput, BookListing, Loan, LoanDetails, LoanUpdate,
        Member, MemberInput, NewLoan, SelectOption,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorStore: Send + Sync {
    /// All authors ordered by last name, then first name
    async fn list(&self) -> AppResult<Vec<Author>>;
    async fn get(&self, id: i32) -> AppResult<Option<Author>>;
    async fn insert(&self, data: &AuthorInput) -> AppResult<Author>;
    async fn update(&self, id: i32, version: i32, data: &AuthorInput) -> AppResult<Author>;
    /// Deletes the author and, by cascade, its books and their loans
    async fn delete(&self, id: i32) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Books matching the filter, ordered by title
    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<BookListing>>;
    async fn get(&self, id: i32) -> AppResult<Option<Book>>;
    async fn get_listing(&self, id: i32) -> AppResult<Option<BookListing>>;
    async fn insert(&self, data: &BookInput, cover_image_path: Option<String>) -> AppResult<Book>;
    async fn update(
        &self,
        id: i32,
        version: i32,
        data: &BookInput,
        cover_image_path: Option<String>,
    ) -> AppResult<Book>;
    /// Deletes the book and its loans, returning the removed row
    async fn delete(&self, id: i32) -> AppResult<Option<Book>>;
    async fn count(&self) -> AppResult<i64>;
    async fn sum_available_copies(&self) -> AppResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// All members ordered by full name
    async fn list(&self) -> AppResult<Vec<Member>>;
    async fn get(&self, id: i32) -> AppResult<Option<Member>>;
    async fn insert(&self, data: &MemberInput, joined_on: DateTime<Utc>) -> AppResult<Member>;
    async fn update(&self, id: i32, version: i32, data: &MemberInput) -> AppResult<Member>;
    /// Remove the member and their loans. Each open loan puts its copy back
    /// (capped at the book's total) in the same commit.
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn count(&self) -> AppResult<i64>;
    /// `(id, full name)` pairs ordered by full name
    async fn options(&self) -> AppResult<Vec<SelectOption>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<LoanDetails>>;
    async fn get(&self, id: i32) -> AppResult<Option<Loan>>;
    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>>;
    /// Insert an open loan and write `book.available_copies` in one commit.
    /// The book write is conditional on `book.version`.
    async fn commit_borrow(&self, loan: &NewLoan, book: &Book) -> AppResult<Loan>;
    /// Mark the loan returned and write `book.available_copies` in one commit.
    /// Both writes are conditional on the versions read.
    async fn commit_return(&self, loan: &Loan, returned_on: DateTime<Utc>, book: &Book) -> AppResult<Loan>;
    async fn update(&self, id: i32, data: &LoanUpdate) -> AppResult<Loan>;
    /// Remove the loan; when `book` is given its availability is written in
    /// the same commit
    async fn delete(&self, loan: &Loan, book: Option<Book>) -> AppResult<()>;
    /// Open loans due strictly before `today`, soonest due first
    async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>>;
    async fn count_open(&self) -> AppResult<i64>;
}

/// Handles to every catalog store, shared by the services
#[derive(Clone)]
pub struct Repository {
    pub authors: Arc<dyn AuthorStore>,
    pub books: Arc<dyn BookStore>,
    pub members: Arc<dyn MemberStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: Arc::new(authors::AuthorsRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            members: Arc::new(members::MembersRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let catalog = Arc::new(memory::MemoryCatalog::default());
        Self {
            authors: catalog.clone(),
            books: catalog.clone(),
            members: catalog.clone(),
            loans: catalog,
        }
    }
}

/// Error for a versioned write that matched no row
pub(crate) fn stale_write(entity: &str, id: i32) -> crate::error::AppError {
    crate::error::AppError::ConcurrencyConflict(format!(
        "{} {} was modified or deleted by another request",
        entity, id
    ))
}
