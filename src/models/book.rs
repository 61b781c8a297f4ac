//! Book model, listing rows and search filters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::FieldErrors;

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub published_on: Option<NaiveDate>,
    pub total_copies: i32,
    /// Always within `0..=total_copies`
    pub available_copies: i32,
    /// Relative reference returned by the cover store
    pub cover_image_path: Option<String>,
    pub author_id: i32,
    pub version: i32,
}

impl Book {
    pub fn has_available_copies(&self) -> bool {
        self.available_copies > 0
    }
}

/// Book row joined with its author's display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookListing {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub published_on: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub cover_image_path: Option<String>,
    pub author_id: i32,
    pub author_name: String,
    pub version: i32,
}

impl BookListing {
    pub fn from_book(book: &Book, author_name: impl Into<String>) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            published_on: book.published_on,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            cover_image_path: book.cover_image_path.clone(),
            author_id: book.author_id,
            author_name: author_name.into(),
            version: book.version,
        }
    }
}

/// Create/update book form
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 160, message = "Title is required and must be at most 160 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 32, message = "ISBN is required and must be at most 32 characters."))]
    pub isbn: String,
    pub published_on: Option<NaiveDate>,
    #[validate(range(min = 1, max = 500, message = "Total copies must be between 1 and 500."))]
    pub total_copies: i32,
    #[validate(range(min = 0, message = "Available copies cannot be negative."))]
    pub available_copies: i32,
    pub author_id: i32,
}

impl BookInput {
    /// Field validation plus the copy-count cross check
    pub fn check(&self) -> FieldErrors {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        if self.available_copies > self.total_copies {
            errors.add("available_copies", "Available copies cannot exceed total copies.");
        }
        errors
    }

    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            ..self
        }
    }
}

/// An uploaded cover image
#[derive(Debug, Clone)]
pub struct CoverUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What to do with a book's cover on update
#[derive(Debug, Clone, Default)]
pub enum CoverChange {
    #[default]
    Keep,
    Remove,
    Replace(CoverUpload),
}

/// Query string for the book listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring matched against title or ISBN
    pub query: Option<String>,
    pub author_id: Option<i32>,
    pub available_only: Option<bool>,
}

/// Normalized book filter handed to the catalog store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub search: Option<String>,
    pub author_id: Option<i32>,
    pub available_only: bool,
}

impl BookFilter {
    pub fn new(search: Option<&str>, author_id: Option<i32>, available_only: bool) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { search, author_id, available_only }
    }

    /// In-process evaluation, equivalent to the SQL the postgres store builds
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref term) = self.search {
            let term = term.to_lowercase();
            if !book.title.to_lowercase().contains(&term) && !book.isbn.to_lowercase().contains(&term) {
                return false;
            }
        }
        if let Some(author_id) = self.author_id {
            if book.author_id != author_id {
                return false;
            }
        }
        !self.available_only || book.has_available_copies()
    }
}

impl From<&BookQuery> for BookFilter {
    fn from(query: &BookQuery) -> Self {
        BookFilter::new(
            query.query.as_deref(),
            query.author_id,
            query.available_only.unwrap_or(false),
        )
    }
}
