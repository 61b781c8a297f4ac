//! Book catalog endpoints
//!
//! Create and update take `multipart/form-data` so a cover image can travel
//! with the form fields. Unparseable field values are reported per field, the
//! same way validation failures are.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::NoticeResponse;
use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::{Book, BookFilter, BookInput, BookListing, BookQuery, CoverChange, CoverUpload, Notice},
};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub book: Book,
    pub notice: Notice,
}

/// Book form as read from a multipart body
#[derive(Debug, Default)]
struct BookSubmission {
    version: Option<i32>,
    input: BookInput,
    cover: Option<CoverUpload>,
    remove_image: bool,
}

fn parse_number(fields: &mut FieldErrors, name: &str, value: &str) -> Option<i32> {
    match value.trim().parse::<i32>() {
        Ok(n) => Some(n),
        Err(_) => {
            fields.add(name, format!("The value '{}' is not valid for {}.", value, name));
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1")
}

async fn read_book_form(mut multipart: Multipart) -> AppResult<BookSubmission> {
    let mut submission = BookSubmission::default();
    let mut fields = FieldErrors::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "cover_image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid cover upload: {}", e)))?;
            if !bytes.is_empty() {
                submission.cover = Some(CoverUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid field {}: {}", name, e)))?;

        match name.as_str() {
            "title" => submission.input.title = value,
            "isbn" => submission.input.isbn = value,
            "published_on" => {
                let value = value.trim();
                if !value.is_empty() {
                    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                        Ok(date) => submission.input.published_on = Some(date),
                        Err(_) => fields.add("published_on", "Publication date must be a YYYY-MM-DD date."),
                    }
                }
            }
            "total_copies" => {
                if let Some(n) = parse_number(&mut fields, "total_copies", &value) {
                    submission.input.total_copies = n;
                }
            }
            "available_copies" => {
                if let Some(n) = parse_number(&mut fields, "available_copies", &value) {
                    submission.input.available_copies = n;
                }
            }
            "author_id" => {
                if let Some(n) = parse_number(&mut fields, "author_id", &value) {
                    submission.input.author_id = n;
                }
            }
            "version" => submission.version = parse_number(&mut fields, "version", &value),
            "remove_image" => submission.remove_image = parse_flag(&value),
            other => tracing::debug!("Ignoring unknown book form field {:?}", other),
        }
    }

    fields.into_result()?;
    Ok(submission)
}

/// List books with search and filters, ordered by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookListing>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookListing>>> {
    let filter = BookFilter::from(&query);
    let books = state.services.catalog.list_books(&filter).await?;
    Ok(Json(books))
}

/// Get book by ID, with its author's name
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookListing),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<BookListing>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a book, optionally with a `cover_image` file part
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body(content = BookInput, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    let submission = read_book_form(multipart).await?;
    let (book, notice) = state
        .services
        .catalog
        .create_book(submission.input, submission.cover)
        .await?;
    Ok((StatusCode::CREATED, Json(BookResponse { book, notice })))
}

/// Update a book. A `cover_image` part replaces the cover, `remove_image=true`
/// drops it, otherwise the current cover is kept.
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = BookInput, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book was modified concurrently"),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<BookResponse>> {
    let submission = read_book_form(multipart).await?;
    let Some(version) = submission.version else {
        let mut fields = FieldErrors::new();
        fields.add("version", "The version read before editing is required.");
        return Err(AppError::Validation(fields));
    };

    let cover = if submission.remove_image {
        CoverChange::Remove
    } else if let Some(upload) = submission.cover {
        CoverChange::Replace(upload)
    } else {
        CoverChange::Keep
    };

    let (book, notice) = state
        .services
        .catalog
        .update_book(id, version, submission.input, cover)
        .await?;
    Ok(Json(BookResponse { book, notice }))
}

/// Delete a book, its loans and its cover
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = NoticeResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NoticeResponse>> {
    let notice = state.services.catalog.delete_book(id).await?;
    Ok(Json(NoticeResponse { notice }))
}
