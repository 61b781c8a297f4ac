//! Author management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AppJson, NoticeResponse};
use crate::{
    error::AppResult,
    models::{Author, AuthorInput, Notice, SelectOption},
};

/// Update author request
#[derive(Deserialize, ToSchema)]
pub struct UpdateAuthorRequest {
    /// Version read before editing
    pub version: i32,
    #[serde(flatten)]
    pub author: AuthorInput,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub author: Author,
    pub notice: Notice,
}

/// List authors ordered by last name, then first name
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    responses(
        (status = 200, description = "List of authors", body = Vec<Author>)
    )
)]
pub async fn list_authors(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Author>>> {
    let authors = state.services.catalog.list_authors().await?;
    Ok(Json(authors))
}

/// Author select options
#[utoipa::path(
    get,
    path = "/authors/options",
    tag = "authors",
    responses(
        (status = 200, description = "Author options", body = Vec<SelectOption>)
    )
)]
pub async fn author_options(State(state): State<crate::AppState>) -> AppResult<Json<Vec<SelectOption>>> {
    let options = state.services.catalog.author_options().await?;
    Ok(Json(options))
}

/// Get author by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<Author>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Create author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AppJson(input): AppJson<AuthorInput>,
) -> AppResult<(StatusCode, Json<AuthorResponse>)> {
    let (author, notice) = state.services.catalog.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(AuthorResponse { author, notice })))
}

/// Update author
#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Author updated", body = AuthorResponse),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author was modified concurrently"),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(request): AppJson<UpdateAuthorRequest>,
) -> AppResult<Json<AuthorResponse>> {
    let (author, notice) = state
        .services
        .catalog
        .update_author(id, request.version, request.author)
        .await?;
    Ok(Json(AuthorResponse { author, notice }))
}

/// Delete author and, with them, their books
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author deleted", body = NoticeResponse)
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NoticeResponse>> {
    let notice = state.services.catalog.delete_author(id).await?;
    Ok(Json(NoticeResponse { notice }))
}
