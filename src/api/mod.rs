//! HTTP handlers and router for the catalog REST endpoints

pub mod authors;
pub mod books;
pub mod dashboard;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;

use axum::{
    extract::{DefaultBodyLimit, FromRequest},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::Notice, AppState};

/// Upper bound for multipart book forms, cover image included
const MAX_FORM_BYTES: usize = 8 * 1024 * 1024;

/// JSON body extractor whose rejections use the standard error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Body returned by operations that only report a status message
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NoticeResponse {
    pub notice: Notice,
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let covers_dir = state.config.covers.root_dir.join("images").join("covers");

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Dashboard
        .route("/dashboard", get(dashboard::get_dashboard))
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route("/authors/options", get(authors::author_options))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route("/members/options", get(members::member_options))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        // Loans
        .route("/loans", get(loans::list_loans))
        .route("/loans/overdue", get(loans::list_overdue_loans))
        .route("/loans/borrow", get(loans::borrow_form).post(loans::borrow))
        .route("/loans/:id/return", post(loans::return_loan))
        .route(
            "/loans/:id",
            get(loans::get_loan).put(loans::update_loan).delete(loans::delete_loan),
        )
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/images/covers", ServeDir::new(covers_dir))
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
