//! HTTP behaviour of the router over the in-memory store

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_catalog::api;

use crate::common::{date, seed_book, seed_member, state_on};

const BOUNDARY: &str = "catalog-test-boundary";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(method: &str, uri: &str, fields: &[(&str, &str)], cover: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = cover {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"cover_image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = api::router(state_on(date(2024, 1, 10)));
    let (status, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, get("/api/v1/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_borrow_and_return_over_http() {
    let state = state_on(date(2024, 1, 10));
    let book = seed_book(&state.services, "The Hobbit", "978-0547928227", 1).await;
    let member = seed_member(&state.services, "Bilbo Baggins").await;
    let app = api::router(state);

    let (status, form) = send(&app, get(&format!("/api/v1/loans/borrow?book_id={}", book.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["due_on"], "2024-01-24");

    let request = json!({
        "book_id": book.id,
        "member_id": member.id,
        "borrowed_on": "2024-01-10",
        "due_on": "2024-01-24"
    });
    let (status, body) = send(&app, json_request("POST", "/api/v1/loans/borrow", request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notice"]["level"], "success");
    let loan_id = body["loan"]["id"].as_i64().unwrap();

    // No copies left: the form comes back with a form-level message
    let (status, body) = send(&app, json_request("POST", "/api/v1/loans/borrow", request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["available_copies"], 0);
    assert!(body["errors"]["_form"].is_array());

    let uri = format!("/api/v1/loans/{}/return", loan_id);
    let (status, body) = send(&app, json_request("POST", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "returned");
    assert_eq!(body["notice"]["level"], "success");

    let (status, body) = send(&app, json_request("POST", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "info");

    let (_, book) = send(&app, get(&format!("/api/v1/books/{}", book.id))).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
async fn test_borrow_form_without_copies_is_rejected() {
    let state = state_on(date(2024, 1, 10));
    let book = seed_book(&state.services, "The Hobbit", "978-0547928227", 1).await;
    let member = seed_member(&state.services, "Bilbo Baggins").await;
    state
        .services
        .loans
        .borrow(&library_catalog::models::BorrowRequest {
            book_id: book.id,
            member_id: Some(member.id),
            borrowed_on: date(2024, 1, 10),
            due_on: date(2024, 1, 24),
        })
        .await
        .unwrap();
    let app = api::router(state);

    let (status, body) = send(&app, get(&format!("/api/v1/loans/borrow?book_id={}", book.id))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 7);
}

#[tokio::test]
async fn test_missing_entities_are_404() {
    let app = api::router(state_on(date(2024, 1, 10)));
    for uri in ["/api/v1/books/999", "/api/v1/authors/999", "/api/v1/members/999", "/api/v1/loans/999"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"], "NoSuchEntity");
    }

    let (status, _) = send(&app, json_request("POST", "/api/v1/loans/999/return", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreadable_json_bodies_use_the_error_body() {
    let state = state_on(date(2024, 1, 10));
    let book = seed_book(&state.services, "The Hobbit", "978-0547928227", 1).await;
    let member = seed_member(&state.services, "Bilbo Baggins").await;
    let app = api::router(state);

    let request = json!({
        "book_id": book.id,
        "member_id": member.id,
        "borrowed_on": "2024-01-10",
        "due_on": "not-a-date"
    });
    let (status, body) = send(&app, json_request("POST", "/api/v1/loans/borrow", request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 18);
    assert_eq!(body["error"], "BadValue");
    assert!(body["fields"]["due_on"].is_array());

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/v1/members")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"full_name\": "))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (_, book) = send(&app, get(&format!("/api/v1/books/{}", book.id))).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
async fn test_create_member_validation_errors_are_keyed_by_field() {
    let app = api::router(state_on(date(2024, 1, 10)));
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/members",
            json!({ "full_name": "", "email": "nope", "phone": "call me" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    for field in ["full_name", "email", "phone"] {
        assert!(body["fields"][field].is_array(), "missing {}", field);
    }
}

#[tokio::test]
async fn test_book_multipart_create_update_and_delete() {
    let state = state_on(date(2024, 1, 10));
    let covers_root = state.config.covers.root_dir.clone();
    let author = seed_book(&state.services, "Seed", "0", 1).await.author_id;
    let app = api::router(state);
    let author_id = author.to_string();

    let (status, body) = send(
        &app,
        multipart_request(
            "POST",
            "/api/v1/books",
            &[
                ("title", "The Silmarillion"),
                ("isbn", "978-0544338012"),
                ("published_on", "1977-09-15"),
                ("total_copies", "2"),
                ("available_copies", "2"),
                ("author_id", &author_id),
            ],
            Some(("silmarillion.PNG", &b"\x89PNG"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["book"]["id"].as_i64().unwrap();
    let version = body["book"]["version"].as_i64().unwrap().to_string();
    let cover = body["book"]["cover_image_path"].as_str().unwrap().to_string();
    assert!(cover.starts_with("/images/covers/") && cover.ends_with(".png"));
    assert!(covers_root.join(cover.trim_start_matches('/')).exists());

    // Stale or missing version
    let (status, body) = send(
        &app,
        multipart_request(
            "PUT",
            &format!("/api/v1/books/{}", id),
            &[("title", "The Silmarillion"), ("isbn", "978-0544338012"), ("total_copies", "2"), ("available_copies", "2"), ("author_id", &author_id)],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["version"].is_array());

    let (status, body) = send(
        &app,
        multipart_request(
            "PUT",
            &format!("/api/v1/books/{}", id),
            &[
                ("version", &version),
                ("title", "The Silmarillion"),
                ("isbn", "978-0544338012"),
                ("total_copies", "3"),
                ("available_copies", "3"),
                ("author_id", &author_id),
                ("remove_image", "true"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["book"]["cover_image_path"].is_null());
    assert_eq!(body["book"]["total_copies"], 3);
    assert!(!covers_root.join(cover.trim_start_matches('/')).exists());

    let (status, _) = send(
        &app,
        multipart_request(
            "PUT",
            &format!("/api/v1/books/{}", id),
            &[
                ("version", &version),
                ("title", "The Silmarillion"),
                ("isbn", "978-0544338012"),
                ("total_copies", "3"),
                ("available_copies", "3"),
                ("author_id", &author_id),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/books/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "success");

    let _ = std::fs::remove_dir_all(covers_root);
}

#[tokio::test]
async fn test_book_form_reports_unparseable_numbers() {
    let app = api::router(state_on(date(2024, 1, 10)));
    let (status, body) = send(
        &app,
        multipart_request(
            "POST",
            "/api/v1/books",
            &[("title", "Dune"), ("isbn", "1"), ("total_copies", "many"), ("author_id", "1")],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["total_copies"].is_array());
}

#[tokio::test]
async fn test_dashboard_counts() {
    let state = state_on(date(2024, 2, 1));
    let book = seed_book(&state.services, "The Hobbit", "978-0547928227", 2).await;
    let member = seed_member(&state.services, "Bilbo Baggins").await;
    state
        .services
        .loans
        .borrow(&library_catalog::models::BorrowRequest {
            book_id: book.id,
            member_id: Some(member.id),
            borrowed_on: date(2023, 12, 1),
            due_on: date(2024, 1, 1),
        })
        .await
        .unwrap();
    let app = api::router(state);

    let (status, body) = send(&app, get("/api/v1/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_books"], 1);
    assert_eq!(body["available_copies"], 1);
    assert_eq!(body["active_loans"], 1);
    assert_eq!(body["overdue_count"], 1);
    assert_eq!(body["overdue_loans"][0]["member_name"], "Bilbo Baggins");

    let (_, overdue) = send(&app, get("/api/v1/loans/overdue")).await;
    assert_eq!(overdue.as_array().unwrap().len(), 1);
}
