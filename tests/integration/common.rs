//! Shared fixtures over the in-memory store

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use library_catalog::{
    config::AppConfig,
    models::{AuthorInput, Book, BookInput, Member, MemberInput},
    repository::Repository,
    services::{clock::FixedClock, covers::FsCoverStore, Services},
    AppState,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("library-catalog-{}", uuid::Uuid::new_v4()))
}

/// Services over a fresh in-memory store, with today pinned to `today`
pub fn services_on(today: NaiveDate) -> Services {
    Services::new(
        Repository::in_memory(),
        Arc::new(FsCoverStore::new(temp_root())),
        Arc::new(FixedClock::on(today)),
        &AppConfig::default().loans,
    )
}

pub fn state_on(today: NaiveDate) -> AppState {
    let mut config = AppConfig::default();
    config.covers.root_dir = temp_root();
    let services = Services::new(
        Repository::in_memory(),
        Arc::new(FsCoverStore::new(config.covers.root_dir.clone())),
        Arc::new(FixedClock::on(today)),
        &config.loans,
    );
    AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    }
}

pub async fn seed_book(services: &Services, title: &str, isbn: &str, copies: i32) -> Book {
    let (author, _) = services
        .catalog
        .create_author(AuthorInput {
            first_name: "J.R.R.".into(),
            last_name: "Tolkien".into(),
        })
        .await
        .unwrap();

    let (book, _) = services
        .catalog
        .create_book(
            BookInput {
                title: title.into(),
                isbn: isbn.into(),
                published_on: None,
                total_copies: copies,
                available_copies: copies,
                author_id: author.id,
            },
            None,
        )
        .await
        .unwrap();
    book
}

pub async fn seed_member(services: &Services, name: &str) -> Member {
    let (member, _) = services
        .catalog
        .create_member(MemberInput {
            full_name: name.into(),
            email: format!("{}@shire.example", name.to_lowercase().replace(' ', ".")),
            phone: None,
        })
        .await
        .unwrap();
    member
}
