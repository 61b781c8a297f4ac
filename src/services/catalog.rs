//! Catalog management service: authors, books, members and their listings

use std::sync::Arc;

use chrono::Utc;

use super::{covers::CoverStore, not_found, settle_conflict};
use crate::{
    error::{AppResult, FieldErrors},
    models::{
        Author, AuthorInput, Book, BookFilter, BookInput, BookListing, CoverChange, CoverUpload, Member,
        MemberInput, Notice, SelectOption,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    covers: Arc<dyn CoverStore>,
}

impl CatalogService {
    pub fn new(repository: Repository, covers: Arc<dyn CoverStore>) -> Self {
        Self { repository, covers }
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    /// Books matching the filter, ordered by title
    pub async fn list_books(&self, filter: &BookFilter) -> AppResult<Vec<BookListing>> {
        self.repository.books.list(filter).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookListing> {
        self.repository
            .books
            .get_listing(id)
            .await?
            .ok_or_else(|| not_found("Book", id))
    }

    async fn check_book(&self, input: &BookInput) -> AppResult<()> {
        let mut errors = input.check();
        if self.repository.authors.get(input.author_id).await?.is_none() {
            errors.add("author_id", "Select an existing author.");
        }
        errors.into_result()
    }

    /// Create a book, storing its cover first when one is uploaded
    pub async fn create_book(&self, input: BookInput, cover: Option<CoverUpload>) -> AppResult<(Book, Notice)> {
        let input = input.normalized();
        self.check_book(&input).await?;

        let cover_image_path = match cover {
            Some(ref upload) => self.covers.save(upload).await?,
            None => None,
        };

        let book = self.repository.books.insert(&input, cover_image_path).await?;
        tracing::info!("Created book id={} title={:?}", book.id, book.title);
        let notice = Notice::success(format!("'{}' was added to the catalog.", book.title));
        Ok((book, notice))
    }

    /// Update a book. The old cover file is dropped only once the new row is
    /// committed.
    pub async fn update_book(
        &self,
        id: i32,
        version: i32,
        input: BookInput,
        cover: CoverChange,
    ) -> AppResult<(Book, Notice)> {
        let input = input.normalized();
        self.check_book(&input).await?;

        let existing = self
            .repository
            .books
            .get(id)
            .await?
            .ok_or_else(|| not_found("Book", id))?;

        let (new_path, saved) = match cover {
            CoverChange::Keep => (existing.cover_image_path.clone(), None),
            CoverChange::Remove => (None, None),
            CoverChange::Replace(ref upload) => {
                let saved = self.covers.save(upload).await?;
                (saved.clone(), saved)
            }
        };

        let result = self
            .repository
            .books
            .update(id, version, &input, new_path.clone())
            .await;
        let result = settle_conflict(result, "Book", id, || async {
            Ok(self.repository.books.get(id).await?.is_some())
        })
        .await;

        let book = match result {
            Ok(book) => book,
            Err(e) => {
                if let Some(ref orphan) = saved {
                    if let Err(cleanup) = self.covers.delete(orphan).await {
                        tracing::warn!("Could not remove unused cover {}: {}", orphan, cleanup);
                    }
                }
                return Err(e);
            }
        };

        // The row is committed; a leftover file must not turn this into a failure
        if let Some(ref old) = existing.cover_image_path {
            if new_path.as_deref() != Some(old.as_str()) {
                self.drop_cover(old).await;
            }
        }

        tracing::info!("Updated book id={} version={}", book.id, book.version);
        let notice = Notice::success(format!("'{}' was updated.", book.title));
        Ok((book, notice))
    }

    /// Delete a book, its loans and its cover. Deleting a missing book is a no-op.
    pub async fn delete_book(&self, id: i32) -> AppResult<Notice> {
        match self.repository.books.delete(id).await? {
            Some(book) => {
                if let Some(ref cover) = book.cover_image_path {
                    self.drop_cover(cover).await;
                }
                tracing::info!("Deleted book id={}", id);
                Ok(Notice::success(format!("'{}' was removed from the catalog.", book.title)))
            }
            None => Ok(Notice::info("The book no longer exists.")),
        }
    }

    /// Remove a cover no committed row refers to any more
    async fn drop_cover(&self, reference: &str) {
        if let Err(e) = self.covers.delete(reference).await {
            tracing::warn!("Could not remove cover {}: {}", reference, e);
        }
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    /// Authors ordered by last name, then first name
    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn author_options(&self) -> AppResult<Vec<SelectOption>> {
        let authors = self.repository.authors.list().await?;
        Ok(authors.iter().map(Author::to_option).collect())
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository
            .authors
            .get(id)
            .await?
            .ok_or_else(|| not_found("Author", id))
    }

    pub async fn create_author(&self, input: AuthorInput) -> AppResult<(Author, Notice)> {
        let input = input.normalized();
        validate(&input)?;

        let author = self.repository.authors.insert(&input).await?;
        tracing::info!("Created author id={}", author.id);
        Ok((author.clone(), Notice::success(format!("{} was added.", author.full_name()))))
    }

    pub async fn update_author(&self, id: i32, version: i32, input: AuthorInput) -> AppResult<(Author, Notice)> {
        let input = input.normalized();
        validate(&input)?;

        let result = self.repository.authors.update(id, version, &input).await;
        let author = settle_conflict(result, "Author", id, || async {
            Ok(self.repository.authors.get(id).await?.is_some())
        })
        .await?;

        Ok((author.clone(), Notice::success(format!("{} was updated.", author.full_name()))))
    }

    /// Delete an author together with their books
    pub async fn delete_author(&self, id: i32) -> AppResult<Notice> {
        if self.repository.authors.delete(id).await? {
            tracing::info!("Deleted author id={}", id);
            Ok(Notice::success("Author deleted."))
        } else {
            Ok(Notice::info("The author no longer exists."))
        }
    }

    // =========================================================================
    // MEMBERS
    // =========================================================================

    /// Members ordered by full name
    pub async fn list_members(&self) -> AppResult<Vec<Member>> {
        self.repository.members.list().await
    }

    /// `(id, full name)` pairs ordered by full name
    pub async fn member_options(&self) -> AppResult<Vec<SelectOption>> {
        self.repository.members.options().await
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository
            .members
            .get(id)
            .await?
            .ok_or_else(|| not_found("Member", id))
    }

    pub async fn create_member(&self, input: MemberInput) -> AppResult<(Member, Notice)> {
        let input = input.normalized();
        input.check().into_result()?;

        let member = self.repository.members.insert(&input, Utc::now()).await?;
        tracing::info!("Created member id={}", member.id);
        Ok((member.clone(), Notice::success(format!("{} joined the library.", member.full_name))))
    }

    pub async fn update_member(&self, id: i32, version: i32, input: MemberInput) -> AppResult<(Member, Notice)> {
        let input = input.normalized();
        input.check().into_result()?;

        let result = self.repository.members.update(id, version, &input).await;
        let member = settle_conflict(result, "Member", id, || async {
            Ok(self.repository.members.get(id).await?.is_some())
        })
        .await?;

        Ok((member.clone(), Notice::success(format!("{} was updated.", member.full_name))))
    }

    /// Delete a member together with their loan history. Copies held on open
    /// loans go back on the shelf in the same commit.
    pub async fn delete_member(&self, id: i32) -> AppResult<Notice> {
        if self.repository.members.delete(id).await? {
            tracing::info!("Deleted member id={}", id);
            Ok(Notice::success("Member deleted."))
        } else {
            Ok(Notice::info("The member no longer exists."))
        }
    }
}

fn validate<T: validator::Validate>(input: &T) -> AppResult<()> {
    match input.validate() {
        Ok(()) => Ok(()),
        Err(e) => FieldErrors::from(e).into_result(),
    }
}
