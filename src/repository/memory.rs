//! In-process catalog store
//!
//! All tables live behind one mutex, so every multi-record commit is applied
//! atomically. Deletes cascade the same way the database schema does.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{stale_write, AuthorStore, BookStore, LoanStore, MemberStore};
use crate::{
    error::{AppError, AppResult},
    services::ledger,
    models::{
        Author, AuthorInput, Book, BookFilter, BookInput, BookListing, Loan, LoanDetails, LoanUpdate,
        Member, MemberInput, NewLoan, SelectOption,
    },
};

#[derive(Default)]
struct Tables {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn author_name(&self, id: i32) -> String {
        self.authors.get(&id).map(Author::full_name).unwrap_or_default()
    }

    fn listing(&self, book: &Book) -> BookListing {
        BookListing::from_book(book, self.author_name(book.author_id))
    }

    fn details(&self, loan: &Loan) -> LoanDetails {
        let title = self.books.get(&loan.book_id).map(|b| b.title.clone()).unwrap_or_default();
        let member = self.members.get(&loan.member_id).map(|m| m.full_name.clone()).unwrap_or_default();
        LoanDetails::from_loan(loan, title, member)
    }

    fn check_book_version(&self, book: &Book) -> AppResult<()> {
        match self.books.get(&book.id) {
            Some(current) if current.version == book.version => Ok(()),
            _ => Err(stale_write("Book", book.id)),
        }
    }

    /// Caller must have run `check_book_version` first
    fn write_availability(&mut self, book: &Book) {
        if let Some(current) = self.books.get_mut(&book.id) {
            current.available_copies = book.available_copies;
            current.version += 1;
        }
    }

    fn remove_book(&mut self, id: i32) -> Option<Book> {
        let book = self.books.remove(&id)?;
        self.loans.retain(|_, loan| loan.book_id != id);
        Some(book)
    }

    fn check_references(&self, author_id: i32) -> AppResult<()> {
        if self.authors.contains_key(&author_id) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!("Author {} does not exist", author_id)))
        }
    }
}

/// Catalog store holding every record in memory
#[derive(Default)]
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("catalog store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AuthorStore for MemoryCatalog {
    async fn list(&self) -> AppResult<Vec<Author>> {
        let tables = self.tables()?;
        let mut authors: Vec<Author> = tables.authors.values().cloned().collect();
        authors.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(authors)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Author>> {
        Ok(self.tables()?.authors.get(&id).cloned())
    }

    async fn insert(&self, data: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.tables()?;
        let author = Author {
            id: tables.next_id(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            version: 1,
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, version: i32, data: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.tables()?;
        match tables.authors.get_mut(&id) {
            Some(author) if author.version == version => {
                author.first_name = data.first_name.clone();
                author.last_name = data.last_name.clone();
                author.version += 1;
                Ok(author.clone())
            }
            _ => Err(stale_write("Author", id)),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables()?;
        if tables.authors.remove(&id).is_none() {
            return Ok(false);
        }
        let book_ids: Vec<i32> = tables
            .books
            .values()
            .filter(|b| b.author_id == id)
            .map(|b| b.id)
            .collect();
        for book_id in book_ids {
            tables.remove_book(book_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl BookStore for MemoryCatalog {
    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<BookListing>> {
        let tables = self.tables()?;
        let mut books: Vec<BookListing> = tables
            .books
            .values()
            .filter(|b| filter.matches(b))
            .map(|b| tables.listing(b))
            .collect();
        books.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id)));
        Ok(books)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables()?.books.get(&id).cloned())
    }

    async fn get_listing(&self, id: i32) -> AppResult<Option<BookListing>> {
        let tables = self.tables()?;
        Ok(tables.books.get(&id).map(|b| tables.listing(b)))
    }

    async fn insert(&self, data: &BookInput, cover_image_path: Option<String>) -> AppResult<Book> {
        let mut tables = self.tables()?;
        tables.check_references(data.author_id)?;
        let book = Book {
            id: tables.next_id(),
            title: data.title.clone(),
            isbn: data.isbn.clone(),
            published_on: data.published_on,
            total_copies: data.total_copies,
            available_copies: data.available_copies,
            cover_image_path,
            author_id: data.author_id,
            version: 1,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(
        &self,
        id: i32,
        version: i32,
        data: &BookInput,
        cover_image_path: Option<String>,
    ) -> AppResult<Book> {
        let mut tables = self.tables()?;
        tables.check_references(data.author_id)?;
        match tables.books.get_mut(&id) {
            Some(book) if book.version == version => {
                book.title = data.title.clone();
                book.isbn = data.isbn.clone();
                book.published_on = data.published_on;
                book.total_copies = data.total_copies;
                book.available_copies = data.available_copies;
                book.cover_image_path = cover_image_path;
                book.author_id = data.author_id;
                book.version += 1;
                Ok(book.clone())
            }
            _ => Err(stale_write("Book", id)),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables()?.remove_book(id))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables()?.books.len() as i64)
    }

    async fn sum_available_copies(&self) -> AppResult<i64> {
        Ok(self
            .tables()?
            .books
            .values()
            .map(|b| b.available_copies as i64)
            .sum())
    }
}

#[async_trait]
impl MemberStore for MemoryCatalog {
    async fn list(&self) -> AppResult<Vec<Member>> {
        let mut members: Vec<Member> = self.tables()?.members.values().cloned().collect();
        members.sort_by(|a, b| (&a.full_name, a.id).cmp(&(&b.full_name, b.id)));
        Ok(members)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Member>> {
        Ok(self.tables()?.members.get(&id).cloned())
    }

    async fn insert(&self, data: &MemberInput, joined_on: DateTime<Utc>) -> AppResult<Member> {
        let mut tables = self.tables()?;
        let member = Member {
            id: tables.next_id(),
            full_name: data.full_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            joined_on,
            version: 1,
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update(&self, id: i32, version: i32, data: &MemberInput) -> AppResult<Member> {
        let mut tables = self.tables()?;
        match tables.members.get_mut(&id) {
            Some(member) if member.version == version => {
                member.full_name = data.full_name.clone();
                member.email = data.email.clone();
                member.phone = data.phone.clone();
                member.version += 1;
                Ok(member.clone())
            }
            _ => Err(stale_write("Member", id)),
        }
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tables = self.tables()?;
        if tables.members.remove(&id).is_none() {
            return Ok(false);
        }
        let open: Vec<i32> = tables
            .loans
            .values()
            .filter(|loan| loan.member_id == id && loan.returned_on.is_none())
            .map(|loan| loan.book_id)
            .collect();
        for book_id in open {
            if let Some(book) = tables.books.get_mut(&book_id) {
                ledger::increment_on_return(book);
                book.version += 1;
            }
        }
        tables.loans.retain(|_, loan| loan.member_id != id);
        Ok(true)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables()?.members.len() as i64)
    }

    async fn options(&self) -> AppResult<Vec<SelectOption>> {
        let members = MemberStore::list(self).await?;
        Ok(members.iter().map(Member::to_option).collect())
    }
}

#[async_trait]
impl LoanStore for MemoryCatalog {
    async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables()?;
        let mut loans: Vec<LoanDetails> = tables.loans.values().map(|l| tables.details(l)).collect();
        loans.sort_by(|a, b| (b.borrowed_on, b.id).cmp(&(a.borrowed_on, a.id)));
        Ok(loans)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Loan>> {
        Ok(self.tables()?.loans.get(&id).cloned())
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let tables = self.tables()?;
        Ok(tables.loans.get(&id).map(|l| tables.details(l)))
    }

    async fn commit_borrow(&self, loan: &NewLoan, book: &Book) -> AppResult<Loan> {
        let mut tables = self.tables()?;
        tables.check_book_version(book)?;
        if !tables.members.contains_key(&loan.member_id) {
            return Err(AppError::BadRequest(format!("Member {} does not exist", loan.member_id)));
        }

        tables.write_availability(book);
        let created = Loan {
            id: tables.next_id(),
            book_id: loan.book_id,
            member_id: loan.member_id,
            borrowed_on: loan.borrowed_on,
            due_on: loan.due_on,
            returned_on: None,
            version: 1,
        };
        tables.loans.insert(created.id, created.clone());
        Ok(created)
    }

    async fn commit_return(&self, loan: &Loan, returned_on: DateTime<Utc>, book: &Book) -> AppResult<Loan> {
        let mut tables = self.tables()?;
        match tables.loans.get(&loan.id) {
            Some(current) if current.version == loan.version && !current.is_returned() => {}
            _ => return Err(stale_write("Loan", loan.id)),
        }
        tables.check_book_version(book)?;

        tables.write_availability(book);
        let current = tables
            .loans
            .get_mut(&loan.id)
            .ok_or_else(|| stale_write("Loan", loan.id))?;
        current.returned_on = Some(returned_on);
        current.version += 1;
        Ok(current.clone())
    }

    async fn update(&self, id: i32, data: &LoanUpdate) -> AppResult<Loan> {
        let mut tables = self.tables()?;
        if !tables.members.contains_key(&data.member_id) {
            return Err(AppError::BadRequest(format!("Member {} does not exist", data.member_id)));
        }
        match tables.loans.get_mut(&id) {
            Some(loan) if loan.version == data.version => {
                loan.member_id = data.member_id;
                loan.borrowed_on = data.borrowed_on;
                loan.due_on = data.due_on;
                loan.version += 1;
                Ok(loan.clone())
            }
            _ => Err(stale_write("Loan", id)),
        }
    }

    async fn delete(&self, loan: &Loan, book: Option<Book>) -> AppResult<()> {
        let mut tables = self.tables()?;
        match tables.loans.get(&loan.id) {
            Some(current) if current.version == loan.version => {}
            _ => return Err(stale_write("Loan", loan.id)),
        }
        if let Some(ref book) = book {
            tables.check_book_version(book)?;
            tables.write_availability(book);
        }
        tables.loans.remove(&loan.id);
        Ok(())
    }

    async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let tables = self.tables()?;
        let mut loans: Vec<LoanDetails> = tables
            .loans
            .values()
            .filter(|l| l.is_overdue(today))
            .map(|l| tables.details(l))
            .collect();
        loans.sort_by(|a, b| (a.due_on, a.id).cmp(&(b.due_on, b.id)));
        Ok(loans)
    }

    async fn count_open(&self) -> AppResult<i64> {
        Ok(self.tables()?.loans.values().filter(|l| !l.is_returned()).count() as i64)
    }
}
