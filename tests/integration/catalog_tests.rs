//! Loan ledger and catalog behaviour over the in-memory store

use library_catalog::{
    error::FORM_LEVEL,
    models::{AuthorInput, BookFilter, BookInput, BorrowRequest, LoanUpdate, NoticeLevel, ReturnOutcome},
    services::loans::BorrowSubmission,
    AppError,
};

use crate::common::{date, seed_book, seed_member, services_on};

fn borrow_request(book_id: i32, member_id: i32) -> BorrowRequest {
    BorrowRequest {
        book_id,
        member_id: Some(member_id),
        borrowed_on: date(2024, 1, 10),
        due_on: date(2024, 1, 24),
    }
}

#[tokio::test]
async fn test_fourth_borrow_of_three_copies_fails() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 3).await;
    let member = seed_member(&services, "Bilbo Baggins").await;

    for expected in [2, 1, 0] {
        services.loans.borrow(&borrow_request(book.id, member.id)).await.unwrap();
        let current = services.catalog.get_book(book.id).await.unwrap();
        assert_eq!(current.available_copies, expected);
    }

    let err = services
        .loans
        .borrow(&borrow_request(book.id, member.id))
        .await
        .unwrap_err();
    match err {
        AppError::NoCopiesAvailable(fields) => assert!(fields.contains(FORM_LEVEL)),
        other => panic!("expected NoCopiesAvailable, got {:?}", other),
    }

    assert_eq!(services.loans.list_loans().await.unwrap().len(), 3);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 0);
}

#[tokio::test]
async fn test_borrow_with_due_before_borrowed_creates_nothing() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 2).await;
    let member = seed_member(&services, "Bilbo Baggins").await;

    let mut request = borrow_request(book.id, member.id);
    request.due_on = request.borrowed_on;

    let err = services.loans.borrow(&request).await.unwrap_err();
    match err {
        AppError::Validation(fields) => assert!(fields.contains("due_on")),
        other => panic!("expected Validation, got {:?}", other),
    }
    assert!(services.loans.list_loans().await.unwrap().is_empty());
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);
}

#[tokio::test]
async fn test_rejected_submission_keeps_entered_values() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;
    seed_member(&services, "Bilbo Baggins").await;

    let request = BorrowRequest {
        book_id: book.id,
        member_id: None,
        borrowed_on: date(2024, 1, 10),
        due_on: date(2024, 1, 9),
    };

    let BorrowSubmission::Rejected(form) = services.loans.submit_borrow(request).await.unwrap() else {
        panic!("submission should be rejected");
    };
    assert_eq!(form.book_title, "The Hobbit");
    assert_eq!(form.due_on, date(2024, 1, 9));
    assert_eq!(form.member_options.len(), 1);
    assert!(form.errors.contains("member_id"));
    assert!(form.errors.contains("due_on"));
}

#[tokio::test]
async fn test_borrow_form_defaults() {
    let services = services_on(date(2024, 3, 1));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;

    let form = services.loans.borrow_form(book.id).await.unwrap();
    assert_eq!(form.borrowed_on, date(2024, 3, 1));
    assert_eq!(form.due_on, date(2024, 3, 15));
    assert_eq!(form.member_id, None);
    assert!(form.errors.is_empty());

    assert!(matches!(
        services.loans.borrow_form(book.id + 1000).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_return_twice_is_a_noop() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;
    let member = seed_member(&services, "Bilbo Baggins").await;
    let (loan, _) = services.loans.borrow(&borrow_request(book.id, member.id)).await.unwrap();

    let first = services.loans.return_loan(loan.id).await.unwrap();
    assert!(matches!(first, ReturnOutcome::Returned(_)));
    assert_eq!(first.notice().level, NoticeLevel::Success);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 1);

    let second = services.loans.return_loan(loan.id).await.unwrap();
    assert!(matches!(second, ReturnOutcome::AlreadyReturned(_)));
    assert_eq!(second.notice().level, NoticeLevel::Info);
    assert_eq!(second.loan().returned_on, first.loan().returned_on);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_overdue_until_returned() {
    let services = services_on(date(2024, 2, 1));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 3).await;
    let member = seed_member(&services, "Bilbo Baggins").await;

    let late = BorrowRequest {
        book_id: book.id,
        member_id: Some(member.id),
        borrowed_on: date(2023, 12, 15),
        due_on: date(2024, 1, 1),
    };
    let later = BorrowRequest {
        due_on: date(2024, 1, 20),
        ..late.clone()
    };
    let current = BorrowRequest {
        due_on: date(2024, 2, 1),
        ..late.clone()
    };
    let (second, _) = services.loans.borrow(&later).await.unwrap();
    let (first, _) = services.loans.borrow(&late).await.unwrap();
    services.loans.borrow(&current).await.unwrap();

    let overdue = services.dashboard.list_overdue_loans().await.unwrap();
    let ids: Vec<i32> = overdue.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(overdue[0].book_title, "The Hobbit");
    assert_eq!(overdue[0].member_name, "Bilbo Baggins");

    services.loans.return_loan(first.id).await.unwrap();
    let overdue = services.dashboard.list_overdue_loans().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, second.id);

    let summary = services.dashboard.summary().await.unwrap();
    assert_eq!(summary.total_books, 1);
    assert_eq!(summary.total_members, 1);
    assert_eq!(summary.active_loans, 2);
    assert_eq!(summary.available_copies, 1);
    assert_eq!(summary.overdue_count, 1);
}

#[tokio::test]
async fn test_search_matches_title_or_isbn_case_insensitively() {
    let services = services_on(date(2024, 1, 10));
    let tolkien = seed_book(&services, "The Tolkien Reader", "978-0345345066", 1).await;
    let by_isbn = seed_book(&services, "Unfinished Tales", "TOLKIEN-0001", 1).await;
    seed_book(&services, "Beowulf", "978-0393320978", 1).await;

    let books = services
        .catalog
        .list_books(&BookFilter::new(Some("  tolkien "), None, false))
        .await
        .unwrap();
    let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![tolkien.id, by_isbn.id]);
    assert_eq!(books[0].author_name, "J.R.R. Tolkien");

    let all = services.catalog.list_books(&BookFilter::new(Some("   "), None, false)).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "Beowulf");
}

#[tokio::test]
async fn test_available_only_filter() {
    let services = services_on(date(2024, 1, 10));
    let lent = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;
    let shelf = seed_book(&services, "The Silmarillion", "978-0544338012", 1).await;
    let member = seed_member(&services, "Bilbo Baggins").await;
    services.loans.borrow(&borrow_request(lent.id, member.id)).await.unwrap();

    let books = services
        .catalog
        .list_books(&BookFilter::new(None, None, true))
        .await
        .unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, shelf.id);
}

#[tokio::test]
async fn test_deleting_open_loan_restores_a_copy() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 2).await;
    let member = seed_member(&services, "Bilbo Baggins").await;
    let (open, _) = services.loans.borrow(&borrow_request(book.id, member.id)).await.unwrap();
    let (closed, _) = services.loans.borrow(&borrow_request(book.id, member.id)).await.unwrap();
    services.loans.return_loan(closed.id).await.unwrap();
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 1);

    services.loans.delete_loan(open.id).await.unwrap();
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);

    services.loans.delete_loan(closed.id).await.unwrap();
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);

    let notice = services.loans.delete_loan(closed.id).await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
}

#[tokio::test]
async fn test_deleting_member_puts_their_open_copies_back() {
    let services = services_on(date(2024, 1, 10));
    let hobbit = seed_book(&services, "The Hobbit", "978-0547928227", 3).await;
    let silmarillion = seed_book(&services, "The Silmarillion", "978-0544338012", 1).await;
    let bilbo = seed_member(&services, "Bilbo Baggins").await;
    let frodo = seed_member(&services, "Frodo Baggins").await;

    services.loans.borrow(&borrow_request(hobbit.id, bilbo.id)).await.unwrap();
    services.loans.borrow(&borrow_request(hobbit.id, bilbo.id)).await.unwrap();
    let (returned, _) = services.loans.borrow(&borrow_request(silmarillion.id, bilbo.id)).await.unwrap();
    services.loans.return_loan(returned.id).await.unwrap();
    services.loans.borrow(&borrow_request(silmarillion.id, bilbo.id)).await.unwrap();
    services.loans.borrow(&borrow_request(hobbit.id, frodo.id)).await.unwrap();
    let before = services.catalog.get_book(hobbit.id).await.unwrap();
    assert_eq!(before.available_copies, 0);

    let notice = services.catalog.delete_member(bilbo.id).await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);

    let after = services.catalog.get_book(hobbit.id).await.unwrap();
    assert_eq!(after.available_copies, 2);
    assert!(after.version > before.version);
    assert_eq!(services.catalog.get_book(silmarillion.id).await.unwrap().available_copies, 1);

    let loans = services.loans.list_loans().await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].member_id, frodo.id);

    // A stale edit read before the delete no longer applies
    let err = services
        .catalog
        .update_book(
            hobbit.id,
            before.version,
            BookInput {
                title: "The Hobbit".into(),
                isbn: "978-0547928227".into(),
                published_on: None,
                total_copies: 3,
                available_copies: 0,
                author_id: hobbit.author_id,
            },
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrencyConflict(_)));

    let notice = services.catalog.delete_member(bilbo.id).await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
}

#[tokio::test]
async fn test_stale_update_conflicts_and_vanished_update_is_not_found() {
    let services = services_on(date(2024, 1, 10));
    let (author, _) = services
        .catalog
        .create_author(AuthorInput {
            first_name: "Ursula".into(),
            last_name: "Le Guin".into(),
        })
        .await
        .unwrap();

    let edit = AuthorInput {
        first_name: "Ursula K.".into(),
        last_name: "Le Guin".into(),
    };
    let (updated, _) = services
        .catalog
        .update_author(author.id, author.version, edit.clone())
        .await
        .unwrap();
    assert_eq!(updated.version, author.version + 1);

    let err = services
        .catalog
        .update_author(author.id, author.version, edit.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrencyConflict(_)));

    services.catalog.delete_author(author.id).await.unwrap();
    let err = services
        .catalog
        .update_author(author.id, updated.version, edit)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_loan_update_changes_member_and_dates() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;
    let bilbo = seed_member(&services, "Bilbo Baggins").await;
    let frodo = seed_member(&services, "Frodo Baggins").await;
    let (loan, _) = services.loans.borrow(&borrow_request(book.id, bilbo.id)).await.unwrap();

    let (updated, _) = services
        .loans
        .update_loan(
            loan.id,
            LoanUpdate {
                version: loan.version,
                member_id: frodo.id,
                borrowed_on: loan.borrowed_on,
                due_on: date(2024, 2, 1),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.member_id, frodo.id);
    assert_eq!(updated.due_on, date(2024, 2, 1));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 0);

    let err = services
        .loans
        .update_loan(
            loan.id,
            LoanUpdate {
                version: updated.version,
                member_id: frodo.id,
                borrowed_on: date(2024, 2, 1),
                due_on: date(2024, 2, 1),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref f) if f.contains("due_on")));
}

#[tokio::test]
async fn test_author_delete_cascades_to_books_and_loans() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;
    let member = seed_member(&services, "Bilbo Baggins").await;
    services.loans.borrow(&borrow_request(book.id, member.id)).await.unwrap();

    services.catalog.delete_author(book.author_id).await.unwrap();

    assert!(matches!(services.catalog.get_book(book.id).await, Err(AppError::NotFound(_))));
    assert!(services.loans.list_loans().await.unwrap().is_empty());
    assert_eq!(services.catalog.list_members().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_book_with_more_available_than_total_is_rejected() {
    let services = services_on(date(2024, 1, 10));
    let book = seed_book(&services, "The Hobbit", "978-0547928227", 1).await;

    let err = services
        .catalog
        .create_book(
            BookInput {
                title: "The Hobbit".into(),
                isbn: "978-0547928227".into(),
                published_on: None,
                total_copies: 2,
                available_copies: 3,
                author_id: book.author_id,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref f) if f.contains("available_copies")));
}
