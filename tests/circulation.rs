//! Circulation tests against a real database.
//!
//! Each test gets a fresh database with ./migrations applied. Run with:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use circulation_server::{
    config::CirculationConfig,
    error::AppError,
    models::{
        author::CreateAuthor,
        book::{BookStatus, CreateBook, NewestBooksQuery},
        loan::{CreateLoan, LoanSearchQuery, ReassignLoan},
        member::CreateMember,
        pagination::PageQuery,
    },
    repository::Repository,
    services::Services,
};
use chrono::NaiveDate;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn services(pool: PgPool) -> Services {
    Services::new(Repository::new(pool), CirculationConfig::default())
}

async fn seed_book(services: &Services, title: &str) -> i64 {
    let author = services
        .catalog
        .create_author(&CreateAuthor { name: "Frank Herbert".to_string() })
        .await
        .unwrap();

    services
        .catalog
        .create_book(&CreateBook {
            title: title.to_string(),
            description: None,
            category: "Science Fiction".to_string(),
            publishing_year: Some(1965),
            photo_path: None,
            author_id: author.id,
        })
        .await
        .unwrap()
        .id
}

async fn seed_member(services: &Services, name: &str) -> i64 {
    services
        .catalog
        .create_member(&CreateMember {
            name: name.to_string(),
            email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
            phone: None,
        })
        .await
        .unwrap()
        .id
}

async fn status_of(services: &Services, book_id: i64) -> BookStatus {
    services.catalog.get_book(book_id).await.unwrap().status
}

async fn borrow(services: &Services, book_id: i64, member_id: i64) -> i64 {
    services
        .loans
        .create_loan(CreateLoan { book_id, member_id })
        .await
        .unwrap()
        .id
}

async fn borrow_and_return(services: &Services, book_id: i64, member_id: i64) {
    let loan_id = borrow(services, book_id, member_id).await;
    services.loans.return_loan(loan_id).await.unwrap();
}

/// A book is BORROWED exactly when it has an open loan
async fn assert_status_matches_open_loans(pool: &PgPool) {
    let mismatches: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM books b
        WHERE (b.status = 'BORROWED') <> EXISTS (
            SELECT 1 FROM borrowed_books l
            WHERE l.book_id = b.id AND l.return_date IS NULL
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(mismatches, 0);
}

// ---------------------------------------------------------------------------
// Borrowing
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_borrow_flips_status(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let member = seed_member(&services, "Alice").await;

    let loan = services
        .loans
        .create_loan(CreateLoan { book_id: book, member_id: member })
        .await
        .unwrap();

    assert_eq!(loan.book_title, "Dune");
    assert_eq!(loan.member_name, "Alice");
    assert!(loan.return_date.is_none());
    assert_eq!(status_of(&services, book).await, BookStatus::Borrowed);
    assert_status_matches_open_loans(&pool).await;
}

#[sqlx::test]
#[ignore]
async fn test_borrowing_a_borrowed_book_conflicts_without_writes(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;

    borrow(&services, book, alice).await;
    let before = services.repository.loans.count_open().await.unwrap();

    let result = services
        .loans
        .create_loan(CreateLoan { book_id: book, member_id: bob })
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(services.repository.loans.count_open().await.unwrap(), before);
}

#[sqlx::test]
#[ignore]
async fn test_borrow_unknown_book_or_member(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let member = seed_member(&services, "Alice").await;

    let result = services
        .loans
        .create_loan(CreateLoan { book_id: 9999, member_id: member })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let result = services
        .loans
        .create_loan(CreateLoan { book_id: book, member_id: 9999 })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(status_of(&services, book).await, BookStatus::Available);
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_borrows_admit_one(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;

    let (first, second) = tokio::join!(
        services.loans.create_loan(CreateLoan { book_id: book, member_id: alice }),
        services.loans.create_loan(CreateLoan { book_id: book, member_id: bob }),
    );

    let succeeded = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 1);
    assert!(matches!(first.err().or(second.err()), Some(AppError::Conflict(_))));
    assert_eq!(services.repository.loans.count_open().await.unwrap(), 1);
    assert_status_matches_open_loans(&pool).await;
}

// ---------------------------------------------------------------------------
// Returning
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_return_releases_book_once(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let member = seed_member(&services, "Alice").await;
    let loan = borrow(&services, book, member).await;

    let returned = services.loans.return_loan(loan).await.unwrap();
    assert!(returned.return_date.is_some());
    assert_eq!(status_of(&services, book).await, BookStatus::Available);

    let again = services.loans.return_loan(loan).await;
    assert!(matches!(again, Err(AppError::AlreadyReturned(_))));
    assert_status_matches_open_loans(&pool).await;
}

#[sqlx::test]
#[ignore]
async fn test_return_unknown_loan(pool: PgPool) {
    let services = services(pool);
    let result = services.loans.return_loan(4242).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// Reassignment
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_reassign_moves_open_loan_to_new_book(pool: PgPool) {
    let services = services(pool.clone());
    let b1 = seed_book(&services, "Dune").await;
    let b2 = seed_book(&services, "Dune Messiah").await;
    let member = seed_member(&services, "Alice").await;
    let loan = borrow(&services, b1, member).await;

    let updated = services
        .loans
        .reassign_loan(loan, ReassignLoan { book_id: Some(b2), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(updated.book_id, b2);
    assert_eq!(status_of(&services, b1).await, BookStatus::Available);
    assert_eq!(status_of(&services, b2).await, BookStatus::Borrowed);
    assert_status_matches_open_loans(&pool).await;
}

#[sqlx::test]
#[ignore]
async fn test_reassign_to_borrowed_book_changes_nothing(pool: PgPool) {
    let services = services(pool.clone());
    let b1 = seed_book(&services, "Dune").await;
    let b2 = seed_book(&services, "Dune Messiah").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    let loan = borrow(&services, b1, alice).await;
    borrow(&services, b2, bob).await;

    let result = services
        .loans
        .reassign_loan(loan, ReassignLoan { book_id: Some(b2), ..Default::default() })
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(services.loans.get_loan(loan).await.unwrap().book_id, b1);
    assert_eq!(status_of(&services, b1).await, BookStatus::Borrowed);
    assert_eq!(status_of(&services, b2).await, BookStatus::Borrowed);
    assert_status_matches_open_loans(&pool).await;
}

#[sqlx::test]
#[ignore]
async fn test_reassign_member_only_keeps_book(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    let loan = borrow(&services, book, alice).await;

    let updated = services
        .loans
        .reassign_loan(loan, ReassignLoan { member_id: Some(bob), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(updated.member_id, bob);
    assert_eq!(updated.book_id, book);
    assert_eq!(status_of(&services, book).await, BookStatus::Borrowed);

    let result = services
        .loans
        .reassign_loan(loan, ReassignLoan { member_id: Some(9999), ..Default::default() })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test]
#[ignore]
async fn test_reassign_to_missing_book_changes_nothing(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    let loan = borrow(&services, book, alice).await;

    let result = services
        .loans
        .reassign_loan(
            loan,
            ReassignLoan { book_id: Some(9999), member_id: Some(bob), ..Default::default() },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    let unchanged = services.loans.get_loan(loan).await.unwrap();
    assert_eq!(unchanged.book_id, book);
    assert_eq!(unchanged.member_id, alice);
    assert_eq!(status_of(&services, book).await, BookStatus::Borrowed);
    assert_status_matches_open_loans(&pool).await;
}

#[sqlx::test]
#[ignore]
async fn test_reassign_overwrites_dates(pool: PgPool) {
    let services = services(pool.clone());
    let book = seed_book(&services, "Dune").await;
    let member = seed_member(&services, "Alice").await;
    let loan = borrow(&services, book, member).await;

    let updated = services
        .loans
        .reassign_loan(
            loan,
            ReassignLoan { borrow_date: Some(date("2024-01-10")), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(updated.borrow_date, date("2024-01-10"));
    assert!(updated.return_date.is_none());
    assert_eq!(status_of(&services, book).await, BookStatus::Borrowed);

    // Closing the loan through a date correction releases the book
    let closed = services
        .loans
        .reassign_loan(
            loan,
            ReassignLoan { return_date: Some(date("2024-01-20")), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(closed.borrow_date, date("2024-01-10"));
    assert_eq!(closed.return_date, Some(date("2024-01-20")));
    assert_eq!(status_of(&services, book).await, BookStatus::Available);
    assert_status_matches_open_loans(&pool).await;

    let again = services.loans.return_loan(loan).await;
    assert!(matches!(again, Err(AppError::AlreadyReturned(_))));
}

#[sqlx::test]
#[ignore]
async fn test_reassign_returned_loan_keeps_availability(pool: PgPool) {
    let services = services(pool.clone());
    let b1 = seed_book(&services, "Dune").await;
    let b2 = seed_book(&services, "Dune Messiah").await;
    let b3 = seed_book(&services, "Children of Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;

    let loan = borrow(&services, b1, alice).await;
    services.loans.return_loan(loan).await.unwrap();

    let moved = services
        .loans
        .reassign_loan(loan, ReassignLoan { book_id: Some(b2), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(moved.book_id, b2);
    assert!(moved.return_date.is_some());
    assert_eq!(status_of(&services, b1).await, BookStatus::Available);
    assert_eq!(status_of(&services, b2).await, BookStatus::Available);

    // The target must still be available even though the loan is closed
    borrow(&services, b3, bob).await;
    let result = services
        .loans
        .reassign_loan(loan, ReassignLoan { book_id: Some(b3), ..Default::default() })
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(services.loans.get_loan(loan).await.unwrap().book_id, b2);
    assert_status_matches_open_loans(&pool).await;
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_delete_leaves_book_status(pool: PgPool) {
    let services = services(pool);
    let book = seed_book(&services, "Dune").await;
    let member = seed_member(&services, "Alice").await;
    let loan = borrow(&services, book, member).await;

    services.loans.delete_loan(loan).await.unwrap();

    assert!(matches!(services.loans.get_loan(loan).await, Err(AppError::NotFound(_))));
    assert_eq!(status_of(&services, book).await, BookStatus::Borrowed);
    assert!(matches!(services.loans.delete_loan(loan).await, Err(AppError::NotFound(_))));
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_top_books_by_loan_count(pool: PgPool) {
    let services = services(pool);
    let member = seed_member(&services, "Alice").await;

    let mut books = Vec::new();
    for (title, loans) in [("A", 5), ("B", 3), ("C", 3), ("D", 0)] {
        let book = seed_book(&services, title).await;
        for _ in 0..loans {
            borrow_and_return(&services, book, member).await;
        }
        books.push(book);
    }

    let top = services.rankings.top_books(3).await.unwrap();
    let ids: Vec<i64> = top.iter().map(|r| r.book.id).collect();
    let counts: Vec<i64> = top.iter().map(|r| r.loan_count).collect();

    // Ties are broken by id
    assert_eq!(ids, vec![books[0], books[1], books[2]]);
    assert_eq!(counts, vec![5, 3, 3]);

    let all = services.rankings.top_books(10).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[3].loan_count, 0);
}

#[sqlx::test]
#[ignore]
async fn test_top_members_by_loan_count(pool: PgPool) {
    let services = services(pool);
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    seed_member(&services, "Carol").await;

    for _ in 0..2 {
        borrow_and_return(&services, book, bob).await;
    }
    borrow_and_return(&services, book, alice).await;

    let top = services.rankings.top_members(2).await.unwrap();
    let ids: Vec<i64> = top.iter().map(|r| r.member.id).collect();
    assert_eq!(ids, vec![bob, alice]);
    assert!(services.rankings.top_members(0).await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore]
async fn test_top_books_is_bounded_by_n_not_page_size(pool: PgPool) {
    let config = CirculationConfig { default_page_size: 2, max_page_size: 2 };
    let services = Services::new(Repository::new(pool), config);
    for title in ["A", "B", "C"] {
        seed_book(&services, title).await;
    }

    assert_eq!(services.rankings.top_books(3).await.unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Search and listings
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore]
async fn test_search_ignores_blank_filters(pool: PgPool) {
    let services = services(pool);
    let dune = seed_book(&services, "Dune").await;
    let other = seed_book(&services, "Neuromancer").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    borrow(&services, dune, alice).await;
    borrow(&services, other, bob).await;

    let page = services
        .loans
        .search_loans(&LoanSearchQuery {
            book_title: Some("dune".to_string()),
            member_name: Some("".to_string()),
            borrow_date: Some("  ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].book_title, "Dune");

    let everything = services.loans.search_loans(&LoanSearchQuery::default()).await.unwrap();
    assert_eq!(everything.total, 2);
}

#[sqlx::test]
#[ignore]
async fn test_search_filters_are_or_combined(pool: PgPool) {
    let services = services(pool);
    let dune = seed_book(&services, "Dune").await;
    let other = seed_book(&services, "Neuromancer").await;
    let third = seed_book(&services, "Hyperion").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    borrow(&services, dune, alice).await;
    borrow(&services, other, bob).await;
    borrow(&services, third, alice).await;

    let page = services
        .loans
        .search_loans(&LoanSearchQuery {
            book_title: Some("dune".to_string()),
            member_name: Some("BOB".to_string()),
            sort_by: Some("bookTitle".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let titles: Vec<&str> = page.items.iter().map(|l| l.book_title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Neuromancer"]);
}

#[sqlx::test]
#[ignore]
async fn test_search_by_borrow_date_only(pool: PgPool) {
    let services = services(pool);
    let dune = seed_book(&services, "Dune").await;
    let other = seed_book(&services, "Neuromancer").await;
    let alice = seed_member(&services, "Alice").await;
    let bob = seed_member(&services, "Bob").await;
    let leap = borrow(&services, dune, alice).await;
    borrow(&services, other, bob).await;

    services
        .loans
        .reassign_loan(
            leap,
            ReassignLoan { borrow_date: Some(date("2024-02-29")), ..Default::default() },
        )
        .await
        .unwrap();

    let page = services
        .loans
        .search_loans(&LoanSearchQuery {
            book_title: Some(" ".to_string()),
            borrow_date: Some("2024-02-29".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, leap);
    assert_eq!(page.items[0].borrow_date, date("2024-02-29"));
}

#[sqlx::test]
#[ignore]
async fn test_search_keeps_inner_whitespace(pool: PgPool) {
    let services = services(pool);
    let wanted = seed_book(&services, "Children of Dune").await;
    let other = seed_book(&services, "Offworld").await;
    let member = seed_member(&services, "Alice").await;
    borrow(&services, wanted, member).await;
    borrow(&services, other, member).await;

    let page = services
        .loans
        .search_loans(&LoanSearchQuery {
            book_title: Some(" of ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].book_id, wanted);
}

#[sqlx::test]
#[ignore]
async fn test_member_history_is_paged(pool: PgPool) {
    let services = services(pool);
    let book = seed_book(&services, "Dune").await;
    let alice = seed_member(&services, "Alice").await;
    for _ in 0..3 {
        borrow_and_return(&services, book, alice).await;
    }

    let query = PageQuery { page: Some(1), size: Some(2), ..Default::default() };
    let page = services.loans.loans_for_member(alice, &query).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);

    let missing = services.loans.loans_for_member(9999, &PageQuery::default()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[sqlx::test]
#[ignore]
async fn test_newest_books_by_status(pool: PgPool) {
    let services = services(pool);
    let first = seed_book(&services, "Dune").await;
    let second = seed_book(&services, "Dune Messiah").await;
    let member = seed_member(&services, "Alice").await;
    borrow(&services, first, member).await;

    let available = services
        .catalog
        .newest_books(&NewestBooksQuery { status: None, page: None, size: None })
        .await
        .unwrap();
    assert_eq!(available.items.len(), 1);
    assert_eq!(available.items[0].id, second);

    let borrowed = services
        .catalog
        .newest_books(&NewestBooksQuery { status: Some("borrowed".into()), page: None, size: None })
        .await
        .unwrap();
    assert_eq!(borrowed.items[0].id, first);
}

#[sqlx::test]
#[ignore]
async fn test_duplicate_member_email_conflicts(pool: PgPool) {
    let services = services(pool);
    seed_member(&services, "Alice").await;

    let result = services
        .catalog
        .create_member(&CreateMember {
            name: "Alice Again".to_string(),
            email: "ALICE@example.org".to_string(),
            phone: None,
        })
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}
