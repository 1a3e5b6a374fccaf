//! Store-backed tests for the purchase and validation workflow.
//!
//! These run against a real Postgres instance and are ignored by default;
//! point `DATABASE_URL` at a scratch database and run
//! `cargo test -- --ignored` to execute them.

use std::collections::HashSet;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use entrada_server::handlers::dashboard;
use entrada_server::ledger;
use entrada_server::models::{Role, SaleStatus};
use entrada_server::utils::error::AppError;
use entrada_server::validation::{self, ValidationOutcome};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect");

    sqlx::migrate!().run(&pool).await.expect("migrations failed");
    pool
}

async fn seed_user(pool: &PgPool, role: Role) -> Uuid {
    let tag = Uuid::new_v4().simple().to_string();
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, username, email, password_hash, role) \
         VALUES ($1, $2, $3, 'x', $4) RETURNING id",
    )
    .bind(format!("user-{tag}"))
    .bind(format!("u{tag}"))
    .bind(format!("{tag}@example.com"))
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_event(pool: &PgPool) -> Uuid {
    let organizer = seed_user(pool, Role::Organizer).await;

    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO events (organizer_id, title, date, location, capacity) \
         VALUES ($1, 'Test Event', now() + interval '7 days', 'Test Hall', 1000) \
         RETURNING id",
    )
    .bind(organizer)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_ticket_type_for(
    pool: &PgPool,
    event_id: Uuid,
    name: &str,
    price: Decimal,
    quantity: i32,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO ticket_types (event_id, name, price, total_quantity, quantity_available) \
         VALUES ($1, $2, $3, $4, $4) RETURNING id",
    )
    .bind(event_id)
    .bind(name)
    .bind(price)
    .bind(quantity)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Creates an organizer, an event and one ticket type with the given
/// stock; returns the ticket type id.
async fn seed_ticket_type(pool: &PgPool, quantity: i32) -> Uuid {
    let event_id = seed_event(pool).await;
    seed_ticket_type_for(pool, event_id, "General", Decimal::new(2500, 2), quantity).await
}

async fn available(pool: &PgPool, ticket_type_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT quantity_available FROM ticket_types WHERE id = $1")
        .bind(ticket_type_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn access_log_count(pool: &PgPool, sale_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM access_logs WHERE sale_id = $1")
        .bind(sale_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn purchase_decrements_stock_and_issues_distinct_codes() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 5).await;
    let buyer = seed_user(&pool, Role::Attendee).await;

    let sales = ledger::purchase(&pool, ticket_type, 3, buyer).await.unwrap();

    assert_eq!(sales.len(), 3);
    let codes: HashSet<&str> = sales.iter().map(|s| s.qr_code.as_str()).collect();
    assert_eq!(codes.len(), 3);
    assert!(sales.iter().all(|s| s.status == SaleStatus::Issued));
    assert_eq!(available(&pool, ticket_type).await, 2);

    // the second request wants more than what is left
    let err = ledger::purchase(&pool, ticket_type, 3, buyer).await.unwrap_err();
    match err {
        AppError::InsufficientInventory { available } => assert_eq!(available, 2),
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }
    assert_eq!(available(&pool, ticket_type).await, 2);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn purchase_rejects_unknown_ticket_type_and_bad_quantity() {
    let pool = pool().await;
    let buyer = seed_user(&pool, Role::Attendee).await;

    assert!(matches!(
        ledger::purchase(&pool, Uuid::new_v4(), 1, buyer).await,
        Err(AppError::NotFound(_))
    ));
    let ticket_type = seed_ticket_type(&pool, 5).await;
    assert!(matches!(
        ledger::purchase(&pool, ticket_type, 0, buyer).await,
        Err(AppError::ValidationError(_))
    ));
    assert_eq!(available(&pool, ticket_type).await, 5);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn sales_breakdown_reports_zero_revenue_for_unsold_types() {
    let pool = pool().await;
    let event_id = seed_event(&pool).await;
    let general =
        seed_ticket_type_for(&pool, event_id, "General", Decimal::new(2500, 2), 5).await;
    seed_ticket_type_for(&pool, event_id, "VIP", Decimal::new(10000, 2), 3).await;
    let buyer = seed_user(&pool, Role::Attendee).await;

    ledger::purchase(&pool, general, 2, buyer).await.unwrap();

    let breakdown = dashboard::ticket_sales_breakdown(&pool, event_id)
        .await
        .unwrap();
    assert_eq!(breakdown.len(), 2);

    let general_row = breakdown.iter().find(|r| r.ticket_name == "General").unwrap();
    assert_eq!(general_row.sold, 2);
    assert_eq!(general_row.available, 3);
    assert_eq!(general_row.revenue, Decimal::new(5000, 2));

    let vip_row = breakdown.iter().find(|r| r.ticket_name == "VIP").unwrap();
    assert_eq!(vip_row.sold, 0);
    assert_eq!(vip_row.available, 3);
    assert_eq!(vip_row.revenue, Decimal::ZERO, "no sales means no revenue");
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_purchases_never_oversell() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 1).await;
    let buyer_a = seed_user(&pool, Role::Attendee).await;
    let buyer_b = seed_user(&pool, Role::Attendee).await;

    let (a, b) = tokio::join!(
        ledger::purchase(&pool, ticket_type, 1, buyer_a),
        ledger::purchase(&pool, ticket_type, 1, buyer_b),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one purchase must win the last unit");

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, AppError::InsufficientInventory { available: 0 }));
    assert_eq!(available(&pool, ticket_type).await, 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn replayed_validation_is_detected_without_a_second_log() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 1).await;
    let buyer = seed_user(&pool, Role::Attendee).await;
    let first_staff = seed_user(&pool, Role::Staff).await;
    let second_staff = seed_user(&pool, Role::Staff).await;

    let sales = ledger::purchase(&pool, ticket_type, 1, buyer).await.unwrap();
    let code = sales[0].qr_code.clone();

    let first = validation::validate(&pool, &code, first_staff).await.unwrap();
    let (sale_id, original_log) = match first {
        ValidationOutcome::Admitted { sale, access_log } => {
            assert_eq!(sale.status, SaleStatus::Redeemed);
            assert_eq!(access_log.staff.id, first_staff);
            (sale.id, access_log)
        }
        other => panic!("expected Admitted, got {other:?}"),
    };

    // replay by a different staff member: rejected, original entry shown
    let second = validation::validate(&pool, &code, second_staff).await.unwrap();
    match second {
        ValidationOutcome::AlreadyRedeemed { sale, access_log } => {
            assert_eq!(sale.id, sale_id);
            let log = access_log.expect("original access log must be returned");
            assert_eq!(log.id, original_log.id);
            assert_eq!(log.staff.id, first_staff);
        }
        other => panic!("expected AlreadyRedeemed, got {other:?}"),
    }

    assert_eq!(access_log_count(&pool, sale_id).await, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_validations_write_exactly_one_log() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 1).await;
    let buyer = seed_user(&pool, Role::Attendee).await;
    let staff_a = seed_user(&pool, Role::Staff).await;
    let staff_b = seed_user(&pool, Role::Staff).await;

    let sales = ledger::purchase(&pool, ticket_type, 1, buyer).await.unwrap();
    let code = sales[0].qr_code.clone();
    let sale_id = sales[0].id;

    let (a, b) = tokio::join!(
        validation::validate(&pool, &code, staff_a),
        validation::validate(&pool, &code, staff_b),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let admitted = outcomes
        .iter()
        .filter(|o| matches!(o, ValidationOutcome::Admitted { .. }))
        .count();
    let replays = outcomes
        .iter()
        .filter(|o| matches!(o, ValidationOutcome::AlreadyRedeemed { .. }))
        .count();

    assert_eq!(admitted, 1, "exactly one scan must win");
    assert_eq!(replays, 1, "the losing scan must see the redeemed state");
    assert_eq!(access_log_count(&pool, sale_id).await, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn cancelled_and_unknown_codes_are_rejected_without_writes() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 1).await;
    let buyer = seed_user(&pool, Role::Attendee).await;
    let staff = seed_user(&pool, Role::Staff).await;

    let sales = ledger::purchase(&pool, ticket_type, 1, buyer).await.unwrap();
    let code = sales[0].qr_code.clone();
    let sale_id = sales[0].id;

    sqlx::query("UPDATE sales SET status = 'cancelled' WHERE id = $1")
        .bind(sale_id)
        .execute(&pool)
        .await
        .unwrap();

    match validation::validate(&pool, &code, staff).await.unwrap() {
        ValidationOutcome::Cancelled { sale } => {
            assert_eq!(sale.status, SaleStatus::Cancelled)
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
    assert_eq!(access_log_count(&pool, sale_id).await, 0);

    match validation::validate(&pool, &Uuid::new_v4().to_string(), staff)
        .await
        .unwrap()
    {
        ValidationOutcome::UnknownCode => {}
        other => panic!("expected UnknownCode, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn lookup_by_code_never_changes_state() {
    let pool = pool().await;
    let ticket_type = seed_ticket_type(&pool, 1).await;
    let buyer = seed_user(&pool, Role::Attendee).await;

    let sales = ledger::purchase(&pool, ticket_type, 1, buyer).await.unwrap();
    let code = &sales[0].qr_code;

    let found = validation::find_by_code(&pool, code).await.unwrap();
    assert_eq!(found.status, SaleStatus::Issued);

    let again = validation::find_by_code(&pool, code).await.unwrap();
    assert_eq!(again.status, SaleStatus::Issued);

    assert!(matches!(
        validation::find_by_code(&pool, "no-such-code").await,
        Err(AppError::NotFound(_))
    ));
}
