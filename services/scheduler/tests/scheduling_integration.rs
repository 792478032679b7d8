//! End-to-end tests for the scheduling core against a real database
//!
//! These exercise the availability store, conflict resolver, and
//! lifecycle manager together, including the concurrent-booking
//! guarantee that depends on the hold table's exclusion constraint.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use common::civil;
use common::database::{DatabaseConfig, init_pool, run_migrations};
use common::error::SchedulingError;
use scheduler::lifecycle::LifecycleManager;
use scheduler::models::availability::{CreateBlockRequest, CreateRuleRequest};
use scheduler::models::meeting::{CreateMeetingRequest, MeetingStatus, MeetingType};
use scheduler::notifier::Notifier;
use scheduler::repositories::availability::AvailabilityRepository;
use scheduler::repositories::meeting::MeetingRepository;
use scheduler::resolver::ConflictResolver;
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

async fn setup() -> PgPool {
    let config = DatabaseConfig::from_env().expect("database config");
    let pool = init_pool(&config).await.expect("database pool");
    run_migrations(&pool).await.expect("migrations");

    sqlx::query("TRUNCATE meeting_holds, meetings, availability_rules, unavailability_blocks, users CASCADE")
        .execute(&pool)
        .await
        .expect("truncate");

    pool
}

async fn create_user(pool: &PgPool, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, role) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

/// A Monday at least a week in the future, so bookings pass the
/// must-be-in-the-future check
fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while civil::day_of_week(date) != 1 {
        date += Duration::days(1);
    }
    date
}

fn recurring(day: i16, start: NaiveTime, end: NaiveTime) -> CreateRuleRequest {
    CreateRuleRequest {
        day_of_week: Some(day),
        on_date: None,
        start_time: start,
        end_time: end,
    }
}

fn one_off(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> CreateRuleRequest {
    CreateRuleRequest {
        day_of_week: None,
        on_date: Some(date),
        start_time: start,
        end_time: end,
    }
}

fn booking(
    recipient: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> CreateMeetingRequest {
    CreateMeetingRequest {
        recipient_id: recipient,
        title: "Mock interview".to_string(),
        description: "Practice run".to_string(),
        meeting_date: date,
        start_time: start,
        end_time: end,
        meeting_type: MeetingType::StudentCompany,
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn overlapping_rules_are_rejected_at_write_time() {
    let pool = setup().await;
    let user = create_user(&pool, "company").await;
    let availability = AvailabilityRepository::new(pool.clone());

    availability
        .create_rule(user, &recurring(1, t(9, 0), t(12, 0)))
        .await
        .expect("first rule");

    let err = availability
        .create_rule(user, &recurring(1, t(11, 0), t(14, 0)))
        .await
        .expect_err("overlapping rule must be rejected");
    assert!(matches!(err, SchedulingError::Validation(_)));

    // a touching rule is fine
    availability
        .create_rule(user, &recurring(1, t(12, 0), t(14, 0)))
        .await
        .expect("adjacent rule");
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn worked_scenario_one_off_overrides_recurring() {
    let pool = setup().await;
    let company = create_user(&pool, "company").await;
    let student = create_user(&pool, "student").await;
    let monday = next_monday();

    let availability = AvailabilityRepository::new(pool.clone());
    availability
        .create_rule(company, &recurring(1, t(9, 0), t(17, 0)))
        .await
        .expect("recurring rule");
    availability
        .create_rule(company, &one_off(monday, t(10, 0), t(12, 0)))
        .await
        .expect("one-off rule");
    availability
        .create_block(
            company,
            &CreateBlockRequest {
                starts_at: monday.and_time(t(10, 30)),
                ends_at: monday.and_time(t(11, 0)),
            },
        )
        .await
        .expect("block");

    // an already-accepted meeting 13:00-14:00 that Monday
    sqlx::query(
        r#"
        INSERT INTO meetings (requestor_id, recipient_id, title, meeting_date,
                              start_time, end_time, meeting_type, status)
        VALUES ($1, $2, 'Existing', $3, $4, $5, 'student_company', 'accepted')
        "#,
    )
    .bind(student)
    .bind(company)
    .bind(monday)
    .bind(t(13, 0))
    .bind(t(14, 0))
    .execute(&pool)
    .await
    .expect("existing meeting");

    let resolver = ConflictResolver::new(pool.clone());
    let slots = resolver
        .available_slots(company, monday, 30)
        .await
        .expect("slots");

    let expected: Vec<(NaiveTime, NaiveTime)> = vec![
        (t(10, 0), t(10, 30)),
        (t(11, 0), t(11, 30)),
        (t(11, 30), t(12, 0)),
    ];
    let actual: Vec<(NaiveTime, NaiveTime)> =
        slots.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn listed_slot_books_once_and_disappears() {
    let pool = setup().await;
    let company = create_user(&pool, "company").await;
    let student = create_user(&pool, "student").await;
    let monday = next_monday();

    let availability = AvailabilityRepository::new(pool.clone());
    availability
        .create_rule(company, &one_off(monday, t(10, 0), t(11, 0)))
        .await
        .expect("rule");

    let resolver = ConflictResolver::new(pool.clone());
    let before = resolver
        .available_slots(company, monday, 30)
        .await
        .expect("slots before");
    assert_eq!(before.len(), 2);

    let lifecycle = LifecycleManager::new(pool.clone(), Notifier::from_env());
    let slot = before[0];
    let meeting = lifecycle
        .request(student, &booking(company, monday, slot.start, slot.end))
        .await
        .expect("booking succeeds");
    assert_eq!(meeting.status, MeetingStatus::Requested);

    let after = resolver
        .available_slots(company, monday, 30)
        .await
        .expect("slots after");
    assert!(!after.contains(&slot), "booked slot must disappear");
    assert_eq!(after.len(), 1);

    // the same slot is now a conflict, even while only `requested`
    let other_student = create_user(&pool, "student").await;
    let err = lifecycle
        .request(other_student, &booking(company, monday, slot.start, slot.end))
        .await
        .expect_err("double booking must fail");
    assert!(matches!(err, SchedulingError::Conflict(_)));
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn contested_slot_has_exactly_one_winner() {
    let pool = setup().await;
    let company = create_user(&pool, "company").await;
    let monday = next_monday();

    let availability = AvailabilityRepository::new(pool.clone());
    availability
        .create_rule(company, &one_off(monday, t(10, 0), t(10, 30)))
        .await
        .expect("rule");

    let mut students = Vec::new();
    for _ in 0..12 {
        students.push(create_user(&pool, "student").await);
    }

    let lifecycle = LifecycleManager::new(pool.clone(), Notifier::from_env());
    let mut handles = Vec::new();
    for student in students {
        let lifecycle = lifecycle.clone();
        handles.push(tokio::spawn(async move {
            lifecycle
                .request(student, &booking(company, monday, t(10, 0), t(10, 30)))
                .await
        }));
    }

    let mut won = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => won += 1,
            Err(SchedulingError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(won, 1, "exactly one booking must win");
    assert_eq!(conflicts, 11, "all others must see a conflict");

    // the invariant: no two overlapping non-terminal meetings
    let non_terminal: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM meetings
        WHERE recipient_id = $1 AND status IN ('requested', 'accepted')
        "#,
    )
    .bind(company)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(non_terminal, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn lifecycle_guards_hold_against_the_store() {
    let pool = setup().await;
    let company = create_user(&pool, "company").await;
    let student = create_user(&pool, "student").await;
    let monday = next_monday();

    let availability = AvailabilityRepository::new(pool.clone());
    availability
        .create_rule(company, &one_off(monday, t(10, 0), t(12, 0)))
        .await
        .expect("rule");

    let lifecycle = LifecycleManager::new(pool.clone(), Notifier::from_env());
    let meeting = lifecycle
        .request(student, &booking(company, monday, t(10, 0), t(10, 30)))
        .await
        .expect("booking");

    // the requestor may not accept their own request
    let err = lifecycle
        .accept(meeting.id, student)
        .await
        .expect_err("requestor accept must fail");
    assert!(matches!(err, SchedulingError::Authorization(_)));

    let unchanged = MeetingRepository::new(pool.clone())
        .find_by_id(meeting.id)
        .await
        .expect("fetch")
        .expect("meeting exists");
    assert_eq!(unchanged.status, MeetingStatus::Requested);

    // cancel, then declining the cancelled meeting is an invalid state
    lifecycle
        .cancel(meeting.id, student)
        .await
        .expect("cancel");
    let err = lifecycle
        .decline(meeting.id, company, "too late")
        .await
        .expect_err("decline after cancel must fail");
    assert!(matches!(err, SchedulingError::InvalidState(_)));

    // cancellation released the slot
    let resolver = ConflictResolver::new(pool.clone());
    let slots = resolver
        .available_slots(company, monday, 30)
        .await
        .expect("slots");
    assert_eq!(slots.len(), 4);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance (DATABASE_URL)"]
async fn rating_requires_completion_and_party() {
    let pool = setup().await;
    let company = create_user(&pool, "company").await;
    let student = create_user(&pool, "student").await;

    // an accepted meeting that ended yesterday, inserted directly
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let meeting_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO meetings (requestor_id, recipient_id, title, meeting_date,
                              start_time, end_time, meeting_type, status)
        VALUES ($1, $2, 'Past meeting', $3, $4, $5, 'student_company', 'accepted')
        RETURNING id
        "#,
    )
    .bind(student)
    .bind(company)
    .bind(yesterday)
    .bind(t(10, 0))
    .bind(t(10, 30))
    .fetch_one(&pool)
    .await
    .expect("insert meeting");

    let lifecycle = LifecycleManager::new(pool.clone(), Notifier::from_env());

    // a stranger cannot rate
    let stranger = create_user(&pool, "student").await;
    let err = lifecycle
        .rate(
            meeting_id,
            stranger,
            scheduler::models::meeting::MeetingRating {
                success: 5,
                platform: 5,
            },
        )
        .await
        .expect_err("stranger rating must fail");
    assert!(matches!(err, SchedulingError::Authorization(_)));

    // a party can; the elapsed accepted meeting completes lazily
    let rated = lifecycle
        .rate(
            meeting_id,
            student,
            scheduler::models::meeting::MeetingRating {
                success: 4,
                platform: 5,
            },
        )
        .await
        .expect("party rating succeeds");
    assert_eq!(rated.status, MeetingStatus::Completed);
    assert_eq!(rated.requestor_rating.map(|r| r.success), Some(4));
    assert!(rated.recipient_rating.is_none());
}
