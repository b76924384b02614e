use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::Database;
use uuid::Uuid;

use engine::{Engine, EngineError, MoneyCents, RecordExpenseCmd, SettleDebtCmd};
use migration::MigratorTrait;

async fn engine_with_users(users: &[(&str, &str)]) -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for (id, email) in users {
        engine.sync_user(id, email, id, Utc::now()).await.unwrap();
    }
    engine
}

/// File-backed database for tests that exercise concurrent access; a pooled
/// `sqlite::memory:` connection cannot be shared across tasks reliably.
async fn engine_with_file_db(users: &[(&str, &str)]) -> (Engine, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    for (id, email) in users {
        engine.sync_user(id, email, id, Utc::now()).await.unwrap();
    }
    (engine, path)
}

async fn group_with_members(engine: &Engine, owner: &str, members: &[(&str, &str)]) -> String {
    let group_id = engine
        .create_group("Goa Trip", None, owner, Utc::now())
        .await
        .unwrap();
    for (user, email) in members {
        let created = engine
            .create_invitation(&group_id, email, owner, Utc::now())
            .await
            .unwrap();
        engine
            .accept_invitation(&created.token, user, Utc::now())
            .await
            .unwrap();
    }
    group_id
}

/// Records an expense paid by `payer` where `debtor` owes `amount_minor`.
async fn owe(
    engine: &Engine,
    group_id: &str,
    payer: &str,
    debtor: &str,
    amount_minor: i64,
    at: chrono::DateTime<Utc>,
) {
    let cmd = RecordExpenseCmd::new(group_id, payer, "Shared", amount_minor)
        .split(debtor, amount_minor);
    engine.record_expense(cmd, at).await.unwrap();
}

#[tokio::test]
async fn settling_exactly_one_split_clears_the_debt() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let now = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 5_000, now).await;

    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 5_000).note("UPI transfer"),
            now,
        )
        .await
        .unwrap();

    assert_eq!(outcome.settled_split_ids.len(), 1);
    assert_eq!(outcome.settled_amount, MoneyCents::new(5_000));
    assert_eq!(outcome.remaining_amount, MoneyCents::ZERO);
    assert!(outcome.receipt_id.is_some());

    let bob = engine.user_balance(&group_id, "bob", "bob").await.unwrap();
    assert_eq!(bob.net, MoneyCents::ZERO);

    let receipts = engine
        .list_group_settlements(&group_id, "alice", 10)
        .await
        .unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].payer_id, "bob");
    assert_eq!(receipts[0].receiver_id, "alice");
    assert_eq!(receipts[0].amount_minor, 5_000);
    assert_eq!(receipts[0].description.as_deref(), Some("UPI transfer"));
}

#[tokio::test]
async fn settlement_is_fifo_and_never_splits_a_split() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let t0 = Utc::now();

    // Older debt 30.00, newer debt 40.00.
    owe(&engine, &group_id, "alice", "bob", 3_000, t0).await;
    owe(&engine, &group_id, "alice", "bob", 4_000, t0 + Duration::seconds(1)).await;

    // 50.00 covers the older split whole, but not the newer one.
    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 5_000),
            t0 + Duration::seconds(2),
        )
        .await
        .unwrap();

    assert_eq!(outcome.settled_split_ids.len(), 1);
    assert_eq!(outcome.settled_amount, MoneyCents::new(3_000));
    assert_eq!(outcome.remaining_amount, MoneyCents::new(2_000));

    // The settled one is the oldest.
    let expenses = engine
        .list_group_expenses(&group_id, "bob", 10)
        .await
        .unwrap();
    for (expense, splits) in &expenses {
        for split in splits {
            let expected = expense.amount_minor == 3_000;
            assert_eq!(split.settled, expected);
            assert_eq!(split.settled_at.is_some(), expected);
        }
    }

    let bob = engine.user_balance(&group_id, "bob", "bob").await.unwrap();
    assert_eq!(bob.amount_owes, MoneyCents::new(4_000));
}

#[tokio::test]
async fn fifo_walk_consumes_as_many_whole_splits_as_fit() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let t0 = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 1_000, t0).await;
    owe(&engine, &group_id, "alice", "bob", 2_000, t0 + Duration::seconds(1)).await;
    owe(&engine, &group_id, "alice", "bob", 3_000, t0 + Duration::seconds(2)).await;

    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 3_500),
            t0 + Duration::seconds(3),
        )
        .await
        .unwrap();

    // t1 and t2 fit (1000 + 2000); t3 does not.
    assert_eq!(outcome.settled_split_ids.len(), 2);
    assert_eq!(outcome.settled_amount, MoneyCents::new(3_000));
    assert_eq!(outcome.remaining_amount, MoneyCents::new(500));
}

#[tokio::test]
async fn overpaying_is_informational_not_an_error() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let now = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 2_500, now).await;

    // The creditor may also initiate the settlement.
    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "alice", "bob", "alice", 10_000),
            now,
        )
        .await
        .unwrap();

    assert_eq!(outcome.settled_amount, MoneyCents::new(2_500));
    assert_eq!(outcome.remaining_amount, MoneyCents::new(7_500));

    // Receipt records what was actually settled.
    let receipts = engine
        .list_group_settlements(&group_id, "bob", 10)
        .await
        .unwrap();
    assert_eq!(receipts[0].amount_minor, 2_500);
}

#[tokio::test]
async fn zero_settlement_is_a_valid_outcome_without_receipt() {
    let engine =
        engine_with_users(&[("alice", "alice@example.com"), ("bob", "bob@example.com")]).await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let now = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 5_000, now).await;

    // 10.00 cannot consume the 50.00 split.
    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 1_000),
            now,
        )
        .await
        .unwrap();

    assert!(outcome.settled_split_ids.is_empty());
    assert_eq!(outcome.settled_amount, MoneyCents::ZERO);
    assert_eq!(outcome.remaining_amount, MoneyCents::new(1_000));
    assert!(outcome.receipt_id.is_none());

    assert!(
        engine
            .list_group_settlements(&group_id, "bob", 10)
            .await
            .unwrap()
            .is_empty()
    );
    let bob = engine.user_balance(&group_id, "bob", "bob").await.unwrap();
    assert_eq!(bob.amount_owes, MoneyCents::new(5_000));
}

#[tokio::test]
async fn settlement_preconditions_reject_bad_requests() {
    let engine = engine_with_users(&[
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
        ("carol", "carol@example.com"),
    ])
    .await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let now = Utc::now();

    // Non-positive amount.
    assert!(matches!(
        engine
            .settle_debt(SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 0), now)
            .await
            .unwrap_err(),
        EngineError::InvalidAmount(_)
    ));

    // Caller must be a party to the debt.
    assert!(matches!(
        engine
            .settle_debt(
                SettleDebtCmd::new(&group_id, "carol", "bob", "alice", 1_000),
                now
            )
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));

    // Debtor and creditor must differ.
    assert!(matches!(
        engine
            .settle_debt(SettleDebtCmd::new(&group_id, "bob", "bob", "bob", 1_000), now)
            .await
            .unwrap_err(),
        EngineError::InvalidAmount(_)
    ));

    // Both parties must be members; carol never joined.
    assert!(matches!(
        engine
            .settle_debt(
                SettleDebtCmd::new(&group_id, "bob", "bob", "carol", 1_000),
                now
            )
            .await
            .unwrap_err(),
        EngineError::Forbidden(_)
    ));
}

#[tokio::test]
async fn settlement_only_touches_the_requested_pair() {
    let engine = engine_with_users(&[
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
        ("carol", "carol@example.com"),
    ])
    .await;
    let group_id = group_with_members(
        &engine,
        "alice",
        &[("bob", "bob@example.com"), ("carol", "carol@example.com")],
    )
    .await;
    let now = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 3_000, now).await;
    owe(&engine, &group_id, "carol", "bob", 3_000, now + Duration::seconds(1)).await;

    let outcome = engine
        .settle_debt(
            SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 10_000),
            now + Duration::seconds(2),
        )
        .await
        .unwrap();

    // Only the debt towards alice was retired.
    assert_eq!(outcome.settled_amount, MoneyCents::new(3_000));
    let bob = engine.user_balance(&group_id, "bob", "bob").await.unwrap();
    assert_eq!(bob.amount_owes, MoneyCents::new(3_000));
}

#[tokio::test]
async fn concurrent_settlements_for_the_same_pair_never_double_settle() {
    let (engine, path) = engine_with_file_db(&[
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
    ])
    .await;
    let group_id =
        group_with_members(&engine, "alice", &[("bob", "bob@example.com")]).await;
    let t0 = Utc::now();

    owe(&engine, &group_id, "alice", "bob", 3_000, t0).await;
    owe(&engine, &group_id, "alice", "bob", 4_000, t0 + Duration::seconds(1)).await;

    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        let group_id = group_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .settle_debt(
                    SettleDebtCmd::new(&group_id, "bob", "bob", "alice", 3_000),
                    Utc::now(),
                )
                .await
                .unwrap()
        }));
    }

    let mut settled_ids: Vec<Uuid> = Vec::new();
    let mut settled_total = MoneyCents::ZERO;
    for handle in handles {
        let outcome = handle.await.unwrap();
        settled_ids.extend(outcome.settled_split_ids);
        settled_total += outcome.settled_amount;
    }

    // Whatever the interleaving, the 30.00 split is settled exactly once and
    // the 40.00 split is untouched (no request could cover it whole).
    settled_ids.sort();
    settled_ids.dedup();
    assert_eq!(settled_ids.len(), 1);
    assert_eq!(settled_total, MoneyCents::new(3_000));

    let bob = engine.user_balance(&group_id, "bob", "bob").await.unwrap();
    assert_eq!(bob.amount_owes, MoneyCents::new(4_000));

    let receipts = engine
        .list_group_settlements(&group_id, "bob", 10)
        .await
        .unwrap();
    assert_eq!(receipts.len(), 1);

    drop(engine);
    let _ = std::fs::remove_file(path);
}
