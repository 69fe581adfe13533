mod common;

use common::{CLUB, TestLedger};
use fairway_ledger::application::check_in::CheckInOptions;
use fairway_ledger::application::settlement::SettleRequest;
use fairway_ledger::domain::money::Money;
use fairway_ledger::domain::policy::{ClubPolicy, MemberStatus};
use fairway_ledger::domain::ports::LedgerStore;
use fairway_ledger::domain::tax::TaxType;
use fairway_ledger::error::LedgerError;
use rust_decimal_macros::dec;

fn strict() -> ClubPolicy {
    ClubPolicy {
        allow_partial_payment: true,
        block_suspended_members: true,
        require_all_items_paid: true,
    }
}

fn ids(players: &[&str]) -> Vec<String> {
    players.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn test_flight_check_in_refuses_only_the_debtor() {
    let ledger = TestLedger::new().await;
    ledger.policies.set(CLUB, strict()).await;
    ledger
        .add("p1", dec!(50), TaxType::Exempt, dec!(0), 1)
        .await;

    let flight = ledger
        .engine
        .check_in()
        .check_in_flight("tt-1", &ids(&["p1", "p2"]), "starter", &CheckInOptions::default())
        .await
        .unwrap();

    assert!(!flight.success);
    let ana = flight.result_for("p1").unwrap();
    assert!(!ana.success);
    assert!(ana.message.contains("50.00"), "message was {}", ana.message);
    assert!(flight.result_for("p2").unwrap().success);

    let store = &ledger.engine.context().store;
    assert!(store.slot("p1").await.unwrap().unwrap().checked_in_at.is_none());
    assert!(store.slot("p2").await.unwrap().unwrap().checked_in_at.is_some());
}

#[tokio::test]
async fn test_settle_then_check_in() {
    let ledger = TestLedger::new().await;
    ledger.policies.set(CLUB, strict()).await;
    ledger.green_fee("p1", dec!(100)).await;

    let outcome = ledger
        .engine
        .settlement()
        .settle_player(SettleRequest {
            slot_id: "p1".to_string(),
            payment_method_id: "cash".to_string(),
            actor: "pro".to_string(),
            line_item_ids: None,
            reference: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome.amount_paid, Money::new(dec!(107)));
    assert_eq!(outcome.remaining_balance, Money::ZERO);
    assert!(outcome.transaction_number.is_some());

    let result = ledger
        .engine
        .check_in()
        .check_in_player("p1", "starter", &CheckInOptions::default())
        .await
        .unwrap();
    assert!(result.success);

    let record = ledger
        .engine
        .context()
        .store
        .check_in_record("p1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.total_paid, Money::new(dec!(107)));
    assert!(record.settled_at.is_some());
    assert_eq!(record.checked_in_by.as_deref(), Some("starter"));
}

#[tokio::test]
async fn test_suspended_member_blocked_even_with_skip() {
    let ledger = TestLedger::new().await;
    ledger.members.set("m1", MemberStatus::Suspended).await;

    let options = CheckInOptions {
        skip_validation: true,
        notes: None,
    };
    let result = ledger
        .engine
        .check_in()
        .check_in_player("p1", "starter", &options)
        .await;
    assert!(matches!(result, Err(LedgerError::PolicyViolation(_))));
}

#[tokio::test]
async fn test_check_in_all_skips_already_checked_in() {
    let ledger = TestLedger::new().await;
    let check_in = ledger.engine.check_in();
    check_in
        .check_in_player("p3", "starter", &CheckInOptions::default())
        .await
        .unwrap();

    let flight = check_in
        .check_in_all_players("tt-1", "starter", &CheckInOptions::default())
        .await
        .unwrap();
    assert!(flight.success);
    assert_eq!(flight.results.len(), 3);
    assert!(flight.result_for("p3").is_none());

    let again = check_in
        .check_in_all_players("tt-1", "starter", &CheckInOptions::default())
        .await
        .unwrap();
    assert!(again.results.is_empty());
    assert!(again.success);
}

#[tokio::test]
async fn test_settle_all_players() {
    let ledger = TestLedger::new().await;
    ledger.green_fee("p1", dec!(100)).await;
    ledger.green_fee("p2", dec!(50)).await;

    let settled = ledger
        .engine
        .settlement()
        .settle_all_players("tt-1", "cash", "pro")
        .await
        .unwrap();
    assert!(settled.success);
    assert_eq!(settled.total_paid, Money::new(dec!(160.50)));
    assert_eq!(settled.results.len(), 2);
    assert_eq!(settled.already_settled, ids(&["p3", "p4"]));

    let cart = ledger.engine.carts().get_slot_cart("p2").await.unwrap();
    assert!(cart.is_settled);
}

#[tokio::test]
async fn test_settle_with_card_needs_reference() {
    let ledger = TestLedger::new().await;
    ledger.green_fee("p1", dec!(100)).await;

    let settled = ledger
        .engine
        .settlement()
        .settle_all_players("tt-1", "card", "pro")
        .await
        .unwrap();
    assert!(!settled.success);
    assert_eq!(settled.total_paid, Money::ZERO);
    assert!(!settled.results[0].success);
}
