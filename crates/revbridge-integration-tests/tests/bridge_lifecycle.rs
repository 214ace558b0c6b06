//! Integration test: full settlement lifecycle on durable storage.
//!
//! Exercises the complete flow against on-disk SQLite files:
//! 1. Seed the control plane and bridge two invoices
//! 2. Reject a replayed invoice without side effects
//! 3. Reverse one settlement and check totals and balances
//! 4. Dispute the other and check it has no monetary effect
//! 5. Reopen both databases and verify state and the event hash chain
//!
//! This test uses revbridge-bridge (gateway, admin), revbridge-db (ledger
//! database, event log), revbridge-partition (SQLite store) and
//! revbridge-types.

use revbridge_bridge::{BridgeConfig, BridgeError, RecordingSink, RevenueBridge};
use revbridge_partition::{PartitionStore, SqlitePartitionStore};
use revbridge_types::{
    AccountId, BridgeEvent, BridgeRequest, Currency, DestinationSystem, Partition, SettlementStatus,
    SourceSystem,
};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

const OWNER: AccountId = AccountId([0x01; 20]);
const OPERATOR: AccountId = AccountId([0x02; 20]);
const CUSTOMER: AccountId = AccountId([0x0C; 20]);
const TREASURY: AccountId = AccountId([0x7E; 20]);

fn config() -> BridgeConfig {
    BridgeConfig {
        owner: OWNER,
        operator: OPERATOR,
        chain_id: 8453,
        ..BridgeConfig::default()
    }
}

fn open_bridge(dir: &std::path::Path) -> RevenueBridge<SqlitePartitionStore> {
    let conn = revbridge_db::open(&dir.join("ledger.db")).expect("open ledger db");
    let store = SqlitePartitionStore::open(&dir.join("partitions.db")).expect("open partition db");
    RevenueBridge::new(conn, store, config(), BASE_TIME).expect("create bridge")
}

fn stripe_payment(invoice: &str, amount: u64) -> BridgeRequest {
    BridgeRequest {
        invoice_id: invoice.to_string(),
        amount,
        payer: Some(CUSTOMER),
        beneficiary: TREASURY,
        currency: Currency::Usd,
        source_system: SourceSystem::Stripe,
        destination_system: DestinationSystem::Treasury,
    }
}

fn treasury_balances<P: PartitionStore>(bridge: &RevenueBridge<P>) -> [u64; 4] {
    Partition::ALL.map(|p| bridge.partition_balance(p, &TREASURY).expect("balance"))
}

#[test]
fn settlement_lifecycle_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = RecordingSink::default();

    // =========================================================
    // Phase 1: Bridge two invoices
    // =========================================================
    let (inv_1, inv_2) = {
        let mut bridge = open_bridge(dir.path()).with_sink(sink.clone());

        let inv_1 = bridge
            .bridge_revenue(&OPERATOR, stripe_payment("in_1NqA", 10_000), BASE_TIME)
            .expect("bridge inv_1");
        let inv_2 = bridge
            .bridge_revenue(&OPERATOR, stripe_payment("in_1NqB", 5_000), BASE_TIME + 10)
            .expect("bridge inv_2");
        assert_ne!(inv_1, inv_2);
        assert_eq!(treasury_balances(&bridge), [6_000, 4_500, 3_000, 1_500]);

        // =========================================================
        // Phase 2: Webhook retry of inv_1 is rejected
        // =========================================================
        let replay = bridge.bridge_revenue(&OPERATOR, stripe_payment("in_1NqA", 10_000), BASE_TIME + 20);
        assert!(matches!(replay, Err(BridgeError::InvoiceAlreadyProcessed { .. })));
        assert_eq!(treasury_balances(&bridge), [6_000, 4_500, 3_000, 1_500]);

        // =========================================================
        // Phase 3: Refund inv_2
        // =========================================================
        bridge
            .reverse_settlement(&OPERATOR, &inv_2, "customer refund", BASE_TIME + 30)
            .expect("reverse inv_2");
        let totals = bridge.totals().expect("totals");
        assert_eq!(totals.total_revenue_bridged, 15_000);
        assert_eq!(totals.total_revenue_reversed, 5_000);
        assert_eq!(totals.net_revenue(), 10_000);
        assert_eq!(treasury_balances(&bridge), [4_000, 3_000, 2_000, 1_000]);

        // =========================================================
        // Phase 4: Dispute inv_1
        // =========================================================
        bridge
            .dispute_settlement(&OPERATOR, &inv_1, BASE_TIME + 40)
            .expect("dispute inv_1");
        assert_eq!(bridge.totals().expect("totals"), totals);
        assert_eq!(treasury_balances(&bridge), [4_000, 3_000, 2_000, 1_000]);

        (inv_1, inv_2)
    };

    // =========================================================
    // Phase 5: Reopen and verify everything persisted
    // =========================================================
    let bridge = open_bridge(dir.path());

    let entry_1 = bridge.get_settlement(&inv_1).expect("inv_1 persisted");
    assert_eq!(entry_1.status, SettlementStatus::Disputed);
    assert_eq!(entry_1.disputed_at, Some(BASE_TIME + 40));
    assert_eq!(entry_1.payer, Some(CUSTOMER));

    let entry_2 = bridge.settlement_by_invoice("in_1NqB").expect("inv_2 by invoice");
    assert_eq!(entry_2.settlement_id, inv_2);
    assert_eq!(entry_2.status, SettlementStatus::Reversed);
    assert_eq!(entry_2.reversal_reason.as_deref(), Some("customer refund"));

    assert_eq!(bridge.totals().expect("totals").net_revenue(), 10_000);
    assert_eq!(treasury_balances(&bridge), [4_000, 3_000, 2_000, 1_000]);

    // Persisted log equals what the live feed saw, and the chain verifies
    let persisted = bridge.events_since(0, 1_000).expect("events");
    assert_eq!(persisted, sink.records());
    assert_eq!(bridge.verify_event_log().expect("verify chain"), persisted.len() as u64);

    let bridged: Vec<_> = persisted
        .iter()
        .filter(|r| matches!(r.event, BridgeEvent::RevenueBridged(_)))
        .collect();
    assert_eq!(bridged.len(), 2, "exactly one RevenueBridged per successful bridge");
}

#[test]
fn operator_rotation_and_pause_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut bridge = open_bridge(dir.path());
    let new_operator = AccountId([0x99; 20]);

    bridge.pause(&OWNER, BASE_TIME).expect("pause");
    assert!(matches!(
        bridge.bridge_revenue(&OPERATOR, stripe_payment("inv_p", 100), BASE_TIME),
        Err(BridgeError::OperationPaused)
    ));

    // The owner can still administer while paused
    bridge
        .set_operator(&OWNER, &new_operator, BASE_TIME + 1)
        .expect("rotate operator");
    bridge.unpause(&OWNER, BASE_TIME + 2).expect("unpause");

    assert!(matches!(
        bridge.bridge_revenue(&OPERATOR, stripe_payment("inv_p", 100), BASE_TIME + 3),
        Err(BridgeError::Unauthorized { .. })
    ));
    bridge
        .bridge_revenue(&new_operator, stripe_payment("inv_p", 100), BASE_TIME + 3)
        .expect("new operator bridges");

    drop(bridge);
    let reopened = open_bridge(dir.path());
    assert_eq!(reopened.operator().expect("operator"), new_operator);
    assert!(!reopened.is_paused().expect("paused"));
}

#[test]
fn reversal_after_reallocation_burns_original_split() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut bridge = open_bridge(dir.path());

    let old = bridge
        .bridge_revenue(&OPERATOR, stripe_payment("inv_old", 10_000), BASE_TIME)
        .expect("bridge under default weights");

    bridge
        .set_allocation(
            &OWNER,
            revbridge_types::AllocationConfig::new(1000, 1000, 1000, 7000),
            BASE_TIME + 1,
        )
        .expect("reallocate");
    bridge
        .bridge_revenue(&OPERATOR, stripe_payment("inv_new", 10_000), BASE_TIME + 2)
        .expect("bridge under new weights");
    assert_eq!(treasury_balances(&bridge), [5_000, 4_000, 3_000, 8_000]);

    bridge
        .reverse_settlement(&OPERATOR, &old, "chargeback", BASE_TIME + 3)
        .expect("reverse old settlement");

    // Only the new settlement's split remains
    assert_eq!(treasury_balances(&bridge), [1_000, 1_000, 1_000, 7_000]);
}
