//! Property tests over the bridge as a whole.
//!
//! Each case builds a fresh bridge over in-memory stores and checks an
//! invariant across randomly generated amounts, weights and call sequences.

use proptest::prelude::*;

use revbridge_allocation::{allocate, DEFAULT_ALLOCATION};
use revbridge_bridge::{BridgeConfig, BridgeError, RevenueBridge};
use revbridge_crypto::ids;
use revbridge_partition::{MemoryPartitionStore, PartitionStore};
use revbridge_types::{AccountId, AllocationConfig, Amount, Partition};

const BASE_TIME: u64 = 1_700_000_000;

const OWNER: AccountId = AccountId([0x01; 20]);
const OPERATOR: AccountId = AccountId([0x02; 20]);
const BENEFICIARY: AccountId = AccountId([0xBE; 20]);

fn memory_bridge(allocation: AllocationConfig) -> RevenueBridge<MemoryPartitionStore> {
    let conn = revbridge_db::open_memory().expect("open ledger db");
    let config = BridgeConfig {
        owner: OWNER,
        operator: OPERATOR,
        chain_id: 31337,
        allocation,
        ..BridgeConfig::default()
    };
    RevenueBridge::new(conn, MemoryPartitionStore::new(), config, BASE_TIME).expect("create bridge")
}

fn balances<P: PartitionStore>(bridge: &RevenueBridge<P>) -> [Amount; 4] {
    Partition::ALL.map(|p| bridge.partition_balance(p, &BENEFICIARY).expect("balance"))
}

/// Four weights summing to exactly 10 000 basis points.
fn valid_weights() -> impl Strategy<Value = AllocationConfig> {
    (0u16..=10_000, 0u16..=10_000, 0u16..=10_000).prop_map(|(a, b, c)| {
        let mut cuts = [a, b, c];
        cuts.sort_unstable();
        AllocationConfig::new(cuts[0], cuts[1] - cuts[0], cuts[2] - cuts[1], 10_000 - cuts[2])
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every bridged unit lands in exactly one partition.
    #[test]
    fn issued_split_sums_to_amount(amount in 1u64..=u64::MAX / 4, weights in valid_weights()) {
        let mut bridge = memory_bridge(weights);
        let sid = bridge
            .bridge_revenue_simple(&OPERATOR, "inv_prop", amount, &BENEFICIARY, BASE_TIME)
            .expect("bridge");

        let issued: u128 = balances(&bridge).iter().map(|&b| u128::from(b)).sum();
        prop_assert_eq!(issued, u128::from(amount));

        let entry = bridge.get_settlement(&sid).expect("entry");
        prop_assert_eq!(entry.allocation, allocate(amount, &weights).expect("allocate"));
    }

    /// A replayed invoice is rejected and changes nothing.
    #[test]
    fn replay_is_side_effect_free(amount in 1u64..=1_000_000_000, retries in 1usize..5) {
        let mut bridge = memory_bridge(DEFAULT_ALLOCATION);
        bridge
            .bridge_revenue_simple(&OPERATOR, "inv_retry", amount, &BENEFICIARY, BASE_TIME)
            .expect("first delivery");
        let totals = bridge.totals().expect("totals");
        let held = balances(&bridge);
        let events = bridge.events_since(0, 1_000).expect("events").len();

        for retry in 0..retries {
            let result = bridge.bridge_revenue_simple(
                &OPERATOR,
                "inv_retry",
                amount,
                &BENEFICIARY,
                BASE_TIME + 1 + retry as u64,
            );
            let rejected = matches!(result, Err(BridgeError::InvoiceAlreadyProcessed { .. }));
            prop_assert!(rejected);
        }

        prop_assert_eq!(bridge.totals().expect("totals"), totals);
        prop_assert_eq!(balances(&bridge), held);
        prop_assert_eq!(bridge.events_since(0, 1_000).expect("events").len(), events);
    }

    /// Reversing every settlement returns all balances and net revenue to zero.
    #[test]
    fn reversing_everything_nets_to_zero(amounts in prop::collection::vec(1u64..=10_000_000, 1..8)) {
        let mut bridge = memory_bridge(DEFAULT_ALLOCATION);
        let mut settled = Vec::with_capacity(amounts.len());
        for (i, &amount) in amounts.iter().enumerate() {
            let sid = bridge
                .bridge_revenue_simple(&OPERATOR, &format!("inv_{i}"), amount, &BENEFICIARY, BASE_TIME)
                .expect("bridge");
            settled.push(sid);
        }

        let bridged: u64 = amounts.iter().sum();
        prop_assert_eq!(bridge.totals().expect("totals").total_revenue_bridged, bridged);

        for sid in &settled {
            bridge
                .reverse_settlement(&OPERATOR, sid, "refund", BASE_TIME + 1)
                .expect("reverse");
        }

        let totals = bridge.totals().expect("totals");
        prop_assert_eq!(totals.total_revenue_reversed, bridged);
        prop_assert_eq!(totals.net_revenue(), 0);
        prop_assert_eq!(balances(&bridge), [0; 4]);
        for partition in Partition::ALL {
            prop_assert_eq!(bridge.partition_store().total_supply(partition).expect("supply"), 0);
        }
    }

    /// Settlement IDs separate on every input component.
    #[test]
    fn settlement_ids_are_distinct(
        invoice in "[a-z0-9_]{1,32}",
        timestamp in any::<u64>(),
        nonce in 1u64..u64::MAX,
        chain_id in any::<u64>(),
    ) {
        let base = ids::settlement_id(&invoice, timestamp, nonce, chain_id);
        prop_assert_eq!(base, ids::settlement_id(&invoice, timestamp, nonce, chain_id));
        prop_assert_ne!(base, ids::settlement_id(&invoice, timestamp, nonce + 1, chain_id));
        prop_assert_ne!(base, ids::settlement_id(&invoice, timestamp.wrapping_add(1), nonce, chain_id));
        prop_assert_ne!(base, ids::settlement_id(&invoice, timestamp, nonce, chain_id.wrapping_add(1)));
        prop_assert_ne!(base, ids::settlement_id(&format!("{invoice}x"), timestamp, nonce, chain_id));
    }
}

#[test]
fn same_invoice_and_time_on_two_ledgers_differs_by_chain() {
    let mut mainnet = {
        let conn = revbridge_db::open_memory().expect("open");
        let config = BridgeConfig {
            owner: OWNER,
            operator: OPERATOR,
            chain_id: 1,
            ..BridgeConfig::default()
        };
        RevenueBridge::new(conn, MemoryPartitionStore::new(), config, BASE_TIME).expect("bridge")
    };
    let mut devnet = memory_bridge(DEFAULT_ALLOCATION);

    let a = mainnet
        .bridge_revenue_simple(&OPERATOR, "inv_same", 100, &BENEFICIARY, BASE_TIME)
        .expect("mainnet");
    let b = devnet
        .bridge_revenue_simple(&OPERATOR, "inv_same", 100, &BENEFICIARY, BASE_TIME)
        .expect("devnet");
    assert_ne!(a, b);
}
