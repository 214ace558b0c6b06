//! Owner-only control plane.
//!
//! Admin calls are never gated by pause, so the owner can always unpause,
//! rotate the operator or hand over ownership.

use tracing::info;

use revbridge_allocation::validate_allocation;
use revbridge_db::queries::admin::{self, AdminState};
use revbridge_partition::PartitionStore;
use revbridge_types::{AccountId, AllocationConfig, BridgeEvent};

use crate::bridge::{append_events, require_owner, RevenueBridge};
use crate::{BridgeError, Result};

impl<P: PartitionStore> RevenueBridge<P> {
    /// Replace the bridge operator.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unauthorized`] unless `caller` is the owner
    /// - [`BridgeError::ZeroAddress`] if `new_operator` is zero
    pub fn set_operator(&mut self, caller: &AccountId, new_operator: &AccountId, now: u64) -> Result<()> {
        let state = self.admin_state()?;
        require_owner(&state, caller)?;
        if new_operator.is_zero() {
            return Err(BridgeError::ZeroAddress);
        }

        let event = BridgeEvent::OperatorUpdated {
            previous: state.operator,
            current: *new_operator,
        };
        self.commit_admin(
            AdminState {
                operator: *new_operator,
                updated_at: now,
                ..state
            },
            event,
            now,
        )?;
        info!(previous = %state.operator, current = %new_operator, "operator updated");
        Ok(())
    }

    /// Replace the allocation weights. Existing settlements keep the split
    /// they were bridged with.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unauthorized`] unless `caller` is the owner
    /// - [`BridgeError::InvalidPercentages`] unless the weights sum to 10000
    pub fn set_allocation(&mut self, caller: &AccountId, config: AllocationConfig, now: u64) -> Result<()> {
        let state = self.admin_state()?;
        require_owner(&state, caller)?;
        validate_allocation(&config)?;

        let event = BridgeEvent::AllocationUpdated {
            previous: state.allocation,
            current: config,
        };
        self.commit_admin(
            AdminState {
                allocation: config,
                updated_at: now,
                ..state
            },
            event,
            now,
        )?;
        info!(
            reserve_bps = config.reserve_bps,
            liquidity_bps = config.liquidity_bps,
            enterprise_bps = config.enterprise_bps,
            staking_bps = config.staking_bps,
            "allocation updated"
        );
        Ok(())
    }

    /// Halt bridging, reversal and dispute. Idempotent; a repeated pause
    /// still emits `Paused`.
    pub fn pause(&mut self, caller: &AccountId, now: u64) -> Result<()> {
        self.set_paused(caller, true, now)
    }

    /// Resume operator actions.
    pub fn unpause(&mut self, caller: &AccountId, now: u64) -> Result<()> {
        self.set_paused(caller, false, now)
    }

    /// Hand the owner role to `new_owner`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unauthorized`] unless `caller` is the owner
    /// - [`BridgeError::ZeroAddress`] if `new_owner` is zero
    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: &AccountId, now: u64) -> Result<()> {
        let state = self.admin_state()?;
        require_owner(&state, caller)?;
        if new_owner.is_zero() {
            return Err(BridgeError::ZeroAddress);
        }

        let event = BridgeEvent::OwnershipTransferred {
            previous: state.owner,
            current: *new_owner,
        };
        self.commit_admin(
            AdminState {
                owner: *new_owner,
                updated_at: now,
                ..state
            },
            event,
            now,
        )?;
        info!(previous = %state.owner, current = %new_owner, "ownership transferred");
        Ok(())
    }

    fn set_paused(&mut self, caller: &AccountId, paused: bool, now: u64) -> Result<()> {
        let state = self.admin_state()?;
        require_owner(&state, caller)?;

        let event = if paused {
            BridgeEvent::Paused { by: *caller }
        } else {
            BridgeEvent::Unpaused { by: *caller }
        };
        self.commit_admin(
            AdminState {
                paused,
                updated_at: now,
                ..state
            },
            event,
            now,
        )?;
        info!(paused, by = %caller, "pause state changed");
        Ok(())
    }

    /// Persist the new control-plane row and its event together.
    fn commit_admin(&mut self, next: AdminState, event: BridgeEvent, now: u64) -> Result<()> {
        let tx = self.conn.transaction()?;
        admin::put(&tx, &next)?;
        let records = append_events(&tx, next.chain_id, now, &[event])?;
        tx.commit()?;
        self.publish(&records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use revbridge_allocation::DEFAULT_ALLOCATION;

    const NEW_OPERATOR: AccountId = AccountId([0x42; 20]);

    #[test]
    fn test_set_operator() {
        let (mut bridge, sink) = test_bridge();
        bridge.set_operator(&OWNER, &NEW_OPERATOR, BASE_TIME).expect("set operator");
        assert_eq!(bridge.operator().expect("operator"), NEW_OPERATOR);
        assert_eq!(
            sink.records()[0].event,
            BridgeEvent::OperatorUpdated {
                previous: OPERATOR,
                current: NEW_OPERATOR,
            }
        );

        // Old operator lost its rights, new one has them
        assert!(matches!(
            bridge.bridge_revenue_simple(&OPERATOR, "inv_1", 10, &BENEFICIARY, BASE_TIME),
            Err(BridgeError::Unauthorized { .. })
        ));
        bridge
            .bridge_revenue_simple(&NEW_OPERATOR, "inv_1", 10, &BENEFICIARY, BASE_TIME)
            .expect("new operator bridges");
    }

    #[test]
    fn test_set_operator_owner_only() {
        let (mut bridge, _) = test_bridge();
        assert!(matches!(
            bridge.set_operator(&OPERATOR, &NEW_OPERATOR, BASE_TIME),
            Err(BridgeError::Unauthorized { .. })
        ));
        assert_eq!(bridge.operator().expect("operator"), OPERATOR);
    }

    #[test]
    fn test_set_operator_rejects_zero() {
        let (mut bridge, sink) = test_bridge();
        assert!(matches!(
            bridge.set_operator(&OWNER, &AccountId::ZERO, BASE_TIME),
            Err(BridgeError::ZeroAddress)
        ));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_set_allocation_validates_sum() {
        let (mut bridge, _) = test_bridge();
        let result = bridge.set_allocation(&OWNER, AllocationConfig::new(4000, 3000, 2000, 999), BASE_TIME);
        assert!(matches!(result, Err(BridgeError::InvalidPercentages { total: 9_999 })));
        assert_eq!(bridge.allocation().expect("allocation"), DEFAULT_ALLOCATION);
    }

    #[test]
    fn test_set_allocation_applies_to_future_bridges() {
        let (mut bridge, sink) = test_bridge();
        let equal = AllocationConfig::new(2500, 2500, 2500, 2500);
        bridge.set_allocation(&OWNER, equal, BASE_TIME).expect("set allocation");
        assert_eq!(
            sink.records()[0].event,
            BridgeEvent::AllocationUpdated {
                previous: DEFAULT_ALLOCATION,
                current: equal,
            }
        );

        let sid = bridge
            .bridge_revenue_simple(&OPERATOR, "inv_1", 1_000, &BENEFICIARY, BASE_TIME)
            .expect("bridge");
        let entry = bridge.get_settlement(&sid).expect("get");
        assert_eq!(entry.allocation_config, equal);
        assert_eq!(entry.allocation.reserve, 250);
    }

    #[test]
    fn test_pause_gates_operator_actions() {
        let (mut bridge, sink) = test_bridge();
        let sid = bridge
            .bridge_revenue_simple(&OPERATOR, "inv_0", 100, &BENEFICIARY, BASE_TIME)
            .expect("bridge");

        bridge.pause(&OWNER, BASE_TIME).expect("pause");
        assert!(bridge.is_paused().expect("paused"));
        assert!(matches!(
            bridge.bridge_revenue_simple(&OPERATOR, "inv_1", 100, &BENEFICIARY, BASE_TIME),
            Err(BridgeError::OperationPaused)
        ));
        assert!(matches!(
            bridge.bridge_revenue_simple(&OWNER, "inv_1", 100, &BENEFICIARY, BASE_TIME),
            Err(BridgeError::OperationPaused)
        ));
        assert!(matches!(
            bridge.reverse_settlement(&OPERATOR, &sid, "refund", BASE_TIME),
            Err(BridgeError::OperationPaused)
        ));
        assert!(matches!(
            bridge.dispute_settlement(&OPERATOR, &sid, BASE_TIME),
            Err(BridgeError::OperationPaused)
        ));

        // Reads stay available
        assert_eq!(bridge.get_settlement(&sid).expect("read while paused").amount, 100);
        assert_eq!(bridge.totals().expect("totals").settlement_count, 1);

        bridge.unpause(&OWNER, BASE_TIME + 1).expect("unpause");
        bridge
            .bridge_revenue_simple(&OPERATOR, "inv_1", 100, &BENEFICIARY, BASE_TIME + 1)
            .expect("bridge after unpause");

        let types = sink.event_types();
        assert!(types.contains(&"Paused"));
        assert!(types.contains(&"Unpaused"));
    }

    #[test]
    fn test_pause_owner_only() {
        let (mut bridge, _) = test_bridge();
        assert!(matches!(bridge.pause(&OPERATOR, BASE_TIME), Err(BridgeError::Unauthorized { .. })));
        assert!(matches!(bridge.unpause(&STRANGER, BASE_TIME), Err(BridgeError::Unauthorized { .. })));
        assert!(!bridge.is_paused().expect("paused"));
    }

    #[test]
    fn test_admin_not_gated_by_pause() {
        let (mut bridge, _) = test_bridge();
        bridge.pause(&OWNER, BASE_TIME).expect("pause");
        bridge.set_operator(&OWNER, &NEW_OPERATOR, BASE_TIME).expect("set operator while paused");
        bridge
            .set_allocation(&OWNER, AllocationConfig::new(5000, 2000, 2000, 1000), BASE_TIME)
            .expect("set allocation while paused");
    }

    #[test]
    fn test_transfer_ownership() {
        let (mut bridge, sink) = test_bridge();
        bridge.transfer_ownership(&OWNER, &STRANGER, BASE_TIME).expect("transfer");
        assert_eq!(bridge.owner().expect("owner"), STRANGER);
        assert_eq!(
            sink.records()[0].event,
            BridgeEvent::OwnershipTransferred {
                previous: OWNER,
                current: STRANGER,
            }
        );

        assert!(matches!(bridge.pause(&OWNER, BASE_TIME), Err(BridgeError::Unauthorized { .. })));
        bridge.pause(&STRANGER, BASE_TIME).expect("new owner pauses");
        assert!(matches!(
            bridge.transfer_ownership(&STRANGER, &AccountId::ZERO, BASE_TIME),
            Err(BridgeError::ZeroAddress)
        ));
    }
}
