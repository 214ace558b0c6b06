//! SQL schema definitions.

/// Complete schema for the v1 ledger database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Settlements
-- ============================================================

CREATE TABLE IF NOT EXISTS settlements (
    settlement_id BLOB PRIMARY KEY CHECK (length(settlement_id) = 32),
    invoice_id TEXT NOT NULL UNIQUE,
    payer BLOB,
    beneficiary BLOB NOT NULL CHECK (length(beneficiary) = 20),
    amount INTEGER NOT NULL CHECK (amount > 0),
    currency TEXT NOT NULL,
    source_system TEXT NOT NULL,
    destination_system TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'settled', 'reversed', 'disputed')),
    reserve_amount INTEGER NOT NULL,
    liquidity_amount INTEGER NOT NULL,
    enterprise_amount INTEGER NOT NULL,
    staking_amount INTEGER NOT NULL,
    reserve_bps INTEGER NOT NULL,
    liquidity_bps INTEGER NOT NULL,
    enterprise_bps INTEGER NOT NULL,
    staking_bps INTEGER NOT NULL,
    nonce INTEGER NOT NULL UNIQUE,
    bridged_at INTEGER NOT NULL,
    settled_at INTEGER NOT NULL,
    reversal_reason TEXT,
    reversed_at INTEGER,
    disputed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_settlements_beneficiary ON settlements(beneficiary);
CREATE INDEX IF NOT EXISTS idx_settlements_bridged_at ON settlements(bridged_at);

-- Permanent invoice -> settlement mapping. Rows are never deleted.
CREATE TABLE IF NOT EXISTS invoice_index (
    invoice_id TEXT PRIMARY KEY,
    settlement_id BLOB NOT NULL REFERENCES settlements(settlement_id),
    indexed_at INTEGER NOT NULL
);

-- ============================================================
-- Ledger state (single row)
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    total_revenue_bridged INTEGER NOT NULL DEFAULT 0,
    total_revenue_reversed INTEGER NOT NULL DEFAULT 0,
    settlement_count INTEGER NOT NULL DEFAULT 0,
    nonce INTEGER NOT NULL DEFAULT 0
);

-- ============================================================
-- Control plane (single row, created on first bridge start)
-- ============================================================

CREATE TABLE IF NOT EXISTS bridge_admin (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    owner BLOB NOT NULL CHECK (length(owner) = 20),
    operator BLOB NOT NULL CHECK (length(operator) = 20),
    reserve_bps INTEGER NOT NULL,
    liquidity_bps INTEGER NOT NULL,
    enterprise_bps INTEGER NOT NULL,
    staking_bps INTEGER NOT NULL,
    paused INTEGER NOT NULL DEFAULT 0,
    chain_id INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Append-only audit feed, hash-chained
-- ============================================================

CREATE TABLE IF NOT EXISTS event_log (
    sequence INTEGER PRIMARY KEY,
    event_type TEXT NOT NULL,
    settlement_id BLOB,
    payload TEXT NOT NULL,
    digest BLOB NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_event_log_settlement ON event_log(settlement_id);
"#;
