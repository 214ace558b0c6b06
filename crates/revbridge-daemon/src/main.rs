//! revbridge-daemon: the settlement bridge service.
//!
//! Single OS process running a Tokio async runtime. The off-chain webhook
//! processor and operator tooling talk to it via JSON-RPC over a Unix
//! socket in the data directory. Writes must be signed; see [`auth`].
//!
//! `revbridge-daemon account-id <public-key-hex>` prints the ledger account
//! controlled by an Ed25519 public key, for seeding `[bridge] owner`.

mod auth;
mod commands;
mod config;
mod events;
mod rpc;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use revbridge_bridge::RevenueBridge;
use revbridge_crypto::ed25519::{derive_account_id, VerifyingKey};
use revbridge_partition::{PartitionStore, SqlitePartitionStore};
use revbridge_types::AccountId;

use crate::auth::ReplayGuard;
use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::rpc::RpcServer;

/// Bridge over whichever partition store the daemon was started with.
pub type Bridge = RevenueBridge<Box<dyn PartitionStore + Send>>;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// The bridge. This mutex is the single serializer for every write.
    pub bridge: Mutex<Bridge>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Signatures already accepted for writes.
    pub replay_guard: Mutex<ReplayGuard>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, public_key] = args.as_slice() {
        if command == "account-id" {
            println!("{}", account_id_of(public_key)?);
            return Ok(());
        }
    }

    // 1. Load config (needed for the default log level)
    let config = DaemonConfig::load()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.advanced.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Revbridge daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open ledger and partition databases
    let conn = revbridge_db::open(&data_dir.join("ledger.db"))?;
    let store: Box<dyn PartitionStore + Send> =
        Box::new(SqlitePartitionStore::open(&data_dir.join("partitions.db"))?);

    // 3. Create event bus
    let event_bus = EventBus::new(config.advanced.event_buffer);

    // 4. Build the bridge, seeding the control plane on first start
    let bridge = RevenueBridge::new(conn, store, config.bridge_config(), commands::unix_now())
        .map_err(|e| anyhow::anyhow!("bridge initialization failed: {e} (is [bridge] owner set in config.toml?)"))?
        .with_sink(event_bus.clone());

    let verified = bridge.verify_event_log()?;
    let status = bridge.status()?;
    info!(
        events = verified,
        owner = %status.owner,
        operator = %status.operator,
        chain_id = status.chain_id,
        paused = status.paused,
        "ledger opened"
    );

    // 5. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 6. Build daemon state
    let state = Arc::new(DaemonState {
        bridge: Mutex::new(bridge),
        config,
        event_bus,
        replay_guard: Mutex::new(ReplayGuard::default()),
        shutdown_tx: shutdown_tx.clone(),
    });

    // 7. Trace every committed event
    let mut feed = state.event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(record) = feed.recv().await {
            debug!(
                sequence = record.sequence,
                event_type = record.event.event_type(),
                "event published"
            );
        }
    });

    // 8. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 9. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}

/// Ledger account of a hex-encoded Ed25519 public key.
fn account_id_of(public_key_hex: &str) -> anyhow::Result<AccountId> {
    let bytes: [u8; 32] = hex::decode(public_key_hex.trim_start_matches("0x"))?
        .try_into()
        .map_err(|_| anyhow::anyhow!("public key must be 32 bytes"))?;
    let key = VerifyingKey::from_bytes(&bytes)?;
    Ok(AccountId(derive_account_id(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revbridge_crypto::ed25519::KeyPair;

    #[test]
    fn test_account_id_of() {
        let kp = KeyPair::from_bytes(&[9u8; 32]);
        let hex_key = hex::encode(kp.verifying_key.to_bytes());
        assert_eq!(account_id_of(&hex_key).expect("account"), AccountId(kp.account_id()));
        assert_eq!(
            account_id_of(&format!("0x{hex_key}")).expect("prefixed"),
            AccountId(kp.account_id())
        );
        assert!(account_id_of("abcd").is_err());
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::Value;
    use tokio::sync::{broadcast, Mutex};

    use revbridge_bridge::{BridgeConfig, RevenueBridge};
    use revbridge_crypto::ed25519::KeyPair;
    use revbridge_crypto::ids;
    use revbridge_partition::{MemoryPartitionStore, PartitionStore};
    use revbridge_types::AccountId;

    use crate::auth::{canonical_body, ReplayGuard, AUTH_FIELD};
    use crate::config::DaemonConfig;
    use crate::events::EventBus;
    use crate::DaemonState;

    pub const CHAIN_ID: u64 = 31337;
    pub const BENEFICIARY: AccountId = AccountId([0xBE; 20]);

    pub fn owner_key() -> KeyPair {
        KeyPair::from_bytes(&[0x11; 32])
    }

    pub fn operator_key() -> KeyPair {
        KeyPair::from_bytes(&[0x22; 32])
    }

    pub fn stranger_key() -> KeyPair {
        KeyPair::from_bytes(&[0x33; 32])
    }

    pub fn owner() -> AccountId {
        AccountId(owner_key().account_id())
    }

    pub fn operator() -> AccountId {
        AccountId(operator_key().account_id())
    }

    pub fn stranger() -> AccountId {
        AccountId(stranger_key().account_id())
    }

    /// Set `caller` to the key's account and attach a signature over the
    /// request, the way a client does.
    pub fn sign_request(key: &KeyPair, method: &str, mut params: Value, issued_at: u64) -> Value {
        params["caller"] = serde_json::json!(AccountId(key.account_id()));
        let digest = ids::request_digest(method, &canonical_body(&params), CHAIN_ID, issued_at);
        let signature = key.signing_key.sign(&digest);
        params[AUTH_FIELD] = serde_json::json!({
            "public_key": hex::encode(key.verifying_key.to_bytes()),
            "signature": hex::encode(signature.to_bytes()),
            "issued_at": issued_at,
        });
        params
    }

    /// Daemon state over in-memory ledger and partition stores.
    pub fn test_state() -> Arc<DaemonState> {
        let conn = revbridge_db::open_memory().expect("open test db");
        let store: Box<dyn PartitionStore + Send> = Box::new(MemoryPartitionStore::new());
        let event_bus = EventBus::new(64);
        let config = BridgeConfig {
            owner: owner(),
            operator: operator(),
            chain_id: CHAIN_ID,
            ..BridgeConfig::default()
        };
        let bridge = RevenueBridge::new(conn, store, config, 1_700_000_000)
            .expect("create bridge")
            .with_sink(event_bus.clone());
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(DaemonState {
            bridge: Mutex::new(bridge),
            config: DaemonConfig::default(),
            event_bus,
            replay_guard: Mutex::new(ReplayGuard::default()),
            shutdown_tx,
        })
    }
}
