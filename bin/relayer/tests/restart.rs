//! Restart from a state snapshot.

use crate::setup::{hash, wide_message};
use alloy_primitives::U256;
use messenger::{EventStream, RelayerEvent};
use relay::{apply_event, save_snapshot, shared};
use relayer::{config::Config, load_state, start_block};
use state::RelayerState;


const CONFIG: &str = r#"
    l1_rpc_url = "http://localhost:8545"
    l2_rpc_url = "http://localhost:4011"

    [network.l1]
    chain_id = 1337
    portal = "0x0000000000000000000000000000000000000a01"
    sequencer_inbox = "0x0000000000000000000000000000000000000a02"
    rollup = "0x0000000000000000000000000000000000000a03"

    [network.l2]
    chain_id = 13527

    [ingest]
    l1_start_block = 1000
    l2_start_block = 5
"#;

fn snapshot_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("relayer-restart-{}-{}.json", name, std::process::id()))
}

#[test]
fn test_missing_snapshot_starts_empty() {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let state = load_state(snapshot_path("missing")).unwrap();

    assert_eq!(state.pending_deposits(), 0);
    assert_eq!(start_block(&state, EventStream::DepositInitiated, &config), 1000);
    assert_eq!(start_block(&state, EventStream::WithdrawalInitiated, &config), 5);
}

#[tokio::test]
async fn test_restart_resumes_streams_and_queues() {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let state = shared(RelayerState::new());

    {
        let mut state = state.lock().await;
        for event in [
            RelayerEvent::DepositInitiated {
                l1_block_number: 1200,
                deposit_hash: hash(1),
                deposit_tx: wide_message(1),
            },
            RelayerEvent::StreamProgress {
                stream: EventStream::DepositInitiated,
                next_block: 1301,
            },
            RelayerEvent::TxBatchAppended {
                l2_block_number: 80,
                inbox_size: 12,
            },
            RelayerEvent::AssertionCreated {
                assertion_id: U256::from(4),
                l2_gas_used: U256::from(9),
                vm_hash: hash(9),
            },
        ] {
            apply_event(&mut state, event);
        }
    }

    let path = snapshot_path("resume");
    save_snapshot(&state, path.clone()).await.unwrap();
    let mut restored = load_state(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(start_block(&restored, EventStream::DepositInitiated, &config), 1301);
    assert_eq!(start_block(&restored, EventStream::TxBatchAppended, &config), 1000);
    assert_eq!(restored.next_deposit_block_number(), Some(1200));

    // Checkpoints and assertion records survive, so a confirmation after restart still lands
    apply_event(
        &mut restored,
        RelayerEvent::AssertionConfirmed {
            assertion_id: U256::from(4),
            inbox_size: 12,
        },
    );
    assert_eq!(restored.last_confirmed_l2_block_number(), Some(80));
}

#[tokio::test]
async fn test_deferred_confirmation_completes_after_restart() {
    let state = shared(RelayerState::new());

    {
        let mut state = state.lock().await;
        for event in [
            RelayerEvent::AssertionCreated {
                assertion_id: U256::from(2),
                l2_gas_used: U256::from(7),
                vm_hash: hash(2),
            },
            RelayerEvent::TxBatchAppended {
                l2_block_number: 40,
                inbox_size: 3,
            },
            // Confirmation scanned before the batch that reaches inbox size 5
            RelayerEvent::AssertionConfirmed {
                assertion_id: U256::from(2),
                inbox_size: 5,
            },
            RelayerEvent::StreamProgress {
                stream: EventStream::AssertionConfirmed,
                next_block: 1500,
            },
        ] {
            apply_event(&mut state, event);
        }
        assert_eq!(state.last_confirmed_l2_block_number(), None);
    }

    let path = snapshot_path("deferred");
    save_snapshot(&state, path.clone()).await.unwrap();
    let mut restored = load_state(&path).unwrap();
    std::fs::remove_file(&path).ok();

    apply_event(
        &mut restored,
        RelayerEvent::TxBatchAppended {
            l2_block_number: 60,
            inbox_size: 5,
        },
    );

    assert_eq!(restored.last_confirmed_l2_block_number(), Some(60));
    assert_eq!(restored.last_confirmed_assertion_id(), Some(U256::from(2)));
}
