use classtrackd::auth::Sha256Verifier;
use classtrackd::broadcast::{BroadcastClient, HttpBroadcastTransport};
use classtrackd::ipc::{self, AppState};
use classtrackd::remote::HttpRemoteStore;
use classtrackd::store::SnapshotStore;
use classtrackd::sync::{EngineConfig, SyncEngine};

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = EngineConfig::from_env();
    let data_dir = std::env::var("CLASSTRACK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("classtrackd"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    // The debounce timer and the broadcast poll loop spawn onto the ambient
    // runtime; requests themselves are dispatched with block_on below.
    let _guard = runtime.enter();

    let client = reqwest::Client::new();
    let remote = HttpRemoteStore::new(client.clone(), cfg.sync_url.clone());
    let transport = HttpBroadcastTransport::new(client, cfg.ws_url.clone());
    let broadcast = BroadcastClient::new(transport, cfg.poll_interval);
    let store = SnapshotStore::open(&data_dir)?;

    let state = AppState {
        engine: SyncEngine::new(remote, broadcast, store, cfg.debounce),
        verifier: Sha256Verifier,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; ignore.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = runtime.block_on(ipc::handle_request(&state, req));
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    Ok(())
}
