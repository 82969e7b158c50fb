//! Shared test utilities for inode table and session tests
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use common::config::ServerConfig;
use common::inode::InodeTable;
use common::session::{MemoryBackend, SessionRegistry};

pub const ROOT: &str = "/zoneA/home/alice";

/// Route table logs through the test writer; RUST_LOG picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Path under the test root
pub fn path(name: &str) -> PathBuf {
    PathBuf::from(ROOT).join(name)
}

/// A table rooted at [`ROOT`]
pub fn setup_table() -> InodeTable {
    init_tracing();
    InodeTable::with_root(ROOT).unwrap()
}

/// A registry over an in-memory grid with alice and bob, rooted at [`ROOT`]
pub fn setup_registry() -> (SessionRegistry, MemoryBackend) {
    init_tracing();
    let mut config = ServerConfig::default();
    config.nfs_server.irods_mount_point = ROOT.to_string();
    config.irods_server.zone = "zoneA".to_string();

    let backend = MemoryBackend::new()
        .with_user("alice", 1001)
        .with_user("bob", 1002)
        .with_path(ROOT);
    let registry = SessionRegistry::new(config, Arc::new(backend.clone()));
    (registry, backend)
}
