//! Common test utilities for all integration tests.
//!
//! Provides environment isolation and a mock vault service.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::env;
use std::sync::{Mutex, MutexGuard};

use robocorp_vault::secrets::transit::seal_payload;
use robocorp_vault::secrets::SecretPayload;
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer, Request};

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Every variable the vault reads, current and legacy names.
pub const VAULT_VARS: &[&str] = &[
    "RC_VAULT_SECRET_MANAGER",
    "RC_VAULT_SECRETS_FILE",
    "RC_API_SECRET_HOST",
    "RC_API_SECRET_TOKEN",
    "RC_WORKSPACE_ID",
    "RPA_SECRET_MANAGER",
    "RPA_SECRET_FILE",
];

/// Holds the environment lock and restores every vault variable on drop.
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Lock the environment and clear all vault variables.
    pub fn clean() -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = VAULT_VARS.iter().map(|name| (*name, env::var(name).ok())).collect();

        for name in VAULT_VARS {
            env::remove_var(name);
        }

        Self { saved, _lock: lock }
    }

    pub fn set(&self, name: &str, value: impl AsRef<std::ffi::OsStr>) {
        env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }
}

/// Mock vault service driven from synchronous tests.
///
/// The adapters use a blocking HTTP client, which must not run inside an
/// async context, so the mock server lives on its own runtime and tests stay
/// plain `#[test]` functions.
pub struct MockVault {
    // Dropped before the runtime that started it
    server: MockServer,
    runtime: Runtime,
}

impl MockVault {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("build test runtime");
        let server = runtime.block_on(MockServer::start());

        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn received_requests(&self) -> Vec<Request> {
        self.runtime.block_on(self.server.received_requests()).unwrap_or_default()
    }
}

/// Service-side response body for `fields`, encrypted to `public_key_b64`.
pub fn sealed_response(
    public_key_b64: &str,
    name: &str,
    description: &str,
    fields: &serde_json::Value,
) -> SecretPayload {
    let plaintext = serde_json::to_vec(fields).expect("encode test fields");
    seal_payload(public_key_b64, name, Some(description), &plaintext, 32).expect("seal test payload")
}
