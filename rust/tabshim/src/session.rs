//! Ephemeral key/value storage.
//!
//! [`SessionStore`] writes to `chrome.storage.session` when the host has it.
//! Otherwise it keeps entries in one map per process, created on first use
//! and shared by every store, so they last exactly as long as the background
//! context. Session entries never reach durable storage on either path.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tabshim_effects::storage::{Get, Set, StorageArea};
use tabshim_effects::{Capabilities, HostApi, Provider};
use tokio::sync::RwLock;

use crate::{ExtensionHost, ShimError, ShimSettings};

/// A validated storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Accept `value` as a key only if it is a string.
    pub fn parse(value: &Value) -> Result<Self, ShimError> {
        match value {
            Value::String(key) => Ok(Self(key.clone())),
            _ => Err(ShimError::InvalidStorageKey),
        }
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StorageKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for StorageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type Entries = Arc<RwLock<HashMap<String, Value>>>;

/// The entries every in-memory store in this process reads and writes.
fn process_entries() -> Entries {
    static ENTRIES: OnceLock<Entries> = OnceLock::new();
    ENTRIES.get_or_init(Entries::default).clone()
}

/// The in-process stand-in for `chrome.storage.session`.
#[derive(Debug, Clone)]
struct Fallback {
    entries: Entries,
    quota: Option<usize>,
}

impl Fallback {
    async fn set(&self, key: StorageKey, value: Value) -> Result<(), ShimError> {
        let mut entries = self.entries.write().await;

        if let Some(quota) = self.quota {
            let replaced = entries
                .get(key.as_str())
                .map(|previous| entry_size(key.as_str(), previous))
                .unwrap_or_default();
            let required = entries
                .iter()
                .map(|(key, value)| entry_size(key, value))
                .sum::<usize>()
                - replaced
                + entry_size(key.as_str(), &value);
            if required > quota {
                return Err(ShimError::QuotaExceeded { required, quota });
            }
        }

        entries.insert(key.0, value);
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> Option<Value> {
        self.entries.read().await.get(key.as_str()).cloned()
    }
}

/// Bytes an entry occupies, counted the way the host counts them: the key
/// plus the JSON encoding of the value.
fn entry_size(key: &str, value: &Value) -> usize {
    key.len() + value.to_string().len()
}

#[derive(Debug, Clone)]
enum Backing<H> {
    Host(H),
    Fallback(Fallback),
}

/// Session-scoped key/value store.
///
/// Without a host session area, all stores in the process share one map.
#[derive(Debug, Clone)]
pub struct SessionStore<H> {
    backing: Backing<H>,
}

impl<H> SessionStore<H>
where
    H: ExtensionHost,
{
    /// Probe `host` and use its session area if there is one.
    pub fn detect(host: H, settings: &ShimSettings) -> Self {
        if host.supports(HostApi::SessionStorage) {
            Self {
                backing: Backing::Host(host),
            }
        } else {
            tracing::debug!(
                quota = ?settings.session_fallback_quota,
                "{} unavailable, keeping session entries in memory",
                HostApi::SessionStorage
            );
            Self {
                backing: Backing::Fallback(Fallback {
                    entries: process_entries(),
                    quota: settings.session_fallback_quota,
                }),
            }
        }
    }

    /// Whether entries are kept in process rather than by the host.
    pub fn is_fallback(&self) -> bool {
        matches!(self.backing, Backing::Fallback(_))
    }

    /// Store `value` under `key`.
    pub async fn set(&mut self, key: impl Into<StorageKey>, value: Value) -> Result<(), ShimError> {
        let key = key.into();
        match &mut self.backing {
            Backing::Host(host) => {
                tracing::trace!(%key, "storage.session.set");
                <H as Provider<Set>>::execute(host, Set::entry(StorageArea::Session, key.0, value))
                    .await?;
                Ok(())
            }
            Backing::Fallback(fallback) => fallback.set(key, value).await,
        }
    }

    /// Read the value under `key`, if any.
    pub async fn get(&mut self, key: impl Into<StorageKey>) -> Result<Option<Value>, ShimError> {
        let key = key.into();
        match &mut self.backing {
            Backing::Host(host) => {
                tracing::trace!(%key, "storage.session.get");
                let mut entries = <H as Provider<Get>>::execute(
                    host,
                    Get::key(StorageArea::Session, key.as_str()),
                )
                .await?;
                Ok(entries.remove(key.as_str()))
            }
            Backing::Fallback(fallback) => Ok(fallback.get(&key).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{HostCall, HostProfile, VolatileHost};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    use wasm_bindgen_test::wasm_bindgen_test;

    fn profile_without_session() -> HostProfile {
        HostProfile {
            session_storage: false,
            ..HostProfile::capability_scoped()
        }
    }

    #[test]
    fn it_accepts_only_string_keys() {
        assert_eq!(StorageKey::parse(&json!("token")), Ok(StorageKey::from("token")));

        for key in [json!(42), json!(null), json!(["a"]), json!({ "a": 1 })] {
            let error = StorageKey::parse(&key).unwrap_err();
            assert_eq!(error.to_string(), "Invalid storage key, string expected.");
        }
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_round_trips_through_the_host() -> TestResult {
        let host = VolatileHost::new(HostProfile::capability_scoped());
        let mut store = SessionStore::detect(host.clone(), &ShimSettings::default());
        let value = json!({ "nested": [1, "two", { "three": null }] });

        store.set("state", value.clone()).await?;

        assert!(!store.is_fallback());
        assert_eq!(store.get("state").await?, Some(value.clone()));
        assert_eq!(
            host.area(StorageArea::Session).await.get("state"),
            Some(&value)
        );
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_round_trips_in_memory_without_touching_the_host() -> TestResult {
        let host = VolatileHost::new(profile_without_session());
        let mut store = SessionStore::detect(host.clone(), &ShimSettings::default());
        let value = json!({ "nested": [1, "two", { "three": null }] });

        store.set("state", value.clone()).await?;

        assert!(store.is_fallback());
        assert_eq!(store.get("state").await?, Some(value));
        assert_eq!(store.get("missing").await?, None);
        assert!(host.calls().await.is_empty());
        assert!(host.area(StorageArea::Local).await.is_empty());
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_shares_fallback_entries_between_clones() -> TestResult {
        let mut store = SessionStore::detect(
            VolatileHost::new(profile_without_session()),
            &ShimSettings::default(),
        );
        let mut clone = store.clone();

        store.set("shared", json!(true)).await?;

        assert_eq!(clone.get("shared").await?, Some(json!(true)));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_shares_fallback_entries_across_the_process() -> TestResult {
        let mut first = SessionStore::detect(
            VolatileHost::new(profile_without_session()),
            &ShimSettings::default(),
        );
        let mut second = SessionStore::detect(
            VolatileHost::new(HostProfile::legacy()),
            &ShimSettings::default(),
        );

        first.set("process-wide", json!([1, 2])).await?;

        assert!(second.is_fallback());
        assert_eq!(second.get("process-wide").await?, Some(json!([1, 2])));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_enforces_a_configured_quota() -> TestResult {
        // a private map, so entries written by other tests do not count
        let mut store = SessionStore::<VolatileHost> {
            backing: Backing::Fallback(Fallback {
                entries: Entries::default(),
                quota: Some(16),
            }),
        };

        // "k" + "\"0123456789\"" is 13 bytes
        store.set("k", json!("0123456789")).await?;
        // replacing an entry only counts the new value
        store.set("k", json!("abcdefghij")).await?;
        let overflow = store.set("k2", json!("x")).await;

        assert_eq!(
            overflow,
            Err(ShimError::QuotaExceeded {
                required: 18,
                quota: 16
            })
        );
        assert_eq!(store.get("k").await?, Some(json!("abcdefghij")));
        assert_eq!(store.get("k2").await?, None);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_reads_only_the_requested_key_from_the_host() -> TestResult {
        let host = VolatileHost::new(HostProfile::capability_scoped());
        let mut store = SessionStore::detect(host.clone(), &ShimSettings::default());

        store.get("token").await?;

        assert_eq!(
            host.calls().await,
            vec![HostCall::StorageGet(Get::key(StorageArea::Session, "token"))]
        );
        Ok(())
    }
}
