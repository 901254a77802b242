//! Volatile in-memory extension host.
//!
//! [`VolatileHost`] performs every effect against process memory. A
//! [`HostProfile`] decides which optional APIs it claims to have, so the same
//! caller code can be driven down either the capability-scoped or the legacy
//! path. Every call is recorded in order, which lets tests assert what did,
//! or did not, reach the host.
//!
//! Nothing is persisted. Clones share state.
//!
//! # Example
//!
//! ```
//! use tabshim::emulator::{HostCall, HostProfile, VolatileHost};
//! use tabshim_effects::Provider;
//! use tabshim_effects::runtime::SetUninstallUrl;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tabshim::HostError> {
//! let mut host = VolatileHost::new(HostProfile::legacy());
//! let url = "https://example.com/bye".to_string();
//!
//! host.execute(SetUninstallUrl { url: url.clone() }).await?;
//!
//! assert_eq!(host.calls().await, vec![HostCall::SetUninstallUrl(url)]);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tabshim_effects::action::{IconDetails, SetIcon};
use tabshim_effects::alarms::{Alarm, AlarmSchedule, CreateAlarm, GetAlarm, ListAlarms};
use tabshim_effects::runtime::{ExtensionManifest, GetManifest, SendMessage, SetUninstallUrl};
use tabshim_effects::scripting::{ExecuteScript, InjectionRequest, InjectionResult, InsertCss};
use tabshim_effects::storage::{self, StorageArea};
use tabshim_effects::tabs::{
    LegacyInjection, QueryTabs, TOP_FRAME, Tab, TabId, TabQuery, TabUpdate, TabsExecuteScript,
    TabsInsertCss, UpdateTab,
};
use tabshim_effects::{Capabilities, HostApi, HostError, Provider};
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::alarm::now_millis;

/// Which optional APIs a [`VolatileHost`] exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostProfile {
    /// `chrome.scripting`
    pub scripting: bool,
    /// `chrome.storage.session`
    pub session_storage: bool,
    /// `chrome.storage.managed`
    pub managed_storage: bool,
    /// `chrome.action`
    pub action: bool,
}

impl HostProfile {
    /// A host with every optional API.
    pub fn capability_scoped() -> Self {
        Self {
            scripting: true,
            session_storage: true,
            managed_storage: true,
            action: true,
        }
    }

    /// A host with none of them.
    pub fn legacy() -> Self {
        Self {
            scripting: false,
            session_storage: false,
            managed_storage: false,
            action: false,
        }
    }
}

/// A call the host received.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum HostCall {
    ExecuteScript(InjectionRequest),
    InsertCss(InjectionRequest),
    TabsExecuteScript(LegacyInjection),
    TabsInsertCss(LegacyInjection),
    QueryTabs(TabQuery),
    UpdateTab { tab_id: TabId, update: TabUpdate },
    StorageGet(storage::Get),
    StorageSet(storage::Set),
    GetAlarm(String),
    CreateAlarm(CreateAlarm),
    ListAlarms,
    GetManifest,
    SendMessage(Value),
    SetUninstallUrl(String),
    SetIcon(IconDetails),
    SetBrowserActionIcon(IconDetails),
}

impl HostCall {
    /// The dotted host method this call corresponds to.
    pub fn method(&self) -> &'static str {
        match self {
            HostCall::ExecuteScript(_) => "scripting.executeScript",
            HostCall::InsertCss(_) => "scripting.insertCSS",
            HostCall::TabsExecuteScript(_) => "tabs.executeScript",
            HostCall::TabsInsertCss(_) => "tabs.insertCSS",
            HostCall::QueryTabs(_) => "tabs.query",
            HostCall::UpdateTab { .. } => "tabs.update",
            HostCall::StorageGet(_) => "storage.get",
            HostCall::StorageSet(_) => "storage.set",
            HostCall::GetAlarm(_) => "alarms.get",
            HostCall::CreateAlarm(_) => "alarms.create",
            HostCall::ListAlarms => "alarms.getAll",
            HostCall::GetManifest => "runtime.getManifest",
            HostCall::SendMessage(_) => "runtime.sendMessage",
            HostCall::SetUninstallUrl(_) => "runtime.setUninstallURL",
            HostCall::SetIcon(_) => "action.setIcon",
            HostCall::SetBrowserActionIcon(_) => "browserAction.setIcon",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<HostCall>,
    rejection: Option<HostError>,
    script_reply: Vec<Value>,
    areas: HashMap<StorageArea, Map<String, Value>>,
    alarms: BTreeMap<String, (AlarmSchedule, Alarm)>,
    tabs: Vec<Tab>,
    manifest: Option<ExtensionManifest>,
    listener: Option<Option<Value>>,
    uninstall_url: Option<String>,
    icon: Option<IconDetails>,
}

/// An extension host that lives entirely in memory.
#[derive(Debug, Clone)]
pub struct VolatileHost {
    profile: HostProfile,
    state: Arc<RwLock<State>>,
}

impl VolatileHost {
    /// Creates a new host exposing the APIs in `profile`.
    pub fn new(profile: HostProfile) -> Self {
        Self {
            profile,
            state: Arc::default(),
        }
    }

    /// The APIs this host exposes.
    pub fn profile(&self) -> HostProfile {
        self.profile
    }

    /// Every call received so far, oldest first.
    pub async fn calls(&self) -> Vec<HostCall> {
        self.state.read().await.calls.clone()
    }

    /// How many calls to `method` (e.g. `"alarms.create"`) were received.
    pub async fn calls_named(&self, method: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }

    /// Fail the next call, whatever it is, with `error`.
    pub async fn reject_next(&self, error: HostError) {
        self.state.write().await.rejection = Some(error);
    }

    /// Values every script injection evaluates to, one per frame.
    pub async fn reply_to_scripts(&self, values: Vec<Value>) {
        self.state.write().await.script_reply = values;
    }

    /// Register a message listener answering with `reply`.
    ///
    /// Without a listener, messages fail with [`HostError::NoReceiver`].
    pub async fn listen(&self, reply: Option<Value>) {
        self.state.write().await.listener = Some(reply);
    }

    /// Add a tab to the window.
    pub async fn open_tab(&self, tab: Tab) {
        self.state.write().await.tabs.push(tab);
    }

    /// Replace the manifest the host reports.
    pub async fn install(&self, manifest: ExtensionManifest) {
        self.state.write().await.manifest = Some(manifest);
    }

    /// Seed an entry into a storage area, bypassing the call log.
    pub async fn seed(&self, area: StorageArea, key: impl Into<String>, value: Value) {
        self.state
            .write()
            .await
            .areas
            .entry(area)
            .or_default()
            .insert(key.into(), value);
    }

    /// A snapshot of a storage area.
    pub async fn area(&self, area: StorageArea) -> Map<String, Value> {
        self.state
            .read()
            .await
            .areas
            .get(&area)
            .cloned()
            .unwrap_or_default()
    }

    /// The schedule alarm `name` was last created with.
    pub async fn schedule(&self, name: &str) -> Option<AlarmSchedule> {
        self.state
            .read()
            .await
            .alarms
            .get(name)
            .map(|(schedule, _)| schedule.clone())
    }

    /// The uninstall URL, if one was set.
    pub async fn uninstall_url(&self) -> Option<String> {
        self.state.read().await.uninstall_url.clone()
    }

    /// The toolbar icon, if one was set.
    pub async fn icon(&self) -> Option<IconDetails> {
        self.state.read().await.icon.clone()
    }

    /// Log `call` and hand back the state for the caller to act on, unless a
    /// rejection is pending.
    async fn receive(&self, call: HostCall) -> Result<RwLockWriteGuard<'_, State>, HostError> {
        tracing::trace!(method = call.method(), "Volatile host call");
        let mut state = self.state.write().await;
        state.calls.push(call);
        match state.rejection.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn require(&self, api: HostApi) -> Result<(), HostError> {
        if self.supports(api) {
            Ok(())
        } else {
            Err(HostError::unavailable(api.to_string()))
        }
    }

    fn require_area(&self, area: StorageArea) -> Result<(), HostError> {
        match area {
            StorageArea::Session => self.require(HostApi::SessionStorage),
            StorageArea::Managed => self.require(HostApi::ManagedStorage),
            StorageArea::Local => Ok(()),
        }
    }

    fn default_manifest(&self) -> ExtensionManifest {
        ExtensionManifest {
            name: "tabshim".into(),
            version: "0.0.0".into(),
            manifest_version: if self.profile.scripting { 3 } else { 2 },
            description: None,
            extra: Map::new(),
        }
    }
}

impl Capabilities for VolatileHost {
    fn supports(&self, api: HostApi) -> bool {
        match api {
            HostApi::Scripting => self.profile.scripting,
            HostApi::SessionStorage => self.profile.session_storage,
            HostApi::ManagedStorage => self.profile.managed_storage,
            HostApi::Action => self.profile.action,
        }
    }
}

/// Match a URL against a host match pattern where `*` stands for any run of
/// characters.
fn matches_pattern(pattern: &str, url: &str) -> bool {
    if pattern == "<all_urls>" {
        return true;
    }
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return true;
    };
    let Some(mut rest) = url.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    for (index, part) in parts.iter().enumerate() {
        if index == parts.len() - 1 {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.is_empty()
}

fn tab_matches(tab: &Tab, query: &TabQuery) -> bool {
    query.active.is_none_or(|active| tab.active == active)
        && query.pinned.is_none_or(|pinned| tab.pinned == pinned)
        && query
            .window_id
            .is_none_or(|window_id| tab.window_id == Some(window_id))
        && query.url.as_ref().is_none_or(|patterns| {
            tab.url
                .as_deref()
                .is_some_and(|url| patterns.iter().any(|pattern| matches_pattern(pattern, url)))
        })
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<ExecuteScript> for VolatileHost {
    async fn execute(&mut self, effect: ExecuteScript) -> Result<Vec<InjectionResult>, HostError> {
        let target = effect.request.target.clone();
        let state = self.receive(HostCall::ExecuteScript(effect.request)).await?;
        self.require(HostApi::Scripting)?;

        let frame_id = target
            .frame_ids
            .and_then(|frames| frames.first().copied())
            .unwrap_or(TOP_FRAME);

        Ok(state
            .script_reply
            .iter()
            .map(|result| InjectionResult {
                frame_id: Some(frame_id),
                document_id: None,
                result: Some(result.clone()),
            })
            .collect())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<InsertCss> for VolatileHost {
    async fn execute(&mut self, effect: InsertCss) -> Result<(), HostError> {
        self.receive(HostCall::InsertCss(effect.request)).await?;
        self.require(HostApi::Scripting)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<TabsExecuteScript> for VolatileHost {
    async fn execute(&mut self, effect: TabsExecuteScript) -> Result<Vec<Value>, HostError> {
        let state = self.receive(HostCall::TabsExecuteScript(effect.0)).await?;
        Ok(state.script_reply.clone())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<TabsInsertCss> for VolatileHost {
    async fn execute(&mut self, effect: TabsInsertCss) -> Result<(), HostError> {
        self.receive(HostCall::TabsInsertCss(effect.0)).await?;
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<QueryTabs> for VolatileHost {
    async fn execute(&mut self, effect: QueryTabs) -> Result<Vec<Tab>, HostError> {
        let query = effect.query.clone();
        let state = self.receive(HostCall::QueryTabs(effect.query)).await?;
        Ok(state
            .tabs
            .iter()
            .filter(|tab| tab_matches(tab, &query))
            .cloned()
            .collect())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<UpdateTab> for VolatileHost {
    async fn execute(&mut self, effect: UpdateTab) -> Result<Option<Tab>, HostError> {
        let UpdateTab { tab_id, update } = effect;
        let mut state = self
            .receive(HostCall::UpdateTab {
                tab_id,
                update: update.clone(),
            })
            .await?;

        let tab = state
            .tabs
            .iter_mut()
            .find(|tab| tab.id == Some(tab_id))
            .ok_or_else(|| HostError::from_message(format!("No tab with id: {tab_id}.")))?;

        if let Some(url) = update.url {
            tab.url = Some(url);
        }
        if let Some(active) = update.active {
            tab.active = active;
        }
        if let Some(pinned) = update.pinned {
            tab.pinned = pinned;
        }
        Ok(Some(tab.clone()))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<storage::Get> for VolatileHost {
    async fn execute(&mut self, effect: storage::Get) -> Result<Map<String, Value>, HostError> {
        let area = effect.area;
        let keys = effect.keys.clone();
        let state = self.receive(HostCall::StorageGet(effect)).await?;
        self.require_area(area)?;

        let Some(entries) = state.areas.get(&area) else {
            return Ok(Map::new());
        };
        Ok(match keys {
            None => entries.clone(),
            Some(keys) => keys
                .into_iter()
                .filter_map(|key| entries.get(&key).cloned().map(|value| (key, value)))
                .collect(),
        })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<storage::Set> for VolatileHost {
    async fn execute(&mut self, effect: storage::Set) -> Result<(), HostError> {
        let area = effect.area;
        let items = effect.items.clone();
        let mut state = self.receive(HostCall::StorageSet(effect)).await?;
        self.require_area(area)?;

        if area == StorageArea::Managed {
            return Err(HostError::from_message("This is a read-only store."));
        }
        state.areas.entry(area).or_default().extend(items);
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<GetAlarm> for VolatileHost {
    async fn execute(&mut self, effect: GetAlarm) -> Result<Option<Alarm>, HostError> {
        let state = self.receive(HostCall::GetAlarm(effect.name.clone())).await?;
        Ok(state.alarms.get(&effect.name).map(|(_, alarm)| alarm.clone()))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<CreateAlarm> for VolatileHost {
    async fn execute(&mut self, effect: CreateAlarm) -> Result<(), HostError> {
        let mut state = self.receive(HostCall::CreateAlarm(effect.clone())).await?;
        let CreateAlarm { name, schedule } = effect;
        let now = now_millis();
        let alarm = schedule.alarm(name.clone(), now);

        // one-shot alarms that are already due fire and are gone at once
        if alarm.period_in_minutes.is_none() && alarm.scheduled_time <= now {
            tracing::trace!(%name, "Alarm fired on creation");
            state.alarms.remove(&name);
            return Ok(());
        }
        state.alarms.insert(name, (schedule, alarm));
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<ListAlarms> for VolatileHost {
    async fn execute(&mut self, _effect: ListAlarms) -> Result<Vec<Alarm>, HostError> {
        let state = self.receive(HostCall::ListAlarms).await?;
        Ok(state.alarms.values().map(|(_, alarm)| alarm.clone()).collect())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<GetManifest> for VolatileHost {
    async fn execute(&mut self, _effect: GetManifest) -> Result<ExtensionManifest, HostError> {
        let state = self.receive(HostCall::GetManifest).await?;
        Ok(state
            .manifest
            .clone()
            .unwrap_or_else(|| self.default_manifest()))
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<SendMessage> for VolatileHost {
    async fn execute(&mut self, effect: SendMessage) -> Result<Option<Value>, HostError> {
        let state = self.receive(HostCall::SendMessage(effect.message)).await?;
        state.listener.clone().ok_or(HostError::NoReceiver)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<SetUninstallUrl> for VolatileHost {
    async fn execute(&mut self, effect: SetUninstallUrl) -> Result<(), HostError> {
        let mut state = self
            .receive(HostCall::SetUninstallUrl(effect.url.clone()))
            .await?;
        state.uninstall_url = Some(effect.url);
        Ok(())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Provider<SetIcon> for VolatileHost {
    async fn execute(&mut self, effect: SetIcon) -> Result<(), HostError> {
        let details = effect.details;
        let call = if self.profile.action {
            HostCall::SetIcon(details.clone())
        } else {
            HostCall::SetBrowserActionIcon(details.clone())
        };
        let mut state = self.receive(call).await?;
        state.icon = Some(details);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    use wasm_bindgen_test::wasm_bindgen_test;

    fn tab(id: TabId, url: &str, active: bool) -> Tab {
        Tab {
            id: Some(id),
            window_id: Some(1),
            url: Some(url.into()),
            active,
            ..Default::default()
        }
    }

    #[test]
    fn it_matches_url_patterns() {
        assert!(matches_pattern("<all_urls>", "about:blank"));
        assert!(matches_pattern("https://*.example.com/*", "https://www.example.com/a"));
        assert!(matches_pattern("https://example.com/", "https://example.com/"));
        assert!(!matches_pattern("https://example.com/", "https://example.com/a"));
        assert!(!matches_pattern("https://*.example.com/*", "http://www.example.com/a"));
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_refuses_apis_outside_its_profile() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());

        let result = host
            .execute(storage::Get::key(StorageArea::Session, "a"))
            .await;

        assert_eq!(
            result,
            Err(HostError::unavailable("chrome.storage.session"))
        );
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_rejects_only_the_next_call() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());
        host.reject_next(HostError::from_message("nope")).await;

        assert!(host.execute(ListAlarms).await.is_err());
        assert!(host.execute(ListAlarms).await.is_ok());
        assert_eq!(host.calls_named("alarms.getAll").await, 2);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_replaces_alarms_created_under_a_taken_name() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());

        for schedule in [AlarmSchedule::after(1.0), AlarmSchedule::every(2.0)] {
            host.execute(CreateAlarm {
                name: "x".into(),
                schedule,
            })
            .await?;
        }

        let alarms = host.execute(ListAlarms).await?;
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].period_in_minutes, Some(2.0));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_filters_and_updates_tabs() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());
        host.open_tab(tab(1, "https://example.com/", true)).await;
        host.open_tab(tab(2, "https://docs.example.com/guide", false)).await;

        let active = host
            .execute(QueryTabs {
                query: TabQuery {
                    active: Some(true),
                    ..Default::default()
                },
            })
            .await?;
        let updated = host
            .execute(UpdateTab {
                tab_id: 2,
                update: TabUpdate {
                    pinned: Some(true),
                    ..Default::default()
                },
            })
            .await?;
        let missing = host
            .execute(UpdateTab {
                tab_id: 9,
                update: TabUpdate::default(),
            })
            .await;

        assert_eq!(active, vec![tab(1, "https://example.com/", true)]);
        assert_eq!(updated.map(|tab| tab.pinned), Some(true));
        assert_eq!(missing, Err(HostError::from_message("No tab with id: 9.")));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_answers_messages_only_with_a_listener() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());
        let message = json!({ "kind": "ping" });

        let unheard = host
            .execute(SendMessage {
                message: message.clone(),
            })
            .await;
        host.listen(Some(json!("pong"))).await;
        let heard = host.execute(SendMessage { message }).await?;

        assert_eq!(unheard, Err(HostError::NoReceiver));
        assert_eq!(heard, Some(json!("pong")));
        Ok(())
    }
}
