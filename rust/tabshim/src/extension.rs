use serde_json::{Map, Value};
use tabshim_effects::{HostError, Provider};
use tabshim_effects::action::{IconDetails, SetIcon};
use tabshim_effects::alarms::{Alarm, AlarmSchedule};
use tabshim_effects::runtime::{ExtensionManifest, GetManifest, SendMessage, SetUninstallUrl};
use tabshim_effects::scripting::{InjectionRequest, InjectionResult};
use tabshim_effects::storage::{self, StorageArea};
use tabshim_effects::tabs::{QueryTabs, Tab, TabId, TabQuery, TabUpdate, UpdateTab};

use crate::alarm::AlarmRegistrar;
use crate::inject::{Injection, Injector, Route};
use crate::session::{SessionStore, StorageKey};
use crate::{ExtensionHost, ShimError, ShimSettings};

/// The caller-facing surface of tabshim over a single host.
///
/// Construction probes the host once; the injection route and the session
/// backing chosen then hold for the life of the value and all its clones.
#[derive(Debug, Clone)]
pub struct Extension<H> {
    host: H,
    settings: ShimSettings,
    injector: Injector<H>,
    session: SessionStore<H>,
    alarms: AlarmRegistrar<H>,
}

impl<H> Extension<H>
where
    H: ExtensionHost,
{
    /// Wrap `host`.
    pub fn new(host: H, settings: ShimSettings) -> Self {
        Self {
            injector: Injector::detect(host.clone(), &settings),
            session: SessionStore::detect(host.clone(), &settings),
            alarms: AlarmRegistrar::new(host.clone()),
            host,
            settings,
        }
    }

    /// The settings this extension was built with.
    pub fn settings(&self) -> &ShimSettings {
        &self.settings
    }

    /// The route script and CSS injections take.
    pub fn route(&self) -> Route {
        self.injector.route()
    }

    /// Whether session entries are kept in process.
    pub fn uses_session_fallback(&self) -> bool {
        self.session.is_fallback()
    }

    /// See [`Injector::execute_script`].
    pub async fn execute_script(
        &mut self,
        request: InjectionRequest,
    ) -> Result<Vec<InjectionResult>, ShimError> {
        self.injector.execute_script(request).await
    }

    /// See [`Injector::insert_css`].
    pub async fn insert_css(&mut self, request: InjectionRequest) -> Result<(), ShimError> {
        self.injector.insert_css(request).await
    }

    /// See [`Injector::plan_script`].
    pub fn plan_script(&self, request: InjectionRequest) -> Result<Injection, ShimError> {
        self.injector.plan_script(request)
    }

    /// See [`Injector::plan_css`].
    pub fn plan_css(&self, request: InjectionRequest) -> Result<Injection, ShimError> {
        self.injector.plan_css(request)
    }

    /// See [`Injector::perform_script`].
    pub async fn perform_script(
        &mut self,
        injection: Injection,
    ) -> Result<Vec<InjectionResult>, ShimError> {
        self.injector.perform_script(injection).await
    }

    /// See [`Injector::perform_css`].
    pub async fn perform_css(&mut self, injection: Injection) -> Result<(), ShimError> {
        self.injector.perform_css(injection).await
    }

    /// Store a session-scoped entry.
    pub async fn set_to_session_storage(
        &mut self,
        key: impl Into<StorageKey>,
        value: Value,
    ) -> Result<(), ShimError> {
        self.session.set(key, value).await
    }

    /// Read a session-scoped entry.
    pub async fn get_from_session_storage(
        &mut self,
        key: impl Into<StorageKey>,
    ) -> Result<Option<Value>, ShimError> {
        self.session.get(key).await
    }

    /// See [`AlarmRegistrar::create_alarm`].
    pub async fn create_alarm(
        &mut self,
        name: impl Into<String>,
        schedule: AlarmSchedule,
    ) -> Result<Option<Alarm>, ShimError> {
        self.alarms.create_alarm(name, schedule).await
    }

    /// Read administrator policy.
    ///
    /// Hosts without managed storage, or with no policy installed, are
    /// common; any failure is logged and reads as an empty record.
    pub async fn get_from_managed_storage(
        &mut self,
        keys: Option<Vec<String>>,
    ) -> Map<String, Value> {
        match <H as Provider<storage::Get>>::execute(
            &mut self.host,
            storage::Get::keys(StorageArea::Managed, keys),
        )
        .await
        {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "Could not read managed storage");
                Map::new()
            }
        }
    }

    /// Read from durable storage; `None` reads everything.
    pub async fn get_from_local_storage(
        &mut self,
        keys: Option<Vec<String>>,
    ) -> Result<Map<String, Value>, ShimError> {
        Ok(<H as Provider<storage::Get>>::execute(
            &mut self.host,
            storage::Get::keys(StorageArea::Local, keys),
        )
        .await?)
    }

    /// Write to durable storage.
    pub async fn set_to_local_storage(&mut self, items: Map<String, Value>) -> Result<(), ShimError> {
        Ok(<H as Provider<storage::Set>>::execute(
            &mut self.host,
            storage::Set {
                area: StorageArea::Local,
                items,
            },
        )
        .await?)
    }

    #[allow(missing_docs)]
    pub async fn manifest(&mut self) -> Result<ExtensionManifest, ShimError> {
        Ok(<H as Provider<GetManifest>>::execute(&mut self.host, GetManifest).await?)
    }

    /// Change the toolbar icon.
    pub async fn set_icon(&mut self, details: IconDetails) -> Result<(), ShimError> {
        Ok(<H as Provider<SetIcon>>::execute(&mut self.host, SetIcon { details }).await?)
    }

    /// Broadcast `message` to the extension's other contexts.
    ///
    /// Having nobody listening is not an error.
    pub async fn notify(&mut self, message: Value) -> Result<(), ShimError> {
        match <H as Provider<SendMessage>>::execute(&mut self.host, SendMessage { message }).await {
            Ok(_) => Ok(()),
            Err(HostError::NoReceiver) => {
                tracing::debug!("Notification had no receiver");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    #[allow(missing_docs)]
    pub async fn query_tabs(&mut self, query: TabQuery) -> Result<Vec<Tab>, ShimError> {
        Ok(<H as Provider<QueryTabs>>::execute(&mut self.host, QueryTabs { query }).await?)
    }

    #[allow(missing_docs)]
    pub async fn update_tab(
        &mut self,
        tab_id: TabId,
        update: TabUpdate,
    ) -> Result<Option<Tab>, ShimError> {
        Ok(<H as Provider<UpdateTab>>::execute(&mut self.host, UpdateTab { tab_id, update }).await?)
    }

    /// Set the page opened when the extension is removed.
    pub async fn set_uninstall_url(&mut self, url: impl Into<String>) -> Result<(), ShimError> {
        let url = url.into();
        Ok(<H as Provider<SetUninstallUrl>>::execute(&mut self.host, SetUninstallUrl { url }).await?)
    }
}
