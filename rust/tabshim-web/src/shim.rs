use js_sys::Promise;
use serde_json::{Map, Value};
use tabshim::inject::Route;
use tabshim::session::StorageKey;
use tabshim::{Extension, ShimError, ShimSettings};
use tabshim_effects::action::IconDetails;
use tabshim_effects::alarms::AlarmSchedule;
use tabshim_effects::tabs::{TabId, TabQuery, TabUpdate};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::ChromeHost;
use crate::convert::{from_js, injection_request, storage_keys, to_js};

/// Route panics to the console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// The extension API surface, bound to `globalThis.chrome`.
///
/// Methods that can reject their input up front throw synchronously;
/// everything else answers with a promise.
#[wasm_bindgen]
pub struct Shim {
    host: ChromeHost,
    extension: Extension<ChromeHost>,
}

#[wasm_bindgen]
impl Shim {
    /// Probe the host and build the shim. `settings` may be omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<Shim, JsError> {
        let settings: ShimSettings = if settings.is_undefined() || settings.is_null() {
            ShimSettings::default()
        } else {
            from_js(&settings)?
        };
        let host = ChromeHost::from_global()?;
        let extension = Extension::new(host.clone(), settings);
        tracing::debug!(
            route = ?extension.route(),
            session_fallback = extension.uses_session_fallback(),
            "Shim ready"
        );
        Ok(Shim { host, extension })
    }

    /// Whether injections go through the legacy tabs API.
    #[wasm_bindgen(getter, js_name = usesLegacyScripting)]
    pub fn uses_legacy_scripting(&self) -> bool {
        self.extension.route() == Route::Legacy
    }

    /// `chrome.scripting.executeScript` semantics on either host.
    #[wasm_bindgen(js_name = executeScript)]
    pub fn execute_script(&self, options: JsValue) -> Result<Promise, JsError> {
        match self.extension.route() {
            Route::Native => {
                let host = self.host.clone();
                Ok(settle(async move { Ok(host.execute_script_raw(options).await?) }))
            }
            Route::Legacy => {
                let injection = self.extension.plan_script(injection_request(&options)?)?;
                let mut extension = self.extension.clone();
                Ok(settle(async move {
                    let results = extension.perform_script(injection).await?;
                    to_js(&results)
                }))
            }
        }
    }

    /// `chrome.scripting.insertCSS` semantics on either host.
    #[wasm_bindgen(js_name = insertCSS)]
    pub fn insert_css(&self, options: JsValue) -> Result<Promise, JsError> {
        match self.extension.route() {
            Route::Native => {
                let host = self.host.clone();
                Ok(settle(async move {
                    host.insert_css_raw(options).await?;
                    Ok(JsValue::UNDEFINED)
                }))
            }
            Route::Legacy => {
                let injection = self.extension.plan_css(injection_request(&options)?)?;
                let mut extension = self.extension.clone();
                Ok(settle(async move {
                    extension.perform_css(injection).await?;
                    Ok(JsValue::UNDEFINED)
                }))
            }
        }
    }

    /// Store `value` under the string `key` for the rest of the session.
    #[wasm_bindgen(js_name = setToSessionStorage)]
    pub fn set_to_session_storage(&self, key: JsValue, value: JsValue) -> Result<Promise, JsError> {
        let key = StorageKey::parse(&from_js(&key)?)?;
        let value: Value = from_js(&value)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            extension.set_to_session_storage(key, value).await?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Resolves to the stored value, or `undefined`.
    #[wasm_bindgen(js_name = getFromSessionStorage)]
    pub fn get_from_session_storage(&self, key: JsValue) -> Result<Promise, JsError> {
        let key = StorageKey::parse(&from_js(&key)?)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            match extension.get_from_session_storage(key).await? {
                Some(value) => to_js(&value),
                None => Ok(JsValue::UNDEFINED),
            }
        }))
    }

    /// Resolves to the new alarm, or `undefined` if one of that name existed.
    #[wasm_bindgen(js_name = createAlarm)]
    pub fn create_alarm(&self, name: String, schedule: JsValue) -> Result<Promise, JsError> {
        let schedule: AlarmSchedule = from_js(&schedule)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            match extension.create_alarm(name, schedule).await? {
                Some(alarm) => to_js(&alarm),
                None => Ok(JsValue::UNDEFINED),
            }
        }))
    }

    /// Never rejects; unreadable policy resolves to `{}`.
    #[wasm_bindgen(js_name = getFromManagedStorage)]
    pub fn get_from_managed_storage(&self, keys: JsValue) -> Result<Promise, JsError> {
        let keys = storage_keys(&keys)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            to_js(&extension.get_from_managed_storage(keys).await)
        }))
    }

    /// Read `keys` (a key, a list of keys, or nothing for all) from local storage.
    #[wasm_bindgen(js_name = getFromLocalStorage)]
    pub fn get_from_local_storage(&self, keys: JsValue) -> Result<Promise, JsError> {
        let keys = storage_keys(&keys)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            to_js(&extension.get_from_local_storage(keys).await?)
        }))
    }

    /// Merge `items` into local storage.
    #[wasm_bindgen(js_name = setToLocalStorage)]
    pub fn set_to_local_storage(&self, items: JsValue) -> Result<Promise, JsError> {
        let items: Map<String, Value> = from_js(&items)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            extension.set_to_local_storage(items).await?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// The extension's manifest.
    #[wasm_bindgen(js_name = getManifest)]
    pub fn get_manifest(&self) -> Promise {
        let mut extension = self.extension.clone();
        settle(async move { to_js(&extension.manifest().await?) })
    }

    /// Set the toolbar icon through `action` or `browserAction`.
    #[wasm_bindgen(js_name = setIcon)]
    pub fn set_icon(&self, details: JsValue) -> Result<Promise, JsError> {
        let details: IconDetails = from_js(&details)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            extension.set_icon(details).await?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Broadcast to the extension's other contexts; resolves even when
    /// nothing is listening.
    pub fn notify(&self, message: JsValue) -> Result<Promise, JsError> {
        let message: Value = from_js(&message)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            extension.notify(message).await?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Tabs matching `query`, or every tab when it is omitted.
    #[wasm_bindgen(js_name = queryTabs)]
    pub fn query_tabs(&self, query: JsValue) -> Result<Promise, JsError> {
        let query: TabQuery = if query.is_undefined() {
            TabQuery::default()
        } else {
            from_js(&query)?
        };
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            to_js(&extension.query_tabs(query).await?)
        }))
    }

    /// Update tab `tabId`; resolves to the tab, or `undefined`.
    #[wasm_bindgen(js_name = updateTab)]
    pub fn update_tab(&self, tab_id: TabId, properties: JsValue) -> Result<Promise, JsError> {
        let update: TabUpdate = from_js(&properties)?;
        let mut extension = self.extension.clone();
        Ok(settle(async move {
            match extension.update_tab(tab_id, update).await? {
                Some(tab) => to_js(&tab),
                None => Ok(JsValue::UNDEFINED),
            }
        }))
    }

    /// URL to open once the extension is removed.
    #[wasm_bindgen(js_name = setUninstallUrl)]
    pub fn set_uninstall_url(&self, url: String) -> Promise {
        let mut extension = self.extension.clone();
        settle(async move {
            extension.set_uninstall_url(url).await?;
            Ok(JsValue::UNDEFINED)
        })
    }
}

/// Run `work` to completion as a promise that rejects with an `Error`
/// carrying the failure's message.
fn settle<F>(work: F) -> Promise
where
    F: Future<Output = Result<JsValue, ShimError>> + 'static,
{
    future_to_promise(async move {
        work.await
            .map_err(|error| JsValue::from(JsError::new(&error.to_string())))
    })
}
