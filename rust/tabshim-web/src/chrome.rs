use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tabshim_effects::action::SetIcon;
use tabshim_effects::alarms::{Alarm, CreateAlarm, GetAlarm, ListAlarms};
use tabshim_effects::runtime::{ExtensionManifest, GetManifest, SendMessage, SetUninstallUrl};
use tabshim_effects::scripting::{ExecuteScript, InjectionResult, InsertCss};
use tabshim_effects::storage;
use tabshim_effects::tabs::{QueryTabs, Tab, TabsExecuteScript, TabsInsertCss, UpdateTab};
use tabshim_effects::{Capabilities, HostApi, HostError, Provider};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::convert::{describe, from_js, host_error, to_js};

/// The extension host behind the `chrome` global.
#[derive(Debug, Clone)]
pub struct ChromeHost {
    chrome: JsValue,
}

impl ChromeHost {
    /// Bind to `globalThis.chrome`.
    pub fn from_global() -> Result<Self, HostError> {
        let chrome = Reflect::get(&js_sys::global(), &"chrome".into())
            .ok()
            .filter(is_present)
            .ok_or_else(|| HostError::unavailable("chrome"))?;
        Ok(Self { chrome })
    }

    /// Look up a namespace such as `["storage", "session"]`.
    fn namespace(&self, path: &[&str]) -> Option<JsValue> {
        path.iter().try_fold(self.chrome.clone(), |object, name| {
            Reflect::get(&object, &(*name).into())
                .ok()
                .filter(is_present)
        })
    }

    fn method(&self, path: &[&str], name: &str) -> Result<(JsValue, Function), HostError> {
        let qualified = format!("chrome.{}.{name}", path.join("."));
        let namespace = self
            .namespace(path)
            .ok_or_else(|| HostError::unavailable(qualified.clone()))?;
        let function = Reflect::get(&namespace, &name.into())
            .ok()
            .and_then(|function| function.dyn_into::<Function>().ok())
            .ok_or_else(|| HostError::unavailable(qualified))?;
        Ok((namespace, function))
    }

    /// Call a callback-style host method and wait for its callback.
    ///
    /// A set `chrome.runtime.lastError` at callback time rejects the call.
    async fn invoke(
        &self,
        path: &[&str],
        name: &str,
        arguments: Vec<JsValue>,
    ) -> Result<JsValue, HostError> {
        tracing::trace!(api = %path.join("."), method = name, "Host call");
        let (namespace, function) = self.method(path, name)?;
        let runtime = self.namespace(&["runtime"]);

        let promise = Promise::new(&mut |resolve: Function, reject: Function| {
            let runtime = runtime.clone();
            let on_reject = reject.clone();
            let callback = Closure::once_into_js(move |value: JsValue| {
                let outcome = match last_error(runtime.as_ref()) {
                    Some(message) => reject.call1(&JsValue::UNDEFINED, &message.into()),
                    None => resolve.call1(&JsValue::UNDEFINED, &value),
                };
                if let Err(error) = outcome {
                    tracing::error!(error = %describe(&error), "Could not settle host call");
                }
            });

            let call = Array::new();
            for argument in &arguments {
                call.push(argument);
            }
            call.push(&callback);

            if let Err(error) = function.apply(&namespace, &call)
                && let Err(error) = on_reject.call1(&JsValue::UNDEFINED, &error)
            {
                tracing::error!(error = %describe(&error), "Could not reject host call");
            }
        });

        JsFuture::from(promise)
            .await
            .map_err(|error| host_error(&error))
    }

    /// Call a host method that returns a value or a promise directly.
    async fn call(
        &self,
        path: &[&str],
        name: &str,
        arguments: Vec<JsValue>,
    ) -> Result<JsValue, HostError> {
        tracing::trace!(api = %path.join("."), method = name, "Host call");
        let (namespace, function) = self.method(path, name)?;
        let call = arguments.into_iter().collect::<Array>();
        let value = function
            .apply(&namespace, &call)
            .map_err(|error| host_error(&error))?;

        match value.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .map_err(|error| host_error(&error)),
            Err(value) => Ok(value),
        }
    }

    /// `chrome.scripting.executeScript` with caller options passed through
    /// untouched, so `func` stays a live function.
    pub async fn execute_script_raw(&self, options: JsValue) -> Result<JsValue, HostError> {
        self.invoke(HostApi::Scripting.path(), "executeScript", vec![options])
            .await
    }

    /// `chrome.scripting.insertCSS` with caller options passed through.
    pub async fn insert_css_raw(&self, options: JsValue) -> Result<JsValue, HostError> {
        self.invoke(HostApi::Scripting.path(), "insertCSS", vec![options])
            .await
    }
}

impl Capabilities for ChromeHost {
    fn supports(&self, api: HostApi) -> bool {
        self.namespace(api.path()).is_some()
    }
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

fn last_error(runtime: Option<&JsValue>) -> Option<String> {
    let error = Reflect::get(runtime?, &"lastError".into())
        .ok()
        .filter(is_present)?;
    Some(
        Reflect::get(&error, &"message".into())
            .ok()
            .and_then(|message| message.as_string())
            .unwrap_or_else(|| describe(&error)),
    )
}

fn encode<T: Serialize>(value: &T) -> Result<JsValue, HostError> {
    to_js(value).map_err(|error| HostError::from_message(error.to_string()))
}

fn decode<T: DeserializeOwned>(value: &JsValue) -> Result<T, HostError> {
    from_js(value).map_err(|error| HostError::from_message(error.to_string()))
}

/// Like [`decode`], reading `undefined` as the empty value.
fn decode_or_default<T: DeserializeOwned + Default>(value: &JsValue) -> Result<T, HostError> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        decode(value)
    }
}

#[async_trait(?Send)]
impl Provider<ExecuteScript> for ChromeHost {
    async fn execute(&mut self, effect: ExecuteScript) -> Result<Vec<InjectionResult>, HostError> {
        if effect.request.func.is_some() {
            return Err(HostError::from_message(
                "`func` must be a function value; use Shim.executeScript",
            ));
        }
        let options = encode(&effect.request)?;
        let results = self.execute_script_raw(options).await?;
        decode_or_default(&results)
    }
}

#[async_trait(?Send)]
impl Provider<InsertCss> for ChromeHost {
    async fn execute(&mut self, effect: InsertCss) -> Result<(), HostError> {
        let options = encode(&effect.request)?;
        self.insert_css_raw(options).await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Provider<TabsExecuteScript> for ChromeHost {
    async fn execute(&mut self, effect: TabsExecuteScript) -> Result<Vec<Value>, HostError> {
        let injection = effect.0;
        let results = self
            .invoke(
                &["tabs"],
                "executeScript",
                vec![injection.tab_id.into(), encode(&injection.options)?],
            )
            .await?;
        decode_or_default(&results)
    }
}

#[async_trait(?Send)]
impl Provider<TabsInsertCss> for ChromeHost {
    async fn execute(&mut self, effect: TabsInsertCss) -> Result<(), HostError> {
        let injection = effect.0;
        self.invoke(
            &["tabs"],
            "insertCSS",
            vec![injection.tab_id.into(), encode(&injection.options)?],
        )
        .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Provider<QueryTabs> for ChromeHost {
    async fn execute(&mut self, effect: QueryTabs) -> Result<Vec<Tab>, HostError> {
        let tabs = self
            .invoke(&["tabs"], "query", vec![encode(&effect.query)?])
            .await?;
        decode_or_default(&tabs)
    }
}

#[async_trait(?Send)]
impl Provider<UpdateTab> for ChromeHost {
    async fn execute(&mut self, effect: UpdateTab) -> Result<Option<Tab>, HostError> {
        let tab = self
            .invoke(
                &["tabs"],
                "update",
                vec![effect.tab_id.into(), encode(&effect.update)?],
            )
            .await?;
        decode_or_default(&tab)
    }
}

#[async_trait(?Send)]
impl Provider<storage::Get> for ChromeHost {
    async fn execute(&mut self, effect: storage::Get) -> Result<Map<String, Value>, HostError> {
        let keys = match &effect.keys {
            Some(keys) => encode(keys)?,
            None => JsValue::NULL,
        };
        let entries = self
            .invoke(&["storage", effect.area.name()], "get", vec![keys])
            .await?;
        decode_or_default(&entries)
    }
}

#[async_trait(?Send)]
impl Provider<storage::Set> for ChromeHost {
    async fn execute(&mut self, effect: storage::Set) -> Result<(), HostError> {
        self.invoke(
            &["storage", effect.area.name()],
            "set",
            vec![encode(&effect.items)?],
        )
        .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Provider<GetAlarm> for ChromeHost {
    async fn execute(&mut self, effect: GetAlarm) -> Result<Option<Alarm>, HostError> {
        let alarm = self
            .invoke(&["alarms"], "get", vec![effect.name.into()])
            .await?;
        decode_or_default(&alarm)
    }
}

#[async_trait(?Send)]
impl Provider<CreateAlarm> for ChromeHost {
    async fn execute(&mut self, effect: CreateAlarm) -> Result<(), HostError> {
        // Older hosts take no callback here.
        self.call(
            &["alarms"],
            "create",
            vec![effect.name.into(), encode(&effect.schedule)?],
        )
        .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Provider<ListAlarms> for ChromeHost {
    async fn execute(&mut self, _effect: ListAlarms) -> Result<Vec<Alarm>, HostError> {
        let alarms = self.invoke(&["alarms"], "getAll", vec![]).await?;
        decode_or_default(&alarms)
    }
}

#[async_trait(?Send)]
impl Provider<GetManifest> for ChromeHost {
    async fn execute(&mut self, _effect: GetManifest) -> Result<ExtensionManifest, HostError> {
        let manifest = self.call(&["runtime"], "getManifest", vec![]).await?;
        decode(&manifest)
    }
}

#[async_trait(?Send)]
impl Provider<SendMessage> for ChromeHost {
    async fn execute(&mut self, effect: SendMessage) -> Result<Option<Value>, HostError> {
        let reply = self
            .invoke(&["runtime"], "sendMessage", vec![encode(&effect.message)?])
            .await?;
        decode_or_default(&reply)
    }
}

#[async_trait(?Send)]
impl Provider<SetUninstallUrl> for ChromeHost {
    async fn execute(&mut self, effect: SetUninstallUrl) -> Result<(), HostError> {
        self.invoke(&["runtime"], "setUninstallURL", vec![effect.url.into()])
            .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Provider<SetIcon> for ChromeHost {
    async fn execute(&mut self, effect: SetIcon) -> Result<(), HostError> {
        let namespace: &[&str] = if self.supports(HostApi::Action) {
            HostApi::Action.path()
        } else {
            &["browserAction"]
        };
        self.invoke(namespace, "setIcon", vec![encode(&effect.details)?])
            .await?;
        Ok(())
    }
}
