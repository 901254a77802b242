//! Route selection and dispatch for script and CSS injection.
//!
//! An [`Injector`] looks at its host once, when it is built, and settles on a
//! [`Route`]. Every later call goes the same way: straight through to the
//! scripting API, or through [`translate`](crate::translate) to the legacy
//! tabs API.

use tabshim_effects::scripting::{ExecuteScript, InjectionRequest, InjectionResult, InsertCss};
use tabshim_effects::tabs::{
    LegacyInjection, LegacyOptions, TOP_FRAME, TabId, TabsExecuteScript, TabsInsertCss,
};
use tabshim_effects::{Capabilities, HostApi, Provider};

use crate::translate::{translate, translate_css};
use crate::{ExtensionHost, ShimError, ShimSettings, TranslateError};

type Narrowing = fn(InjectionRequest) -> Result<(TabId, LegacyOptions), TranslateError>;

/// Which host API injections go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `chrome.scripting`, requests passed through unchanged.
    Native,
    /// `chrome.tabs`, requests narrowed by the translator.
    Legacy,
}

impl Route {
    /// Pick a route for `host`.
    pub fn detect(host: &impl Capabilities, settings: &ShimSettings) -> Self {
        if !settings.force_legacy_scripting && host.supports(HostApi::Scripting) {
            Route::Native
        } else {
            Route::Legacy
        }
    }
}

/// A request that is ready to be handed to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    /// Unchanged capability-scoped request.
    Native(InjectionRequest),
    /// Translated legacy call.
    Legacy(LegacyInjection),
}

/// Dispatches injections over a fixed [`Route`].
#[derive(Debug, Clone)]
pub struct Injector<H> {
    host: H,
    route: Route,
}

impl<H> Injector<H>
where
    H: ExtensionHost,
{
    /// Probe `host` and build an injector around it.
    pub fn detect(host: H, settings: &ShimSettings) -> Self {
        let route = Route::detect(&host, settings);
        tracing::debug!(?route, "Selected injection route");
        Self::with_route(host, route)
    }

    /// Build an injector that uses `route` regardless of what the host
    /// supports.
    pub fn with_route(host: H, route: Route) -> Self {
        Self { host, route }
    }

    /// The route every injection takes.
    pub fn route(&self) -> Route {
        self.route
    }

    /// Prepare a script injection without touching the host.
    ///
    /// On the legacy route this is where translation errors surface.
    pub fn plan_script(&self, request: InjectionRequest) -> Result<Injection, ShimError> {
        self.plan(request, translate)
    }

    /// Prepare a CSS insertion without touching the host.
    pub fn plan_css(&self, request: InjectionRequest) -> Result<Injection, ShimError> {
        self.plan(request, translate_css)
    }

    fn plan(&self, request: InjectionRequest, narrow: Narrowing) -> Result<Injection, ShimError> {
        match self.route {
            Route::Native => Ok(Injection::Native(request)),
            Route::Legacy => {
                let (tab_id, options) = narrow(request)?;
                Ok(Injection::Legacy(LegacyInjection { tab_id, options }))
            }
        }
    }

    /// Run a script in the target tab.
    pub async fn execute_script(
        &mut self,
        request: InjectionRequest,
    ) -> Result<Vec<InjectionResult>, ShimError> {
        let injection = self.plan_script(request)?;
        self.perform_script(injection).await
    }

    /// Insert CSS into the target tab.
    pub async fn insert_css(&mut self, request: InjectionRequest) -> Result<(), ShimError> {
        let injection = self.plan_css(request)?;
        self.perform_css(injection).await
    }

    /// Hand a planned script injection to the host.
    pub async fn perform_script(
        &mut self,
        injection: Injection,
    ) -> Result<Vec<InjectionResult>, ShimError> {
        match injection {
            Injection::Native(request) => {
                tracing::trace!(tab_id = request.target.tab_id, "scripting.executeScript");
                let results =
                    <H as Provider<ExecuteScript>>::execute(&mut self.host, ExecuteScript::new(request))
                        .await?;
                Ok(results)
            }
            Injection::Legacy(injection) => {
                tracing::trace!(tab_id = injection.tab_id, "tabs.executeScript");
                let frame_id = match injection.options.all_frames {
                    Some(true) => None,
                    _ => Some(injection.options.frame_id.unwrap_or(TOP_FRAME)),
                };
                let values = <H as Provider<TabsExecuteScript>>::execute(
                    &mut self.host,
                    TabsExecuteScript(injection),
                )
                .await?;
                Ok(values
                    .into_iter()
                    .map(|result| InjectionResult {
                        frame_id,
                        document_id: None,
                        result: Some(result),
                    })
                    .collect())
            }
        }
    }

    /// Hand a planned CSS insertion to the host.
    pub async fn perform_css(&mut self, injection: Injection) -> Result<(), ShimError> {
        match injection {
            Injection::Native(request) => {
                tracing::trace!(tab_id = request.target.tab_id, "scripting.insertCSS");
                <H as Provider<InsertCss>>::execute(&mut self.host, InsertCss::new(request)).await?;
            }
            Injection::Legacy(injection) => {
                tracing::trace!(tab_id = injection.tab_id, "tabs.insertCSS");
                <H as Provider<TabsInsertCss>>::execute(&mut self.host, TabsInsertCss(injection))
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{HostCall, HostProfile, VolatileHost};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tabshim_effects::HostError;
    use tabshim_effects::scripting::ExecutionWorld;
    use testresult::TestResult;

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    use wasm_bindgen_test::wasm_bindgen_test;

    fn add() -> InjectionRequest {
        InjectionRequest::for_tab(3)
            .with_function("function(a,b){ return a+b }")
            .with_args(vec![json!(1), json!(2)])
    }

    #[test]
    fn it_routes_by_capability() {
        let settings = ShimSettings::default();

        assert_eq!(
            Route::detect(&VolatileHost::new(HostProfile::capability_scoped()), &settings),
            Route::Native
        );
        assert_eq!(
            Route::detect(&VolatileHost::new(HostProfile::legacy()), &settings),
            Route::Legacy
        );
    }

    #[test]
    fn it_honors_forced_legacy_routing() {
        let settings = ShimSettings {
            force_legacy_scripting: true,
            ..Default::default()
        };
        let host = VolatileHost::new(HostProfile::capability_scoped());

        assert_eq!(Injector::detect(host, &settings).route(), Route::Legacy);
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_passes_native_requests_through() -> TestResult {
        let host = VolatileHost::new(HostProfile::capability_scoped());
        let mut injector = Injector::detect(host.clone(), &ShimSettings::default());

        let request = add().in_world(ExecutionWorld::Main).with_frames(vec![0, 1]);
        injector.execute_script(request.clone()).await?;

        assert_eq!(host.calls().await, vec![HostCall::ExecuteScript(request)]);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_translates_for_legacy_hosts() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let mut injector = Injector::detect(host.clone(), &ShimSettings::default());

        injector.execute_script(add()).await?;

        let calls = host.calls().await;
        let [HostCall::TabsExecuteScript(injection)] = calls.as_slice() else {
            panic!("expected one legacy call, got {calls:?}");
        };
        assert_eq!(injection.tab_id, 3);
        assert_eq!(
            injection.options.code.as_deref(),
            Some("(function(a,b){ return a+b })(...[1,2])")
        );
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_makes_no_host_call_when_translation_fails() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let mut injector = Injector::detect(host.clone(), &ShimSettings::default());

        let multiple_frames = injector
            .execute_script(add().with_frames(vec![0, 1]))
            .await;
        let world = injector
            .insert_css(InjectionRequest::for_tab(1).in_world(ExecutionWorld::Isolated))
            .await;

        assert_eq!(
            multiple_frames,
            Err(ShimError::Translate(TranslateError::MultipleFrames { count: 2 }))
        );
        assert_eq!(
            world,
            Err(ShimError::Translate(TranslateError::WorldUnsupported))
        );
        assert!(host.calls().await.is_empty());
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_attributes_legacy_results_to_the_targeted_frame() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        host.reply_to_scripts(vec![json!(3)]).await;
        let mut injector = Injector::detect(host.clone(), &ShimSettings::default());

        let top = injector.execute_script(add()).await?;
        let framed = injector.execute_script(add().with_frames(vec![7])).await?;
        let every = injector.execute_script(add().with_all_frames(true)).await?;

        assert_eq!(
            top,
            vec![InjectionResult {
                frame_id: Some(0),
                document_id: None,
                result: Some(json!(3)),
            }]
        );
        assert_eq!(framed[0].frame_id, Some(7));
        assert_eq!(every[0].frame_id, None);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_carries_host_rejections_unchanged() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let rejection = HostError::from_message("Cannot access a chrome:// URL");
        host.reject_next(rejection.clone()).await;
        let mut injector = Injector::detect(host, &ShimSettings::default());

        let result = injector
            .insert_css(InjectionRequest::for_tab(1).with_files(["page.css"]))
            .await;

        assert_eq!(result, Err(ShimError::Host(rejection)));
        Ok(())
    }

    #[test]
    fn it_plans_without_touching_the_host() -> TestResult {
        let injector = Injector::with_route(VolatileHost::new(HostProfile::legacy()), Route::Legacy);

        let planned = injector.plan_css(InjectionRequest::for_tab(2).with_css("p { margin: 0 }"))?;

        let Injection::Legacy(injection) = planned else {
            panic!("expected a legacy injection");
        };
        assert_eq!(injection.options.code.as_deref(), Some("p { margin: 0 }"));
        Ok(())
    }
}
