//! Create-if-absent alarm registration.
//!
//! The host replaces an alarm when one is created under a taken name, which
//! restarts its countdown. Background contexts that register their alarms on
//! every start-up would otherwise keep pushing them into the future.

use std::sync::Arc;

use tabshim_effects::Provider;
use tabshim_effects::alarms::{Alarm, AlarmSchedule, CreateAlarm, GetAlarm};
use tokio::sync::Mutex;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{ExtensionHost, ShimError};

/// Milliseconds since the epoch, as the host reports alarm times.
pub(crate) fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_millis() as f64)
}

/// Registers alarms only when no alarm of the same name exists.
///
/// Lookup and creation run under a lock shared by all clones, so two
/// registrations of one name through the same registrar cannot both create.
/// Registrations made elsewhere are not covered.
#[derive(Debug, Clone)]
pub struct AlarmRegistrar<H> {
    host: H,
    guard: Arc<Mutex<()>>,
}

impl<H> AlarmRegistrar<H>
where
    H: ExtensionHost,
{
    #[allow(missing_docs)]
    pub fn new(host: H) -> Self {
        Self {
            host,
            guard: Arc::default(),
        }
    }

    /// Create alarm `name` with `schedule` unless it already exists.
    ///
    /// Returns the alarm as the host reports it after creation, or `None`
    /// when an alarm of that name was already registered and has been left
    /// alone. An alarm that fires before it can be read back is reported as
    /// scheduled.
    pub async fn create_alarm(
        &mut self,
        name: impl Into<String>,
        schedule: AlarmSchedule,
    ) -> Result<Option<Alarm>, ShimError> {
        let name = name.into();
        let _guard = self.guard.lock().await;

        let existing = <H as Provider<GetAlarm>>::execute(
            &mut self.host,
            GetAlarm { name: name.clone() },
        )
        .await?;

        if existing.is_some() {
            tracing::debug!(%name, "Alarm already registered");
            return Ok(None);
        }

        tracing::trace!(%name, ?schedule, "alarms.create");
        let created = schedule.alarm(name.clone(), now_millis());
        <H as Provider<CreateAlarm>>::execute(
            &mut self.host,
            CreateAlarm {
                name: name.clone(),
                schedule,
            },
        )
        .await?;

        let alarm = <H as Provider<GetAlarm>>::execute(&mut self.host, GetAlarm { name }).await?;
        if alarm.is_none() {
            tracing::debug!(name = %created.name, "Alarm fired before it was read back");
        }
        Ok(Some(alarm.unwrap_or(created)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{HostProfile, VolatileHost};
    use pretty_assertions::assert_eq;
    use tabshim_effects::HostError;
    use tabshim_effects::alarms::ListAlarms;
    use testresult::TestResult;

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    use wasm_bindgen_test::wasm_bindgen_test;

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_creates_missing_alarms() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let mut registrar = AlarmRegistrar::new(host.clone());

        let Some(alarm) = registrar
            .create_alarm("refresh", AlarmSchedule::every(30.0))
            .await?
        else {
            panic!("alarm was not created");
        };

        assert_eq!(alarm.name, "refresh");
        assert_eq!(alarm.period_in_minutes, Some(30.0));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_leaves_existing_alarms_alone() -> TestResult {
        let mut host = VolatileHost::new(HostProfile::legacy());
        let mut registrar = AlarmRegistrar::new(host.clone());

        registrar
            .create_alarm("x", AlarmSchedule::after(5.0))
            .await?;
        let second = registrar
            .create_alarm("x", AlarmSchedule::every(60.0))
            .await?;

        assert_eq!(second, None);
        assert_eq!(host.schedule("x").await, Some(AlarmSchedule::after(5.0)));
        assert_eq!(
            <VolatileHost as Provider<ListAlarms>>::execute(&mut host, ListAlarms)
                .await?
                .len(),
            1
        );
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_creates_once_under_concurrent_registration() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let registrar = AlarmRegistrar::new(host.clone());

        let attempts = (0..8).map(|attempt| {
            let mut registrar = registrar.clone();
            tokio::spawn(async move {
                registrar
                    .create_alarm("sync", AlarmSchedule::after(attempt as f64 + 1.0))
                    .await
            })
        });

        let mut created = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await??.is_some() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(host.calls_named("alarms.create").await, 1);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_reports_alarms_that_fire_on_creation() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        let mut registrar = AlarmRegistrar::new(host.clone());
        let due = AlarmSchedule {
            when: Some(1.0),
            ..Default::default()
        };

        let created = registrar.create_alarm("due", due.clone()).await?;

        assert_eq!(created, Some(due.alarm("due", 0.0)));
        assert_eq!(host.schedule("due").await, None);
        assert_eq!(host.calls_named("alarms.create").await, 1);
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_propagates_lookup_failures() -> TestResult {
        let host = VolatileHost::new(HostProfile::legacy());
        host.reject_next(HostError::unavailable("chrome.alarms")).await;
        let mut registrar = AlarmRegistrar::new(host.clone());

        let result = registrar.create_alarm("x", AlarmSchedule::after(1.0)).await;

        assert_eq!(
            result,
            Err(ShimError::Host(HostError::unavailable("chrome.alarms")))
        );
        assert_eq!(host.calls_named("alarms.create").await, 0);
        Ok(())
    }
}
