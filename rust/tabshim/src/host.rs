use tabshim_effects::action::SetIcon;
use tabshim_effects::alarms::{CreateAlarm, GetAlarm, ListAlarms};
use tabshim_effects::runtime::{GetManifest, SendMessage, SetUninstallUrl};
use tabshim_effects::scripting::{ExecuteScript, InsertCss};
use tabshim_effects::storage;
use tabshim_effects::tabs::{QueryTabs, TabsExecuteScript, TabsInsertCss, UpdateTab};
use tabshim_effects::{Capabilities, ConditionalSend, ConditionalSync, Provider};

/// Everything an [`Extension`](crate::Extension) needs from its host.
///
/// This is automatically implemented for any cheaply clonable handle that
/// can probe capabilities and perform every effect in
/// [`tabshim_effects`]. A host that lacks an API still implements its
/// provider, answering with [`HostError::Unavailable`](crate::HostError::Unavailable).
pub trait ExtensionHost:
    Capabilities
    + Clone
    + ConditionalSend
    + ConditionalSync
    + Provider<ExecuteScript>
    + Provider<InsertCss>
    + Provider<TabsExecuteScript>
    + Provider<TabsInsertCss>
    + Provider<QueryTabs>
    + Provider<UpdateTab>
    + Provider<storage::Get>
    + Provider<storage::Set>
    + Provider<GetAlarm>
    + Provider<CreateAlarm>
    + Provider<ListAlarms>
    + Provider<GetManifest>
    + Provider<SendMessage>
    + Provider<SetUninstallUrl>
    + Provider<SetIcon>
{
}

impl<T> ExtensionHost for T where
    T: Capabilities
        + Clone
        + ConditionalSend
        + ConditionalSync
        + Provider<ExecuteScript>
        + Provider<InsertCss>
        + Provider<TabsExecuteScript>
        + Provider<TabsInsertCss>
        + Provider<QueryTabs>
        + Provider<UpdateTab>
        + Provider<storage::Get>
        + Provider<storage::Set>
        + Provider<GetAlarm>
        + Provider<CreateAlarm>
        + Provider<ListAlarms>
        + Provider<GetManifest>
        + Provider<SendMessage>
        + Provider<SetUninstallUrl>
        + Provider<SetIcon>
{
}
