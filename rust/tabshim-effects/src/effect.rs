use crate::ConditionalSend;

/// A single host call, described as data.
///
/// The associated `Output` is what the host hands back when the effect is
/// performed, usually a `Result` whose error side is [`HostError`](crate::HostError).
pub trait Effect: ConditionalSend + Sized {
    /// The value produced by performing this effect.
    type Output: ConditionalSend;
}

/// Trait for hosts that can perform an [`Effect`].
///
/// # Example
///
/// ```
/// use tabshim_effects::{Effect, HostError, Provider};
/// use async_trait::async_trait;
///
/// struct Ping;
///
/// impl Effect for Ping {
///     type Output = Result<&'static str, HostError>;
/// }
///
/// struct Host;
///
/// #[cfg_attr(not(target_arch = "wasm32"), async_trait)]
/// #[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
/// impl Provider<Ping> for Host {
///     async fn execute(&mut self, _effect: Ping) -> Result<&'static str, HostError> {
///         Ok("pong")
///     }
/// }
/// ```
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
pub trait Provider<E: Effect> {
    /// Perform the effect against the host and return its output.
    async fn execute(&mut self, effect: E) -> E::Output;
}
