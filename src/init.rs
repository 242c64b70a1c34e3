use crate::client::LogCenterClient;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Settings for [`init_tracing_with_config`].
///
/// **Fields**
/// - `min_level`: least severe `tracing` level forwarded to the client.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to the forwarding layer so events also reach the
///   console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: Level,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: Level::INFO,
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that forwards events into
/// `client`.
///
/// **Parameters**
/// - `client`: the [`LogCenterClient`] whose buffer receives the records.
///   The subscriber keeps the buffer alive but stopping the client still
///   turns forwarding into a no-op.
/// - `config`: [`LayerConfig`] selecting the level and console output.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_tracing_with_config(
    client: &LogCenterClient,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = client.layer(config.min_level);

    // Both variants are spelled out because the layered subscriber types
    // differ.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(client: &LogCenterClient) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(client, LayerConfig::default())
}
