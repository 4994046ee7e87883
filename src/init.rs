use crate::error::InitError;
use crate::format::{call_site, Pipeline};
use crate::layer::CallSiteLayer;
use crate::options::CallSiteOptions;
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the call-site layer.
///
/// **Fields**
/// - `channel_buffer`: maximum number of queued [`LogRecord`]s before new
///   records are dropped.
/// - `batch_size`: number of records handed to the sink per batch.
/// - `flush_interval`: longest time a partial batch waits before it is
///   flushed.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is added
///   next to [`CallSiteLayer`] so events also show up on the console.
/// - `max_level`: most verbose level the layer processes.
/// - `options`: options of the call-site step.
///
/// [`LogRecord`]: crate::record::LogRecord
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub max_level: Level,
    pub options: CallSiteOptions,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
            max_level: Level::INFO,
            options: CallSiteOptions::from_env(),
        }
    }
}

impl LayerConfig {
    /// Build the layer described by this config with a pipeline holding
    /// only the call-site step.
    ///
    /// Must be called inside a Tokio runtime; see [`CallSiteLayer::new`].
    pub fn build_layer(
        &self,
        sink: Arc<dyn LogSink>,
    ) -> (CallSiteLayer, tokio::task::JoinHandle<()>) {
        let pipeline = Pipeline::new().with(call_site(self.options));
        CallSiteLayer::new(
            sink,
            pipeline,
            self.max_level,
            self.channel_buffer,
            self.batch_size,
            self.flush_interval,
        )
    }
}

/// Install a global `tracing` subscriber that tags every event with its
/// call site and forwards it to `sink`.
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that receives processed records.
/// - `config`: [`LayerConfig`] controlling the call-site step, buffering
///   and batching.
///
/// **Returns**
/// - `Err(InitError::SetGlobalDefault)` if a global subscriber was already
///   installed.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<(), InitError> {
    let (layer, _handle) = config.build_layer(sink);

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize tracing with defaults: `INFO` and above, options from
/// `CALL_SITE_PREPEND` / `CALL_SITE_REMOVE_EXTENSION`, console output on.
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<(), InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
