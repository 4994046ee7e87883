use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s that went through the
/// formatting pipeline.
///
/// This crate does not ship records anywhere itself; applications plug in
/// whatever output they already have (stdout, files, a log shipper). The
/// layer calls `send` from a background task and never awaits it on the
/// application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single log record to the underlying output.
    ///
    /// **Parameters**
    /// - `record`: record produced by the layer, already enriched by the
    ///   pipeline.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` if the output failed. The layer treats this as a
    ///   transient failure and retries the batch with backoff.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the output implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// A sink that drops every record.
///
/// Useful for measuring the cost of call-site resolution on its own,
/// without any output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
