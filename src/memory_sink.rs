use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sink that keeps every record in memory.
///
/// Clones share the same buffer, so one handle can be given to the layer
/// and another kept for inspection.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far.
    pub async fn records(&self) -> Vec<LogRecord> {
        self.records.lock().await.clone()
    }

    /// Remove and return the records received so far.
    pub async fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock().await)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();

        sink.send(&LogRecord::new("one")).await.unwrap();
        sink.send(&LogRecord::new("two")).await.unwrap();

        let records = handle.take().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].message, "two");
        assert!(sink.records().await.is_empty());
    }
}
