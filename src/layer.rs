use crate::format::Pipeline;
use crate::record::LogRecord;
use crate::sink::LogSink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Attempts per batch before it is dropped.
const MAX_SEND_ATTEMPTS: u32 = 5;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s, runs
/// them through a formatting [`Pipeline`] and forwards them to an
/// asynchronous [`LogSink`].
///
/// The pipeline runs synchronously inside `on_event`, on the thread that
/// emitted the event, so steps that inspect the call stack (see
/// [`call_site`](crate::format::call_site)) see the application's frames.
/// Sink I/O happens on a background task fed through a bounded channel.
pub struct CallSiteLayer {
    sender: mpsc::Sender<LogRecord>,
    pipeline: Pipeline,
    max_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full or closed.
    pub dropped_events: Arc<AtomicU64>,
}

impl CallSiteLayer {
    /// Create a new layer and spawn the background task that drains the
    /// channel into `sink`. Must be called inside a Tokio runtime.
    ///
    /// **Parameters**
    /// - `sink`: destination of processed records.
    /// - `pipeline`: steps applied to every record, in order.
    /// - `max_level`: most verbose level that is processed; more verbose
    ///   events are ignored.
    /// - `buffer`, `batch_size`, `flush_interval`: channel capacity and
    ///   batching of the background task.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval`. The returned handle completes once the layer is
    /// dropped and the last batch has been delivered.
    pub fn new(
        sink: Arc<dyn LogSink>,
        pipeline: Pipeline,
        max_level: Level,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let backoff = Duration::from_millis(100);
            let max_backoff = Duration::from_secs(10);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(record) => {
                            batch.push(record);
                            if batch.len() >= batch_size {
                                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                    eprintln!("error sending log batch: {}", e);
                                }
                            }
                        }
                        None => break,
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                eprintln!("error flushing log batch: {}", e);
                            }
                        }
                    }
                }
            }

            // Channel closed: deliver what is left.
            if !batch.is_empty() {
                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                    eprintln!("error flushing final log batch: {}", e);
                }
            }
            if let Err(e) = sink.flush().await {
                eprintln!("error flushing log sink: {}", e);
            }
        });

        (
            Self {
                sender: tx,
                pipeline,
                max_level,
                total_events,
                enqueued_events,
                dropped_events,
            },
            handle,
        )
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn build_record(event: &Event<'_>) -> LogRecord {
        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let meta = event.metadata();
        LogRecord {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            message: message.unwrap_or_default(),
            fields,
        }
    }
}

/// Deliver `batch` to `sink`, retrying the whole batch with exponential
/// backoff. The batch is cleared on success and after the last attempt.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<LogRecord>,
    mut backoff: Duration,
    max_backoff: Duration,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut attempt = 1;
    loop {
        let mut last_err: Option<Box<dyn Error + Send + Sync>> = None;
        for record in batch.iter() {
            if let Err(e) = sink.send(record).await {
                last_err = Some(e);
                break;
            }
        }

        let Some(err) = last_err else {
            batch.clear();
            return Ok(());
        };

        if attempt >= MAX_SEND_ATTEMPTS {
            let dropped = batch.len();
            batch.clear();
            return Err(format!("giving up on {} record(s) after {} attempts: {}", dropped, attempt, err).into());
        }

        eprintln!("log sink send failed, retrying in {:?}", backoff);
        sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, max_backoff);
        attempt += 1;
    }
}

impl<S> Layer<S> for CallSiteLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.max_level {
            return;
        }

        let mut record = Self::build_record(event);
        self.pipeline.apply(&mut record);

        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log record");
            }
        }
    }
}

/// Collects event fields: `message` goes to [`LogRecord::message`],
/// everything else into the open field map.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    // `info!("text")` hands the message over as `fmt::Arguments`, which
    // lands here rather than in `record_str`.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }
}
