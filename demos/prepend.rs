use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use tracing_call_site::init::{init_tracing_with_config, LayerConfig};
use tracing_call_site::options::CallSiteOptions;
use tracing_call_site::record::LogRecord;
use tracing_call_site::sink::LogSink;

/// Prints `LEVEL message`; with `prepend` the message already starts with
/// the call site.
struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("{:>5} {}", record.level, record.message);
        Ok(())
    }
}

struct Scheduler;

impl Scheduler {
    fn tick(&self, pending: usize) {
        if pending > 10 {
            warn!(pending, "queue is backing up");
        }
    }
}

fn load_settings() {
    info!("settings loaded");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = LayerConfig {
        enable_stdout: false,
        flush_interval: Duration::from_millis(50),
        options: CallSiteOptions {
            prepend: true,
            remove_extension: true,
        },
        ..Default::default()
    };
    init_tracing_with_config(Arc::new(ConsoleSink), config)?;

    // Prints roughly:
    //  INFO load_settings.{closure}: settings loaded
    //  WARN Scheduler.tick.{closure}: queue is backing up
    load_settings();
    Scheduler.tick(42);

    sleep(Duration::from_millis(200)).await;
    Ok(())
}
