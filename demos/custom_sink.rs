use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_call_site::{
    init::{init_tracing_with_config, LayerConfig},
    record::LogRecord,
    sink::LogSink,
};

/// Example of plugging an existing output into the layer by implementing
/// `LogSink` directly. Here every record is printed as one JSON line with
/// the call-site fields next to the event fields.
struct JsonLinesSink;

#[async_trait]
impl LogSink for JsonLinesSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("{}", serde_json::to_string(record)?);
        Ok(())
    }
}

struct PaymentService;

impl PaymentService {
    fn charge(&self, amount: u64) {
        if amount > 1_000 {
            error!(amount, "charge rejected");
        } else {
            info!(amount, "charge accepted");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LayerConfig {
        enable_stdout: false,
        ..Default::default()
    };
    init_tracing_with_config(Arc::new(JsonLinesSink), config)?;

    let service = PaymentService;
    service.charge(250);
    service.charge(5_000);

    // Give the background task time to flush.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    Ok(())
}
