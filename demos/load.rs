use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_call_site::init::{init_tracing_with_config, LayerConfig};
use tracing_call_site::options::CallSiteOptions;
use tracing_call_site::sink::NoopSink;

/// Measures the per-event cost of stack capture and call-site resolution.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(NoopSink);

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        options: CallSiteOptions::default(),
        ..Default::default()
    };

    init_tracing_with_config(sink, layer_config)?;

    let n: u64 = 10_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "call-site layer: {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(1)).await;
    Ok(())
}
