#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use metric_space::{init_tracing, Counter, EmfExporter, ExporterConfig, Histogram};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PRODUCERS: usize = 4;
const SEVERITIES: [&str; 4] = ["INFO", "LOW", "MEDIUM", "HIGH"];

/// Simulated alert forwarder: one handle per analysis type, specialized per
/// alert severity on every event.
fn produce(alerts: Counter, latency: Histogram, stop: Arc<AtomicBool>) {
    let mut rng = rand::thread_rng();
    let rules = alerts.with_dimensions(&["AnalysisType", "Rule"]);

    while !stop.load(Ordering::Relaxed) {
        let severity = SEVERITIES[rng.gen_range(0..SEVERITIES.len())];
        rules.with_dimensions(&["Severity", severity]).incr();
        latency.observe(rng.gen_range(1.0..250.0));
        thread::sleep(Duration::from_millis(rng.gen_range(5..50)));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match std::env::var("METRIC_SPACE_CONFIG") {
        Ok(path) => ExporterConfig::from_toml_file(path)?,
        Err(_) => ExporterConfig::from_env()?,
    };
    init_tracing(config.log_format)?;

    let exporter = Arc::new(EmfExporter::new(config, std::io::stdout()));
    let alerts = exporter.new_counter("AlertsCreated")?;
    let latency = exporter.new_histogram("ForwardLatencyMillis")?;

    let stop = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let (alerts, latency, stop) = (alerts.clone(), latency.clone(), stop.clone());
            thread::spawn(move || produce(alerts, latency, stop))
        })
        .collect();
    info!(producers = PRODUCERS, "Producers started; Ctrl-C to stop");

    let shutdown = CancellationToken::new();
    let flusher = {
        let exporter = exporter.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { exporter.run(shutdown).await })
    };

    tokio::signal::ctrl_c().await?;
    stop.store(true, Ordering::Relaxed);
    let panicked = tokio::task::spawn_blocking(move || {
        producers
            .into_iter()
            .map(|producer| producer.join())
            .filter(Result::is_err)
            .count()
    })
    .await?;
    if panicked > 0 {
        warn!(panicked, "Producer threads panicked");
    }
    shutdown.cancel();
    flusher.await?;

    Ok(())
}
