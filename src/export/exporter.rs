use super::emf::{self, Metadata, MetricValue, SeriesDocument, Unit};
use crate::config::ExporterConfig;
use crate::counter::{Counter, Histogram};
use crate::dimensions::DimensionPath;
use crate::error::ExportError;
use crate::space::Space;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a metric's observation list is reduced to an emitted value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Running totals; the last observation is emitted
    Counter,
    /// Raw samples; every observation is emitted as an array
    Histogram,
}

impl MetricKind {
    fn unit(self) -> Unit {
        match self {
            MetricKind::Counter => Unit::Count,
            MetricKind::Histogram => Unit::Unitless,
        }
    }
}

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

struct Sink<W> {
    writer: W,
    // reused across flushes
    buf: Vec<u8>,
}

/// Periodic exporter writing drained snapshots as EMF JSON lines.
///
/// Metrics written straight through the [`Space`] without a handle from
/// this exporter are reported as the sum of their observations.
pub struct EmfExporter<W: Write + Send> {
    config: ExporterConfig,
    space: Arc<Space>,
    kinds: RwLock<AHashMap<String, MetricKind>>,
    sink: Mutex<Sink<W>>,
    clock: Clock,
}

impl<W: Write + Send> EmfExporter<W> {
    /// Exporter with its own fresh [`Space`]
    pub fn new(config: ExporterConfig, writer: W) -> Self {
        Self::with_space(config, Arc::new(Space::new()), writer)
    }

    pub fn with_space(config: ExporterConfig, space: Arc<Space>, writer: W) -> Self {
        EmfExporter {
            config,
            space,
            kinds: RwLock::new(AHashMap::new()),
            sink: Mutex::new(Sink {
                writer,
                buf: Vec::with_capacity(8192),
            }),
            clock: Box::new(unix_millis),
        }
    }

    /// Replace the millisecond timestamp source
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn space(&self) -> &Arc<Space> {
        &self.space
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Counter whose series are reported by their current total.
    ///
    /// Fails with [`ExportError::KindConflict`] if `name` is already a histogram.
    pub fn new_counter(&self, name: &str) -> Result<Counter, ExportError> {
        self.register(name, MetricKind::Counter)?;
        Ok(self.space.counter(name))
    }

    /// Histogram whose series are reported as raw sample arrays.
    ///
    /// Fails with [`ExportError::KindConflict`] if `name` is already a counter.
    pub fn new_histogram(&self, name: &str) -> Result<Histogram, ExportError> {
        self.register(name, MetricKind::Histogram)?;
        Ok(self.space.histogram(name))
    }

    /// Run one drain/flush cycle. Returns the number of documents written;
    /// nothing is written when there is nothing to report.
    ///
    /// Delivery is at most once: the space is drained before anything is
    /// written, so the interval is gone if the write fails and retrying
    /// cannot bring it back.
    pub fn sync(&self) -> Result<usize, ExportError> {
        let mut sink = self.sink.lock();
        let Sink { writer, buf } = &mut *sink;
        buf.clear();

        let snapshot = self.space.reset();
        let timestamp = (self.clock)();
        let kinds = self.kinds.read();

        let mut documents = 0;
        let mut failure = None;
        snapshot.walk(|name, path, observations| {
            let kind = kinds.get(name).copied();
            match self.encode_series(buf, name, path, observations, kind, timestamp) {
                Ok(written) => {
                    documents += written;
                    true
                }
                Err(e) => {
                    failure = Some(e);
                    false
                }
            }
        });
        drop(kinds);

        if let Some(e) = failure {
            return Err(e.into());
        }
        if documents == 0 {
            return Ok(0);
        }

        writer.write_all(buf)?;
        writer.flush()?;
        debug!(documents, bytes = buf.len(), "Flushed metric documents");
        Ok(documents)
    }

    /// Flush every `flush_interval` until `shutdown` is cancelled, then
    /// flush once more and return.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut tick = interval(self.config.flush_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        tick.tick().await;

        info!(
            namespace = %self.config.namespace,
            interval_ms = self.config.flush_interval_ms,
            "Metric exporter started"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => self.sync_logged(),
                _ = shutdown.cancelled() => {
                    self.sync_logged();
                    info!("Metric exporter stopped");
                    return;
                }
            }
        }
    }

    fn sync_logged(&self) {
        if let Err(e) = self.sync() {
            warn!("Failed to flush metrics: {}", e);
        }
    }

    fn register(&self, name: &str, kind: MetricKind) -> Result<(), ExportError> {
        let mut kinds = self.kinds.write();
        match kinds.get(name).copied() {
            Some(existing) if existing != kind => Err(ExportError::KindConflict {
                metric: name.to_owned(),
                registered: existing,
                requested: kind,
            }),
            Some(_) => Ok(()),
            None => {
                kinds.insert(name.to_owned(), kind);
                Ok(())
            }
        }
    }

    fn encode_series(
        &self,
        buf: &mut Vec<u8>,
        name: &str,
        path: &DimensionPath,
        observations: &[f64],
        kind: Option<MetricKind>,
        timestamp: i64,
    ) -> Result<usize, serde_json::Error> {
        let dimensions = path.len() / 2;
        if dimensions > emf::MAX_DIMENSIONS {
            warn!(
                metric = name,
                dimensions,
                max = emf::MAX_DIMENSIONS,
                "Dropping series with too many dimensions"
            );
            return Ok(0);
        }
        if let Some(key) = emf::conflicting_key(name, path) {
            warn!(
                metric = name,
                dimensions = %path,
                key,
                "Dropping series with a repeated root key"
            );
            return Ok(0);
        }

        let unit = kind.map_or(Unit::Count, MetricKind::unit);
        let metadata = Metadata::for_series(&self.config.namespace, name, unit, path, timestamp);
        let document = |value| SeriesDocument {
            metric: name,
            value,
            dimensions: path,
            metadata: &metadata,
        };

        match kind {
            Some(MetricKind::Histogram) => {
                if let Some(sample) = observations.iter().find(|v| !v.is_finite()) {
                    warn!(
                        metric = name,
                        dimensions = %path,
                        %sample,
                        "Dropping series with a non-finite sample"
                    );
                    return Ok(0);
                }
                let mut written = 0;
                for chunk in observations.chunks(emf::MAX_VALUES_PER_DOCUMENT) {
                    emf::write_document(buf, &document(MetricValue::Values(chunk)))?;
                    written += 1;
                }
                Ok(written)
            }
            Some(MetricKind::Counter) | None => {
                let value: f64 = match kind {
                    Some(MetricKind::Counter) => observations.last().copied().unwrap_or_default(),
                    _ => observations.iter().sum(),
                };
                if !value.is_finite() {
                    warn!(
                        metric = name,
                        dimensions = %path,
                        %value,
                        "Dropping series with a non-finite value"
                    );
                    return Ok(0);
                }
                emf::write_document(buf, &document(MetricValue::Single(value)))?;
                Ok(1)
            }
        }
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
