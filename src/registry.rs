//! Registry: fan-out over the enabled collectors and exposition rendering.
//!
//! One collector's failure never removes another collector's samples from the
//! same scrape; failures surface as a per-collector outcome plus exporter
//! self-metrics, not as process control flow.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::client::ApiTransport;
use crate::collector::{CollectError, Collector, Descriptor, Harvest};

/// Errors raised while assembling the registry at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate metric name: {0}")]
    DuplicateMetric(String),
}

/// Result of one collector's run within a scrape.
#[derive(Debug)]
pub enum Outcome {
    Collected(Harvest),
    Failed(CollectError),
}

impl Outcome {
    pub fn is_up(&self) -> bool {
        matches!(self, Outcome::Collected(_))
    }
}

/// One collector's contribution to a scrape.
#[derive(Debug)]
pub struct CollectorReport {
    pub descriptor: Descriptor,
    pub outcome: Outcome,
}

/// Everything produced by one scrape.
#[derive(Debug)]
pub struct ScrapeReport {
    pub collectors: Vec<CollectorReport>,
    pub duration: Duration,
}

impl ScrapeReport {
    /// Total samples across all collectors.
    pub fn sample_count(&self) -> usize {
        self.collectors
            .iter()
            .filter_map(|c| match &c.outcome {
                Outcome::Collected(harvest) => Some(harvest.samples.len()),
                Outcome::Failed(_) => None,
            })
            .sum()
    }
}

/// Process-lifetime scrape statistics.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStats {
    pub scrapes: u64,
    pub collector_failures: u64,
    pub items_skipped: u64,
}

/// Holds the enabled collectors and drives one scrape at a time.
pub struct Registry {
    collectors: Vec<Box<dyn Collector>>,
    transport: Arc<dyn ApiTransport>,
    namespace: String,
    scrape_timeout: Duration,
    stats: RwLock<ScrapeStats>,
}

impl Registry {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        namespace: impl Into<String>,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            collectors: Vec::new(),
            transport,
            namespace: namespace.into(),
            scrape_timeout,
            stats: RwLock::new(ScrapeStats::default()),
        }
    }

    /// Register a collector, rejecting duplicate metric names.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), RegistryError> {
        let name = collector.descriptor().name();
        if self.collectors.iter().any(|c| c.descriptor().name() == name) {
            return Err(RegistryError::DuplicateMetric(name.to_string()));
        }
        self.collectors.push(collector);
        Ok(())
    }

    /// Descriptors of every registered collector.
    pub fn describe(&self) -> Vec<&Descriptor> {
        self.collectors.iter().map(|c| c.descriptor()).collect()
    }

    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }

    /// Run one scrape: every collector in turn, each bounded by what remains
    /// of the scrape deadline.
    pub async fn gather(&self) -> ScrapeReport {
        let started = Instant::now();
        let deadline = started + self.scrape_timeout;
        let mut reports = Vec::with_capacity(self.collectors.len());

        for collector in &self.collectors {
            let descriptor = collector.descriptor().clone();
            let remaining = deadline.saturating_duration_since(Instant::now());

            let outcome = if remaining.is_zero() {
                Outcome::Failed(CollectError::TimedOut)
            } else {
                match tokio::time::timeout(remaining, collector.collect(self.transport.as_ref()))
                    .await
                {
                    Ok(Ok(harvest)) => Outcome::Collected(harvest),
                    Ok(Err(err)) => Outcome::Failed(err),
                    Err(_) => Outcome::Failed(CollectError::TimedOut),
                }
            };

            match &outcome {
                Outcome::Collected(harvest) => {
                    debug!(
                        metric = %descriptor.name(),
                        samples = harvest.samples.len(),
                        skipped = harvest.skipped,
                        "Collector finished"
                    );
                }
                Outcome::Failed(err) if err.is_expected() => {
                    warn!(
                        metric = %descriptor.name(),
                        error = %err,
                        "Collector hit an API error, emitting no samples"
                    );
                }
                Outcome::Failed(err) => {
                    error!(
                        metric = %descriptor.name(),
                        error = %err,
                        "Collector failed, emitting no samples"
                    );
                }
            }

            reports.push(CollectorReport {
                descriptor,
                outcome,
            });
        }

        let duration = started.elapsed();

        let mut stats = self.stats.write();
        stats.scrapes += 1;
        for report in &reports {
            match &report.outcome {
                Outcome::Collected(harvest) => stats.items_skipped += harvest.skipped,
                Outcome::Failed(_) => stats.collector_failures += 1,
            }
        }
        drop(stats);

        ScrapeReport {
            collectors: reports,
            duration,
        }
    }

    /// Render one scrape in Prometheus exposition format, followed by the
    /// exporter's own health series.
    pub fn render(&self, report: &ScrapeReport) -> String {
        let mut output = Vec::with_capacity(report.sample_count() * 100 + 512);

        for collector in &report.collectors {
            let descriptor = &collector.descriptor;
            writeln!(output, "# HELP {} {}", descriptor.name(), descriptor.help()).ok();
            writeln!(output, "# TYPE {} gauge", descriptor.name()).ok();

            if let Outcome::Collected(harvest) = &collector.outcome {
                for sample in &harvest.samples {
                    writeln!(
                        output,
                        "{}{} {}",
                        descriptor.name(),
                        format_labels(descriptor.label_names(), &sample.label_values),
                        format_value(sample.value)
                    )
                    .ok();
                }
            }
        }

        let ns = &self.namespace;
        let stats = self.stats.read();

        writeln!(output).ok();
        writeln!(
            output,
            "# HELP {ns}_exporter_collector_up whether the collector's last collection succeeded"
        )
        .ok();
        writeln!(output, "# TYPE {ns}_exporter_collector_up gauge").ok();
        for collector in &report.collectors {
            writeln!(
                output,
                "{ns}_exporter_collector_up{{collector=\"{}\"}} {}",
                collector.descriptor.subsystem(),
                u8::from(collector.outcome.is_up())
            )
            .ok();
        }

        writeln!(
            output,
            "# TYPE {ns}_exporter_collector_skipped_items gauge"
        )
        .ok();
        for collector in &report.collectors {
            if let Outcome::Collected(harvest) = &collector.outcome {
                writeln!(
                    output,
                    "{ns}_exporter_collector_skipped_items{{collector=\"{}\"}} {}",
                    collector.descriptor.subsystem(),
                    harvest.skipped
                )
                .ok();
            }
        }

        writeln!(output, "# TYPE {ns}_exporter_scrape_duration_seconds gauge").ok();
        writeln!(
            output,
            "{ns}_exporter_scrape_duration_seconds {}",
            report.duration.as_secs_f64()
        )
        .ok();

        writeln!(output, "# TYPE {ns}_exporter_scrapes_total counter").ok();
        writeln!(output, "{ns}_exporter_scrapes_total {}", stats.scrapes).ok();

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a label set from parallel name and value slices.
fn format_labels(names: &[&'static str], values: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
