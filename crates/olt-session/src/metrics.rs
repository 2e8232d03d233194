//! Session metrics.
//!
//! Metrics are declared as [`Metric`] constants and registered once with
//! [`describe_metrics`]. Without an installed recorder every update is a
//! no-op.
//!
//! ```rust,ignore
//! use olt_session::metrics::{describe_metrics, metric_defs};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::COMMANDS.name, "host" => host).increment(1);
//! ```

use metrics::{describe_counter, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
}

/// A metric declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description)
            }
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// Metric definitions used by the session.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every session metric.
    pub const SESSION_LABELS: &[&str] = &["host"];

    pub const COMMANDS: Metric = Metric::counter("olt.session.commands")
        .with_description("Commands that completed with a prompt")
        .with_unit(Unit::Count)
        .with_labels(SESSION_LABELS);

    pub const COMMAND_TIMEOUTS: Metric = Metric::counter("olt.session.command_timeouts")
        .with_description("Bounded reads that gave up before completion")
        .with_unit(Unit::Count)
        .with_labels(SESSION_LABELS);

    /// Answers to `ESC [ 6 n` queries.
    pub const CURSOR_REPORTS: Metric = Metric::counter("olt.session.cursor_reports")
        .with_description("Cursor position reports sent to the device")
        .with_unit(Unit::Count)
        .with_labels(SESSION_LABELS);

    pub const BYTES_RECEIVED: Metric = Metric::counter("olt.session.bytes_received")
        .with_description("Bytes read from the device")
        .with_unit(Unit::Bytes)
        .with_labels(SESSION_LABELS);

    /// Time from writing a command to seeing the prompt again.
    pub const COMMAND_LATENCY: Metric = Metric::histogram("olt.session.command_latency")
        .with_description("Command round trip time")
        .with_unit(Unit::Seconds)
        .with_labels(SESSION_LABELS);

    pub const ALL: &[Metric] = &[
        COMMANDS,
        COMMAND_TIMEOUTS,
        CURSOR_REPORTS,
        BYTES_RECEIVED,
        COMMAND_LATENCY,
    ];
}

/// Describe all session metrics. Call once at start-up.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
