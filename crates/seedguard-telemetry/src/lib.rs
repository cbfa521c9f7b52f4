//! Telemetry primitives shared across the seedguard workspace.
//!
//! Centralises the Prometheus registry and the tracing bootstrap so every
//! crate reports through the same observability story.

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if another subscriber has already been installed.
pub fn init_logging() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

/// Prometheus-backed metrics registry shared across the policy services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    decisions_total: IntCounterVec,
    decision_errors_total: IntCounter,
    settings_cache_total: IntCounterVec,
    candidates_dropped_total: IntCounterVec,
    move_behavior_downgrades_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
}

/// Point-in-time snapshot of the counters most useful for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total safety decisions that ended in a fail-open error path.
    pub decision_errors_total: u64,
}

impl Metrics {
    /// Construct a new registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any Prometheus collector cannot be registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let decisions_total = IntCounterVec::new(
            Opts::new("safety_decisions_total", "Safety decisions by outcome"),
            &["action", "verdict"],
        )?;
        let decision_errors_total = IntCounter::with_opts(Opts::new(
            "safety_decision_errors_total",
            "Evaluations that fell back to the fail-open decision",
        ))?;
        let settings_cache_total = IntCounterVec::new(
            Opts::new(
                "safety_settings_cache_total",
                "Settings cache lookups by outcome",
            ),
            &["scope", "outcome"],
        )?;
        let candidates_dropped_total = IntCounterVec::new(
            Opts::new(
                "quality_candidates_dropped_total",
                "Release candidates rejected by quality rule",
            ),
            &["rule"],
        )?;
        let move_behavior_downgrades_total = IntCounterVec::new(
            Opts::new(
                "move_behavior_downgrades_total",
                "File-move behaviours downgraded by the active risk mode",
            ),
            &["mode"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Audit events emitted by type"),
            &["type"],
        )?;

        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(decision_errors_total.clone()))?;
        registry.register(Box::new(settings_cache_total.clone()))?;
        registry.register(Box::new(candidates_dropped_total.clone()))?;
        registry.register(Box::new(move_behavior_downgrades_total.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                decisions_total,
                decision_errors_total,
                settings_cache_total,
                candidates_dropped_total,
                move_behavior_downgrades_total,
                events_emitted_total,
            }),
        })
    }

    /// Increment the decision counter for the given action/verdict pair.
    pub fn inc_decision(&self, action: &str, verdict: &str) {
        self.inner
            .decisions_total
            .with_label_values(&[action, verdict])
            .inc();
    }

    /// Increment the fail-open decision counter.
    pub fn inc_decision_error(&self) {
        self.inner.decision_errors_total.inc();
    }

    /// Record a settings cache lookup outcome (`hit`, `refresh`, `stale_serve`, `miss`).
    pub fn inc_settings_cache(&self, scope: &str, outcome: &str) {
        self.inner
            .settings_cache_total
            .with_label_values(&[scope, outcome])
            .inc();
    }

    /// Record a candidate rejected by a quality rule.
    pub fn inc_candidate_dropped(&self, rule: &str) {
        self.inner
            .candidates_dropped_total
            .with_label_values(&[rule])
            .inc();
    }

    /// Record a move-behaviour downgrade applied under a risk mode.
    pub fn inc_move_downgrade(&self, mode: &str) {
        self.inner
            .move_behavior_downgrades_total
            .with_label_values(&[mode])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the health-relevant counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decision_errors_total: self.inner.decision_errors_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    #[must_use]
    pub fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_render_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_decision("download", "DENY");
        metrics.inc_decision_error();
        metrics.inc_settings_cache("global", "refresh");
        metrics.inc_candidate_dropped("hdr");
        metrics.inc_move_downgrade("C_PRO");
        metrics.inc_event("decision_recorded");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decision_errors_total, 1);

        let rendered = metrics.render()?;
        assert!(
            rendered
                .contains(r#"safety_decisions_total{action="download",verdict="DENY"} 1"#)
        );
        assert!(rendered.contains(r#"quality_candidates_dropped_total{rule="hdr"} 1"#));
        Ok(())
    }
}
