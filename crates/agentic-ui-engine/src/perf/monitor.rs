use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

use super::format::{format_duration, format_size, generate_operation_id, rate};
use super::types::{ContentType, OperationType, PerformanceMetric, Report, Summary};

/// Process-wide map of in-flight operation timings.
///
/// Every method is a no-op while disabled, and none of them can fail: a
/// missing parent or an unknown id is logged and ignored.
#[derive(Debug)]
pub struct PerformanceMonitor {
    enabled: AtomicBool,
    epoch: Instant,
    metrics: Mutex<HashMap<String, PerformanceMetric>>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn sub_id(id: &str, op: OperationType) -> String {
    format!("{id}-{op}")
}

impl PerformanceMonitor {
    /// Enabled in debug builds only.
    pub fn new() -> Self {
        Self::with_enabled(cfg!(debug_assertions))
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            epoch: Instant::now(),
            metrics: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    // A panic mid-update leaves the map usable; timings are advisory.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, PerformanceMetric>> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    pub fn start_monitoring(&self, id: &str, content_type: ContentType, content_size: usize) {
        if !self.is_enabled() {
            return;
        }
        let metric = PerformanceMetric {
            start_time: self.now(),
            end_time: None,
            duration: None,
            content_size,
            content_type,
            operation_type: OperationType::Total,
        };
        self.lock().insert(id.to_string(), metric);
        log::info!(
            "[perf] {id}: started {} ({})",
            content_type.as_str(),
            format_size(content_size)
        );
    }

    /// Starts phase `op` under `id`, inheriting content type and size.
    pub fn start_sub_operation(&self, id: &str, op: OperationType) {
        if !self.is_enabled() {
            return;
        }
        let now = self.now();
        let mut metrics = self.lock();
        let Some(parent) = metrics.get(id) else {
            log::debug!("[perf] {id}: no parent for {op}");
            return;
        };
        let metric = PerformanceMetric {
            start_time: now,
            end_time: None,
            duration: None,
            content_size: parent.content_size,
            content_type: parent.content_type,
            operation_type: op,
        };
        metrics.insert(sub_id(id, op), metric);
    }

    pub fn end_sub_operation(&self, id: &str, op: OperationType) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        let now = self.now();
        let mut metrics = self.lock();
        let metric = metrics.get_mut(&sub_id(id, op))?;
        let duration = now.saturating_sub(metric.start_time);
        metric.end_time = Some(now);
        metric.duration = Some(duration);
        log::info!(
            "[perf] {id}: {} took {}",
            op.label(),
            format_duration(duration)
        );
        Some(duration)
    }

    /// Finalizes `id`, drops it and its phases, and rates the throughput.
    pub fn end_monitoring(&self, id: &str) -> Option<Summary> {
        if !self.is_enabled() {
            return None;
        }
        let now = self.now();
        let mut metrics = self.lock();
        let metric = metrics.remove(id)?;
        for op in OperationType::SUB_OPERATIONS {
            metrics.remove(&sub_id(id, op));
        }
        drop(metrics);

        let duration = now.saturating_sub(metric.start_time);
        let rating = rate(duration, metric.content_size);
        log::info!(
            "[perf] {id}: finished {} in {} ({})",
            format_size(metric.content_size),
            format_duration(duration),
            rating.as_str()
        );
        Some(Summary { duration, rating })
    }

    pub fn metric(&self, id: &str) -> Option<PerformanceMetric> {
        self.lock().get(id).cloned()
    }

    pub fn sub_metric(&self, id: &str, op: OperationType) -> Option<PerformanceMetric> {
        self.metric(&sub_id(id, op))
    }

    /// Number of metrics currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Aggregates every held metric that has a duration.
    pub fn get_report(&self) -> Report {
        let mut metrics: Vec<(String, PerformanceMetric)> = self
            .lock()
            .iter()
            .filter(|(_, m)| m.duration.is_some())
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect();
        metrics.sort_by(|a, b| a.0.cmp(&b.0));

        let total: Duration = metrics.iter().filter_map(|(_, m)| m.duration).sum();
        let average_duration = u32::try_from(metrics.len())
            .ok()
            .filter(|n| *n > 0)
            .map_or(Duration::ZERO, |n| total / n);
        Report {
            total_operations: metrics.len(),
            average_duration,
            metrics,
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_metric(&self, id: &str, metric: PerformanceMetric) {
        self.lock().insert(id.to_string(), metric);
    }
}

static MONITOR: OnceLock<Arc<PerformanceMonitor>> = OnceLock::new();

/// The shared process-wide monitor.
pub fn performance_monitor() -> Arc<PerformanceMonitor> {
    Arc::clone(MONITOR.get_or_init(|| Arc::new(PerformanceMonitor::new())))
}

/// Times `f` as a fresh operation on the shared monitor. A label that names
/// a sub-operation (`parse`, `upload`, `insert`) also records that phase.
///
/// Errors are logged and passed through unchanged.
pub fn with_performance_monitoring<T, E, F>(label: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let run = MonitoredRun::begin(label);
    let result = f();
    if let Err(e) = &result {
        log::error!("[perf] {label} failed: {e}");
    }
    run.finish();
    result
}

/// [`with_performance_monitoring`] for closures that cannot fail.
pub fn measure<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let run = MonitoredRun::begin(label);
    let value = f();
    run.finish();
    value
}

struct MonitoredRun {
    monitor: Arc<PerformanceMonitor>,
    id: String,
    phase: Option<OperationType>,
}

impl MonitoredRun {
    fn begin(label: &str) -> Self {
        let monitor = performance_monitor();
        let id = generate_operation_id();
        let phase = OperationType::from_label(label);
        log::trace!("[perf] {label} started as {id}");
        monitor.start_monitoring(&id, ContentType::Text, 0);
        if let Some(op) = phase {
            monitor.start_sub_operation(&id, op);
        }
        Self { monitor, id, phase }
    }

    fn finish(self) {
        if let Some(op) = self.phase {
            self.monitor.end_sub_operation(&self.id, op);
        }
        self.monitor.end_monitoring(&self.id);
    }
}
