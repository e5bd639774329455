//! # Performance Monitor
//!
//! Development-time timing of paste and streaming operations. An operation
//! is started with [`PerformanceMonitor::start_monitoring`], split into
//! `parse`/`upload`/`insert` phases, and finalized with
//! [`PerformanceMonitor::end_monitoring`], which rates throughput in ms per
//! KB and removes every trace of the operation.
//!
//! Reports go through `log::info!`. Nothing here influences parsing or
//! rendering results.

pub mod format;
pub mod monitor;
pub mod types;

pub use format::{format_duration, format_size, generate_operation_id, rate};
pub use monitor::{PerformanceMonitor, measure, performance_monitor, with_performance_monitoring};
pub use types::{ContentType, OperationType, PerformanceMetric, Rating, Report, Summary};
