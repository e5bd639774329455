use std::fmt;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Html,
    Files,
    Mixed,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Html => "html",
            ContentType::Files => "files",
            ContentType::Mixed => "mixed",
        }
    }
}

/// Phase of a monitored operation. `Total` is the root metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Total,
    Parse,
    Upload,
    Insert,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Total => "total",
            OperationType::Parse => "parse",
            OperationType::Upload => "upload",
            OperationType::Insert => "insert",
        }
    }

    /// Human label used in log reports.
    pub fn label(self) -> &'static str {
        match self {
            OperationType::Total => "total operation",
            OperationType::Parse => "content parsing",
            OperationType::Upload => "file upload",
            OperationType::Insert => "content insertion",
        }
    }

    /// The sub-operation named by `label`, if any.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::SUB_OPERATIONS
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(label.trim()))
    }

    pub const SUB_OPERATIONS: [OperationType; 3] = [
        OperationType::Parse,
        OperationType::Upload,
        OperationType::Insert,
    ];
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Throughput rating from milliseconds per KB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Optimal,
    Good,
    Fair,
    Slow,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Optimal => "optimal",
            Rating::Good => "good",
            Rating::Fair => "fair",
            Rating::Slow => "slow",
        }
    }
}

/// One timed operation, keyed by id in the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetric {
    /// Offset from the monitor's epoch.
    pub start_time: Duration,
    pub end_time: Option<Duration>,
    pub duration: Option<Duration>,
    pub content_size: usize,
    pub content_type: ContentType,
    pub operation_type: OperationType,
}

/// Returned by `end_monitoring`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub duration: Duration,
    pub rating: Rating,
}

/// Aggregate over completed metrics still held by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_operations: usize,
    pub average_duration: Duration,
    pub metrics: Vec<(String, PerformanceMetric)>,
}
