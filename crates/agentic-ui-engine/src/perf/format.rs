use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::Rating;

const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// `512 B`, `1.5 KB`, `1.0 MB`.
pub fn format_size(bytes: usize) -> String {
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Milliseconds with two decimals, e.g. `12.34ms`.
pub fn format_duration(d: Duration) -> String {
    format!("{:.2}ms", d.as_secs_f64() * 1000.0)
}

/// Rates throughput: under 10 ms/KB optimal, 50 good, 100 fair, else slow.
/// Content under a kilobyte counts as one.
pub fn rate(duration: Duration, content_size: usize) -> Rating {
    let kb = (content_size as f64 / KB).max(1.0);
    let ms_per_kb = duration.as_secs_f64() * 1000.0 / kb;
    if ms_per_kb < 10.0 {
        Rating::Optimal
    } else if ms_per_kb < 50.0 {
        Rating::Good
    } else if ms_per_kb < 100.0 {
        Rating::Fair
    } else {
        Rating::Slow
    }
}

/// `paste-{unix millis}-{random}`.
pub fn generate_operation_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("paste-{millis}-{}", &random[..9])
}
