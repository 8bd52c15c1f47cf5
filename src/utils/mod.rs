//! Shared utilities: logging setup, evaluation metrics, SVG charts, the error
//! type, and a few console formatting helpers.

pub mod charts;
pub mod error;
pub mod logging;
pub mod metrics;

// Re-export main types for convenience
pub use error::{ClassifierError, Result};
pub use logging::init_logging;
pub use metrics::{BinaryReport, ConfusionMatrix, Metrics};

/// Short wall-clock duration: `42.3s`, `3m 05s`, `2h 14m`
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours == 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}h {:02}m", hours, minutes)
    }
}

/// Integer with `,` between groups of three digits
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    groups.join(",")
}

/// Horizontal bar for class-distribution listings
pub fn format_bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = ((value as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(65.0), "1m 05s");
        assert_eq!(format_duration(3661.0), "1h 01m");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(6272), "6,272");
        assert_eq!(format_number(3_342_814), "3,342,814");
        assert_eq!(format_number(42), "42");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(10, 20, 10).chars().count(), 5);
        assert_eq!(format_bar(5, 0, 10), "");
        assert_eq!(format_bar(30, 20, 10).chars().count(), 10);
    }
}
