//! Terminal rendering of coordinator outcomes.

use std::collections::BTreeMap;

use hashmatch_core::{Algorithm, VerificationObserver};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with one decimal, e.g. `1.5 GB`. Bytes stay integral.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Prints each outcome to stdout and mirrors it to the log.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl VerificationObserver for ConsoleObserver {
    fn on_file_detected(&self, name: &str, size_bytes: u64, digests: &BTreeMap<Algorithm, String>) {
        tracing::info!(file = name, size_bytes, "download digested");
        println!("Detected {} ({})", name, format_size(size_bytes));
        for (alg, digest) in digests {
            println!("  {:<7} {}", alg, digest);
        }
    }

    fn on_awaiting_verification(&self) {
        println!("Waiting for a digest on the clipboard...");
    }

    fn on_verified(&self, name: &str) {
        tracing::info!(file = name, "digest matches");
        println!("OK       {}: digest matches", name);
    }

    fn on_failed(&self, name: &str, expected: &str, actual: &str) {
        tracing::warn!(file = name, expected, actual, "digest mismatch");
        println!("MISMATCH {}", name);
        println!("  copied  {}", expected);
        println!("  file    {}", actual);
    }

    fn on_reset(&self) {
        tracing::debug!("verification result cleared");
    }
}
