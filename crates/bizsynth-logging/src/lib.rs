// Logging module - run logs and gateway request logging
pub mod request_logger;
pub mod run_logger;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use run_logger::RunLogger;

pub use request_logger::{log_request, log_response};

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Get or create the base bizsynth directory (~/.bizsynth, or $BIZSYNTH_HOME)
pub fn get_bizsynth_dir() -> Result<PathBuf> {
    let base_dir = match std::env::var("BIZSYNTH_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home_dir = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .context("Failed to get home directory")?;
            PathBuf::from(home_dir).join(".bizsynth")
        }
    };

    if !base_dir.exists() {
        std::fs::create_dir_all(&base_dir).context("Failed to create bizsynth directory")?;
    }

    Ok(base_dir)
}

/// Get or create the logs directory (~/.bizsynth/logs)
pub fn get_logs_dir() -> Result<PathBuf> {
    let logs_dir = get_bizsynth_dir()?.join("logs");

    if !logs_dir.exists() {
        std::fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;
    }

    Ok(logs_dir)
}
