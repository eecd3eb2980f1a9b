use anyhow::{Context, Result};
use bizsynth_types::ProgressEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String, // ISO-8601 UTC
    request: &'a str,
    event: &'a ProgressEvent,
}

/// Appends every progress event of a run to a JSONL file
pub struct RunLogger {
    file_path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl RunLogger {
    /// Create a new logger; the file name is derived from the current UTC time.
    pub async fn new(logs_dir: &Path) -> Result<Self> {
        fs::create_dir_all(logs_dir)
            .await
            .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

        let now: DateTime<Utc> = Utc::now();
        let filename = format!("run-{}.jsonl", now.format("%Y-%m-%d-%H%M%S%.3f"));
        let file_path = logs_dir.join(filename);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .with_context(|| format!("Failed to open run log {}", file_path.display()))?;

        Ok(Self {
            file_path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Append a single event. Write failures are reported but never abort a run.
    pub async fn log(&mut self, request: &str, event: &ProgressEvent) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            request,
            event,
        };
        if let Some(file) = &mut self.file {
            match serde_json::to_string(&entry) {
                Ok(mut json) => {
                    json.push('\n');
                    if let Err(e) = file.write_all(json.as_bytes()).await {
                        log::warn!("run log write to {} failed: {}", self.file_path.display(), e);
                    }
                }
                Err(e) => log::warn!("could not serialize {} event: {}", event.name(), e),
            }
        }
    }

    /// Flush and close. Called once the run reached a terminal event.
    pub async fn shutdown(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
            let _ = file.sync_all().await;
        }
    }
}
