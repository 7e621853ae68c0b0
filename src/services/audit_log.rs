//! Append-only side log for anomalous write outcomes

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::AuditWriteError;

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<RFC3339 timestamp> - ReturnCode: <code> - SensorId: <id>`
    pub fn format_entry(at: DateTime<Utc>, return_code: i32, sensor_id: i32) -> String {
        format!(
            "{} - ReturnCode: {} - SensorId: {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            return_code,
            sensor_id
        )
    }

    /// Append one line, creating the file if needed
    pub async fn append(
        &self,
        at: DateTime<Utc>,
        return_code: i32,
        sensor_id: i32,
    ) -> Result<(), AuditWriteError> {
        let line = format!("{}\n", Self::format_entry(at, return_code, sensor_id));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| self.write_error(source))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|source| self.write_error(source))?;
        file.flush().await.map_err(|source| self.write_error(source))
    }

    fn write_error(&self, source: std::io::Error) -> AuditWriteError {
        AuditWriteError {
            path: self.path.clone(),
            source,
        }
    }
}
