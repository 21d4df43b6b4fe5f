//! JSONL file transmitter.
//!
//! Each transmitted report is serialized as a single JSON line with a
//! `type` field and `timestamp`, appended to the file via a buffered writer.

use async_trait::async_trait;
use reporting_application::{Attestation, ReportTransmitter, TransmitError};
use reporting_domain::{ConfigDigest, ReportInfo, ReportWithInfo, SeqNr};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Transmitter that appends one JSON object per report.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every line and on
/// `Drop`.
pub struct JsonlTransmitter {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTransmitter {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<RI: ReportInfo> ReportTransmitter<RI> for JsonlTransmitter {
    async fn transmit(
        &self,
        config_digest: ConfigDigest,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        attestation: &Attestation,
    ) -> Result<(), TransmitError> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let record = serde_json::json!({
            "type": "transmission",
            "timestamp": timestamp,
            "config_digest": config_digest.to_string(),
            "seq_nr": seq_nr,
            "report": hex::encode(report.report.as_bytes()),
            "info": format!("{:?}", report.info),
            "signers": attestation.signers.iter().map(|s| s.index()).collect::<Vec<_>>(),
        });

        let line = serde_json::to_string(&record)
            .map_err(|e| TransmitError::Transport(e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TransmitError::Transport("log writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)
            .and_then(|()| writer.flush())
            .map_err(|e| TransmitError::Transport(e.to_string()))
    }
}

impl Drop for JsonlTransmitter {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
