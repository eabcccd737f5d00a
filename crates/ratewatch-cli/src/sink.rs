//! Persistence hand-off for collected snapshots.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use ratewatch_core::PriceSnapshot;

/// Accepts the flat snapshot list of a run.
pub(crate) trait SnapshotSink {
    /// Persists `snapshots` and returns how many were written.
    fn persist(&self, snapshots: &[PriceSnapshot]) -> anyhow::Result<usize>;
}

/// Writes snapshots as a pretty-printed JSON array, to a file or stdout.
#[derive(Debug, Clone, Default)]
pub(crate) struct JsonSnapshotSink {
    path: Option<PathBuf>,
}

impl JsonSnapshotSink {
    pub(crate) fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub(crate) fn destination(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "stdout".to_owned(), |p| p.display().to_string())
    }
}

impl SnapshotSink for JsonSnapshotSink {
    fn persist(&self, snapshots: &[PriceSnapshot]) -> anyhow::Result<usize> {
        match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = File::create(path).map_err(|e| {
                    anyhow::anyhow!("failed to create snapshot file {}: {e}", path.display())
                })?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, snapshots)?;
                writeln!(writer)?;
                writer.flush()?;
            }
            None => {
                let mut out = std::io::stdout().lock();
                serde_json::to_writer_pretty(&mut out, snapshots)?;
                writeln!(out)?;
            }
        }
        Ok(snapshots.len())
    }
}
