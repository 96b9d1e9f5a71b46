use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use wrkr_core::Collector;
use wrkr_metrics::Sample;

/// Collector backend writing newline-delimited JSON `Sample` batches to a file.
///
/// Grounded on the existing line-oriented JSON emission pattern in `output::json`.
pub(crate) struct JsonFileCollector {
    path: PathBuf,
    file: Mutex<Option<std::fs::File>>,
}

impl JsonFileCollector {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Collector for JsonFileCollector {
    async fn init(&self) -> wrkr_core::collector::Result<()> {
        let file = std::fs::File::create(&self.path)?;
        *self.file.lock().unwrap_or_else(|p| p.into_inner()) = Some(file);
        Ok(())
    }

    async fn collect(&self, batch: &[Sample]) {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let Some(file) = guard.as_mut() else {
            return;
        };
        for sample in batch {
            if serde_json::to_writer(&mut *file, sample).is_ok() {
                let _ = writeln!(file);
            }
        }
    }

    fn link(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }

    async fn close(&self) -> wrkr_core::collector::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(file) = guard.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Collector backend mirroring `Sample` batches to stdout as newline-delimited JSON.
pub(crate) struct StdoutCollector;

#[async_trait]
impl Collector for StdoutCollector {
    async fn collect(&self, batch: &[Sample]) {
        let mut out = std::io::stdout().lock();
        for sample in batch {
            if serde_json::to_writer(&mut out, sample).is_ok() {
                let _ = writeln!(out);
            }
        }
    }
}

pub(crate) fn build_collectors(out: Option<&str>) -> anyhow::Result<Vec<std::sync::Arc<dyn Collector>>> {
    let Some(raw) = out else {
        return Ok(Vec::new());
    };

    let collector: std::sync::Arc<dyn Collector> = match raw.split_once('=') {
        Some(("json-file", path)) if !path.is_empty() => {
            std::sync::Arc::new(JsonFileCollector::new(PathBuf::from(path)))
        }
        Some(("json-file", _)) => {
            anyhow::bail!("`--out json-file=PATH` requires a non-empty PATH")
        }
        None if raw == "stdout" => std::sync::Arc::new(StdoutCollector),
        _ => {
            anyhow::bail!("unsupported --out spec `{raw}` (expected `json-file=PATH` or `stdout`)")
        }
    };

    Ok(vec![collector])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_collectors_accepts_json_file_and_stdout() {
        assert!(build_collectors(None).unwrap_or_else(|e| panic!("{e}")).is_empty());
        assert_eq!(
            build_collectors(Some("stdout"))
                .unwrap_or_else(|e| panic!("{e}"))
                .len(),
            1
        );
        assert_eq!(
            build_collectors(Some("json-file=out.ndjson"))
                .unwrap_or_else(|e| panic!("{e}"))
                .len(),
            1
        );
        assert!(build_collectors(Some("bogus")).is_err());
        assert!(build_collectors(Some("json-file=")).is_err());
    }
}
