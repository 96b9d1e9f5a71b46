use async_trait::async_trait;
use wrkr_metrics::Sample;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("collector io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("collector error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CollectorError>;

/// Sink for metric sample batches flushed during a run.
///
/// The Engine calls `init` once before the run starts, `collect` on every progress tick with
/// the batch accumulated since the last tick, and `close` once after the run (or its grace
/// window) ends. A collector that fails is logged and dropped from subsequent ticks, never
/// failing the run.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn collect(&self, batch: &[Sample]);

    /// An optional human-facing link (e.g. a dashboard URL) surfaced in the run header.
    fn link(&self) -> Option<String> {
        None
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
