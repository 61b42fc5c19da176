//! # Receipt Delivery
//!
//! Hands the frozen [`ReceiptSnapshot`] of a closed session to whatever
//! prints or stores it.
//!
//! ## Sinks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [receipts] sink = "file"     → FilePreviewSink                        │
//! │                                 <preview_dir>/<session_id>.json        │
//! │                                                                         │
//! │  [receipts] sink = "discard"  → DiscardSink                            │
//! │                                 logs and drops                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery runs strictly after commit. A failure is reported in the
//! operation outcome and can be retried with
//! [`SessionEngine::redeliver_receipt`](crate::SessionEngine::redeliver_receipt).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use hamam_core::ReceiptSnapshot;

/// Receipt delivery failures.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Receipt I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Receipt serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A sink-specific failure (printer offline, paper out...).
    #[error("Receipt sink {sink} failed: {reason}")]
    Sink { sink: String, reason: String },
}

/// The receipt consumer capability.
#[async_trait]
pub trait ReceiptSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn deliver(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError>;
}

/// Receipt snapshot plus the result of handing it to the sink.
///
/// A failed delivery never undoes the committed transition; the snapshot is
/// kept so the caller can show or retry it.
#[derive(Debug)]
pub struct ReceiptOutcome {
    pub snapshot: ReceiptSnapshot,
    pub delivery: Result<(), ReceiptError>,
}

impl ReceiptOutcome {
    pub fn is_delivered(&self) -> bool {
        self.delivery.is_ok()
    }
}

// =============================================================================
// File Preview Sink
// =============================================================================

/// Writes each receipt as pretty JSON to `<dir>/<session_id>.json`.
#[derive(Debug, Clone)]
pub struct FilePreviewSink {
    dir: PathBuf,
}

impl FilePreviewSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FilePreviewSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the receipt of `session_id` is written.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }
}

#[async_trait]
impl ReceiptSink for FilePreviewSink {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn deliver(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError> {
        let contents = serde_json::to_vec_pretty(receipt)?;
        let path = self.path_for(&receipt.session_id);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, contents).await?;

        info!(session_id = %receipt.session_id, path = %path.display(), "Receipt preview written");
        Ok(())
    }
}

// =============================================================================
// Discard Sink
// =============================================================================

/// Accepts every receipt and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl ReceiptSink for DiscardSink {
    fn name(&self) -> &'static str {
        "discard"
    }

    async fn deliver(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError> {
        debug!(
            session_id = %receipt.session_id,
            items_total = %receipt.items_total,
            "Receipt discarded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hamam_core::Session;

    fn snapshot(session_id: &str) -> ReceiptSnapshot {
        let session = Session::open(session_id, "room-1", Some("Ayse K.".to_string()), Utc::now());
        ReceiptSnapshot::build(Some("Kurna 1".to_string()), &session, &[], &[]).unwrap()
    }

    #[tokio::test]
    async fn test_file_preview_sink_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FilePreviewSink::new(dir.path().join("receipts"));

        sink.deliver(&snapshot("s-1")).await.unwrap();

        let written = std::fs::read_to_string(sink.path_for("s-1")).unwrap();
        let back: ReceiptSnapshot = serde_json::from_str(&written).unwrap();
        assert_eq!(back.session_id, "s-1");
        assert_eq!(back.room_name.as_deref(), Some("Kurna 1"));
    }

    #[tokio::test]
    async fn test_file_preview_sink_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let sink = FilePreviewSink::new(&blocker);
        let err = sink.deliver(&snapshot("s-1")).await.unwrap_err();
        assert!(matches!(err, ReceiptError::Io(_)));
    }

    #[tokio::test]
    async fn test_discard_sink() {
        assert!(DiscardSink.deliver(&snapshot("s-1")).await.is_ok());
        assert_eq!(DiscardSink.name(), "discard");
    }
}
