//! Progress updates for long-running backend transfers
//!
//! The backend reports structured events through a [ProgressSink]; a drain
//! task serializes them as JSON lines into the output the caller supplied.
//! [ProgressStream::wait] is the drain signal the pull path builds its
//! lifetime guarantees on: it resolves only when every sink clone is gone
//! and the output has been flushed.

use crate::errors::ImageError;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};

/// What operational phase a progress event reports on
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Resolve,
    Download,
    Unpack,
    Complete,
}

/// One structured progress event from an image transfer
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The resource this event pertains to, typically a reference or layer
    /// digest
    pub id: String,
    pub phase: ProgressPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// A sizeless event for the given phase
    pub fn phase(id: impl Into<String>, phase: ProgressPhase) -> Self {
        ProgressEvent {
            id: id.into(),
            phase,
            current: None,
            total: None,
        }
    }

    /// A byte-counted download event
    pub fn download(id: impl Into<String>, current: u64, total: u64) -> Self {
        ProgressEvent {
            id: id.into(),
            phase: ProgressPhase::Download,
            current: Some(current),
            total: Some(total),
        }
    }
}

/// Sending half of a progress stream, handed to the content backend
///
/// Sinks are cheap to clone; the stream finishes draining once all clones
/// have been dropped. Events sent after the receiving side is gone are
/// silently discarded, matching the fire-and-forget nature of progress
/// output.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    /// Report one progress event
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// A stream of progress events draining into an output writer
///
/// Each event becomes one JSON line, flushed as it is written, so an
/// interactive consumer sees progress as it happens.
pub struct ProgressStream {
    sink: ProgressSink,
    drain: JoinHandle<Result<(), std::io::Error>>,
}

impl ProgressStream {
    /// Create a stream draining into `out`
    pub fn new<W>(out: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let drain = tokio::spawn(async move {
            let mut out = out;
            while let Some(event) = rx.recv().await {
                let mut line = serde_json::to_vec(&event).expect("progress events serialize");
                line.push(b'\n');
                out.write_all(&line).await?;
                out.flush().await?;
            }
            Ok(())
        });
        ProgressStream {
            sink: ProgressSink { tx },
            drain,
        }
    }

    /// A new sink feeding this stream
    pub fn sink(&self) -> ProgressSink {
        self.sink.clone()
    }

    /// Wait until the stream has fully drained
    ///
    /// Resolves once every sink is dropped and all buffered events have been
    /// flushed to the output.
    pub async fn wait(self) -> Result<(), ImageError> {
        let ProgressStream { sink, drain } = self;
        drop(sink);
        drain.await??;
        Ok(())
    }
}
