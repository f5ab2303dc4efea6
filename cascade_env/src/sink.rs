//! Snapshot sink abstraction: where serialized graph snapshots go.

use async_trait::async_trait;
use crate::error::EnvError;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

/// Abstraction for delivering serialized snapshots to a viewer.
///
/// # Implementations
///
/// - **In-process**: [`ChannelSink`], bounded mpsc channel
/// - **Local output**: [`WriterSink`], JSON lines on stdout or a file
/// - **Remote**: whatever transport the hosting application wires in
///
/// # Delivery
///
/// Publishing is best-effort. An `Err` is reported by the caller and the
/// next cycle simply tries again; a sink never gets to stall the engine.
#[async_trait]
pub trait SnapshotSink: Send + Sync + 'static {
    /// Delivers one serialized snapshot.
    ///
    /// # Returns
    /// * `Ok(())` - Payload accepted by the transport
    /// * `Err(EnvError)` - Payload dropped, the simulation carries on
    async fn publish(&self, payload: Vec<u8>) -> Result<(), EnvError>;

    /// Short human-readable name for logs.
    fn describe(&self) -> String;
}

/// Sink forwarding payloads into a bounded channel.
///
/// Uses `try_send` so a slow consumer turns into `SinkFull` errors rather
/// than back-pressure on the publisher.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes published payloads.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SnapshotSink for ChannelSink {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), EnvError> {
        self.tx.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(payload) => EnvError::SinkFull(payload.len()),
            mpsc::error::TrySendError::Closed(_) => EnvError::closed("receiver dropped"),
        })
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Sink writing each payload as one line to an async writer.
pub struct WriterSink {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    label: String,
}

impl WriterSink {
    /// Wraps an arbitrary writer.
    pub fn new<W>(writer: W, label: impl Into<String>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            writer: Mutex::new(Box::new(writer)),
            label: label.into(),
        }
    }

    /// Writes snapshots to standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout(), "stdout")
    }

    /// Creates (or truncates) a file and writes snapshots to it.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let path = path.as_ref();
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

#[async_trait]
impl SnapshotSink for WriterSink {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), EnvError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&payload).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
