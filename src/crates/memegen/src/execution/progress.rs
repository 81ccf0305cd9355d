//! Progress channel for one generation run
//!
//! One [`ProgressSender`] per run, owned by the run task. Intermediate events
//! go through [`ProgressSender::emit`]; the terminal event goes through
//! [`ProgressSender::finish`], which consumes the sender so nothing can follow
//! it. Dropping the sender on any other path closes the stream.

use super::error::GenerationError;
use crate::domain::GenerationResult;
use crate::rate::RateInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Default capacity of a run's event buffer
pub const DEFAULT_BUFFER: usize = 16;

pub const STATUS_COMPLETE: &str = "Complete!";
pub const STATUS_ERROR: &str = "Error";

/// One update on a run's progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub progress: u8,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meme: Option<GenerationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ProgressEvent {
    /// Intermediate checkpoint
    pub fn step(progress: u8, status: impl Into<String>) -> Self {
        Self {
            progress: progress.min(100),
            status: status.into(),
            meme: None,
            error: None,
            error_kind: None,
            rate_limit: None,
            warning: None,
        }
    }

    /// Terminal success event
    pub fn completed(result: GenerationResult, warning: Option<String>) -> Self {
        Self {
            meme: Some(result),
            warning,
            ..Self::step(100, STATUS_COMPLETE)
        }
    }

    /// Terminal failure event
    pub fn failed(error: &GenerationError) -> Self {
        Self {
            error: Some(error.to_string()),
            error_kind: Some(error.code().to_string()),
            rate_limit: error.rate_limit().cloned(),
            ..Self::step(100, STATUS_ERROR)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.meme.is_some() || self.error.is_some()
    }

    /// Encode as one `data: <json>\n\n` frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Receiving half handed to the transport
pub type ProgressStream = ReceiverStream<ProgressEvent>;

/// The receiver is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("progress receiver closed")
    }
}

impl std::error::Error for ChannelClosed {}

/// Create a run's progress channel
pub fn channel(buffer: usize) -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (
        ProgressSender {
            tx,
            last_progress: 0,
        },
        ReceiverStream::new(rx),
    )
}

/// A stream that carries a single failure event
pub fn rejected(error: &GenerationError) -> ProgressStream {
    let (tx, rx) = mpsc::channel(1);
    // Capacity is 1 and the receiver is alive, so this cannot fail.
    let _ = tx.try_send(ProgressEvent::failed(error));
    ReceiverStream::new(rx)
}

/// Writing half of a run's progress channel
#[derive(Debug)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
    last_progress: u8,
}

impl ProgressSender {
    /// Send an intermediate event
    ///
    /// Progress never goes backwards and never reaches 100 here; 100 is
    /// reserved for the terminal event.
    pub async fn emit(
        &mut self,
        progress: u8,
        status: impl Into<String>,
    ) -> Result<(), ChannelClosed> {
        let progress = progress.clamp(self.last_progress, 99);
        self.last_progress = progress;
        self.tx
            .send(ProgressEvent::step(progress, status))
            .await
            .map_err(|_| ChannelClosed)
    }

    /// Send the terminal event and close the channel
    pub async fn finish(self, mut event: ProgressEvent) -> Result<(), ChannelClosed> {
        event.progress = 100;
        self.tx.send(event).await.map_err(|_| ChannelClosed)
    }

    /// Whether the receiver has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the receiver has gone away
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let (mut tx, rx) = channel(8);
        tx.emit(30, "a").await.unwrap();
        tx.emit(10, "b").await.unwrap();
        tx.emit(100, "c").await.unwrap();
        tx.finish(ProgressEvent::step(5, "done")).await.unwrap();

        let progress: Vec<u8> = rx.map(|e| e.progress).collect().await;
        assert_eq!(progress, vec![30, 30, 99, 100]);
    }

    #[tokio::test]
    async fn test_finish_closes_stream() {
        let (tx, rx) = channel(4);
        tx.finish(ProgressEvent::failed(&GenerationError::NoContentFound))
            .await
            .unwrap();

        let events: Vec<_> = rx.collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, STATUS_ERROR);
        assert_eq!(events[0].error_kind.as_deref(), Some("NO_CONTENT_FOUND"));
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_observed() {
        let (mut tx, rx) = channel(4);
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.emit(10, "x").await, Err(ChannelClosed));
    }

    #[tokio::test]
    async fn test_rejected_stream_has_single_event() {
        let events: Vec<_> = rejected(&GenerationError::Unauthenticated).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].progress, 100);
        assert_eq!(
            events[0].error.as_deref(),
            Some("You must be logged in to generate a meme.")
        );
    }

    #[test]
    fn test_frame_format() {
        let frame = ProgressEvent::step(25, "News article found").to_frame().unwrap();
        assert_eq!(frame, "data: {\"progress\":25,\"status\":\"News article found\"}\n\n");
    }

    #[test]
    fn test_failed_event_carries_rate_limit() {
        let err = GenerationError::AdmissionDenied(RateInfo::from_usage(6, 6));
        let event = ProgressEvent::failed(&err);
        assert!(event.is_terminal());
        assert_eq!(event.rate_limit.unwrap().remaining, 0);
    }
}
