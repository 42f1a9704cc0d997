//! Response channel
//!
//! One channel is acquired per transmission. It has a single slot, so at most
//! one chunk waits between the streamer and hyper: nothing buffers or
//! re-encodes the paced output, and back-pressure from a slow client reaches
//! the streamer directly.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::{Body, Bytes, Frame};
use tokio::sync::mpsc;

use super::streamer::{ChunkSink, LivenessProbe};

type Item = io::Result<Bytes>;

/// Capability handing out the two ends of an unbuffered response body
pub struct ResponseChannel;

impl ResponseChannel {
    /// Create the sink the streamer writes to and the body hyper reads from
    pub fn acquire() -> (ChannelSink, ChannelBody) {
        let (tx, rx) = mpsc::channel(1);
        (ChannelSink { tx }, ChannelBody { rx })
    }
}

/// Writing end, owned by the streaming task
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Item>,
}

impl ChannelSink {
    /// Probe that reports a disconnect once hyper dropped the body
    pub fn probe(&self) -> ChannelProbe {
        ChannelProbe {
            tx: self.tx.clone(),
        }
    }

    /// End the body with an error; hyper then aborts the connection
    ///
    /// Used when the headers are already out and the transfer cannot start.
    pub async fn abort(self, error: io::Error) {
        // A closed receiver means the peer is gone already
        let _ = self.tx.send(Err(error)).await;
    }
}

impl ChunkSink for ChannelSink {
    fn write_chunk(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            self.tx.send(Ok(chunk)).await.map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped by peer")
            })
        }
    }
}

/// Liveness probe tied to the response body
#[derive(Debug, Clone)]
pub struct ChannelProbe {
    tx: mpsc::Sender<Item>,
}

impl LivenessProbe for ChannelProbe {
    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Reading end, handed to hyper as the response body
#[derive(Debug)]
pub struct ChannelBody {
    rx: mpsc::Receiver<Item>,
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.get_mut()
            .rx
            .poll_recv(cx)
            .map(|item| item.map(|res| res.map(Frame::data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_chunks_reach_body() {
        let (mut sink, body) = ResponseChannel::acquire();
        let writer = tokio::spawn(async move {
            sink.write_chunk(Bytes::from_static(b"hello ")).await.unwrap();
            sink.write_chunk(Bytes::from_static(b"world")).await.unwrap();
        });

        let collected = body.collect().await.unwrap().to_bytes();
        writer.await.unwrap();
        assert_eq!(&collected[..], b"hello world");
    }

    #[tokio::test]
    async fn test_dropped_body_is_a_disconnect() {
        let (mut sink, body) = ResponseChannel::acquire();
        let probe = sink.probe();
        assert!(probe.is_connected());

        drop(body);
        assert!(!probe.is_connected());

        let err = sink.write_chunk(Bytes::from_static(b"x")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_abort_surfaces_as_body_error() {
        let (sink, body) = ResponseChannel::acquire();
        tokio::spawn(sink.abort(io::Error::new(io::ErrorKind::NotFound, "gone")));
        assert!(body.collect().await.is_err());
    }
}
