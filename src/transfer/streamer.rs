//! Throttled streamer
//!
//! Copies one byte interval from a seekable reader to a sink, chunk by chunk,
//! pausing after every chunk. Before each chunk the liveness probe is asked
//! whether the peer is still there, so a disconnect stops the loop within one
//! cycle and releases the reader.

use std::future::Future;
use std::io::{self, SeekFrom};

use hyper::body::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use super::throttle::ThrottlePolicy;
use crate::http::ByteInterval;

/// Destination of streamed chunks
pub trait ChunkSink {
    /// Write one chunk and flush it towards the peer
    fn write_chunk(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send;
}

/// Reports whether the peer is still connected
pub trait LivenessProbe {
    fn is_connected(&self) -> bool;
}

impl<F> LivenessProbe for F
where
    F: Fn() -> bool,
{
    fn is_connected(&self) -> bool {
        self()
    }
}

/// Probe for sinks without a notion of disconnect (files, buffers)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl LivenessProbe for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}

/// Sink over any tokio writer, flushing after each chunk
#[derive(Debug)]
pub struct WriterSink<W>(pub W);

impl<W> WriterSink<W> {
    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W> ChunkSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn write_chunk(&mut self, chunk: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            self.0.write_all(&chunk).await?;
            self.0.flush().await
        }
    }
}

/// How a transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The whole interval was sent
    Completed,
    /// The file ended before the interval did
    EndOfFile,
    /// The probe reported a dead peer or the sink was closed
    Disconnected,
}

/// Result of one transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes_sent: u64,
    pub chunks: u64,
    pub outcome: TransferOutcome,
}

/// Stream `interval` from `reader` to `sink`, paced by `policy`
///
/// Never reads past `interval.end()`. The delay follows every chunk,
/// including the last one.
pub async fn stream_interval<R, S, P>(
    reader: &mut R,
    interval: ByteInterval,
    policy: &ThrottlePolicy,
    sink: &mut S,
    probe: &P,
) -> io::Result<TransferReport>
where
    R: AsyncRead + AsyncSeek + Unpin,
    S: ChunkSink,
    P: LivenessProbe + ?Sized,
{
    reader.seek(SeekFrom::Start(interval.start())).await?;

    let buf_len = usize::try_from(interval.len()).map_or(policy.chunk_bytes(), |len| {
        len.min(policy.chunk_bytes())
    });
    let mut buf = vec![0u8; buf_len];

    let mut offset = interval.start();
    let mut report = TransferReport {
        bytes_sent: 0,
        chunks: 0,
        outcome: TransferOutcome::Completed,
    };

    while offset <= interval.end() {
        if !probe.is_connected() {
            report.outcome = TransferOutcome::Disconnected;
            break;
        }

        let remaining = interval.end() - offset + 1;
        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = read_chunk(reader, &mut buf[..want]).await?;
        if n == 0 {
            report.outcome = TransferOutcome::EndOfFile;
            break;
        }

        match sink.write_chunk(Bytes::copy_from_slice(&buf[..n])).await {
            Ok(()) => {}
            Err(e) if is_disconnect(&e) => {
                report.outcome = TransferOutcome::Disconnected;
                break;
            }
            Err(e) => return Err(e),
        }

        report.bytes_sent += n as u64;
        report.chunks += 1;
        offset += n as u64;

        if !policy.delay().is_zero() {
            tokio::time::sleep(policy.delay()).await;
        }
    }

    Ok(report)
}

/// Fill `buf` from the reader, stopping early only at end of file
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}
