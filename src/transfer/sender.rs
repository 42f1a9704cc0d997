//! File sender
//!
//! Ties the pieces together: validator, conditional check, Range parsing and
//! framing happen in [`FileSender::prepare`], which is pure; streaming happens
//! in [`FileSender::transmit`].

use std::path::Path;

use chrono::{DateTime, Utc};
use hyper::header::{HeaderMap, HeaderName, IF_NONE_MATCH, RANGE};
use hyper::StatusCode;
use tokio::io::{AsyncRead, AsyncSeek};

use super::resource::ResourceDescriptor;
use super::streamer::{stream_interval, ChunkSink, LivenessProbe, TransferReport};
use super::throttle::ThrottlePolicy;
use crate::error::SendError;
use crate::http::cache::{self, Validator};
use crate::http::response::{self, EntityHeaders, ResponseHead};
use crate::http::{ByteInterval, RangeOutcome};
use crate::logger;

/// Per-transmission settings
#[derive(Debug, Clone, PartialEq)]
pub struct SendOptions {
    /// Filename suggested to the client, defaults to the file's basename
    pub disposition: Option<String>,
    /// Emit `Content-Disposition` at all
    pub with_disposition: bool,
    /// Overrides the detected content type
    pub content_type: Option<String>,
    pub throttle: ThrottlePolicy,
    /// Seconds until the response expires, `None` forces revalidation
    pub expires_secs: Option<i64>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            disposition: None,
            with_disposition: true,
            content_type: None,
            throttle: ThrottlePolicy::default(),
            expires_secs: None,
        }
    }
}

impl SendOptions {
    #[must_use]
    pub fn with_content_disposition(mut self, filename: impl Into<String>) -> Self {
        self.disposition = Some(filename.into());
        self
    }

    #[must_use]
    pub const fn without_disposition(mut self) -> Self {
        self.with_disposition = false;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub const fn with_throttle(mut self, throttle: ThrottlePolicy) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub const fn with_expires(mut self, secs: i64) -> Self {
        self.expires_secs = Some(secs);
        self
    }
}

/// Request headers the sender looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConditions {
    pub if_none_match: Option<String>,
    pub range: Option<String>,
}

impl RequestConditions {
    /// Extract `If-None-Match` and `Range`, ignoring non-ASCII values
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            if_none_match: get(IF_NONE_MATCH),
            range: get(RANGE),
        }
    }
}

/// Decision for one request: what to answer, and which bytes follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionPlan {
    pub head: ResponseHead,
    /// Bytes to stream after the head, `None` when the response has no body
    pub interval: Option<ByteInterval>,
    pub validator: Validator,
}

impl TransmissionPlan {
    pub const fn status(&self) -> StatusCode {
        self.head.status
    }
}

/// Sends files with conditional, Range and throttling support
#[derive(Debug, Clone, Default)]
pub struct FileSender {
    options: SendOptions,
}

impl FileSender {
    pub const fn new(options: SendOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &SendOptions {
        &self.options
    }

    /// Decide status, headers and byte interval for a request
    pub fn prepare(
        &self,
        resource: &ResourceDescriptor,
        conditions: &RequestConditions,
        now: DateTime<Utc>,
    ) -> TransmissionPlan {
        let size = resource.size();
        let validator = cache::generate_validator(&resource.identity(), size, resource.modified());

        if cache::check_etag_match(conditions.if_none_match.as_deref(), &validator) {
            return TransmissionPlan {
                head: response::frame_not_modified(&validator),
                interval: None,
                validator,
            };
        }

        let range = match crate::http::parse_range_header(conditions.range.as_deref(), size) {
            RangeOutcome::NotSatisfiable => {
                return TransmissionPlan {
                    head: response::frame_not_satisfiable(&validator, size),
                    interval: None,
                    validator,
                };
            }
            RangeOutcome::Partial(interval) => Some(interval),
            RangeOutcome::Full => None,
        };

        let entity = EntityHeaders {
            disposition: self.disposition_filename(resource),
            content_type: self
                .options
                .content_type
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| resource.content_type()),
            expires: cache::expires_header(self.options.expires_secs, now),
        };

        TransmissionPlan {
            head: response::frame_content(&validator, &entity, size, range),
            interval: range.or_else(|| ByteInterval::full(size)),
            validator,
        }
    }

    /// Open the file and stream `interval` to the sink
    pub async fn transmit<S, P>(
        &self,
        resource: &ResourceDescriptor,
        interval: ByteInterval,
        sink: &mut S,
        probe: &P,
    ) -> Result<TransferReport, SendError>
    where
        S: ChunkSink,
        P: LivenessProbe + ?Sized,
    {
        let file = resource.open().await?;
        self.transmit_from(resource.path(), file, interval, sink, probe).await
    }

    /// Stream `interval` out of an already opened `reader`
    ///
    /// The reader is owned and closed before this returns, whatever the outcome.
    pub async fn transmit_from<R, S, P>(
        &self,
        path: &Path,
        mut reader: R,
        interval: ByteInterval,
        sink: &mut S,
        probe: &P,
    ) -> Result<TransferReport, SendError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
        S: ChunkSink,
        P: LivenessProbe + ?Sized,
    {
        let throttle = &self.options.throttle;
        let streamed = stream_interval(&mut reader, interval, throttle, sink, probe).await;
        drop(reader);
        let report = streamed?;
        logger::log_transfer_finished(path, interval, &report);
        Ok(report)
    }

    /// Full flow for one request
    ///
    /// Probes the file, hands the head to `emit_head` and streams the body.
    /// Nothing is emitted when the file is not readable.
    pub async fn send<S, P, H>(
        &self,
        path: impl AsRef<std::path::Path>,
        conditions: &RequestConditions,
        emit_head: H,
        sink: &mut S,
        probe: &P,
    ) -> Result<Option<TransferReport>, SendError>
    where
        S: ChunkSink,
        P: LivenessProbe + ?Sized,
        H: FnOnce(ResponseHead),
    {
        let resource = ResourceDescriptor::probe(path).await?;
        let plan = self.prepare(&resource, conditions, Utc::now());
        let interval = plan.interval;
        emit_head(plan.head);

        match interval {
            Some(interval) => self.transmit(&resource, interval, sink, probe).await.map(Some),
            None => Ok(None),
        }
    }

    fn disposition_filename<'a>(&'a self, resource: &'a ResourceDescriptor) -> Option<&'a str> {
        if !self.options.with_disposition {
            return None;
        }
        self.options
            .disposition
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| resource.basename())
    }
}
