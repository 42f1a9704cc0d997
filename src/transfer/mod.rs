//! Throttled file transmission
//!
//! Everything between "a file and some request headers" and "bytes on the
//! wire": resource metadata, the per-request plan, and the paced streamer.

pub mod channel;
pub mod resource;
pub mod sender;
pub mod streamer;
pub mod throttle;

pub use channel::{ChannelBody, ChannelProbe, ChannelSink, ResponseChannel};
pub use resource::ResourceDescriptor;
pub use sender::{FileSender, RequestConditions, SendOptions, TransmissionPlan};
pub use streamer::{
    stream_interval, AlwaysConnected, ChunkSink, LivenessProbe, TransferOutcome, TransferReport,
    WriterSink,
};
pub use throttle::{ThrottleError, ThrottlePolicy};
