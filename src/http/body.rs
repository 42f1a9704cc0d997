//! Response body types
//!
//! Fixed bodies (`Full`) and streamed bodies share one boxed type so handlers
//! can return either.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Body, Bytes};

/// Body type of every response produced by the server
pub type ResponseBody = BoxBody<Bytes, std::io::Error>;

/// Body with no bytes (304, HEAD, 416)
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Body holding a fixed buffer
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Body fed chunk by chunk from another task
pub fn streamed<B>(body: B) -> ResponseBody
where
    B: Body<Data = Bytes, Error = std::io::Error> + Send + Sync + 'static,
{
    body.boxed()
}
