//! File serving module
//!
//! Turns a resolved file path into a response: head from the sender's plan,
//! body streamed by a spawned task through a response channel.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use hyper::{Response, StatusCode};

use crate::error::SendError;
use crate::handler::router::RequestContext;
use crate::http::{self, body, ResponseBody};
use crate::logger;
use crate::transfer::{FileSender, ResourceDescriptor, ResponseChannel};

/// Serve one file with the route's sender
pub async fn serve_file(
    ctx: &RequestContext<'_>,
    sender: &FileSender,
    path: &Path,
) -> Response<ResponseBody> {
    let resource = match ResourceDescriptor::probe(path).await {
        Ok(resource) => resource,
        Err(err) => return not_readable_response(&err),
    };

    let plan = sender.prepare(&resource, &ctx.conditions, Utc::now());
    if plan.status() == StatusCode::NOT_MODIFIED {
        logger::log_not_modified(resource.path());
    } else if plan.status() == StatusCode::RANGE_NOT_SATISFIABLE {
        logger::log_range_not_satisfiable(
            resource.path(),
            ctx.conditions.range.as_deref(),
            resource.size(),
        );
    }

    let interval = match plan.interval {
        Some(interval) if !ctx.is_head => interval,
        _ => return plan.head.into_response(body::empty()),
    };

    let (mut sink, channel_body) = ResponseChannel::acquire();
    let sender = sender.clone();
    logger::log_transfer_started(resource.path(), interval, resource.size());

    tokio::spawn(async move {
        let probe = sink.probe();
        if let Err(err) = sender.transmit(&resource, interval, &mut sink, &probe).await {
            logger::log_transfer_failed(resource.path(), &err);
            sink.abort(io::Error::new(err.io_kind(), err.to_string())).await;
        }
    });

    plan.head.into_response(body::streamed(channel_body))
}

/// Resolve `relative` below `root`, refusing anything that escapes it
///
/// Symlinks are followed before the check, so a link pointing outside the
/// root is refused as well.
pub async fn confine(root: &Path, relative: &str) -> Option<PathBuf> {
    let root_canonical = match tokio::fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    // Missing files are common (404), no need to log them
    let candidate = tokio::fs::canonicalize(root.join(relative)).await.ok()?;
    if candidate.starts_with(&root_canonical) {
        Some(candidate)
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative} -> {}",
            candidate.display()
        ));
        None
    }
}

fn not_readable_response(err: &SendError) -> Response<ResponseBody> {
    if err.io_kind() == io::ErrorKind::PermissionDenied {
        logger::log_warning(&err.to_string());
        http::build_403_response()
    } else {
        logger::log_debug(&err.to_string());
        http::build_404_response()
    }
}
