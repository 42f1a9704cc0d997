//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, and dispatching to the file sender.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::header::{HeaderName, CONTENT_LENGTH, RANGE, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;

use crate::config::{AppState, ResolvedRoute, RouteKind};
use crate::handler::files;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use crate::transfer::RequestConditions;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub conditions: RequestConditions,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    // The request body is never read
    let (parts, _) = req.into_parts();

    let response = match check_http_method(&parts.method) {
        Some(resp) => resp,
        None => {
            let ctx = RequestContext {
                path: parts.uri.path(),
                is_head: parts.method == Method::HEAD,
                conditions: RequestConditions::from_headers(&parts.headers),
            };
            route_request(&ctx, &state.routes).await
        }
    };

    if state.config.logging.access_log {
        log_access(&parts, &response, peer, started, &state.config.logging.access_log_format);
    }
    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Route request based on path and configuration
async fn route_request(
    ctx: &RequestContext<'_>,
    routes: &[ResolvedRoute],
) -> Response<ResponseBody> {
    let Ok(decoded) = percent_decode_str(ctx.path).decode_utf8() else {
        logger::log_debug(&format!("Undecodable request path: {}", ctx.path));
        return http::build_404_response();
    };

    let Some((route, target)) = resolve_route(routes, &decoded) else {
        return http::build_404_response();
    };

    let path = match target {
        Target::File => route.path.clone(),
        Target::BelowDir(relative) => match files::confine(&route.path, relative).await {
            Some(path) => path,
            None => return http::build_404_response(),
        },
    };

    files::serve_file(ctx, &route.sender, &path).await
}

/// Where a matched route points
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    /// The route's own file
    File,
    /// A path relative to the route's directory
    BelowDir(&'a str),
}

/// Exact file routes first, then the longest matching directory prefix
fn resolve_route<'r, 'p>(
    routes: &'r [ResolvedRoute],
    path: &'p str,
) -> Option<(&'r ResolvedRoute, Target<'p>)> {
    if let Some(route) = routes
        .iter()
        .find(|r| r.kind == RouteKind::File && r.url == path)
    {
        return Some((route, Target::File));
    }

    routes
        .iter()
        .filter(|r| r.kind == RouteKind::Dir)
        .filter_map(|r| {
            let prefix = r.url.trim_end_matches('/');
            let rest = path.strip_prefix(prefix)?;
            // Prefix must end on a segment boundary
            if !rest.is_empty() && !rest.starts_with('/') {
                return None;
            }
            Some((prefix.len(), r, rest.trim_start_matches('/')))
        })
        .max_by_key(|(len, _, _)| *len)
        .and_then(|(_, route, relative)| {
            // The directory itself is not a file
            (!relative.is_empty()).then(|| (route, Target::BelowDir(relative)))
        })
}

fn log_access(
    req: &Parts,
    response: &Response<ResponseBody>,
    peer: SocketAddr,
    started: Instant,
    format: &str,
) {
    let header = |name: HeaderName| {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        req.method.to_string(),
        req.uri.path().to_string(),
    );
    entry.http_version = format!("{:?}", req.version)
        .trim_start_matches("HTTP/")
        .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header(RANGE);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, format);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_RANGE, ETAG, IF_NONE_MATCH};
    use hyper::StatusCode;
    use std::path::Path;

    fn content() -> Vec<u8> {
        (0..1000u32).map(|i| (i % 251) as u8).collect()
    }

    /// Temp tree with a file route and a directory route
    fn setup() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("public");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(dir.path().join("data.bin"), content()).unwrap();
        std::fs::write(root.join("sub/notes.txt"), b"hello notes").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        let toml = format!(
            r#"
            [logging]
            access_log = false

            [transfer]
            chunk_bytes = 64
            delay_secs = 0.0

            [[routes]]
            url = "/download"
            type = "file"
            path = '{}'
            disposition = "report.bin"

            [[routes]]
            url = "/files"
            type = "dir"
            path = '{}'
            "#,
            dir.path().join("data.bin").display(),
            root.display(),
        );
        let config: Config = toml.parse().unwrap();
        let state = Arc::new(AppState::new(config).unwrap());
        (dir, state)
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        headers: &[(HeaderName, &str)],
    ) -> Response<ResponseBody> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        handle_request(builder.body(()).unwrap(), Arc::clone(state), peer())
            .await
            .unwrap()
    }

    async fn body_bytes(resp: Response<ResponseBody>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_file_route_full() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/download", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "1000");
        assert_eq!(body_bytes(resp).await, content());
    }

    #[tokio::test]
    async fn test_file_route_range() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/download", &[(RANGE, "bytes=100-199")]).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 100-199/1000");
        assert_eq!(resp.headers()[CONTENT_LENGTH], "100");
        assert_eq!(body_bytes(resp).await, content()[100..200].to_vec());
    }

    #[tokio::test]
    async fn test_range_not_satisfiable() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/download", &[(RANGE, "bytes=5000-")]).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes */1000");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::HEAD, "/download", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "1000");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_modified() {
        let (_dir, state) = setup();
        let first = send(&state, Method::HEAD, "/download", &[]).await;
        let etag = first.headers()[ETAG].to_str().unwrap().to_string();

        let resp = send(&state, Method::GET, "/download", &[(IF_NONE_MATCH, &etag)]).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert!(resp.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(resp.headers()[ETAG], etag.as_str());
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_dir_route() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::GET, "/files/sub/notes.txt", &[]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"hello notes");

        let resp = send(&state, Method::GET, "/files/sub/missing.txt", &[]).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&state, Method::GET, "/files/sub", &[]).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dir_route_blocks_traversal() {
        let (_dir, state) = setup();
        for uri in ["/files/../secret.txt", "/files/%2e%2e/secret.txt"] {
            let resp = send(&state, Method::GET, uri, &[]).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_methods() {
        let (_dir, state) = setup();
        let resp = send(&state, Method::POST, "/download", &[]).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let resp = send(&state, Method::OPTIONS, "/download", &[]).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = send(&state, Method::GET, "/unknown", &[]).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_resolve_route_prefers_longest_prefix() {
        let config: Config = r#"
            [[routes]]
            url = "/files"
            type = "dir"
            path = "/srv/files"

            [[routes]]
            url = "/files/big/"
            type = "dir"
            path = "/srv/big"

            [[routes]]
            url = "/files/big/one.iso"
            type = "file"
            path = "/srv/one.iso"
            "#
        .parse()
        .unwrap();
        let state = AppState::new(config).unwrap();
        let routes = &state.routes;

        let (route, target) = resolve_route(routes, "/files/big/x.iso").unwrap();
        assert_eq!(route.path, Path::new("/srv/big"));
        assert_eq!(target, Target::BelowDir("x.iso"));

        let (route, target) = resolve_route(routes, "/files/big/one.iso").unwrap();
        assert_eq!(route.path, Path::new("/srv/one.iso"));
        assert_eq!(target, Target::File);

        let (route, _) = resolve_route(routes, "/files/bigger.iso").unwrap();
        assert_eq!(route.path, Path::new("/srv/files"));

        assert!(resolve_route(routes, "/filesystem").is_none());
        assert!(resolve_route(routes, "/files/").is_none());
    }
}
