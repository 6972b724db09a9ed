//! Local HTTP server with live reload.
//!
//! Serves the source tree (dev) or the finished build (build mode) on a
//! local port. Auxiliary URL prefixes are rewritten to directories outside
//! the served root (vendor libraries, the temp dir with compiled CSS).
//!
//! Live reload rides on an SSE channel: HTML responses get a small client
//! script injected which subscribes to `/__sitesmith/events`; stylesheet
//! rebuilds swap CSS in place, anything else triggers a full page reload.
//! In dev mode a watcher thread feeds the reload channel via the watch
//! dispatcher loop.

use crate::pipeline::{registry, PipelineContext};
use crate::watch::{self, ReloadKind};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// URL prefix for the tool's own endpoints.
const INTERNAL_PREFIX: &str = "/__sitesmith";

/// The live-reload client, served at `/__sitesmith/client.js`.
const CLIENT_JS: &str = r#"(function () {
  "use strict";
  var source = new EventSource("/__sitesmith/events");
  source.addEventListener("css", function () {
    var links = document.querySelectorAll("link[rel=stylesheet]");
    links.forEach(function (link) {
      var href = link.getAttribute("href").split("?")[0];
      link.setAttribute("href", href + "?t=" + Date.now());
    });
  });
  source.addEventListener("reload", function () {
    location.reload();
  });
})();
"#;

/// Which tree the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServeEnv {
    /// Serve the source tree with route rewrites and watchers
    Dev,
    /// Serve the finished build directory
    Build,
}

/// Options for the serve loop.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Dev or build environment
    pub env: ServeEnv,
    /// Port to bind (overrides config when set)
    pub port: Option<u16>,
    /// Whether to push live-reload notifications
    pub live_reload: bool,
}

/// Error starting or running the server.
#[derive(Debug)]
pub enum ServeError {
    /// Could not bind the listen address
    Bind(SocketAddr, std::io::Error),
    /// Runtime construction failed
    Runtime(std::io::Error),
    /// Server terminated with an error
    Server(std::io::Error),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
            ServeError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            ServeError::Server(e) => write!(f, "Server error: {}", e),
        }
    }
}

impl std::error::Error for ServeError {}

/// Shared server state.
#[derive(Clone)]
struct ServerState {
    /// Directory served at `/`
    root: PathBuf,
    /// Route rewrites, longest prefix first, resolved to absolute dirs
    routes: Vec<(String, PathBuf)>,
    /// Live-reload broadcast channel
    reload_tx: broadcast::Sender<ReloadKind>,
    /// Whether to inject the client script into HTML responses
    live_reload: bool,
}

/// Run the serve loop. Blocks until Ctrl+C.
///
/// In dev mode a watcher thread is registered over the source tree; its
/// successful rebuilds are pushed to connected clients. Stopping the loop
/// closes open connections; an in-flight rebuild finishes on its thread.
pub fn serve(ctx: &PipelineContext, options: &ServeOptions) -> Result<(), ServeError> {
    let root = match options.env {
        ServeEnv::Dev => ctx.src_dir(),
        ServeEnv::Build => ctx.build_dir(),
    };

    let mut routes: Vec<(String, PathBuf)> = ctx
        .config()
        .serve
        .routes
        .iter()
        .map(|(prefix, dir)| (prefix.clone(), ctx.resolve_path(dir)))
        .collect();
    routes.sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));

    let (reload_tx, _) = broadcast::channel(16);
    let state = ServerState {
        root: root.clone(),
        routes,
        reload_tx: reload_tx.clone(),
        live_reload: options.live_reload,
    };

    // Watchers only make sense against the source tree
    if options.env == ServeEnv::Dev {
        let watch_ctx = ctx.clone();
        let tx = reload_tx;
        std::thread::spawn(move || {
            let plan = registry::create_task_plan();
            let result = watch::watch_and_rebuild(&watch_ctx, &plan, |kind| {
                // No subscribers is fine; send only fails when nobody listens
                let _ = tx.send(kind);
            });
            if let Err(e) = result {
                eprintln!("Watch loop stopped: {}", e);
            }
        });
    }

    let port = options.port.unwrap_or(ctx.config().serve.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let runtime = tokio::runtime::Runtime::new().map_err(ServeError::Runtime)?;
    runtime.block_on(async {
        let app = Router::new()
            .route(&format!("{}/events", INTERNAL_PREFIX), get(reload_events))
            .route(&format!("{}/client.js", INTERNAL_PREFIX), get(client_js))
            .fallback(serve_file)
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServeError::Bind(addr, e))?;
        println!("Serving {} on http://{}", root.display(), addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                println!("\nShutting down");
            })
            .await
            .map_err(ServeError::Server)
    })
}

/// SSE stream of reload notifications.
async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(kind) => {
                    let name = match kind {
                        ReloadKind::RefreshCss => "css",
                        ReloadKind::FullReload => "reload",
                    };
                    yield Ok(SseEvent::default().event(name).data("change"));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Serve the live-reload client script.
async fn client_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

/// Static file fallback with route rewrites.
async fn serve_file(State(state): State<ServerState>, uri: Uri) -> Response {
    let path = uri.path();

    let Some(file) = resolve_request(&state.root, &state.routes, path) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    match tokio::fs::read(&file).await {
        Ok(contents) => {
            let content_type = content_type_for(&file);
            if state.live_reload && content_type == "text/html" {
                let html = String::from_utf8_lossy(&contents);
                let injected = inject_client_script(&html);
                return ([(header::CONTENT_TYPE, content_type)], injected).into_response();
            }
            ([(header::CONTENT_TYPE, content_type)], contents).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, format!("Not found: {}", path)).into_response(),
    }
}

/// Resolve a request path to a file on disk.
///
/// Returns `None` for traversal attempts. Route rewrites win over the
/// served root (longest prefix first); directories resolve to their
/// `index.html`.
fn resolve_request(root: &Path, routes: &[(String, PathBuf)], path: &str) -> Option<PathBuf> {
    if path.split('/').any(|segment| segment == "..") {
        return None;
    }

    let mut file = None;
    for (prefix, dir) in routes {
        if let Some(rest) = path.strip_prefix(prefix.as_str()) {
            // Prefixes match on path-segment boundaries only
            if !rest.is_empty() && !rest.starts_with('/') {
                continue;
            }
            file = Some(dir.join(rest.trim_start_matches('/')));
            break;
        }
    }
    let mut file = file.unwrap_or_else(|| root.join(path.trim_start_matches('/')));

    if file.is_dir() || path.ends_with('/') || path == "/" {
        file = file.join("index.html");
    }

    Some(file)
}

/// Inject the live-reload client before `</body>` (or append).
fn inject_client_script(html: &str) -> String {
    let snippet = format!("<script src=\"{}/client.js\"></script>", INTERNAL_PREFIX);

    if let Some(pos) = html.rfind("</body>") {
        let mut injected = String::with_capacity(html.len() + snippet.len());
        injected.push_str(&html[..pos]);
        injected.push_str(&snippet);
        injected.push('\n');
        injected.push_str(&html[pos..]);
        injected
    } else {
        format!("{}\n{}", html, snippet)
    }
}

/// Content type from a file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
