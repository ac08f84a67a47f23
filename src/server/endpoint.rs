//! Accept loop and request routing for the lookup endpoint

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};

use crate::core::search::{SearchError, SearchRequest, SearchResult, SearchService};

use super::protocol::{read_request, HttpRequest, HttpResponse, ProtocolError, ResponseBody};

/// How long a client gets to send a complete request
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a connection needs to answer a lookup
#[derive(Clone)]
pub struct Endpoint {
    service: SearchService,
    workspace: Option<PathBuf>,
    timeout: Option<Duration>,
    read_timeout: Duration,
    // Held for the whole blocking scan, even past a 504
    scan_lock: Arc<Mutex<()>>,
}

impl Endpoint {
    pub fn new(service: SearchService, workspace: Option<PathBuf>) -> Self {
        Self {
            service,
            workspace,
            timeout: None,
            read_timeout: READ_TIMEOUT,
            scan_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        match (request.method.as_str(), request.path.as_str()) {
            ("OPTIONS", _) => HttpResponse::empty(200),
            ("POST", "/") => self.lookup(&request.body).await,
            (method, path) => {
                tracing::debug!(method, path, "no route");
                HttpResponse::error(404, "not found")
            }
        }
    }

    async fn lookup(&self, body: &[u8]) -> HttpResponse {
        let request: SearchRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(err) => {
                return HttpResponse::error(400, format!("Invalid request body: {}", err));
            }
        };
        tracing::info!(regex = %request.regex, file_types = ?request.file_types, "lookup");

        let service = self.service.clone();
        let workspace = self.workspace.clone();
        let scan_lock = Arc::clone(&self.scan_lock);
        let scan = async move {
            let permit = scan_lock.lock_owned().await;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                service.search(&request, workspace.as_deref())
            })
            .await
        };

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, scan).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(timeout_ms = limit.as_millis() as u64, "lookup timed out");
                    return HttpResponse::error(
                        504,
                        format!("Search did not finish within {}ms", limit.as_millis()),
                    );
                }
            },
            None => scan.await,
        };

        match joined {
            Ok(Ok(SearchResult::Found(location))) => {
                tracing::info!(location = %location, "match found");
                HttpResponse::json(
                    200,
                    ResponseBody::Success {
                        path: location.to_string(),
                    },
                )
            }
            Ok(Ok(SearchResult::NotFound)) => {
                tracing::info!("no match");
                HttpResponse::json(200, ResponseBody::NotFound)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "lookup failed");
                HttpResponse::error(status_for(&err), err.to_string())
            }
            Err(err) => {
                tracing::error!(error = %err, "search task panicked");
                HttpResponse::error(500, "Search failed unexpectedly")
            }
        }
    }

    /// Serve exactly one request on `stream`, then close it.
    pub async fn serve_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        let (read_half, mut write_half) = stream.split();
        let mut reader = BufReader::new(read_half);

        let read = tokio::time::timeout(self.read_timeout, read_request(&mut reader)).await;
        let response = match read {
            Ok(Ok(request)) => self.handle(request).await,
            Ok(Err(ProtocolError::BodyTooLarge)) => {
                HttpResponse::error(413, ProtocolError::BodyTooLarge.to_string())
            }
            Ok(Err(err @ ProtocolError::Malformed(_))) => {
                HttpResponse::error(400, err.to_string())
            }
            Ok(Err(ProtocolError::Io(err))) => return Err(err),
            Err(_) => {
                tracing::debug!(
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "client did not send a complete request"
                );
                HttpResponse::error(408, "Request not received in time")
            }
        };

        write_half.write_all(&response.to_bytes()).await?;
        write_half.shutdown().await?;
        Ok(())
    }
}

fn status_for(err: &SearchError) -> u16 {
    match err {
        SearchError::InvalidRequest(_) | SearchError::InvalidPattern(_) => 400,
        SearchError::NoWorkspace => 503,
        SearchError::Enumerate(_) => 500,
    }
}

/// Accept connections until `shutdown` flips or its sender goes away.
///
/// Each connection is served on its own task, so the loop exits as soon as
/// the signal arrives. Connections already accepted finish on their own.
pub async fn run(listener: TcpListener, endpoint: Endpoint, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "connection accepted");
                    let endpoint = endpoint.clone();
                    tokio::spawn(async move {
                        if let Err(err) = endpoint.serve_connection(stream).await {
                            tracing::warn!(%peer, error = %err, "connection failed");
                        }
                    });
                }
                Err(err) => tracing::warn!(error = %err, "accept failed"),
            },
        }
    }
    tracing::debug!("accept loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::FileSource;
    use crate::core::search::tests::FakeFiles;
    use std::sync::atomic::Ordering;
    use tokio::io::AsyncReadExt;

    fn endpoint(files: FakeFiles) -> (Endpoint, Arc<FakeFiles>) {
        let files = Arc::new(files);
        let service = SearchService::new(files.clone());
        (
            Endpoint::new(service, Some(PathBuf::from("/project"))),
            files,
        )
    }

    fn post(body: &str) -> HttpRequest {
        HttpRequest {
            method: "POST".to_string(),
            path: "/".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let (endpoint, _) = endpoint(FakeFiles::default());
        let response = endpoint
            .handle(HttpRequest {
                method: "OPTIONS".to_string(),
                path: "/".to_string(),
                body: Vec::new(),
            })
            .await;
        assert_eq!(response, HttpResponse::empty(200));
    }

    #[tokio::test]
    async fn test_post_success() {
        let (endpoint, _) = endpoint(
            FakeFiles::default().with("src/App.tsx", "\n\nconst X = <Foo onClick={...} />"),
        );

        let response = endpoint
            .handle(post(r#"{"regex":"Foo","fileTypes":["tsx"]}"#))
            .await;
        assert_eq!(
            response,
            HttpResponse::json(
                200,
                ResponseBody::Success {
                    path: "/project/src/App.tsx:3:12".to_string()
                }
            )
        );
    }

    #[tokio::test]
    async fn test_post_not_found() {
        let (endpoint, _) = endpoint(FakeFiles::default().with("index.html", "<body></body>"));

        let response = endpoint
            .handle(post(r#"{"regex":"Sidebar","fileTypes":["html"]}"#))
            .await;
        assert_eq!(response, HttpResponse::json(200, ResponseBody::NotFound));
    }

    #[tokio::test]
    async fn test_missing_file_types_is_bad_request_without_scan() {
        let (endpoint, files) = endpoint(FakeFiles::default().with("App.tsx", "<Foo />"));

        let response = endpoint.handle(post(r#"{"regex":"Foo"}"#)).await;
        assert_eq!(response.status, 400);
        assert!(matches!(
            response.body,
            Some(ResponseBody::Error { ref message }) if message.contains("fileTypes")
        ));
        assert_eq!(files.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let (endpoint, _) = endpoint(FakeFiles::default());

        for body in [
            "",
            "Foo",
            r#"{"fileTypes":["tsx"]}"#,
            r#"{"regex":42,"fileTypes":["tsx"]}"#,
            r#"{"regex":"Foo","fileTypes":"tsx"}"#,
            r#"{"regex":"Foo","fileTypes":[]}"#,
        ] {
            let response = endpoint.handle(post(body)).await;
            assert_eq!(response.status, 400, "{body}");
        }
    }

    #[tokio::test]
    async fn test_invalid_regex_is_bad_request() {
        let (endpoint, files) = endpoint(FakeFiles::default().with("App.tsx", "<Foo />"));

        let response = endpoint
            .handle(post(r#"{"regex":"[unclosed","fileTypes":["tsx"]}"#))
            .await;
        assert_eq!(response.status, 400);
        assert_eq!(files.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_workspace_is_service_unavailable() {
        let service = SearchService::new(Arc::new(FakeFiles::default()));
        let endpoint = Endpoint::new(service, None);

        let response = endpoint
            .handle(post(r#"{"regex":"Foo","fileTypes":["tsx"]}"#))
            .await;
        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (endpoint, _) = endpoint(FakeFiles::default());
        let response = endpoint
            .handle(HttpRequest {
                method: "GET".to_string(),
                path: "/".to_string(),
                body: Vec::new(),
            })
            .await;
        assert_eq!(response.status, 404);
    }

    struct SlowFiles;

    impl FileSource for SlowFiles {
        fn list_files(&self, _root: &Path, _extensions: &[String]) -> io::Result<Vec<PathBuf>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Vec::new())
        }

        fn read_to_string(&self, _path: &Path) -> io::Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let endpoint = Endpoint::new(
            SearchService::new(Arc::new(SlowFiles)),
            Some(PathBuf::from("/project")),
        )
        .with_timeout(Some(Duration::from_millis(20)));

        let response = endpoint
            .handle(post(r#"{"regex":"Foo","fileTypes":["tsx"]}"#))
            .await;
        assert_eq!(response.status, 504);
    }

    #[tokio::test]
    async fn test_round_trip_over_tcp() {
        let (endpoint, _) = endpoint(FakeFiles::default().with("App.jsx", "<Foo />"));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(listener, endpoint, rx));

        let body = r#"{"regex":"Foo","fileTypes":["jsx"]}"#;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                format!(
                    "POST / HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    addr,
                    body.len(),
                    body
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();

        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.contains("Access-Control-Allow-Origin: *"));
        assert!(reply.ends_with(r#"{"status":"success","path":"/project/App.jsx:1:2"}"#));

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_body_over_tcp() {
        let (endpoint, _) = endpoint(FakeFiles::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(listener, endpoint, rx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST / HTTP/1.1\r\nContent-Length: 99999999\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 413 "));

        drop(tx);
        task.await.unwrap();
    }

    async fn request_over_tcp(addr: std::net::SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        reply
    }

    fn lookup_bytes(body: &str) -> Vec<u8> {
        format!(
            "POST / HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_others() {
        let (endpoint, _) = endpoint(FakeFiles::default().with("App.tsx", "<Foo />"));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(listener, endpoint, rx));

        let idle = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let reply = tokio::time::timeout(
            Duration::from_secs(3),
            request_over_tcp(addr, &lookup_bytes(r#"{"regex":"Foo","fileTypes":["tsx"]}"#)),
        )
        .await
        .expect("second client should be answered");
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(3), task)
            .await
            .expect("accept loop should exit")
            .unwrap();
        drop(idle);
    }

    #[tokio::test]
    async fn test_incomplete_request_times_out() {
        let (endpoint, files) = endpoint(FakeFiles::default().with("App.tsx", "<Foo />"));
        let endpoint = endpoint.with_read_timeout(Duration::from_millis(50));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(listener, endpoint, rx));

        // Headers never finish
        let reply = request_over_tcp(addr, b"POST / HTTP/1.1\r\nHost: localhost\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 408 "));

        // Body shorter than announced
        let reply = request_over_tcp(
            addr,
            b"POST / HTTP/1.1\r\nContent-Length: 64\r\n\r\n{\"regex\":\"Foo\"",
        )
        .await;
        assert!(reply.starts_with("HTTP/1.1 408 "));
        assert!(reply.contains("Access-Control-Allow-Origin: *"));
        assert_eq!(files.list_calls.load(Ordering::SeqCst), 0);

        tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_scans_run_one_at_a_time() {
        let endpoint = Endpoint::new(
            SearchService::new(Arc::new(SlowFiles)),
            Some(PathBuf::from("/project")),
        );

        let started = std::time::Instant::now();
        let body = r#"{"regex":"Foo","fileTypes":["tsx"]}"#;
        let (a, b) = tokio::join!(endpoint.handle(post(body)), endpoint.handle(post(body)));
        assert_eq!(a.status, 200);
        assert_eq!(b.status, 200);
        assert!(started.elapsed() >= Duration::from_millis(600));
    }
}
