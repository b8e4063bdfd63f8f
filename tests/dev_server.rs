use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use lambda_dev_server::cache::CacheStore;
use lambda_dev_server::config::{Config, FunctionRouteConfig, StaticFileConfig};
use lambda_dev_server::invoke::{FunctionInvoker, GatewayEvent, GatewayResult, InvocationError};
use lambda_dev_server::routing::RouteRegistry;
use lambda_dev_server::server::{self, RouteSet};

/// Answers `GET /hello` with 200 and anything else with 404, counting calls
#[derive(Default)]
struct CountingInvoker {
    calls: AtomicUsize,
}

impl CountingInvoker {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FunctionInvoker for CountingInvoker {
    async fn invoke(
        &self,
        event: &GatewayEvent,
        _config: &FunctionRouteConfig,
    ) -> Result<GatewayResult, InvocationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let status_code = if event.path == "/hello" { 200 } else { 404 };
        Ok(GatewayResult {
            status_code,
            headers: None,
            body: Some(format!("hi #{n}")),
        })
    }
}

fn function(method: &str, path: &str, local_path: &Path) -> FunctionRouteConfig {
    FunctionRouteConfig {
        http_method: method.to_string(),
        public_path: path.to_string(),
        local_path: local_path.to_string_lossy().into_owned(),
        runtime: None,
        handler: "handler".to_string(),
        timeout_in_seconds: 28,
        environment: HashMap::new(),
        caching_enabled: true,
    }
}

fn route_set(
    functions: Vec<FunctionRouteConfig>,
    static_files: Vec<StaticFileConfig>,
    invoker: Arc<CountingInvoker>,
) -> RouteSet {
    let routes = RouteSet::new(
        functions,
        static_files,
        false,
        Arc::new(RouteRegistry::new(invoker)),
        CacheStore::new(true),
    );
    routes.mount();
    routes
}

async fn get(routes: &RouteSet, uri: &str) -> Response<Full<Bytes>> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap();
    routes.registry().dispatch(req, 1024).await
}

async fn body_text(resp: Response<Full<Bytes>>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_cached_function_invoked_again_after_source_change() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("hello.sh");
    let invoker = Arc::new(CountingInvoker::default());
    let routes = route_set(
        vec![function("GET", "/hello", &source)],
        Vec::new(),
        Arc::clone(&invoker),
    );

    let first = get(&routes, "/hello").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_text(first).await, "hi #1");
    assert_eq!(invoker.calls(), 1);

    let second = get(&routes, "/hello").await;
    assert_eq!(body_text(second).await, "hi #1");
    assert_eq!(invoker.calls(), 1);

    routes.rebuild(&source);

    let third = get(&routes, "/hello").await;
    assert_eq!(body_text(third).await, "hi #2");
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn test_unrelated_change_keeps_cache() {
    let dir = tempfile::tempdir().unwrap();
    let invoker = Arc::new(CountingInvoker::default());
    let routes = route_set(
        vec![function("GET", "/hello", &dir.path().join("hello.sh"))],
        Vec::new(),
        Arc::clone(&invoker),
    );

    get(&routes, "/hello").await;
    routes.rebuild(&dir.path().join("other.sh"));
    get(&routes, "/hello").await;

    assert_eq!(invoker.calls(), 1);
}

#[tokio::test]
async fn test_non_200_results_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let invoker = Arc::new(CountingInvoker::default());
    let routes = route_set(
        vec![function("GET", "/missing", &dir.path().join("missing.sh"))],
        Vec::new(),
        Arc::clone(&invoker),
    );

    assert_eq!(get(&routes, "/missing").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&routes, "/missing").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn test_query_string_is_part_of_cache_key() {
    let dir = tempfile::tempdir().unwrap();
    let invoker = Arc::new(CountingInvoker::default());
    let routes = route_set(
        vec![function("GET", "/hello", &dir.path().join("hello.sh"))],
        Vec::new(),
        Arc::clone(&invoker),
    );

    get(&routes, "/hello?a=1").await;
    get(&routes, "/hello?a=2").await;
    get(&routes, "/hello?a=1").await;

    assert_eq!(invoker.calls(), 2);
}

#[tokio::test]
async fn test_static_index_and_assets() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("app.js"), "console.log(1);").unwrap();
    let index = dir.path().join("index.html");
    std::fs::write(&index, "<h1>home</h1>").unwrap();

    let routes = route_set(
        Vec::new(),
        vec![
            StaticFileConfig::Folder {
                public_path: "/assets/*".to_string(),
                local_path: assets.to_string_lossy().into_owned(),
                cors: None,
                response_headers: HashMap::new(),
            },
            StaticFileConfig::File {
                public_path: "/index.html".to_string(),
                local_path: index.to_string_lossy().into_owned(),
                cors: None,
                response_headers: HashMap::new(),
            },
        ],
        Arc::new(CountingInvoker::default()),
    );

    let resp = get(&routes, "/index.html").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/html");
    assert_eq!(body_text(resp).await, "<h1>home</h1>");

    let resp = get(&routes, "/assets/app.js").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "console.log(1);");

    assert_eq!(get(&routes, "/assets/none.js").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_specific_static_route_wins_over_greedy() {
    let dir = tempfile::tempdir().unwrap();
    let specific = dir.path().join("b.txt");
    let fallback = dir.path().join("fallback.txt");
    std::fs::write(&specific, "specific").unwrap();
    std::fs::write(&fallback, "fallback").unwrap();

    let file = |public_path: &str, local_path: &Path| StaticFileConfig::File {
        public_path: public_path.to_string(),
        local_path: local_path.to_string_lossy().into_owned(),
        cors: None,
        response_headers: HashMap::new(),
    };

    // Declared greedy first; sorting must still put /a/b ahead
    let routes = route_set(
        Vec::new(),
        vec![file("/a/*", &fallback), file("/a/b", &specific)],
        Arc::new(CountingInvoker::default()),
    );

    assert_eq!(body_text(get(&routes, "/a/b").await).await, "specific");
    assert_eq!(body_text(get(&routes, "/a/c").await).await, "fallback");
}

#[tokio::test]
async fn test_remove_all_routes_empties_table() {
    let dir = tempfile::tempdir().unwrap();
    let routes = route_set(
        vec![function("GET", "/hello", &dir.path().join("hello.sh"))],
        Vec::new(),
        Arc::new(CountingInvoker::default()),
    );
    assert_eq!(routes.registry().len(), 1);

    routes.registry().remove_all_routes();
    assert!(routes.registry().is_empty());
    assert_eq!(get(&routes, "/hello").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("hello.sh");
    let toml = format!(
        r#"
[server]
port = 0

[[functions]]
http_method = "GET"
public_path = "/hello"
local_path = "{}"
"#,
        source.display()
    );
    let config = Config::from_toml_str(&toml).unwrap();
    let invoker = Arc::new(CountingInvoker::default());

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let dev_server = server::start(config, Arc::clone(&invoker) as _).unwrap();
            let addr = dev_server.local_addr();
            let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
            let serving = tokio::task::spawn_local(dev_server.run_until(async move {
                let _ = stop_rx.await;
            }));

            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();

            assert!(response.starts_with("HTTP/1.1 200 OK"));
            assert!(response.ends_with("hi #1"));
            assert_eq!(invoker.calls(), 1);

            stop_tx.send(()).unwrap();
            serving.await.unwrap();
        })
        .await;
}
