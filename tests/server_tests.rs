//! HTTP surface tests against a live `may_minihttp` listener.

mod common;

use common::fixtures::{list_path, registrations, seeded_catalog};
use common::http::get;
use detectors::pipeline::build_named;
use detectors::server::{AppService, HttpServer, ServerHandle};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

/// Test fixture with automatic teardown
struct GatewayTestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl GatewayTestServer {
    fn new(default_media_type: Option<&str>) -> Self {
        let catalog = seeded_catalog();
        let primary = build_named(&registrations(&catalog, default_media_type), "primary").unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer(AppService::new(Arc::new(primary)))
            .start(addr)
            .unwrap();
        handle.wait_ready().unwrap();
        Self {
            handle: Some(handle),
            addr,
        }
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

#[test]
fn test_health_endpoint() {
    let server = GatewayTestServer::new(Some("application/json"));
    let resp = get(&server.addr, "/health", &[]);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.text(), r#"{"status":"ok"}"#);
}

#[test]
fn test_list_route_over_http() {
    let server = GatewayTestServer::new(Some("application/json"));
    let resp = get(
        &server.addr,
        &list_path("mykey", "/length"),
        &[("Accept", "application/json")],
    );
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.text(), "3");

    let resp = get(&server.addr, &list_path("pair", "/range/string.csv"), &[]);
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.header("content-type"),
        Some("application/vnd+detectors.csv")
    );
    assert_eq!(resp.text(), "A\r\nB\r\n");
}

#[test]
fn test_error_statuses_over_http() {
    let server = GatewayTestServer::new(None);
    let resp = get(
        &server.addr,
        "/api/redis/connection/nope/list/mykey/index/5",
        &[],
    );
    assert_eq!(resp.status, 404);
    assert!(resp.body.is_empty());

    let resp = get(
        &server.addr,
        &list_path("mykey", "/length"),
        &[("Accept", "application/vnd+unknown")],
    );
    assert_eq!(resp.status, 406);

    let resp = get(&server.addr, &list_path("mykey", "/index/x"), &[]);
    assert_eq!(resp.status, 400);

    let resp = get(&server.addr, "/nothing/here", &[]);
    assert_eq!(resp.status, 404);
}

#[test]
fn test_metrics_endpoint() {
    let server = GatewayTestServer::new(Some("application/json"));
    let resp = get(&server.addr, &list_path("mykey", "/length"), &[]);
    assert_eq!(resp.status, 200);
    let resp = get(&server.addr, "/metrics", &[]);
    assert_eq!(resp.status, 200);
    let text = resp.text();
    assert!(text.contains("detectors_requests_total{instance=\"primary\"} 1"), "{text}");
    assert!(text.contains("code=\"200\"} 1"));
}
