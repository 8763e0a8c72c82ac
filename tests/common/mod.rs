//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;

use body_pipeline::config::AppConfig;
use body_pipeline::{BodyLimit, HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Config with uploads spooled to `upload_dir`.
pub fn config(limit: BodyLimit, upload_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.body.max_length = limit;
    config.body.upload_dir = Some(upload_dir.to_path_buf());
    config
}

/// Start a server on an ephemeral port. Trigger the returned handle to stop it.
#[allow(dead_code)]
pub async fn start_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

/// Build a multipart body from `(headers, content)` parts.
#[allow(dead_code)]
pub fn multipart_body(boundary: &str, parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (headers, content) in parts {
        out.extend_from_slice(format!("--{}\r\n{}\r\n\r\n", boundary, headers).as_bytes());
        out.extend_from_slice(content);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    out
}

/// Number of entries in `dir`.
#[allow(dead_code)]
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
