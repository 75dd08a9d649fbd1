//! End-to-end tests over real sockets: a browser-shaped client talking to
//! the proxy, with a minimal upstream server behind it.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use typoshield::config::FlaggedMode;
use typoshield::proxy::{ProxyServer, ProxyServerBuilder, ProxyState};
use typoshield::store::WebsiteStore;
use typoshield::telemetry::AuditLogger;

/// Start a proxy on an ephemeral port. Returns its address, shared state,
/// and the shutdown sender keeping it alive.
async fn start_proxy(
    store: Arc<WebsiteStore>,
    mode: FlaggedMode,
    auto_learn: bool,
) -> (std::net::SocketAddr, Arc<ProxyState>, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server: ProxyServer = ProxyServerBuilder::new()
        .listen("127.0.0.1:0".parse().unwrap())
        .store(store)
        .flagged_mode(mode)
        .auto_learn(auto_learn)
        .audit(Arc::new(AuditLogger::new_null()))
        .build(shutdown_rx);

    let state = server.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    (addr, state, shutdown_tx)
}

/// Start a one-shot upstream that answers any request with a fixed body.
async fn start_upstream(body: &'static str) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });

    addr
}

/// Send a raw request and read everything until the server closes.
async fn roundtrip(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("response not completed in time")
        .unwrap();
    String::from_utf8_lossy(&response).to_string()
}

fn store_with_known_hosts() -> Arc<WebsiteStore> {
    let store = Arc::new(WebsiteStore::in_memory());
    store.add_known_host("www.youtube.com");
    store.add_known_host("www.google.com");
    store
}

#[tokio::test]
async fn clean_request_is_forwarded_to_upstream() {
    let upstream = start_upstream("hello from upstream").await;
    let (proxy, _, _shutdown) = start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    let request = format!(
        "GET http://{}/hello HTTP/1.1\r\nHost: {}\r\nAccept: text/html\r\nConnection: close\r\n\r\n",
        upstream, upstream
    );
    let response = roundtrip(proxy, &request).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("hello from upstream"));
}

#[tokio::test]
async fn flagged_navigation_gets_the_warning_interstitial() {
    let (proxy, _, _shutdown) = start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    let request = "GET http://www.youtbe.com/ HTTP/1.1\r\nHost: www.youtbe.com\r\nAccept: text/html\r\nConnection: close\r\n\r\n";
    let response = roundtrip(proxy, request).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("www.youtbe.com"));
    assert!(response.contains("www.youtube.com"));
    assert!(response.contains("text/html"));
}

#[tokio::test]
async fn flagged_navigation_is_403_in_block_mode() {
    let (proxy, _, _shutdown) =
        start_proxy(store_with_known_hosts(), FlaggedMode::Block, true).await;

    let request = "GET http://www.youtbe.com/ HTTP/1.1\r\nHost: www.youtbe.com\r\nAccept: text/html\r\nConnection: close\r\n\r\n";
    let response = roundtrip(proxy, request).await;

    assert!(response.starts_with("HTTP/1.1 403"), "{response}");
}

#[tokio::test]
async fn trust_endpoint_updates_the_registry() {
    let (proxy, state, _shutdown) =
        start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    let request = "GET http://anyhost/__typoshield/trust?host=www.youtbe.com HTTP/1.1\r\nHost: anyhost\r\nAccept: text/html\r\nConnection: close\r\n\r\n";
    let response = roundtrip(proxy, request).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(state.store().is_known_host("www.youtbe.com"));
}

#[tokio::test]
async fn redirect_endpoint_then_redirect_page() {
    let (proxy, state, _shutdown) =
        start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    // Remember the typo through the control endpoint...
    let request = "GET http://anyhost/__typoshield/redirect?typo=www.youtbe.com&origin=www.youtube.com HTTP/1.1\r\nHost: anyhost\r\nConnection: close\r\n\r\n";
    roundtrip(proxy, request).await;
    assert_eq!(
        state.store().typo_redirect("www.youtbe.com"),
        Some("www.youtube.com".to_string())
    );

    // ...then the next visit gets the redirect page instead of a warning.
    let request = "GET http://www.youtbe.com/ HTTP/1.1\r\nHost: www.youtbe.com\r\nAccept: text/html\r\nConnection: close\r\n\r\n";
    let response = roundtrip(proxy, request).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("https://www.youtube.com/"));
}

#[tokio::test]
async fn connect_to_flagged_host_is_refused() {
    let (proxy, _, _shutdown) = start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream
        .write_all(b"CONNECT www.youtbe.com:443 HTTP/1.1\r\nHost: www.youtbe.com:443\r\n\r\n")
        .await
        .unwrap();

    let mut buf = [0u8; 1024];
    let n = tokio::time::timeout(Duration::from_secs(10), stream.read(&mut buf))
        .await
        .expect("no CONNECT answer in time")
        .unwrap();
    let response = String::from_utf8_lossy(&buf[..n]).to_string();

    assert!(response.starts_with("HTTP/1.1 403"), "{response}");
}

#[tokio::test]
async fn connect_tunnel_carries_bytes_both_ways() {
    // Echo upstream: whatever arrives after the tunnel opens comes back.
    let echo_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let echo_addr = echo_listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = echo_listener.accept().await {
            let mut buf = [0u8; 64];
            if let Ok(n) = stream.read(&mut buf).await {
                let _ = stream.write_all(&buf[..n]).await;
            }
        }
    });

    let (proxy, _, _shutdown) =
        start_proxy(store_with_known_hosts(), FlaggedMode::Warn, false).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let connect = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n\r\n", echo_addr, echo_addr);
    stream.write_all(connect.as_bytes()).await.unwrap();

    // Read the 200 Connection Established headers.
    let mut buf = [0u8; 1024];
    let n = tokio::time::timeout(Duration::from_secs(10), stream.read(&mut buf))
        .await
        .expect("no CONNECT answer in time")
        .unwrap();
    let response = String::from_utf8_lossy(&buf[..n]).to_string();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    // Bytes written into the tunnel come back from the echo upstream.
    stream.write_all(b"ping through the tunnel").await.unwrap();
    let mut echoed = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(10), stream.read(&mut echoed))
        .await
        .expect("no echo in time")
        .unwrap();
    assert_eq!(&echoed[..n], b"ping through the tunnel");
}

#[tokio::test]
async fn auto_learn_grows_the_registry_from_navigations() {
    let upstream = start_upstream("ok").await;
    let (proxy, state, _shutdown) =
        start_proxy(store_with_known_hosts(), FlaggedMode::Warn, true).await;

    let request = format!(
        "GET http://{}/ HTTP/1.1\r\nHost: {}\r\nAccept: text/html\r\nConnection: close\r\n\r\n",
        upstream, upstream
    );
    roundtrip(proxy, &request).await;

    // The destination (an IP here) was learned as a known host.
    assert!(state.store().is_known_host("127.0.0.1"));
}
