// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Mutex;

use base64::Engine;
use reqwest::Client;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::auth::store::TokenStore;
use crate::error::StoreError;

/// Unsigned three-segment token carrying `sub`, `email`, `iat` and `exp`.
pub fn sample_token(sub: &str, exp: i64) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
    let payload = engine.encode(
        json!({
            "sub": sub,
            "email": format!("{}@deployaja.id", sub),
            "iat": exp - 3600,
            "exp": exp,
        })
        .to_string(),
    );
    format!("{}.{}.signature", header, payload)
}

/// Holds a token but refuses to persist a new one.
pub struct FailingTokenStore {
    token: Mutex<String>,
}

impl FailingTokenStore {
    pub fn new(token: &str) -> Self {
        Self {
            token: Mutex::new(token.to_owned()),
        }
    }
}

impl TokenStore for FailingTokenStore {
    fn load(&self) -> String {
        self.token.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn save(&self, _token: &str) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "/read-only/token".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
        })
    }
}

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Serve exactly one connection with a hand-written HTTP response.
///
/// With `hold_open` the socket stays up after the response until the client
/// closes it; the handle then resolves to `true`. Otherwise the server hangs up
/// right after writing.
pub async fn spawn_raw_http(response: String, hold_open: bool) -> (JoinHandle<bool>, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        if socket.write_all(response.as_bytes()).await.is_err() {
            return false;
        }
        let _ = socket.flush().await;
        if !hold_open {
            return true;
        }

        // wait for the peer to go away
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return true,
                Ok(_) => continue,
            }
        }
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}
