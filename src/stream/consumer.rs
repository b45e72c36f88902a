use std::future::Future;

use tracing::{debug, info, warn};

use crate::client::types::LogEntry;
use crate::error::StreamError;
use crate::stream::reader::LogStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Streaming,
    Stopping,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The server ended the stream.
    Completed,
    /// The interrupt fired first.
    Interrupted,
}

/// Render every entry of `stream` until it ends, fails, or `interrupt` resolves.
///
/// Parse errors are logged and skipped. The first terminal error is returned,
/// after every entry the reader delivered ahead of it has been rendered.
/// After an interrupt the stream is cancelled and nothing else is rendered.
pub async fn consume_stream<I, R>(
    stream: &mut LogStream,
    interrupt: I,
    mut render: R,
) -> Result<ConsumeOutcome, StreamError>
where
    I: Future<Output = ()>,
    R: FnMut(&LogEntry),
{
    tokio::pin!(interrupt);
    let mut state = ConsumerState::Streaming;
    let mut errors_open = true;

    while state == ConsumerState::Streaming {
        tokio::select! {
            biased;

            _ = &mut interrupt => {
                info!("interrupt received, stopping log stream");
                state = ConsumerState::Stopping;
            }
            err = stream.errors.recv(), if errors_open => match err {
                Some(err) if err.is_terminal() => {
                    // the reader queued these before failing and has returned since
                    while let Some(entry) = stream.entries.recv().await {
                        render(&entry);
                    }
                    return Err(err);
                }
                Some(err) => check_error(err)?,
                None => errors_open = false,
            },
            entry = stream.entries.recv() => match entry {
                Some(entry) => render(&entry),
                None => {
                    // the reader is gone; anything it reported last is still queued
                    while let Some(err) = stream.errors.recv().await {
                        check_error(err)?;
                    }
                    debug!("log stream ended");
                    state = ConsumerState::Done;
                }
            },
        }
    }

    if state == ConsumerState::Stopping {
        stream.cancel();
        stream.join_reader().await;
        return Ok(ConsumeOutcome::Interrupted);
    }
    Ok(ConsumeOutcome::Completed)
}

fn check_error(err: StreamError) -> Result<(), StreamError> {
    if err.is_terminal() {
        return Err(err);
    }
    warn!(error = %err, "log stream skipped a line");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::header::CONTENT_TYPE;
    use axum::{routing::get, Router};
    use tokio::time::timeout;

    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use crate::client::ApiClient;
    use crate::tests::common::{spawn_axum, spawn_raw_http};

    fn client(addr: &std::net::SocketAddr) -> ApiClient {
        ApiClient::new(&format!("http://{}", addr), Arc::new(MemoryTokenStore::default())).unwrap()
    }

    fn entry_line(message: &str) -> String {
        format!(
            "data: {{\"timestamp\":\"2024-01-01T00:00:00Z\",\"level\":\"info\",\"message\":\"{}\",\"source\":\"app\"}}\n\n",
            message
        )
    }

    #[tokio::test]
    async fn renders_entries_until_done() {
        let body = format!("{}data: oops\n\n{}data: [DONE]\n\n", entry_line("first"), entry_line("second"));
        let router = Router::new().route(
            "/api/v1/logs/web/stream",
            get(move || {
                let body = body.clone();
                async move { ([(CONTENT_TYPE, "text/event-stream")], body) }
            }),
        );
        let (handle, addr) = spawn_axum(router).await;

        let client = client(&addr);
        let mut stream = client.open_stream(&client.api_url("logs/web/stream")).await;
        let mut seen = Vec::new();
        let outcome = timeout(
            Duration::from_secs(5),
            consume_stream(&mut stream, std::future::pending(), |entry| seen.push(entry.message.clone())),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Completed);
        assert_eq!(seen, vec!["first".to_owned(), "second".to_owned()]);
        handle.abort();
    }

    #[tokio::test]
    async fn returns_terminal_error_from_rejected_stream() {
        let router = Router::new().route(
            "/api/v1/logs/web/stream",
            get(|| async {
                (
                    axum::http::StatusCode::FORBIDDEN,
                    [(CONTENT_TYPE, "application/json")],
                    r#"{"error":{"code":"FORBIDDEN","message":"not your deployment"}}"#,
                )
            }),
        );
        let (handle, addr) = spawn_axum(router).await;

        let client = client(&addr);
        let mut stream = client.open_stream(&client.api_url("logs/web/stream")).await;
        let err = timeout(Duration::from_secs(5), consume_stream(&mut stream, std::future::pending(), |_| {}))
            .await
            .unwrap()
            .unwrap_err();

        assert!(matches!(err, StreamError::Api(_)));
        assert!(err.to_string().contains("not your deployment"));
        handle.abort();
    }

    #[tokio::test]
    async fn entries_delivered_before_a_broken_body_are_rendered() {
        let mut body = String::new();
        for n in 0..5 {
            body.push_str(&entry_line(&format!("line-{}", n)));
        }
        // promises far more than it sends, then hangs up
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: 5000\r\n\r\n{}",
            body
        );
        let (handle, addr) = spawn_raw_http(response, false).await;

        let client = client(&addr);
        let mut stream = client.open_stream(&format!("http://{}/stream", addr)).await;

        // let the reader queue everything and fail before anyone consumes
        timeout(Duration::from_secs(5), async {
            while !stream.is_finished() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        let mut seen = Vec::new();
        let err = timeout(
            Duration::from_secs(5),
            consume_stream(&mut stream, std::future::pending(), |entry| seen.push(entry.message.clone())),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, StreamError::Terminated(_)));
        assert_eq!(seen, (0..5).map(|n| format!("line-{}", n)).collect::<Vec<_>>());
        handle.abort();
    }

    #[tokio::test]
    async fn interrupt_cancels_idle_stream() {
        let headers = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n".to_owned();
        let (handle, addr) = spawn_raw_http(headers, true).await;

        let client = client(&addr);
        let mut stream = client.open_stream(&format!("http://{}/stream", addr)).await;
        let mut rendered = 0;
        let outcome = timeout(
            Duration::from_secs(5),
            consume_stream(&mut stream, tokio::time::sleep(Duration::from_millis(200)), |_| rendered += 1),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Interrupted);
        assert_eq!(rendered, 0);
        assert!(stream.is_finished());
        assert!(timeout(Duration::from_secs(5), handle).await.unwrap().unwrap());
    }
}
