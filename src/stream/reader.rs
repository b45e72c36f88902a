use http::header::{ACCEPT, CACHE_CONTROL, CONNECTION};
use reqwest::RequestBuilder;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::dispatch::decode_api_error;
use crate::client::types::LogEntry;
use crate::client::ApiClient;
use crate::error::{ApiError, StreamError};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::stream::sse::{classify_line, LineBuffer, SseFrame};
use crate::utils::constants::{ENTRY_CHANNEL_CAPACITY, ERROR_CHANNEL_CAPACITY};

/// Receiving end of a log stream started by [`ApiClient::open_stream`].
///
/// Both channels close together when the reader ends, whichever way it ends.
/// Dropping the stream, or calling [`LogStream::cancel`], aborts an in-flight
/// read and releases the connection.
pub struct LogStream {
    pub entries: mpsc::Receiver<LogEntry>,
    pub errors: mpsc::Receiver<StreamError>,
    cancel: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<()>>,
}

impl LogStream {
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().map(|task| task.is_finished()).unwrap_or(true)
    }

    /// Wait until the background reader has returned.
    pub async fn join_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

impl ApiClient {
    /// Start reading `url` as an event stream on a background task.
    ///
    /// Failures to connect or a non-2xx answer arrive on the error channel.
    pub async fn open_stream(&self, url: &str) -> LogStream {
        let mut request = self
            .stream_http()
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive");
        if let Some(token) = self.session().token().await {
            request = request.bearer_auth(token);
        }

        let (entry_tx, entry_rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        debug!(url, "opening log stream");
        let reader = tokio::spawn(run_reader(request, entry_tx, error_tx, cancel_rx));

        LogStream {
            entries: entry_rx,
            errors: error_rx,
            cancel: Some(cancel_tx),
            reader: Some(reader),
        }
    }

    /// Follow the logs of deployment `name`, starting with the last `tail` lines.
    pub async fn stream_logs(&self, name: &str, tail: u32) -> Result<LogStream, ApiError> {
        self.ensure_valid().await?;
        let tail = tail.to_string();
        let url = self.endpoint_url(&["logs", name, "stream"], &[("tail", tail.as_str())]);
        Ok(self.open_stream(&url).await)
    }
}

/// Owns both senders: whatever path ends this function closes both channels, once.
async fn run_reader(
    request: RequestBuilder,
    entries: mpsc::Sender<LogEntry>,
    errors: mpsc::Sender<StreamError>,
    cancel: oneshot::Receiver<()>,
) {
    tokio::select! {
        _ = cancel => {
            // fires on explicit cancel and on the LogStream being dropped
            info!("log stream cancelled, closing connection");
        }
        _ = pump(request, &entries, &errors) => {
            debug!("log stream reader finished");
        }
    }
}

async fn pump(request: RequestBuilder, entries: &mpsc::Sender<LogEntry>, errors: &mpsc::Sender<StreamError>) {
    let metrics = get_metrics().await;

    let mut response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            let _ = errors.send(ApiError::Transport(err).into()).await;
            return;
        }
    };
    if !response.status().is_success() {
        let err = decode_api_error(response).await;
        warn!(error = %err, "log stream rejected");
        let _ = errors.send(err.into()).await;
        return;
    }

    let mut lines = LineBuffer::default();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                for line in lines.push(&chunk) {
                    if let Flow::Stop = handle_line(&line, entries, errors, metrics).await {
                        return;
                    }
                }
            }
            Ok(None) => {
                if let Some(line) = lines.finish() {
                    handle_line(&line, entries, errors, metrics).await;
                }
                debug!("log stream reached end of body");
                return;
            }
            Err(err) => {
                warn!(error = %err, "log stream read failed");
                let _ = errors.send(StreamError::Terminated(err)).await;
                return;
            }
        }
    }
}

async fn handle_line(
    line: &str,
    entries: &mpsc::Sender<LogEntry>,
    errors: &mpsc::Sender<StreamError>,
    metrics: &Metrics,
) -> Flow {
    let payload = match classify_line(line) {
        SseFrame::Skip => return Flow::Continue,
        SseFrame::Done => {
            debug!("log stream sent [DONE]");
            return Flow::Stop;
        }
        SseFrame::Data(payload) => payload,
    };

    match serde_json::from_str::<LogEntry>(payload) {
        Ok(entry) => {
            metrics.stream_entries.inc();
            // blocks while the consumer is 100 entries behind
            if entries.send(entry).await.is_err() {
                debug!("log consumer went away");
                return Flow::Stop;
            }
            Flow::Continue
        }
        Err(source) => {
            metrics.stream_parse_failures.inc();
            warn!(error = %source, "skipping undecodable log line");
            let err = StreamError::Parse {
                line: payload.to_owned(),
                source,
            };
            if errors.send(err).await.is_err() {
                return Flow::Stop;
            }
            Flow::Continue
        }
    }
}
