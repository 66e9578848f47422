//! News-fetch progress stream over WebSocket.
//!
//! One connection per fetch: the client sends the bearer token as the first
//! text frame, then the JSON [`FetchCommand`]. The server pushes
//! [`FetchStatus`] frames until one has `is_complete` set, at which point the
//! client closes. There is no reconnect or resume.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use opshub_core::models::{FetchCommand, FetchStatus};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{ApiClient, ApiError};

pub const FETCH_NEWS_PATH: &str = "/superadmin/fetch-news";

const INVALID_FRAME_LINE: &str = "[CLIENT ERROR] Received invalid message from server.";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// A line appended to the log.
    Log(String),
    /// The current status was replaced.
    Status(FetchStatus),
}

/// How the connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A frame with `is_complete: true` arrived.
    Completed,
    /// The server sent a close frame first (4001 authentication failed,
    /// 4003 insufficient permissions).
    ClosedByServer { code: u16, reason: String },
    /// The stream ended without a close frame.
    Disconnected,
    TransportError(String),
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub logs: Vec<String>,
    pub status: FetchStatus,
    pub outcome: FetchOutcome,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == FetchOutcome::Completed
    }
}

/// `http(s)://host` plus `path` as `ws(s)://host/path`.
pub fn websocket_url(base_url: &str, path: &str) -> Result<String, ApiError> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(ApiError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{}{}", ws_base, path))
}

/// Client for the superadmin news-fetch stream. At most one fetch runs at a
/// time per fetcher.
pub struct NewsFetcher {
    url: String,
    busy: AtomicBool,
    events: Option<UnboundedSender<FetchEvent>>,
}

impl NewsFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            busy: AtomicBool::new(false),
            events: None,
        }
    }

    /// Fetcher for the stream endpoint of the API the client points at.
    pub fn for_client(client: &ApiClient) -> Result<Self, ApiError> {
        let url = websocket_url(client.base_url(), &client.api_path(FETCH_NEWS_PATH))?;
        Ok(Self::new(url))
    }

    pub fn with_events(mut self, events: UnboundedSender<FetchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one fetch to its end.
    ///
    /// Connection and protocol failures are part of the returned report, not
    /// errors; only a second concurrent call fails, with
    /// [`ApiError::AlreadyFetching`].
    pub async fn run(&self, token: &str, command: &FetchCommand) -> Result<FetchReport, ApiError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ApiError::AlreadyFetching)?;
        let payload =
            serde_json::to_string(command).map_err(|e| ApiError::Decode(e.to_string()))?;

        let mut log = FetchLog::new(self.events.clone());
        log.update(FetchStatus::connecting(), false);
        log.push("Connecting to fetcher service...");

        let outcome = match self.stream(token, &payload, &mut log).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "News fetch stream failed");
                log.push(format!("WebSocket Error: {}", e));
                FetchOutcome::TransportError(e.to_string())
            }
        };

        if let FetchOutcome::ClosedByServer { code, reason } = &outcome {
            tracing::warn!(code, %reason, "Fetcher closed the connection");
        }
        if outcome != FetchOutcome::Completed {
            let mut finished = log.status.clone();
            finished.stage = "Finished".to_string();
            finished.is_complete = true;
            log.update(finished, false);
        }
        log.push("Connection closed.");

        Ok(FetchReport {
            logs: log.lines,
            status: log.status,
            outcome,
        })
    }

    async fn stream(
        &self,
        token: &str,
        command: &str,
        log: &mut FetchLog,
    ) -> Result<FetchOutcome, tungstenite::Error> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = socket.split();

        log.push("Connection established. Authenticating...");
        write.send(Message::text(token)).await?;
        log.push("Sending fetch command...");
        write.send(Message::text(command)).await?;

        while let Some(message) = read.next().await {
            let parsed = match message? {
                Message::Text(text) => serde_json::from_str::<FetchStatus>(text.as_str()),
                Message::Binary(data) => serde_json::from_slice::<FetchStatus>(&data),
                Message::Close(frame) => {
                    return Ok(match frame {
                        Some(frame) => FetchOutcome::ClosedByServer {
                            code: u16::from(frame.code),
                            reason: frame.reason.as_str().to_string(),
                        },
                        None => FetchOutcome::Disconnected,
                    });
                }
                _ => continue,
            };

            match parsed {
                Ok(status) if status.is_complete => {
                    log.update(status, true);
                    if let Err(e) = write.close().await {
                        tracing::debug!(error = %e, "Close after completion failed");
                    }
                    return Ok(FetchOutcome::Completed);
                }
                Ok(status) => log.update(status, true),
                Err(e) => {
                    tracing::warn!(error = %e, "Unparsable frame from fetcher");
                    log.push(INVALID_FRAME_LINE);
                }
            }
        }
        Ok(FetchOutcome::Disconnected)
    }
}

/// Holds the busy flag for the lifetime of one fetch.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct FetchLog {
    lines: Vec<String>,
    status: FetchStatus,
    events: Option<UnboundedSender<FetchEvent>>,
}

impl FetchLog {
    fn new(events: Option<UnboundedSender<FetchEvent>>) -> Self {
        Self {
            lines: Vec::new(),
            status: FetchStatus::idle(),
            events,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(%line, "fetch log");
        self.emit(FetchEvent::Log(line.clone()));
        self.lines.push(line);
    }

    /// Replace the current status, optionally logging it as `[stage] message`.
    fn update(&mut self, status: FetchStatus, log_it: bool) {
        self.emit(FetchEvent::Status(status.clone()));
        if log_it {
            self.push(status.log_line());
        }
        self.status = status;
    }

    fn emit(&self, event: FetchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
