use std::fmt;
use std::future::Future;

use serde_json::json;
use tracing::{debug, error, info};

use crate::config::LogSinkConfig;
use crate::error::SinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote destination for operational events.
///
/// Built once at startup and handed to the poller; delivery is awaited so a
/// failure comes back to the caller instead of being dropped.
pub trait LogSink {
    fn send_log(&self, level: LogLevel, message: &str) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Ships events to Loggly's HTTP event endpoint and echoes them locally.
pub struct LogglySink {
    client: reqwest::Client,
    url: String,
    tag: String,
}

impl LogglySink {
    pub fn new(cfg: &LogSinkConfig) -> Self {
        Self::with_client(reqwest::Client::new(), cfg)
    }

    pub fn with_client(client: reqwest::Client, cfg: &LogSinkConfig) -> Self {
        let url = format!(
            "{}/{}/tag/{}/",
            cfg.base_url.trim_end_matches('/'),
            cfg.token,
            cfg.tag
        );
        Self {
            client,
            url,
            tag: cfg.tag.clone(),
        }
    }
}

impl LogSink for LogglySink {
    async fn send_log(&self, level: LogLevel, message: &str) -> Result<(), SinkError> {
        match level {
            LogLevel::Info => info!("[{}] {}", self.tag, message),
            LogLevel::Error => error!("[{}] {}", self.tag, message),
        }

        let body = json!({
            "level": level.as_str(),
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.without_url()))?;
        if !resp.status().is_success() {
            return Err(SinkError::Status(resp.status()));
        }

        debug!("📨 Log event delivered ({})", level);
        Ok(())
    }
}
