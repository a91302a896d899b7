//! Notification channel: deliver rendered blocks one message at a time.

use crate::config::TelegramConfig;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("channel rejected message: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that accepts one plain-text message block.
pub trait Notifier {
    fn send(&self, block: &str) -> Result<(), NotifyError>;
}

/// Send blocks in order, skipping whitespace-only ones. Stops at the first
/// failure; blocks already sent stay sent. Returns the number delivered.
pub fn deliver<S: AsRef<str>>(notifier: &dyn Notifier, blocks: &[S]) -> Result<usize, NotifyError> {
    let mut sent = 0;
    for block in blocks {
        let block = block.as_ref();
        if block.trim().is_empty() {
            continue;
        }
        notifier.send(block)?;
        sent += 1;
    }
    debug!(sent, "blocks delivered");
    Ok(sent)
}

/// Prints each block to stdout, separated by a blank line.
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn send(&self, block: &str) -> Result<(), NotifyError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", block.trim_end())?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Http(format!("build HTTP client: {e}")))?;
        Ok(Self {
            client,
            token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            base_url: TELEGRAM_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, block: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let resp = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: block,
            })
            .send()
            // The URL embeds the token; keep it out of error text.
            .map_err(|e| NotifyError::Http(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| NotifyError::Http(e.without_url().to_string()))?;
        let parsed: Option<TelegramResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(r) if status.is_success() && r.ok => {
                info!(chars = block.chars().count(), "telegram message sent");
                Ok(())
            }
            Some(r) => Err(NotifyError::Rejected(
                r.description.unwrap_or_else(|| format!("HTTP {status}")),
            )),
            None => Err(NotifyError::Rejected(format!("HTTP {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        sent: RefCell<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl Notifier for Recorder {
        fn send(&self, block: &str) -> Result<(), NotifyError> {
            let mut sent = self.sent.borrow_mut();
            if self.fail_on == Some(sent.len()) {
                return Err(NotifyError::Rejected("chat not found".into()));
            }
            sent.push(block.to_string());
            Ok(())
        }
    }

    #[test]
    fn delivers_in_order_skipping_blank_blocks() {
        let r = Recorder { sent: RefCell::new(vec![]), fail_on: None };
        let n = deliver(&r, &["first", "  \n", "second"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(*r.sent.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn stops_at_first_failure() {
        let r = Recorder { sent: RefCell::new(vec![]), fail_on: Some(1) };
        let err = deliver(&r, &["a", "b", "c"]).unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(_)));
        assert_eq!(*r.sent.borrow(), vec!["a"]);
    }
}
