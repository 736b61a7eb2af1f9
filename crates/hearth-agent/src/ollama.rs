//! Streaming relay to Ollama's `/api/generate` endpoint.
//!
//! The relay never fails: transport problems, timeouts and non-success
//! statuses each become one explanatory [`ReplyChunk`] that ends the stream.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use hearth_core::config::{generate_url, HearthConfig};
use tracing::{debug, warn};

use crate::prompt::PromptPair;
use crate::stream::{LineBuffer, Record, RecordAction, ReplyChunk};

/// Sampling options. Fixed, not exposed to callers.
const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.9;

/// Why a relay ended early. `Display` is the text shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Error: Request to Ollama timed out. It may be slow or unresponsive.")]
    Timeout,

    #[error("Error: Failed to connect to Ollama at {endpoint}. Exception: {}", error_chain(.source))]
    Connect {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("Ollama error: HTTP {status}. Ensure Ollama is running and model pulled.")]
    Status { status: u16 },

    #[error("Error: Connection to Ollama at {endpoint} was interrupted. Exception: {}", error_chain(.source))]
    Interrupted {
        endpoint: String,
        source: reqwest::Error,
    },
}

/// Render an error with every cause below it, joined by `": "`.
///
/// reqwest's own `Display` stops at the outermost layer ("error sending
/// request"); the useful part (refused, DNS, reset) lives further down.
fn error_chain(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut cause = std::error::Error::source(err);
    while let Some(e) = cause {
        let text = e.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        cause = e.source();
    }
    parts.join(": ")
}

impl From<RelayError> for ReplyChunk {
    fn from(err: RelayError) -> Self {
        ReplyChunk::new(err.to_string())
    }
}

pub struct OllamaRelay {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaRelay {
    /// `base_url` is the server root, e.g. `http://localhost:11434`.
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: generate_url(base_url),
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &HearthConfig) -> Self {
        Self::new(
            &config.ollama.base_url,
            config.ollama.model.clone(),
            Duration::from_secs(config.ollama.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Open one upstream generation and relay it as a lazy stream of chunks.
    ///
    /// Nothing is sent until the stream is first polled. Dropping the stream
    /// drops the upstream response, which closes the connection.
    pub fn relay(&self, prompt: PromptPair) -> impl Stream<Item = ReplyChunk> + Send + 'static {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        let body = build_request_body(&self.model, &prompt);

        async_stream::stream! {
            debug!(endpoint = %endpoint, "opening Ollama generate stream");

            let resp = match open(&client, &endpoint, &body, timeout).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(error = %e, "Ollama relay failed before streaming");
                    yield ReplyChunk::from(e);
                    return;
                }
            };

            let mut bytes = resp.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut forwarded: usize = 0;

            loop {
                let next = match tokio::time::timeout(timeout, bytes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(forwarded, "Ollama stream stalled past timeout");
                        yield ReplyChunk::from(RelayError::Timeout);
                        return;
                    }
                };

                let (complete, closed) = match next {
                    Some(Ok(chunk)) => (lines.push(&chunk), false),
                    Some(Err(e)) => {
                        warn!(error = %e, forwarded, "Ollama stream interrupted");
                        let err = if e.is_timeout() {
                            RelayError::Timeout
                        } else {
                            RelayError::Interrupted { endpoint: endpoint.clone(), source: e }
                        };
                        yield ReplyChunk::from(err);
                        return;
                    }
                    None => (lines.finish().into_iter().collect::<Vec<_>>(), true),
                };

                for raw in complete {
                    if raw.is_empty() {
                        continue;
                    }
                    let line = match std::str::from_utf8(&raw) {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(err = %e, "skipping non-UTF-8 line from Ollama");
                            continue;
                        }
                    };

                    let record = Record::parse(line);
                    if matches!(record, Record::Raw { .. }) {
                        debug!(bytes = line.len(), "non-JSON line from Ollama, forwarding as text");
                    }
                    match record.action() {
                        RecordAction::Forward(chunk) => {
                            forwarded += 1;
                            debug!(forwarded, chars = chunk.reply.len(), "relaying chunk");
                            yield chunk;
                        }
                        RecordAction::Skip => {}
                        RecordAction::Finish => {
                            debug!(forwarded, "Ollama signalled done");
                            return;
                        }
                    }
                }

                if closed {
                    debug!(forwarded, "Ollama closed the stream");
                    return;
                }
            }
        }
    }
}

/// Send the request and check the status. The body is left unread.
async fn open(
    client: &reqwest::Client,
    endpoint: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<reqwest::Response, RelayError> {
    let send = client
        .post(endpoint)
        .header("content-type", "application/json")
        .json(body)
        .send();

    let resp = match tokio::time::timeout(timeout, send).await {
        Err(_) => return Err(RelayError::Timeout),
        Ok(Err(e)) if e.is_timeout() => return Err(RelayError::Timeout),
        Ok(Err(e)) => {
            return Err(RelayError::Connect {
                endpoint: endpoint.to_string(),
                source: e,
            })
        }
        Ok(Ok(resp)) => resp,
    };

    if !resp.status().is_success() {
        return Err(RelayError::Status {
            status: resp.status().as_u16(),
        });
    }
    Ok(resp)
}

fn build_request_body(model: &str, prompt: &PromptPair) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "prompt": prompt.combined(),
        "stream": true,
        "options": {
            "temperature": TEMPERATURE,
            "top_p": TOP_P,
        },
    })
}
