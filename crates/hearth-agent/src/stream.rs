use serde::Serialize;

/// One unit of relayed model output, sent to the browser as `{"reply": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyChunk {
    pub reply: String,
}

impl ReplyChunk {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }

    /// Minimal JSON encoding followed by a newline.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }
}

/// One upstream NDJSON line after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Valid JSON. `text` is empty when no known text field is present.
    Parsed { text: String, done: bool },
    /// Not JSON; forwarded as plain text.
    Raw { text: String },
}

/// What the relay does with a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    Forward(ReplyChunk),
    Skip,
    /// Upstream signalled completion; stop reading.
    Finish,
}

/// Text fields checked in order; the first non-empty string wins.
const TEXT_FIELDS: &[&str] = &["response", "output", "text"];

impl Record {
    pub fn parse(line: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(map)) => {
                let text = TEXT_FIELDS
                    .iter()
                    .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
                    .find(|s| !s.is_empty())
                    .unwrap_or_default()
                    .to_string();
                let done = map
                    .get("done")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                Record::Parsed { text, done }
            }
            // valid JSON but not an object: nothing to forward
            Ok(_) => Record::Parsed {
                text: String::new(),
                done: false,
            },
            Err(_) => Record::Raw {
                text: line.to_string(),
            },
        }
    }

    /// Completion wins over text carried in the same record.
    pub fn action(self) -> RecordAction {
        match self {
            Record::Parsed { done: true, .. } => RecordAction::Finish,
            Record::Parsed { text, .. } if !text.is_empty() => {
                RecordAction::Forward(ReplyChunk::new(text))
            }
            Record::Raw { text } if !text.trim().is_empty() => {
                RecordAction::Forward(ReplyChunk::new(text))
            }
            _ => RecordAction::Skip,
        }
    }
}

/// Reassembles newline-delimited records from arbitrarily split byte chunks.
///
/// Works on bytes so a multi-byte UTF-8 sequence split across two transport
/// chunks is decoded only once the whole line is present.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and drain every complete line (without `\n` / `\r\n`).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Trailing bytes left when the stream closed without a final newline.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let mut rest = std::mem::take(&mut self.buf);
        if rest.last() == Some(&b'\r') {
            rest.pop();
        }
        (!rest.is_empty()).then_some(rest)
    }
}
