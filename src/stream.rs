//! Newline-delimited JSON streaming of model output.
//!
//! Every record is one JSON object on its own line:
//!
//! ```text
//! {"delta":"Roses "}
//! {"delta":"are red"}
//! {"delta":"","done":true}
//! ```
//!
//! The last record always has `done: true`, and carries `error` when the
//! provider failed mid-stream.

use crate::error::{MuseError, Result};
use crate::model::DeltaStream;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::warn;

/// Content type of NDJSON responses.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// One streamed record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub delta: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamRecord {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: text.into(),
            ..Default::default()
        }
    }

    pub fn done() -> Self {
        Self {
            done: true,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Serialize as one NDJSON line, including the trailing newline.
    pub fn to_line(&self) -> String {
        let mut value = json!({ "delta": self.delta });
        if self.done {
            value["done"] = json!(true);
        }
        if let Some(error) = &self.error {
            value["error"] = json!(error);
        }
        format!("{}\n", value)
    }
}

/// Wraps a live delta stream into NDJSON records. Single consumption.
pub struct StreamingEmitter {
    records: BoxStream<'static, StreamRecord>,
}

impl StreamingEmitter {
    pub fn new(deltas: DeltaStream) -> Self {
        let records = stream::unfold(Some(deltas), |state| async move {
            let mut deltas = state?;
            loop {
                match deltas.next().await {
                    Some(Ok(delta)) if delta.is_empty() => continue,
                    Some(Ok(delta)) => return Some((StreamRecord::delta(delta), Some(deltas))),
                    Some(Err(e)) => {
                        warn!("Stream failed mid-response: {}", e);
                        return Some((StreamRecord::failed(e.to_string()), None));
                    }
                    None => return Some((StreamRecord::done(), None)),
                }
            }
        });

        Self {
            records: records.boxed(),
        }
    }

    /// A stream that fails before producing any output.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            records: stream::iter([StreamRecord::failed(error)]).boxed(),
        }
    }

    /// Serialized lines, suitable for an HTTP body.
    pub fn into_ndjson(self) -> impl Stream<Item = std::result::Result<String, Infallible>> {
        self.map(|record| Ok(record.to_line()))
    }

    /// Drain the stream into the full text.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(record) = self.next().await {
            if let Some(error) = record.error {
                return Err(MuseError::Model(error));
            }
            text.push_str(&record.delta);
        }
        Ok(text)
    }
}

impl Stream for StreamingEmitter {
    type Item = StreamRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.records.poll_next_unpin(cx)
    }
}

/// One line of an NDJSON response as seen by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    Record(StreamRecord),
    /// A line that is not a record, passed through as text.
    Raw(String),
}

impl StreamLine {
    /// Text this line contributes to the response.
    pub fn text(&self) -> &str {
        match self {
            StreamLine::Record(record) => &record.delta,
            StreamLine::Raw(raw) => raw,
        }
    }
}

/// Parse one response line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<StreamLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<StreamRecord>(line) {
        Ok(record) => StreamLine::Record(record),
        Err(_) => StreamLine::Raw(line.to_string()),
    })
}

/// Reassemble the text of a complete NDJSON body.
pub fn collect_text(body: &str) -> String {
    body.lines()
        .filter_map(parse_line)
        .map(|line| line.text().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(items: Vec<Result<&'static str>>) -> DeltaStream {
        stream::iter(items.into_iter().map(|r| r.map(str::to_string))).boxed()
    }

    #[tokio::test]
    async fn test_records_end_with_done() {
        let emitter = StreamingEmitter::new(deltas(vec![Ok("Roses "), Ok(""), Ok("are red")]));
        let records: Vec<StreamRecord> = emitter.collect().await;

        assert_eq!(
            records,
            vec![
                StreamRecord::delta("Roses "),
                StreamRecord::delta("are red"),
                StreamRecord::done(),
            ]
        );
    }

    #[tokio::test]
    async fn test_concatenated_deltas_equal_full_text() {
        let full = "Phở thơm nồng, sớm mai Hà Nội";
        let parts: Vec<Result<&'static str>> = vec![Ok("Phở thơm "), Ok("nồng, sớm mai "), Ok("Hà Nội")];

        let body: String = StreamingEmitter::new(deltas(parts))
            .into_ndjson()
            .map(|line| line.unwrap())
            .collect()
            .await;

        assert_eq!(collect_text(&body), full);
        assert!(body.ends_with("{\"delta\":\"\",\"done\":true}\n"));
    }

    #[tokio::test]
    async fn test_provider_failure_ends_stream() {
        let emitter = StreamingEmitter::new(deltas(vec![
            Ok("partial"),
            Err(MuseError::OpenAI("connection reset".to_string())),
            Ok("never sent"),
        ]));
        let records: Vec<StreamRecord> = emitter.collect().await;

        assert_eq!(records.len(), 2);
        assert!(records[1].done);
        assert!(records[1].error.as_deref().unwrap().contains("connection reset"));
    }

    #[test]
    fn test_collect_text_reports_failure() {
        let result = tokio_test::block_on(StreamingEmitter::failed("boom").collect_text());
        assert!(matches!(result, Err(MuseError::Model(msg)) if msg == "boom"));

        let text = tokio_test::block_on(
            StreamingEmitter::new(deltas(vec![Ok("a"), Ok("b")])).collect_text(),
        )
        .unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_parse_line_passes_raw_text_through() {
        assert_eq!(
            parse_line("{\"delta\":\"hi\"}\n"),
            Some(StreamLine::Record(StreamRecord::delta("hi")))
        );
        assert_eq!(
            parse_line("not json"),
            Some(StreamLine::Raw("not json".to_string()))
        );
        assert_eq!(parse_line("   \n"), None);
    }

    #[test]
    fn test_line_format() {
        assert_eq!(StreamRecord::delta("x").to_line(), "{\"delta\":\"x\"}\n");
        assert_eq!(
            StreamRecord::failed("bad").to_line(),
            "{\"delta\":\"\",\"done\":true,\"error\":\"bad\"}\n"
        );
    }
}
