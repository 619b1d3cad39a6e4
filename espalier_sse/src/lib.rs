// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Espalier SSE: server-sent event framing for streamed tree data.
//!
//! Hosts that lazy-load subtrees over an event stream receive the response
//! body in arbitrary chunks; a record boundary (`\n\n`) can land anywhere.
//! [`StreamSplitter`] carves off the complete records seen so far, and
//! [`parse_events`] turns them into [`SseEvent`] values.
//!
//! With the `json` feature, [`SseEvent::data_json`] parses the `data`
//! payload with [`serde_json`].
//!
//! ```
//! use espalier_sse::{parse_events, EventKind, StreamSplitter};
//!
//! let mut splitter = StreamSplitter::new();
//! // The transport hands over everything received so far, half records
//! // included; only the complete part comes back.
//! let body = "id:1\nevent:message\ndata:{\"a\":1}\n\nid:2\nevent:mess";
//! let complete = splitter.split(body).unwrap();
//! let events = parse_events(complete);
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].kind, EventKind::Message);
//! ```

use tracing::trace;

/// Well-known event types, with a catch-all for custom ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A data-bearing event.
    Message,
    /// Keep-alive with no payload of interest.
    Heartbeat,
    /// The server reported a failure.
    Error,
    /// The stream is complete.
    End,
    /// Any other `event:` value, carried verbatim.
    Other(String),
}

impl EventKind {
    fn from_value(value: &str) -> Self {
        match value {
            "message" => Self::Message,
            "heartbeat" => Self::Heartbeat,
            "error" => Self::Error,
            "end" => Self::End,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One parsed event record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// The `id:` field, if present.
    pub id: Option<String>,
    /// The `event:` field; [`EventKind::Message`] when absent.
    pub kind: EventKind,
    /// The raw `data:` payload, colons and all.
    pub data: Option<String>,
}

impl SseEvent {
    /// Parse the `data` payload as JSON. `None` when there is no payload or
    /// it is not valid JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn data_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.data.as_deref()?).ok()
    }
}

/// Parse a run of complete records (as produced by [`StreamSplitter`]).
///
/// Records are separated by blank lines. Within a record, each line is a
/// `key:value` field; the value of a `data:` line is everything after the
/// first colon, so JSON payloads with embedded colons survive. Blank
/// records are skipped.
#[must_use]
pub fn parse_events(input: &str) -> Vec<SseEvent> {
    input
        .split("\n\n")
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> SseEvent {
    let mut event = SseEvent {
        id: None,
        kind: EventKind::Message,
        data: None,
    };
    for line in record.split('\n') {
        if let Some(payload) = line.strip_prefix("data:") {
            event.data = Some(payload.to_owned());
        } else if let Some((key, value)) = line.split_once(':') {
            match key {
                "id" => event.id = Some(value.to_owned()),
                "event" => event.kind = EventKind::from_value(value),
                _ => {}
            }
        }
    }
    event
}

/// Carves complete records out of a growing response body.
///
/// Transports that expose the entire body received so far (rather than
/// deltas) call [`StreamSplitter::split`] with the full text on every
/// progress notification; the splitter remembers how far it has consumed
/// and yields only the newly completed records.
#[derive(Clone, Debug, Default)]
pub struct StreamSplitter {
    consumed: usize,
}

impl StreamSplitter {
    /// A splitter at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the records completed since the last call, or `None` when no
    /// new record boundary has arrived yet.
    pub fn split<'a>(&mut self, body: &'a str) -> Option<&'a str> {
        // A progress callback can fire mid-record; cut at the last boundary.
        let end = body.rfind("\n\n")? + 2;
        if end <= self.consumed {
            return None;
        }
        let new = &body[self.consumed..end];
        trace!(bytes = new.len(), "stream records completed");
        self.consumed = end;
        Some(new)
    }
}
