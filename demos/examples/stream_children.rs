// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feed lazily-loaded children from a simulated event stream.
//!
//! A backend streams child records as server-sent events; the transport
//! surfaces the growing response body chunk by chunk. The splitter carves
//! off complete records, the parser turns them into seeds, and the layout
//! engine takes it from there.
//!
//! Run:
//! - `cargo run -p espalier_demos --example stream_children`

use espalier_layout::{ChildSource, LayoutEngine, LayoutOptions, NodeData, NodeSeed, Side};
use espalier_sse::{EventKind, StreamSplitter, parse_events};
use kurbo::Size;

/// The full response body; progress callbacks see prefixes of this.
const BODY: &str = "id:1\nevent:message\ndata:{\"label\":\"alpha\"}\n\n\
id:2\nevent:message\ndata:{\"label\":\"beta\",\"virtual\":true}\n\n\
event:heartbeat\n\n\
id:3\nevent:message\ndata:{\"label\":\"gamma\"}\n\n\
event:end\n\n";

fn seed_from_json(value: &serde_json::Value) -> NodeSeed {
    NodeSeed {
        label: value
            .get("label")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        is_virtual: value
            .get("virtual")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
        ..NodeSeed::default()
    }
}

/// Hands the already-streamed seeds to the engine on expand.
struct StreamedSource {
    seeds: Option<Vec<NodeSeed>>,
}

impl ChildSource for StreamedSource {
    type Error = &'static str;

    fn fetch_children(
        &mut self,
        _node: &NodeData,
        _side: Side,
    ) -> Result<Vec<NodeSeed>, Self::Error> {
        self.seeds.take().ok_or("stream already consumed")
    }
}

fn main() {
    let mut splitter = StreamSplitter::new();
    let mut seeds = Vec::new();
    let mut ended = false;

    // Simulate onprogress firing at arbitrary byte counts.
    for cut in [10, 45, 80, 130, BODY.len()] {
        let Some(chunk) = splitter.split(&BODY[..cut]) else {
            continue;
        };
        for event in parse_events(chunk) {
            match event.kind {
                EventKind::Message => {
                    if let Some(json) = event.data_json() {
                        seeds.push(seed_from_json(&json));
                    }
                }
                EventKind::End => ended = true,
                _ => {}
            }
        }
    }
    assert!(ended, "stream should terminate with an end event");
    println!("streamed {} children", seeds.len());

    let mut engine = LayoutEngine::new(LayoutOptions::default());
    engine.replace_forest(vec![NodeSeed::labeled("center")], 0);
    let root = engine.forest().roots()[0];
    let mut source = StreamedSource { seeds: Some(seeds) };
    engine
        .toggle_children(root, Side::Right, &mut source, 0)
        .expect("streamed children are at hand");

    let mut now = 0;
    let out = loop {
        if let Some(out) = engine.poll(now) {
            if out.sizes_ready {
                break out;
            }
            for id in &out.nodes {
                engine.report_size(*id, Size::new(200.0, 48.0), now);
            }
        }
        now += 1;
    };

    for id in &out.nodes {
        let label = engine
            .forest()
            .data(*id)
            .and_then(|d| d.label.clone())
            .unwrap_or_default();
        let virt = engine
            .forest()
            .data(*id)
            .is_some_and(|d| d.is_virtual);
        println!(
            "  ({:8.1}, {:8.1})  {label}{}",
            engine.geometry().left_or(*id, 0.0),
            engine.geometry().top_or(*id, 0.0),
            if virt { " (virtual)" } else { "" }
        );
    }
}
