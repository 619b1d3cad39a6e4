// Copyright 2026 the Espalier Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lay out a two-tree forest without a renderer: fake the measurement round
//! trips, toggle a side open, and print where everything landed.
//!
//! Run:
//! - `cargo run -p espalier_demos --example console_forest`

use espalier_layout::{
    ChildSource, LayoutEngine, LayoutOptions, NodeData, NodeId, NodeSeed, PassOutput, Side,
};
use espalier_view::{ViewMargins, ViewOptions, Viewport};
use kurbo::{Point, Size};

/// A stand-in for the renderer: every card measures 200 wide and as tall as
/// its label is long, so heights vary.
fn measure(label: &str) -> Size {
    Size::new(200.0, 40.0 + (label.len() % 4) as f64 * 12.0)
}

/// Serves a fixed set of grandchildren for any expanded node.
struct DemoSource;

impl ChildSource for DemoSource {
    type Error = std::convert::Infallible;

    fn fetch_children(
        &mut self,
        node: &NodeData,
        side: Side,
    ) -> Result<Vec<NodeSeed>, Self::Error> {
        let base = node.label.as_deref().unwrap_or("node");
        let tag = match side {
            Side::Left => "L",
            Side::Right => "R",
        };
        Ok(vec![
            NodeSeed::labeled(&format!("{base}/{tag}0")),
            NodeSeed {
                is_virtual: true,
                ..NodeSeed::labeled(&format!("{base}/{tag}?"))
            },
            NodeSeed::labeled(&format!("{base}/{tag}1")),
        ])
    }
}

fn seeds() -> Vec<NodeSeed> {
    vec![
        NodeSeed {
            left_num: Some(3),
            right_num: Some(2),
            open_right: true,
            left: vec![
                NodeSeed::labeled("left top"),
                NodeSeed::labeled("left middle"),
                NodeSeed::labeled("left bottom"),
            ],
            right: vec![
                NodeSeed::labeled("right top"),
                NodeSeed::labeled("right bottom"),
            ],
            ..NodeSeed::labeled("tree center 0")
        },
        NodeSeed {
            left_num: Some(1),
            open_left: true,
            left: vec![NodeSeed::labeled("second tree child")],
            ..NodeSeed::labeled("tree center 1")
        },
    ]
}

/// Poll until a pass reports all sizes ready, measuring whatever it emits.
fn settle(engine: &mut LayoutEngine, mut now: u64) -> (PassOutput, u64) {
    loop {
        if let Some(out) = engine.poll(now) {
            if out.sizes_ready {
                return (out, now);
            }
            for id in &out.nodes {
                let label = engine
                    .forest()
                    .data(*id)
                    .and_then(|d| d.label.clone())
                    .unwrap_or_default();
                engine.report_size(*id, measure(&label), now);
            }
        }
        now += 1;
    }
}

fn print_pass(engine: &LayoutEngine, out: &PassOutput) {
    for id in &out.nodes {
        let label = engine
            .forest()
            .data(*id)
            .and_then(|d| d.label.clone())
            .unwrap_or_default();
        let top = engine.geometry().top_or(*id, f64::NAN);
        let left = engine.geometry().left_or(*id, f64::NAN);
        println!("  ({left:8.1}, {top:8.1})  {label}");
    }
    let b = out.bounds;
    println!(
        "  bounds: left {:.1}..{:.1}, top {:.1}..{:.1}",
        b.min_left, b.max_left, b.min_top, b.max_top
    );
}

fn node_origin(engine: &LayoutEngine, id: NodeId) -> Point {
    Point::new(
        engine.geometry().left_or(id, 0.0),
        engine.geometry().top_or(id, 0.0),
    )
}

fn main() {
    let mut engine = LayoutEngine::new(LayoutOptions::default());
    let plane = engine.options().plane_size(None);
    let mut viewport = Viewport::new(ViewOptions::default(), Size::new(1280.0, 800.0));

    engine.replace_forest(seeds(), 0);
    let (out, now) = settle(&mut engine, 0);
    println!("initial layout ({} nodes):", out.nodes.len());
    print_pass(&engine, &out);

    viewport.apply_layout(out.bounds, plane);
    if engine.take_tree_changed() {
        viewport.center();
    }
    println!(
        "canvas {:?}, scrolled to {:?}",
        viewport.style().size,
        viewport.scroll().offset
    );

    // Expand the first tree's center to the left; children are fetched.
    let root = engine.forest().roots()[0];
    let mut source = DemoSource;
    let outcome = engine
        .toggle_children(root, Side::Left, &mut source, now + 100)
        .expect("root is alive");
    println!(
        "\ntoggled left side: open={} fetched={}",
        outcome.open, outcome.fetched
    );

    if let Some(anchor) = engine.take_anchor() {
        viewport.record_anchor(node_origin(&engine, anchor));
        let (out, _) = settle(&mut engine, now + 100);
        viewport.apply_layout(out.bounds, plane);
        viewport.reconcile_anchor(node_origin(&engine, anchor));
        println!("after expand ({} nodes):", out.nodes.len());
        print_pass(&engine, &out);
    }

    if let Some(focus) = outcome.focus
        && let Some(rect) = engine.geometry().rect(focus)
    {
        viewport.scroll_into_view_if_needed(rect, ViewMargins::for_card(viewport.options()));
        println!("revealed focus node, scroll now {:?}", viewport.scroll().offset);
    }
}
