//! Cross-pass behavior of the forest analyses.

use railblocks_analysis::{mark_unconnected, mark_unused, mark_warnings};
use railblocks_types::{Forest, NodeData, SlotRef, WarningKind};

#[test]
fn test_unused_equals_unreachable() {
    let mut forest = Forest::new();
    let entry = forest.entry();
    let used = forest.add_node(NodeData::TimeWait { duration_secs: 1 });
    let nested = forest.add_node(NodeData::TimeWait { duration_secs: 2 });
    let orphan = forest.add_node(NodeData::TimeWait { duration_secs: 3 });
    forest.connect_slot(entry, SlotRef::Body, used).unwrap();
    forest.connect_next(used, nested).unwrap();

    mark_unused(&mut forest, entry);
    for (id, node) in forest.iter() {
        assert_eq!(node.flags.unused, id == orphan, "node {id}");
    }
}

#[test]
fn test_loop_warning_is_monotone_under_edits() {
    let mut forest = Forest::new();
    let entry = forest.entry();
    let cond = forest.add_node(NodeData::conditional_dynamic());
    forest.connect_slot(entry, SlotRef::Body, cond).unwrap();

    mark_warnings(&mut forest);
    assert!(!forest.node(cond).unwrap().flags.loop_inside);

    // Adding a Loop anywhere inside the subtree sets the warning.
    let lp = forest.add_node(NodeData::loop_statement());
    forest.connect_slot(cond, SlotRef::Branch(0), lp).unwrap();
    mark_warnings(&mut forest);
    assert!(forest.node(cond).unwrap().flags.loop_inside);

    // Removing it clears the warning again.
    forest.delete_chain(lp).unwrap();
    mark_warnings(&mut forest);
    assert!(!forest.node(cond).unwrap().flags.loop_inside);
}

#[test]
fn test_loop_warning_only_on_parallel_and_conditional() {
    let mut forest = Forest::new();
    let entry = forest.entry();
    let outer = forest.add_node(NodeData::loop_statement());
    let inner = forest.add_node(NodeData::loop_statement());
    forest.connect_slot(entry, SlotRef::Body, outer).unwrap();
    forest.connect_slot(outer, SlotRef::Body, inner).unwrap();

    mark_warnings(&mut forest);
    for (_, node) in forest.iter() {
        assert!(!node.flags.loop_inside);
    }
}

#[test]
fn test_passes_are_idempotent() {
    let mut forest = Forest::new();
    let entry = forest.entry();
    let parallel = forest.add_node(NodeData::parallel_static());
    let lp = forest.add_node(NodeData::loop_statement());
    forest.connect_slot(parallel, SlotRef::Branch(0), lp).unwrap();
    forest.connect_slot(entry, SlotRef::Body, parallel).unwrap();
    let track = forest.add_node(NodeData::track_set());
    let _ = track;

    mark_unused(&mut forest, entry);
    mark_warnings(&mut forest);
    mark_unconnected(&mut forest);
    let snapshot = forest.clone();

    mark_unused(&mut forest, entry);
    mark_warnings(&mut forest);
    mark_unconnected(&mut forest);
    assert_eq!(forest, snapshot);
}

#[test]
fn test_flags_translate_to_warning_kinds() {
    let mut forest = Forest::new();
    let entry = forest.entry();
    let track = forest.add_node(NodeData::track_set());

    mark_unused(&mut forest, entry);
    mark_unconnected(&mut forest);

    let kinds: Vec<WarningKind> = forest.node(track).unwrap().flags.kinds().collect();
    assert_eq!(kinds, vec![WarningKind::Unused, WarningKind::Unconnected]);
}
