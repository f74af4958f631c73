use phase_editor_core::{
    BlockContent, Document, DocumentId, Edge, Selection, SelectionTracker,
};

fn doc(contents: Vec<BlockContent>) -> Document {
    Document::from_contents(DocumentId::generate(), "note", contents)
}

#[test]
fn a_fresh_tracker_starts_at_the_first_block() {
    let doc = doc(vec![
        BlockContent::paragraph("a"),
        BlockContent::paragraph("b"),
    ]);
    let tracker = SelectionTracker::new(&doc);
    assert_eq!(
        tracker.current(),
        Selection::collapsed(doc.blocks()[0].id(), 0)
    );
}

#[test]
fn host_selections_are_clamped_to_the_block_text() {
    let doc = doc(vec![BlockContent::paragraph("hi")]);
    let block = doc.blocks()[0].id();
    let mut tracker = SelectionTracker::new(&doc);

    tracker.set(&doc, Selection::range(block, 1, 99));

    assert_eq!(tracker.current(), Selection::range(block, 1, 2));
}

#[test]
fn a_stale_host_selection_keeps_the_previous_caret() {
    let mut doc = doc(vec![
        BlockContent::paragraph("first"),
        BlockContent::paragraph("second"),
        BlockContent::paragraph("third"),
    ]);
    let second = doc.blocks()[1].id();
    let third = doc.blocks()[2].id();
    let mut tracker = SelectionTracker::new(&doc);
    tracker.set(&doc, Selection::collapsed(third, 3));

    doc.remove_block(second).unwrap();

    // The host reports a selection for the removed block; the caret stays
    // where it was instead of jumping to the first block.
    tracker.set(&doc, Selection::collapsed(second, 0));
    assert_eq!(tracker.current(), Selection::collapsed(third, 3));
}

#[test]
fn when_both_blocks_are_gone_the_caret_falls_back_to_the_first_block() {
    let mut doc = doc(vec![
        BlockContent::paragraph("a"),
        BlockContent::paragraph("b"),
    ]);
    let first = doc.blocks()[0].id();
    let second = doc.blocks()[1].id();
    let mut tracker = SelectionTracker::new(&doc);
    tracker.set(&doc, Selection::collapsed(second, 1));

    doc.remove_block(first).unwrap();
    doc.remove_block(second).unwrap();

    tracker.set(&doc, Selection::collapsed(second, 1));
    assert_eq!(
        tracker.current(),
        Selection::collapsed(doc.blocks()[0].id(), 0)
    );
}

#[test]
fn collapse_to_lands_on_the_requested_edge() {
    let doc = doc(vec![BlockContent::paragraph("hello")]);
    let block = doc.blocks()[0].id();
    let mut tracker = SelectionTracker::new(&doc);

    tracker.collapse_to(&doc, block, Edge::End).unwrap();
    assert_eq!(tracker.current(), Selection::collapsed(block, 5));

    tracker.collapse_to(&doc, block, Edge::Start).unwrap();
    assert_eq!(tracker.current(), Selection::collapsed(block, 0));
}
