use crate::block::{Block, BlockId, Document, EditError};

/// The caret or selected range: owning block plus a byte-offset range into
/// the block's concatenated text. `start == end` is a collapsed caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub block: BlockId,
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn collapsed(block: BlockId, offset: usize) -> Self {
        Self {
            block,
            start: offset,
            end: offset,
        }
    }

    pub fn range(block: BlockId, start: usize, end: usize) -> Self {
        Self { block, start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// The range with its endpoints in document order.
    pub fn ordered(&self) -> std::ops::Range<usize> {
        if self.start <= self.end {
            self.start..self.end
        } else {
            self.end..self.start
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// Tracks where the caret lives. The tracker only observes what the host's
/// native selection reports and translates it into block-model terms; it is
/// the single source of truth the command engine reads before any operation.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    current: Selection,
}

impl SelectionTracker {
    pub fn new(doc: &Document) -> Self {
        // A document always has at least one block.
        let first = doc.blocks()[0].id();
        Self {
            current: Selection::collapsed(first, 0),
        }
    }

    pub fn current(&self) -> Selection {
        self.current
    }

    /// Accepts a host-reported selection, clamped to the document. A
    /// selection pointing at a vanished block keeps the previous caret when
    /// its block survives, so a stale host report does not yank the cursor
    /// to the top; only when both blocks are gone does it collapse to the
    /// start of the first block.
    pub fn set(&mut self, doc: &Document, selection: Selection) {
        self.current = match doc.block(selection.block) {
            Some(block) => clamp_to(selection, block),
            None => match doc.block(self.current.block) {
                Some(block) => clamp_to(self.current, block),
                None => Selection::collapsed(doc.blocks()[0].id(), 0),
            },
        };
    }

    pub fn collapse_to(
        &mut self,
        doc: &Document,
        block: BlockId,
        edge: Edge,
    ) -> Result<(), EditError> {
        let content = doc.content(block)?;
        let offset = match edge {
            Edge::Start => 0,
            Edge::End => content.text_len(),
        };
        self.current = Selection::collapsed(block, offset);
        Ok(())
    }

    /// Repositions the caret into the block produced by a replacement: end
    /// of content when the content survived the operation, start when it was
    /// cleared.
    pub fn after_replace(&mut self, doc: &Document, new_block: BlockId, preserved: bool) {
        let edge = if preserved { Edge::End } else { Edge::Start };
        if self.collapse_to(doc, new_block, edge).is_err() {
            self.current = Selection::collapsed(doc.blocks()[0].id(), 0);
        }
    }

    /// Collapses to the nearest surviving block boundary after the block at
    /// `removed_index` was removed: end of the previous block, or start of
    /// the first when there is no previous.
    pub fn after_removal(&mut self, doc: &Document, removed_index: usize) {
        let blocks = doc.blocks();
        self.current = if removed_index > 0 && removed_index <= blocks.len() {
            let prev = &blocks[removed_index - 1];
            Selection::collapsed(prev.id(), prev.content().text_len())
        } else {
            Selection::collapsed(blocks[0].id(), 0)
        };
    }
}

fn clamp_to(selection: Selection, block: &Block) -> Selection {
    let len = block.content().text_len();
    Selection {
        block: block.id(),
        start: selection.start.min(len),
        end: selection.end.min(len),
    }
}
