use std::collections::VecDeque;
use std::ops::Range;

use crate::block::{
    BlockContent, BlockId, BlockKind, ColorChannel, Document, DocumentId, EditError, InlineStyle,
    StyleOp,
};
use crate::markup;
use crate::pages::{DocumentStore, PageError, create_child_document};
use crate::selection::{Edge, Selection, SelectionTracker};
use crate::slash::SlashState;

/// A named editing operation, dispatched against the current document and
/// selection. The set is closed; the engine matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ConvertBlockType { block: BlockId, kind: BlockKind },
    InsertBlock { after: BlockId, kind: BlockKind },
    ToggleInlineStyle(InlineStyle),
    SetInlineColor {
        channel: ColorChannel,
        color: Option<String>,
    },
    SetLink { url: Option<String> },
    ToggleTodoChecked { block: BlockId },
}

/// What the core tells its host. `Changed` drives autosave and list
/// re-rendering, `Navigate` asks the host to open another document.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Changed {
        document: DocumentId,
        title: String,
        content: String,
    },
    Navigate { target: DocumentId },
    SaveRequested,
}

/// Keyboard shortcuts the host forwards instead of interpreting itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Bold,
    Italic,
    Underline,
    InlineCode,
    Save,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnterOutcome {
    /// Heading/divider rule: a fresh paragraph was inserted after the block
    /// and the caret moved into it.
    ParagraphInserted(BlockId),
    /// The slash menu consumed the key. Carries the created child document
    /// id when the committed entry was a page embed.
    SlashCommitted(Option<DocumentId>),
    /// No special rule applies; the host performs its native line insertion.
    Default,
}

/// Per-document editing session: the document, the selection tracker, the
/// slash menu state and the outgoing event queue. One `Editor` is built per
/// opened document and dropped on navigation, so no transient UI state ever
/// leaks between documents.
pub struct Editor {
    doc: Document,
    tracker: SelectionTracker,
    slash: SlashState,
    events: VecDeque<EditorEvent>,
}

impl Editor {
    pub fn open(doc: Document) -> Self {
        let tracker = SelectionTracker::new(&doc);
        Self {
            doc,
            tracker,
            slash: SlashState::default(),
            events: VecDeque::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.tracker.current()
    }

    pub fn slash_state(&self) -> &SlashState {
        &self.slash
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain(..).collect()
    }

    /// Accepts the host-reported selection. Moving off the slash anchor
    /// closes the menu without committing.
    pub fn set_selection(&mut self, selection: Selection) {
        self.tracker.set(&self.doc, selection);
        if self
            .slash
            .anchor()
            .is_some_and(|anchor| anchor != self.tracker.current().block)
        {
            self.slash.cancel();
        }
    }

    pub fn collapse_to(&mut self, block: BlockId, edge: Edge) -> Result<(), EditError> {
        self.tracker.collapse_to(&self.doc, block, edge)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.doc.title = title.into();
        self.emit_changed();
    }

    /// Dispatches one command. `InvalidTarget` is a sequencing anomaly, not
    /// a user error: it is logged and absorbed as a no-op. `KindMismatch`
    /// is returned to the caller with the document unchanged.
    pub fn dispatch(&mut self, command: Command) -> Result<(), EditError> {
        tracing::debug!(?command, "dispatch");
        let result = match command {
            Command::ConvertBlockType { block, kind } => self.convert_block_type(block, kind),
            Command::InsertBlock { after, kind } => self.insert_block(after, kind),
            Command::ToggleInlineStyle(style) => self.style_selection(StyleOp::Toggle(style)),
            Command::SetInlineColor { channel, color } => {
                self.style_selection(StyleOp::SetColor { channel, color })
            }
            Command::SetLink { url } => self.style_selection(StyleOp::SetLink(url)),
            Command::ToggleTodoChecked { block } => self.toggle_todo_checked(block),
        };
        self.finish(result)
    }

    pub fn shortcut(&mut self, shortcut: Shortcut) -> Result<(), EditError> {
        match shortcut {
            Shortcut::Bold => self.dispatch(Command::ToggleInlineStyle(InlineStyle::Bold)),
            Shortcut::Italic => self.dispatch(Command::ToggleInlineStyle(InlineStyle::Italic)),
            Shortcut::Underline => {
                self.dispatch(Command::ToggleInlineStyle(InlineStyle::Underline))
            }
            Shortcut::InlineCode => self.dispatch(Command::ToggleInlineStyle(InlineStyle::Code)),
            Shortcut::Save => {
                self.events.push_back(EditorEvent::SaveRequested);
                Ok(())
            }
        }
    }

    /// Inserts typed text at the caret, replacing the selected range first
    /// when the selection is not collapsed. Re-evaluates the slash menu.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        let sel = self.tracker.current();
        let result = self.insert_text_inner(sel, text);
        self.finish(result)
    }

    fn insert_text_inner(&mut self, sel: Selection, text: &str) -> Result<bool, EditError> {
        let range = sel.ordered();
        if !range.is_empty() {
            self.doc.remove_text(sel.block, range.clone())?;
        }
        self.doc.insert_text(sel.block, range.start, text)?;
        self.tracker.set(
            &self.doc,
            Selection::collapsed(sel.block, range.start + text.len()),
        );
        self.refresh_slash();
        Ok(true)
    }

    /// Removes a text range from a block, collapsing the caret to the start
    /// of the removed range. Re-evaluates the slash menu.
    pub fn remove_text(&mut self, block: BlockId, range: Range<usize>) -> Result<(), EditError> {
        let start = range.start;
        let result = match self.doc.remove_text(block, range) {
            Ok(()) => {
                self.tracker
                    .set(&self.doc, Selection::collapsed(block, start));
                self.refresh_slash();
                Ok(true)
            }
            Err(err) => Err(err),
        };
        self.finish(result)
    }

    /// Removes a block; the caret collapses to the nearest surviving block
    /// boundary. Removing the sole block leaves one empty paragraph.
    pub fn remove_block(&mut self, block: BlockId) -> Result<(), EditError> {
        let result = match self.doc.remove_block(block) {
            Ok(ix) => {
                self.tracker.after_removal(&self.doc, ix);
                Ok(true)
            }
            Err(err) => Err(err),
        };
        self.finish(result)
    }

    /// The Enter key. The slash menu takes priority; after that, headings
    /// and dividers get a trailing paragraph instead of being extended.
    /// Every other kind falls back to host-default line insertion.
    pub fn key_enter(&mut self, store: &mut dyn DocumentStore) -> Result<EnterOutcome, PageError> {
        if self.slash.is_active() {
            return self.slash_commit(store).map(EnterOutcome::SlashCommitted);
        }
        let sel = self.tracker.current();
        let Ok(content) = self.doc.content(sel.block) else {
            return Ok(EnterOutcome::Default);
        };
        match content.kind() {
            BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 | BlockKind::Divider => {
                let Ok(id) = self
                    .doc
                    .insert_block_after(sel.block, BlockContent::paragraph(""))
                else {
                    return Ok(EnterOutcome::Default);
                };
                let _ = self.tracker.collapse_to(&self.doc, id, Edge::Start);
                self.emit_changed();
                Ok(EnterOutcome::ParagraphInserted(id))
            }
            _ => Ok(EnterOutcome::Default),
        }
    }

    /// Arrow keys move the slash highlight while the menu is open. Returns
    /// whether the key was consumed.
    pub fn key_arrow_down(&mut self) -> bool {
        if self.slash.is_active() {
            self.slash.move_down();
            true
        } else {
            false
        }
    }

    pub fn key_arrow_up(&mut self) -> bool {
        if self.slash.is_active() {
            self.slash.move_up();
            true
        } else {
            false
        }
    }

    /// Escape closes the slash menu without committing. Returns whether the
    /// key was consumed.
    pub fn key_escape(&mut self) -> bool {
        if self.slash.is_active() {
            self.slash.cancel();
            true
        } else {
            false
        }
    }

    /// Commits the highlighted slash entry: the anchor's slash text is
    /// cleared and the block converted in place, except for page entries,
    /// which create the child document first. If child creation fails the
    /// document, including the slash text, is left untouched.
    pub fn slash_commit(
        &mut self,
        store: &mut dyn DocumentStore,
    ) -> Result<Option<DocumentId>, PageError> {
        let (anchor, entry) = match (self.slash.anchor(), self.slash.highlighted_entry()) {
            (Some(anchor), Some(entry)) => (anchor, entry),
            _ => {
                self.slash.cancel();
                return Ok(None);
            }
        };

        if entry.kind == BlockKind::PageEmbed {
            let child = create_child_document(store, self.doc.id)?;
            let result = self.commit_page_embed(anchor, child.id);
            self.slash.cancel();
            return match result {
                Ok(()) => {
                    self.emit_changed();
                    Ok(Some(child.id))
                }
                Err(err) => {
                    tracing::warn!(?anchor, %err, "slash anchor vanished before commit");
                    Ok(None)
                }
            };
        }

        let result = self.commit_conversion(anchor, entry.kind);
        self.slash.cancel();
        match result {
            Ok(()) => self.emit_changed(),
            Err(err) => tracing::warn!(?anchor, %err, "slash anchor vanished before commit"),
        }
        Ok(None)
    }

    fn commit_page_embed(&mut self, anchor: BlockId, target: DocumentId) -> Result<(), EditError> {
        let new_id = self
            .doc
            .replace_block(anchor, BlockContent::PageEmbed { target })?;
        let para = self
            .doc
            .insert_block_after(new_id, BlockContent::paragraph(""))?;
        self.tracker.collapse_to(&self.doc, para, Edge::Start)
    }

    fn commit_conversion(&mut self, anchor: BlockId, kind: BlockKind) -> Result<(), EditError> {
        self.doc.clear_text(anchor)?;
        match kind {
            BlockKind::Divider => {
                let new_id = self.doc.replace_block(anchor, BlockContent::divider())?;
                let para = self
                    .doc
                    .insert_block_after(new_id, BlockContent::paragraph(""))?;
                self.tracker.collapse_to(&self.doc, para, Edge::Start)?;
            }
            _ => {
                let next = BlockContent::of_kind(kind, Vec::new())
                    .ok_or(EditError::KindMismatch(kind))?;
                let new_id = self.doc.replace_block(anchor, next)?;
                self.tracker.after_replace(&self.doc, new_id, false);
            }
        }
        Ok(())
    }

    /// Toolbar path for embedding a sub-page: creates the child document
    /// first, then inserts the embed block directly after `after` with a
    /// trailing paragraph holding the caret. A store failure leaves the
    /// document untouched; a vanished anchor is a logged no-op that creates
    /// nothing.
    pub fn insert_page_embed(
        &mut self,
        after: BlockId,
        store: &mut dyn DocumentStore,
    ) -> Result<Option<DocumentId>, PageError> {
        if self.doc.index_of(after).is_none() {
            tracing::warn!(?after, "operation referenced a block missing from the document");
            return Ok(None);
        }
        let child = create_child_document(store, self.doc.id)?;
        match self.embed_after(after, child.id) {
            Ok(()) => {
                self.emit_changed();
                Ok(Some(child.id))
            }
            Err(err) => {
                tracing::warn!(?after, %err, "embed anchor vanished mid-insert");
                Ok(None)
            }
        }
    }

    fn embed_after(&mut self, after: BlockId, target: DocumentId) -> Result<(), EditError> {
        let embed = self
            .doc
            .insert_block_after(after, BlockContent::PageEmbed { target })?;
        let para = self
            .doc
            .insert_block_after(embed, BlockContent::paragraph(""))?;
        self.tracker.collapse_to(&self.doc, para, Edge::Start)
    }

    /// A click on a page-embed block: asks the host to navigate to the
    /// embedded document.
    pub fn activate_block(&mut self, block: BlockId) -> Result<(), EditError> {
        match self.doc.content(block)? {
            BlockContent::PageEmbed { target } => {
                let target = *target;
                self.events.push_back(EditorEvent::Navigate { target });
                Ok(())
            }
            other => Err(EditError::KindMismatch(other.kind())),
        }
    }

    /// A click on a breadcrumb entry.
    pub fn navigate_to(&mut self, target: DocumentId) {
        self.events.push_back(EditorEvent::Navigate { target });
    }

    fn convert_block_type(&mut self, block: BlockId, kind: BlockKind) -> Result<bool, EditError> {
        if kind == BlockKind::PageEmbed {
            return Err(EditError::KindMismatch(BlockKind::PageEmbed));
        }
        let content = self.doc.content(block)?;
        if content.kind() == kind {
            return Ok(false);
        }
        let had_text = content.is_text_bearing();
        let runs = content.runs().map(<[_]>::to_vec).unwrap_or_default();
        let next =
            BlockContent::of_kind(kind, runs).ok_or(EditError::KindMismatch(kind))?;
        let preserved = had_text && next.is_text_bearing();
        let new_id = self.doc.replace_block(block, next)?;
        self.tracker.after_replace(&self.doc, new_id, preserved);
        Ok(true)
    }

    fn insert_block(&mut self, after: BlockId, kind: BlockKind) -> Result<bool, EditError> {
        // Page embeds go through insert_page_embed or slash_commit so the
        // child document exists before anything is inserted.
        let content = BlockContent::of_kind(kind, Vec::new())
            .ok_or(EditError::KindMismatch(kind))?;
        let id = self.doc.insert_block_after(after, content)?;
        self.tracker.collapse_to(&self.doc, id, Edge::Start)?;
        Ok(true)
    }

    fn style_selection(&mut self, op: StyleOp) -> Result<bool, EditError> {
        let sel = self.tracker.current();
        let range = sel.ordered();
        if range.is_empty() {
            return Ok(false);
        }
        self.doc.set_inline_style(sel.block, range, op)?;
        self.tracker.set(&self.doc, sel);
        Ok(true)
    }

    fn toggle_todo_checked(&mut self, block: BlockId) -> Result<bool, EditError> {
        match self.doc.content_mut(block)? {
            BlockContent::TodoItem { checked, .. } => {
                *checked = !*checked;
                Ok(true)
            }
            other => Err(EditError::KindMismatch(other.kind())),
        }
    }

    fn refresh_slash(&mut self) {
        let sel = self.tracker.current();
        match self.doc.content(sel.block) {
            Ok(content) => self.slash.refresh(sel.block, &content.plain_text()),
            Err(_) => self.slash.cancel(),
        }
    }

    fn finish(&mut self, result: Result<bool, EditError>) -> Result<(), EditError> {
        match result {
            Ok(true) => {
                self.emit_changed();
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(EditError::InvalidTarget(id)) => {
                tracing::warn!(?id, "operation referenced a block missing from the document");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn emit_changed(&mut self) {
        match markup::serialize_contents(&self.doc.contents()) {
            Ok(content) => self.events.push_back(EditorEvent::Changed {
                document: self.doc.id,
                title: self.doc.title.clone(),
                content,
            }),
            Err(err) => tracing::warn!(%err, "failed to serialize document content"),
        }
    }
}
