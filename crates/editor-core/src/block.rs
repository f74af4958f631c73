use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identity of a document, assigned by the persistence collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TagId(pub Uuid);

/// Session-local block identity. Ids are never serialized; they are
/// regenerated when a document is loaded, so they stay unique within one
/// editing session only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

#[derive(Debug, Clone, Default)]
struct BlockIdGen {
    count: u64,
}

impl BlockIdGen {
    fn next_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId(self.count)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("no block with id {0:?} in the current document")]
    InvalidTarget(BlockId),
    #[error("cannot remove the last remaining block")]
    LastBlockViolation,
    #[error("operation does not apply to {0:?} blocks")]
    KindMismatch(BlockKind),
}

/// Style attributes shared by every character of an inline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
}

/// A contiguous span of text sharing one set of marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineRun {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl InlineRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Text,
    Background,
}

/// One style mutation over a run range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOp {
    Toggle(InlineStyle),
    SetLink(Option<String>),
    SetColor {
        channel: ColorChannel,
        color: Option<String>,
    },
}

/// Discriminant-only view of a block, used for conversions and the slash
/// catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedItem,
    NumberedItem,
    TodoItem,
    Toggle,
    Code,
    Quote,
    Callout,
    Divider,
    PageEmbed,
}

/// The content of one structural unit of a document. Closed set: adding a
/// kind means updating every match in the command engine, which the compiler
/// enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph {
        runs: Vec<InlineRun>,
    },
    Heading {
        level: u8,
        runs: Vec<InlineRun>,
    },
    BulletedItem {
        runs: Vec<InlineRun>,
    },
    NumberedItem {
        runs: Vec<InlineRun>,
    },
    TodoItem {
        checked: bool,
        runs: Vec<InlineRun>,
    },
    Toggle {
        expanded: bool,
        summary: Vec<InlineRun>,
        children: Vec<BlockContent>,
    },
    Code {
        runs: Vec<InlineRun>,
    },
    Quote {
        runs: Vec<InlineRun>,
    },
    Callout {
        runs: Vec<InlineRun>,
    },
    Divider,
    PageEmbed {
        target: DocumentId,
    },
}

impl BlockContent {
    pub fn paragraph(text: impl Into<String>) -> Self {
        BlockContent::Paragraph {
            runs: vec![InlineRun::plain(text)],
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        BlockContent::Heading {
            level: level.clamp(1, 3),
            runs: vec![InlineRun::plain(text)],
        }
    }

    pub fn divider() -> Self {
        BlockContent::Divider
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Paragraph { .. } => BlockKind::Paragraph,
            BlockContent::Heading { level: 1, .. } => BlockKind::Heading1,
            BlockContent::Heading { level: 2, .. } => BlockKind::Heading2,
            BlockContent::Heading { .. } => BlockKind::Heading3,
            BlockContent::BulletedItem { .. } => BlockKind::BulletedItem,
            BlockContent::NumberedItem { .. } => BlockKind::NumberedItem,
            BlockContent::TodoItem { .. } => BlockKind::TodoItem,
            BlockContent::Toggle { .. } => BlockKind::Toggle,
            BlockContent::Code { .. } => BlockKind::Code,
            BlockContent::Quote { .. } => BlockKind::Quote,
            BlockContent::Callout { .. } => BlockKind::Callout,
            BlockContent::Divider => BlockKind::Divider,
            BlockContent::PageEmbed { .. } => BlockKind::PageEmbed,
        }
    }

    /// Builds an empty-content block of the given kind, carrying `runs` where
    /// the kind is text-bearing. Returns `None` for `PageEmbed`, which can
    /// only be produced through the page resolver.
    pub fn of_kind(kind: BlockKind, runs: Vec<InlineRun>) -> Option<Self> {
        let runs = if runs.is_empty() {
            vec![InlineRun::plain("")]
        } else {
            runs
        };
        Some(match kind {
            BlockKind::Paragraph => BlockContent::Paragraph { runs },
            BlockKind::Heading1 => BlockContent::Heading { level: 1, runs },
            BlockKind::Heading2 => BlockContent::Heading { level: 2, runs },
            BlockKind::Heading3 => BlockContent::Heading { level: 3, runs },
            BlockKind::BulletedItem => BlockContent::BulletedItem { runs },
            BlockKind::NumberedItem => BlockContent::NumberedItem { runs },
            BlockKind::TodoItem => BlockContent::TodoItem {
                checked: false,
                runs,
            },
            BlockKind::Toggle => BlockContent::Toggle {
                expanded: true,
                summary: runs,
                children: vec![BlockContent::paragraph("")],
            },
            BlockKind::Code => BlockContent::Code { runs },
            BlockKind::Quote => BlockContent::Quote { runs },
            BlockKind::Callout => BlockContent::Callout { runs },
            BlockKind::Divider => BlockContent::Divider,
            BlockKind::PageEmbed => return None,
        })
    }

    pub fn runs(&self) -> Option<&[InlineRun]> {
        match self {
            BlockContent::Paragraph { runs }
            | BlockContent::Heading { runs, .. }
            | BlockContent::BulletedItem { runs }
            | BlockContent::NumberedItem { runs }
            | BlockContent::TodoItem { runs, .. }
            | BlockContent::Code { runs }
            | BlockContent::Quote { runs }
            | BlockContent::Callout { runs } => Some(runs),
            BlockContent::Toggle { summary, .. } => Some(summary),
            BlockContent::Divider | BlockContent::PageEmbed { .. } => None,
        }
    }

    fn runs_mut(&mut self) -> Option<&mut Vec<InlineRun>> {
        match self {
            BlockContent::Paragraph { runs }
            | BlockContent::Heading { runs, .. }
            | BlockContent::BulletedItem { runs }
            | BlockContent::NumberedItem { runs }
            | BlockContent::TodoItem { runs, .. }
            | BlockContent::Code { runs }
            | BlockContent::Quote { runs }
            | BlockContent::Callout { runs } => Some(runs),
            BlockContent::Toggle { summary, .. } => Some(summary),
            BlockContent::Divider | BlockContent::PageEmbed { .. } => None,
        }
    }

    pub fn is_text_bearing(&self) -> bool {
        self.runs().is_some()
    }

    /// Concatenated text of the block's runs. Structural kinds yield "".
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        if let Some(runs) = self.runs() {
            for run in runs {
                out.push_str(&run.text);
            }
        }
        out
    }

    /// Byte length of the block's text content.
    pub fn text_len(&self) -> usize {
        self.runs()
            .map(|runs| runs.iter().map(|r| r.text.len()).sum())
            .unwrap_or(0)
    }

    fn normalize(&mut self) {
        if let Some(runs) = self.runs_mut() {
            merge_adjacent_runs(runs);
        }
        if let BlockContent::Toggle { children, .. } = self {
            if children.is_empty() {
                children.push(BlockContent::paragraph(""));
            }
            for child in children.iter_mut() {
                child.normalize();
            }
        }
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.plain_text());
        if let BlockContent::Toggle { children, .. } = self {
            for child in children {
                out.push(' ');
                child.collect_text(out);
            }
        }
    }
}

/// A block in a document: session-local identity plus content.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    content: BlockContent,
}

impl Block {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }
}

/// One note document: metadata plus the ordered block sequence. The sequence
/// is never empty; mutations that would empty it re-seed a blank paragraph.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub parent: Option<DocumentId>,
    pub pinned: bool,
    pub sort_order: i64,
    /// Epoch milliseconds, maintained by the persistence collaborator.
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: BTreeSet<TagId>,
    blocks: Vec<Block>,
    ids: BlockIdGen,
}

impl Document {
    pub fn new(id: DocumentId, title: impl Into<String>) -> Self {
        Self::from_contents(id, title, vec![BlockContent::paragraph("")])
    }

    pub fn from_contents(
        id: DocumentId,
        title: impl Into<String>,
        contents: Vec<BlockContent>,
    ) -> Self {
        let mut doc = Self {
            id,
            title: title.into(),
            parent: None,
            pinned: false,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
            tags: BTreeSet::new(),
            blocks: Vec::new(),
            ids: BlockIdGen::default(),
        };
        for mut content in contents {
            content.normalize();
            let id = doc.ids.next_id();
            doc.blocks.push(Block { id, content });
        }
        if doc.blocks.is_empty() {
            let id = doc.ids.next_id();
            doc.blocks.push(Block {
                id,
                content: BlockContent::paragraph(""),
            });
        }
        doc
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn contents(&self) -> Vec<BlockContent> {
        self.blocks.iter().map(|b| b.content.clone()).collect()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn content(&self, id: BlockId) -> Result<&BlockContent, EditError> {
        self.block(id)
            .map(|b| &b.content)
            .ok_or(EditError::InvalidTarget(id))
    }

    pub(crate) fn content_mut(&mut self, id: BlockId) -> Result<&mut BlockContent, EditError> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .map(|b| &mut b.content)
            .ok_or(EditError::InvalidTarget(id))
    }

    /// Replaces the target block with `content` under a fresh identity and
    /// returns the new id. Relative order of the other blocks is untouched.
    pub fn replace_block(
        &mut self,
        target: BlockId,
        mut content: BlockContent,
    ) -> Result<BlockId, EditError> {
        let ix = self
            .index_of(target)
            .ok_or(EditError::InvalidTarget(target))?;
        content.normalize();
        let id = self.ids.next_id();
        self.blocks[ix] = Block { id, content };
        Ok(id)
    }

    /// Inserts a new block directly after `after` and returns its id.
    pub fn insert_block_after(
        &mut self,
        after: BlockId,
        mut content: BlockContent,
    ) -> Result<BlockId, EditError> {
        let ix = self
            .index_of(after)
            .ok_or(EditError::InvalidTarget(after))?;
        content.normalize();
        let id = self.ids.next_id();
        self.blocks.insert(ix + 1, Block { id, content });
        Ok(id)
    }

    /// Removes the target block. Removing the sole remaining block would
    /// violate the non-empty invariant; that case is auto-corrected by
    /// seeding a blank paragraph before the removal, so the call still
    /// succeeds and the document ends up as `[paragraph("")]`.
    pub fn remove_block(&mut self, target: BlockId) -> Result<usize, EditError> {
        match self.remove_block_strict(target) {
            Err(EditError::LastBlockViolation) => {
                tracing::debug!(?target, "removing sole block, re-seeding empty paragraph");
                let id = self.ids.next_id();
                self.blocks.push(Block {
                    id,
                    content: BlockContent::paragraph(""),
                });
                self.remove_block_strict(target)
            }
            other => other,
        }
    }

    fn remove_block_strict(&mut self, target: BlockId) -> Result<usize, EditError> {
        let ix = self
            .index_of(target)
            .ok_or(EditError::InvalidTarget(target))?;
        if self.blocks.len() == 1 {
            return Err(EditError::LastBlockViolation);
        }
        self.blocks.remove(ix);
        Ok(ix)
    }

    /// Applies one style mutation over `range` (byte offsets into the
    /// block's concatenated text). Runs are split at the range boundaries,
    /// mutated, then re-merged where marks became equal.
    pub fn set_inline_style(
        &mut self,
        target: BlockId,
        range: Range<usize>,
        op: StyleOp,
    ) -> Result<(), EditError> {
        let content = self.content_mut(target)?;
        let kind = content.kind();
        let runs = content
            .runs_mut()
            .ok_or(EditError::KindMismatch(kind))?;

        let total: usize = runs.iter().map(|r| r.text.len()).sum();
        let start = range.start.min(total);
        let end = range.end.min(total);
        if start >= end {
            return Ok(());
        }

        split_runs_at(runs, end);
        split_runs_at(runs, start);

        let mut offset = 0usize;
        for run in runs.iter_mut() {
            let run_start = offset;
            let run_end = offset + run.text.len();
            offset = run_end;
            if run_start < start || run_end > end || run.text.is_empty() {
                continue;
            }
            match &op {
                StyleOp::Toggle(style) => match style {
                    InlineStyle::Bold => run.marks.bold = !run.marks.bold,
                    InlineStyle::Italic => run.marks.italic = !run.marks.italic,
                    InlineStyle::Underline => run.marks.underline = !run.marks.underline,
                    InlineStyle::Strikethrough => {
                        run.marks.strikethrough = !run.marks.strikethrough
                    }
                    InlineStyle::Code => run.marks.code = !run.marks.code,
                },
                StyleOp::SetLink(url) => run.marks.link = url.clone(),
                StyleOp::SetColor { channel, color } => match channel {
                    ColorChannel::Text => run.marks.text_color = color.clone(),
                    ColorChannel::Background => run.marks.highlight_color = color.clone(),
                },
            }
        }

        merge_adjacent_runs(runs);
        Ok(())
    }

    /// Inserts text at a byte offset into the block's concatenated text,
    /// inheriting the marks of the run the offset falls in.
    pub fn insert_text(
        &mut self,
        target: BlockId,
        offset: usize,
        text: &str,
    ) -> Result<(), EditError> {
        if text.is_empty() {
            return Ok(());
        }
        let content = self.content_mut(target)?;
        let kind = content.kind();
        let runs = content
            .runs_mut()
            .ok_or(EditError::KindMismatch(kind))?;

        let total: usize = runs.iter().map(|r| r.text.len()).sum();
        let mut offset = offset.min(total);
        let mut target_ix = runs.len().saturating_sub(1);
        for (ix, run) in runs.iter().enumerate() {
            if offset <= run.text.len() {
                target_ix = ix;
                break;
            }
            offset -= run.text.len();
        }
        let at = clamp_to_char_boundary(&runs[target_ix].text, offset);
        runs[target_ix].text.insert_str(at, text);
        merge_adjacent_runs(runs);
        Ok(())
    }

    /// Removes the byte range from the block's concatenated text.
    pub fn remove_text(&mut self, target: BlockId, range: Range<usize>) -> Result<(), EditError> {
        let content = self.content_mut(target)?;
        let kind = content.kind();
        let runs = content
            .runs_mut()
            .ok_or(EditError::KindMismatch(kind))?;

        let total: usize = runs.iter().map(|r| r.text.len()).sum();
        let start = range.start.min(total);
        let end = range.end.min(total);
        if start >= end {
            return Ok(());
        }

        let mut offset = 0usize;
        for run in runs.iter_mut() {
            let run_start = offset;
            let run_end = offset + run.text.len();
            offset = run_end;
            if run_end <= start || run_start >= end {
                continue;
            }
            let local_start =
                clamp_to_char_boundary(&run.text, start.saturating_sub(run_start));
            let local_end = clamp_to_char_boundary(
                &run.text,
                (end - run_start).min(run.text.len()),
            );
            run.text.replace_range(local_start..local_end, "");
        }

        merge_adjacent_runs(runs);
        Ok(())
    }

    /// Clears all text of the block, keeping the kind.
    pub fn clear_text(&mut self, target: BlockId) -> Result<(), EditError> {
        let len = self.content(target)?.text_len();
        self.remove_text(target, 0..len)
    }

    /// Whitespace-separated word count over every text-bearing block,
    /// including toggle bodies.
    pub fn word_count(&self) -> usize {
        let mut text = String::new();
        for block in &self.blocks {
            block.content.collect_text(&mut text);
            text.push(' ');
        }
        text.split_whitespace().count()
    }
}

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

/// Splits the run containing `offset` in two so that `offset` lands on a run
/// boundary. No-op when it already does.
fn split_runs_at(runs: &mut Vec<InlineRun>, offset: usize) {
    let mut cursor = 0usize;
    for ix in 0..runs.len() {
        let len = runs[ix].text.len();
        if offset > cursor && offset < cursor + len {
            let local = clamp_to_char_boundary(&runs[ix].text, offset - cursor);
            if local == 0 || local == len {
                return;
            }
            let tail = runs[ix].text.split_off(local);
            let marks = runs[ix].marks.clone();
            runs.insert(ix + 1, InlineRun::styled(tail, marks));
            return;
        }
        cursor += len;
    }
}

/// Drops empty runs and concatenates neighbours with equal marks. Always
/// leaves at least one run so the cursor has somewhere to land.
fn merge_adjacent_runs(runs: &mut Vec<InlineRun>) {
    runs.retain(|r| !r.text.is_empty());
    let mut ix = 1;
    while ix < runs.len() {
        if runs[ix - 1].marks == runs[ix].marks {
            let tail = runs.remove(ix);
            runs[ix - 1].text.push_str(&tail.text);
        } else {
            ix += 1;
        }
    }
    if runs.is_empty() {
        runs.push(InlineRun::plain(""));
    }
}
