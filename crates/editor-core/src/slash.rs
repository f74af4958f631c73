use crate::block::{BlockId, BlockKind};

/// One insertable entry of the slash menu. Filtering matches the query
/// against the label and the keyword aliases, case-insensitively.
#[derive(Debug, PartialEq, Eq)]
pub struct SlashEntry {
    pub kind: BlockKind,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

/// The static slash-menu catalog, in display order.
pub const SLASH_CATALOG: &[SlashEntry] = &[
    SlashEntry {
        kind: BlockKind::Paragraph,
        label: "Text",
        keywords: &["text", "plain", "paragraph"],
    },
    SlashEntry {
        kind: BlockKind::Heading1,
        label: "Heading 1",
        keywords: &["heading", "h1", "title"],
    },
    SlashEntry {
        kind: BlockKind::Heading2,
        label: "Heading 2",
        keywords: &["heading", "h2"],
    },
    SlashEntry {
        kind: BlockKind::Heading3,
        label: "Heading 3",
        keywords: &["heading", "h3"],
    },
    SlashEntry {
        kind: BlockKind::BulletedItem,
        label: "Bulleted list",
        keywords: &["bullet", "ul", "list"],
    },
    SlashEntry {
        kind: BlockKind::NumberedItem,
        label: "Numbered list",
        keywords: &["number", "ol", "list"],
    },
    SlashEntry {
        kind: BlockKind::TodoItem,
        label: "To-do",
        keywords: &["todo", "task", "checkbox"],
    },
    SlashEntry {
        kind: BlockKind::Toggle,
        label: "Toggle",
        keywords: &["toggle", "collapsible"],
    },
    SlashEntry {
        kind: BlockKind::Code,
        label: "Code",
        keywords: &["code", "pre", "snippet"],
    },
    SlashEntry {
        kind: BlockKind::Quote,
        label: "Quote",
        keywords: &["quote", "blockquote"],
    },
    SlashEntry {
        kind: BlockKind::Callout,
        label: "Callout",
        keywords: &["callout", "info", "banner"],
    },
    SlashEntry {
        kind: BlockKind::Divider,
        label: "Divider",
        keywords: &["divider", "hr", "rule", "separator"],
    },
    SlashEntry {
        kind: BlockKind::PageEmbed,
        label: "Page",
        keywords: &["page", "subpage", "embed"],
    },
];

/// Catalog entries matching `query`. An empty query matches everything.
pub fn filter_entries(query: &str) -> Vec<&'static SlashEntry> {
    let query = query.to_lowercase();
    SLASH_CATALOG
        .iter()
        .filter(|entry| {
            query.is_empty()
                || entry.label.to_lowercase().contains(&query)
                || entry.keywords.iter().any(|k| k.contains(&query))
        })
        .collect()
}

/// Slash-menu state machine. Starts `Inactive`; becomes `Active` when the
/// current block's text gains a leading `/`; every active session ends by
/// committing or cancelling. Menu state never survives a block change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlashState {
    #[default]
    Inactive,
    Active {
        anchor: BlockId,
        query: String,
        highlighted: usize,
    },
}

impl SlashState {
    pub fn is_active(&self) -> bool {
        matches!(self, SlashState::Active { .. })
    }

    pub fn anchor(&self) -> Option<BlockId> {
        match self {
            SlashState::Active { anchor, .. } => Some(*anchor),
            SlashState::Inactive => None,
        }
    }

    /// Re-evaluates against the current block's full text. Activates on a
    /// leading `/`, deactivates when the prefix is gone or the filtered list
    /// would be empty. The highlight resets on every content edit.
    pub fn refresh(&mut self, block: BlockId, text: &str) {
        match text.strip_prefix('/') {
            Some(query) if !filter_entries(query).is_empty() => {
                *self = SlashState::Active {
                    anchor: block,
                    query: query.to_string(),
                    highlighted: 0,
                };
            }
            _ => *self = SlashState::Inactive,
        }
    }

    pub fn cancel(&mut self) {
        *self = SlashState::Inactive;
    }

    pub fn entries(&self) -> Vec<&'static SlashEntry> {
        match self {
            SlashState::Active { query, .. } => filter_entries(query),
            SlashState::Inactive => Vec::new(),
        }
    }

    pub fn highlighted_entry(&self) -> Option<&'static SlashEntry> {
        match self {
            SlashState::Active {
                query, highlighted, ..
            } => filter_entries(query).get(*highlighted).copied(),
            SlashState::Inactive => None,
        }
    }

    pub fn move_down(&mut self) {
        if let SlashState::Active {
            query, highlighted, ..
        } = self
        {
            let count = filter_entries(query).len();
            *highlighted = (*highlighted + 1).min(count.saturating_sub(1));
        }
    }

    pub fn move_up(&mut self) {
        if let SlashState::Active { highlighted, .. } = self {
            *highlighted = highlighted.saturating_sub(1);
        }
    }
}
