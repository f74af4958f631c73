use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::block::{BlockContent, Document, DocumentId};
use crate::markup::{self, MarkupError};

pub const CHILD_PAGE_TITLE: &str = "Untitled page";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderId(pub Uuid);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("stored content is malformed: {0}")]
    Malformed(#[from] MarkupError),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("creating child page failed: {0}")]
    ChildCreationFailed(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateDocument {
    pub title: String,
    pub content: String,
    pub folder: Option<FolderId>,
    pub parent: Option<DocumentId>,
}

/// Partial update; `None` fields are left unchanged. `folder` is doubly
/// optional so a document can be moved out of its folder.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<Option<FolderId>>,
    pub pinned: Option<bool>,
    pub sort_order: Option<i64>,
}

/// The slice of a document breadcrumb resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub id: DocumentId,
    pub title: String,
    pub parent: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub id: DocumentId,
    pub title: String,
}

/// The persistence collaborator as the editor core sees it. Every operation
/// except `create_document` is idempotent. The write path is responsible for
/// keeping the parent graph acyclic; the resolver trusts it.
pub trait DocumentStore {
    fn create_document(&mut self, req: CreateDocument) -> Result<Document, StoreError>;
    fn update_document(
        &mut self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, StoreError>;
    fn get_document(&self, id: DocumentId) -> Result<Document, StoreError>;
    fn get_ancestor(&self, id: DocumentId) -> Result<Ancestor, StoreError>;
    fn delete_document(&mut self, id: DocumentId) -> Result<(), StoreError>;
}

/// Creates a fresh sub-page under `parent`: default title, single empty
/// paragraph. The child always gets a new identity, which is what keeps the
/// parent chain acyclic by construction.
pub fn create_child_document(
    store: &mut dyn DocumentStore,
    parent: DocumentId,
) -> Result<Document, PageError> {
    let content = markup::serialize_contents(&[BlockContent::paragraph("")])
        .map_err(StoreError::from)?;
    let child = store.create_document(CreateDocument {
        title: CHILD_PAGE_TITLE.to_string(),
        content,
        folder: None,
        parent: Some(parent),
    })?;
    tracing::debug!(parent = ?parent, child = ?child.id, "created child page");
    Ok(child)
}

/// Walks parent links upward and returns the chain from the root ancestor
/// down to the document itself. A missing ancestor terminates the chain and
/// is not an error; backend failures propagate.
pub fn resolve_ancestor_chain(
    store: &dyn DocumentStore,
    id: DocumentId,
) -> Result<Vec<Crumb>, StoreError> {
    let mut crumbs = Vec::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        match store.get_ancestor(current) {
            Ok(ancestor) => {
                crumbs.insert(
                    0,
                    Crumb {
                        id: ancestor.id,
                        title: ancestor.title,
                    },
                );
                cursor = ancestor.parent;
            }
            Err(StoreError::NotFound) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(crumbs)
}

#[derive(Debug, Clone)]
struct StoredDocument {
    title: String,
    content: String,
    folder: Option<FolderId>,
    parent: Option<DocumentId>,
    pinned: bool,
    sort_order: i64,
    created_at: i64,
    updated_at: i64,
}

/// In-memory `DocumentStore`, used by the tests and useful as a scratch
/// backend. Timestamps come from a logical counter, not wall time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: HashMap<DocumentId, StoredDocument>,
    clock_ms: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn tick(&mut self) -> i64 {
        self.clock_ms += 1;
        self.clock_ms
    }

    fn materialize(&self, id: DocumentId) -> Result<Document, StoreError> {
        let record = self.docs.get(&id).ok_or(StoreError::NotFound)?;
        let contents = markup::parse_contents(&record.content)?;
        let mut doc = Document::from_contents(id, record.title.clone(), contents);
        doc.parent = record.parent;
        doc.pinned = record.pinned;
        doc.sort_order = record.sort_order;
        doc.created_at = record.created_at;
        doc.updated_at = record.updated_at;
        Ok(doc)
    }
}

impl DocumentStore for MemoryStore {
    fn create_document(&mut self, req: CreateDocument) -> Result<Document, StoreError> {
        let id = DocumentId::generate();
        let now = self.tick();
        self.docs.insert(
            id,
            StoredDocument {
                title: req.title,
                content: req.content,
                folder: req.folder,
                parent: req.parent,
                pinned: false,
                sort_order: 0,
                created_at: now,
                updated_at: now,
            },
        );
        self.materialize(id)
    }

    fn update_document(
        &mut self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, StoreError> {
        let now = self.tick();
        let record = self.docs.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(content) = patch.content {
            record.content = content;
        }
        if let Some(folder) = patch.folder {
            record.folder = folder;
        }
        if let Some(pinned) = patch.pinned {
            record.pinned = pinned;
        }
        if let Some(sort_order) = patch.sort_order {
            record.sort_order = sort_order;
        }
        record.updated_at = now;
        self.materialize(id)
    }

    fn get_document(&self, id: DocumentId) -> Result<Document, StoreError> {
        self.materialize(id)
    }

    fn get_ancestor(&self, id: DocumentId) -> Result<Ancestor, StoreError> {
        let record = self.docs.get(&id).ok_or(StoreError::NotFound)?;
        Ok(Ancestor {
            id,
            title: record.title.clone(),
            parent: record.parent,
        })
    }

    fn delete_document(&mut self, id: DocumentId) -> Result<(), StoreError> {
        self.docs.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}
