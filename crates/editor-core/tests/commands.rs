use phase_editor_core::{
    Ancestor, BlockContent, BlockKind, CHILD_PAGE_TITLE, Command, CreateDocument, Document,
    DocumentId, DocumentPatch, DocumentStore, EditError, Editor, EditorEvent, EnterOutcome,
    InlineStyle, MemoryStore, PageError, Selection, Shortcut, StoreError,
};

fn open(contents: Vec<BlockContent>) -> Editor {
    Editor::open(Document::from_contents(
        DocumentId::generate(),
        "note",
        contents,
    ))
}

#[test]
fn convert_preserves_text_and_places_the_caret_at_the_end() {
    let mut editor = open(vec![BlockContent::paragraph("title text")]);
    let block = editor.document().blocks()[0].id();

    editor
        .dispatch(Command::ConvertBlockType {
            block,
            kind: BlockKind::Heading1,
        })
        .unwrap();

    let converted = &editor.document().blocks()[0];
    assert_ne!(converted.id(), block);
    assert_eq!(converted.content(), &BlockContent::heading(1, "title text"));

    let sel = editor.selection();
    assert_eq!(sel.block, converted.id());
    assert!(sel.is_collapsed());
    assert_eq!(sel.start, "title text".len());
}

#[test]
fn converting_to_the_current_kind_is_a_no_op() {
    let mut editor = open(vec![BlockContent::paragraph("x")]);
    let block = editor.document().blocks()[0].id();

    editor
        .dispatch(Command::ConvertBlockType {
            block,
            kind: BlockKind::Heading1,
        })
        .unwrap();
    editor.drain_events();
    let converted = editor.document().blocks()[0].id();

    // Second conversion to the same kind performs no mutation.
    editor
        .dispatch(Command::ConvertBlockType {
            block: converted,
            kind: BlockKind::Heading1,
        })
        .unwrap();

    assert_eq!(editor.document().blocks()[0].id(), converted);
    assert!(editor.drain_events().is_empty());
}

#[test]
fn convert_to_page_embed_is_rejected() {
    let mut editor = open(vec![BlockContent::paragraph("x")]);
    let block = editor.document().blocks()[0].id();

    let err = editor
        .dispatch(Command::ConvertBlockType {
            block,
            kind: BlockKind::PageEmbed,
        })
        .unwrap_err();
    assert_eq!(err, EditError::KindMismatch(BlockKind::PageEmbed));
    assert_eq!(
        editor.document().blocks()[0].content(),
        &BlockContent::paragraph("x")
    );
}

#[test]
fn commands_against_a_vanished_block_are_logged_no_ops() {
    let mut editor = open(vec![
        BlockContent::paragraph("a"),
        BlockContent::paragraph("b"),
    ]);
    let second = editor.document().blocks()[1].id();
    editor.remove_block(second).unwrap();
    editor.drain_events();

    // The block is gone; the command neither errors nor mutates.
    editor
        .dispatch(Command::ConvertBlockType {
            block: second,
            kind: BlockKind::Heading1,
        })
        .unwrap();
    assert_eq!(editor.document().blocks().len(), 1);
    assert!(editor.drain_events().is_empty());
}

#[test]
fn toggle_todo_checked_flips_in_place() {
    let mut editor = open(vec![BlockContent::TodoItem {
        checked: false,
        runs: vec![phase_editor_core::InlineRun::plain("task")],
    }]);
    let block = editor.document().blocks()[0].id();

    editor
        .dispatch(Command::ToggleTodoChecked { block })
        .unwrap();

    // Checking a todo is not a conversion; the identity is stable.
    assert_eq!(editor.document().blocks()[0].id(), block);
    let BlockContent::TodoItem { checked, .. } = editor.document().blocks()[0].content() else {
        panic!("expected todo block");
    };
    assert!(*checked);
}

#[test]
fn toggle_todo_checked_on_a_paragraph_is_a_kind_mismatch() {
    let mut editor = open(vec![BlockContent::paragraph("not a todo")]);
    let block = editor.document().blocks()[0].id();

    let err = editor
        .dispatch(Command::ToggleTodoChecked { block })
        .unwrap_err();
    assert_eq!(err, EditError::KindMismatch(BlockKind::Paragraph));
}

#[test]
fn bold_shortcut_styles_the_selected_range() {
    let mut editor = open(vec![BlockContent::paragraph("hello world")]);
    let block = editor.document().blocks()[0].id();
    editor.set_selection(Selection::range(block, 0, 5));

    editor.shortcut(Shortcut::Bold).unwrap();

    let runs = editor.document().blocks()[0]
        .content()
        .runs()
        .unwrap()
        .to_vec();
    assert!(runs[0].marks.bold);
    assert_eq!(runs[0].text, "hello");
    // The selection survives so a second toggle hits the same range.
    assert_eq!(editor.selection(), Selection::range(block, 0, 5));
}

#[test]
fn style_commands_with_a_collapsed_selection_do_nothing() {
    let mut editor = open(vec![BlockContent::paragraph("hello")]);
    let block = editor.document().blocks()[0].id();
    editor.set_selection(Selection::collapsed(block, 2));

    editor
        .dispatch(Command::ToggleInlineStyle(InlineStyle::Bold))
        .unwrap();

    assert_eq!(
        editor.document().blocks()[0].content(),
        &BlockContent::paragraph("hello")
    );
    assert!(editor.drain_events().is_empty());
}

#[test]
fn enter_after_a_heading_inserts_a_paragraph() {
    let mut store = MemoryStore::new();
    let mut editor = open(vec![BlockContent::heading(1, "title")]);
    let block = editor.document().blocks()[0].id();
    editor.set_selection(Selection::collapsed(block, 5));

    let outcome = editor.key_enter(&mut store).unwrap();

    let EnterOutcome::ParagraphInserted(id) = outcome else {
        panic!("expected paragraph insertion");
    };
    assert_eq!(editor.document().blocks().len(), 2);
    assert_eq!(editor.document().index_of(id), Some(1));
    assert_eq!(editor.selection(), Selection::collapsed(id, 0));
}

#[test]
fn enter_after_a_divider_inserts_a_paragraph() {
    let mut store = MemoryStore::new();
    let mut editor = open(vec![
        BlockContent::paragraph("above"),
        BlockContent::divider(),
    ]);
    let divider = editor.document().blocks()[1].id();
    editor.set_selection(Selection::collapsed(divider, 0));

    let outcome = editor.key_enter(&mut store).unwrap();

    assert!(matches!(outcome, EnterOutcome::ParagraphInserted(_)));
    assert_eq!(editor.document().blocks().len(), 3);
    assert_eq!(editor.document().blocks()[2].kind(), BlockKind::Paragraph);
}

#[test]
fn enter_in_a_paragraph_falls_back_to_the_host_default() {
    let mut store = MemoryStore::new();
    let mut editor = open(vec![BlockContent::paragraph("body")]);

    let outcome = editor.key_enter(&mut store).unwrap();

    assert_eq!(outcome, EnterOutcome::Default);
    assert_eq!(editor.document().blocks().len(), 1);
}

#[test]
fn mutations_emit_changed_events_with_serialized_content() {
    let mut editor = open(vec![BlockContent::paragraph("")]);
    let doc_id = editor.document().id;

    editor.insert_text("hi").unwrap();

    let events = editor.drain_events();
    assert_eq!(events.len(), 1);
    let EditorEvent::Changed {
        document,
        title,
        content,
    } = &events[0]
    else {
        panic!("expected a change event");
    };
    assert_eq!(*document, doc_id);
    assert_eq!(title, "note");
    let parsed = phase_editor_core::parse_contents(content).unwrap();
    assert_eq!(parsed, vec![BlockContent::paragraph("hi")]);
}

#[test]
fn save_shortcut_emits_a_save_request() {
    let mut editor = open(vec![BlockContent::paragraph("x")]);
    editor.shortcut(Shortcut::Save).unwrap();
    assert_eq!(editor.drain_events(), vec![EditorEvent::SaveRequested]);
}

#[test]
fn typing_over_a_selection_replaces_it() {
    let mut editor = open(vec![BlockContent::paragraph("hello world")]);
    let block = editor.document().blocks()[0].id();
    editor.set_selection(Selection::range(block, 6, 11));

    editor.insert_text("there").unwrap();

    assert_eq!(
        editor.document().blocks()[0].content().plain_text(),
        "hello there"
    );
    assert_eq!(editor.selection(), Selection::collapsed(block, 11));
}

#[test]
fn removing_a_block_moves_the_caret_to_the_previous_block_end() {
    let mut editor = open(vec![
        BlockContent::paragraph("first"),
        BlockContent::paragraph("second"),
    ]);
    let first = editor.document().blocks()[0].id();
    let second = editor.document().blocks()[1].id();

    editor.remove_block(second).unwrap();

    assert_eq!(editor.selection(), Selection::collapsed(first, 5));
}

#[test]
fn insert_page_embed_creates_the_child_before_inserting() {
    let mut store = MemoryStore::new();
    let mut editor = open(vec![BlockContent::paragraph("body")]);
    let first = editor.document().blocks()[0].id();

    let child_id = editor
        .insert_page_embed(first, &mut store)
        .unwrap()
        .unwrap();

    let child = store.get_document(child_id).unwrap();
    assert_eq!(child.title, CHILD_PAGE_TITLE);
    assert_eq!(child.parent, Some(editor.document().id));

    let kinds: Vec<_> = editor.document().blocks().iter().map(|b| b.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Paragraph,
            BlockKind::PageEmbed,
            BlockKind::Paragraph
        ]
    );
    let BlockContent::PageEmbed { target } = editor.document().blocks()[1].content() else {
        panic!("expected page embed");
    };
    assert_eq!(*target, child_id);
    let trailing = editor.document().blocks()[2].id();
    assert_eq!(editor.selection(), Selection::collapsed(trailing, 0));
}

#[test]
fn a_failed_page_embed_insertion_leaves_the_document_untouched() {
    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn create_document(&mut self, _req: CreateDocument) -> Result<Document, StoreError> {
            Err(StoreError::Backend("disk full".into()))
        }

        fn update_document(
            &mut self,
            _id: DocumentId,
            _patch: DocumentPatch,
        ) -> Result<Document, StoreError> {
            Err(StoreError::Backend("disk full".into()))
        }

        fn get_document(&self, _id: DocumentId) -> Result<Document, StoreError> {
            Err(StoreError::NotFound)
        }

        fn get_ancestor(&self, _id: DocumentId) -> Result<Ancestor, StoreError> {
            Err(StoreError::NotFound)
        }

        fn delete_document(&mut self, _id: DocumentId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    let mut editor = open(vec![BlockContent::paragraph("body")]);
    let first = editor.document().blocks()[0].id();
    editor.drain_events();

    let err = editor.insert_page_embed(first, &mut BrokenStore).unwrap_err();

    assert!(matches!(err, PageError::ChildCreationFailed(_)));
    assert_eq!(editor.document().blocks().len(), 1);
    assert_eq!(
        editor.document().blocks()[0].content(),
        &BlockContent::paragraph("body")
    );
    assert!(editor.drain_events().is_empty());
}

#[test]
fn the_command_enum_cannot_insert_a_page_embed() {
    // Embeds need the store; the store-less command surface rejects them.
    let mut editor = open(vec![BlockContent::paragraph("body")]);
    let first = editor.document().blocks()[0].id();

    let err = editor
        .dispatch(Command::InsertBlock {
            after: first,
            kind: BlockKind::PageEmbed,
        })
        .unwrap_err();

    assert_eq!(err, EditError::KindMismatch(BlockKind::PageEmbed));
    assert_eq!(editor.document().blocks().len(), 1);
}

#[test]
fn activating_a_page_embed_emits_navigate() {
    let target = DocumentId::generate();
    let mut editor = open(vec![
        BlockContent::paragraph(""),
        BlockContent::PageEmbed { target },
    ]);
    let embed = editor.document().blocks()[1].id();

    editor.activate_block(embed).unwrap();

    assert_eq!(editor.drain_events(), vec![EditorEvent::Navigate { target }]);
}

#[test]
fn activating_a_non_embed_block_is_a_kind_mismatch() {
    let mut editor = open(vec![BlockContent::paragraph("text")]);
    let block = editor.document().blocks()[0].id();

    let err = editor.activate_block(block).unwrap_err();
    assert_eq!(err, EditError::KindMismatch(BlockKind::Paragraph));
}
