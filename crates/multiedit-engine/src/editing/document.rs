use regex::Regex;
use std::borrow::Cow;
use std::cell::OnceCell;
use std::ops::Range;
use xi_rope::Rope;
use xi_rope::delta::{Builder, Transformer};

use crate::cursors::{Host, UnitLocator};
use crate::editing::commands::compile_op;
use crate::editing::history::{History, Revision};
use crate::editing::units::{self, Direction, UnitKind};
use crate::editing::{EditError, EditOp, Patch, Splice};

/// Editable text with a caret, an optional selection and undo history.
///
/// This is the host the cursor core drives. It keeps:
///
/// - **Single source of truth**: the whole text in one `xi_rope::Rope`
/// - **Caret and mark**: the selection is the range between the mark (when
///   set) and the caret; the mark follows edits through the edit's `Delta`
/// - **Undo history**: one undo step per operation, or one per transaction
///   however many operations ran inside it
/// - **Mode chain**: names used to pick configuration, most specific first
///
/// ```rust
/// # use multiedit_engine::editing::{Document, EditOp};
/// let mut doc = Document::new("hello");
/// doc.set_caret(5);
/// doc.apply(&EditOp::insert(" world")).unwrap();
/// assert_eq!(doc.text(), "hello world");
/// doc.undo();
/// assert_eq!(doc.text(), "hello");
/// ```
#[derive(Clone)]
pub struct Document {
    pub(crate) buffer: Rope,
    pub(crate) caret: usize,
    /// Selection anchor, the other end being the caret
    pub(crate) mark: Option<usize>,
    /// Version counter incremented on each change (enables change detection)
    pub(crate) version: u64,
    pub(crate) modes: Vec<String>,
    pub(crate) history: History,
    /// Whole text, built on first use after each change
    pub(crate) contents: OnceCell<String>,
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: Rope::from(text),
            caret: 0,
            mark: None,
            version: 0,
            modes: vec!["text".to_string()],
            history: History::new(),
            contents: OnceCell::new(),
        }
    }

    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        // Convert bytes to string, ensuring valid UTF-8
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    /// Replace the mode chain (most specific first)
    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = modes.into_iter().map(Into::into).collect();
        self
    }

    /// Get the document's content as raw bytes (exact round-trip)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.to_string().into_bytes()
    }

    pub fn text(&self) -> String {
        self.contents().to_string()
    }

    /// The whole text, materialised at most once between edits
    pub fn contents(&self) -> &str {
        self.contents.get_or_init(|| self.buffer.to_string())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Move the caret, clamping to the end of the buffer
    pub fn set_caret(&mut self, at: usize) {
        self.caret = at.min(self.len());
    }

    pub fn set_mark(&mut self, mark: Option<usize>) {
        self.mark = mark.map(|m| m.min(self.len()));
    }

    pub fn mark(&self) -> Option<usize> {
        self.mark
    }

    /// Select `range`, leaving the caret at its end
    pub fn select(&mut self, range: Range<usize>) {
        self.set_mark(Some(range.start));
        self.set_caret(range.end);
    }

    /// The active selection, if the mark is set and not at the caret
    pub fn selection(&self) -> Option<Range<usize>> {
        let mark = self.mark?;
        let range = mark.min(self.caret)..mark.max(self.caret);
        (!range.is_empty()).then_some(range)
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    /// Slice the buffer to a cow string
    pub fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let doc_len = self.buffer.len();

        // Clamp range to document bounds to prevent xi-rope panic
        let start = range.start.min(doc_len);
        let end = range.end.min(doc_len).max(start);

        if let Some(text) = self.contents.get().and_then(|text| text.get(start..end)) {
            return Cow::Borrowed(text);
        }
        self.buffer.slice_to_cow(start..end)
    }

    /// Apply an operation at the caret.
    ///
    /// The operation is compiled against the current caret, turned into a
    /// `Delta` and applied to the rope. The mark is transformed through the
    /// same delta; the caret lands where the operation leaves it. A failed
    /// operation leaves the document untouched.
    pub fn apply(&mut self, op: &EditOp) -> Result<Patch, EditError> {
        let compiled = compile_op(self, op)?;
        let mut splices = Vec::new();

        if let Some(change) = compiled.change {
            if !self.history.in_transaction() {
                self.history.record(self.revision());
            }

            let mut builder = Builder::new(self.buffer.len());
            builder.replace(change.range.clone(), Rope::from(change.text.as_str()));
            let delta = builder.build();
            self.buffer = delta.apply(&self.buffer);
            self.contents = OnceCell::new();

            if let Some(mark) = self.mark {
                let mut transformer = Transformer::new(&delta);
                self.mark = Some(transformer.transform(mark, false));
            }

            splices.push(Splice {
                start: change.range.start,
                old_len: change.range.len(),
                new_len: change.text.len(),
            });
            self.version += 1;
        }

        self.caret = compiled.caret.min(self.len());
        Ok(Patch {
            splices,
            caret: self.caret,
            version: self.version,
        })
    }

    /// Revert the last undo step. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        let current = self.revision();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.revision();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn begin_transaction(&mut self) {
        let before = self.revision();
        self.history.begin(before);
    }

    pub fn commit_transaction(&mut self) {
        self.history.commit(self.version);
    }

    pub fn rollback_transaction(&mut self) {
        if let Some(before) = self.history.rollback() {
            self.restore(before);
        }
    }

    /// Search `pattern`; see [`Host::search_pattern`] for the exact contract
    pub fn search(
        &self,
        pattern: &Regex,
        from: usize,
        bound: usize,
        direction: Direction,
    ) -> Option<Range<usize>> {
        let text = self.contents();
        match direction {
            Direction::Forward => {
                if from > bound || from > text.len() {
                    return None;
                }
                let found = pattern.find_at(text, from)?;
                (found.end() <= bound).then(|| found.range())
            }
            Direction::Backward => {
                let mut pos = bound.min(text.len());
                let mut last = None;
                while let Some(found) = pattern.find_at(text, pos) {
                    if found.start() >= from || found.end() > from {
                        break;
                    }
                    last = Some(found.range());
                    pos = if found.is_empty() {
                        match text[found.end()..].chars().next() {
                            Some(c) => found.end() + c.len_utf8(),
                            None => break,
                        }
                    } else {
                        found.end()
                    };
                }
                last
            }
        }
    }

    fn revision(&self) -> Revision {
        Revision {
            buffer: self.buffer.clone(),
            caret: self.caret,
            mark: self.mark,
            version: self.version,
        }
    }

    fn restore(&mut self, revision: Revision) {
        self.buffer = revision.buffer;
        self.contents = OnceCell::new();
        self.caret = revision.caret.min(self.buffer.len());
        self.mark = revision.mark;
        self.version += 1;
    }
}

impl UnitLocator for Document {
    fn locate_unit_boundary(
        &self,
        kind: UnitKind,
        position: usize,
        direction: Direction,
    ) -> Option<usize> {
        units::locate_boundary(self.contents(), kind, position, direction)
    }

    fn unit_bounds_at(&self, kind: UnitKind, position: usize) -> Option<Range<usize>> {
        units::bounds_at(self.contents(), kind, position)
    }
}

impl Host for Document {
    fn len(&self) -> usize {
        Document::len(self)
    }

    fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        Document::slice(self, range)
    }

    fn contents(&self) -> Cow<'_, str> {
        Cow::Borrowed(Document::contents(self))
    }

    fn caret(&self) -> usize {
        self.caret
    }

    fn set_caret(&mut self, at: usize) {
        Document::set_caret(self, at)
    }

    fn active_selection(&self) -> Option<Range<usize>> {
        self.selection()
    }

    fn deactivate_selection(&mut self) {
        self.mark = None;
    }

    fn modes(&self) -> &[String] {
        &self.modes
    }

    fn search_pattern(
        &self,
        pattern: &Regex,
        from: usize,
        bound: usize,
        direction: Direction,
    ) -> Option<Range<usize>> {
        self.search(pattern, from, bound, direction)
    }

    fn apply_op(&mut self, op: &EditOp) -> Result<Patch, EditError> {
        self.apply(op)
    }

    fn begin_transaction(&mut self) {
        Document::begin_transaction(self)
    }

    fn commit_transaction(&mut self) {
        Document::commit_transaction(self)
    }

    fn rollback_transaction(&mut self) {
        Document::rollback_transaction(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literal(text: &str) -> Regex {
        Regex::new(&regex::escape(text)).unwrap()
    }

    #[test]
    fn test_from_bytes_rejects_invalid_utf8() {
        assert!(Document::from_bytes(&[0xff, 0xfe]).is_err());
        let doc = Document::from_bytes(b"ok").unwrap();
        assert_eq!(doc.to_bytes(), b"ok".to_vec());
    }

    #[test]
    fn test_selection_requires_mark_away_from_caret() {
        let mut doc = Document::new("hello world");
        assert_eq!(doc.selection(), None);

        doc.select(6..11);
        assert_eq!(doc.selection(), Some(6..11));

        doc.set_mark(Some(11));
        assert_eq!(doc.selection(), None);
    }

    #[test]
    fn test_mark_follows_edits_before_it() {
        let mut doc = Document::new("hello world");
        doc.select(6..11);
        doc.set_caret(0);

        doc.apply(&EditOp::insert(">> ")).unwrap();

        assert_eq!(doc.mark(), Some(9));
        assert_eq!(doc.selection(), Some(3..9));
    }

    #[test]
    fn test_contents_refreshes_after_edit_and_undo() {
        let mut doc = Document::new("hello");
        assert_eq!(doc.contents(), "hello");
        assert_eq!(doc.slice(1..3), "el");

        doc.set_caret(5);
        doc.apply(&EditOp::insert("!")).unwrap();
        assert_eq!(doc.contents(), "hello!");
        assert_eq!(doc.slice(4..6), "o!");

        doc.undo();
        assert_eq!(doc.contents(), "hello");
        assert_eq!(doc.slice(0..10), "hello");
    }

    // ============ Undo and transactions ============

    #[test]
    fn test_each_operation_is_one_undo_step() {
        let mut doc = Document::new("ab");
        doc.set_caret(2);
        doc.apply(&EditOp::insert("c")).unwrap();
        doc.apply(&EditOp::insert("d")).unwrap();

        assert!(doc.undo());
        assert_eq!(doc.text(), "abc");
        assert!(doc.undo());
        assert_eq!(doc.text(), "ab");
        assert!(!doc.undo());

        assert!(doc.redo());
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_motion_does_not_create_undo_steps() {
        let mut doc = Document::new("abc");
        doc.apply(&EditOp::MoveCaret { by: 2 }).unwrap();
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_committed_transaction_is_a_single_undo_step() {
        let mut doc = Document::new("one two");
        doc.begin_transaction();
        doc.set_caret(0);
        doc.apply(&EditOp::insert("[")).unwrap();
        doc.set_caret(5);
        doc.apply(&EditOp::insert("]")).unwrap();
        doc.commit_transaction();

        assert_eq!(doc.text(), "[one] two");
        assert!(doc.undo());
        assert_eq!(doc.text(), "one two");
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_rollback_restores_buffer_and_caret() {
        let mut doc = Document::new("one two");
        doc.set_caret(3);
        doc.begin_transaction();
        doc.apply(&EditOp::insert("!")).unwrap();
        doc.set_caret(0);
        doc.apply(&EditOp::DeleteForward { count: 2 }).unwrap();
        doc.rollback_transaction();

        assert_eq!(doc.text(), "one two");
        assert_eq!(doc.caret(), 3);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_nested_transactions_collapse_into_outermost() {
        let mut doc = Document::new("x");
        doc.begin_transaction();
        doc.apply(&EditOp::insert("a")).unwrap();
        doc.begin_transaction();
        doc.apply(&EditOp::insert("b")).unwrap();
        doc.commit_transaction();
        doc.commit_transaction();

        assert_eq!(doc.text(), "abx");
        assert!(doc.undo());
        assert_eq!(doc.text(), "x");
    }

    #[test]
    fn test_empty_transaction_leaves_no_undo_step() {
        let mut doc = Document::new("x");
        doc.begin_transaction();
        doc.commit_transaction();
        assert!(!doc.can_undo());
    }

    // ============ Search ============

    #[test]
    fn test_search_forward_respects_bound() {
        let doc = Document::new("foo bar foo baz foo");
        let foo = literal("foo");

        assert_eq!(doc.search(&foo, 1, 19, Direction::Forward), Some(8..11));
        assert_eq!(doc.search(&foo, 9, 18, Direction::Forward), None);
        assert_eq!(doc.search(&foo, 9, 19, Direction::Forward), Some(16..19));
    }

    #[test]
    fn test_search_backward_finds_last_match_before() {
        let doc = Document::new("foo bar foo baz foo");
        let foo = literal("foo");

        assert_eq!(doc.search(&foo, 16, 0, Direction::Backward), Some(8..11));
        assert_eq!(doc.search(&foo, 8, 0, Direction::Backward), Some(0..3));
        assert_eq!(doc.search(&foo, 8, 1, Direction::Backward), None);
        assert_eq!(doc.search(&foo, 0, 0, Direction::Backward), None);
    }

    #[test]
    fn test_unit_locator_uses_document_text() {
        let doc = Document::new("alpha beta");
        assert_eq!(
            doc.locate_unit_boundary(UnitKind::Word, 0, Direction::Forward),
            Some(5)
        );
        assert_eq!(doc.unit_bounds_at(UnitKind::Word, 7), Some(6..10));
    }
}
