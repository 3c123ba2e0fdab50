use regex::{Regex, RegexBuilder};
use std::fmt;
use std::ops::Range;

use crate::cursors::{Host, PositionMarker};
use crate::editing::{Patch, UnitKind};

/// A search pattern, always matched case-sensitively.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    literal: bool,
    regex: Regex,
}

impl CompiledPattern {
    /// Match `text` exactly
    pub fn literal(text: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(false)
            .build()?;
        Ok(Self {
            source: text.to_string(),
            literal: true,
            regex,
        })
    }

    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source).case_insensitive(false).build()?;
        Ok(Self {
            source: source.to_string(),
            literal: false,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.literal == other.literal
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literal {
            write!(f, "Literal({:?})", self.source)
        } else {
            write!(f, "Regex({:?})", self.source)
        }
    }
}

/// How a cursor set was produced, so it can be extended or regenerated
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceDescriptor {
    Pattern(CompiledPattern),
    Unit(UnitKind),
}

impl fmt::Display for InstanceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceDescriptor::Pattern(pattern) => write!(f, "\"{}\"", pattern.source()),
            InstanceDescriptor::Unit(kind) => write!(f, "{kind}"),
        }
    }
}

/// One secondary cursor.
///
/// `lead` is the marker's byte offset inside the text it matched and `len`
/// that text's length; both are zero for cursors placed by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    marker: PositionMarker,
    lead: usize,
    len: usize,
    serial: u64,
}

impl Cursor {
    pub fn offset(&self) -> usize {
        self.marker.offset()
    }

    /// The text this cursor was placed on, as last known
    pub fn matched_range(&self) -> Range<usize> {
        let start = self.offset().saturating_sub(self.lead);
        start..start + self.len
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// The occurrence a cursor set was derived from, at the primary caret.
///
/// Both ends are tracked, so text typed inside or at the front of the
/// occurrence stays part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    start: PositionMarker,
    end: PositionMarker,
}

impl Origin {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: PositionMarker::new(range.start),
            end: PositionMarker::new(range.end),
        }
    }

    pub fn start(&self) -> usize {
        self.start.offset()
    }

    pub fn range(&self) -> Range<usize> {
        let start = self.start();
        start..self.end.offset().max(start)
    }

    /// Whether a match of `range` is this occurrence, possibly after edits
    fn covers(&self, range: &Range<usize>) -> bool {
        let origin = self.range();
        range.start == origin.start || (range.start < origin.end && origin.start < range.end)
    }
}

/// Secondary cursors in strictly increasing offset order.
#[derive(Debug, Clone, Default)]
pub struct CursorSet {
    cursors: Vec<Cursor>,
    descriptor: Option<InstanceDescriptor>,
    origin: Option<Origin>,
    /// Characters from the start of a match to its marker; `None` puts
    /// markers at match ends
    lead: Option<usize>,
    next_serial: u64,
}

impl CursorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.cursors.iter().map(Cursor::offset).collect()
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.position(offset).is_ok()
    }

    pub fn descriptor(&self) -> Option<&InstanceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn lead(&self) -> Option<usize> {
        self.lead
    }

    /// Start a marking phase: fix the descriptor, origin and placement rule
    pub fn begin_phase(
        &mut self,
        descriptor: InstanceDescriptor,
        origin: Option<Range<usize>>,
        lead: Option<usize>,
    ) {
        self.descriptor = Some(descriptor);
        self.origin = origin.map(Origin::new);
        self.lead = lead;
    }

    /// Whether a match of `range` is the origin occurrence
    pub fn is_origin(&self, range: &Range<usize>) -> bool {
        self.origin.is_some_and(|origin| origin.covers(range))
    }

    /// Marker offset for a match of `range`, following the placement rule
    pub fn marker_offset<H: Host + ?Sized>(&self, host: &H, range: &Range<usize>) -> usize {
        match self.lead {
            None => range.end,
            Some(chars) => {
                let text = host.slice(range.clone());
                range.start + text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
            }
        }
    }

    /// Add a cursor at `offset` for a match of `range`. Returns false if a
    /// cursor is already there.
    pub fn insert(&mut self, offset: usize, range: Range<usize>) -> bool {
        let Err(index) = self.position(offset) else {
            return false;
        };
        let cursor = Cursor {
            marker: PositionMarker::new(offset),
            lead: offset.saturating_sub(range.start),
            len: range.len(),
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.cursors.insert(index, cursor);
        true
    }

    /// Add a cursor that matched nothing, such as one placed by hand
    pub fn insert_bare(&mut self, offset: usize) -> bool {
        self.insert(offset, offset..offset)
    }

    /// Remove the `n` most recently added cursors, returning how many went
    pub fn remove_last(&mut self, n: usize) -> usize {
        let mut serials: Vec<u64> = self.cursors.iter().map(Cursor::serial).collect();
        serials.sort_unstable_by(|a, b| b.cmp(a));
        serials.truncate(n);
        let before = self.cursors.len();
        self.cursors.retain(|cursor| !serials.contains(&cursor.serial));
        before - self.cursors.len()
    }

    /// Evict cursors whose matched text is not fully inside `bounds`
    pub fn retain_within(&mut self, bounds: &Range<usize>) -> usize {
        let before = self.cursors.len();
        self.cursors.retain(|cursor| {
            let matched = cursor.matched_range();
            matched.start >= bounds.start && matched.end <= bounds.end
        });
        before - self.cursors.len()
    }

    /// Current offset of the cursor with `serial`, if it still exists
    pub fn offset_of(&self, serial: u64) -> Option<usize> {
        self.cursors
            .iter()
            .find(|cursor| cursor.serial == serial)
            .map(Cursor::offset)
    }

    /// Follow an edit. Cursors collapsed onto the same offset are merged,
    /// keeping the one to the left.
    pub fn apply_patch(&mut self, patch: &Patch) {
        if patch.is_noop() {
            return;
        }
        for cursor in &mut self.cursors {
            cursor.marker.apply_patch(patch);
        }
        if let Some(origin) = &mut self.origin {
            origin.start.apply_patch(patch);
            origin.end.apply_patch(patch);
        }
        self.cursors.dedup_by_key(|cursor| cursor.offset());
    }

    /// Furthest end of any matched text, including the origin
    pub fn furthest_end(&self) -> Option<usize> {
        self.cursors
            .iter()
            .map(|cursor| cursor.matched_range().end)
            .chain(self.origin.map(|origin| origin.range().end))
            .max()
    }

    /// Earliest start of any matched text, including the origin
    pub fn earliest_start(&self) -> Option<usize> {
        self.cursors
            .iter()
            .map(|cursor| cursor.matched_range().start)
            .chain(self.origin.map(|origin| origin.start()))
            .min()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
        self.descriptor = None;
        self.origin = None;
        self.lead = None;
    }

    fn position(&self, offset: usize) -> Result<usize, usize> {
        self.cursors
            .binary_search_by_key(&offset, |cursor| cursor.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Document, Splice};
    use pretty_assertions::assert_eq;

    fn set_at(offsets: &[usize]) -> CursorSet {
        let mut set = CursorSet::new();
        for &offset in offsets {
            set.insert_bare(offset);
        }
        set
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let mut set = set_at(&[30, 5, 12]);

        assert!(!set.insert_bare(12));
        assert_eq!(set.offsets(), vec![5, 12, 30]);
    }

    #[test]
    fn test_remove_last_uses_insertion_order() {
        let mut set = set_at(&[30, 5, 12, 41]);

        assert_eq!(set.remove_last(2), 2);
        assert_eq!(set.offsets(), vec![5, 30]);

        assert_eq!(set.remove_last(5), 2);
        assert!(set.is_empty());
    }

    #[test]
    fn test_retain_within_checks_matched_range() {
        let mut set = CursorSet::new();
        set.insert(12, 10..14);
        set.insert(33, 32..36);
        set.insert(20, 20..20);

        let evicted = set.retain_within(&(10..35));

        assert_eq!(evicted, 1);
        assert_eq!(set.offsets(), vec![12, 20]);
    }

    #[test]
    fn test_apply_patch_merges_collapsed_cursors() {
        let mut set = set_at(&[2, 4, 6]);
        let first = set.cursors()[0].serial();

        set.apply_patch(&Patch {
            splices: vec![Splice {
                start: 1,
                old_len: 4,
                new_len: 0,
            }],
            caret: 1,
            version: 1,
        });

        assert_eq!(set.offsets(), vec![1, 2]);
        assert_eq!(set.cursors()[0].serial(), first);
    }

    #[test]
    fn test_origin_follows_edits() {
        let mut set = CursorSet::new();
        set.begin_phase(
            InstanceDescriptor::Pattern(CompiledPattern::literal("foo").unwrap()),
            Some(8..11),
            Some(0),
        );

        set.apply_patch(&Patch {
            splices: vec![Splice {
                start: 0,
                old_len: 0,
                new_len: 2,
            }],
            caret: 2,
            version: 1,
        });

        assert!(set.is_origin(&(10..13)));
        assert_eq!(set.origin().map(Origin::range), Some(10..13));
    }

    #[test]
    fn test_origin_grows_with_insert_at_its_start() {
        let mut set = CursorSet::new();
        set.begin_phase(
            InstanceDescriptor::Pattern(CompiledPattern::literal("foo").unwrap()),
            Some(0..3),
            Some(0),
        );

        // Typing "X" at the front of the occurrence
        set.apply_patch(&Patch {
            splices: vec![Splice {
                start: 0,
                old_len: 0,
                new_len: 1,
            }],
            caret: 1,
            version: 1,
        });

        assert_eq!(set.origin().map(Origin::range), Some(0..4));
        // "foo" now sits at 1..4 inside "Xfoo"
        assert!(set.is_origin(&(1..4)));
        assert!(!set.is_origin(&(4..7)));
    }

    #[test]
    fn test_marker_offset_counts_lead_in_characters() {
        let doc = Document::new("héllo wörld");
        let mut set = CursorSet::new();
        set.begin_phase(InstanceDescriptor::Unit(UnitKind::Word), None, Some(2));

        // "wörld" starts at byte 7; its third character "r" is at byte 10
        assert_eq!(set.marker_offset(&doc, &(7..13)), 10);

        set.begin_phase(InstanceDescriptor::Unit(UnitKind::Word), None, None);
        assert_eq!(set.marker_offset(&doc, &(7..13)), 13);
    }

    #[test]
    fn test_regex_pattern_is_case_sensitive() {
        let pattern = CompiledPattern::regex("fo+").unwrap();
        assert!(pattern.as_regex().is_match("foo"));
        assert!(!pattern.as_regex().is_match("FOO"));
        assert!(CompiledPattern::regex("(").is_err());
    }

    #[test]
    fn test_literal_pattern_escapes_metacharacters() {
        let pattern = CompiledPattern::literal("a.b").unwrap();
        assert!(pattern.as_regex().is_match("a.b"));
        assert!(!pattern.as_regex().is_match("axb"));
        assert_eq!(format!("{pattern:?}"), r#"Literal("a.b")"#);
    }
}
