use std::ops::Range;

use crate::cursors::{CursorSet, Host, InstanceDescriptor};
use crate::editing::{Direction, UnitKind};

/// Result of a marking command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Cursors were added
    Placed(usize),
    /// The search ran out before placing as many cursors as asked
    NoMoreMatches { placed: usize },
    /// A mark-all found nothing new
    Empty,
    /// No pattern was given and none could be derived at the caret
    NothingToMatch,
}

impl MarkOutcome {
    pub fn placed(&self) -> usize {
        match self {
            MarkOutcome::Placed(n) | MarkOutcome::NoMoreMatches { placed: n } => *n,
            MarkOutcome::Empty | MarkOutcome::NothingToMatch => 0,
        }
    }
}

/// Places cursors on occurrences of a descriptor inside `bounds`.
pub struct MatchEngine<'h, H: Host + ?Sized> {
    host: &'h H,
    bounds: Range<usize>,
}

impl<'h, H: Host + ?Sized> MatchEngine<'h, H> {
    pub fn new(host: &'h H, bounds: Range<usize>) -> Self {
        let end = bounds.end.min(host.len());
        let start = bounds.start.min(end);
        Self {
            host,
            bounds: start..end,
        }
    }

    pub fn bounds(&self) -> Range<usize> {
        self.bounds.clone()
    }

    /// Mark every non-overlapping occurrence in the bounds except the origin.
    /// Returns the number of cursors added.
    pub fn mark_all(&self, set: &mut CursorSet) -> usize {
        let Some(descriptor) = set.descriptor().cloned() else {
            return 0;
        };
        let mut placed = 0;
        let mut from = self.bounds.start;
        while let Some(range) = self.find(&descriptor, from, Direction::Forward) {
            from = step_past(self.host, &range);
            if !set.is_origin(&range) {
                let offset = set.marker_offset(self.host, &range);
                if set.insert(offset, range) {
                    placed += 1;
                }
            }
            if from > self.bounds.end {
                break;
            }
        }
        log::debug!("Marked {placed} instances of {descriptor}");
        placed
    }

    /// Mark up to `count` further occurrences after the furthest cursor
    pub fn mark_next(&self, set: &mut CursorSet, count: usize) -> MarkOutcome {
        let from = set
            .furthest_end()
            .unwrap_or_else(|| self.host.caret())
            .max(self.bounds.start);
        self.mark_in_direction(set, from, count, Direction::Forward)
    }

    /// Mark up to `count` occurrences before the earliest cursor
    pub fn mark_previous(&self, set: &mut CursorSet, count: usize) -> MarkOutcome {
        let from = set
            .earliest_start()
            .unwrap_or_else(|| self.host.caret())
            .min(self.bounds.end);
        self.mark_in_direction(set, from, count, Direction::Backward)
    }

    /// Add cursors on following or preceding lines at the caret's column
    pub fn mark_lines(
        &self,
        set: &mut CursorSet,
        count: usize,
        direction: Direction,
    ) -> MarkOutcome {
        let text = self.host.contents();
        let caret = self.host.caret().min(text.len());
        let column = text[line_start(&text, caret)..caret].chars().count();

        let offsets = set.offsets();
        let mut from = match direction {
            Direction::Forward => offsets.last().copied().unwrap_or(caret).max(caret),
            Direction::Backward => offsets.first().copied().unwrap_or(caret).min(caret),
        };

        let mut placed = 0;
        while placed < count {
            let next_line = match direction {
                Direction::Forward => text[from..].find('\n').map(|i| from + i + 1),
                Direction::Backward => {
                    let start = line_start(&text, from);
                    (start > 0).then(|| line_start(&text, start - 1))
                }
            };
            let Some(start) = next_line.filter(|start| {
                (self.bounds.start..=self.bounds.end).contains(start)
            }) else {
                return MarkOutcome::NoMoreMatches { placed };
            };
            let line = &text[start..text[start..].find('\n').map_or(text.len(), |i| start + i)];
            let offset = start + line.char_indices().nth(column).map_or(line.len(), |(i, _)| i);
            if offset > self.bounds.end {
                return MarkOutcome::NoMoreMatches { placed };
            }
            if set.insert_bare(offset) {
                placed += 1;
            }
            from = offset;
        }
        MarkOutcome::Placed(placed)
    }

    fn mark_in_direction(
        &self,
        set: &mut CursorSet,
        mut from: usize,
        count: usize,
        direction: Direction,
    ) -> MarkOutcome {
        let Some(descriptor) = set.descriptor().cloned() else {
            return MarkOutcome::NothingToMatch;
        };
        let mut placed = 0;
        while placed < count {
            let Some(range) = self.find(&descriptor, from, direction) else {
                log::debug!("No more instances of {descriptor} ({direction:?})");
                return MarkOutcome::NoMoreMatches { placed };
            };
            from = match direction {
                Direction::Forward => step_past(self.host, &range),
                Direction::Backward => range.start,
            };
            if set.is_origin(&range) {
                continue;
            }
            let offset = set.marker_offset(self.host, &range);
            if set.insert(offset, range) {
                placed += 1;
            }
        }
        MarkOutcome::Placed(placed)
    }

    /// Next occurrence from `from` in `direction`, inside the bounds
    fn find(
        &self,
        descriptor: &InstanceDescriptor,
        from: usize,
        direction: Direction,
    ) -> Option<Range<usize>> {
        match descriptor {
            InstanceDescriptor::Pattern(pattern) => {
                let bound = match direction {
                    Direction::Forward => self.bounds.end,
                    Direction::Backward => self.bounds.start,
                };
                let range = self
                    .host
                    .search_pattern(pattern.as_regex(), from, bound, direction)?;
                (range.start >= self.bounds.start && range.end <= self.bounds.end).then_some(range)
            }
            InstanceDescriptor::Unit(kind) => match direction {
                Direction::Forward => self.unit_after(*kind, from),
                Direction::Backward => self.unit_before(*kind, from),
            },
        }
    }

    /// The unit whose end is the next forward boundary after `from`. Its start
    /// never precedes `from`.
    fn unit_after(&self, kind: UnitKind, from: usize) -> Option<Range<usize>> {
        let end = self
            .host
            .locate_unit_boundary(kind, from, Direction::Forward)?;
        if end <= from || end > self.bounds.end {
            return None;
        }
        let start = if kind == UnitKind::Line {
            self.host.unit_bounds_at(kind, end).map(|range| range.start)
        } else {
            self.host
                .locate_unit_boundary(kind, end, Direction::Backward)
        };
        Some(start.unwrap_or(from).clamp(from, end)..end)
    }

    /// The closest unit ending at or before `from`
    fn unit_before(&self, kind: UnitKind, from: usize) -> Option<Range<usize>> {
        let mut pos = from;
        loop {
            let start = self
                .host
                .locate_unit_boundary(kind, pos, Direction::Backward)?;
            if start >= pos || start < self.bounds.start {
                return None;
            }
            let end = if kind == UnitKind::Line {
                self.host.unit_bounds_at(kind, start).map(|range| range.end)
            } else {
                self.host
                    .locate_unit_boundary(kind, start, Direction::Forward)
            };
            if let Some(end) = end
                && end <= from
            {
                return Some(start..end);
            }
            pos = start;
        }
    }

}

/// Where to resume a forward search after `range`
fn step_past<H: Host + ?Sized>(host: &H, range: &Range<usize>) -> usize {
    if !range.is_empty() {
        return range.end;
    }
    let next = host
        .contents()
        .get(range.end..)
        .and_then(|rest| rest.chars().next())
        .map_or(1, char::len_utf8);
    range.end + next
}

/// Find the occurrence a new cursor set derives from: the one at `caret`.
///
/// Returns the occurrence and the caret's character offset inside it, or
/// `None` for the offset when the caret sits at the occurrence's end.
pub fn origin_at<H: Host + ?Sized>(
    host: &H,
    descriptor: &InstanceDescriptor,
    bounds: Range<usize>,
    caret: usize,
) -> Option<(Range<usize>, Option<usize>)> {
    let range = match descriptor {
        InstanceDescriptor::Pattern(pattern) => {
            let mut from = line_start(&host.contents(), caret).max(bounds.start);
            loop {
                let found = host.search_pattern(
                    pattern.as_regex(),
                    from,
                    bounds.end,
                    Direction::Forward,
                )?;
                if found.start > caret {
                    return None;
                }
                if found.end >= caret {
                    break found;
                }
                from = step_past(host, &found);
            }
        }
        InstanceDescriptor::Unit(kind) => host
            .unit_bounds_at(*kind, caret)
            .filter(|range| range.start <= caret && caret <= range.end)?,
    };
    let lead = lead_at(host, &range, caret);
    Some((range, lead))
}

/// Characters from the start of `range` to `caret`, or `None` when the caret
/// sits at the end of a non-empty range
pub(crate) fn lead_at<H: Host + ?Sized>(
    host: &H,
    range: &Range<usize>,
    caret: usize,
) -> Option<usize> {
    if caret >= range.end && !range.is_empty() {
        return None;
    }
    Some(host.slice(range.start..caret).chars().count())
}

/// Byte offset of the start of the line containing `pos`
fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursors::CompiledPattern;
    use crate::editing::Document;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn doc_at(text: &str, caret: usize) -> Document {
        let mut doc = Document::new(text);
        doc.set_caret(caret);
        doc
    }

    fn literal(text: &str) -> InstanceDescriptor {
        InstanceDescriptor::Pattern(CompiledPattern::literal(text).unwrap())
    }

    /// Begin a phase the way the session does, deriving origin and lead
    fn phase(doc: &Document, descriptor: InstanceDescriptor) -> CursorSet {
        let mut set = CursorSet::new();
        let origin = origin_at(doc, &descriptor, 0..doc.len(), doc.caret());
        set.begin_phase(
            descriptor,
            origin.as_ref().map(|(range, _)| range.clone()),
            origin.and_then(|(_, lead)| lead),
        );
        set
    }

    // ============ Mark all ============

    #[test]
    fn test_mark_all_excludes_origin() {
        let doc = doc_at("foo bar foo baz foo", 0);
        let mut set = phase(&doc, literal("foo"));

        let placed = MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(placed, 2);
        assert_eq!(set.offsets(), vec![8, 16]);
    }

    #[test]
    fn test_mark_all_without_origin_marks_match_ends() {
        let doc = doc_at("xx ab ab", 0);
        let mut set = phase(&doc, literal("ab"));

        MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(set.offsets(), vec![5, 8]);
    }

    #[test]
    fn test_mark_all_caret_inside_origin_sets_lead() {
        let doc = doc_at("value = value + value", 2);
        let mut set = phase(&doc, literal("value"));

        MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(set.offsets(), vec![10, 18]);
    }

    #[test]
    fn test_mark_all_skips_existing_markers() {
        let doc = doc_at("foo bar foo baz foo", 0);
        let mut set = phase(&doc, literal("foo"));
        set.insert(8, 8..11);

        let placed = MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(placed, 1);
        assert_eq!(set.offsets(), vec![8, 16]);
    }

    #[test]
    fn test_mark_all_honours_bounds() {
        let doc = doc_at("foo foo foo foo", 0);
        let mut set = phase(&doc, literal("foo"));

        MatchEngine::new(&doc, 2..11).mark_all(&mut set);

        assert_eq!(set.offsets(), vec![4, 8]);
    }

    #[test]
    fn test_mark_all_regex() {
        let doc = doc_at("a1 b22 c333", 0);
        let descriptor = InstanceDescriptor::Pattern(CompiledPattern::regex(r"\d+").unwrap());
        let mut set = phase(&doc, descriptor);

        MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(set.offsets(), vec![2, 6, 11]);
    }

    #[rstest]
    #[case::words(UnitKind::Word, "one two three", 0, vec![4, 8])]
    #[case::words_caret_at_end(UnitKind::Word, "one two three", 3, vec![7, 13])]
    #[case::numbers(UnitKind::Number, "x1 = 20 + 3.5", 0, vec![2, 7, 13])]
    #[case::lines(UnitKind::Line, "ab\ncd\nef", 0, vec![3, 6])]
    #[case::symbols(UnitKind::Symbol, "a_b c_d", 7, vec![3])]
    fn test_mark_all_units(
        #[case] kind: UnitKind,
        #[case] text: &str,
        #[case] caret: usize,
        #[case] expected: Vec<usize>,
    ) {
        let doc = doc_at(text, caret);
        let mut set = phase(&doc, InstanceDescriptor::Unit(kind));

        MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(set.offsets(), expected);
    }

    #[test]
    fn test_mark_all_lines_includes_empty_lines() {
        let doc = doc_at("ab\n\ncd", 0);
        let mut set = phase(&doc, InstanceDescriptor::Unit(UnitKind::Line));

        MatchEngine::new(&doc, 0..doc.len()).mark_all(&mut set);

        assert_eq!(set.offsets(), vec![3, 4]);
    }

    // ============ Next and previous ============

    #[test]
    fn test_mark_next_steps_one_at_a_time() {
        let doc = doc_at("foo bar foo baz foo", 0);
        let mut set = phase(&doc, literal("foo"));
        let engine = MatchEngine::new(&doc, 0..doc.len());

        assert_eq!(engine.mark_next(&mut set, 1), MarkOutcome::Placed(1));
        assert_eq!(set.offsets(), vec![8]);

        assert_eq!(engine.mark_next(&mut set, 1), MarkOutcome::Placed(1));
        assert_eq!(set.offsets(), vec![8, 16]);
    }

    #[test]
    fn test_mark_next_at_last_match_leaves_set_unchanged() {
        let doc = doc_at("foo bar foo baz foo", 0);
        let mut set = phase(&doc, literal("foo"));
        let engine = MatchEngine::new(&doc, 0..15);
        engine.mark_next(&mut set, 1);
        let before = set.cursors().to_vec();

        let outcome = engine.mark_next(&mut set, 1);

        assert_eq!(outcome, MarkOutcome::NoMoreMatches { placed: 0 });
        assert_eq!(set.cursors(), before.as_slice());
    }

    #[test]
    fn test_mark_next_with_count_reports_partial_progress() {
        let doc = doc_at("foo bar foo baz foo", 0);
        let mut set = phase(&doc, literal("foo"));

        let outcome = MatchEngine::new(&doc, 0..doc.len()).mark_next(&mut set, 5);

        assert_eq!(outcome, MarkOutcome::NoMoreMatches { placed: 2 });
        assert_eq!(set.offsets(), vec![8, 16]);
    }

    #[test]
    fn test_mark_previous_from_origin() {
        let doc = doc_at("foo bar foo baz foo", 16);
        let mut set = phase(&doc, literal("foo"));
        let engine = MatchEngine::new(&doc, 0..doc.len());

        assert_eq!(engine.mark_previous(&mut set, 1), MarkOutcome::Placed(1));
        assert_eq!(set.offsets(), vec![8]);

        assert_eq!(engine.mark_previous(&mut set, 3), MarkOutcome::NoMoreMatches { placed: 1 });
        assert_eq!(set.offsets(), vec![0, 8]);
    }

    #[test]
    fn test_mark_previous_units() {
        let doc = doc_at("alpha beta gamma", 11);
        let mut set = phase(&doc, InstanceDescriptor::Unit(UnitKind::Word));

        let outcome = MatchEngine::new(&doc, 0..doc.len()).mark_previous(&mut set, 2);

        assert_eq!(outcome, MarkOutcome::Placed(2));
        assert_eq!(set.offsets(), vec![0, 6]);
    }

    #[test]
    fn test_mark_next_without_descriptor() {
        let doc = doc_at("abc", 0);
        let mut set = CursorSet::new();

        let outcome = MatchEngine::new(&doc, 0..doc.len()).mark_next(&mut set, 1);

        assert_eq!(outcome, MarkOutcome::NothingToMatch);
    }

    // ============ Lines ============

    #[test]
    fn test_mark_next_line_keeps_column() {
        let doc = doc_at("abcd\nxy\nlong line", 2);
        let mut set = CursorSet::new();
        let engine = MatchEngine::new(&doc, 0..doc.len());

        assert_eq!(engine.mark_lines(&mut set, 2, Direction::Forward), MarkOutcome::Placed(2));
        // Column clamped on the short line
        assert_eq!(set.offsets(), vec![7, 10]);

        assert_eq!(
            engine.mark_lines(&mut set, 1, Direction::Forward),
            MarkOutcome::NoMoreMatches { placed: 0 }
        );
    }

    #[test]
    fn test_mark_previous_line() {
        let doc = doc_at("one\ntwo\nthree", 10);
        let mut set = CursorSet::new();

        let outcome =
            MatchEngine::new(&doc, 0..doc.len()).mark_lines(&mut set, 5, Direction::Backward);

        assert_eq!(outcome, MarkOutcome::NoMoreMatches { placed: 2 });
        assert_eq!(set.offsets(), vec![2, 6]);
    }

    // ============ Origin ============

    #[test]
    fn test_origin_at_caret_inside_match() {
        let doc = doc_at("foo bar foo", 9);
        let origin = origin_at(&doc, &literal("foo"), 0..doc.len(), doc.caret());
        assert_eq!(origin, Some((8..11, Some(1))));
    }

    #[test]
    fn test_origin_at_caret_outside_any_match() {
        let doc = doc_at("foo bar foo", 5);
        assert_eq!(origin_at(&doc, &literal("foo"), 0..doc.len(), 5), None);
    }
}
