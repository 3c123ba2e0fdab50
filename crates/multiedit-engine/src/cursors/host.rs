use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

use crate::editing::{Direction, EditError, EditOp, Patch, UnitKind};

/// Finds unit boundaries in a document.
pub trait UnitLocator {
    /// Next boundary of `kind` from `position` in `direction`, if any
    fn locate_unit_boundary(
        &self,
        kind: UnitKind,
        position: usize,
        direction: Direction,
    ) -> Option<usize>;

    /// Bounds of the unit at `position`, preferring one that ends there
    fn unit_bounds_at(&self, kind: UnitKind, position: usize) -> Option<Range<usize>> {
        if let Some(start) = self.locate_unit_boundary(kind, position, Direction::Backward)
            && let Some(end) = self.locate_unit_boundary(kind, start, Direction::Forward)
            && end >= position
        {
            return Some(start..end);
        }
        let end = self.locate_unit_boundary(kind, position, Direction::Forward)?;
        let start = self
            .locate_unit_boundary(kind, end, Direction::Backward)
            .unwrap_or(position)
            .max(position);
        Some(start..end)
    }
}

/// Everything the cursor core needs from the editor hosting the document.
///
/// Offsets are byte offsets on character boundaries. Edits only ever go
/// through [`Host::apply_op`], which acts at the caret and reports what
/// changed so tracked positions can follow.
pub trait Host: UnitLocator {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, range: Range<usize>) -> Cow<'_, str>;

    /// The whole text. Hosts that keep it materialised should borrow it.
    fn contents(&self) -> Cow<'_, str> {
        self.slice(0..self.len())
    }

    fn caret(&self) -> usize;

    fn set_caret(&mut self, at: usize);

    fn active_selection(&self) -> Option<Range<usize>>;

    fn deactivate_selection(&mut self);

    /// Mode chain of the document, most specific first
    fn modes(&self) -> &[String];

    /// Search for `pattern`.
    ///
    /// Forward: first match starting at or after `from` that ends at or
    /// before `bound`. Backward: last match starting before `from` that lies
    /// within `bound..from`.
    fn search_pattern(
        &self,
        pattern: &Regex,
        from: usize,
        bound: usize,
        direction: Direction,
    ) -> Option<Range<usize>>;

    /// Apply one operation at the caret
    fn apply_op(&mut self, op: &EditOp) -> Result<Patch, EditError>;

    fn begin_transaction(&mut self);

    /// Close the transaction; its changes become a single undo step
    fn commit_transaction(&mut self);

    /// Close the transaction, restoring the state it started from
    fn rollback_transaction(&mut self);
}
